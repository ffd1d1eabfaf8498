pub mod fetcher;
pub mod util;

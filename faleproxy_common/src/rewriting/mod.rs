pub mod html;
pub mod replacement;
pub mod rewriter;

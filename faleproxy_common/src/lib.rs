pub mod api;
pub mod error;
pub mod proxy;
pub mod rewriting;
pub mod state;

use std::{future::Future, sync::Arc};

use axum::Router;
use error::Result;
use proxy::fetcher::Fetcher;
use rewriting::{html::html_rewriter, replacement::YALE_TO_FALE};
use scorched::{logf, LogData, LogImportance};
use state::{APIState, Config};

/// Builds the relay's router. Every request gets its own document; the only shared pieces are
/// the configuration, the HTTP client and the stateless rewriter.
pub fn app(config: Arc<Config>) -> Result<Router> {
    let apistate = APIState {
        config: config.clone(),
        fetcher: Fetcher::new(&config)?,
        html_rewriter: Arc::new(html_rewriter::HtmlRewriter::new(YALE_TO_FALE)),
    };

    Ok(api::service::service(Arc::new(apistate)))
}

pub async fn serve<F>(config: Arc<Config>, graceful_shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = app(config.clone())?;

    let listener = tokio::net::TcpListener::bind(config.host).await?;
    logf!(Info, "Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    Ok(())
}

use std::sync::Arc;

use faleproxy_common::{error::Result, serve, state::Config};
use scorched::{logf, LogData, LogImportance};
use tokio::signal;

const APP_NAME: &str = "faleproxy";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    logf!(
        Info,
        "Loading config from file: {}",
        confy::get_configuration_file_path(APP_NAME, None)?.display()
    );

    let config: Arc<Config> = Arc::new(confy::load(APP_NAME, None)?);

    logf!(
        Info,
        "Fetch limits: {}s timeout, {}s connect timeout, {} byte bodies, proxy {}",
        config.fetch_timeout_secs,
        config.connect_timeout_secs,
        config.max_body_bytes,
        config.outbound_proxy.as_deref().unwrap_or("none")
    );

    serve(config, async {
        let reason = stop_requested().await;
        logf!(Info, "Received {}, finishing in-flight fetches", reason);
    })
    .await?;

    logf!(Info, "Shut down cleanly");

    Ok(())
}

/// Waits for Ctrl+C or, on unix, SIGTERM and names the one that arrived. A signal that cannot
/// be listened for is logged and never fires, so the relay keeps serving.
async fn stop_requested() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            logf!(Error, "Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                logf!(Error, "Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    }
}

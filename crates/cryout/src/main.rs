use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cryout_core::{classify::Classifier, config::Config};
use cryout_openai::OpenAiClassifier;

#[tokio::main]
async fn main() -> Result<(), cryout_core::Error> {
    cryout_core::logging::init("cryout")?;

    let cfg = Arc::new(Config::load()?);
    let classifier: Arc<dyn Classifier> = Arc::new(OpenAiClassifier::new(&cfg));

    let cancel = CancellationToken::new();
    tokio::spawn(handle_signals(cancel.clone()));

    cryout_telegram::router::run(cfg, classifier, cancel)
        .await
        .map_err(|e| cryout_core::Error::GatewaySetup(format!("telegram bot failed: {e}")))?;

    tracing::info!("bot shut down gracefully");
    Ok(())
}

async fn handle_signals(cancel: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, exiting");
    cancel.cancel();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = cofre::cli::commands::run().await {
        if !matches!(err, cofre::core::errors::CofreError::Config(_)) {
            tracing::debug!(error = ?err, "cofre command failed");
        } else {
            tracing::debug!("cofre command failed with redacted configuration error");
        }
        std::process::exit(1);
    }
}

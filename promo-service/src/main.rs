use promo_service::{
    config::PromoConfig,
    services::metrics::init_metrics,
    startup::Application,
    utils::{hash_password, Password},
};
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // `promo-service hash-password <password>` prints an ADMIN_PASSWORD_HASH value.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, password] = args.as_slice() {
        if command == "hash-password" {
            let hash = hash_password(&Password::new(password.clone()))?;
            println!("{}", hash.as_str());
            return Ok(());
        }
    }

    // Load configuration - fail fast if invalid
    let config = PromoConfig::load()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        storage = ?config.storage.backend,
        applier = ?config.applier.mode,
        "Starting promo service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

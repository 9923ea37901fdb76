use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use speech_relay::config_loader::{load_config, CONFIG_FILE_PATH};
use speech_relay::config_validator::RelayConfigValidator;
use speech_relay::{
    configure, create_metrics_exporter, Credentials, GoogleSpeechClient, HandlerConfig, Metrics,
    MetricsConfig, ServerConfig, ServiceConfig, TranscriptionRelay,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if std::env::args().any(|arg| arg == "--generate-config") {
        print!("{}", RelayConfigValidator::generate_sample_config());
        return Ok(());
    }

    if !load_config() {
        info!(
            "No {} found, using environment and defaults",
            CONFIG_FILE_PATH
        );
    }

    let validation = RelayConfigValidator::validate_env();
    validation.print_summary();
    if !validation.is_valid() {
        error!("Invalid configuration, refusing to start");
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "invalid configuration",
        ));
    }

    // Load configurations
    let server_config = ServerConfig::default();
    let handler_config = HandlerConfig::default();
    let service_config = ServiceConfig::default();
    let metrics_config = MetricsConfig::default();

    if let Err(e) = handler_config.ensure_upload_dir() {
        warn!(
            "Failed to create upload directory {}: {}",
            handler_config.upload_dir, e
        );
    }

    let credentials = match Credentials::from_file(Path::new(&service_config.credentials_file)) {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(
                "{}; calls to the recognition service will be unauthenticated",
                e
            );
            Credentials::Anonymous
        }
    };
    info!("Recognition credentials: {}", credentials.describe());

    let client =
        GoogleSpeechClient::new(&service_config, credentials).map_err(std::io::Error::other)?;
    info!("Recognition endpoint: {}", client.endpoint());

    let relay = web::Data::new(TranscriptionRelay::new(
        Arc::new(client),
        service_config.timeout,
    ));
    let handler_data = web::Data::new(handler_config.clone());

    // Initialize metrics
    let metrics = Metrics::new(create_metrics_exporter(&metrics_config.exporter_type));

    let bind_address = server_config.bind_address();
    info!("Starting speech relay on http://{}", bind_address);
    info!("Using upload directory: {}", handler_config.upload_dir);
    info!("Default language: {}", handler_config.default_language);
    match service_config.timeout {
        Some(timeout) => info!("Recognition deadline: {}s", timeout.as_secs()),
        None => info!("Recognition deadline disabled"),
    }
    info!("Metrics exporter: {}", metrics_config.exporter_type);

    let enable_cors = server_config.enable_cors;
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(enable_cors, Cors::permissive()))
            .wrap(Logger::default())
            .app_data(relay.clone())
            .app_data(handler_data.clone())
            .app_data(web::Data::new(metrics.clone()))
            .configure(configure)
    })
    .client_disconnect_timeout(server_config.timeout)
    .keep_alive(server_config.keep_alive);

    if server_config.workers > 0 {
        server = server.workers(server_config.workers);
    }

    server.bind(bind_address)?.run().await
}

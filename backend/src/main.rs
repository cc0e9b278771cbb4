use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::env;
use symptom_tracker::artifact::ArtifactBundle;
use symptom_tracker::config::AppConfig;
use symptom_tracker::inference::PredictionService;
use symptom_tracker::routes::{configure_routes, RouteConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(format!("Configuration failed: {}", e))
    })?;

    log::info!("Loading pipeline from {}", config.pipeline_path.display());
    let bundle = ArtifactBundle::load(&config.pipeline_path).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;

    log::info!(
        "Loaded {} pipeline: {} features, {} classes, sha256 {}",
        bundle.pipeline().estimator_name(),
        bundle.pipeline().feature_names().len(),
        bundle.label_encoder().len(),
        bundle.fingerprint()
    );
    for (key, value) in bundle.metadata() {
        log::info!("Artifact {}: {}", key, value);
    }

    let service = PredictionService::new(bundle);
    let route_config = RouteConfig {
        payload_limit: config.payload_limit,
    };

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .expose_headers(vec![shared::REQUEST_ID_HEADER, shared::ERROR_KIND_HEADER])
                    .max_age(3600),
            )
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(route_config.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

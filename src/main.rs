use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use noticeboard::auth::{self, AuthSetupError, Provider, TokenValidator};
use noticeboard::config::Config;
use noticeboard::db::{Store, StoreSetupError};
use noticeboard::routes;
use std::fmt;

/// Startup runs in order: database first, identity provider second. When a
/// step fails the server still binds, but in a degraded state where every
/// route answers the opaque 500 contract; the failure is logged with a
/// machine-readable code operators can alert on.
#[derive(Debug)]
enum StartupError {
    Database(StoreSetupError),
    IdentityProvider(AuthSetupError),
}

impl StartupError {
    fn code(&self) -> u32 {
        match self {
            StartupError::Database(_) => 10001,
            StartupError::IdentityProvider(_) => 10002,
        }
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Database(error) => write!(f, "{}", error),
            StartupError::IdentityProvider(error) => write!(f, "{}", error),
        }
    }
}

async fn start_up(config: &Config) -> Result<(Store, TokenValidator, Provider), StartupError> {
    let store = Store::connect(config).await.map_err(StartupError::Database)?;
    let (validator, provider) = auth::initialize(config)
        .await
        .map_err(StartupError::IdentityProvider)?;
    Ok((store, validator, provider))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let bind_address = (config.server_host.clone(), config.server_port);

    match start_up(&config).await {
        Ok((store, validator, provider)) => {
            log::info!("Starting noticeboard server at {}", config.server_url());

            let config = web::Data::new(config);
            let store = web::Data::new(store);
            let validator = web::Data::new(validator);
            let provider = web::Data::new(provider);

            HttpServer::new(move || {
                App::new()
                    .app_data(config.clone())
                    .app_data(store.clone())
                    .app_data(validator.clone())
                    .app_data(provider.clone())
                    .wrap(cors(&config.allowed_origin))
                    .wrap(Logger::default())
                    .service(routes::health::health)
                    .service(web::scope(&config.api_prefix).configure(routes::config))
            })
            .bind(bind_address)?
            .run()
            .await
        }
        Err(error) => {
            log::error!("[{}] {}", error.code(), error);
            log::error!("Starting in a degraded state; every route answers an opaque 500");

            HttpServer::new(move || App::new().wrap(Logger::default()).configure(routes::degraded))
                .bind(bind_address)?
                .run()
                .await
        }
    }
}

fn cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

mod api;
mod dao;
mod model;
mod service;

use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use std::time::Duration;
use std::thread;

use crate::api::endpoints;
use crate::api::middleware::timing_middleware;
use crate::api::state::AppState;
use crate::dao::memory::MemoryShipDao;
use crate::dao::ships::ShipDao;
use crate::dao::ConfiguredShipStore;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Config, DatabaseType, HttpsConfig, LoggingConfig};
use crate::service::ships::ShipService;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use rustls::pki_types::PrivateKeyDer;
use rustls::{ServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, pkcs8_private_keys};
use sqlx::{Pool, Postgres, pool};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Starts the ships api.
 */
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    init_tracing(&config.logging)?;

    let prometheus = PrometheusMetricsBuilder::new("")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    let ship_store = match config.clone().database.db_type {
        DatabaseType::Postgresql { connection_string, max_connections, min_connections, acquire_timeout, acquire_slow_threshold, idle_timeout, max_lifetime } => {
            let connection_pool: Pool<Postgres> = pool::PoolOptions::new()
                .max_connections(max_connections)
                .min_connections(min_connections)
                .acquire_timeout(Duration::from_millis(acquire_timeout))
                .acquire_slow_threshold(Duration::from_millis(acquire_slow_threshold))
                .idle_timeout(Duration::from_millis(idle_timeout))
                .max_lifetime(Duration::from_millis(max_lifetime))
                .connect(connection_string.as_str())
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?;
            sqlx::migrate!("./sqlx-postgresql-migration/migrations")
                .run(&connection_pool)
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to run database migrations: {err}")))?;
            register_db_metrics(&prometheus, connection_pool.clone())?;
            ConfiguredShipStore::Postgresql(ShipDao::new(connection_pool))
        }
        DatabaseType::Memory => {
            tracing::warn!("Using in-memory ship store, ships are lost on shutdown");
            ConfiguredShipStore::Memory(MemoryShipDao::new())
        }
    };

    let ship_service = ShipService::new(ship_store);
    let state = web::Data::new(AppState::new(ship_service));

    let server_init = HttpServer::new(move || {
        App::new()
            .wrap(prometheus.clone())
            .wrap(from_fn(timing_middleware))
            .app_data(state.clone())
            .configure(endpoints::configure)
    });

    let address = config.server.address.clone();
    let server_init = if let Some(http_port) = &config.server.http_port { server_init.bind((address.as_str(), *http_port))? } else { server_init };
    let server_init = if let Some(https_config) = &config.server.https_config {
        let ssl_config = ssl_builder(https_config).map_err(|err| std::io::Error::other(format!("Failed to create SSL/TLS configuration: {err}")))?;
        server_init.bind_rustls_0_23((address.as_str(), https_config.port), ssl_config).map_err(|err| std::io::Error::other(format!("Failed to bind HTTPS server: {err}")))?
    } else {
        server_init
    };

    tracing::info!("Starting ships api with {} workers", config.server.workers);
    server_init.workers(config.server.workers).run().await
}

/**
 * Initializes logging for the application.
 *
 * #Arguments
 * `logging`: The logging configuration.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut env_filter = EnvFilter::from_default_env();
    for directive in &logging.directives {
        env_filter = env_filter.add_directive(directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file);

    let file_layer = match &logging.logfile {
        Some(logfile) => {
            let log_file: File = OpenOptions::new().create(true).append(true).open(logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {logfile}: {err}")))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(logging.target)
                    .with_thread_ids(logging.thread_ids)
                    .with_thread_names(logging.thread_names)
                    .with_line_number(logging.line_number)
                    .with_level(logging.level)
                    .with_ansi(false)
                    .with_file(logging.file)
                    .with_writer(Mutex::new(log_file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(env_filter).with(stdout_layer).with(file_layer).init();

    Ok(())
}

/**
 * Registers connection pool gauges and keeps them updated from a separate thread.
 *
 * #Arguments
 * `prometheus_metrics`: The Prometheus metrics instance to register the gauges with.
 * `connection_pool`: The connection pool to gather metrics from.
 */
fn register_db_metrics(prometheus_metrics: &PrometheusMetrics, connection_pool: Pool<Postgres>) -> Result<(), std::io::Error> {
    let max_connections_gauge = register_gauge(prometheus_metrics, "max_connections", "Connection pool maximum")?;
    let min_connections_gauge = register_gauge(prometheus_metrics, "min_connections", "Connection pool minimum")?;
    let active_connections_gauge = register_gauge(prometheus_metrics, "active_connections", "Connection pool active")?;
    let idle_connections_gauge = register_gauge(prometheus_metrics, "idle_connections", "Connection pool idle")?;
    thread::spawn(move || {
        loop {
            max_connections_gauge.set(i64::from(connection_pool.options().get_max_connections()));
            min_connections_gauge.set(i64::from(connection_pool.options().get_min_connections()));
            active_connections_gauge.set(i64::from(connection_pool.size()));
            idle_connections_gauge.set(i64::try_from(connection_pool.num_idle()).unwrap_or(i64::MAX));
            thread::sleep(Duration::from_secs(1));
        }
    });
    Ok(())
}

/**
 * Creates a gauge and registers it with the Prometheus registry.
 */
fn register_gauge(prometheus_metrics: &PrometheusMetrics, name: &str, help: &str) -> Result<IntGauge, std::io::Error> {
    let gauge = IntGauge::new(name, help).map_err(|err| std::io::Error::other(format!("Failed to create {name} gauge: {err}")))?;
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge {name}: {err}")))?;
    Ok(gauge)
}

/**
 * Initializes the SSL/TLS configuration for the server.
 *
 * #Arguments
 * `https_config`: The HTTPS configuration containing the certificate and private key files.
 *
 * #Returns
 * A `Result` containing the initialized `ServerConfig` or an `ApplicationError` if initialization fails.
 */
fn ssl_builder(https_config: &HttpsConfig) -> Result<ServerConfig, ApplicationError> {
    let initialization_error = |message: String| ApplicationError::new(ErrorType::Initialization, message);
    let cert_file = &mut std::io::BufReader::new(File::open(&https_config.certificate_file).map_err(|err| initialization_error(format!("Failed to read certificate file: {err}")))?);
    let key_file = &mut std::io::BufReader::new(File::open(&https_config.private_key_file).map_err(|err| initialization_error(format!("Failed to read private key file: {err}")))?);
    let cert_chain = certs(cert_file).collect::<Result<Vec<_>, _>>().map_err(|err| initialization_error(format!("Failed to convert certificate to der: {err}")))?;
    let private_key = pkcs8_private_keys(key_file)
        .next()
        .ok_or_else(|| initialization_error("No private key found".to_string()))?
        .map_err(|err| initialization_error(format!("Failed to convert private key to der: {err}")))?;
    ServerConfig::builder_with_protocol_versions(&get_protocol_versions())
        .with_no_client_auth()
        .with_single_cert(cert_chain, PrivateKeyDer::Pkcs8(private_key))
        .map_err(|err| initialization_error(format!("Failed to create server config: {err}")))
}

/**
 * Returns the supported TLS protocol versions.
 */
fn get_protocol_versions() -> Vec<&'static SupportedProtocolVersion> {
    vec![&rustls::version::TLS13]
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_config_missing_file() {
        assert!(get_config("./does/not/exist.toml").is_err());
    }

    #[test]
    fn test_get_config_example() {
        let config = get_config("./config/ships_api.toml").unwrap();
        assert_eq!(config.database.db_type, DatabaseType::Memory);
    }

    #[test]
    fn test_ssl_builder_missing_files() {
        let https_config = HttpsConfig { port: 8443, certificate_file: "./missing.pem".to_string(), private_key_file: "./missing.key".to_string() };
        let err = ssl_builder(&https_config).unwrap_err();
        assert_eq!(err.error_type, ErrorType::Initialization);
    }
}

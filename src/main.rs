use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing::{info, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

use crate::{
    config::Config,
    db::init_db,
    docs::ApiDoc,
    service::employee::ensure_admin,
    store::{Store, mysql::MySqlStore},
    utils::{
        clock::{Clock, SystemClock},
        email_registry::EmailRegistry,
        evidence::{EvidenceStore, LocalEvidenceStore},
        notifier::{LogResetNotifier, ResetNotifier},
    },
};

const REGISTRY_WARMUP_BATCH: usize = 500;

/// Rolling daily log file; `RUST_LOG` overrides the configured level.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    guard
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _guard = init_tracing(&config);

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections).await?;

    let store: Data<dyn Store> = Data::from(Arc::new(MySqlStore::new(pool)) as Arc<dyn Store>);
    let evidence: Data<dyn EvidenceStore> =
        Data::from(Arc::new(LocalEvidenceStore::new(&config.upload_dir)) as Arc<dyn EvidenceStore>);
    let notifier: Data<dyn ResetNotifier> =
        Data::from(Arc::new(LogResetNotifier) as Arc<dyn ResetNotifier>);
    let clock: Data<dyn Clock> = Data::from(Arc::new(SystemClock) as Arc<dyn Clock>);
    let registry = Data::new(EmailRegistry::new());

    if let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) {
        ensure_admin(store.get_ref(), &registry, email, password)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    {
        let store = store.clone();
        let registry = registry.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = registry
                .warmup(store.get_ref(), REGISTRY_WARMUP_BATCH)
                .await
            {
                warn!(error = %e, "Failed to warm up email registry");
            }
        });
    }

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .app_data(evidence.clone())
            .app_data(notifier.clone())
            .app_data(clock.clone())
            .app_data(registry.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use services::asset_store::{AssetStore, CloudinaryStore};
use services::mailer::{Mailer, SmtpMailer};

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %err, "{}", context);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings = Settings::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;

    // RUST_LOG prioritaire, sinon LOG_LEVEL
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .init();

    tracing::info!("Connecting to database...");
    let db = db::establish_connection(&settings.database)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;
    tracing::info!("Database connected");

    if settings.database.auto_migrate {
        db::create_schema(&db)
            .await
            .map_err(|e| startup_error("Failed to create schema", e))?;
    }

    tokio::fs::create_dir_all(&settings.uploads.temp_dir).await?;

    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::new(&settings.smtp).map_err(|e| startup_error("Invalid SMTP configuration", e))?);
    let store: Arc<dyn AssetStore> = Arc::new(CloudinaryStore::new(settings.cloudinary.clone()));

    let (host, port) = settings.bind_address();
    tracing::info!("Starting server on http://{}:{}", host, port);

    let db = web::Data::new(db);
    let settings = web::Data::new(settings);
    let mailer = web::Data::from(mailer);
    let store = web::Data::from(store);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(settings.clone())
            .app_data(mailer.clone())
            .app_data(store.clone())
            .configure(routes::configure_routes)
    })
    .bind((host, port))?
    .run()
    .await
}

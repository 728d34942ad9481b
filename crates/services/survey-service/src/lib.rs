//! Survey Service Library
//!
//! This crate provides CRUD over surveys, questions, answers and users via
//! gRPC, backed by PostgreSQL, MySQL or a local SQLite file.

pub mod config;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::config::SurveyServiceConfig;
use crate::grpc::SurveyGrpcService;
use crate::infra::{Database, SessionProvider};
use crate::service::SurveyManager;

/// Run the survey service on the given listener address.
pub async fn run_embedded(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = SurveyServiceConfig::from_env();
    run_server_with_config(host, port, config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = SurveyServiceConfig::from_env();
    let db = Database::connect(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Probe the store and create missing schema objects when it is reachable.
///
/// Never fails: an unreachable store or a failed migration is logged and the
/// service starts anyway, failing on first use instead.
pub async fn prepare_database(db: &Database, masked_url: &str) -> bool {
    if !db.probe(masked_url).await {
        tracing::warn!("Database unreachable, skipping schema creation");
        return false;
    }

    match db.run_migrations().await {
        Ok(()) => {
            info!("Database schema ready");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Schema creation failed");
            false
        }
    }
}

/// Run the gRPC server with the given configuration.
async fn run_server_with_config(
    host: &str,
    port: u16,
    config: SurveyServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.service.service_name,
        database = ?config.database,
        "Starting survey service"
    );

    // Initialize database
    let db = Database::connect(&config.database).await?;
    prepare_database(&db, &config.database.masked_url()).await;

    // Create session provider and service
    let sessions = SessionProvider::new(db.get_connection());
    let survey_service = Arc::new(SurveyManager::new(sessions));

    // Create gRPC service
    let grpc_service = SurveyGrpcService::new(survey_service);

    // Build address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Survey service listening on {}", addr);

    // Run server
    Server::builder()
        .add_service(proto::SurveyServiceServer::new(grpc_service))
        .serve(addr)
        .await?;

    Ok(())
}

//! Database connection and initialization.

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr, Statement,
};
use sea_orm_migration::MigratorTrait;

use common::DatabaseConfig;

use super::migrations::Migrator;

/// Database wrapper for connection management
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
    local: bool,
}

impl Database {
    /// Open the connection pool without touching the schema.
    ///
    /// Remote pools connect lazily so that an unreachable server is reported
    /// by [`Database::probe`] instead of failing here.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging(false)
            .connect_lazy(!config.is_local());

        let connection = SeaDatabase::connect(options).await?;
        Ok(Self {
            connection,
            local: config.is_local(),
        })
    }

    /// Wrap an already open connection (tests, embedding).
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        let local = matches!(
            connection.get_database_backend(),
            sea_orm::DatabaseBackend::Sqlite
        );
        Self { connection, local }
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Get a clone of the database connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    /// Check that the store is reachable, logging the outcome.
    ///
    /// The local SQLite store is always considered reachable.
    pub async fn probe(&self, masked_url: &str) -> bool {
        if self.local {
            tracing::info!(url = %masked_url, "Using local database");
            return true;
        }

        tracing::info!(url = %masked_url, "Probing remote database");
        match self.ping().await {
            Ok(()) => {
                tracing::info!("Remote database connection OK");
                true
            }
            Err(e) => {
                tracing::error!(url = %masked_url, error = %e, "Could not connect to remote database");
                false
            }
        }
    }

    /// Run pending migrations.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Get migration status (list all migrations with applied status).
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        use sea_orm::{EntityTrait, QueryOrder};
        use sea_orm_migration::seaql_migrations;

        // Get applied migrations from database
        let applied: std::collections::HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        // Map all defined migrations with their applied status
        let migrations: Vec<(String, bool)> = Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect();

        Ok(migrations)
    }

    /// Reset database and run all migrations fresh.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

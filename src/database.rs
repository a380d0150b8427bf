use color_eyre::{Result, eyre::Context};
use migration::MigratorTrait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection,
    DatabaseTransaction, TransactionError, TransactionTrait,
};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Process-scoped store handle. Opened once in `main`, shared by `Arc`.
pub struct Database {
    pub conn: DatabaseConnection,
    writer: Mutex<()>,
}

impl Database {
    /// Open or create a database at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        log::debug!("Opening database at: {}", path.display());

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create database directory: {}",
                parent.display()
            ))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(16)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .context(format!("Failed to open database: {}", path.display()))?;

        let database = Self::from_connection(conn).await?;
        log::info!("Database ready at: {}", path.display());
        Ok(database)
    }

    /// Wrap an existing connection: enable foreign keys and run migrations.
    pub async fn from_connection(conn: DatabaseConnection) -> Result<Self> {
        conn.execute_unprepared("PRAGMA foreign_keys = ON")
            .await
            .context("Failed to enable foreign keys")?;

        log::debug!("Running database migrations");
        migration::Migrator::up(&conn, None)
            .await
            .context("Failed to run database migrations")?;

        Ok(Database {
            conn,
            writer: Mutex::new(()),
        })
    }

    /// Run `callback` in a transaction while holding the writer lock.
    ///
    /// SQLite refuses to upgrade a deferred transaction that has already read
    /// into a writer while another connection holds the write lock, so
    /// read-then-write transactions from this process take turns here.
    pub async fn write<F, T>(&self, callback: F) -> Result<T, TransactionError<AppError>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'c>>
            + Send,
        T: Send,
    {
        let _writer = self.writer.lock().await;
        self.conn.transaction(callback).await
    }

    /// Close the pool. Called once on shutdown.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .context("Failed to close database connection")?;
        log::debug!("Database connection closed");
        Ok(())
    }
}

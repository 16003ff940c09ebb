//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  portal-api startup                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │            SqlitePool                   │                            │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐        │                            │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...    │  (max_connections)         │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘        │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       │ Concurrent HTTP requests                                        │
//! │       ▼                                                                 │
//! │  POST /applications ──► uses Conn1                                      │
//! │  GET  /track/...    ──► uses Conn2                                      │
//! │  POST /bills        ──► uses Conn3                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers never wait for the single writer. Writers queue on the write
//! lock for up to `busy_timeout` before the statement fails.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::application::ApplicationRepository;
use crate::repository::bill::BillRepository;
use crate::repository::complaint::ComplaintRepository;
use crate::repository::sequence::SequenceRepository;
use crate::repository::tariff::TariffRepository;
use crate::repository::tracking::{self, Tracking};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/portal/portal.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 8
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a writer waits on the SQLite write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the write-lock wait.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Isolated database, gone when the pool closes
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: every clone shares the same pool, and each repository
/// accessor hands out a repository over a clone of it.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn track(State(state): State<AppState>, Path(reference): Path<String>)
///     -> Result<Json<Tracking>, ApiError>
/// {
///     Ok(Json(state.db.track(&reference).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    ///    - Busy timeout for queued writers
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path?mode=rwc creates the file if it does not exist
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let mut connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        // WAL needs a file; an in-memory database keeps its default journal
        if !config.is_in_memory() {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods; every write that needs to be atomic
    /// already has one.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the application repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let application = db.applications().get("NC2025000001").await?;
    /// ```
    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository::new(self.pool.clone())
    }

    /// Returns the complaint repository.
    pub fn complaints(&self) -> ComplaintRepository {
        ComplaintRepository::new(self.pool.clone())
    }

    /// Returns the tariff repository.
    pub fn tariffs(&self) -> TariffRepository {
        TariffRepository::new(self.pool.clone())
    }

    /// Returns the bill repository.
    pub fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }

    /// Returns the reference-sequence counters.
    pub fn sequences(&self) -> SequenceRepository {
        SequenceRepository::new(self.pool.clone())
    }

    /// Current status and stage history for any application or complaint
    /// reference number.
    ///
    /// ## Errors
    /// - Unparseable reference → `Core(MalformedReference)`
    /// - Bill numbers and unknown references → `NotFound`
    pub async fn track(&self, reference_number: &str) -> DbResult<Tracking> {
        tracking::track(&self.applications(), &self.complaints(), reference_number).await
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Database health check failed");
                false
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::application::{NewApplication, StageUpdate};
    use crate::repository::complaint::NewComplaint;
    use chrono::{TimeZone, Utc};
    use portal_core::reference::ReferenceKind;
    use portal_core::{
        ApplicantDetails, ApplicationPayload, ApplicationStatus, ComplaintCategory,
        ContactDetails, CoreError, PremisesAddress, ServiceType,
    };

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/portal-test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_track_dispatches_on_prefix() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();

        let application = db
            .applications()
            .submit(
                NewApplication {
                    service_type: ServiceType::Gas,
                    payload: ApplicationPayload::CylinderBooking {
                        applicant: ApplicantDetails {
                            full_name: "Meera Nair".to_string(),
                            phone: "9123456780".to_string(),
                            email: None,
                        },
                        consumer_number: "GAS-778899".to_string(),
                        cylinder_count: 1,
                        delivery_address: PremisesAddress {
                            line1: "4 Lake View".to_string(),
                            line2: None,
                            city: "Kochi".to_string(),
                            pin_code: "682001".to_string(),
                        },
                    },
                    documents: Vec::new(),
                },
                now,
            )
            .await
            .unwrap();
        db.applications()
            .append_stage(
                &application.reference_number,
                StageUpdate::to(ApplicationStatus::Approved),
                now,
            )
            .await
            .unwrap();

        let complaint = db
            .complaints()
            .file(
                NewComplaint {
                    service_type: ServiceType::Gas,
                    category: ComplaintCategory::GasLeak,
                    requested_priority: None,
                    description: "Smell of gas near the meter".to_string(),
                    contact: ContactDetails {
                        name: "Meera Nair".to_string(),
                        phone: "9123456780".to_string(),
                        email: None,
                        address: "4 Lake View, Kochi".to_string(),
                        consumer_number: None,
                    },
                },
                now,
            )
            .await
            .unwrap();

        let tracked = db.track("cb2025000001").await.unwrap();
        assert_eq!(tracked.reference_number, "CB2025000001");
        assert_eq!(tracked.kind, ReferenceKind::CylinderBooking);
        assert_eq!(tracked.status, "approved");
        assert_eq!(tracked.stage_history.len(), 2);

        let tracked = db.track(&complaint.reference_number).await.unwrap();
        assert_eq!(tracked.kind, ReferenceKind::Complaint);
        assert_eq!(tracked.status, "open");
        assert_eq!(tracked.stage_history[0].stage_name, "Complaint Registered");

        assert!(matches!(
            db.track("BL2025000001").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.track("NC2025000404").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.track("XX-1").await,
            Err(DbError::Core(CoreError::MalformedReference(_)))
        ));
    }
}

pub mod ledger;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::StorageError;

pub use ledger::{BookingLedger, CancelOutcome, Requester, ReserveOutcome};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Self::connect(options, max_connections).await
    }

    pub async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, StorageError> {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        // Таблица пользователей
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                first_name TEXT NOT NULL,
                phone TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Записи не удаляются: отменённые и завершённые остаются для истории
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users (user_id),
                booking_date TEXT NOT NULL,
                booking_time TEXT NOT NULL,
                service TEXT NOT NULL,
                category_key TEXT,
                service_key TEXT,
                phone TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'cancelled', 'completed')),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookings_slot ON bookings (booking_date, booking_time, status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings (user_id, status)",
        )
        .execute(&self.pool)
        .await?;

        // Одна активная запись пользователя на слот
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_user_slot
            ON bookings (booking_date, booking_time, user_id)
            WHERE status = 'active'
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

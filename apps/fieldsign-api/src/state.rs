//! Application state for the FieldSign API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::storage::{FsStorage, ObjectStorage};

pub struct AppState {
    pub db: SqlitePool,
    pub storage: Arc<dyn ObjectStorage>,
    /// Script face bytes for server-rendered typed signatures
    pub script_face: Option<Vec<u8>>,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        // Get database path from env or use default
        let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let data_dir = data_dir();
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/fieldsign.db?mode=rwc", data_dir.display())
        });

        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        Self::run_migrations(&pool).await?;

        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir().join("objects"));
        tracing::info!("Storing artifacts under {}", storage_dir.display());

        let script_face = match std::env::var("SIGNATURE_FONT_PATH") {
            Ok(path) => Some(
                std::fs::read(&path)
                    .with_context(|| format!("failed to read signature font {}", path))?,
            ),
            Err(_) => {
                tracing::warn!(
                    "SIGNATURE_FONT_PATH not set; typed signatures will be rejected"
                );
                None
            }
        };

        Ok(Self {
            db: pool,
            storage: Arc::new(FsStorage::new(storage_dir)),
            script_face,
        })
    }

    /// State over an in-memory database and injectable storage, for tests
    #[cfg(test)]
    pub async fn for_tests(storage: Arc<dyn ObjectStorage>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(Self {
            db: pool,
            storage,
            script_face: None,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                file_path TEXT NOT NULL,
                signed_file_path TEXT,
                sender_id TEXT NOT NULL,
                recipient_email TEXT,
                status TEXT NOT NULL DEFAULT 'pending_setup',
                signature_areas_json TEXT NOT NULL DEFAULT '[]',
                public_link TEXT UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                signed_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Indexes for the two lookup paths: owner listing and sign links
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_sender ON documents(sender_id)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_public_link ON documents(public_link)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

/// Get platform-specific data directory
fn data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/fieldsign-api"))
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("fieldsign-api"))
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        std::env::var("APPDATA")
            .map(|p| PathBuf::from(p).join("fieldsign-api"))
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL backend for the persisted status-record tier.
//!
//! One row per product:
//! ```sql
//! CREATE TABLE product_status (
//!   product_id VARCHAR(255) PRIMARY KEY,
//!   has_remote_content INTEGER NOT NULL,
//!   has_recognized_layout INTEGER NOT NULL,
//!   has_draft INTEGER NOT NULL,
//!   section_count INTEGER NOT NULL,
//!   last_remote_check BIGINT NOT NULL
//! )
//! ```
//!
//! Uses sqlx's `Any` driver so SQLite (embedded) and MySQL (shared) both
//! work from one connection string. Booleans are stored as INTEGER 0/1
//! because the `Any` driver has no portable boolean mapping.

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use std::sync::Once;
use std::time::Duration;
use tracing::info;

use crate::status::record::StatusRecord;

use super::traits::{StatusStore, StoreError};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

pub struct SqlStatusStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlStatusStore {
    /// Connect and create the schema if missing.
    pub async fn new(connection_string: &str) -> Result<Self, StoreError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");
        // In-memory SQLite gives each pooled connection its own database;
        // a single connection keeps the schema visible.
        let max_connections = if connection_string.contains(":memory:") { 1 } else { 10 };

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .connect(connection_string)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self { pool, is_sqlite };

        if is_sqlite {
            store.enable_wal_mode().await?;
        }
        store.init_schema().await?;

        info!(sqlite = is_sqlite, "Status store connected");
        Ok(store)
    }

    /// Get a clone of the connection pool for sharing with other stores.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    /// WAL mode: concurrent reads during writes, single fsync per commit.
    async fn enable_wal_mode(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let sql = if self.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS product_status (
                product_id TEXT PRIMARY KEY,
                has_remote_content INTEGER NOT NULL DEFAULT 0,
                has_recognized_layout INTEGER NOT NULL DEFAULT 0,
                has_draft INTEGER NOT NULL DEFAULT 0,
                section_count INTEGER NOT NULL DEFAULT 0,
                last_remote_check INTEGER NOT NULL DEFAULT 0
            )
            "#
        } else {
            r#"
            CREATE TABLE IF NOT EXISTS product_status (
                product_id VARCHAR(255) PRIMARY KEY,
                has_remote_content INTEGER NOT NULL DEFAULT 0,
                has_recognized_layout INTEGER NOT NULL DEFAULT 0,
                has_draft INTEGER NOT NULL DEFAULT 0,
                section_count INTEGER NOT NULL DEFAULT 0,
                last_remote_check BIGINT NOT NULL DEFAULT 0
            )
            "#
        };

        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }

    fn row_to_record(row: &sqlx::any::AnyRow) -> Result<StatusRecord, StoreError> {
        let product_id: String = row
            .try_get("product_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let has_remote_content: i64 = row
            .try_get("has_remote_content")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let has_recognized_layout: i64 = row
            .try_get("has_recognized_layout")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let has_draft: i64 = row
            .try_get("has_draft")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let section_count: i64 = row
            .try_get("section_count")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let last_remote_check: i64 = row
            .try_get("last_remote_check")
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(StatusRecord {
            product_id,
            has_remote_content: has_remote_content != 0,
            has_recognized_layout: has_recognized_layout != 0,
            has_draft: has_draft != 0,
            section_count: section_count.max(0) as usize,
            last_remote_check,
        })
    }
}

#[async_trait]
impl StatusStore for SqlStatusStore {
    async fn load(&self, product_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT product_id, has_remote_content, has_recognized_layout, \
             has_draft, section_count, last_remote_check \
             FROM product_status WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &StatusRecord) -> Result<(), StoreError> {
        // Upsert syntax differs between SQLite and MySQL under the Any driver.
        let sql = if self.is_sqlite {
            "INSERT INTO product_status \
             (product_id, has_remote_content, has_recognized_layout, has_draft, section_count, last_remote_check) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(product_id) DO UPDATE SET \
             has_remote_content = excluded.has_remote_content, \
             has_recognized_layout = excluded.has_recognized_layout, \
             has_draft = excluded.has_draft, \
             section_count = excluded.section_count, \
             last_remote_check = excluded.last_remote_check"
        } else {
            "INSERT INTO product_status \
             (product_id, has_remote_content, has_recognized_layout, has_draft, section_count, last_remote_check) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
             has_remote_content = VALUES(has_remote_content), \
             has_recognized_layout = VALUES(has_recognized_layout), \
             has_draft = VALUES(has_draft), \
             section_count = VALUES(section_count), \
             last_remote_check = VALUES(last_remote_check)"
        };

        sqlx::query(sql)
            .bind(&record.product_id)
            .bind(record.has_remote_content as i64)
            .bind(record.has_recognized_layout as i64)
            .bind(record.has_draft as i64)
            .bind(record.section_count as i64)
            .bind(record.last_remote_check)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn invalidate(&self, product_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM product_status WHERE product_id = ?")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::record::now_millis;

    async fn memory_store() -> SqlStatusStore {
        SqlStatusStore::new("sqlite::memory:")
            .await
            .expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = memory_store().await;
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = memory_store().await;

        let mut record = StatusRecord::new("prod-42");
        record.has_remote_content = true;
        record.has_recognized_layout = true;
        record.section_count = 3;
        record.last_remote_check = now_millis();

        store.save(&record).await.unwrap();
        let loaded = store.load("prod-42").await.unwrap().unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let store = memory_store().await;

        let mut record = StatusRecord::new("prod-1");
        record.section_count = 1;
        store.save(&record).await.unwrap();

        record.section_count = 5;
        record.has_draft = true;
        store.save(&record).await.unwrap();

        let loaded = store.load("prod-1").await.unwrap().unwrap();
        assert_eq!(loaded.section_count, 5);
        assert!(loaded.has_draft);
    }

    #[tokio::test]
    async fn test_invalidate_removes_row() {
        let store = memory_store().await;

        store.save(&StatusRecord::new("prod-1")).await.unwrap();
        store.invalidate("prod-1").await.unwrap();

        assert!(store.load("prod-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_missing_is_ok() {
        let store = memory_store().await;
        assert!(store.invalidate("never-existed").await.is_ok());
    }
}

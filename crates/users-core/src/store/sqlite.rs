//! SQLite-backed principal and device store

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{DeviceStore, PrincipalStore};
use crate::types::{Device, NewDevice, NewPrincipal, Principal};
use crate::{Error, Result};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        device_id TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_devices_user_id ON devices(user_id)",
];

const PRINCIPAL_COLUMNS: &str = "id, email, password_hash, is_admin, created_at";
const DEVICE_COLUMNS: &str = "id, name, device_id, user_id, created_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) and bring the schema up to date.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("Store ready at {}", database_url);
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn principal_from_row(row: &SqliteRow) -> Result<Principal> {
    Ok(Principal {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn device_from_row(row: &SqliteRow) -> Result<Device> {
    Ok(Device {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        device_id: row.try_get("device_id")?,
        owner_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PrincipalStore for SqliteStore {
    async fn create_principal(&self, principal: NewPrincipal) -> Result<Principal> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, is_admin, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&principal.email)
        .bind(&principal.password_hash)
        .bind(principal.is_admin)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::EmailAlreadyRegistered(principal.email.clone())
            } else {
                Error::Database(e)
            }
        })?;

        Ok(Principal {
            id: result.last_insert_rowid(),
            email: principal.email,
            password_hash: principal.password_hash,
            is_admin: principal.is_admin,
            created_at,
        })
    }

    async fn find_principal(&self, id: i64) -> Result<Option<Principal>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", PRINCIPAL_COLUMNS);
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(principal_from_row)
            .transpose()
    }

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", PRINCIPAL_COLUMNS);
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(principal_from_row)
            .transpose()
    }

    async fn count_devices(&self, owner_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM devices WHERE user_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }
}

#[async_trait]
impl DeviceStore for SqliteStore {
    async fn create_device(&self, device: NewDevice) -> Result<Device> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO devices (name, device_id, user_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&device.name)
        .bind(&device.device_id)
        .bind(device.owner_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DeviceIdTaken(device.device_id.clone())
            } else {
                Error::Database(e)
            }
        })?;

        Ok(Device {
            id: result.last_insert_rowid(),
            name: device.name,
            device_id: device.device_id,
            owner_id: device.owner_id,
            created_at,
        })
    }

    async fn find_owned_device(&self, id: i64, owner_id: i64) -> Result<Option<Device>> {
        let sql = format!("SELECT {} FROM devices WHERE id = ? AND user_id = ?", DEVICE_COLUMNS);
        sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(device_from_row)
            .transpose()
    }

    async fn find_owned_device_by_device_id(&self, device_id: &str, owner_id: i64) -> Result<Option<Device>> {
        let sql = format!(
            "SELECT {} FROM devices WHERE device_id = ? AND user_id = ?",
            DEVICE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(device_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(device_from_row)
            .transpose()
    }

    async fn list_owned_devices(&self, owner_id: i64) -> Result<Vec<Device>> {
        let sql = format!(
            "SELECT {} FROM devices WHERE user_id = ? ORDER BY id",
            DEVICE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(owner_id).fetch_all(&self.pool).await?;
        rows.iter().map(device_from_row).collect()
    }

    async fn delete_owned_device(&self, id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

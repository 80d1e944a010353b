/// Device key model and database operations
///
/// A device key authenticates one scanner kiosk and binds it to one gym.
/// The plaintext key is generated once at provisioning time; only its
/// SHA-256 hash is stored. Keys are revoked, never deleted, so the audit
/// trail of which device recorded which scan survives decommissioning.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE device_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     gym_id UUID NOT NULL REFERENCES gyms(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     key_hash CHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_used_at TIMESTAMPTZ,
///     revoked_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::device_key::generate_device_key;

/// Device key model representing one provisioned scanner
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceKey {
    /// Unique key ID
    pub id: Uuid,

    /// Gym this device belongs to
    pub gym_id: Uuid,

    /// Operator-facing device name (e.g., "front-desk-1")
    pub name: String,

    /// SHA-256 hash of the plaintext key (hex, 64 chars)
    #[serde(skip_serializing)]
    pub key_hash: String,

    /// When the key was provisioned
    pub created_at: DateTime<Utc>,

    /// Last time the key authenticated a request
    pub last_used_at: Option<DateTime<Utc>>,

    /// When the key was revoked; null while usable
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Input for provisioning a new device key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeviceKey {
    /// Gym the device belongs to
    pub gym_id: Uuid,

    /// Operator-facing device name
    pub name: String,
}

impl DeviceKey {
    /// Whether the key has been revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Provisions a new device key
    ///
    /// Returns the stored record together with the plaintext key. The
    /// plaintext cannot be recovered later; show it to the operator now.
    ///
    /// # Errors
    ///
    /// Returns an error if the gym doesn't exist or the database
    /// connection fails
    pub async fn create(
        pool: &PgPool,
        data: CreateDeviceKey,
    ) -> Result<(Self, String), sqlx::Error> {
        let (plaintext, hash) = generate_device_key();

        let key = sqlx::query_as::<_, DeviceKey>(
            r#"
            INSERT INTO device_keys (gym_id, name, key_hash)
            VALUES ($1, $2, $3)
            RETURNING id, gym_id, name, key_hash, created_at, last_used_at, revoked_at
            "#,
        )
        .bind(data.gym_id)
        .bind(data.name)
        .bind(hash)
        .fetch_one(pool)
        .await?;

        Ok((key, plaintext))
    }

    /// Finds a device key by the hash of its plaintext
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_hash(pool: &PgPool, key_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let key = sqlx::query_as::<_, DeviceKey>(
            r#"
            SELECT id, gym_id, name, key_hash, created_at, last_used_at, revoked_at
            FROM device_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(pool)
        .await?;

        Ok(key)
    }

    /// Records that the key just authenticated a request
    ///
    /// Best-effort bookkeeping; callers may ignore the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn touch(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE device_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Revokes a device key
    ///
    /// Returns true if the key existed and was not already revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE device_keys SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a gym's device keys, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_by_gym(pool: &PgPool, gym_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let keys = sqlx::query_as::<_, DeviceKey>(
            r#"
            SELECT id, gym_id, name, key_hash, created_at, last_used_at, revoked_at
            FROM device_keys
            WHERE gym_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(gym_id)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }
}

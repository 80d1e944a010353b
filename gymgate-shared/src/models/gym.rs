/// Gym model and database operations
///
/// Gyms are the tenant boundary: every member, membership, attendance
/// session and device key belongs to exactly one gym.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE gyms (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     settings JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Gym model representing one tenant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gym {
    /// Unique gym ID (UUID v4)
    pub id: Uuid,

    /// Display name of the gym
    pub name: String,

    /// Gym-specific configuration (JSONB)
    pub settings: JsonValue,

    /// When the gym was created
    pub created_at: DateTime<Utc>,

    /// When the gym was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new gym
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGym {
    /// Display name
    pub name: String,
}

impl Gym {
    /// Creates a new gym in the database
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create(pool: &PgPool, data: CreateGym) -> Result<Self, sqlx::Error> {
        let gym = sqlx::query_as::<_, Gym>(
            r#"
            INSERT INTO gyms (name)
            VALUES ($1)
            RETURNING id, name, settings, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(gym)
    }

    /// Finds a gym by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let gym = sqlx::query_as::<_, Gym>(
            r#"
            SELECT id, name, settings, created_at, updated_at
            FROM gyms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(gym)
    }

    /// Lists the ids of all gyms
    ///
    /// Used by the sweep worker to run the auto-checkout pass per tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM gyms ORDER BY created_at ASC")
            .fetch_all(pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

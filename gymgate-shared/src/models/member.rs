/// Member model and database operations
///
/// A member is a person enrolled at one gym, identified at the front desk
/// by a human-readable `member_code` (printed on badges and typed at the
/// kiosk) rather than the internal row id.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_status AS ENUM ('active', 'inactive', 'suspended');
///
/// CREATE TABLE members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     gym_id UUID NOT NULL REFERENCES gyms(id) ON DELETE CASCADE,
///     member_code VARCHAR(64) NOT NULL,
///     status member_status NOT NULL DEFAULT 'active',
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     phone VARCHAR(32),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT members_code_per_gym UNIQUE (gym_id, member_code)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use gymgate_shared::models::member::{CreateMember, Member};
/// use gymgate_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let member = Member::create(&pool, CreateMember {
///     gym_id: Uuid::new_v4(),
///     member_code: "MEM001".to_string(),
///     first_name: "Dana".to_string(),
///     last_name: "Park".to_string(),
///     phone: Some("+1-555-0100".to_string()),
/// }).await?;
///
/// // Kiosk lookup by code, status deliberately unfiltered
/// let found = Member::find_by_code(&pool, "MEM001", Some(member.gym_id)).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::Membership;

/// Member lifecycle status
///
/// Only `active` members may check in. The other states exist so the
/// kiosk can tell a member *why* their code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Member in good standing
    Active,

    /// Account closed or lapsed
    Inactive,

    /// Temporarily barred (e.g., unpaid dues)
    Suspended,
}

impl MemberStatus {
    /// Converts status to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Suspended => "suspended",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MemberStatus::Active),
            "inactive" => Some(MemberStatus::Inactive),
            "suspended" => Some(MemberStatus::Suspended),
            _ => None,
        }
    }
}

/// Member model representing one enrolled person
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    /// Unique member ID
    pub id: Uuid,

    /// Gym this member belongs to
    pub gym_id: Uuid,

    /// Human-readable code, unique within the gym
    pub member_code: String,

    /// Lifecycle status
    pub status: MemberStatus,

    /// Given name (used in kiosk greetings)
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Contact phone number
    pub phone: Option<String>,

    /// When the member was created
    pub created_at: DateTime<Utc>,

    /// When the member was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    /// Gym the member enrolls at
    pub gym_id: Uuid,

    /// Human-readable code, unique within the gym
    pub member_code: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Contact phone number
    pub phone: Option<String>,
}

impl Member {
    /// Full display name ("First Last")
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Creates a new member in the database
    ///
    /// New members start as `active`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code is already taken within the gym (unique constraint)
    /// - The gym doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateMember) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (gym_id, member_code, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, gym_id, member_code, status, first_name, last_name, phone,
                      created_at, updated_at
            "#,
        )
        .bind(data.gym_id)
        .bind(data.member_code)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    /// Finds a member by code, regardless of status
    ///
    /// The lookup is deliberately *not* filtered on status: the caller
    /// distinguishes "no such code" from "code exists but the member is
    /// suspended", which produces a usable message at an unattended kiosk.
    ///
    /// When `gym_id` is given, the lookup is scoped to that gym (the
    /// normal case: a scanner device only sees its own gym).
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, gym_id, member_code, status, first_name, last_name, phone,
                   created_at, updated_at
            FROM members
            WHERE member_code = $1
              AND ($2::uuid IS NULL OR gym_id = $2)
            "#,
        )
        .bind(code)
        .bind(gym_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Finds a member by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, gym_id, member_code, status, first_name, last_name, phone,
                   created_at, updated_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Updates a member's lifecycle status
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, gym_id, member_code, status, first_name, last_name, phone,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }
}

/// A member together with their full membership history
///
/// This is the enriched record the attendance engine works with after the
/// initial code lookup succeeds: eligibility is computed from the
/// memberships already loaded here, not via further queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    /// The member record
    #[serde(flatten)]
    pub member: Member,

    /// All memberships, newest start date first
    pub memberships: Vec<Membership>,
}

impl MemberProfile {
    /// Fetches a member by code together with their memberships
    ///
    /// Returns `None` if no member matches the code (in the given gym,
    /// when scoped).
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(member) = Member::find_by_code(pool, code, gym_id).await? else {
            return Ok(None);
        };

        let memberships = Membership::list_by_member(pool, member.id).await?;

        Ok(Some(MemberProfile {
            member,
            memberships,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_status_as_str() {
        assert_eq!(MemberStatus::Active.as_str(), "active");
        assert_eq!(MemberStatus::Inactive.as_str(), "inactive");
        assert_eq!(MemberStatus::Suspended.as_str(), "suspended");
    }

    #[test]
    fn test_member_status_from_str() {
        assert_eq!(MemberStatus::from_str("active"), Some(MemberStatus::Active));
        assert_eq!(
            MemberStatus::from_str("suspended"),
            Some(MemberStatus::Suspended)
        );
        assert_eq!(MemberStatus::from_str("banned"), None);
    }

    // Integration tests for database operations live with the engine tests
}

/// Membership model and database operations
///
/// A membership is a time-bounded entitlement belonging to one member.
/// Members accumulate memberships over time (renewals, upgrades), so a
/// member row usually has several membership rows, most of them expired.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_status AS ENUM ('active', 'trial', 'expired', 'cancelled');
///
/// CREATE TABLE memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
///     status membership_status NOT NULL DEFAULT 'active',
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Validity
///
/// A membership authorizes attendance on a given date iff its status is
/// `active` and its `end_date` is on or after that date. Trial and
/// cancelled memberships never authorize attendance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Paid and current (subject to the date range)
    Active,

    /// Trial period, not yet converted
    Trial,

    /// Ran past its end date
    Expired,

    /// Terminated before its end date
    Cancelled,
}

impl MembershipStatus {
    /// Converts status to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Trial => "trial",
            MembershipStatus::Expired => "expired",
            MembershipStatus::Cancelled => "cancelled",
        }
    }
}

/// Membership model representing one time-bounded entitlement
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Member this entitlement belongs to
    pub member_id: Uuid,

    /// Membership status
    pub status: MembershipStatus,

    /// First day the membership is valid
    pub start_date: NaiveDate,

    /// Last day the membership is valid (inclusive)
    pub end_date: NaiveDate,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Member the entitlement belongs to
    pub member_id: Uuid,

    /// Initial status
    pub status: MembershipStatus,

    /// First valid day
    pub start_date: NaiveDate,

    /// Last valid day (inclusive)
    pub end_date: NaiveDate,
}

impl Membership {
    /// Whether this membership authorizes attendance on `date`
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.status == MembershipStatus::Active && self.end_date >= date
    }

    /// Creates a new membership in the database
    ///
    /// # Errors
    ///
    /// Returns an error if the member doesn't exist or the database
    /// connection fails
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (member_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, member_id, status, start_date, end_date, created_at
            "#,
        )
        .bind(data.member_id)
        .bind(data.status)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Lists all memberships of a member, newest start date first
    ///
    /// The ordering makes the eligibility tie-break reproducible from the
    /// raw query result alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list_by_member(pool: &PgPool, member_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, member_id, status, start_date, end_date, created_at
            FROM memberships
            WHERE member_id = $1
            ORDER BY start_date DESC, end_date DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }
}

/// Selects the membership that authorizes attendance on `date`
///
/// When several memberships are simultaneously valid (overlapping
/// packages), the one with the latest `start_date` wins, ties broken by
/// the latest `end_date`. This is a deliberate deterministic rule; the
/// selection must not depend on storage order.
pub fn select_valid_membership(memberships: &[Membership], date: NaiveDate) -> Option<&Membership> {
    memberships
        .iter()
        .filter(|m| m.is_valid_on(date))
        .max_by_key(|m| (m.start_date, m.end_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn membership(
        status: MembershipStatus,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            status,
            start_date: start,
            end_date: end,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validity_requires_active_status() {
        let today = date(2026, 3, 10);
        let m = membership(MembershipStatus::Active, today - Duration::days(30), today);
        assert!(m.is_valid_on(today));

        for status in [
            MembershipStatus::Trial,
            MembershipStatus::Expired,
            MembershipStatus::Cancelled,
        ] {
            let m = membership(status, today - Duration::days(30), today + Duration::days(30));
            assert!(!m.is_valid_on(today));
        }
    }

    #[test]
    fn test_validity_end_date_is_inclusive() {
        let today = date(2026, 3, 10);
        let ends_today = membership(MembershipStatus::Active, date(2026, 1, 1), today);
        assert!(ends_today.is_valid_on(today));

        let ended_yesterday =
            membership(MembershipStatus::Active, date(2026, 1, 1), today - Duration::days(1));
        assert!(!ended_yesterday.is_valid_on(today));
    }

    #[test]
    fn test_select_skips_invalid_memberships() {
        let today = date(2026, 3, 10);
        let expired = membership(MembershipStatus::Active, date(2025, 1, 1), date(2025, 12, 31));
        let cancelled = membership(MembershipStatus::Cancelled, date(2026, 1, 1), date(2026, 12, 31));
        let current = membership(MembershipStatus::Active, date(2026, 1, 1), date(2026, 12, 31));

        let list = vec![expired, cancelled, current.clone()];
        let selected = select_valid_membership(&list, today).unwrap();
        assert_eq!(selected.id, current.id);
    }

    #[test]
    fn test_select_prefers_latest_start_date() {
        let today = date(2026, 3, 10);
        let older = membership(MembershipStatus::Active, date(2026, 1, 1), date(2026, 12, 31));
        let newer = membership(MembershipStatus::Active, date(2026, 3, 1), date(2026, 5, 31));

        // Order in the slice must not matter
        let forward = [older.clone(), newer.clone()];
        let selected = select_valid_membership(&forward, today).unwrap();
        assert_eq!(selected.id, newer.id);
        let reverse = [newer.clone(), older];
        let selected = select_valid_membership(&reverse, today).unwrap();
        assert_eq!(selected.id, newer.id);
    }

    #[test]
    fn test_select_none_when_nothing_valid() {
        let today = date(2026, 3, 10);
        let expired = membership(MembershipStatus::Active, date(2025, 1, 1), date(2025, 6, 30));
        assert!(select_valid_membership(&[expired], today).is_none());
        assert!(select_valid_membership(&[], today).is_none());
    }
}

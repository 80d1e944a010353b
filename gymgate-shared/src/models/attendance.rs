/// Attendance session model and database operations
///
/// One row per in/out cycle: created open at check-in (null
/// `check_out_time`), closed exactly once, either by the member scanning
/// out or by the overnight auto-checkout sweep. Rows are never deleted.
///
/// # State Machine
///
/// ```text
/// (no row)  --check-in-->   open
/// open      --check-out-->  closed (auto_checkout = false)
/// open      --sweep----->   closed (auto_checkout = true, closed at cutoff)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE attendance_sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     gym_id UUID NOT NULL REFERENCES gyms(id) ON DELETE CASCADE,
///     member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
///     membership_id UUID NOT NULL REFERENCES memberships(id) ON DELETE RESTRICT,
///     check_in_time TIMESTAMPTZ NOT NULL,
///     check_out_time TIMESTAMPTZ,
///     auto_checkout BOOLEAN NOT NULL DEFAULT FALSE,
///     note TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX attendance_one_open_per_member
///     ON attendance_sessions (member_id)
///     WHERE check_out_time IS NULL;
/// ```
///
/// The partial unique index makes the concurrent double check-in race
/// lose at the database instead of producing two open rows; the close
/// path below is conditional on the row still being open for the same
/// reason.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Attendance session model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceSession {
    /// Unique session ID
    pub id: Uuid,

    /// Gym the visit happened at
    pub gym_id: Uuid,

    /// Member who checked in
    pub member_id: Uuid,

    /// Membership that authorized the check-in
    pub membership_id: Uuid,

    /// When the member checked in
    pub check_in_time: DateTime<Utc>,

    /// When the member checked out; null while they are inside
    pub check_out_time: Option<DateTime<Utc>>,

    /// True iff the session was closed by the reconciliation sweep
    pub auto_checkout: bool,

    /// Optional free-text note (front desk annotations)
    pub note: Option<String>,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new (open) attendance session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttendanceSession {
    /// Gym the visit happens at
    pub gym_id: Uuid,

    /// Member checking in
    pub member_id: Uuid,

    /// Membership authorizing the check-in
    pub membership_id: Uuid,

    /// Check-in timestamp
    pub check_in_time: DateTime<Utc>,

    /// Optional note
    pub note: Option<String>,
}

/// UTC day boundaries for a calendar date: `[start, end)`
pub fn day_bounds_utc(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

impl AttendanceSession {
    /// Whether the member is still inside
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }

    /// Inserts a new open session (check-in)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The member already has an open session (partial unique index)
    /// - Referenced rows don't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(
        pool: &PgPool,
        data: CreateAttendanceSession,
    ) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"
            INSERT INTO attendance_sessions
                (gym_id, member_id, membership_id, check_in_time, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, gym_id, member_id, membership_id, check_in_time,
                      check_out_time, auto_checkout, note, created_at, updated_at
            "#,
        )
        .bind(data.gym_id)
        .bind(data.member_id)
        .bind(data.membership_id)
        .bind(data.check_in_time)
        .bind(data.note)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Finds a session by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"
            SELECT id, gym_id, member_id, membership_id, check_in_time,
                   check_out_time, auto_checkout, note, created_at, updated_at
            FROM attendance_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Finds the member's most recent session of a UTC calendar day
    ///
    /// The toggle decision re-reads this immediately before every
    /// transition, so two kiosks never act on cached state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_latest_on_day(
        pool: &PgPool,
        member_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (day_start, day_end) = day_bounds_utc(day);

        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"
            SELECT id, gym_id, member_id, membership_id, check_in_time,
                   check_out_time, auto_checkout, note, created_at, updated_at
            FROM attendance_sessions
            WHERE member_id = $1
              AND check_in_time >= $2
              AND check_in_time < $3
            ORDER BY check_in_time DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Closes a session iff it is still open
    ///
    /// Conditional update: two concurrent check-outs race, one wins and
    /// the other gets `None` back. `auto` marks sweep-driven closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn close(
        pool: &PgPool,
        id: Uuid,
        at: DateTime<Utc>,
        auto: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"
            UPDATE attendance_sessions
            SET check_out_time = $2, auto_checkout = $3, updated_at = NOW()
            WHERE id = $1 AND check_out_time IS NULL
            RETURNING id, gym_id, member_id, membership_id, check_in_time,
                      check_out_time, auto_checkout, note, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(auto)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Lists a gym's open sessions checked in strictly before `cutoff`
    ///
    /// These are the stale sessions the auto-checkout sweep will close.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_open_before(
        pool: &PgPool,
        gym_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sessions = sqlx::query_as::<_, AttendanceSession>(
            r#"
            SELECT id, gym_id, member_id, membership_id, check_in_time,
                   check_out_time, auto_checkout, note, created_at, updated_at
            FROM attendance_sessions
            WHERE gym_id = $1
              AND check_out_time IS NULL
              AND check_in_time < $2
            ORDER BY check_in_time ASC
            "#,
        )
        .bind(gym_id)
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        Ok(sessions)
    }

    /// Closes many sessions at `cutoff` in a single statement
    ///
    /// Only rows that are still open are touched, so re-running the sweep
    /// over the same ids is a no-op. Returns the number of rows closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn close_many(
        pool: &PgPool,
        ids: &[Uuid],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE attendance_sessions
            SET check_out_time = $2, auto_checkout = TRUE, updated_at = NOW()
            WHERE id = ANY($1) AND check_out_time IS NULL
            "#,
        )
        .bind(ids)
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_span_one_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let (start, end) = day_bounds_utc(day);
        assert_eq!(start.to_rfc3339(), "2026-03-10T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_is_open() {
        let now = Utc::now();
        let mut session = AttendanceSession {
            id: Uuid::new_v4(),
            gym_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            membership_id: Uuid::new_v4(),
            check_in_time: now,
            check_out_time: None,
            auto_checkout: false,
            note: None,
            created_at: now,
            updated_at: now,
        };
        assert!(session.is_open());

        session.check_out_time = Some(now);
        assert!(!session.is_open());
    }
}

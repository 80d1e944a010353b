/// Storage traits for the attendance engine
///
/// The engine reads members and toggles sessions through these traits so
/// the business rules stay testable without a database and the race-prone
/// operations (close-iff-open, one open session per member) live behind
/// one seam.
///
/// # Implementations
///
/// - [`PgMemberDirectory`] / [`PgSessionStore`]: PostgreSQL, delegating
///   to the model modules
/// - [`crate::checkin::mock`]: in-memory doubles for tests

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::attendance::{AttendanceSession, CreateAttendanceSession};
use crate::models::member::{Member, MemberProfile};

/// Storage error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store rejected the operation or is unreachable
    #[error("{0}")]
    Unavailable(String),
}

/// Member lookup operations
///
/// `gym_id` scopes a lookup to one tenant; `None` searches every gym the
/// caller can see. Kiosks always pass their own gym.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Finds a member by code, regardless of status
    async fn find_by_code(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<Member>, StoreError>;

    /// Finds a member by code together with their memberships
    async fn find_with_memberships(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<MemberProfile>, StoreError>;
}

/// Attendance session operations
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The member's most recent session of the given UTC calendar day
    async fn latest_on_day(
        &self,
        member_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceSession>, StoreError>;

    /// Inserts a new open session (check-in)
    async fn open_session(
        &self,
        data: CreateAttendanceSession,
    ) -> Result<AttendanceSession, StoreError>;

    /// Closes a session iff it is still open; `None` means it was already
    /// closed (a concurrent toggle won the race)
    async fn close_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        auto: bool,
    ) -> Result<Option<AttendanceSession>, StoreError>;

    /// A gym's open sessions checked in strictly before `cutoff`
    async fn find_open_before(
        &self,
        gym_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, StoreError>;

    /// Closes the given sessions at `cutoff`, marking them auto-closed;
    /// rows already closed are skipped. Returns the number closed.
    async fn close_many(&self, ids: &[Uuid], cutoff: DateTime<Utc>)
        -> Result<u64, StoreError>;
}

/// PostgreSQL-backed member directory
#[derive(Clone)]
pub struct PgMemberDirectory {
    pool: PgPool,
}

impl PgMemberDirectory {
    /// Creates a directory over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectory for PgMemberDirectory {
    async fn find_by_code(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<Member>, StoreError> {
        Ok(Member::find_by_code(&self.pool, code, gym_id).await?)
    }

    async fn find_with_memberships(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<MemberProfile>, StoreError> {
        Ok(MemberProfile::find_by_code(&self.pool, code, gym_id).await?)
    }
}

/// PostgreSQL-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a session store over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn latest_on_day(
        &self,
        member_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        Ok(AttendanceSession::find_latest_on_day(&self.pool, member_id, day).await?)
    }

    async fn open_session(
        &self,
        data: CreateAttendanceSession,
    ) -> Result<AttendanceSession, StoreError> {
        Ok(AttendanceSession::create(&self.pool, data).await?)
    }

    async fn close_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        auto: bool,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        Ok(AttendanceSession::close(&self.pool, id, at, auto).await?)
    }

    async fn find_open_before(
        &self,
        gym_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, StoreError> {
        Ok(AttendanceSession::find_open_before(&self.pool, gym_id, cutoff).await?)
    }

    async fn close_many(
        &self,
        ids: &[Uuid],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(AttendanceSession::close_many(&self.pool, ids, cutoff).await?)
    }
}

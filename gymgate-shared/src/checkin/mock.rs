/// In-memory doubles for the engine's storage traits
///
/// These back the engine tests (and local demos) without a database.
/// Both doubles honor the same semantics as the PostgreSQL
/// implementations: day filtering is by UTC calendar day, closes only
/// touch rows that are still open, and `fail_writes` simulates a backing
/// store that rejects mutations.
///
/// # Example
///
/// ```
/// use gymgate_shared::checkin::mock::{MockDirectory, MockSessionStore};
/// use gymgate_shared::checkin::AttendanceEngine;
///
/// let engine = AttendanceEngine::new(MockDirectory::default(), MockSessionStore::default());
/// ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::attendance::{day_bounds_utc, AttendanceSession, CreateAttendanceSession};
use crate::models::member::{Member, MemberProfile};

use super::store::{MemberDirectory, SessionStore, StoreError};

/// In-memory member directory
#[derive(Default)]
pub struct MockDirectory {
    profiles: Vec<MemberProfile>,
}

impl MockDirectory {
    /// Creates a directory pre-loaded with the given profiles
    pub fn with_profiles(profiles: Vec<MemberProfile>) -> Self {
        Self { profiles }
    }

    fn lookup(&self, code: &str, gym_id: Option<Uuid>) -> Option<&MemberProfile> {
        self.profiles.iter().find(|p| {
            p.member.member_code == code
                && gym_id.map_or(true, |gym| p.member.gym_id == gym)
        })
    }
}

#[async_trait]
impl MemberDirectory for MockDirectory {
    async fn find_by_code(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<Member>, StoreError> {
        Ok(self.lookup(code, gym_id).map(|p| p.member.clone()))
    }

    async fn find_with_memberships(
        &self,
        code: &str,
        gym_id: Option<Uuid>,
    ) -> Result<Option<MemberProfile>, StoreError> {
        Ok(self.lookup(code, gym_id).cloned())
    }
}

/// In-memory session store with write-failure injection
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<Vec<AttendanceSession>>,
    fail_writes: AtomicBool,
}

impl MockSessionStore {
    /// Makes every subsequent mutation fail, simulating a store outage
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all stored sessions
    pub fn all(&self) -> Vec<AttendanceSession> {
        self.lock_sessions().clone()
    }

    /// Seeds a session directly, bypassing the engine
    pub fn insert(&self, session: AttendanceSession) {
        self.lock_sessions().push(session);
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, Vec<AttendanceSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "injected write failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn latest_on_day(
        &self,
        member_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        let (day_start, day_end) = day_bounds_utc(day);
        let sessions = self.lock_sessions();

        Ok(sessions
            .iter()
            .filter(|s| {
                s.member_id == member_id
                    && s.check_in_time >= day_start
                    && s.check_in_time < day_end
            })
            .max_by_key(|s| s.check_in_time)
            .cloned())
    }

    async fn open_session(
        &self,
        data: CreateAttendanceSession,
    ) -> Result<AttendanceSession, StoreError> {
        self.check_writable()?;

        let mut sessions = self.lock_sessions();

        // Same rule as the partial unique index in Postgres
        if sessions
            .iter()
            .any(|s| s.member_id == data.member_id && s.is_open())
        {
            return Err(StoreError::Unavailable(
                "member already has an open session".to_string(),
            ));
        }

        let session = AttendanceSession {
            id: Uuid::new_v4(),
            gym_id: data.gym_id,
            member_id: data.member_id,
            membership_id: data.membership_id,
            check_in_time: data.check_in_time,
            check_out_time: None,
            auto_checkout: false,
            note: data.note,
            created_at: data.check_in_time,
            updated_at: data.check_in_time,
        };
        sessions.push(session.clone());

        Ok(session)
    }

    async fn close_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        auto: bool,
    ) -> Result<Option<AttendanceSession>, StoreError> {
        self.check_writable()?;

        let mut sessions = self.lock_sessions();

        let Some(session) = sessions.iter_mut().find(|s| s.id == id && s.is_open()) else {
            return Ok(None);
        };

        session.check_out_time = Some(at);
        session.auto_checkout = auto;
        session.updated_at = at;

        Ok(Some(session.clone()))
    }

    async fn find_open_before(
        &self,
        gym_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, StoreError> {
        let sessions = self.lock_sessions();

        let mut stale: Vec<AttendanceSession> = sessions
            .iter()
            .filter(|s| s.gym_id == gym_id && s.is_open() && s.check_in_time < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|s| s.check_in_time);

        Ok(stale)
    }

    async fn close_many(
        &self,
        ids: &[Uuid],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.check_writable()?;

        let mut sessions = self.lock_sessions();
        let mut closed = 0u64;

        for session in sessions.iter_mut() {
            if ids.contains(&session.id) && session.is_open() {
                session.check_out_time = Some(cutoff);
                session.auto_checkout = true;
                session.updated_at = cutoff;
                closed += 1;
            }
        }

        Ok(closed)
    }
}

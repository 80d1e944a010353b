/// The attendance engine
///
/// One scan = one short read-then-write sequence:
///
/// 1. Parse the raw input (badge payload or bare code)
/// 2. Broad member lookup, status deliberately unfiltered
/// 3. Refuse unknown codes, non-active members, badges from another gym
/// 4. Enriched re-fetch with memberships; pick the valid one
/// 5. Toggle: the member's latest session today decides. An open
///    session is closed; anything else starts a new one
///
/// The two-step lookup (find, then validate) costs an extra round trip
/// and buys the kiosk a precise refusal message: "no such code" reads
/// very differently from "account suspended" when nobody is at the desk.
///
/// Every decision re-reads the store first; the engine keeps no session
/// state of its own, so concurrent kiosks only contend inside the store's
/// conditional updates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::attendance::{day_bounds_utc, AttendanceSession, CreateAttendanceSession};
use crate::models::member::{Member, MemberStatus};
use crate::models::membership::{select_valid_membership, Membership};
use crate::qr::{parse_scan_input, ScanInput};

use super::store::{MemberDirectory, SessionStore, StoreError};

/// Which transition a successful scan performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    /// A new open session was created
    CheckIn,

    /// The day's open session was closed
    CheckOut,
}

impl ScanAction {
    /// Converts action to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::CheckIn => "check_in",
            ScanAction::CheckOut => "check_out",
        }
    }
}

/// Why a scan was refused
///
/// These are expected outcomes of normal operation, carried in the
/// result value; the serialized names are part of the kiosk contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefusalKind {
    /// Code does not resolve to any member
    MemberNotFound,

    /// Member exists but their status disqualifies use
    MemberInactive,

    /// Badge was issued for a different gym
    TenantMismatch,

    /// Member is fine but holds no current entitlement
    NoActiveMembership,

    /// The backing store rejected a read or write
    PersistenceFailure,
}

impl RefusalKind {
    /// Converts kind to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalKind::MemberNotFound => "MemberNotFound",
            RefusalKind::MemberInactive => "MemberInactive",
            RefusalKind::TenantMismatch => "TenantMismatch",
            RefusalKind::NoActiveMembership => "NoActiveMembership",
            RefusalKind::PersistenceFailure => "PersistenceFailure",
        }
    }
}

/// Uniform result of processing one scan
///
/// Kiosks branch on this value only; the engine never surfaces a bare
/// error for business outcomes, and infrastructure faults arrive here as
/// `PersistenceFailure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Whether a transition was performed
    pub success: bool,

    /// The transition performed, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ScanAction>,

    /// The resolved member, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,

    /// The membership that authorized the transition, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,

    /// The session created or closed, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AttendanceSession>,

    /// Human-readable confirmation or refusal, ready for the kiosk screen
    pub message: String,

    /// Refusal classification, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<RefusalKind>,
}

impl ScanResult {
    fn completed(
        action: ScanAction,
        member: Member,
        membership: Membership,
        session: AttendanceSession,
        message: String,
    ) -> Self {
        Self {
            success: true,
            action: Some(action),
            member: Some(member),
            membership: Some(membership),
            session: Some(session),
            message,
            error_kind: None,
        }
    }

    fn refused(kind: RefusalKind, message: String) -> Self {
        Self {
            success: false,
            action: None,
            member: None,
            membership: None,
            session: None,
            message,
            error_kind: Some(kind),
        }
    }
}

/// Result of one auto-checkout sweep over a gym
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    /// Whether the sweep ran to completion
    pub success: bool,

    /// Number of stale sessions closed (zero matches is still a success)
    pub count: u64,

    /// Human-readable summary
    pub message: String,
}

/// End of the previous UTC calendar day relative to `now`
///
/// This is the instant stale sessions are closed *at*: the exit is
/// attributed to the day the member should have left, not to whenever
/// the sweep happened to run.
pub fn previous_day_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    let (today_start, _) = day_bounds_utc(now.date_naive());
    today_start - Duration::milliseconds(1)
}

/// The attendance engine
///
/// Generic over its storage seams; see [`crate::checkin`] for the
/// wiring. Cheap to construct, holds no per-scan state.
pub struct AttendanceEngine<D, S> {
    directory: D,
    sessions: S,
}

impl<D: MemberDirectory, S: SessionStore> AttendanceEngine<D, S> {
    /// Creates an engine over the given directory and session store
    pub fn new(directory: D, sessions: S) -> Self {
        Self {
            directory,
            sessions,
        }
    }

    /// Processes one scan: resolve, validate, toggle
    ///
    /// `gym_scope` restricts the lookup to one gym (a kiosk's own);
    /// `now` is the instant of the scan and defines "today" in UTC.
    ///
    /// Never returns an error: infrastructure faults become a
    /// `PersistenceFailure` result so every caller branches on one shape.
    pub async fn process_scan(
        &self,
        raw_input: &str,
        gym_scope: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> ScanResult {
        match self.scan_inner(raw_input, gym_scope, now).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Scan failed on storage fault");
                ScanResult::refused(
                    RefusalKind::PersistenceFailure,
                    format!("Could not record the scan ({e}). Please scan again or ask at reception."),
                )
            }
        }
    }

    async fn scan_inner(
        &self,
        raw_input: &str,
        gym_scope: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<ScanResult, StoreError> {
        // Badge payloads carry the code plus the issuing gym; anything
        // that doesn't parse is treated as a bare code.
        let (code, gym_claim) = match parse_scan_input(raw_input) {
            ScanInput::Badge(badge) => {
                let Some(claim) = badge.expected_gym() else {
                    // The badge claims a gym that can't exist; same
                    // refusal as any other cross-gym replay.
                    tracing::warn!(member_code = %badge.member_id, claimed_gym = %badge.gym_id, "Badge with unparseable gym id");
                    return Ok(ScanResult::refused(
                        RefusalKind::TenantMismatch,
                        "This badge was issued for a different gym. Please ask at reception."
                            .to_string(),
                    ));
                };
                (badge.member_id, Some(claim))
            }
            ScanInput::Code(code) => (code, None),
        };

        let Some(member) = self.directory.find_by_code(&code, gym_scope).await? else {
            return Ok(ScanResult::refused(
                RefusalKind::MemberNotFound,
                format!("No member found for code \"{code}\". Please check the code or ask at reception."),
            ));
        };

        if member.status != MemberStatus::Active {
            return Ok(ScanResult::refused(
                RefusalKind::MemberInactive,
                format!(
                    "This account is {}. Please ask at reception.",
                    member.status.as_str()
                ),
            ));
        }

        if let Some(claimed) = gym_claim {
            if claimed != member.gym_id {
                tracing::warn!(
                    member_code = %code,
                    claimed_gym = %claimed,
                    actual_gym = %member.gym_id,
                    "Badge presented at a different gym than it was issued for"
                );
                return Ok(ScanResult::refused(
                    RefusalKind::TenantMismatch,
                    "This badge was issued for a different gym. Please ask at reception."
                        .to_string(),
                ));
            }
        }

        // Enriched re-fetch; a vanishing member between the two queries
        // reads the same as an unknown code.
        let Some(profile) = self.directory.find_with_memberships(&code, gym_scope).await? else {
            return Ok(ScanResult::refused(
                RefusalKind::MemberNotFound,
                format!("No member found for code \"{code}\". Please check the code or ask at reception."),
            ));
        };

        let today = now.date_naive();
        let Some(membership) = select_valid_membership(&profile.memberships, today) else {
            return Ok(ScanResult::refused(
                RefusalKind::NoActiveMembership,
                "No current membership on file. Please ask at reception.".to_string(),
            ));
        };

        self.toggle(profile.member, membership.clone(), now).await
    }

    /// The toggle: the member's latest session today decides the
    /// transition. Open session → check-out; no session, or a session
    /// already closed → check-in (a closed day restarts a cycle).
    async fn toggle(
        &self,
        member: Member,
        membership: Membership,
        now: DateTime<Utc>,
    ) -> Result<ScanResult, StoreError> {
        let today = now.date_naive();
        let latest = self.sessions.latest_on_day(member.id, today).await?;

        if let Some(open) = latest.filter(AttendanceSession::is_open) {
            // Conditional close: a concurrent kiosk may have closed it
            // between our read and this write.
            let Some(closed) = self.sessions.close_session(open.id, now, false).await? else {
                tracing::warn!(session_id = %open.id, member_code = %member.member_code, "Lost the check-out race");
                return Ok(ScanResult::refused(
                    RefusalKind::PersistenceFailure,
                    "That scan crossed with another one. Please scan again.".to_string(),
                ));
            };

            tracing::info!(
                session_id = %closed.id,
                member_code = %member.member_code,
                gym_id = %member.gym_id,
                "Member checked out"
            );

            let message = format!("See you next time, {}! You are checked out.", member.first_name);
            return Ok(ScanResult::completed(
                ScanAction::CheckOut,
                member,
                membership,
                closed,
                message,
            ));
        }

        let session = self
            .sessions
            .open_session(CreateAttendanceSession {
                gym_id: member.gym_id,
                member_id: member.id,
                membership_id: membership.id,
                check_in_time: now,
                note: None,
            })
            .await?;

        tracing::info!(
            session_id = %session.id,
            member_code = %member.member_code,
            gym_id = %member.gym_id,
            "Member checked in"
        );

        let message = format!("Welcome, {}! You are checked in.", member.first_name);
        Ok(ScanResult::completed(
            ScanAction::CheckIn,
            member,
            membership,
            session,
            message,
        ))
    }

    /// Auto-checkout reconciliation sweep for one gym
    ///
    /// Closes every session still open from before the end of yesterday,
    /// *at* that cutoff, flagged `auto_checkout`. Idempotent: closed rows
    /// never match again, so a re-run reports zero.
    pub async fn auto_checkout(&self, gym_id: Uuid, now: DateTime<Utc>) -> SweepResult {
        let cutoff = previous_day_cutoff(now);

        match self.sweep_inner(gym_id, cutoff).await {
            Ok(0) => SweepResult {
                success: true,
                count: 0,
                message: "No stale open sessions.".to_string(),
            },
            Ok(count) => SweepResult {
                success: true,
                count,
                message: format!("Closed {count} stale session(s) at {cutoff}."),
            },
            Err(e) => {
                tracing::error!(gym_id = %gym_id, error = %e, "Auto-checkout sweep failed");
                SweepResult {
                    success: false,
                    count: 0,
                    message: format!("Auto-checkout failed: {e}"),
                }
            }
        }
    }

    async fn sweep_inner(&self, gym_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let stale = self.sessions.find_open_before(gym_id, cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = stale.iter().map(|s| s.id).collect();
        let closed = self.sessions.close_many(&ids, cutoff).await?;

        tracing::info!(
            gym_id = %gym_id,
            matched = ids.len(),
            closed,
            cutoff = %cutoff,
            "Auto-checkout sweep completed"
        );

        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::mock::{MockDirectory, MockSessionStore};
    use crate::models::member::MemberProfile;
    use crate::models::membership::MembershipStatus;
    use crate::qr::BadgePayload;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    }

    fn member(gym_id: Uuid, code: &str, status: MemberStatus) -> Member {
        Member {
            id: Uuid::new_v4(),
            gym_id,
            member_code: code.to_string(),
            status,
            first_name: "Dana".to_string(),
            last_name: "Park".to_string(),
            phone: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn membership(member_id: Uuid, status: MembershipStatus, end: chrono::NaiveDate) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            member_id,
            status,
            start_date: end - Duration::days(30),
            end_date: end,
            created_at: now(),
        }
    }

    /// An active member with a membership valid through tomorrow
    fn eligible_profile(gym_id: Uuid, code: &str) -> MemberProfile {
        let member = member(gym_id, code, MemberStatus::Active);
        let membership = membership(
            member.id,
            MembershipStatus::Active,
            now().date_naive() + Duration::days(1),
        );
        MemberProfile {
            member,
            memberships: vec![membership],
        }
    }

    fn engine_with(
        profiles: Vec<MemberProfile>,
    ) -> AttendanceEngine<MockDirectory, MockSessionStore> {
        AttendanceEngine::new(
            MockDirectory::with_profiles(profiles),
            MockSessionStore::default(),
        )
    }

    #[tokio::test]
    async fn test_unknown_code_is_member_not_found() {
        let engine = engine_with(vec![]);

        let result = engine.process_scan("NOPE42", None, now()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::MemberNotFound));
        assert!(result.message.contains("NOPE42"));
        assert!(result.session.is_none());
    }

    #[tokio::test]
    async fn test_suspended_member_is_member_inactive() {
        let gym = Uuid::new_v4();
        let mut profile = eligible_profile(gym, "MEM002");
        profile.member.status = MemberStatus::Suspended;
        let engine = engine_with(vec![profile]);

        let result = engine.process_scan("MEM002", None, now()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::MemberInactive));
        // The actual status reaches the kiosk screen
        assert!(result.message.contains("suspended"));
    }

    #[tokio::test]
    async fn test_badge_from_other_gym_is_tenant_mismatch() {
        let gym_b = Uuid::new_v4();
        let profile = eligible_profile(gym_b, "MEM001");
        let engine = engine_with(vec![profile]);

        // Badge claims gym A, member actually belongs to gym B
        let badge = BadgePayload::new("MEM001", Uuid::new_v4(), "Dana Park", now());
        let result = engine
            .process_scan(&badge.to_json().unwrap(), None, now())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::TenantMismatch));
    }

    #[tokio::test]
    async fn test_badge_with_garbage_gym_id_is_tenant_mismatch() {
        let gym = Uuid::new_v4();
        let engine = engine_with(vec![eligible_profile(gym, "MEM001")]);

        let mut badge = BadgePayload::new("MEM001", gym, "Dana Park", now());
        badge.gym_id = "not-a-uuid".to_string();
        let result = engine
            .process_scan(&badge.to_json().unwrap(), None, now())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::TenantMismatch));
    }

    #[tokio::test]
    async fn test_matching_badge_checks_in() {
        let gym = Uuid::new_v4();
        let engine = engine_with(vec![eligible_profile(gym, "MEM001")]);

        let badge = BadgePayload::new("MEM001", gym, "Dana Park", now());
        let result = engine
            .process_scan(&badge.to_json().unwrap(), Some(gym), now())
            .await;

        assert!(result.success);
        assert_eq!(result.action, Some(ScanAction::CheckIn));
    }

    #[tokio::test]
    async fn test_expired_membership_is_no_active_membership() {
        let gym = Uuid::new_v4();
        let member = member(gym, "MEM003", MemberStatus::Active);
        // Still status-active, but ended yesterday
        let lapsed = membership(
            member.id,
            MembershipStatus::Active,
            now().date_naive() - Duration::days(1),
        );
        let engine = engine_with(vec![MemberProfile {
            member,
            memberships: vec![lapsed],
        }]);

        let result = engine.process_scan("MEM003", None, now()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::NoActiveMembership));
        assert!(result.message.contains("reception"));
    }

    #[tokio::test]
    async fn test_toggle_checks_in_then_out_then_in_again() {
        let gym = Uuid::new_v4();
        let engine = engine_with(vec![eligible_profile(gym, "MEM001")]);

        // First scan of the day: check-in with an open session
        let first = engine.process_scan("MEM001", Some(gym), now()).await;
        assert!(first.success);
        assert_eq!(first.action, Some(ScanAction::CheckIn));
        let opened = first.session.expect("session");
        assert!(opened.is_open());
        assert!(first.message.contains("Dana"));

        // Second scan: check-out of that same session
        let later = now() + Duration::hours(2);
        let second = engine.process_scan("MEM001", Some(gym), later).await;
        assert!(second.success);
        assert_eq!(second.action, Some(ScanAction::CheckOut));
        let closed = second.session.expect("session");
        assert_eq!(closed.id, opened.id);
        assert_eq!(closed.check_out_time, Some(later));
        assert!(!closed.auto_checkout);

        // Third scan the same day: the latest session is closed, so a
        // new cycle starts. (The toggle only ever inspects the latest
        // same-day row; whether gyms *want* multiple daily cycles is an
        // open product question, and this pins down what the code does.)
        let evening = now() + Duration::hours(8);
        let third = engine.process_scan("MEM001", Some(gym), evening).await;
        assert!(third.success);
        assert_eq!(third.action, Some(ScanAction::CheckIn));
        assert_ne!(third.session.expect("session").id, opened.id);
    }

    #[tokio::test]
    async fn test_toggle_checks_in_fresh_on_a_new_day() {
        let gym = Uuid::new_v4();
        let engine = engine_with(vec![eligible_profile(gym, "MEM001")]);

        let first = engine.process_scan("MEM001", Some(gym), now()).await;
        assert_eq!(first.action, Some(ScanAction::CheckIn));

        // Yesterday's session is still open, but the toggle only looks
        // at today; check-in on a new day opens a second session only if
        // the store allows it, and the one-open-per-member rule refuses.
        let tomorrow = now() + Duration::days(1);
        let result = engine.process_scan("MEM001", Some(gym), tomorrow).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::PersistenceFailure));
    }

    #[tokio::test]
    async fn test_write_failure_is_persistence_failure() {
        let gym = Uuid::new_v4();
        let directory = MockDirectory::with_profiles(vec![eligible_profile(gym, "MEM001")]);
        let store = MockSessionStore::default();
        store.fail_writes(true);
        let engine = AttendanceEngine::new(directory, store);

        let result = engine.process_scan("MEM001", Some(gym), now()).await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(RefusalKind::PersistenceFailure));
        assert!(result.message.contains("scan again"));
    }

    #[tokio::test]
    async fn test_sweep_closes_stale_sessions_at_cutoff() {
        let gym = Uuid::new_v4();
        let profile = eligible_profile(gym, "MEM001");
        let member_id = profile.member.id;
        let membership_id = profile.memberships[0].id;
        let store = MockSessionStore::default();

        // Open session from three days ago, never closed
        let stale_check_in = now() - Duration::days(3);
        store.insert(AttendanceSession {
            id: Uuid::new_v4(),
            gym_id: gym,
            member_id,
            membership_id,
            check_in_time: stale_check_in,
            check_out_time: None,
            auto_checkout: false,
            note: None,
            created_at: stale_check_in,
            updated_at: stale_check_in,
        });

        let engine = AttendanceEngine::new(MockDirectory::with_profiles(vec![profile]), store);

        let result = engine.auto_checkout(gym, now()).await;
        assert!(result.success);
        assert_eq!(result.count, 1);

        // Closed at the cutoff, not at sweep time
        let cutoff = previous_day_cutoff(now());
        let sessions = engine.sessions.all();
        assert_eq!(sessions[0].check_out_time, Some(cutoff));
        assert!(sessions[0].auto_checkout);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent_and_spares_todays_sessions() {
        let gym = Uuid::new_v4();
        let profile = eligible_profile(gym, "MEM001");
        let member_id = profile.member.id;
        let membership_id = profile.memberships[0].id;
        let store = MockSessionStore::default();

        let stale_check_in = now() - Duration::days(3);
        store.insert(AttendanceSession {
            id: Uuid::new_v4(),
            gym_id: gym,
            member_id,
            membership_id,
            check_in_time: stale_check_in,
            check_out_time: None,
            auto_checkout: false,
            note: None,
            created_at: stale_check_in,
            updated_at: stale_check_in,
        });

        // Today's open session, from another member
        let today_member = Uuid::new_v4();
        store.insert(AttendanceSession {
            id: Uuid::new_v4(),
            gym_id: gym,
            member_id: today_member,
            membership_id: Uuid::new_v4(),
            check_in_time: now() - Duration::hours(1),
            check_out_time: None,
            auto_checkout: false,
            note: None,
            created_at: now() - Duration::hours(1),
            updated_at: now() - Duration::hours(1),
        });

        let engine = AttendanceEngine::new(MockDirectory::with_profiles(vec![profile]), store);

        let first = engine.auto_checkout(gym, now()).await;
        assert!(first.success);
        assert_eq!(first.count, 1);

        // Today's session is untouched
        let open: Vec<_> = engine
            .sessions
            .all()
            .into_iter()
            .filter(AttendanceSession::is_open)
            .collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].member_id, today_member);

        // Second run finds nothing
        let second = engine.auto_checkout(gym, now()).await;
        assert!(second.success);
        assert_eq!(second.count, 0);
    }

    #[tokio::test]
    async fn test_sweep_with_no_matches_is_a_success() {
        let engine = engine_with(vec![]);

        let result = engine.auto_checkout(Uuid::new_v4(), now()).await;

        assert!(result.success);
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_previous_day_cutoff() {
        let cutoff = previous_day_cutoff(now());
        assert_eq!(cutoff.to_rfc3339(), "2026-03-09T23:59:59.999+00:00");
    }

    #[test]
    fn test_refusal_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(RefusalKind::MemberNotFound).unwrap(),
            "MemberNotFound"
        );
        assert_eq!(
            serde_json::to_value(RefusalKind::NoActiveMembership).unwrap(),
            "NoActiveMembership"
        );
        assert_eq!(
            serde_json::to_value(ScanAction::CheckIn).unwrap(),
            "check_in"
        );
    }

    #[test]
    fn test_scan_result_omits_empty_fields() {
        let refusal = ScanResult::refused(RefusalKind::MemberNotFound, "nope".to_string());
        let value = serde_json::to_value(&refusal).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error_kind"], "MemberNotFound");
        assert!(value.get("action").is_none());
        assert!(value.get("session").is_none());
    }
}

/// Attendance check-in/out engine
///
/// This module is the core of Gymgate: it resolves raw scanner input to a
/// member, validates eligibility, and toggles the day's attendance
/// session; it also owns the overnight auto-checkout sweep.
///
/// # Architecture
///
/// The engine never talks to the database directly. It is generic over
/// two traits:
///
/// - [`store::MemberDirectory`]: member lookup by code (broad, then
///   enriched with memberships)
/// - [`store::SessionStore`]: attendance session reads and writes
///
/// Production wires in the PostgreSQL implementations; tests use the
/// in-memory doubles in [`mock`]. Every operation takes the current
/// instant as an argument, so "today" is an explicit UTC parameter
/// rather than ambient wall-clock state.
///
/// # Result shape
///
/// Business refusals (unknown code, suspended member, badge from another
/// gym, lapsed membership) are normal outcomes, not errors: every scan
/// returns a [`engine::ScanResult`] and kiosks branch on its fields.
/// Only infrastructure faults travel as errors inside the engine, and
/// even those are converted to a `PersistenceFailure` result at the
/// boundary so callers see exactly one shape.

pub mod engine;
pub mod mock;
pub mod store;

pub use engine::{
    previous_day_cutoff, AttendanceEngine, RefusalKind, ScanAction, ScanResult, SweepResult,
};
pub use store::{MemberDirectory, PgMemberDirectory, PgSessionStore, SessionStore, StoreError};

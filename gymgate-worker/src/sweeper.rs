/// Daily auto-checkout sweep scheduler
///
/// The attendance engine is schedule-agnostic; this module is its
/// invoker. Once a day (shortly after the UTC day boundary, by default)
/// the sweeper runs the auto-checkout pass for every gym, closing
/// sessions members forgot to scan out of at the end of their last day.
///
/// # Architecture
///
/// The sweeper:
/// 1. Sleeps until the next occurrence of the configured run time
/// 2. Lists all gyms and runs the engine's sweep per gym
/// 3. Logs per-gym and total counts
/// 4. Repeats until shutdown is signalled
///
/// The sweep itself is idempotent, so a crash-and-restart mid-pass just
/// re-closes whatever is still open; there is nothing to roll back.
///
/// # Example
///
/// ```no_run
/// use gymgate_worker::sweeper::{Sweeper, SweeperConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let sweeper = Sweeper::new(pool);
/// let shutdown = sweeper.shutdown_token();
///
/// tokio::spawn(async move {
///     // sweeper runs until shutdown.cancel()
///     sweeper.run().await
/// });
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveTime, Utc};
use gymgate_shared::checkin::{AttendanceEngine, PgMemberDirectory, PgSessionStore};
use gymgate_shared::models::gym::Gym;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// UTC time of day the sweep runs
    pub run_time: NaiveTime,

    /// Whether to run one sweep immediately at startup
    pub run_on_start: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            run_time: NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN),
            run_on_start: false,
        }
    }
}

/// The sweep scheduler
pub struct Sweeper {
    /// Database connection pool (gym listing)
    db: PgPool,

    /// The attendance engine wired to Postgres
    engine: AttendanceEngine<PgMemberDirectory, PgSessionStore>,

    /// Schedule configuration
    config: SweeperConfig,

    /// Shutdown signal
    shutdown_token: CancellationToken,
}

impl Sweeper {
    /// Creates a sweeper with the default schedule
    pub fn new(db: PgPool) -> Self {
        Self::with_config(db, SweeperConfig::default())
    }

    /// Creates a sweeper with a custom schedule
    pub fn with_config(db: PgPool, config: SweeperConfig) -> Self {
        let engine = AttendanceEngine::new(
            PgMemberDirectory::new(db.clone()),
            PgSessionStore::new(db.clone()),
        );

        Sweeper {
            db,
            engine,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets the shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the sweep loop until shutdown
    ///
    /// # Errors
    ///
    /// Currently infallible at this level: per-gym sweep failures are
    /// logged and the loop keeps going, so one bad tenant never blocks
    /// the rest.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            run_time = %self.config.run_time,
            run_on_start = self.config.run_on_start,
            "Sweeper starting"
        );

        if self.config.run_on_start {
            self.sweep_all(Utc::now()).await;
        }

        loop {
            let wait = duration_until_next_run(Utc::now(), self.config.run_time);
            tracing::info!(sleep_secs = wait.as_secs(), "Sweeper sleeping until next run");

            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, sweeper exiting");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.sweep_all(Utc::now()).await;
                }
            }
        }

        Ok(())
    }

    /// Runs the auto-checkout pass for every gym
    pub async fn sweep_all(&self, now: DateTime<Utc>) {
        let gyms = match Gym::list_ids(&self.db).await {
            Ok(gyms) => gyms,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list gyms, skipping sweep");
                return;
            }
        };

        let mut total = 0u64;
        let mut failures = 0usize;

        for gym_id in gyms {
            let result = self.engine.auto_checkout(gym_id, now).await;
            if result.success {
                if result.count > 0 {
                    tracing::info!(gym_id = %gym_id, closed = result.count, "Closed stale sessions");
                }
                total += result.count;
            } else {
                failures += 1;
                tracing::error!(gym_id = %gym_id, message = %result.message, "Sweep failed for gym");
            }
        }

        tracing::info!(closed = total, failures, "Auto-checkout pass complete");
    }
}

/// Time remaining until the next occurrence of `run_time` (UTC)
///
/// If today's run time is already past, the next run is tomorrow.
pub fn duration_until_next_run(now: DateTime<Utc>, run_time: NaiveTime) -> std::time::Duration {
    let today_run = now.date_naive().and_time(run_time).and_utc();
    let next = if today_run > now {
        today_run
    } else {
        today_run + chrono::Duration::days(1)
    };

    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run_time() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 5, 0).unwrap()
    }

    #[test]
    fn test_duration_until_next_run_later_today() {
        // 23:50, run time 00:05 tomorrow: 15 minutes away
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 23, 50, 0).unwrap();
        let wait = duration_until_next_run(now, run_time());
        assert_eq!(wait.as_secs(), 15 * 60);
    }

    #[test]
    fn test_duration_until_next_run_already_past() {
        // 00:05 exactly counts as past; next run is in 24h
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 5, 0).unwrap();
        let wait = duration_until_next_run(now, run_time());
        assert_eq!(wait.as_secs(), 24 * 60 * 60);
    }

    #[test]
    fn test_duration_until_next_run_before_todays_run() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let wait = duration_until_next_run(now, run_time());
        assert_eq!(wait.as_secs(), 5 * 60);
    }
}

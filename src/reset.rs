//! Daily reset of the per-reminder "today" projection.
//!
//! Only `remaining_doses` and `status` are touched. Ledger rows are left
//! alone, so history survives every reset.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::{CycleStore, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub reset: u64,
    pub failed: Vec<i64>,
}

/// Resets every reminder in the system.
///
/// The whole batch is attempted as one atomic unit first. If the store
/// rejects it, each reminder is reset on its own and failures are skipped.
pub async fn run_daily_reset<S: CycleStore + ?Sized>(store: &S) -> ResetReport {
    info!("🔄 Starting daily reset of remaining doses...");

    match store.reset_all_cycles().await {
        Ok(reset) => {
            info!("✅ Remaining doses reset for {} reminders", reset);
            return ResetReport {
                reset,
                failed: vec![],
            };
        }
        Err(e) => warn!("⚠️ Batch reset failed, falling back to per-reminder reset: {}", e),
    }

    let ids = match store.reminder_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("❌ Could not list reminders for reset: {}", e);
            return ResetReport::default();
        }
    };

    let mut report = ResetReport::default();
    for id in ids {
        match store.reset_cycle(id).await {
            Ok(()) => report.reset += 1,
            Err(e) => {
                warn!("⚠️ Skipping reminder {} during reset: {}", id, e);
                report.failed.push(id);
            }
        }
    }

    info!(
        "✅ Remaining doses reset for {} reminders ({} skipped)",
        report.reset,
        report.failed.len()
    );
    report
}

/// Next wall-clock instant strictly after `now` whose time of day is `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Spawns the background task that fires the reset once per local day at `at`.
///
/// The next wait is computed only after a run finishes, so runs never overlap.
pub fn spawn_daily_reset(store: Arc<dyn Store>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("⏰ Daily reset scheduled at {} local time", at.format("%H:%M"));

        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(wait).await;

            run_daily_reset(store.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(date: &str, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn next_run_is_later_today_when_time_not_reached() {
        let next = next_run_after(at("2024-05-01", 6, 0), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(next, at("2024-05-01", 8, 30));
    }

    #[test]
    fn next_run_rolls_over_to_tomorrow() {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(next_run_after(at("2024-05-01", 0, 0), midnight), at("2024-05-02", 0, 0));
        assert_eq!(next_run_after(at("2024-12-31", 23, 59), midnight), at("2025-01-01", 0, 0));
    }
}

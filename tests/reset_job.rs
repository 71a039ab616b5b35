mod common;

use std::collections::HashSet;

use async_trait::async_trait;
use common::{date, fixture, TODAY};
use pill_scheduler::error::{AppError, AppResult};
use pill_scheduler::models::Status;
use pill_scheduler::reset::{run_daily_reset, ResetReport};
use pill_scheduler::store::CycleStore;
use tokio::sync::Mutex;

#[tokio::test]
async fn reset_restores_projection_and_keeps_ledger() {
    let fx = fixture(&["alice", "bob"]).await;
    let a = fx.daily("alice", "2024-01-01", &["08:00", "20:00"]).await;
    let b = fx.daily("bob", "2024-01-01", &["08:00"]).await;
    let today = date(TODAY);

    for dose in &a.doses {
        fx.service.mark_dose_taken("alice", a.id, dose.id, today).await.unwrap();
    }
    fx.service
        .mark_dose_taken("bob", b.id, b.doses[0].id, date("2024-02-01"))
        .await
        .unwrap();
    fx.service.mark_dose_taken("bob", b.id, b.doses[0].id, today).await.unwrap();

    let before = fx.service.fetch_reminder("alice", a.id).await.unwrap();
    assert_eq!(before.remaining_doses, 0);
    assert_eq!(before.status, Status::Taken);

    let report = run_daily_reset(fx.store.as_ref()).await;
    assert_eq!(report, ResetReport { reset: 2, failed: vec![] });

    for (user, id, doses) in [("alice", a.id, 2), ("bob", b.id, 1)] {
        let r = fx.service.fetch_reminder(user, id).await.unwrap();
        assert_eq!(r.remaining_doses, doses);
        assert_eq!(r.status, Status::NotTaken);
    }

    let ledger = fx.service.ledger();
    assert_eq!(
        ledger.history_of(b.doses[0].id).await.unwrap(),
        vec![date("2024-02-01"), today]
    );
    assert_eq!(ledger.taken_count_for_user_on("alice", today).await.unwrap(), 2);
}

#[tokio::test]
async fn reset_covers_inactive_and_out_of_schedule_reminders() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2030-01-01", &["08:00"]).await;
    fx.service
        .set_flag("alice", r.id, pill_scheduler::models::Flag::Inactive)
        .await
        .unwrap();

    let report = run_daily_reset(fx.store.as_ref()).await;
    assert_eq!(report.reset, 1);
}

/// Store whose bulk reset always fails and which rejects one reminder.
struct FlakyCycles {
    ids: Vec<i64>,
    broken: i64,
    reset: Mutex<HashSet<i64>>,
}

#[async_trait]
impl CycleStore for FlakyCycles {
    async fn reset_all_cycles(&self) -> AppResult<u64> {
        Err(AppError::Internal(anyhow::anyhow!("statement timeout")))
    }

    async fn reminder_ids(&self) -> AppResult<Vec<i64>> {
        Ok(self.ids.clone())
    }

    async fn reset_cycle(&self, id: i64) -> AppResult<()> {
        if id == self.broken {
            return Err(AppError::Internal(anyhow::anyhow!("row locked")));
        }
        self.reset.lock().await.insert(id);
        Ok(())
    }
}

#[tokio::test]
async fn one_failing_reminder_does_not_abort_the_batch() {
    let store = FlakyCycles {
        ids: vec![1, 2, 3, 4],
        broken: 2,
        reset: Mutex::new(HashSet::new()),
    };

    let report = run_daily_reset(&store).await;

    assert_eq!(report.reset, 3);
    assert_eq!(report.failed, vec![2]);
    assert_eq!(*store.reset.lock().await, HashSet::from([1, 3, 4]));
}

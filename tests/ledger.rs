mod common;

use std::sync::Arc;

use common::{date, fixture};
use pill_scheduler::ledger::DoseLedger;
use pill_scheduler::AppError;

#[tokio::test]
async fn marking_twice_keeps_a_single_record() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let dose = r.doses[0].id;
    let ledger = DoseLedger::new(fx.store.clone());

    assert!(ledger.mark_taken(dose, date("2024-01-05")).await.unwrap());
    assert!(!ledger.mark_taken(dose, date("2024-01-05")).await.unwrap());

    let records = ledger
        .records_for_user_in_range("alice", date("2024-01-01"), date("2024-01-31"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dose_id, dose);
}

#[tokio::test]
async fn unmarking_an_absent_record_is_a_no_op() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let ledger = DoseLedger::new(fx.store.clone());

    assert!(!ledger.mark_not_taken(r.doses[0].id, date("2024-01-05")).await.unwrap());
}

#[tokio::test]
async fn mark_then_unmark_round_trips() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let dose = r.doses[0].id;
    let ledger = DoseLedger::new(fx.store.clone());
    let day = date("2024-01-05");

    ledger.mark_taken(dose, day).await.unwrap();
    assert!(ledger.is_taken(dose, day).await.unwrap());

    assert!(ledger.mark_not_taken(dose, day).await.unwrap());
    assert!(!ledger.is_taken(dose, day).await.unwrap());
}

#[tokio::test]
async fn history_is_ascending() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let dose = r.doses[0].id;
    let ledger = DoseLedger::new(fx.store.clone());

    for d in ["2024-01-09", "2024-01-02", "2024-01-05"] {
        ledger.mark_taken(dose, date(d)).await.unwrap();
    }

    assert_eq!(
        ledger.history_of(dose).await.unwrap(),
        vec![date("2024-01-02"), date("2024-01-05"), date("2024-01-09")]
    );
}

#[tokio::test]
async fn user_queries_only_see_that_users_doses() {
    let fx = fixture(&["alice", "bob"]).await;
    let a = fx.daily("alice", "2024-01-01", &["08:00", "20:00"]).await;
    let b = fx.daily("bob", "2024-01-01", &["08:00"]).await;
    let ledger = DoseLedger::new(fx.store.clone());
    let day = date("2024-01-05");

    ledger.mark_taken(a.doses[0].id, day).await.unwrap();
    ledger.mark_taken(a.doses[1].id, day).await.unwrap();
    ledger.mark_taken(b.doses[0].id, day).await.unwrap();
    ledger.mark_taken(a.doses[0].id, date("2024-02-01")).await.unwrap();

    assert_eq!(ledger.taken_count_for_user_on("alice", day).await.unwrap(), 2);
    assert_eq!(ledger.taken_count_for_user_on("bob", day).await.unwrap(), 1);

    let january = ledger
        .records_for_user_in_range("alice", date("2024-01-01"), date("2024-01-31"))
        .await
        .unwrap();
    assert_eq!(january.len(), 2);
    assert!(january.iter().all(|r| r.date == day));
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let fx = fixture(&["alice"]).await;
    let ledger = DoseLedger::new(fx.store.clone());

    let err = ledger
        .records_for_user_in_range("alice", date("2024-01-31"), date("2024-01-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn concurrent_marks_never_duplicate() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let dose = r.doses[0].id;
    let ledger = Arc::new(DoseLedger::new(fx.store.clone()));
    let day = date("2024-01-05");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.mark_taken(dose, day).await.unwrap() })
        })
        .collect();

    let mut created = 0;
    for h in handles {
        if h.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(ledger.history_of(dose).await.unwrap(), vec![day]);
}

#[tokio::test]
async fn deleting_a_reminder_drops_its_ledger_rows() {
    let fx = fixture(&["alice"]).await;
    let r = fx.daily("alice", "2024-01-01", &["08:00"]).await;
    let dose = r.doses[0].id;
    let ledger = DoseLedger::new(fx.store.clone());
    ledger.mark_taken(dose, date("2024-01-05")).await.unwrap();

    fx.service.delete_reminder("alice", r.id).await.unwrap();

    assert!(ledger.history_of(dose).await.unwrap().is_empty());
}

use std::{sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, Utc};
use payin_common::Money;
use payin_engine::{
    core_api::CaptureFlowApi,
    db_types::{IntentId, IntentStatus, NewPaymentIntent},
    events::EventProducers,
    jobs::{CaptureScheduler, JobPool},
    test_utils::{init_test_logging, MemoryStore, ScriptedGateway},
    traits::PaymentIntentStore,
};

fn build_scheduler(
    store: &MemoryStore,
    gateway: &ScriptedGateway,
    capacity: usize,
    page_size: usize,
) -> CaptureScheduler<MemoryStore, ScriptedGateway> {
    let pool = Arc::new(JobPool::new("test", capacity));
    let api = Arc::new(CaptureFlowApi::new(store.clone(), gateway.clone(), EventProducers::default()));
    CaptureScheduler::new(store.clone(), api, pool).with_page_size(page_size)
}

async fn wait_for_status(store: &MemoryStore, id: &IntentId, status: IntentStatus) {
    for _ in 0..300 {
        if store.fetch_intent(id).await.unwrap().unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("intent {id} never reached {status}");
}

#[tokio::test]
async fn discovery_captures_due_intents_oldest_first() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let now = Utc::now();
    let oldest = store
        .insert(NewPaymentIntent::new(Money::from(100)).with_capture_after(now - ChronoDuration::hours(3)))
        .await;
    let middle = store
        .insert(NewPaymentIntent::new(Money::from(200)).with_capture_after(now - ChronoDuration::hours(2)))
        .await;
    let not_due = store
        .insert(NewPaymentIntent::new(Money::from(300)).with_capture_after(now + ChronoDuration::hours(1)))
        .await;

    // Capacity 1 serialises execution so the dispatch order is observable; page size 1 forces the cursor to walk.
    let scheduler = build_scheduler(&store, &gateway, 1, 1);
    let summary = scheduler.discovery_pass().await.unwrap();
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.pages, 2);

    wait_for_status(&store, &oldest.id, IntentStatus::Captured).await;
    wait_for_status(&store, &middle.id, IntentStatus::Captured).await;
    assert_eq!(store.fetch_intent(&not_due.id).await.unwrap().unwrap().status, IntentStatus::RequiresCapture);
    assert_eq!(gateway.call_order(), vec![oldest.id.clone(), middle.id.clone()]);
}

#[tokio::test]
async fn recovery_rearms_only_genuinely_stale_intents() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let stuck = store.insert(NewPaymentIntent::new(Money::from(100))).await;
    let active = store.insert(NewPaymentIntent::new(Money::from(200))).await;
    store.force_status(&stuck.id, IntentStatus::Capturing, Utc::now() - ChronoDuration::hours(2));
    store.force_status(&active.id, IntentStatus::Capturing, Utc::now() - ChronoDuration::minutes(10));

    let scheduler = build_scheduler(&store, &gateway, 2, 10).with_stale_after(ChronoDuration::hours(1));
    let stats = scheduler.recovery_pass().await.unwrap();
    assert_eq!(stats.dispatched, 1);

    wait_for_status(&store, &stuck.id, IntentStatus::RequiresCapture).await;
    assert_eq!(store.fetch_intent(&active.id).await.unwrap().unwrap().status, IntentStatus::Capturing);
    assert_eq!(gateway.capture_calls(), 0);
}

#[tokio::test]
async fn a_stuck_capture_recovers_end_to_end() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(500))).await;
    // A worker claimed this intent 90 minutes ago and died without resolving it.
    store.force_status(&intent.id, IntentStatus::Capturing, Utc::now() - ChronoDuration::minutes(90));

    let scheduler = build_scheduler(&store, &gateway, 2, 10);
    scheduler.recovery_pass().await.unwrap();
    wait_for_status(&store, &intent.id, IntentStatus::RequiresCapture).await;

    scheduler.discovery_pass().await.unwrap();
    wait_for_status(&store, &intent.id, IntentStatus::Captured).await;

    assert_eq!(gateway.capture_calls(), 1);
    assert!(store.get_receipt(&intent.idempotency_key).await.unwrap().is_some());
}

#[tokio::test]
async fn concurrent_discovery_passes_do_not_double_capture() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let mut intents = Vec::new();
    for i in 0..5i64 {
        let intent = store
            .insert(NewPaymentIntent::new(Money::from(100 * (i + 1))).with_capture_after(Utc::now() - ChronoDuration::minutes(i + 1)))
            .await;
        intents.push(intent);
    }

    let scheduler = Arc::new(build_scheduler(&store, &gateway, 4, 2));
    let (first, second) = tokio::join!(scheduler.discovery_pass(), scheduler.discovery_pass());
    first.unwrap();
    second.unwrap();

    for intent in &intents {
        wait_for_status(&store, &intent.id, IntentStatus::Captured).await;
    }
    assert_eq!(gateway.capture_calls(), intents.len());
}

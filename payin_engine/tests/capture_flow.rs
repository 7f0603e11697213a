use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use payin_common::Money;
use payin_engine::{
    core_api::{CaptureError, CaptureFlowApi, CaptureOutcome},
    db_types::{IntentStatus, NewPaymentIntent},
    events::{EventHandlers, EventHooks, EventProducers},
    helpers::retry::RetryPolicy,
    test_utils::{init_test_logging, MemoryStore, ScriptedGateway},
    traits::{AmbiguousFailure, CaptureResponse, Decline, DeclineCode, PaymentIntentStore},
};

fn capture_api(store: &MemoryStore, gateway: &ScriptedGateway) -> CaptureFlowApi<MemoryStore, ScriptedGateway> {
    CaptureFlowApi::new(store.clone(), gateway.clone(), EventProducers::default())
        .with_retry_policy(RetryPolicy::new(4, Duration::from_millis(2)))
}

#[tokio::test]
async fn a_due_intent_captures_end_to_end() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(500)).with_currency("usd")).await;

    let outcome = capture_api(&store, &gateway).capture(&intent).await.unwrap();

    let receipt = match outcome {
        CaptureOutcome::Captured(receipt) => receipt,
        other => panic!("expected a capture, got {other:?}"),
    };
    assert_eq!(receipt.amount, Money::from(500));
    assert_eq!(receipt.currency, "usd");

    let stored = store.fetch_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Captured);
    assert_eq!(stored.amount_captured, Some(Money::from(500)));
    assert!(stored.captured_at.is_some());

    let saved = store.get_receipt(&intent.idempotency_key).await.unwrap().unwrap();
    assert_eq!(saved.provider_charge_id, receipt.provider_charge_id);
    assert_eq!(gateway.capture_calls(), 1);
}

#[tokio::test]
async fn racing_captures_make_exactly_one_remote_call() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(2_000))).await;
    let api = Arc::new(capture_api(&store, &gateway));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let api = Arc::clone(&api);
        let snapshot = intent.clone();
        handles.push(tokio::spawn(async move { api.capture(&snapshot).await.unwrap() }));
    }

    let mut captured = 0;
    let mut noops = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CaptureOutcome::Captured(_) => captured += 1,
            CaptureOutcome::AlreadyClaimed => noops += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(captured, 1);
    assert_eq!(noops, 7);
    assert_eq!(gateway.capture_calls(), 1);
    assert_eq!(store.fetch_intent(&intent.id).await.unwrap().unwrap().status, IntentStatus::Captured);
}

#[tokio::test]
async fn a_timeout_leaves_the_intent_in_capturing() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    gateway.enqueue(CaptureResponse::Ambiguous(AmbiguousFailure::Timeout(10_000)));
    let intent = store.insert(NewPaymentIntent::new(Money::from(500))).await;

    let outcome = capture_api(&store, &gateway).capture(&intent).await.unwrap();

    assert!(matches!(outcome, CaptureOutcome::Pending(AmbiguousFailure::Timeout(_))));
    let stored = store.fetch_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Capturing);
    assert!(store.get_receipt(&intent.idempotency_key).await.unwrap().is_none());
    assert_eq!(gateway.capture_calls(), 1);
}

#[tokio::test]
async fn a_decline_marks_the_intent_capture_failed() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    gateway.enqueue(CaptureResponse::Declined(Decline::new(DeclineCode::InsufficientFunds, "balance too low")));
    let intent = store.insert(NewPaymentIntent::new(Money::from(500))).await;

    let outcome = capture_api(&store, &gateway).capture(&intent).await.unwrap();

    assert!(matches!(outcome, CaptureOutcome::Declined(d) if d.code == DeclineCode::InsufficientFunds));
    let stored = store.fetch_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::CaptureFailed);
    assert!(store.get_receipt(&intent.idempotency_key).await.unwrap().is_none());
}

#[tokio::test]
async fn receipt_saves_retry_through_transient_store_failures() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(750))).await;
    store.fail_next_receipt_saves(2);

    let outcome = capture_api(&store, &gateway).capture(&intent).await.unwrap();

    assert!(matches!(outcome, CaptureOutcome::Captured(_)));
    assert_eq!(gateway.capture_calls(), 1);
    assert!(store.get_receipt(&intent.idempotency_key).await.unwrap().is_some());
    assert_eq!(store.fetch_intent(&intent.id).await.unwrap().unwrap().status, IntentStatus::Captured);
}

#[tokio::test]
async fn exhausted_ledger_writes_escalate_instead_of_vanishing() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(750))).await;
    // One more failure than the retry budget allows.
    store.fail_next_receipt_saves(4);

    let err = capture_api(&store, &gateway).capture(&intent).await.unwrap_err();

    assert!(matches!(err, CaptureError::LedgerDrift { attempts: 4, .. }));
    assert_eq!(gateway.capture_calls(), 1);
    // The intent stays in Capturing: the recovery pass plus the provider's idempotency guarantee settle it later.
    assert_eq!(store.fetch_intent(&intent.id).await.unwrap().unwrap().status, IntentStatus::Capturing);
}

#[tokio::test]
async fn capture_completed_hooks_fire() {
    init_test_logging();
    let store = MemoryStore::new();
    let gateway = ScriptedGateway::new();
    let intent = store.insert(NewPaymentIntent::new(Money::from(1_250))).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let mut hooks = EventHooks::default();
    hooks.on_capture_completed(move |event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            assert_eq!(event.receipt.amount, Money::from(1_250));
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = CaptureFlowApi::new(store.clone(), gateway.clone(), producers);
    api.capture(&intent).await.unwrap();

    for _ in 0..100 {
        if seen.load(Ordering::SeqCst) == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("the capture-completed hook never fired");
}

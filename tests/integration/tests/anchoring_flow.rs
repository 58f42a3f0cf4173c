//! Integration test: issuance feeding the anchor queue and ledger.

use std::time::Duration;

use haven_anchor::{FlushOutcome, InMemoryLedger, LedgerClient};
use haven_core::AnchorState;
use haven_integration_tests::Stack;

async fn wait_until_idle(stack: &Stack) {
    while stack.queue.is_flushing() {
        tokio::task::yield_now().await;
    }
}

async fn wait_for_submission(ledger: &InMemoryLedger) {
    while ledger.pending_transactions() == 0 {
        tokio::task::yield_now().await;
    }
}

fn issue(stack: &Stack, n: usize) -> haven_identity::SignedCredential {
    stack
        .issuer
        .issue_credential(
            "did:key:zRecipient",
            "CommunityVouch",
            serde_json::json!({"seq": n}),
        )
        .unwrap()
}

#[tokio::test]
async fn test_threshold_issuance_submits_one_batch() {
    let stack = Stack::new("Office", 5);
    let issued: Vec<_> = (0..5).map(|i| issue(&stack, i)).collect();

    // The fifth issuance started the flush; wait for it to settle.
    tokio::task::yield_now().await;
    wait_until_idle(&stack).await;

    assert_eq!(stack.ledger.submission_count(), 1);
    let submission = &stack.ledger.submissions()[0];
    assert_eq!(submission.fingerprints.len(), 5);
    for signed in &issued {
        let fp = signed.fingerprint().unwrap();
        assert_eq!(stack.queue.local_state(&fp), Some(AnchorState::Anchored));
        assert!(stack.ledger.query_anchored(&fp).await.unwrap().anchored);
    }
}

#[tokio::test]
async fn test_below_threshold_waits_for_manual_flush() {
    let stack = Stack::new("Office", 5);
    for i in 0..4 {
        issue(&stack, i);
    }
    tokio::task::yield_now().await;
    assert_eq!(stack.ledger.submission_count(), 0);
    assert_eq!(stack.issuer.stats().pending_anchors, 4);

    match stack.issuer.anchor_now().await {
        FlushOutcome::Anchored(records) => assert_eq!(records.len(), 4),
        other => panic!("expected Anchored, got {:?}", other),
    }
    assert_eq!(stack.issuer.stats().pending_anchors, 0);
}

#[tokio::test]
async fn test_issuance_during_flush_is_kept() {
    let stack = Stack::new("Office", 100);
    let a = issue(&stack, 0);
    let b = issue(&stack, 1);

    stack.ledger.hold_confirmations();
    let queue = stack.queue.clone();
    let flight = tokio::spawn(async move { queue.flush().await });
    wait_for_submission(&stack.ledger).await;

    let c = issue(&stack, 2);
    assert!(matches!(stack.issuer.anchor_now().await, FlushOutcome::AlreadyFlushing));

    stack.ledger.release_confirmations();
    assert!(flight.await.unwrap().is_anchored());

    assert_eq!(stack.queue.pending_fingerprints(), vec![c.fingerprint().unwrap()]);
    for signed in [&a, &b] {
        assert!(stack.queue.anchor_record(&signed.fingerprint().unwrap()).is_some());
    }
}

#[tokio::test]
async fn test_rejected_batch_is_retried() {
    let stack = Stack::new("Office", 100);
    let a = issue(&stack, 0);
    let b = issue(&stack, 1);

    stack.ledger.hold_confirmations();
    stack.ledger.set_reject_confirmations(true);
    let queue = stack.queue.clone();
    let flight = tokio::spawn(async move { queue.flush().await });
    wait_for_submission(&stack.ledger).await;
    let c = issue(&stack, 2);
    stack.ledger.release_confirmations();

    match flight.await.unwrap() {
        // Only the in-flight batch was lost; the late issuance was never sent.
        FlushOutcome::Failed { retained, .. } => assert_eq!(retained, 2),
        other => panic!("expected Failed, got {:?}", other),
    }
    let expected: Vec<_> = [&a, &b, &c].iter().map(|s| s.fingerprint().unwrap()).collect();
    assert_eq!(stack.queue.pending_fingerprints(), expected);

    stack.ledger.set_reject_confirmations(false);
    assert!(stack.issuer.anchor_now().await.is_anchored());
    assert_eq!(stack.queue.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timer_anchors_quiet_issuer() {
    let stack = Stack::new("Office", 100);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let timer = stack
        .queue
        .spawn_flush_timer(Duration::from_secs(60), shutdown_rx);

    let signed = issue(&stack, 0);
    tokio::time::sleep(Duration::from_secs(61)).await;
    wait_until_idle(&stack).await;

    assert_eq!(
        stack.queue.local_state(&signed.fingerprint().unwrap()),
        Some(AnchorState::Anchored)
    );

    shutdown_tx.send_replace(true);
    timer.await.unwrap();
}

#[tokio::test]
async fn test_issuers_share_ledger() {
    let a = Stack::new("School", 100);
    let b = Stack::with_ledger(a.ledger.clone(), "Clinic", 100);
    let from_a = issue(&a, 0);
    let from_b = issue(&b, 0);

    assert!(a.issuer.anchor_now().await.is_anchored());
    assert!(b.issuer.anchor_now().await.is_anchored());
    assert_eq!(a.ledger.submission_count(), 2);

    // Queue-local state is per issuer; ledger state is shared.
    let fp_b = from_b.fingerprint().unwrap();
    assert_eq!(a.queue.local_state(&fp_b), None);
    assert!(a.queue.is_anchored(&from_b.credential).await.unwrap().anchored);
    assert!(b.queue.is_anchored(&from_a.credential).await.unwrap().anchored);
}

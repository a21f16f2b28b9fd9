use super::controller::TurnOutcome;
use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ============================================================================
// Helpers
// ============================================================================

fn gate() -> Arc<AdmissionGate<usize>> {
    Arc::new(AdmissionGate::new(RequestClassifier::default(), None))
}

fn gate_with_timeout(limit: Duration) -> Arc<AdmissionGate<usize>> {
    Arc::new(AdmissionGate::new(RequestClassifier::default(), Some(limit)))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Occupy the gate with a mutating request that runs until released
async fn hold_gate(
    gate: &Arc<AdmissionGate<usize>>,
) -> (oneshot::Sender<()>, JoinHandle<Result<usize, GateError>>) {
    let (release, released) = oneshot::channel::<()>();
    let holder = Arc::clone(gate);
    let handle = tokio::spawn(async move {
        holder
            .run_serialized(async move {
                let _ = released.await;
                0
            })
            .await
    });
    wait_until(|| gate.is_running()).await;
    (release, handle)
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_three_tickets_run_in_admission_order() {
    let gate = gate();
    let order = Arc::new(Mutex::new(Vec::new()));
    let (release, holder) = hold_gate(&gate).await;

    let mut handles = Vec::new();
    for id in 1..=3usize {
        let g = Arc::clone(&gate);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            g.run_serialized(async move {
                order.lock().unwrap().push(id);
                id
            })
            .await
        }));
        // The holder plus every ticket submitted so far
        wait_until(|| gate.stats().admitted == 1 + id as u64).await;
    }

    assert_eq!(gate.stats().pending, 3);
    release.send(()).unwrap();

    for (expected, handle) in (1..=3usize).zip(handles) {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }
    assert_eq!(holder.await.unwrap().unwrap(), 0);
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_queued_ticket_finishes_before_next_begins() {
    let gate = gate();
    let events = Arc::new(Mutex::new(Vec::new()));
    let (release, holder) = hold_gate(&gate).await;

    let mut handles = Vec::new();
    for id in 0..5usize {
        let g = Arc::clone(&gate);
        let events = Arc::clone(&events);
        handles.push(tokio::spawn(async move {
            g.run_serialized(async move {
                events.lock().unwrap().push(("start", id));
                tokio::time::sleep(Duration::from_millis(2)).await;
                events.lock().unwrap().push(("end", id));
                id
            })
            .await
        }));
        wait_until(|| gate.stats().admitted == 2 + id as u64).await;
    }

    release.send(()).unwrap();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    holder.await.unwrap().unwrap();

    let expected: Vec<_> = (0..5usize)
        .flat_map(|id| [("start", id), ("end", id)])
        .collect();
    assert_eq!(*events.lock().unwrap(), expected);
}

// ============================================================================
// Exactly-once and mutual exclusion
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_ticket_runs_exactly_once_and_answers_its_owner() {
    const N: usize = 50;
    let gate = gate();
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..N).map(|_| AtomicUsize::new(0)).collect());

    let handles: Vec<_> = (0..N)
        .map(|id| {
            let g = Arc::clone(&gate);
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                g.run_serialized(async move {
                    runs[id].fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    id
                })
                .await
            })
        })
        .collect();

    for (id, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), id);
    }

    assert!(runs.iter().all(|count| count.load(Ordering::SeqCst) == 1));
    let stats = gate.stats();
    assert_eq!(stats.admitted, N as u64);
    assert_eq!(stats.completed, N as u64);
    assert_eq!(stats.pending, 0);
    assert!(!gate.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_continuations_never_overlap() {
    let gate = gate();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..20usize)
        .map(|id| {
            let g = Arc::clone(&gate);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                g.run_serialized(async move {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    id
                })
                .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_wrap_serializes_only_mutating_paths() {
    let gate = gate();

    assert_eq!(gate.wrap("/v1/rules/query", async { 1 }).await.unwrap(), 1);
    assert_eq!(gate.stats().admitted, 0);

    assert_eq!(gate.wrap("/v1/rules/delete", async { 2 }).await.unwrap(), 2);
    assert_eq!(gate.wrap("/v1/rules/add-batch?x=1", async { 3 }).await.unwrap(), 3);
    assert_eq!(gate.stats().admitted, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_only_traffic_ignores_queue_depth() {
    let gate = gate();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (release, holder) = hold_gate(&gate).await;

    let writes: Vec<_> = (0..10usize)
        .map(|id| {
            let g = Arc::clone(&gate);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                g.wrap("/v1/tags/delete", async move {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    id
                })
                .await
            })
        })
        .collect();
    wait_until(|| gate.stats().pending == 10).await;

    // All reads finish while ten writes are still parked behind the holder
    let reads: Vec<_> = (0..50usize)
        .map(|id| {
            let g = Arc::clone(&gate);
            tokio::spawn(async move { g.wrap("/v1/tags/query", async move { id }).await })
        })
        .collect();
    for (id, read) in reads.into_iter().enumerate() {
        let answer = tokio::time::timeout(Duration::from_secs(1), read)
            .await
            .expect("read-only request was delayed by the gate");
        assert_eq!(answer.unwrap().unwrap(), id);
    }
    assert_eq!(gate.stats().pending, 10);

    release.send(()).unwrap();
    holder.await.unwrap().unwrap();
    for (id, write) in writes.into_iter().enumerate() {
        assert_eq!(write.await.unwrap().unwrap(), id);
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_panicking_continuation_releases_the_lock() {
    let gate = gate();

    let result = gate
        .run_serialized(async {
            if true {
                panic!("handler failed");
            }
            0
        })
        .await;
    assert!(matches!(result, Err(GateError::Abandoned)));
    assert!(!gate.is_running());

    assert_eq!(gate.run_serialized(async { 9 }).await.unwrap(), 9);
    let stats = gate.stats();
    assert_eq!(stats.panicked, 1);
    assert_eq!(stats.completed, 1);
}

#[tokio::test]
async fn test_acquire_timeout_withdraws_own_ticket() {
    let gate = gate_with_timeout(Duration::from_millis(30));
    let (release, holder) = hold_gate(&gate).await;
    let ran = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&ran);
    let result = gate
        .run_serialized(async move {
            flag.store(true, Ordering::SeqCst);
            1
        })
        .await;

    assert!(matches!(result, Err(GateError::Busy { .. })));
    assert_eq!(gate.stats().withdrawn, 1);
    assert_eq!(gate.stats().pending, 0);

    release.send(()).unwrap();
    holder.await.unwrap().unwrap();
    assert!(!ran.load(Ordering::SeqCst));

    // The gate keeps working after a withdrawal
    assert_eq!(gate.run_serialized(async { 2 }).await.unwrap(), 2);
}

#[tokio::test]
async fn test_timed_out_turn_keeps_contending_after_its_ticket_ran() {
    let gate = gate_with_timeout(Duration::from_millis(40));
    let order = Arc::new(Mutex::new(Vec::new()));
    let (release, holder) = hold_gate(&gate).await;

    let slow = Arc::clone(&order);
    let (a, reply_a) = gate.admit(async move {
        slow.lock().unwrap().push("A-start");
        tokio::time::sleep(Duration::from_millis(150)).await;
        slow.lock().unwrap().push("A-end");
        1
    });
    let fast = Arc::clone(&order);
    let (b, reply_b) = gate.admit(async move {
        fast.lock().unwrap().push("B");
        2
    });

    // B's turn reaches the lock first, so it serves A at the head
    let g = Arc::clone(&gate);
    let turn_b = tokio::spawn(async move { g.take_turn(b).await });
    tokio::task::yield_now().await;
    release.send(()).unwrap();
    assert_eq!(holder.await.unwrap().unwrap(), 0);
    wait_until(|| order.lock().unwrap().contains(&"A-start")).await;

    // A's bounded wait expires while A runs; there is nothing left to withdraw
    let g = Arc::clone(&gate);
    let turn_a = tokio::spawn(async move { g.take_turn(a).await });

    assert_eq!(turn_b.await.unwrap(), TurnOutcome::Served);
    assert_eq!(turn_a.await.unwrap(), TurnOutcome::Served);
    assert_eq!(reply_a.await.unwrap(), 1);
    assert_eq!(reply_b.await.unwrap(), 2);
    assert_eq!(*order.lock().unwrap(), vec!["A-start", "A-end", "B"]);

    let stats = gate.stats();
    assert_eq!(stats.withdrawn, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completed, 3);
}

#[test]
fn test_busy_maps_to_retriable_app_error() {
    let err: rulegate_error::AppError = GateError::Busy {
        waited: Duration::from_millis(1500),
    }
    .into();
    assert!(err.is_retriable());
    assert_eq!(err.error_code(), rulegate_error::CODE_GATE_BUSY);
}

#[tokio::test]
async fn test_dropped_caller_does_not_strand_its_ticket() {
    let gate = gate();
    let (release, holder) = hold_gate(&gate).await;
    let ran = Arc::new(AtomicBool::new(false));

    let g = Arc::clone(&gate);
    let flag = Arc::clone(&ran);
    let caller = tokio::spawn(async move {
        g.run_serialized(async move {
            flag.store(true, Ordering::SeqCst);
            5
        })
        .await
    });
    wait_until(|| gate.stats().pending == 1).await;
    caller.abort();

    release.send(()).unwrap();
    holder.await.unwrap().unwrap();

    wait_until(|| ran.load(Ordering::SeqCst)).await;
    wait_until(|| gate.stats().pending == 0 && !gate.is_running()).await;
    assert_eq!(gate.stats().completed, 2);
}

use super::*;
use std::time::Duration;

#[test]
fn starts_not_cancelled() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancel_is_observable_via_is_cancelled() {
    let token = CancelToken::new();
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn clones_share_cancellation_state() {
    let token = CancelToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn cancelled_resolves_immediately_once_already_cancelled() {
    let token = CancelToken::new();
    token.cancel();
    tokio::time::timeout(Duration::from_millis(50), token.cancelled())
        .await
        .expect("cancelled() must not block once already cancelled");
}

#[tokio::test]
async fn cancelled_wakes_waiters_on_cancel() {
    let token = CancelToken::new();
    let waiter_token = token.clone();
    let waiter = tokio::spawn(async move {
        waiter_token.cancelled().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_millis(200), waiter)
        .await
        .expect("waiter must be woken")
        .expect("waiter task must not panic");
}

/// Regression test for a missed-wakeup race: on a real multi-threaded
/// runtime, a `cancel()` landing between the flag check and the `Notify`
/// registration inside `cancelled()` must still be observed, not lost.
/// Spawns many concurrent waiters racing many concurrent cancellers so the
/// window has many chances to open if `cancelled()` ever regresses to
/// checking the flag before calling `notified()`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_never_misses_a_cancel_racing_across_threads() {
    for _ in 0..200 {
        let token = CancelToken::new();
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let waiter_token = token.clone();
            waiters.push(tokio::spawn(async move {
                waiter_token.cancelled().await;
            }));
        }
        token.cancel();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_millis(500), waiter)
                .await
                .expect("waiter must be woken even when cancel races the registration")
                .expect("waiter task must not panic");
        }
    }
}

//! Shared busy/idle signal for in-flight remote calls.
//!
//! Every orchestrator that should drive a spinner gets a clone of the same
//! [`ActivityIndicator`]. Overlapping calls add up; observers only see
//! "idle" once the last of them has finished.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Reference-counted activity signal.
///
/// Clones share the same counter.
#[derive(Clone, Debug)]
pub struct ActivityIndicator {
  count: Arc<watch::Sender<usize>>,
}

impl ActivityIndicator {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(0);
    Self {
      count: Arc::new(tx),
    }
  }

  /// Number of tracked operations currently in flight.
  pub fn in_flight(&self) -> usize {
    *self.count.borrow()
  }

  pub fn is_busy(&self) -> bool {
    self.in_flight() > 0
  }

  /// Mark the start of an operation.
  ///
  /// The returned token marks the end when dropped.
  pub fn begin(&self) -> ActivityToken {
    adjust(&self.count, |count| count + 1);
    ActivityToken {
      count: Arc::clone(&self.count),
    }
  }

  /// Run `operation` with the counter raised for its whole lifetime.
  ///
  /// The counter is raised when the returned future is first polled and
  /// lowered exactly once when it completes or is dropped.
  pub async fn track<F>(&self, operation: F) -> F::Output
  where
    F: Future,
  {
    let _token = self.begin();
    operation.await
  }

  /// Observe busy/idle transitions.
  pub fn subscribe(&self) -> ActivityReceiver {
    ActivityReceiver {
      rx: self.count.subscribe(),
    }
  }
}

impl Default for ActivityIndicator {
  fn default() -> Self {
    Self::new()
  }
}

/// Held while an operation is in flight.
#[must_use = "dropping the token immediately ends the activity"]
#[derive(Debug)]
pub struct ActivityToken {
  count: Arc<watch::Sender<usize>>,
}

impl Drop for ActivityToken {
  fn drop(&mut self) {
    adjust(&self.count, |count| count.saturating_sub(1));
  }
}

/// Apply `step` to the counter, waking receivers only when busy/idle flips.
fn adjust(count: &watch::Sender<usize>, step: impl FnOnce(usize) -> usize) {
  count.send_if_modified(|count| {
    let was_busy = *count > 0;
    *count = step(*count);
    was_busy != (*count > 0)
  });
}

/// Read side of an [`ActivityIndicator`].
#[derive(Clone, Debug)]
pub struct ActivityReceiver {
  rx: watch::Receiver<usize>,
}

impl ActivityReceiver {
  pub fn is_busy(&self) -> bool {
    *self.rx.borrow() > 0
  }

  /// Wait for the next change and return the busy state after it.
  ///
  /// Returns `None` once every indicator handle has been dropped.
  pub async fn changed(&mut self) -> Option<bool> {
    self.rx.changed().await.ok()?;
    Some(*self.rx.borrow_and_update() > 0)
  }

  /// Wait until the busy state equals `busy`.
  pub async fn wait_until(&mut self, busy: bool) -> Option<()> {
    self
      .rx
      .wait_for(|count| (*count > 0) == busy)
      .await
      .ok()
      .map(|_| ())
  }
}

/// Track `operation` when an indicator is configured, run it plainly otherwise.
pub(crate) async fn maybe_track<F>(indicator: Option<&ActivityIndicator>, operation: F) -> F::Output
where
  F: Future,
{
  match indicator {
    Some(indicator) => indicator.track(operation).await,
    None => operation.await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::sync::oneshot;

  #[tokio::test]
  async fn test_track_balances_on_success_and_failure() {
    let indicator = ActivityIndicator::new();

    let ok: Result<u32, String> = indicator.track(async { Ok(1) }).await;
    assert_eq!(ok, Ok(1));
    assert_eq!(indicator.in_flight(), 0);

    let err: Result<u32, String> = indicator.track(async { Err("boom".to_string()) }).await;
    assert!(err.is_err());
    assert_eq!(indicator.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_overlapping_calls_sum() {
    let indicator = ActivityIndicator::new();
    let (long_tx, long_rx) = oneshot::channel::<()>();
    let (short_tx, short_rx) = oneshot::channel::<()>();

    let long = tokio::spawn({
      let indicator = indicator.clone();
      async move { indicator.track(long_rx).await }
    });
    let short = tokio::spawn({
      let indicator = indicator.clone();
      async move { indicator.track(short_rx).await }
    });

    let mut rx = indicator.subscribe();
    rx.wait_until(true).await;
    while indicator.in_flight() < 2 {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }

    short_tx.send(()).unwrap();
    short.await.unwrap().unwrap();
    // The long call keeps the signal busy
    assert!(indicator.is_busy());
    assert_eq!(indicator.in_flight(), 1);

    long_tx.send(()).unwrap();
    long.await.unwrap().unwrap();
    rx.wait_until(false).await;
    assert!(!indicator.is_busy());
  }

  #[tokio::test]
  async fn test_dropped_future_releases_counter() {
    let indicator = ActivityIndicator::new();
    let pending = indicator.track(std::future::pending::<()>());

    let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
    assert!(timed_out.is_err());
    assert_eq!(indicator.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_receiver_reports_transitions() {
    let indicator = ActivityIndicator::new();
    let mut rx = indicator.subscribe();
    assert!(!rx.is_busy());

    let token = indicator.begin();
    assert_eq!(rx.changed().await, Some(true));
    drop(token);
    assert_eq!(rx.changed().await, Some(false));
  }

  #[tokio::test]
  async fn test_nested_calls_do_not_reemit_busy() {
    let indicator = ActivityIndicator::new();
    let mut rx = indicator.subscribe();

    let first = indicator.begin();
    assert_eq!(rx.changed().await, Some(true));

    let second = indicator.begin();
    drop(first);
    assert_eq!(indicator.in_flight(), 1);
    let quiet = tokio::time::timeout(Duration::from_millis(20), rx.changed()).await;
    assert!(quiet.is_err());

    drop(second);
    assert_eq!(rx.changed().await, Some(false));
  }

  #[tokio::test]
  async fn test_untracked_passthrough() {
    assert_eq!(maybe_track(None, async { 7 }).await, 7);

    let indicator = ActivityIndicator::new();
    assert_eq!(maybe_track(Some(&indicator), async { 8 }).await, 8);
    assert_eq!(indicator.in_flight(), 0);
  }
}

//! Per-source token-bucket rate limiter.
//!
//! Capacity is the burst size; tokens refill continuously at
//! `requests_per_minute / 60` per second via an owned background task.
//! [`RateLimiter::try_acquire`] is non-blocking; [`RateLimiter::acquire`] is
//! a cancel-safe future (callers bound it with `tokio::time::timeout`).
//! [`RateLimiter::close`] stops the refill task and wakes every waiter with
//! an error; the limiter is unusable afterwards.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::time::Instant;
use tokio::task::JoinHandle;
use tracing::warn;

use sourcedock_shared::{Result, SourceDockError};

/// Refill bookkeeping granularity.
const REFILL_TICK: Duration = Duration::from_millis(50);

/// Mutable bucket state, fractional so sub-token refill accumulates.
struct Bucket {
    capacity: f64,
    available: f64,
    closed: bool,
}

struct Inner {
    state: Mutex<Bucket>,
    notify: Notify,
}

/// Token-bucket limiter for one source.
///
/// Must be created inside a Tokio runtime: construction spawns the refill
/// task. Dropping the limiter stops the task.
pub struct RateLimiter {
    name: String,
    inner: Arc<Inner>,
    shutdown_tx: watch::Sender<bool>,
    refill_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter allowing `burst` immediate acquisitions and refilling
    /// at `requests_per_minute / 60` tokens per second.
    ///
    /// Non-positive parameters are clamped to 1, never a panic — the guard
    /// rejects them in loaded configs, but programmatic construction may
    /// still pass zero.
    pub fn new(name: impl Into<String>, requests_per_minute: u32, burst: u32) -> Self {
        let name = name.into();
        if requests_per_minute == 0 || burst == 0 {
            warn!(
                source = %name,
                requests_per_minute,
                burst,
                "non-positive rate limiter parameters, clamping to 1"
            );
        }
        let rate = f64::from(requests_per_minute.max(1)) / 60.0;
        let capacity = f64::from(burst.max(1));

        let inner = Arc::new(Inner {
            state: Mutex::new(Bucket {
                capacity,
                available: capacity,
                closed: false,
            }),
            notify: Notify::new(),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(refill_loop(Arc::clone(&inner), rate, shutdown_rx));

        Self {
            name,
            inner,
            shutdown_tx,
            refill_task: Mutex::new(Some(task)),
        }
    }

    /// Take one token without waiting. Succeeds iff a full token is
    /// available and the limiter is open.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.inner.state.lock() else {
            return false;
        };
        if state.closed || state.available < 1.0 {
            return false;
        }
        state.available -= 1.0;
        true
    }

    /// Wait until a token is available.
    ///
    /// Cancel-safe: dropping the future (e.g. through `tokio::time::timeout`)
    /// leaves the bucket consistent. Returns an error immediately once the
    /// limiter has been closed.
    pub async fn acquire(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            {
                let Ok(mut state) = self.inner.state.lock() else {
                    return Err(self.closed_error());
                };
                if state.closed {
                    return Err(self.closed_error());
                }
                if state.available >= 1.0 {
                    state.available -= 1.0;
                    return Ok(());
                }
            }

            // Woken by the refill task when a token lands, or by close().
            // A missed notify only costs one refill tick.
            tokio::select! {
                _ = self.inner.notify.notified() => {}
                _ = shutdown_rx.changed() => {}
            }
        }
    }

    /// Stop the refill task and wake every blocked `acquire` with an error.
    /// Idempotent; the limiter stays closed forever after.
    pub fn close(&self) {
        {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.closed {
                return;
            }
            state.closed = true;
        }
        let _ = self.shutdown_tx.send(true);
        self.inner.notify.notify_waiters();
        if let Ok(mut task) = self.refill_task.lock() {
            task.take();
        }
    }

    /// Burst capacity, for introspection.
    pub fn capacity(&self) -> u32 {
        self.inner
            .state
            .lock()
            .map(|s| s.capacity as u32)
            .unwrap_or(0)
    }

    fn closed_error(&self) -> SourceDockError {
        SourceDockError::RateLimited {
            source_name: self.name.clone(),
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        // Stop the background task so tests never leak refill work.
        let _ = self.shutdown_tx.send(true);
    }
}

async fn refill_loop(inner: Arc<Inner>, rate: f64, mut shutdown_rx: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(REFILL_TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Runtime clock, not the wall clock: elapsed time must track the same
    // clock the interval fires on or a paused test clock starves the bucket.
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last).as_secs_f64();
                last = now;

                let Ok(mut state) = inner.state.lock() else {
                    break;
                };
                if state.closed {
                    break;
                }
                state.available = (state.available + elapsed * rate).min(state.capacity);
                let wake = state.available >= 1.0;
                drop(state);
                if wake {
                    inner.notify.notify_waiters();
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

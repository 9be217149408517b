use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{CaptureError, Result};

/// Callback for a recurring timer; receives the time the tick ran.
pub type TickFn = Box<dyn FnMut(Instant) + Send>;

/// Callback for a one-shot timer.
pub type TimeoutFn = Box<dyn FnOnce(Instant) + Send>;

/// Handle to a scheduled timer.
///
/// Cancelling is idempotent. Dropping the handle cancels the timer.
pub struct TickHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<AbortHandle>,
}

impl TickHandle {
    fn new(cancelled: Arc<AtomicBool>, task: AbortHandle) -> Self {
        Self {
            cancelled,
            task: Some(task),
        }
    }

    /// Stop the timer.
    ///
    /// On a multi-thread runtime a callback whose tick already read the flag
    /// may still start after this returns. Callers that must not observe
    /// such a callback keep their own flag, as `FrameSampler` does.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Timer service used by the capture pipeline.
pub trait Scheduler: Send + Sync {
    /// Fire `on_tick` every `interval`.
    ///
    /// The first tick fires `delay + interval` after this call, never
    /// synchronously, so setup done right after `start` returns is ordered
    /// before the first tick. A tick that overruns delays the next one; if
    /// several deadlines pass during an overrun, only one deferred tick fires.
    fn start(&self, delay: Duration, interval: Duration, on_tick: TickFn) -> TickHandle;

    /// Fire `on_fire` once, `after` from now.
    fn start_once(&self, after: Duration, on_fire: TimeoutFn) -> TickHandle;

    /// Cancel a timer started by this scheduler. Idempotent.
    fn stop(&self, handle: &mut TickHandle) {
        handle.cancel();
    }
}

/// Scheduler backed by tokio timers on a given runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler for the runtime the caller is running on.
    pub fn try_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CaptureError::Runtime(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, delay: Duration, interval: Duration, mut on_tick: TickFn) -> TickHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let interval = interval.max(Duration::from_millis(1));
        let first = Instant::now() + delay + interval;

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                on_tick(Instant::now());
            }
        });

        TickHandle::new(cancelled, task.abort_handle())
    }

    fn start_once(&self, after: Duration, on_fire: TimeoutFn) -> TickHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let deadline = Instant::now() + after;

        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if !flag.load(Ordering::Acquire) {
                on_fire(Instant::now());
            }
        });

        TickHandle::new(cancelled, task.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    const MS: Duration = Duration::from_millis(1);

    fn counter() -> (Arc<AtomicU32>, TickFn) {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let on_tick: TickFn = Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, on_tick)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_not_synchronous() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, on_tick) = counter();
        let _handle = scheduler.start(Duration::ZERO, 10 * MS, on_tick);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(5 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_every_interval() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, on_tick) = counter();
        let _handle = scheduler.start(Duration::ZERO, 10 * MS, on_tick);

        tokio::time::sleep(35 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_chronological() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let times = Arc::new(Mutex::new(Vec::new()));
        let t = Arc::clone(&times);
        let _handle = scheduler.start(
            Duration::ZERO,
            10 * MS,
            Box::new(move |now| t.lock().unwrap().push(now)),
        );

        tokio::time::sleep(55 * MS).await;
        let times = times.lock().unwrap();
        assert_eq!(times.len(), 5);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn overrun_defers_a_single_tick() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let times = Arc::new(Mutex::new(Vec::new()));
        let t = Arc::clone(&times);
        let mut handle = scheduler.start(
            Duration::ZERO,
            100 * MS,
            Box::new(move |now| {
                let first = {
                    let mut times = t.lock().unwrap();
                    times.push(now);
                    times.len() == 1
                };
                if first {
                    // Overruns the deadlines at 200ms and 300ms.
                    std::thread::sleep(250 * MS);
                }
            }),
        );

        tokio::time::sleep(450 * MS).await;
        handle.cancel();
        let times = times.lock().unwrap().clone();
        assert!(times.len() >= 3, "ticks: {times:?}");

        // The backlog fires once, right after the overrun.
        let deferred = times[1] - times[0];
        assert!(deferred >= 250 * MS, "deferred tick after {deferred:?}");
        assert!(deferred < 290 * MS, "deferred tick after {deferred:?}");
        // Then the cadence resumes at the next deadline without bursting.
        let resumed = times[2] - times[1];
        assert!(resumed >= 25 * MS, "next tick after {resumed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn delay_postpones_first_tick() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, on_tick) = counter();
        let _handle = scheduler.start(100 * MS, 10 * MS, on_tick);

        tokio::time::sleep(105 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(10 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_further_ticks() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, on_tick) = counter();
        let mut handle = scheduler.start(Duration::ZERO, 10 * MS, on_tick);

        tokio::time::sleep(25 * MS).await;
        scheduler.stop(&mut handle);
        assert!(handle.is_cancelled());

        tokio::time::sleep(100 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (_count, on_tick) = counter();
        let mut handle = scheduler.start(Duration::ZERO, 10 * MS, on_tick);
        scheduler.stop(&mut handle);
        scheduler.stop(&mut handle);
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels_timer() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, on_tick) = counter();
        drop(scheduler.start(Duration::ZERO, 10 * MS, on_tick));

        tokio::time::sleep(50 * MS).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_once_fires_exactly_once() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        let _handle = scheduler.start_once(
            50 * MS,
            Box::new(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(45 * MS).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(100 * MS).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_once_timer_never_fires() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        let mut handle = scheduler.start_once(
            50 * MS,
            Box::new(move |_| f.store(true, Ordering::SeqCst)),
        );
        handle.cancel();

        tokio::time::sleep(100 * MS).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn try_current_fails_outside_runtime() {
        assert!(matches!(
            TokioScheduler::try_current(),
            Err(CaptureError::Runtime(_))
        ));
    }

    #[test]
    fn scheduler_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TokioScheduler>();
        assert_send_sync::<Box<dyn Scheduler>>();
    }
}

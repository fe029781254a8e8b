//! Main-thread dispatcher: hands closures from network threads to the simulation thread.
//!
//! Uses crossbeam for the MPSC job queue. The simulation thread calls
//! [`MainThreadDispatcher::drain`] once per tick, before advancing game logic,
//! and runs every queued job in FIFO order against its owned state.
//!
//! Network threads hold a cloneable [`DispatchHandle`] and either fire-and-forget
//! ([`DispatchHandle::enqueue`]) or block with a bound for the job's result
//! ([`DispatchHandle::execute_and_wait`]). A job whose caller already gave up
//! still runs on its tick; its reply is dropped.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use log::{error, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Simulation thread did not run the job within the bound
    #[error("simulation thread did not respond within {} ms", .0.as_millis())]
    Timeout(Duration),
    /// Job was dropped without producing a result (panicked, or dispatcher gone)
    #[error("dispatched job was dropped before completing")]
    Dropped,
}

/// Owner side of the queue. Lives with the simulation thread.
pub struct MainThreadDispatcher<S> {
    tx: Sender<Job<S>>,
    rx: Receiver<Job<S>>,
}

impl<S: 'static> Default for MainThreadDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> MainThreadDispatcher<S> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Create a handle for network threads
    pub fn handle(&self) -> DispatchHandle<S> {
        DispatchHandle { tx: self.tx.clone() }
    }

    /// Number of jobs waiting for the next drain
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every job queued before this call, in FIFO order.
    ///
    /// Jobs enqueued by a job run on the next drain. A panicking job is logged
    /// and skipped; its waiter sees [`DispatchError::Dropped`].
    pub fn drain(&self, state: &mut S) -> usize {
        let queued = self.rx.len();
        let mut executed = 0;
        for _ in 0..queued {
            let Ok(job) = self.rx.try_recv() else {
                break;
            };
            if catch_unwind(AssertUnwindSafe(|| job(state))).is_err() {
                error!("Dispatched job panicked on simulation thread");
            }
            executed += 1;
        }
        executed
    }
}

/// Producer side of the queue. Cheap to clone, `Send + Sync`.
pub struct DispatchHandle<S> {
    tx: Sender<Job<S>>,
}

impl<S> Clone for DispatchHandle<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<S: 'static> DispatchHandle<S> {
    /// Queue `f` for the next simulation tick. Returns immediately.
    pub fn enqueue<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.tx.send(Box::new(f)).is_err() {
            warn!("Dispatcher closed, job discarded");
        }
    }

    /// Queue `f` and block until the simulation thread has run it, or `timeout` elapses.
    pub fn execute_and_wait<R, F>(&self, f: F, timeout: Duration) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let job: Job<S> = Box::new(move |state| {
            // Caller may have timed out and dropped the receiver
            let _ = reply_tx.send(f(state));
        });
        self.tx.send(job).map_err(|_| DispatchError::Dropped)?;

        match reply_rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                warn!("Dispatch timed out after {} ms", timeout.as_millis());
                Err(DispatchError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Dropped),
        }
    }

    /// Like [`execute_and_wait`](Self::execute_and_wait), but falls back to `R::default()`
    /// on failure. The flag is `true` when the value is live.
    pub fn execute_or_default<R, F>(&self, f: F, timeout: Duration) -> (R, bool)
    where
        R: Default + Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        match self.execute_and_wait(f, timeout) {
            Ok(r) => (r, true),
            Err(_) => (R::default(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_drain_runs_jobs_in_fifo_order() {
        let dispatcher = MainThreadDispatcher::<Vec<i32>>::new();
        let handle = dispatcher.handle();
        for i in 0..5 {
            handle.enqueue(move |log| log.push(i));
        }
        assert_eq!(dispatcher.pending(), 5);

        let mut log = Vec::new();
        assert_eq!(dispatcher.drain(&mut log), 5);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_jobs_enqueued_during_drain_wait_for_next_tick() {
        let dispatcher = MainThreadDispatcher::<Vec<&'static str>>::new();
        let handle = dispatcher.handle();
        let inner = handle.clone();
        handle.enqueue(move |log| {
            log.push("outer");
            inner.enqueue(|log| log.push("inner"));
        });

        let mut log = Vec::new();
        dispatcher.drain(&mut log);
        assert_eq!(log, vec!["outer"]);
        dispatcher.drain(&mut log);
        assert_eq!(log, vec!["outer", "inner"]);
    }

    #[test]
    fn test_execute_and_wait_returns_result() {
        let dispatcher = MainThreadDispatcher::<i32>::new();
        let handle = dispatcher.handle();
        let stop = Arc::new(AtomicBool::new(false));

        let stop_sim = Arc::clone(&stop);
        let sim = thread::spawn(move || {
            let mut state = 41;
            while !stop_sim.load(Ordering::SeqCst) {
                dispatcher.drain(&mut state);
                thread::sleep(Duration::from_millis(1));
            }
            state
        });

        let result = handle.execute_and_wait(
            |s| {
                *s += 1;
                *s * 10
            },
            Duration::from_secs(2),
        );
        assert_eq!(result, Ok(420));

        stop.store(true, Ordering::SeqCst);
        assert_eq!(sim.join().unwrap(), 42);
    }

    #[test]
    fn test_execute_and_wait_times_out_without_drain() {
        let dispatcher = MainThreadDispatcher::<i32>::new();
        let handle = dispatcher.handle();

        let timeout = Duration::from_millis(30);
        let started = Instant::now();
        let result = handle.execute_and_wait(|s| *s, timeout);
        let elapsed = started.elapsed();

        assert_eq!(result, Err(DispatchError::Timeout(timeout)));
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(1), "blocked for {:?}", elapsed);

        // Orphaned job still runs on the next drain, reply silently dropped
        let mut state = 7;
        assert_eq!(dispatcher.drain(&mut state), 1);
    }

    #[test]
    fn test_execute_or_default_degrades() {
        let dispatcher = MainThreadDispatcher::<u32>::new();
        let handle = dispatcher.handle();
        let (value, live) = handle.execute_or_default(|s| *s + 5, Duration::from_millis(10));
        assert_eq!(value, 0);
        assert!(!live);
    }

    #[test]
    fn test_panicking_job_is_contained() {
        let dispatcher = MainThreadDispatcher::<i32>::new();
        let handle = dispatcher.handle();

        let waiter = {
            let handle = handle.clone();
            thread::spawn(move || {
                handle.execute_and_wait(|_s: &mut i32| -> i32 { panic!("boom") }, Duration::from_secs(2))
            })
        };
        // Give the waiter time to enqueue
        while dispatcher.pending() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        handle.enqueue(|s| *s = 99);

        let mut state = 0;
        assert_eq!(dispatcher.drain(&mut state), 2);
        assert_eq!(state, 99);
        assert_eq!(waiter.join().unwrap(), Err(DispatchError::Dropped));
    }

    #[test]
    fn test_dropped_dispatcher_reports_dropped() {
        let dispatcher = MainThreadDispatcher::<i32>::new();
        let handle = dispatcher.handle();
        drop(dispatcher);
        // Receiver gone: send fails fast instead of waiting out the timeout
        let result = handle.execute_and_wait(|s| *s, Duration::from_secs(5));
        assert_eq!(result, Err(DispatchError::Dropped));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-delay periodic task scheduler.
//!
//! One worker thread per task; sleeps are chunked so `shutdown()`
//! interrupts a waiting task within ~50ms. Tasks must complete in
//! bounded time since shutdown joins them.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const SLEEP_CHUNK: Duration = Duration::from_millis(50);

/// Runs named tasks at a fixed delay until shut down.
pub struct Scheduler {
    shutdown: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Run `task` every `period`, starting after `initial_delay`. The
    /// delay is measured from the end of one run to the start of the
    /// next. Scheduling after shutdown is a no-op.
    pub fn schedule_with_fixed_delay(
        &self,
        name: &str,
        initial_delay: Duration,
        period: Duration,
        task: impl Fn() + Send + 'static,
    ) {
        if self.shutdown.load(Ordering::Relaxed) {
            log::debug!("[scheduler] ignoring task '{}' after shutdown", name);
            return;
        }
        let shutdown = Arc::clone(&self.shutdown);
        let name = name.to_string();
        let handle = std::thread::spawn(move || {
            if interruptible_sleep(initial_delay, &shutdown) {
                log::debug!("[scheduler] task '{}' cancelled before first run", name);
                return;
            }
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                task();
                if interruptible_sleep(period, &shutdown) {
                    break;
                }
            }
            log::debug!("[scheduler] task '{}' stopped", name);
        });
        self.handles.lock().push(handle);
    }

    /// Cancel all tasks and wait for their threads. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep for `duration` in small chunks; returns true when interrupted
/// by shutdown.
fn interruptible_sleep(duration: Duration, shutdown: &AtomicBool) -> bool {
    let end = Instant::now() + duration;
    while Instant::now() < end {
        if shutdown.load(Ordering::Relaxed) {
            return true;
        }
        std::thread::sleep(SLEEP_CHUNK.min(end.saturating_duration_since(Instant::now())));
    }
    shutdown.load(Ordering::Relaxed)
}

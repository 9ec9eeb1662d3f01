//! Main-thread dispatch queue.
//!
//! Any thread may push work; only the thread running the message loop
//! drains it. Each push posts the wake message so the loop notices. Once the
//! loop has exited the queue is closed and refuses further work, which drops
//! the job (and anything it captured) right away.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::native::Waker;

/// A deferred closure run on the UI thread with access to a context.
pub type Job<C> = Box<dyn FnOnce(&C) + Send + 'static>;

struct Pending<C> {
    jobs: Vec<Job<C>>,
    closed: bool,
}

pub struct DispatchQueue<C> {
    pending: Mutex<Pending<C>>,
    waker: Arc<dyn Waker>,
}

impl<C> DispatchQueue<C> {
    pub fn new(waker: Arc<dyn Waker>) -> Self {
        Self {
            pending: Mutex::new(Pending {
                jobs: Vec::new(),
                closed: false,
            }),
            waker,
        }
    }

    /// Append a job and wake the loop. Returns `false`, dropping the job,
    /// when the queue has been closed.
    pub fn dispatch(&self, job: Job<C>) -> bool {
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                drop(pending);
                drop(job);
                debug!("Refused dispatch job: message loop has exited");
                return false;
            }
            pending.jobs.push(job);
        }
        self.waker.wake();
        true
    }

    /// Run every job queued so far, in FIFO order.
    ///
    /// The batch is taken under the lock and executed without it, so jobs
    /// may dispatch more work; anything they add waits for the next wake.
    /// A panicking job is logged and does not stop the rest of the batch.
    pub fn drain(&self, context: &C) -> usize {
        let batch = mem::take(&mut self.pending.lock().jobs);
        let count = batch.len();

        for job in batch {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(context)));
            if let Err(panic_info) = result {
                let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Dispatched job panicked: {}", message);
            }
        }

        count
    }

    pub fn len(&self) -> usize {
        self.pending.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().jobs.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Wake the loop again if work is waiting.
    pub fn rewake_if_pending(&self) {
        if !self.is_empty() {
            self.waker.wake();
        }
    }

    /// Drop every pending job without running it.
    pub fn clear(&self) -> usize {
        let jobs = mem::take(&mut self.pending.lock().jobs);
        Self::discard(jobs)
    }

    /// Drop every pending job and refuse new ones from now on.
    pub fn close(&self) -> usize {
        let jobs = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            mem::take(&mut pending.jobs)
        };
        Self::discard(jobs)
    }

    fn discard(jobs: Vec<Job<C>>) -> usize {
        let dropped = jobs.len();
        if dropped > 0 {
            debug!("Dropped {} undrained dispatch jobs", dropped);
        }
        dropped
    }
}

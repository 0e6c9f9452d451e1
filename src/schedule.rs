//! Debounced rule recompilation.
//!
//! Vocabulary and configuration updates arrive in bursts. Rather than
//! compiling on each one, the engine hands a [`CompileInput`] to the
//! scheduler. In deferred mode a single worker thread waits until no newer
//! input has arrived for `delay`, compiles only the newest one, and
//! publishes it. Older pending inputs are dropped unseen.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::compiler::{CompileInput, RuleSet, compile};

/// Default quiet period before a deferred rebuild runs.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Compile inside the scheduling call.
    Immediate,
    /// Compile on the rebuild worker once input has been quiet for `delay`.
    Deferred { delay: Duration },
}

impl Default for CompileMode {
    fn default() -> Self {
        CompileMode::Deferred {
            delay: DEFAULT_DELAY,
        }
    }
}

/// A finished compilation, tagged with the generation that requested it.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub generation: u64,
    pub rules: Arc<RuleSet>,
}

#[derive(Debug, Default)]
struct Slot {
    ready: Option<Compiled>,
    completed: u64,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    done: Condvar,
}

impl Shared {
    fn publish(&self, generation: u64, rules: RuleSet) {
        let mut slot = self.slot.lock();
        if generation > slot.completed {
            slot.ready = Some(Compiled {
                generation,
                rules: Arc::new(rules),
            });
            slot.completed = generation;
        }
        self.done.notify_all();
    }
}

struct Job {
    generation: u64,
    input: CompileInput,
}

#[derive(Debug)]
struct Worker {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(shared: Arc<Shared>, delay: Duration) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("vocab-swap-rebuild".to_string())
            .spawn(move || {
                while let Ok(mut job) = receiver.recv() {
                    loop {
                        match receiver.recv_timeout(delay) {
                            Ok(newer) => {
                                trace!(
                                    superseded = job.generation,
                                    by = newer.generation,
                                    "coalesced rebuild"
                                );
                                job = newer;
                            }
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    let rules = compile(&job.input);
                    shared.publish(job.generation, rules);
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("rebuild worker panicked");
            }
        }
    }
}

/// Schedule-with-cancel-previous front end for rule compilation.
#[derive(Debug)]
pub struct RebuildScheduler {
    shared: Arc<Shared>,
    worker: Option<Worker>,
    scheduled: u64,
}

impl RebuildScheduler {
    /// A deferred scheduler falls back to immediate mode if its worker
    /// thread cannot be started.
    pub fn new(mode: CompileMode) -> Self {
        let shared = Arc::new(Shared::default());
        let worker = match mode {
            CompileMode::Immediate => None,
            CompileMode::Deferred { delay } => match Worker::spawn(Arc::clone(&shared), delay) {
                Ok(worker) => Some(worker),
                Err(err) => {
                    warn!(%err, "could not start rebuild worker; compiling inline");
                    None
                }
            },
        };
        Self {
            shared,
            worker,
            scheduled: 0,
        }
    }

    pub fn mode_is_deferred(&self) -> bool {
        self.worker.is_some()
    }

    /// Request a rebuild from `input`, superseding any pending request.
    /// Returns the new generation.
    pub fn schedule(&mut self, input: CompileInput) -> u64 {
        self.scheduled += 1;
        let generation = self.scheduled;

        let job = Job { generation, input };
        let job = match self.worker.as_ref().and_then(|w| w.sender.as_ref()) {
            Some(sender) => match sender.send(job) {
                Ok(()) => {
                    debug!(generation, "rebuild scheduled");
                    return generation;
                }
                // Worker is gone; compile here instead.
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };

        let rules = compile(&job.input);
        self.shared.publish(generation, rules);
        generation
    }

    /// Take the newest finished rule set, if one is waiting.
    pub fn take_ready(&self) -> Option<Compiled> {
        self.shared.slot.lock().ready.take()
    }

    /// Whether a scheduled generation has not finished compiling yet.
    pub fn is_pending(&self) -> bool {
        self.shared.slot.lock().completed < self.scheduled
    }

    /// Block until the newest scheduled generation has been compiled.
    pub fn flush(&self) {
        let mut slot = self.shared.slot.lock();
        while slot.completed < self.scheduled {
            self.shared.done.wait(&mut slot);
        }
    }
}

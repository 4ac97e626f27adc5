use anyhow::anyhow;
use atomic_counter::{AtomicCounter, RelaxedCounter};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::core::state::SyncStatus;
use crate::ops::bus::{BusEvent, BusSender};
use crate::utils::error::{PdlError, PdlResult};
use crate::utils::StyleMessage;

/// One unit of work run on a pool thread.
pub trait Job: Send {
    /// project the job works on
    fn project(&self) -> &str;

    /// run to completion, true on success
    fn run(self: Box<Self>) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn finished_event(self, batch: usize) -> BusEvent {
        BusEvent::BatchFinished {
            batch,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// Handle to a running batch.
#[derive(Debug)]
pub struct BatchHandle {
    id: usize,
    handle: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// block until every job of the batch has returned
    pub fn join(self) -> PdlResult<BatchSummary> {
        self.handle
            .join()
            .map_err(|_| anyhow!("batch {} dispatcher panicked", self.id))
    }
}

/// Fixed-width executor shared by every batch.
///
/// No more than `width` jobs run at the same time, however many batches are
/// in flight.
pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
    width: usize,
    bus: BusSender,
    batches: RelaxedCounter,
}

impl WorkerPool {
    pub fn new(width: usize, bus: BusSender) -> PdlResult<Self> {
        let width = width.max(1);
        // create thread pool, and set the number of thread to use by using `.num_threads(count)`
        let thread_builder = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|index| format!("pdl-worker-{}", index));
        let Ok(pool) = thread_builder.build() else {
            return Err(anyhow!(PdlError::CreateThreadPoolFailed));
        };

        Ok(Self {
            pool: Arc::new(pool),
            width,
            bus,
            batches: RelaxedCounter::new(1),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Start `jobs` and return at once.
    ///
    /// A dispatch thread waits for the jobs, logs each outcome as it arrives,
    /// then publishes a summary log and [`BusEvent::BatchFinished`].
    pub fn run_batch(&self, label: impl Into<String>, jobs: Vec<Box<dyn Job>>) -> BatchHandle {
        let id = self.batches.inc();
        let label = label.into();
        let pool = self.pool.clone();
        let bus = self.bus.clone();

        let handle = thread::spawn(move || {
            if jobs.is_empty() {
                bus.log(StyleMessage::no_projects_selected());
                bus.publish(BatchSummary::default().finished_event(id));
                return BatchSummary::default();
            }

            bus.log(StyleMessage::batch_start(&label, jobs.len()));
            // pool.install means that `.into_par_iter()` will use the thread pool we've built above.
            let outcomes: Vec<bool> = pool.install(|| {
                jobs.into_par_iter()
                    .map_with(bus.clone(), |bus, job| run_isolated(job, bus))
                    .collect()
            });

            let succeeded = outcomes.iter().filter(|ok| **ok).count();
            let summary = BatchSummary {
                succeeded,
                failed: outcomes.len() - succeeded,
            };
            bus.log(StyleMessage::batch_finished(&label, summary.succeeded, summary.failed));
            bus.publish(summary.finished_event(id));
            summary
        });

        BatchHandle { id, handle }
    }
}

/// A panicking job fails its project instead of the batch.
fn run_isolated(job: Box<dyn Job>, bus: &BusSender) -> bool {
    let project = job.project().to_string();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.run()));

    let succeeded = match outcome {
        Ok(succeeded) => succeeded,
        Err(_) => {
            bus.log(StyleMessage::job_panicked(&project));
            bus.status(&project, SyncStatus::Failed);
            false
        }
    };
    log::debug!("{}", StyleMessage::job_end(&project, succeeded).to_plain_text());
    succeeded
}

//! Bounded worker fan-out for batch resolution.
//!
//! Jobs are fed through a bounded channel to a fixed set of scoped worker
//! threads. Each job carries its input position so results come back in
//! input order regardless of which worker finished first.

use std::thread;

use crossbeam_channel::bounded;
use tracing::{debug, warn};

use crate::error::{ResolveError, ResolveResult};

/// Worker settings for one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Worker threads to start (at least one, at most one per item).
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
        }
    }
}

impl FanOut {
    /// Applies `f` to every item on the worker set and returns the outputs
    /// in input order.
    ///
    /// # Errors
    ///
    /// Returns an internal error if no worker thread could be started or a
    /// worker exited without reporting its job.
    pub fn run<T, R, F>(&self, items: Vec<T>, f: F) -> ResolveResult<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.clamp(1, total);
        let (job_tx, job_rx) = bounded::<(usize, T)>(self.queue_capacity.max(1));
        // sized to the batch so workers never block on reporting
        let (out_tx, out_rx) = bounded::<(usize, R)>(total);

        let spawned = thread::scope(|scope| {
            let f = &f;
            let mut spawned = 0usize;
            for idx in 0..workers {
                let rx = job_rx.clone();
                let tx = out_tx.clone();
                let handle = thread::Builder::new()
                    .name(format!("resolve-batch-{idx}"))
                    .spawn_scoped(scope, move || {
                        for (position, item) in rx.iter() {
                            if tx.send((position, f(item))).is_err() {
                                break;
                            }
                        }
                    });
                match handle {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        warn!(worker = idx, error = %e, "failed to spawn batch worker");
                        break;
                    }
                }
            }
            drop(job_rx);
            drop(out_tx);

            if spawned > 0 {
                debug!(workers = spawned, items = total, "fanning out batch");
                for (position, item) in items.into_iter().enumerate() {
                    if job_tx.send((position, item)).is_err() {
                        break;
                    }
                }
            }
            // closing the queue lets workers drain and exit
            drop(job_tx);
            spawned
        });
        if spawned == 0 {
            return Err(ResolveError::internal("no batch worker could be started"));
        }

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        for (position, output) in out_rx.try_iter() {
            slots[position] = Some(output);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.ok_or_else(|| ResolveError::internal(format!("batch job {position} produced no result")))
            })
            .collect()
    }
}

//! Off-thread optimization runs with a one-shot completion signal

use crossbeam::channel::{self, Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cluster::optimizer::{optimize, OptimizationResult};
use crate::config::OptimizerConfig;
use crate::error::{Error, Result};
use crate::matrix::ClusteredMatrix;
use crate::rng;

/// Handle to an optimization running on its own thread.
///
/// The result is delivered exactly once, either by polling with
/// [`try_result`](Self::try_result) or by blocking in [`wait`](Self::wait).
pub struct OptimizationHandle<M> {
    receiver: Receiver<Result<OptimizationResult<M>>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl<M> OptimizationHandle<M> {
    /// Ask the run to stop at the next level boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// True once a result is ready to collect.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
            || self.thread.as_ref().map_or(true, |thread| thread.is_finished())
    }

    /// Collect the result if the run has completed.
    pub fn try_result(&mut self) -> Option<Result<OptimizationResult<M>>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(Error::WorkerDisconnected))
            }
        }
    }

    /// Block until the run completes.
    pub fn wait(mut self) -> Result<OptimizationResult<M>> {
        let result = self.receiver.recv().map_err(|_| Error::WorkerDisconnected);
        self.join();
        result?
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("optimization worker panicked");
            }
        }
    }
}

/// Start an optimization of `matrix` on a dedicated thread.
///
/// With `config.threads == 0` the run gets its own bid pool sized to the
/// machine's core count instead of sharing the global rayon pool.
pub fn spawn_optimization<M>(
    matrix: M,
    mut config: OptimizerConfig,
) -> Result<OptimizationHandle<M>>
where
    M: ClusteredMatrix + Clone + Send + 'static,
{
    config.validate()?;
    if config.threads == 0 {
        config.threads = config.worker_threads();
    }

    let (sender, receiver) = channel::bounded(1);
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    log::info!(
        "Spawning optimization worker with {} bid threads",
        config.threads
    );

    let thread = thread::Builder::new()
        .name("dsm-optimizer".to_string())
        .spawn(move || {
            let mut rng = rng::seeded(config.rand_seed);
            let result = optimize(&matrix, &config, &mut rng, Some(flag.as_ref()));
            // The handle may already be gone
            let _ = sender.send(result);
        })
        .map_err(Error::WorkerSpawn)?;

    Ok(OptimizationHandle {
        receiver,
        cancel,
        thread: Some(thread),
    })
}

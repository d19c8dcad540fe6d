//! Fixed pool of export slots shared by every source host.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Jobs are handed over a zero-capacity channel, so [`WorkerPool::submit`]
/// blocks exactly while every slot is busy. That blocking is the only
/// backpressure the destination cluster gets.
pub struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(slots: usize) -> Result<Self> {
        let (tx, rx) = bounded::<Job>(0);
        let mut workers = Vec::with_capacity(slots.max(1));
        for i in 0..slots.max(1) {
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("export-{i:02}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                })
                .context("spawn pool worker")?;
            workers.push(handle);
        }
        Ok(Self { tx, workers })
    }

    /// Hands one job to an idle worker, blocking until a slot frees up.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // send only fails when every worker has exited, which cannot happen
        // before `join` drops the sender
        let _ = self.tx.send(Box::new(job));
    }

    /// Wait barrier: closes the queue and joins the workers, returning once
    /// every submitted job has finished.
    pub fn join(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

// src/ingest/scheduler.rs
//! Cooperative periodic scheduler.
//!
//! One loop owns every task. A task is due once `interval` has elapsed since
//! its last completion; due tasks run one after another, so a slow task only
//! delays the others and never causes a burst of catch-up runs.

use anyhow::anyhow;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::ingest::types::Source;
use crate::store::IngestionEngine;

pub const DEFAULT_POLL: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> anyhow::Result<()>;
}

pub struct PeriodicTask {
    job: Arc<dyn Job>,
    interval: Duration,
    last_run: Option<Instant>,
    seed: bool,
}

impl PeriodicTask {
    pub fn new(job: Arc<dyn Job>, interval: Duration) -> Self {
        Self {
            job,
            interval,
            last_run: None,
            seed: false,
        }
    }

    /// Run this task once during [`Scheduler::seed`].
    pub fn seeding(mut self) -> Self {
        self.seed = true;
        self
    }

    pub fn name(&self) -> &str {
        self.job.name()
    }

    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.interval,
        }
    }
}

pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
    poll: Duration,
}

impl Scheduler {
    pub fn new(poll: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            poll,
        }
    }

    pub fn add(&mut self, task: PeriodicTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }

    /// Run every seeding task once, then stamp all tasks so the loop starts
    /// with a full interval ahead of each of them.
    pub async fn seed(&mut self) {
        for task in self.tasks.iter().filter(|t| t.seed) {
            tracing::info!(task = task.name(), "seeding");
            run_guarded(task.job.clone()).await;
        }
        let now = Instant::now();
        for task in &mut self.tasks {
            task.last_run = Some(now);
        }
    }

    /// Run whatever is due at this moment. Returns how many tasks ran.
    pub async fn tick(&mut self) -> usize {
        let now = Instant::now();
        let mut ran = 0;
        for task in &mut self.tasks {
            if !task.is_due(now) {
                continue;
            }
            run_guarded(task.job.clone()).await;
            task.last_run = Some(Instant::now());
            ran += 1;
        }
        ran
    }

    pub async fn run(mut self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Run a job on its own tokio task so errors and panics stop at this boundary.
async fn run_guarded(job: Arc<dyn Job>) -> bool {
    let name = job.name().to_string();
    let started = Instant::now();
    let handle = tokio::spawn(async move { job.run().await });
    let ok = match handle.await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(task = %name, error = ?e, "task failed");
            false
        }
        Err(e) => {
            tracing::error!(task = %name, error = %e, "task panicked");
            false
        }
    };
    if !ok {
        counter!("scheduler_task_failures_total", "task" => name.clone()).increment(1);
    }
    tracing::debug!(task = %name, elapsed_ms = started.elapsed().as_millis() as u64, ok, "task finished");
    ok
}

/// Polls a group of sources one after another.
pub struct IngestJob {
    name: String,
    sources: Vec<Arc<dyn Source>>,
}

impl IngestJob {
    pub fn new(name: impl Into<String>, sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

#[async_trait]
impl Job for IngestJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<()> {
        let mut failed: Vec<&str> = Vec::new();
        let mut added = 0;
        for source in &self.sources {
            match source.ingest().await {
                Ok(n) => added += n,
                Err(e) => {
                    tracing::warn!(source = source.tag(), error = %e, "source failed");
                    failed.push(source.tag());
                }
            }
        }
        tracing::info!(task = %self.name, added, failed = failed.len(), "ingest pass done");
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of {} sources failed: {}",
                failed.len(),
                self.sources.len(),
                failed.join(", ")
            ))
        }
    }
}

/// Periodic insertion-order sweep of the seen-set.
pub struct SeenSweepJob {
    engine: Arc<IngestionEngine>,
}

impl SeenSweepJob {
    pub fn new(engine: Arc<IngestionEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Job for SeenSweepJob {
    fn name(&self) -> &str {
        "seen-sweep"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let evicted = self.engine.sweep_seen();
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.engine.seen_len(), "seen-set swept");
        }
        Ok(())
    }
}

// src/ingest/mod.rs
//! Ingestion side of the pipeline: sources, extractor client, scheduler, purge.
pub mod client;
pub mod parser;
pub mod providers;
pub mod purge;
pub mod scheduler;
pub mod types;

use anyhow::Context;
use std::sync::Arc;

use crate::config::PipelineConfig;
use providers::{build_sources, SourceContext};
use purge::PurgeJob;
use scheduler::{IngestJob, PeriodicTask, Scheduler, SeenSweepJob, DEFAULT_POLL};

/// Wire every configured task into a scheduler. Ingestion tasks seed.
pub fn build_scheduler(cfg: &PipelineConfig, ctx: &SourceContext) -> anyhow::Result<Scheduler> {
    let sources = build_sources(cfg, ctx)?;
    let purge = PurgeJob::from_cfg(&cfg.purge).context("configuring purge store")?;

    let mut s = Scheduler::new(DEFAULT_POLL);
    if !sources.feeds.is_empty() {
        s.add(
            PeriodicTask::new(Arc::new(IngestJob::new("feeds", sources.feeds)), cfg.intervals.feeds())
                .seeding(),
        );
    }
    if !sources.sections.is_empty() {
        s.add(
            PeriodicTask::new(
                Arc::new(IngestJob::new("sections", sources.sections)),
                cfg.intervals.sections(),
            )
            .seeding(),
        );
    }
    s.add(PeriodicTask::new(Arc::new(purge), cfg.intervals.purge()));
    s.add(PeriodicTask::new(
        Arc::new(SeenSweepJob::new(ctx.engine.clone())),
        cfg.intervals.seen_sweep(),
    ));
    Ok(s)
}

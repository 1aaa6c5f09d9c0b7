//! Outline retrieval pipeline.
//!
//! Each course runs a small state machine: up to `max_attempts` rounds over
//! the four section kinds, a one-shot text-extraction fallback once the
//! structured endpoints look hopeless, and exponential backoff in between.
//! Partial success ends the machine: any single section is enough. A course
//! that exhausts everything simply keeps no outline; it never fails the run.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, Course, Outline, RetryConfig, SectionKind, Term};
use crate::services::{Fetched, OutlineSource};
use crate::storage::CheckpointStore;

/// The fallback is tried at most this many times per course: once mid-retry
/// and once after the final attempt.
const FALLBACK_MAX_TRIES: u32 = 2;

/// Success/failure tallies for one term's run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlineStats {
    pub succeeded: usize,
    pub failed: usize,
    /// Courses whose outline is the coarse text fallback.
    pub fallback_used: usize,
}

/// Result of one term's pipeline run.
#[derive(Debug, Clone)]
pub struct TermReport {
    pub term: Term,
    pub total: usize,
    /// Courses that already carried an outline when the run started.
    pub resumed: usize,
    pub stats: OutlineStats,
}

/// One term's worth of work for [`run_all`].
#[derive(Debug, Clone)]
pub struct TermJob {
    pub term: Term,
    pub courses: Vec<Course>,
}

/// Per-attempt timeout, shrinking as attempts progress down to the floor.
fn attempt_timeout(retry: &RetryConfig, attempt: u32) -> Duration {
    let shrink = retry.timeout_step_secs.saturating_mul(u64::from(attempt));
    let secs = retry
        .timeout_secs
        .saturating_sub(shrink)
        .max(retry.timeout_floor_secs);
    Duration::from_secs(secs)
}

/// Exponential backoff after a failed attempt, capped.
fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay = retry.backoff_base_ms.saturating_mul(factor);
    Duration::from_millis(delay.min(retry.backoff_max_ms))
}

/// Run the per-course state machine to completion.
///
/// Returns the merged outline on success, or `None` when every attempt and
/// the fallback came up empty.
pub async fn fetch_outline(
    source: &dyn OutlineSource,
    term: Term,
    course_id: &str,
    config: &Config,
) -> Option<Outline> {
    let retry = &config.retry;
    let pause = Duration::from_millis(config.crawler.request_delay_ms);
    let mut fallback_tries = 0u32;

    for attempt in 0..retry.max_attempts {
        let timeout = attempt_timeout(retry, attempt);
        let mut outline = Outline::default();

        for kind in SectionKind::ALL {
            match source.fetch_section(term, course_id, kind, timeout).await {
                Ok(Fetched::Data(section)) => outline.attach(section),
                // The course has no data of this kind; not worth retrying.
                Ok(Fetched::Absent) => {}
                // One kind failing must not abort its siblings.
                Err(e) => log::debug!(
                    "{term} course {course_id}: {} fetch failed on attempt {attempt}: {e}",
                    kind.label()
                ),
            }
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        if !outline.is_empty() {
            return Some(outline);
        }

        let failed_attempts = attempt + 1;
        if failed_attempts == retry.fallback_after && fallback_tries < FALLBACK_MAX_TRIES {
            fallback_tries += 1;
            if let Some(outline) = try_fallback(source, term, course_id, timeout).await {
                return Some(outline);
            }
        }

        if failed_attempts < retry.max_attempts {
            tokio::time::sleep(backoff_delay(retry, attempt)).await;
        }
    }

    if fallback_tries < FALLBACK_MAX_TRIES {
        let timeout = Duration::from_secs(retry.timeout_floor_secs);
        if let Some(outline) = try_fallback(source, term, course_id, timeout).await {
            return Some(outline);
        }
    }

    None
}

async fn try_fallback(
    source: &dyn OutlineSource,
    term: Term,
    course_id: &str,
    timeout: Duration,
) -> Option<Outline> {
    match source.fetch_fallback(term, course_id, timeout).await {
        Ok(Some(text)) => {
            log::debug!(
                "{term} course {course_id}: outline recovered from {}",
                text.source
            );
            Some(Outline::from_fallback(text))
        }
        Ok(None) => None,
        Err(e) => {
            log::debug!("{term} course {course_id}: fallback failed: {e}");
            None
        }
    }
}

/// Run one term's outline crawl to completion.
///
/// Resumes from a checkpoint when one exists (courses that already carry an
/// outline are skipped), flushes the checkpoint every
/// `checkpoint.save_every` processed courses, and on completion writes the
/// final artifact and deletes the checkpoint. Courses may be fetched with
/// bounded concurrency; results are attached and checkpoints written by this
/// single consumer, so there is only ever one writer per term.
pub async fn run_term(
    source: &dyn OutlineSource,
    store: &dyn CheckpointStore,
    term: Term,
    seed: Vec<Course>,
    config: &Config,
) -> Result<TermReport> {
    let mut courses = match store.load(term).await? {
        Some(checkpoint) => {
            log::info!(
                "{term}: resuming from checkpoint ({} courses, {} with outlines)",
                checkpoint.courses.len(),
                checkpoint.completed()
            );
            checkpoint.courses
        }
        None => seed,
    };

    let pending: Vec<(usize, String)> = courses
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.has_outline())
        .map(|(index, c)| (index, c.id.clone()))
        .collect();

    let total = courses.len();
    let resumed = total - pending.len();
    log::info!(
        "{term}: fetching outlines for {} of {} courses",
        pending.len(),
        total
    );

    let mut stats = OutlineStats::default();
    let mut processed = 0usize;

    let concurrency = config.crawler.course_concurrency.max(1);
    let mut results = stream::iter(pending)
        .map(|(index, id)| async move {
            let outline = fetch_outline(source, term, &id, config).await;
            (index, outline)
        })
        .buffer_unordered(concurrency);

    while let Some((index, outline)) = results.next().await {
        match outline {
            Some(outline) => {
                if outline.text_fallback.is_some() {
                    stats.fallback_used += 1;
                }
                courses[index].outline = Some(outline);
                stats.succeeded += 1;
            }
            None => {
                log::warn!(
                    "{term}: course {} has no outline after all attempts",
                    courses[index].id
                );
                stats.failed += 1;
            }
        }

        processed += 1;
        if processed % config.checkpoint.save_every == 0 {
            store.save(term, &courses).await?;
            log::info!(
                "{term}: checkpoint after {processed} courses ({} ok, {} failed)",
                stats.succeeded,
                stats.failed
            );
        }
    }

    store.write_final(term, &courses).await?;
    store.delete(term).await?;

    log::info!(
        "{term}: complete; {} outlines, {} failures, {} via fallback",
        stats.succeeded,
        stats.failed,
        stats.fallback_used
    );

    Ok(TermReport {
        term,
        total,
        resumed,
        stats,
    })
}

/// Run several independent terms on a bounded worker pool.
///
/// Terms share no mutable state; a term that fails is logged and does not
/// abort its siblings.
pub async fn run_all(
    source: &dyn OutlineSource,
    store: &dyn CheckpointStore,
    jobs: Vec<TermJob>,
    config: &Config,
) -> Vec<TermReport> {
    let concurrency = config.crawler.term_concurrency.max(1);
    let mut runs = stream::iter(jobs)
        .map(|job| async move {
            let term = job.term;
            (term, run_term(source, store, term, job.courses, config).await)
        })
        .buffer_unordered(concurrency);

    let mut reports = Vec::new();
    while let Some((term, result)) = runs.next().await {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => log::error!("{term}: term run failed: {e}"),
        }
    }
    reports
}

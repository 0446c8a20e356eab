//! Batch dispatch of SiteMine over a directory of EDF files.
//!
//! Each EDF is resolved to the prepared receptor named on its first line and
//! handed to a [`SiteComparator`], one job at a time. A job that cannot be
//! resolved is skipped; a job whose tool run fails is recorded as failed.
//! Neither stops the remaining jobs.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use siteprep_common::{Result, SiteprepError};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::edf::{parse_reference_line, EDF_EXTENSION};
use crate::sitemine::{ComparisonRequest, Mode, SiteComparator, DEFAULT_VERBOSITY};

/// Default top-level directory for per-pocket SiteMine output.
pub const DEFAULT_RESULTS_DIR: &str = "sitemine_results";

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub receptors_dir: PathBuf,
    pub descriptors_dir: PathBuf,
    pub database: PathBuf,
    pub threads: u32,
    pub mode: Mode,
    pub results_dir: PathBuf,
}

impl BatchConfig {
    pub fn new(
        receptors_dir: impl Into<PathBuf>,
        descriptors_dir: impl Into<PathBuf>,
        database: impl Into<PathBuf>,
    ) -> Self {
        Self {
            receptors_dir: receptors_dir.into(),
            descriptors_dir: descriptors_dir.into(),
            database: database.into(),
            threads: 18,
            mode: Mode::Fast,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedReference,
    ReceptorNotFound,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MalformedReference => f.write_str("malformed reference"),
            SkipReason::ReceptorNotFound => f.write_str("receptor not found"),
            SkipReason::Unreadable(e) => write!(f, "descriptor unreadable: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed { reason: String },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub descriptor: PathBuf,
    pub receptor: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub outcome: JobOutcome,
}

impl JobReport {
    /// Human-readable reason for a failed or skipped job.
    pub fn reason(&self) -> Option<String> {
        match &self.outcome {
            JobOutcome::Succeeded => None,
            JobOutcome::Failed { reason } => Some(reason.clone()),
            JobOutcome::Skipped { reason } => Some(reason.to_string()),
        }
    }
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results_dir: PathBuf,
    pub jobs: Vec<JobReport>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.outcome)).count()
    }

    /// Jobs that did not succeed, in dispatch order.
    pub fn problems(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs
            .iter()
            .filter(|j| !matches!(j.outcome, JobOutcome::Succeeded))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Discovery & resolution ────────────────────────────────────────────────────

/// All `*.edf` files directly inside `dir`, sorted by path. Symlinks to
/// regular files count as files.
pub async fn discover_descriptors(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| SiteprepError::io(dir, e))?;

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SiteprepError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EDF_EXTENSION) {
            continue;
        }
        let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
        if is_file {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

async fn read_first_line(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path).await?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).await?;
    Ok(line)
}

/// A REFERENCE name must be a bare file name inside the receptors directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Find the prepared receptor an EDF refers to.
pub async fn resolve_receptor(
    descriptor: &Path,
    receptors_dir: &Path,
) -> std::result::Result<PathBuf, SkipReason> {
    let first_line = read_first_line(descriptor)
        .await
        .map_err(|e| SkipReason::Unreadable(e.to_string()))?;

    let name = parse_reference_line(&first_line)
        .filter(|name| is_plain_file_name(name))
        .ok_or(SkipReason::MalformedReference)?;
    let receptor = receptors_dir.join(name);

    match fs::metadata(&receptor).await {
        Ok(meta) if meta.is_file() => Ok(receptor),
        _ => Err(SkipReason::ReceptorNotFound),
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

async fn dispatch(
    config: &BatchConfig,
    comparator: &dyn SiteComparator,
    descriptor: PathBuf,
) -> JobReport {
    let receptor = match resolve_receptor(&descriptor, &config.receptors_dir).await {
        Ok(r) => r,
        Err(reason) => {
            warn!(descriptor = %descriptor.display(), %reason, "Skipping EDF");
            return JobReport {
                descriptor,
                receptor: None,
                output_dir: None,
                outcome: JobOutcome::Skipped { reason },
            };
        }
    };

    let stem = descriptor
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_dir = config.results_dir.join(&stem);

    let request = ComparisonRequest {
        database: config.database.clone(),
        receptor: receptor.clone(),
        descriptor: descriptor.clone(),
        threads: config.threads,
        mode: config.mode,
        verbosity: DEFAULT_VERBOSITY,
        output_dir: output_dir.clone(),
    };

    info!(pocket = %stem, "Processing");
    let outcome = match comparator.compare(&request).await {
        Ok(out) if out.success => {
            info!(pocket = %stem, "Successfully processed");
            JobOutcome::Succeeded
        }
        Ok(out) => {
            let stderr = out.stderr.trim();
            let reason = if stderr.is_empty() {
                match out.exit_code {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                }
            } else {
                stderr.to_string()
            };
            warn!(pocket = %stem, exit_code = ?out.exit_code, "Error processing:\n{}", reason);
            JobOutcome::Failed { reason }
        }
        Err(e) => {
            warn!(pocket = %stem, error = %e, "Could not launch comparison");
            JobOutcome::Failed { reason: e.to_string() }
        }
    };

    JobReport {
        descriptor,
        receptor: Some(receptor),
        output_dir: Some(output_dir),
        outcome,
    }
}

/// Run `comparator` over every EDF in `config.descriptors_dir`, one job at a
/// time.
///
/// Only a missing descriptors directory or an uncreatable results directory
/// is an error; per-job problems end up in the returned summary.
#[instrument(skip(config, comparator), fields(descriptors_dir = %config.descriptors_dir.display()))]
pub async fn run_batch(
    config: &BatchConfig,
    comparator: &dyn SiteComparator,
) -> Result<BatchSummary> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let t0 = std::time::Instant::now();

    fs::create_dir_all(&config.results_dir)
        .await
        .map_err(|e| SiteprepError::io(&config.results_dir, e))?;

    let descriptors = discover_descriptors(&config.descriptors_dir).await?;
    info!(run_id = %run_id, "Found {} EDF files to process", descriptors.len());

    let mut jobs = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        debug!(descriptor = %descriptor.display(), "Resolving");
        jobs.push(dispatch(config, comparator, descriptor).await);
    }

    let summary = BatchSummary {
        run_id,
        started_at,
        duration_ms: t0.elapsed().as_millis() as u64,
        results_dir: config.results_dir.clone(),
        jobs,
    };

    info!(
        run_id = %run_id,
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        skipped = summary.skipped(),
        duration_ms = summary.duration_ms,
        "SiteMine batch complete"
    );
    Ok(summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

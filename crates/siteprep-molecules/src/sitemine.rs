//! Binding-site comparison with SiteMine.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use siteprep_common::{Result, SiteprepError};
use tokio::process::Command;
use tracing::{debug, info};

/// Verbosity level passed to every SiteMine run.
pub const DEFAULT_VERBOSITY: u8 = 4;

/// SiteMine search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Fast,
    Precise,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Precise => "precise",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Mode::Fast),
            "precise" => Ok(Mode::Precise),
            other => Err(format!("unknown SiteMine mode {other:?}, expected fast or precise")),
        }
    }
}

/// One SiteMine comparison: a prepared receptor and its EDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub database: PathBuf,
    pub receptor: PathBuf,
    pub descriptor: PathBuf,
    pub threads: u32,
    pub mode: Mode,
    pub verbosity: u8,
    pub output_dir: PathBuf,
}

impl ComparisonRequest {
    /// Command-line arguments in the order SiteMine documents them.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-g".into(),
            self.database.clone().into(),
            "-f".into(),
            self.receptor.clone().into(),
            "-e".into(),
            self.descriptor.clone().into(),
            "-t".into(),
            self.threads.to_string().into(),
            "-m".into(),
            self.mode.as_str().into(),
            "-v".into(),
            self.verbosity.to_string().into(),
            "--output".into(),
            self.output_dir.clone().into(),
        ]
    }
}

/// What the external tool reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Anything that can run one binding-site comparison.
#[async_trait]
pub trait SiteComparator: Send + Sync {
    /// Run the comparison to completion. `Err` means the tool could not be
    /// launched; a tool that ran and failed is an `Ok` with `success: false`.
    async fn compare(&self, request: &ComparisonRequest) -> Result<ToolOutput>;
}

/// Wrapper for SiteMine execution.
pub struct SiteMineRunner {
    executable_path: PathBuf,
}

impl SiteMineRunner {
    /// Create a new SiteMineRunner.
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
        }
    }

    /// The full command line, for logging.
    pub fn command_line(&self, request: &ComparisonRequest) -> String {
        std::iter::once(self.executable_path.as_os_str().to_owned())
            .chain(request.args())
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl SiteComparator for SiteMineRunner {
    async fn compare(&self, request: &ComparisonRequest) -> Result<ToolOutput> {
        info!(command = %self.command_line(request), "Running SiteMine");

        let output = Command::new(&self.executable_path)
            .args(request.args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SiteprepError::io(&self.executable_path, e))?;

        debug!(
            status = ?output.status,
            stdout_bytes = output.stdout.len(),
            "SiteMine exited"
        );

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

//! siteprep-molecules — SiteMine input preparation and batch comparison.
//!
//! 1. Reading and writing PDB structures as typed record sequences
//! 2. Generating EDF pocket descriptors from pocket structures
//! 3. Injecting the SiteMine HEADER into receptor structures
//! 4. Running SiteMine over a directory of EDFs, one job at a time

pub mod pdb;
pub mod edf;
pub mod receptor;
pub mod sitemine;
pub mod batch;

pub use batch::{run_batch, BatchConfig, BatchSummary, JobOutcome, JobReport, SkipReason};
pub use sitemine::{ComparisonRequest, Mode, SiteComparator, SiteMineRunner, ToolOutput};

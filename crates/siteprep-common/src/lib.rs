//! siteprep-common — Shared error type used across all siteprep crates.

pub mod error;

pub use error::{Result, SiteprepError};

//! Receptor preparation: stamping the HEADER record SiteMine expects.

use std::path::{Path, PathBuf};

use siteprep_common::{Result, SiteprepError};
use tracing::info;

use crate::edf::prepared_receptor_file_name;
use crate::pdb::{HeaderRecord, Structure};

pub const SITEMINE_CLASSIFICATION: &str = "HYDROLASE/HYDROLASE INHIBITOR";
pub const SITEMINE_DEPOSITION_DATE: &str = "18-MAY-11";

/// Four-character ID code from a file stem: first four characters,
/// upper-cased, space-padded on the right.
pub fn header_code(file_stem: &str) -> String {
    let code: String = file_stem
        .chars()
        .flat_map(char::to_uppercase)
        .take(4)
        .collect();
    format!("{:<4}", code)
}

pub fn sitemine_header(file_stem: &str) -> HeaderRecord {
    HeaderRecord {
        classification: SITEMINE_CLASSIFICATION.to_string(),
        deposition_date: SITEMINE_DEPOSITION_DATE.to_string(),
        id_code: header_code(file_stem),
    }
}

/// `sitemine_<file name>` next to the input receptor.
pub fn default_output_path(receptor_path: &Path) -> PathBuf {
    let name = receptor_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    receptor_path.with_file_name(prepared_receptor_file_name(&name))
}

/// Write `receptor_path` to `output_path` with the SiteMine HEADER as its
/// first record. An existing HEADER is replaced; everything else is copied
/// through in order.
pub async fn inject_header(receptor_path: &Path, output_path: &Path) -> Result<PathBuf> {
    let mut structure = Structure::read(receptor_path).await?;
    if structure.is_empty() {
        return Err(SiteprepError::EmptyStructure(receptor_path.to_path_buf()));
    }

    let stem = receptor_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let header = sitemine_header(&stem);
    let code = header.id_code.clone();
    structure.set_header(header);
    structure.write(output_path).await?;

    info!(
        receptor = %receptor_path.display(),
        output = %output_path.display(),
        code = %code,
        "Injected SiteMine header"
    );
    Ok(output_path.to_path_buf())
}

//! EDF (environment descriptor file) generation from pocket structures.
//!
//! An EDF names the prepared receptor a pocket was cut from and lists the
//! pocket's residues:
//!
//! ```text
//! REFERENCE sitemine_<base>_v4.pdb
//! RESIDUE <res_name> <chain_id> <res_seq>
//! ```

use std::path::Path;

use indexmap::IndexSet;
use regex::Regex;
use siteprep_common::{Result, SiteprepError};
use tokio::fs;
use tracing::{debug, info};

use crate::pdb::{ResidueKey, Structure};

/// File extension of descriptor files.
pub const EDF_EXTENSION: &str = "edf";

/// Prefix given to receptors once their SiteMine header is injected.
pub const PREPARED_RECEPTOR_PREFIX: &str = "sitemine_";

const REFERENCE_KEYWORD: &str = "REFERENCE";
const RESIDUE_KEYWORD: &str = "RESIDUE";

fn pocket_name_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // AF-P21266-F1-model_v1_cavity_1.pdb
        Regex::new(r"^(.*)_v1_cavity_\d+\.pdb$").unwrap()
    })
}

/// Map a pocket file name `<base>_v1_cavity_<N>.pdb` to its receptor file
/// name `<base>_v4.pdb`.
pub fn receptor_file_name(pocket_file_name: &str) -> Result<String> {
    let caps = pocket_name_regex()
        .captures(pocket_file_name)
        .ok_or_else(|| SiteprepError::PocketName(pocket_file_name.to_string()))?;
    Ok(format!("{}_v4.pdb", &caps[1]))
}

pub fn prepared_receptor_file_name(receptor_file_name: &str) -> String {
    format!("{PREPARED_RECEPTOR_PREFIX}{receptor_file_name}")
}

/// Receptor file name from a `REFERENCE <name>` line, or `None` if the line
/// is not exactly that shape. A leading byte order mark is ignored.
pub fn parse_reference_line(line: &str) -> Option<&str> {
    let mut tokens = line.trim_start_matches('\u{feff}').split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(REFERENCE_KEYWORD), Some(name), None) => Some(name),
        _ => None,
    }
}

/// A pocket's residues plus the prepared receptor they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocketDescriptor {
    pub reference: String,
    pub residues: Vec<ResidueKey>,
}

impl PocketDescriptor {
    /// Build the descriptor for `structure`, whose file is named
    /// `pocket_file_name`. Residues are deduplicated in first-seen order.
    pub fn from_structure(pocket_file_name: &str, structure: &Structure) -> Result<Self> {
        let receptor = receptor_file_name(pocket_file_name)?;
        let residues: IndexSet<ResidueKey> =
            structure.atoms().map(|atom| atom.residue_key()).collect();

        Ok(Self {
            reference: prepared_receptor_file_name(&receptor),
            residues: residues.into_iter().collect(),
        })
    }

    /// EDF text. Lines are newline-separated with no trailing newline.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.residues.len() + 1);
        lines.push(format!("{REFERENCE_KEYWORD} {}", self.reference));
        for r in &self.residues {
            lines.push(format!(
                "{RESIDUE_KEYWORD} {} {} {}",
                r.res_name, r.chain_id, r.res_seq
            ));
        }
        lines.join("\n")
    }
}

fn file_name_of(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SiteprepError::PocketName(path.display().to_string()))
}

/// Read a pocket structure and build its descriptor.
pub async fn generate(pocket_path: &Path) -> Result<PocketDescriptor> {
    let pocket_file_name = file_name_of(pocket_path)?;
    // Reject a bad name before touching the file.
    receptor_file_name(pocket_file_name)?;

    let structure = Structure::read(pocket_path).await?;
    PocketDescriptor::from_structure(pocket_file_name, &structure)
}

/// Generate the descriptor for `pocket_path` and write it to `output_path`,
/// overwriting any existing file.
pub async fn prepare_edf(pocket_path: &Path, output_path: &Path) -> Result<PocketDescriptor> {
    let descriptor = generate(pocket_path).await?;
    fs::write(output_path, descriptor.render())
        .await
        .map_err(|e| SiteprepError::io(output_path, e))?;

    info!(
        pocket = %pocket_path.display(),
        edf = %output_path.display(),
        reference = %descriptor.reference,
        residues = descriptor.residues.len(),
        "Wrote EDF"
    );
    debug!("EDF content:\n{}", descriptor.render());
    Ok(descriptor)
}

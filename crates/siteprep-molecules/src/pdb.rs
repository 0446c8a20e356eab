//! PDB structure reading and writing.
//!
//! Only the fixed columns the preparation steps need are parsed. Every other
//! record keeps its original line, so a rewritten file differs from its
//! source only where a record was deliberately replaced.

use std::borrow::Cow;
use std::path::Path;

use siteprep_common::{Result, SiteprepError};
use tokio::fs;
use tracing::debug;

/// Width of a fixed-column PDB record.
pub const RECORD_WIDTH: usize = 80;

/// Extract a fixed-width column range (1-indexed, inclusive), trimmed.
fn column(line: &str, start: usize, end: usize) -> &str {
    let start_idx = start.saturating_sub(1);
    let end_idx = end.min(line.len());
    if start_idx >= end_idx {
        return "";
    }
    line.get(start_idx..end_idx).unwrap_or("").trim()
}

/// Identity of one residue instance within a structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResidueKey {
    pub chain_id: String,
    pub res_seq: i32,
    pub res_name: String,
}

/// A HEADER record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub classification: String,
    pub deposition_date: String,
    pub id_code: String,
}

impl HeaderRecord {
    fn parse(line: &str) -> Self {
        Self {
            classification: column(line, 11, 50).to_string(),
            deposition_date: column(line, 51, 59).to_string(),
            id_code: column(line, 63, 66).to_string(),
        }
    }

    /// Render the record in PDB column layout: classification in 11-50,
    /// date in 51-59, ID code in 63-66, padded to the full record width.
    pub fn to_line(&self) -> String {
        let line = format!(
            "HEADER    {:<40}{:<9}   {:<4}",
            self.classification, self.deposition_date, self.id_code
        );
        format!("{:<width$}", line, width = RECORD_WIDTH)
    }
}

/// An ATOM or HETATM record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomRecord {
    pub hetatm: bool,
    pub res_name: String,
    pub chain_id: String,
    pub res_seq: i32,
    line: String,
}

impl AtomRecord {
    fn parse(line: &str, line_no: usize, hetatm: bool) -> Result<Self> {
        // resSeq ends at column 26
        if line.len() < 26 {
            return Err(SiteprepError::Pdb {
                line: line_no,
                reason: format!(
                    "atom record has {} columns, residue fields need 26",
                    line.len()
                ),
            });
        }

        let res_name = column(line, 18, 20);
        if res_name.is_empty() {
            return Err(SiteprepError::Pdb {
                line: line_no,
                reason: "atom record has no residue name".to_string(),
            });
        }

        let res_seq_field = column(line, 23, 26);
        let res_seq = res_seq_field.parse::<i32>().map_err(|_| SiteprepError::Pdb {
            line: line_no,
            reason: format!("residue number {:?} is not an integer", res_seq_field),
        })?;

        Ok(Self {
            hetatm,
            res_name: res_name.to_string(),
            chain_id: column(line, 22, 22).to_string(),
            res_seq,
            line: line.to_string(),
        })
    }

    pub fn residue_key(&self) -> ResidueKey {
        ResidueKey {
            chain_id: self.chain_id.clone(),
            res_seq: self.res_seq,
            res_name: self.res_name.clone(),
        }
    }

    /// The source line, written back unchanged.
    pub fn line(&self) -> &str {
        &self.line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header(HeaderRecord),
    Atom(AtomRecord),
    Other(String),
}

impl Record {
    pub fn to_line(&self) -> Cow<'_, str> {
        match self {
            Record::Header(header) => Cow::Owned(header.to_line()),
            Record::Atom(atom) => Cow::Borrowed(atom.line()),
            Record::Other(line) => Cow::Borrowed(line),
        }
    }
}

/// A structure as an ordered sequence of typed records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    pub records: Vec<Record>,
}

impl Structure {
    /// Parse PDB text. Malformed ATOM/HETATM records are an error.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut records = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let record = match column(line, 1, 6) {
                "ATOM" => Record::Atom(AtomRecord::parse(line, idx + 1, false)?),
                "HETATM" => Record::Atom(AtomRecord::parse(line, idx + 1, true)?),
                "HEADER" => Record::Header(HeaderRecord::parse(line)),
                _ => Record::Other(line.to_string()),
            };
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Read and parse a PDB file from disk.
    pub async fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| SiteprepError::io(path, e))?;
        let structure = Self::parse(&contents)?;
        debug!(
            path = %path.display(),
            records = structure.records.len(),
            "Parsed structure"
        );
        Ok(structure)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// ATOM records in file order. HETATM records are excluded.
    pub fn atoms(&self) -> impl Iterator<Item = &AtomRecord> {
        self.records.iter().filter_map(|record| match record {
            Record::Atom(atom) if !atom.hetatm => Some(atom),
            _ => None,
        })
    }

    pub fn header(&self) -> Option<&HeaderRecord> {
        self.records.iter().find_map(|record| match record {
            Record::Header(header) => Some(header),
            _ => None,
        })
    }

    /// Make `header` the first record, dropping any existing HEADER records.
    pub fn set_header(&mut self, header: HeaderRecord) {
        self.records.retain(|record| !matches!(record, Record::Header(_)));
        self.records.insert(0, Record::Header(header));
    }

    /// Render as PDB text, one record per line, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    /// Write the whole structure to `path`, replacing any existing file.
    pub async fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .await
            .map_err(|e| SiteprepError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POCKET: &str = "\
REMARK   1 POCKET
ATOM      1  N   ALA A  10      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A  10      11.639   6.071  -5.147  1.00  0.00           C
HETATM    3  O   HOH B 201       1.000   2.000   3.000  1.00  0.00           O
ATOM      4  CA  GLY B   5       9.000   6.000  -5.000  1.00  0.00           C
END";

    #[test]
    fn test_parse_atom_columns() {
        let s = Structure::parse(POCKET).unwrap();
        assert_eq!(s.records.len(), 6);

        let atoms: Vec<_> = s.atoms().collect();
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0].res_name, "ALA");
        assert_eq!(atoms[0].chain_id, "A");
        assert_eq!(atoms[0].res_seq, 10);
        assert_eq!(atoms[2].residue_key(), ResidueKey {
            chain_id: "B".to_string(),
            res_seq: 5,
            res_name: "GLY".to_string(),
        });
    }

    #[test]
    fn test_atoms_skip_hetatm() {
        let s = Structure::parse(POCKET).unwrap();
        assert!(s.atoms().all(|a| a.res_name != "HOH"));
    }

    #[test]
    fn test_truncated_atom_is_error() {
        let err = Structure::parse("REMARK\nATOM      1  N   ALA A").unwrap_err();
        match err {
            SiteprepError::Pdb { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_residue_number_is_error() {
        let line = "ATOM      1  N   ALA A  1X      11.104   6.134  -6.504  1.00  0.00           N";
        assert!(matches!(
            Structure::parse(line),
            Err(SiteprepError::Pdb { line: 1, .. })
        ));
    }

    #[test]
    fn test_blank_chain_is_empty_string() {
        let line = "ATOM      1  N   ALA    10      11.104   6.134  -6.504  1.00  0.00           N";
        let s = Structure::parse(line).unwrap();
        assert_eq!(s.atoms().next().unwrap().chain_id, "");
    }

    #[test]
    fn test_header_line_layout() {
        let header = HeaderRecord {
            classification: "HYDROLASE".to_string(),
            deposition_date: "18-MAY-11".to_string(),
            id_code: "1ABC".to_string(),
        };
        let line = header.to_line();
        assert_eq!(line.len(), RECORD_WIDTH);
        assert_eq!(&line[0..6], "HEADER");
        assert_eq!(&line[10..19], "HYDROLASE");
        assert_eq!(&line[50..59], "18-MAY-11");
        assert_eq!(&line[62..66], "1ABC");
    }

    #[test]
    fn test_set_header_replaces_existing() {
        let text = format!(
            "HEADER    {:<40}01-JAN-00   OLDX\n{}",
            "OLD",
            "ATOM      1  N   ALA A  10      11.104   6.134  -6.504  1.00  0.00           N"
        );
        let mut s = Structure::parse(&text).unwrap();
        assert_eq!(s.header().unwrap().id_code, "OLDX");

        s.set_header(HeaderRecord {
            classification: "NEW".to_string(),
            deposition_date: "18-MAY-11".to_string(),
            id_code: "NEWX".to_string(),
        });
        let headers = s.records.iter().filter(|r| matches!(r, Record::Header(_))).count();
        assert_eq!(headers, 1);
        assert!(matches!(&s.records[0], Record::Header(h) if h.id_code == "NEWX"));
        assert_eq!(s.records.len(), 2);
    }

    #[test]
    fn test_render_keeps_other_lines_verbatim() {
        let s = Structure::parse(POCKET).unwrap();
        assert_eq!(s.render(), format!("{}\n", POCKET));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pocket.pdb");
        let s = Structure::parse(POCKET).unwrap();
        s.write(&path).await.unwrap();

        let back = Structure::read(&path).await.unwrap();
        assert_eq!(back, s);
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.pdb");
        let err = Structure::read(&path).await.unwrap_err();
        assert!(err.to_string().contains("absent.pdb"));
    }
}

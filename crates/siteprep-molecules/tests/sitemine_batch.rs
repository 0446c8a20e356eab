//! End-to-end preparation and batch run against a stub SiteMine executable.
//!
//! The stub is a shell script, so this only runs on Unix.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use siteprep_molecules::edf::prepare_edf;
use siteprep_molecules::receptor::inject_header;
use siteprep_molecules::{run_batch, BatchConfig, JobOutcome, Mode, SiteMineRunner, SkipReason};
use tempfile::tempdir;

const STUB: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -e) edf="$2"; shift 2 ;;
    -m) mode="$2"; shift 2 ;;
    --output) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$(basename "$edf")" in
  bad_*) echo "cannot read descriptor $edf" >&2; exit 2 ;;
esac
mkdir -p "$out" && echo "$mode" > "$out/hits.txt"
"#;

const RECEPTOR: &str = "\
ATOM      1  N   ALA A  10      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  GLY B   5       9.000   6.000  -5.000  1.00  0.00           C
END
";

const POCKET: &str = "\
ATOM      1  N   ALA A  10      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A  10      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  CA  GLY B   5       9.000   6.000  -5.000  1.00  0.00           C
";

fn write_stub(path: &Path) {
    std::fs::write(path, STUB).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

#[tokio::test]
async fn test_prepare_and_run_batch_with_stub_tool() {
    let root = tempdir().unwrap();
    let raw = root.path().join("raw");
    let receptors = root.path().join("prepared_receptors");
    let edfs = root.path().join("prepared_edfs");
    for dir in [&raw, &receptors, &edfs] {
        std::fs::create_dir_all(dir).unwrap();
    }

    // Receptors for "good" and "bad"; "orphan" has a pocket but no receptor.
    for base in ["good", "bad"] {
        let input = raw.join(format!("{base}_v4.pdb"));
        std::fs::write(&input, RECEPTOR).unwrap();
        inject_header(&input, &receptors.join(format!("sitemine_{base}_v4.pdb")))
            .await
            .unwrap();
    }
    for base in ["good", "bad", "orphan"] {
        let pocket = raw.join(format!("{base}_v1_cavity_1.pdb"));
        std::fs::write(&pocket, POCKET).unwrap();
        prepare_edf(&pocket, &edfs.join(format!("{base}_v1_cavity_1.edf")))
            .await
            .unwrap();
    }

    let stub = root.path().join("sitemine");
    write_stub(&stub);

    let mut config = BatchConfig::new(&receptors, &edfs, root.path().join("sitemine.db"));
    config.mode = Mode::Precise;
    config.results_dir = root.path().join("sitemine_results");

    let summary = run_batch(&config, &SiteMineRunner::new(&stub)).await.unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.skipped(), 1);

    for job in &summary.jobs {
        let name = job.descriptor.file_name().unwrap().to_string_lossy().into_owned();
        match name.as_str() {
            "good_v1_cavity_1.edf" => assert_eq!(job.outcome, JobOutcome::Succeeded),
            "bad_v1_cavity_1.edf" => match &job.outcome {
                JobOutcome::Failed { reason } => {
                    assert!(reason.starts_with("cannot read descriptor"))
                }
                other => panic!("expected failure, got {other:?}"),
            },
            "orphan_v1_cavity_1.edf" => assert_eq!(
                job.outcome,
                JobOutcome::Skipped { reason: SkipReason::ReceptorNotFound }
            ),
            other => panic!("unexpected descriptor {other}"),
        }
    }

    let hits = config.results_dir.join("good_v1_cavity_1").join("hits.txt");
    assert_eq!(std::fs::read_to_string(hits).unwrap().trim(), "precise");
}

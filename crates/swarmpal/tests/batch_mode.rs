//! End-to-end batch-mode behavior over manual (inline) providers.

use std::fs;
use std::path::Path;

use swarmpal_core::batch::{run_batch, REGISTRY_FILENAME};
use swarmpal_core::config::BatchConfig;
use swarmpal_tree::{read_tree, Values};

fn run(config: &str, out_dir: &Path, write_registry: bool) -> swarmpal_core::Result<()> {
    let config = BatchConfig::from_str(config).expect("config parses");
    run_batch(&config, out_dir, write_registry)
}

fn f_values(file: &Path, group: &str) -> Vec<f64> {
    let tree = read_tree(file).expect("output file reads back");
    let ds = tree.get(group).expect("group present").dataset();
    match &ds.get("F").expect("F present").values {
        Values::F64(a) => a.iter().copied().collect(),
        other => panic!("unexpected dtype {}", other.dtype()),
    }
}

const DEMO: &str = r#"
demo:
  data:
    - provider: manual
      config:
        name: probe
        variables:
          F:
            dims: [Timestamp]
            values: [1.0, 2.0, 3.0]
"#;

#[test]
fn demo_without_registry_writes_one_file_and_no_manifest() {
    let dir = tempfile::tempdir().unwrap();
    run(DEMO, dir.path(), false).unwrap();

    assert!(dir.path().join("demo.nc4").is_file());
    assert!(!dir.path().join(REGISTRY_FILENAME).exists());
    assert_eq!(f_values(&dir.path().join("demo.nc4"), "probe"), vec![1.0, 2.0, 3.0]);
}

#[test]
fn demo_with_registry_writes_one_manifest_line() {
    let dir = tempfile::tempdir().unwrap();
    run(DEMO, dir.path(), true).unwrap();

    let manifest = fs::read_to_string(dir.path().join(REGISTRY_FILENAME)).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 1);
    let (filename, digest) = lines[0].split_once(" md5:").unwrap();
    assert_eq!(filename, "demo.nc4");
    assert_eq!(digest.len(), 32);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn registry_digests_match_recomputed_md5() {
    let dir = tempfile::tempdir().unwrap();
    let config = format!("{DEMO}\nsecond:\n  data:\n    - provider: manual\n      config:\n        name: other\n        variables:\n          F:\n            dims: [t]\n            values: [9.0]\n");
    run(&config, dir.path(), true).unwrap();

    let manifest = fs::read_to_string(dir.path().join(REGISTRY_FILENAME)).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    // Manifest order follows processing order
    assert!(lines[0].starts_with("demo.nc4 md5:"));
    assert!(lines[1].starts_with("second.nc4 md5:"));

    for line in lines {
        let (filename, digest) = line.split_once(" md5:").unwrap();
        let bytes = fs::read(dir.path().join(filename)).unwrap();
        assert_eq!(digest, format!("{:x}", md5::compute(&bytes)));
    }
}

#[test]
fn overlapping_fetch_keys_last_wins() {
    let config = r#"
merged:
  data:
    - provider: manual
      config:
        name: shared
        variables:
          F:
            dims: [t]
            values: [1.0]
    - provider: manual
      config:
        name: shared
        variables:
          F:
            dims: [t]
            values: [42.0]
"#;
    let dir = tempfile::tempdir().unwrap();
    run(config, dir.path(), false).unwrap();
    assert_eq!(f_values(&dir.path().join("merged.nc4"), "shared"), vec![42.0]);
}

#[test]
fn process_chain_order_is_observable() {
    let base = |chain: &str| {
        format!(
            r#"
chained:
  data:
    - provider: manual
      config:
        name: probe
        variables:
          F:
            dims: [t]
            values: [3.0]
  processes:
{chain}"#
        )
    };
    let scale_then_offset = base(
        "    - name: generic.scale\n      factor: 2.0\n    - name: generic.offset\n      offset: 1.0\n",
    );
    let offset_then_scale = base(
        "    - name: generic.offset\n      offset: 1.0\n    - name: generic.scale\n      factor: 2.0\n",
    );

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    run(&scale_then_offset, dir_a.path(), false).unwrap();
    run(&offset_then_scale, dir_b.path(), false).unwrap();

    assert_eq!(f_values(&dir_a.path().join("chained.nc4"), "probe"), vec![7.0]);
    assert_eq!(f_values(&dir_b.path().join("chained.nc4"), "probe"), vec![8.0]);
}

#[test]
fn missing_processes_equals_empty_list() {
    let with_empty = r#"
demo:
  data:
    - provider: manual
      config:
        name: probe
        variables:
          F:
            dims: [Timestamp]
            values: [1.0, 2.0, 3.0]
  processes: []
"#;
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    run(DEMO, dir_a.path(), false).unwrap();
    run(with_empty, dir_b.path(), false).unwrap();

    let a = fs::read(dir_a.path().join("demo.nc4")).unwrap();
    let b = fs::read(dir_b.path().join("demo.nc4")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn failing_entry_aborts_the_whole_run() {
    let config = r#"
good:
  data:
    - provider: manual
      config:
        name: probe
        variables:
          F:
            dims: [t]
            values: [1.0]
bad:
  data:
    - provider: no_such_provider
      config: {}
"#;
    let dir = tempfile::tempdir().unwrap();
    let err = run(config, dir.path(), true).unwrap_err();
    assert!(matches!(err, swarmpal_core::PalError::UnknownProvider(_)));
    // The first entry was written before the abort; no manifest appears
    assert!(dir.path().join("good.nc4").is_file());
    assert!(!dir.path().join(REGISTRY_FILENAME).exists());
}

#[test]
fn unknown_process_aborts_before_write() {
    let config = r#"
demo:
  data:
    - provider: manual
      config:
        name: probe
        variables:
          F:
            dims: [t]
            values: [1.0]
  processes:
    - name: tfa.wavelet
"#;
    let dir = tempfile::tempdir().unwrap();
    let err = run(config, dir.path(), false).unwrap_err();
    match err {
        swarmpal_core::PalError::UnknownProcess(name) => assert_eq!(name, "tfa.wavelet"),
        other => panic!("expected UnknownProcess, got {other:?}"),
    }
    assert!(!dir.path().join("demo.nc4").exists());
}

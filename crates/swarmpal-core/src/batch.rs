//! Batch orchestration: fetch, process, write, checksum.
//!
//! One output file per dataset entry, processed strictly sequentially in
//! config document order. Any fetch, process, or write failure aborts the
//! whole run; there is no per-entry isolation or retrying.

use std::fs;
use std::path::Path;

use swarmpal_tree::{write_tree, DataTree};

use crate::config::BatchConfig;
use crate::error::Result;
use crate::processes::make_process;
use crate::providers::get_data;

pub const REGISTRY_FILENAME: &str = "registry.txt";

/// Insertion-ordered filename -> MD5 digest manifest.
#[derive(Debug, Default)]
pub struct ChecksumRegistry {
    entries: Vec<(String, String)>,
}

impl ChecksumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, filename: impl Into<String>, digest: impl Into<String>) {
        self.entries.push((filename.into(), digest.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Write the manifest, one `<filename> md5:<hexdigest>` line per
    /// entry, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for (filename, digest) in &self.entries {
            text.push_str(&format!("{filename} md5:{digest}\n"));
        }
        fs::write(path, text)?;
        Ok(())
    }
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// MD5 over a file's raw bytes.
pub fn checksum_file(path: &Path) -> Result<String> {
    Ok(md5_hex(&fs::read(path)?))
}

/// Run the batch described by `config`, writing one `{name}.nc4` per
/// dataset entry under `out_dir` and, when requested, a `registry.txt`
/// manifest of MD5 checksums.
pub fn run_batch(config: &BatchConfig, out_dir: &Path, write_registry: bool) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let mut registry = ChecksumRegistry::new();

    for (name, spec) in config.datasets() {
        tracing::info!(dataset = name, "processing dataset entry");
        let mut tree = DataTree::new();

        for fetch in &spec.data {
            let item = get_data(fetch)?;
            for (key, child) in item.into_children() {
                // Last fetch wins on colliding keys, by design upstream
                if tree.set_child(&key, child) {
                    tracing::debug!(dataset = name, key, "overwrote existing branch");
                }
            }
        }

        for process_spec in &spec.processes {
            tracing::debug!(dataset = name, process = %process_spec.name, "applying process");
            let process = make_process(process_spec)?;
            tree = process.apply(tree)?;
        }

        let filename = format!("{name}.nc4");
        let filepath = out_dir.join(&filename);
        write_tree(&tree, &filepath)?;
        tracing::info!(dataset = name, file = %filepath.display(), "wrote output");

        if write_registry {
            registry.record(filename, checksum_file(&filepath)?);
        }
    }

    if write_registry {
        registry.write(&out_dir.join(REGISTRY_FILENAME))?;
    }
    Ok(())
}

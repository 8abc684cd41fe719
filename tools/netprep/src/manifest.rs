//! Run lock file
//!
//! Records what a run consumed and produced so a later run can be compared
//! byte for byte.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash and location of one input or output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub sha256: String,
}

impl FileDigest {
    pub fn of<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.to_path_buf(),
            sha256: compute_sha256(path)?,
        })
    }
}

/// `<command>.lock.json` contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLock {
    pub command: String,
    pub tool_version: String,
    pub inputs: Vec<FileDigest>,
    pub outputs: Vec<FileDigest>,
    pub counts: BTreeMap<String, usize>,
    /// Stage statistics, as reported by each stage
    pub stats: BTreeMap<String, serde_json::Value>,
    pub created_at_utc: String,
}

impl RunLock {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            counts: BTreeMap::new(),
            stats: BTreeMap::new(),
            created_at_utc: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn input<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let digest = FileDigest::of(path)?;
        println!("  ✓ Input SHA-256: {} ({})", digest.sha256, digest.path.display());
        self.inputs.push(digest);
        Ok(self)
    }

    pub fn output<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let digest = FileDigest::of(path)?;
        println!("  ✓ Output SHA-256: {} ({})", digest.sha256, digest.path.display());
        self.outputs.push(digest);
        Ok(self)
    }

    pub fn count(&mut self, name: &str, value: usize) -> &mut Self {
        self.counts.insert(name.to_string(), value);
        self
    }

    pub fn stats<S: Serialize>(&mut self, stage: &str, stats: &S) -> Result<&mut Self> {
        let value = serde_json::to_value(stats)
            .with_context(|| format!("Failed to serialize {} stats", stage))?;
        self.stats.insert(stage.to_string(), value);
        Ok(self)
    }

    /// Write lock file to disk
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        println!("  ✓ Wrote {}", path.display());
        Ok(())
    }

    /// Read lock file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let lock: RunLock = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(lock)
    }
}

/// Compute SHA-256 hash of a file
pub fn compute_sha256<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

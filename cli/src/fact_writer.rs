//! JSON-lines output of structural facts, one fact per line

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use lawtree_backend::path_tree::PathTree;
use lawtree_backend::tree_emitter::emit;

/// Serialize every fact of `tree` to `out`; returns the number written.
pub fn write_facts<W: Write>(out: &mut W, tree: &PathTree) -> Result<usize> {
    let mut count = 0;
    for fact in emit(tree) {
        serde_json::to_writer(&mut *out, &fact).context("Failed to serialize fact")?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Writes one `<name>.jsonl` per document, or everything to stdout
pub struct FactWriter {
    output_dir: Option<PathBuf>,
}

impl FactWriter {
    pub fn stdout() -> Self {
        FactWriter { output_dir: None }
    }

    pub fn to_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(FactWriter {
            output_dir: Some(dir.to_path_buf()),
        })
    }

    pub fn new(output_dir: Option<&Path>) -> Result<Self> {
        match output_dir {
            Some(dir) => Self::to_dir(dir),
            None => Ok(Self::stdout()),
        }
    }

    /// Path a document's facts go to, if writing to files
    pub fn document_path(&self, name: &str) -> Option<PathBuf> {
        let file_name: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.jsonl", file_name.to_lowercase())))
    }

    pub fn write_document(&mut self, name: &str, tree: &PathTree) -> Result<usize> {
        match self.document_path(name) {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let mut out = BufWriter::new(file);
                write_facts(&mut out, tree)
                    .with_context(|| format!("Failed to write {}", path.display()))
            }
            None => {
                let stdout = std::io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                write_facts(&mut out, tree)
            }
        }
    }
}

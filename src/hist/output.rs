use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::histogram::HistogramSet;
use crate::selection::RunCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json { pretty: bool },
    Cbor,
}

impl Format {
    /// CBOR for `*.cbor`, JSON for anything else.
    pub fn from_path(path: &Path, pretty: bool) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("cbor") => Format::Cbor,
            _ => Format::Json { pretty },
        }
    }
}

/// Histograms plus the run counters under `N`.
pub fn output_tree(hists: &HistogramSet, counts: &RunCounts) -> Value {
    let mut tree = hists.to_json();
    tree.insert("N".to_string(), json!(counts));
    Value::Object(tree)
}

pub fn write_output(path: &Path, tree: &Value, format: Format) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(f);
    match format {
        Format::Cbor => ciborium::into_writer(tree, &mut out)
            .with_context(|| format!("write cbor {}", path.display()))?,
        Format::Json { pretty } => {
            if pretty {
                serde_json::to_writer_pretty(&mut out, tree)
            } else {
                serde_json::to_writer(&mut out, tree)
            }
            .with_context(|| format!("write json {}", path.display()))?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

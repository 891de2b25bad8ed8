use anyhow::{Context, Result, bail};
use ndarray::Array1;
use ndarray_npy::NpzReader;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use super::types::{Column, EventTable};

pub const DEFAULT_TABLE: &str = "events";
pub const NPARTICLE: &str = "nparticle";

/// Split an archive entry into `(table, branch)`.
/// `px.npy` belongs to the default table, `tree/px.npy` to `tree`.
fn split_entry(entry: &str) -> (&str, &str) {
    let stem = entry.strip_suffix(".npy").unwrap_or(entry);
    match stem.rsplit_once('/') {
        Some((table, branch)) => (table, branch),
        None => (DEFAULT_TABLE, stem),
    }
}

fn read_column<R: std::io::Read + std::io::Seek>(
    npz: &mut NpzReader<R>,
    entry: &str,
) -> Result<Column> {
    let as_f64: Result<Array1<f64>, _> = npz.by_name(entry);
    if let Ok(arr) = as_f64 {
        return Ok(Column::Float(arr.to_vec()));
    }
    let as_f32: Result<Array1<f32>, _> = npz.by_name(entry);
    if let Ok(arr) = as_f32 {
        return Ok(Column::Float(arr.iter().map(|&x| x as f64).collect()));
    }
    let as_i64: Result<Array1<i64>, _> = npz.by_name(entry);
    if let Ok(arr) = as_i64 {
        return Ok(Column::Int(arr.to_vec()));
    }
    let arr: Array1<i32> = npz
        .by_name(entry)
        .with_context(|| format!("{} is not a 1-d i32/i64/f32/f64 array", entry))?;
    Ok(Column::Int(arr.iter().map(|&x| x as i64).collect()))
}

fn build_indptr(nparticle: &Column, path: &Path) -> Result<Vec<usize>> {
    let Column::Int(counts) = nparticle else {
        bail!("branch \"{}\" in {} must be integer", NPARTICLE, path.display());
    };
    let mut indptr = Vec::with_capacity(counts.len() + 1);
    indptr.push(0usize);
    for (row, &n) in counts.iter().enumerate() {
        if n < 0 {
            bail!("negative {} ({}) at row {} in {}", NPARTICLE, n, row, path.display());
        }
        let last = *indptr.last().unwrap_or(&0);
        indptr.push(last + n as usize);
    }
    Ok(indptr)
}

/// Load the single event table stored in an `.npz` archive.
pub fn load_table(path: &Path) -> Result<EventTable> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut npz = NpzReader::new(f).with_context(|| format!("read npz {}", path.display()))?;
    let entries = npz
        .names()
        .with_context(|| format!("list entries of {}", path.display()))?;

    let mut tables: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for entry in &entries {
        let (table, branch) = split_entry(entry);
        tables
            .entry(table.to_string())
            .or_default()
            .push((branch.to_string(), entry.clone()));
    }
    if tables.len() > 1 {
        bail!(
            "multiple tables in file {}: {}",
            path.display(),
            itertools::join(tables.keys(), ", ")
        );
    }
    let Some((name, branch_entries)) = tables.into_iter().next() else {
        bail!("no table in file {}", path.display());
    };

    let mut branches = Vec::with_capacity(branch_entries.len());
    for (branch, entry) in &branch_entries {
        let col = read_column(&mut npz, entry)
            .with_context(|| format!("branch \"{}\" in {}", branch, path.display()))?;
        branches.push((branch.clone(), col));
    }

    let nparticle = branches
        .iter()
        .find(|(b, _)| b == NPARTICLE)
        .map(|(_, c)| c)
        .with_context(|| format!("missing branch \"{}\" in {}", NPARTICLE, path.display()))?;
    let indptr = build_indptr(nparticle, path)?;
    let n_rows = indptr.len() - 1;
    let n_total = indptr[n_rows];

    for (branch, col) in &branches {
        if col.len() != n_rows && col.len() != n_total {
            bail!(
                "branch \"{}\" in {} has {} entries; expected {} (rows) or {} (particles)",
                branch,
                path.display(),
                col.len(),
                n_rows,
                n_total
            );
        }
    }

    Ok(EventTable::new(path.to_path_buf(), name, branches, indptr))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use ndarray_npy::NpzWriter;

    /// Write one table into an `.npz`; `table = None` uses bare branch names.
    pub fn write_table(path: &Path, table: Option<&str>, branches: &[(&str, Column)]) {
        let f = File::create(path).unwrap();
        let mut npz = NpzWriter::new(f);
        for (branch, col) in branches {
            let entry = match table {
                Some(t) => format!("{t}/{branch}.npy"),
                None => format!("{branch}.npy"),
            };
            match col {
                Column::Int(v) => npz.add_array(entry, &Array1::from_vec(v.clone())).unwrap(),
                Column::Float(v) => npz.add_array(entry, &Array1::from_vec(v.clone())).unwrap(),
            }
        }
        npz.finish().unwrap();
    }
}

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::path::PathBuf;

use super::io::load_table;
use super::types::{EventTable, Field, Row, Shape};

/// Several input tables read as one logical stream, in the order given.
///
/// Every table must carry the same name and exactly the same branches as the
/// first one, so a [`Field`] resolved on the chain is valid for all of them.
#[derive(Debug)]
pub struct EventChain {
    tables: Vec<EventTable>,
}

impl EventChain {
    /// Decode all inputs (one rayon task per file) and check they agree.
    pub fn open(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            bail!("no input files");
        }
        let tables: Vec<EventTable> = paths
            .par_iter()
            .map(|p| load_table(p).with_context(|| format!("input {}", p.display())))
            .collect::<Result<_>>()?;
        Self::from_tables(tables)
    }

    pub fn from_tables(tables: Vec<EventTable>) -> Result<Self> {
        let Some(first) = tables.first() else {
            bail!("no input tables");
        };
        for t in &tables[1..] {
            if t.name != first.name {
                bail!(
                    "table \"{}\" not found in {} (it has \"{}\")",
                    first.name,
                    t.path.display(),
                    t.name
                );
            }
            if t.names != first.names {
                let missing: Vec<&String> =
                    first.names.iter().filter(|n| !t.names.contains(n)).collect();
                let extra: Vec<&String> =
                    t.names.iter().filter(|n| !first.names.contains(n)).collect();
                bail!(
                    "branches of {} differ from {}: missing [{}], unexpected [{}]",
                    t.path.display(),
                    first.path.display(),
                    itertools::join(missing, ", "),
                    itertools::join(extra, ", ")
                );
            }
        }
        Ok(Self { tables })
    }

    pub fn name(&self) -> &str {
        &self.tables[0].name
    }

    pub fn tables(&self) -> &[EventTable] {
        &self.tables
    }

    pub fn n_entries(&self) -> u64 {
        self.tables.iter().map(|t| t.n_rows() as u64).sum()
    }

    pub fn has(&self, branch: &str) -> bool {
        self.tables[0].has(branch)
    }

    /// Resolve `branch` with the given shape; every table is checked, so a
    /// length mismatch in any input is reported against that file.
    pub fn field(&self, branch: &str, shape: Shape) -> Result<Field> {
        let f = self.tables[0].field(branch, shape)?;
        for t in &self.tables[1..] {
            t.field(branch, shape)?;
        }
        Ok(f)
    }

    pub fn int_field(&self, branch: &str, shape: Shape) -> Result<Field> {
        let f = self.tables[0].int_field(branch, shape)?;
        for t in &self.tables[1..] {
            t.int_field(branch, shape)?;
        }
        Ok(f)
    }

    pub fn row_field(&self, branch: &str) -> Result<Field> {
        self.field(branch, Shape::Row)
    }

    pub fn particle_field(&self, branch: &str) -> Result<Field> {
        self.field(branch, Shape::Particle)
    }

    /// All rows of all tables, in chain order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.tables
            .iter()
            .flat_map(|t| (0..t.n_rows()).map(move |i| t.row(i)))
    }
}

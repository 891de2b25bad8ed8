use ahash::AHashMap;
use anyhow::{Result, bail};
use std::path::PathBuf;

/// Branch storage, widened on load (`i32 -> i64`, `f32 -> f64`).
#[derive(Debug, Clone)]
pub enum Column {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Column {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }
    #[inline]
    fn int_at(&self, i: usize) -> i64 {
        match self {
            Column::Int(v) => v[i],
            Column::Float(v) => v[i] as i64,
        }
    }
    #[inline]
    fn float_at(&self, i: usize) -> f64 {
        match self {
            Column::Int(v) => v[i] as f64,
            Column::Float(v) => v[i],
        }
    }
    pub fn is_int(&self) -> bool {
        matches!(self, Column::Int(_))
    }
}

/// How a branch is indexed: one value per row, or one per particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Row,
    Particle,
}

impl Shape {
    fn describe(self) -> &'static str {
        match self {
            Shape::Row => "one per row",
            Shape::Particle => "one per particle",
        }
    }
}

/// Resolved branch handle. Valid for every table of the chain it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub(crate) index: usize,
    pub(crate) shape: Shape,
}

/// One decoded input table.
///
/// Per-particle branches are stored flat; `indptr[r]..indptr[r+1]` is the slice
/// owned by row `r` (built from the `nparticle` branch).
#[derive(Debug)]
pub struct EventTable {
    pub path: PathBuf,
    pub name: String,
    pub names: Vec<String>, // sorted; index == Field::index
    pub columns: Vec<Column>,
    pub indptr: Vec<usize>,
    lookup: AHashMap<String, usize>,
}

impl EventTable {
    pub fn new(
        path: PathBuf,
        name: String,
        mut branches: Vec<(String, Column)>,
        indptr: Vec<usize>,
    ) -> Self {
        branches.sort_by(|a, b| a.0.cmp(&b.0));
        let mut lookup = AHashMap::with_capacity(branches.len());
        let mut names = Vec::with_capacity(branches.len());
        let mut columns = Vec::with_capacity(branches.len());
        for (i, (n, c)) in branches.into_iter().enumerate() {
            lookup.insert(n.clone(), i);
            names.push(n);
            columns.push(c);
        }
        Self {
            path,
            name,
            names,
            columns,
            indptr,
            lookup,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    #[inline]
    pub fn n_particles_total(&self) -> usize {
        self.indptr.last().copied().unwrap_or(0)
    }

    pub fn has(&self, branch: &str) -> bool {
        self.lookup.contains_key(branch)
    }

    /// Resolve `branch`, checking its length matches `shape`.
    pub fn field(&self, branch: &str, shape: Shape) -> Result<Field> {
        let Some(&index) = self.lookup.get(branch) else {
            bail!(
                "missing branch \"{}\" in table \"{}\" of {}",
                branch,
                self.name,
                self.path.display()
            );
        };
        let len = self.columns[index].len();
        let want = match shape {
            Shape::Row => self.n_rows(),
            Shape::Particle => self.n_particles_total(),
        };
        if len != want {
            bail!(
                "branch \"{}\" in {} has {} entries, expected {} ({})",
                branch,
                self.path.display(),
                len,
                want,
                shape.describe()
            );
        }
        Ok(Field { index, shape })
    }

    pub fn int_field(&self, branch: &str, shape: Shape) -> Result<Field> {
        let f = self.field(branch, shape)?;
        if !self.columns[f.index].is_int() {
            bail!(
                "branch \"{}\" in {} is not an integer branch",
                branch,
                self.path.display()
            );
        }
        Ok(f)
    }

    #[inline]
    pub fn row(&self, index: usize) -> Row<'_> {
        Row { table: self, index }
    }
}

/// Read-only view of a single row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    table: &'a EventTable,
    index: usize,
}

impl<'a> Row<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
    #[inline]
    pub fn table(&self) -> &'a EventTable {
        self.table
    }
    #[inline]
    pub fn int(&self, f: Field) -> i64 {
        debug_assert_eq!(f.shape, Shape::Row);
        self.table.columns[f.index].int_at(self.index)
    }
    #[inline]
    pub fn float(&self, f: Field) -> f64 {
        debug_assert_eq!(f.shape, Shape::Row);
        self.table.columns[f.index].float_at(self.index)
    }
    /// Per-row float that must not be NaN.
    pub fn checked_float(&self, f: Field) -> Result<f64> {
        let x = self.float(f);
        if x.is_nan() {
            bail!(
                "NaN in branch \"{}\" at row {} of {}",
                self.branch_name(f),
                self.index,
                self.table.path.display()
            );
        }
        Ok(x)
    }
    #[inline]
    pub fn n_particles(&self) -> usize {
        self.table.indptr[self.index + 1] - self.table.indptr[self.index]
    }
    #[inline]
    pub fn particle_int(&self, f: Field, k: usize) -> i64 {
        debug_assert_eq!(f.shape, Shape::Particle);
        self.table.columns[f.index].int_at(self.table.indptr[self.index] + k)
    }
    #[inline]
    pub fn particle_float(&self, f: Field, k: usize) -> f64 {
        debug_assert_eq!(f.shape, Shape::Particle);
        self.table.columns[f.index].float_at(self.table.indptr[self.index] + k)
    }
    pub fn branch_name(&self, f: Field) -> &'a str {
        &self.table.names[f.index]
    }
}

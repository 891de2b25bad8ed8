/// Ordered, name-unique list of every weight produced per row.
///
/// Two-phase: names are registered while reweighters are built, then the
/// catalog is sealed once. Bins may only be sized from a sealed catalog.
#[derive(Debug, Clone, Default)]
pub struct WeightCatalog {
    names: Vec<String>,
    sealed: bool,
}

impl WeightCatalog {
    pub fn new(baseline: &str) -> Self {
        Self {
            names: vec![baseline.to_string()],
            sealed: false,
        }
    }

    /// Append `name` unless it is already present. Returns whether it was added.
    pub fn register(&mut self, name: &str) -> bool {
        assert!(!self.sealed, "weight \"{name}\" registered after catalog was sealed");
        if self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Freeze the catalog; its length becomes the width of every bin.
    pub fn seal(&mut self) {
        assert!(!self.sealed, "weight catalog sealed twice");
        self.sealed = true;
    }

    /// Width of every bin. Panics before `seal`.
    pub fn width(&self) -> usize {
        assert!(self.sealed, "weight catalog used before it was sealed");
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

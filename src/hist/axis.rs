use anyhow::{Result, bail};
use serde_json::{Value, json};

/// Binning of one histogram dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    /// One bin that takes everything.
    Single,
    /// Explicit edges with an underflow bin in front and an overflow bin at the end.
    Edges(Vec<f64>),
}

impl Axis {
    pub fn edges(edges: Vec<f64>) -> Result<Self> {
        if edges.is_empty() {
            bail!("axis needs at least one edge");
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| !(w[0] < w[1])) {
            bail!("axis edges must be finite and strictly increasing: {:?}", edges);
        }
        Ok(Axis::Edges(edges))
    }

    pub fn bin_count(&self) -> usize {
        match self {
            Axis::Single => 1,
            Axis::Edges(e) => e.len() + 1,
        }
    }

    /// Bin `[e_k, e_k+1)` has index `k+1`; `0` is underflow, `len` overflow.
    pub fn bin_index(&self, x: f64) -> usize {
        match self {
            Axis::Single => 0,
            Axis::Edges(e) => e.partition_point(|&edge| edge <= x),
        }
    }

    pub fn describe(&self) -> Value {
        match self {
            Axis::Single => Value::Null,
            Axis::Edges(e) => json!(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_takes_everything() {
        let a = Axis::Single;
        assert_eq!(a.bin_count(), 1);
        assert_eq!(a.bin_index(-1e9), 0);
        assert_eq!(a.bin_index(f64::NAN), 0);
        assert_eq!(a.describe(), Value::Null);
    }

    #[test]
    fn edges_with_flow_bins() {
        let a = Axis::edges(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.bin_count(), 5);
        assert_eq!(a.bin_index(-0.5), 0);
        assert_eq!(a.bin_index(0.0), 1);
        assert_eq!(a.bin_index(1.0), 2);
        assert_eq!(a.bin_index(2.9), 3);
        assert_eq!(a.bin_index(3.0), 4);
        assert_eq!(a.bin_index(10.0), 4);
        assert_eq!(a.describe(), json!([0.0, 1.0, 2.0, 3.0]));
    }

    #[test]
    fn bad_edges() {
        assert!(Axis::edges(vec![]).is_err());
        assert!(Axis::edges(vec![1.0, 1.0]).is_err());
        assert!(Axis::edges(vec![0.0, f64::INFINITY]).is_err());
    }
}

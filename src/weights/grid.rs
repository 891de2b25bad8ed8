use anyhow::{Result, bail};
use serde::Deserialize;

/// `(renormalization, factorization)` scale factors.
pub type ScalePair = [f64; 2];

/// How a reweighting definition describes its scale points.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScaleGridSpec {
    /// `[max_order, steps_per_order]`
    Grid(u32, u32),
    /// explicit `[[ren, fac], ...]`
    Pairs(Vec<ScalePair>),
}

impl ScaleGridSpec {
    pub fn expand(&self) -> Result<Vec<ScalePair>> {
        match self {
            ScaleGridSpec::Grid(max, steps) => scale_grid(*max, *steps),
            ScaleGridSpec::Pairs(pairs) => {
                if pairs.is_empty() {
                    bail!("empty ren_fac list");
                }
                for &[r, f] in pairs {
                    if !(r.is_finite() && f.is_finite() && r > 0.0 && f > 0.0) {
                        bail!("scale factors must be positive and finite, got [{r}, {f}]");
                    }
                }
                Ok(pairs.clone())
            }
        }
    }
}

/// Log2-spaced grid: `(2^(r/steps), 2^(f/steps))` for
/// `r, f in [-max*steps, max*steps]`, `r` outer, `f` inner.
pub fn scale_grid(max_order: u32, steps: u32) -> Result<Vec<ScalePair>> {
    if steps == 0 {
        bail!("ren_fac: steps per order must be positive");
    }
    let max = (max_order as i64) * (steps as i64);
    let side = (2 * max + 1) as usize;
    let step = 1.0 / steps as f64;
    let mut scales = Vec::with_capacity(side * side);
    for r in -max..=max {
        for f in -max..=max {
            scales.push([(r as f64 * step).exp2(), (f as f64 * step).exp2()]);
        }
    }
    Ok(scales)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_zero_is_nominal_only() {
        assert_eq!(scale_grid(0, 1).unwrap(), vec![[1.0, 1.0]]);
        assert_eq!(scale_grid(0, 4).unwrap(), vec![[1.0, 1.0]]);
    }

    #[test]
    fn size_and_single_nominal() {
        for (max, steps) in [(1, 1), (1, 2), (2, 3)] {
            let g = scale_grid(max, steps).unwrap();
            let side = (2 * max * steps + 1) as usize;
            assert_eq!(g.len(), side * side);
            assert_eq!(g.capacity(), side * side);
            assert_eq!(g.iter().filter(|p| **p == [1.0, 1.0]).count(), 1);
        }
    }

    #[test]
    fn ren_is_outer_loop() {
        let g = scale_grid(1, 1).unwrap();
        assert_eq!(g[0], [0.5, 0.5]);
        assert_eq!(g[1], [0.5, 1.0]);
        assert_eq!(g[2], [0.5, 2.0]);
        assert_eq!(g[3], [1.0, 0.5]);
        assert_eq!(g[8], [2.0, 2.0]);
    }

    #[test]
    fn zero_steps_rejected() {
        assert!(scale_grid(1, 0).is_err());
    }

    #[test]
    fn ren_fac_parses_both_forms() {
        let g: ScaleGridSpec = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(g, ScaleGridSpec::Grid(1, 2));
        assert_eq!(g.expand().unwrap().len(), 25);

        let p: ScaleGridSpec = serde_json::from_str("[[1, 1], [0.5, 2]]").unwrap();
        assert_eq!(p.expand().unwrap(), vec![[1.0, 1.0], [0.5, 2.0]]);

        let bad: ScaleGridSpec = serde_json::from_str("[[0, 1]]").unwrap();
        assert!(bad.expand().is_err());
    }
}

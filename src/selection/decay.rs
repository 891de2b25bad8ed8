use anyhow::{Result, bail};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::f64::consts::PI;

use super::vec4::Vec4;

/// When repeated rows of one logical event get new decay angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Draw on the first row of an event, reuse for rows sharing its id.
    #[default]
    PerEvent,
    /// Draw for every row.
    PerRow,
}

/// Isotropic decay of a parent into two massless products.
///
/// The angles are drawn in the parent rest frame from a seeded generator,
/// so a run is reproducible for a given seed and input order.
pub struct TwoBodyDecay {
    rng: StdRng,
    policy: DecayPolicy,
    angles: Option<(f64, f64)>, // (cos theta, phi)
}

impl TwoBodyDecay {
    pub fn new(seed: u64, policy: DecayPolicy) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            policy,
            angles: None,
        }
    }

    fn draw(&mut self) -> (f64, f64) {
        let cos_theta = self.rng.gen_range(-1.0..=1.0);
        let phi = self.rng.gen_range(0.0..2.0 * PI);
        (cos_theta, phi)
    }

    /// Decay `parent`. `new_event` marks the first row of a logical event.
    pub fn decay(&mut self, parent: &Vec4, new_event: bool) -> Result<[Vec4; 2]> {
        let m2 = parent.m2();
        if !(m2 > 0.0) {
            bail!("cannot decay parent with m^2 = {m2}");
        }
        let fresh = match self.policy {
            DecayPolicy::PerRow => true,
            DecayPolicy::PerEvent => new_event,
        };
        let (cos_theta, phi) = match self.angles {
            Some(a) if !fresh => a,
            _ => {
                let a = self.draw();
                self.angles = Some(a);
                a
            }
        };

        let half = 0.5 * m2.sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let p = Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta) * half;
        let beta = parent.beta();
        Ok([
            Vec4::with_energy(p, half).boost(&beta),
            Vec4::with_energy(-p, half).boost(&beta),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn higgs() -> Vec4 {
        let (px, py, pz) = (40.0, -10.0, 200.0);
        let e = (125f64 * 125.0 + px * px + py * py + pz * pz).sqrt();
        Vec4::new(px, py, pz, e)
    }

    #[test]
    fn products_conserve_momentum_and_are_massless() {
        let mut d = TwoBodyDecay::new(7, DecayPolicy::PerEvent);
        let h = higgs();
        let [a, b] = d.decay(&h, true).unwrap();
        let sum = a + b;
        assert_relative_eq!(sum.momentum(), h.momentum(), epsilon = 1e-9);
        assert_relative_eq!(sum.e(), h.e(), epsilon = 1e-9);
        assert_relative_eq!(a.m2(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(b.m2(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn per_event_policy_reuses_angles_within_event() {
        let h = higgs();
        let mut d = TwoBodyDecay::new(3, DecayPolicy::PerEvent);
        let first = d.decay(&h, true).unwrap();
        let again = d.decay(&h, false).unwrap();
        assert_eq!(first, again);
        let next = d.decay(&h, true).unwrap();
        assert_ne!(first, next);
    }

    #[test]
    fn per_row_policy_always_draws() {
        let h = higgs();
        let mut d = TwoBodyDecay::new(3, DecayPolicy::PerRow);
        let first = d.decay(&h, true).unwrap();
        let again = d.decay(&h, false).unwrap();
        assert_ne!(first, again);
    }

    #[test]
    fn same_seed_same_products() {
        let h = higgs();
        let mut a = TwoBodyDecay::new(11, DecayPolicy::PerEvent);
        let mut b = TwoBodyDecay::new(11, DecayPolicy::PerEvent);
        assert_eq!(a.decay(&h, true).unwrap(), b.decay(&h, true).unwrap());
    }

    #[test]
    fn massless_parent_is_rejected() {
        let mut d = TwoBodyDecay::new(0, DecayPolicy::PerEvent);
        assert!(d.decay(&Vec4::new(0.0, 0.0, 10.0, 10.0), true).is_err());
    }
}

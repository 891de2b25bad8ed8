use nalgebra::{Vector3, Vector4};

/// Minkowski four-momentum; `x, y, z` hold the momentum and `w` the energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec4(Vector4<f64>);

impl From<Vec4> for Vector4<f64> {
    fn from(value: Vec4) -> Self {
        value.0
    }
}

impl Vec4 {
    #[inline]
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Vec4(Vector4::new(px, py, pz, e))
    }

    /// Massless vector with the given transverse momentum, pseudorapidity and azimuth.
    #[cfg(test)]
    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64) -> Self {
        Self::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh(), pt * eta.cosh())
    }

    /// Rest-frame momentum `p` with energy `e`.
    #[inline]
    pub fn with_energy(p: Vector3<f64>, e: f64) -> Self {
        Vec4(Vector4::new(p.x, p.y, p.z, e))
    }

    #[inline]
    pub fn px(&self) -> f64 {
        self.0.x
    }
    #[inline]
    pub fn py(&self) -> f64 {
        self.0.y
    }
    #[inline]
    pub fn pz(&self) -> f64 {
        self.0.z
    }
    #[inline]
    pub fn e(&self) -> f64 {
        self.0.w
    }

    #[inline]
    pub fn momentum(&self) -> Vector3<f64> {
        self.0.xyz()
    }

    #[inline]
    pub fn pt2(&self) -> f64 {
        self.0.xy().norm_squared()
    }
    #[inline]
    pub fn pt(&self) -> f64 {
        self.0.xy().norm()
    }
    #[inline]
    pub fn m2(&self) -> f64 {
        self.e() * self.e() - self.momentum().norm_squared()
    }

    /// Pseudorapidity; `±inf` along the beam axis.
    pub fn eta(&self) -> f64 {
        let p = self.momentum().norm();
        let pz = self.pz();
        if p == pz.abs() {
            return if pz >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
        }
        0.5 * ((p + pz) / (p - pz)).ln()
    }

    /// `p / E`, the velocity of this vector's rest frame.
    #[inline]
    pub fn beta(&self) -> Vector3<f64> {
        self.momentum() / self.e()
    }

    /// This vector as seen from a frame moving with `-beta`.
    pub fn boost(&self, beta: &Vector3<f64>) -> Self {
        let b2 = beta.norm_squared();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let p = self.momentum();
        let bp = beta.dot(&p);
        let p3 = p + beta * ((gamma - 1.0) * bp / b2 + gamma * self.e());
        Self::with_energy(p3, gamma * (self.e() + bp))
    }
}

impl std::ops::Add for Vec4 {
    type Output = Vec4;
    fn add(self, o: Vec4) -> Vec4 {
        Vec4(self.0 + o.0)
    }
}

/// Sort by descending transverse momentum.
pub fn sort_by_pt(v: &mut [Vec4]) {
    v.sort_by(|a, b| b.pt2().total_cmp(&a.pt2()));
}

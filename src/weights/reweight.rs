use anyhow::{Context, Result, bail};
use serde::Deserialize;
use smallvec::SmallVec;
use std::f64::consts::PI;

use super::grid::{ScaleGridSpec, ScalePair};
use crate::events::{EventChain, Field, Row, Shape};

// -------------------------------------------------------------------------------------
// Configuration
// -------------------------------------------------------------------------------------

/// One entry of the `reweighting` config array, selected by `"type"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReweightDef {
    Scale(ScaleDef),
    Fields(FieldsDef),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleDef {
    /// Stored nominal weight.
    pub weight: String,
    pub ren_fac: ScaleGridSpec,
    /// Coefficients of `ln(kr^2)^1, ln(kr^2)^2, ...`
    #[serde(default)]
    pub ren_logs: Vec<String>,
    /// Coefficients of `ln(kf^2)^1, ln(kf^2)^2, ...`
    #[serde(default)]
    pub fac_logs: Vec<String>,
    pub alphas: Option<AlphasDef>,
    /// Prefix for the variant names; defaults to `weight`.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlphasDef {
    pub field: String,
    pub power: Power,
    #[serde(default = "default_nf")]
    pub nf: u32,
}

fn default_nf() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Power {
    Fixed(u32),
    Field(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldsDef {
    pub fields: Vec<String>,
    pub names: Option<Vec<String>>,
}

// -------------------------------------------------------------------------------------
// Capability
// -------------------------------------------------------------------------------------

/// Produces a fixed list of named weights for every row.
///
/// `recompute` must be called exactly once per row, after which `value_at`
/// reads the buffer written by that call.
pub trait Reweight {
    fn weights_names(&self) -> &[String];
    fn recompute(&mut self, row: &Row<'_>) -> Result<()>;
    fn values(&self) -> &[f64];

    fn nweights(&self) -> usize {
        self.weights_names().len()
    }
    fn value_at(&self, i: usize) -> f64 {
        self.values()[i]
    }
}

/// Shortest representation that reads back to `x`, so distinct factors never
/// share a label: `0.5`, `2`, `1.4142135623730951`.
fn fmt_factor(x: f64) -> String {
    format!("{x}")
}

// -------------------------------------------------------------------------------------
// Scale variations
// -------------------------------------------------------------------------------------

#[derive(Debug)]
enum PowerSrc {
    Fixed(i32),
    Branch(Field),
}

#[derive(Debug)]
struct Alphas {
    field: Field,
    power: PowerSrc,
    beta0: f64,
}

/// Reweights a stored nominal weight to every `(ren, fac)` point:
/// `w = A(kr) * (w0 + sum_i cr_i Lr^i + sum_j cf_j Lf^j)` with `L = ln(k^2)` and
/// `A` the one-loop running of `alpha_s^power` from `mu` to `kr*mu`.
#[derive(Debug)]
pub struct ScaleReweighter {
    weight: Field,
    ren_logs: Vec<Field>,
    fac_logs: Vec<Field>,
    alphas: Option<Alphas>,
    logs: Vec<[f64; 2]>, // (Lr, Lf) per scale pair
    names: Vec<String>,
    buf: Vec<f64>,
}

impl ScaleReweighter {
    pub fn new(chain: &EventChain, def: &ScaleDef) -> Result<Self> {
        let scales: Vec<ScalePair> = def
            .ren_fac
            .expand()
            .with_context(|| format!("reweighting of \"{}\"", def.weight))?;
        let prefix = def.name.as_deref().unwrap_or(&def.weight);

        let alphas = match &def.alphas {
            None => None,
            Some(a) => {
                if a.nf > 16 {
                    bail!("alphas.nf = {} leaves no asymptotic freedom", a.nf);
                }
                let power = match &a.power {
                    Power::Fixed(n) => PowerSrc::Fixed(
                        i32::try_from(*n)
                            .with_context(|| format!("alphas.power = {n} is out of range"))?,
                    ),
                    Power::Field(b) => PowerSrc::Branch(chain.int_field(b, Shape::Row)?),
                };
                Some(Alphas {
                    field: chain.row_field(&a.field)?,
                    power,
                    beta0: (33.0 - 2.0 * a.nf as f64) / (12.0 * PI),
                })
            }
        };

        Ok(Self {
            weight: chain.row_field(&def.weight)?,
            ren_logs: def
                .ren_logs
                .iter()
                .map(|b| chain.row_field(b))
                .collect::<Result<_>>()?,
            fac_logs: def
                .fac_logs
                .iter()
                .map(|b| chain.row_field(b))
                .collect::<Result<_>>()?,
            alphas,
            logs: scales
                .iter()
                .map(|&[r, f]| [(r * r).ln(), (f * f).ln()])
                .collect(),
            names: scales
                .iter()
                .map(|&[r, f]| format!("{}:ren={},fac={}", prefix, fmt_factor(r), fmt_factor(f)))
                .collect(),
            buf: vec![0.0; scales.len()],
        })
    }
}

fn log_poly(coefs: &[f64], l: f64) -> f64 {
    let mut acc = 0.0;
    let mut lp = l;
    for &c in coefs {
        acc += c * lp;
        lp *= l;
    }
    acc
}

impl Reweight for ScaleReweighter {
    fn weights_names(&self) -> &[String] {
        &self.names
    }

    fn recompute(&mut self, row: &Row<'_>) -> Result<()> {
        let w0 = row.checked_float(self.weight)?;
        let cr: SmallVec<[f64; 4]> = self
            .ren_logs
            .iter()
            .map(|&f| row.checked_float(f))
            .collect::<Result<_>>()?;
        let cf: SmallVec<[f64; 4]> = self
            .fac_logs
            .iter()
            .map(|&f| row.checked_float(f))
            .collect::<Result<_>>()?;
        let running = match &self.alphas {
            None => None,
            Some(a) => {
                let power = match a.power {
                    PowerSrc::Fixed(n) => n,
                    PowerSrc::Branch(f) => {
                        let n = row.int(f);
                        i32::try_from(n).with_context(|| {
                            format!(
                                "alpha_s power {} in branch \"{}\" at row {} of {} is out of range",
                                n,
                                row.branch_name(f),
                                row.index(),
                                row.table().path.display()
                            )
                        })?
                    }
                };
                Some((row.checked_float(a.field)? * a.beta0, power))
            }
        };

        for (w, &[lr, lf]) in self.buf.iter_mut().zip(&self.logs) {
            let mut x = w0 + log_poly(&cr, lr) + log_poly(&cf, lf);
            if let Some((b0_as, power)) = running {
                let denom = 1.0 + b0_as * lr;
                if denom <= 0.0 {
                    bail!(
                        "alpha_s running to ln(kr^2) = {:.3} crosses the Landau pole at row {} of {}",
                        lr,
                        row.index(),
                        row.table().path.display()
                    );
                }
                x *= denom.recip().powi(power);
            }
            *w = x;
        }
        Ok(())
    }

    fn values(&self) -> &[f64] {
        &self.buf
    }
}

// -------------------------------------------------------------------------------------
// Stored alternative weights
// -------------------------------------------------------------------------------------

/// Copies stored alternative weights (e.g. PDF members) as they are.
#[derive(Debug)]
pub struct FieldsReweighter {
    fields: Vec<Field>,
    names: Vec<String>,
    buf: Vec<f64>,
}

impl FieldsReweighter {
    pub fn new(chain: &EventChain, def: &FieldsDef) -> Result<Self> {
        let names = match &def.names {
            Some(n) if n.len() != def.fields.len() => bail!(
                "fields reweighting: {} names for {} fields",
                n.len(),
                def.fields.len()
            ),
            Some(n) => n.clone(),
            None => def.fields.clone(),
        };
        Ok(Self {
            fields: def
                .fields
                .iter()
                .map(|b| chain.row_field(b))
                .collect::<Result<_>>()?,
            buf: vec![0.0; names.len()],
            names,
        })
    }
}

impl Reweight for FieldsReweighter {
    fn weights_names(&self) -> &[String] {
        &self.names
    }

    fn recompute(&mut self, row: &Row<'_>) -> Result<()> {
        for (w, &f) in self.buf.iter_mut().zip(&self.fields) {
            *w = row.checked_float(f)?;
        }
        Ok(())
    }

    fn values(&self) -> &[f64] {
        &self.buf
    }
}

// -------------------------------------------------------------------------------------
// Closed set used by the driver
// -------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum Reweighter {
    Scale(ScaleReweighter),
    Fields(FieldsReweighter),
}

impl Reweighter {
    pub fn new(chain: &EventChain, def: &ReweightDef) -> Result<Self> {
        Ok(match def {
            ReweightDef::Scale(d) => Reweighter::Scale(ScaleReweighter::new(chain, d)?),
            ReweightDef::Fields(d) => Reweighter::Fields(FieldsReweighter::new(chain, d)?),
        })
    }

    fn inner(&self) -> &dyn Reweight {
        match self {
            Reweighter::Scale(r) => r,
            Reweighter::Fields(r) => r,
        }
    }
}

impl Reweight for Reweighter {
    fn weights_names(&self) -> &[String] {
        self.inner().weights_names()
    }
    fn recompute(&mut self, row: &Row<'_>) -> Result<()> {
        match self {
            Reweighter::Scale(r) => r.recompute(row),
            Reweighter::Fields(r) => r.recompute(row),
        }
    }
    fn values(&self) -> &[f64] {
        self.inner().values()
    }
}

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::hist::SumW2;
use crate::selection::{DecayPolicy, JetDefinition};
use crate::weights::ReweightDef;

const HIGGS_MASS: f64 = 125.0;

/// Run configuration, read from the JSON file given on the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub reweighting: Vec<ReweightDef>,
    /// Baseline stored weight; first entry of the catalog.
    #[serde(default = "default_weight")]
    pub weight: String,

    #[serde(rename = "jet_R", default = "default_jet_r")]
    pub jet_r: f64,
    #[serde(default = "default_jet_pt_cut")]
    pub jet_pt_cut: f64,
    #[serde(default = "default_jet_eta_cut")]
    pub jet_eta_cut: f64,
    #[serde(default)]
    pub njets_min: usize,

    #[serde(default)]
    pub apply_photon_cuts: bool,
    #[serde(default = "default_photon_pt_cuts")]
    pub photon_pt_cuts: [f64; 2],
    #[serde(default = "default_photon_eta_gaps")]
    pub photon_eta_gaps: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub higgs_decay_seed: u64,
    #[serde(default)]
    pub decay_policy: DecayPolicy,
    #[serde(default = "default_parent_kf")]
    pub parent_kf: i64,

    #[serde(default)]
    pub sumw2: SumW2,
    /// Edges of the optional `njets` histogram.
    pub njets_edges: Option<Vec<f64>>,
    #[serde(default)]
    pub pretty_json: bool,
}

fn default_weight() -> String {
    "weight2".to_string()
}
fn default_jet_r() -> f64 {
    0.4
}
fn default_jet_pt_cut() -> f64 {
    30.0
}
fn default_jet_eta_cut() -> f64 {
    4.4
}
fn default_photon_pt_cuts() -> [f64; 2] {
    [0.35 * HIGGS_MASS, 0.25 * HIGGS_MASS]
}
fn default_photon_eta_gaps() -> Vec<(f64, Option<f64>)> {
    vec![(1.37, Some(1.52)), (2.37, None)]
}
fn default_parent_kf() -> i64 {
    25 // Higgs
}

impl Config {
    /// Parse and validate; returns the raw document too, for the run log.
    pub fn load(path: &Path) -> Result<(Self, Value)> {
        let f = File::open(path).with_context(|| format!("open config {}", path.display()))?;
        let raw: Value = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config {}", path.display()))?;
        let conf = Self::from_value(raw.clone())
            .with_context(|| format!("config {}", path.display()))?;
        Ok((conf, raw))
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        let conf: Config = serde_json::from_value(raw)?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<()> {
        if !(self.jet_r > 0.0) {
            bail!("jet_R must be positive, got {}", self.jet_r);
        }
        if !(self.jet_pt_cut >= 0.0) || !(self.jet_eta_cut >= 0.0) {
            bail!(
                "jet cuts must be non-negative, got pt {} eta {}",
                self.jet_pt_cut,
                self.jet_eta_cut
            );
        }
        for &(lo, hi) in &self.photon_eta_gaps {
            if hi.is_some_and(|hi| !(hi > lo)) {
                bail!("photon_eta_gaps: empty band [{lo}, {hi:?}]");
            }
        }
        if self.weight.is_empty() {
            bail!("weight: empty branch name");
        }
        Ok(())
    }

    pub fn jet_definition(&self) -> JetDefinition {
        JetDefinition {
            radius: self.jet_r,
            pt_cut: self.jet_pt_cut,
            eta_cut: self.jet_eta_cut,
        }
    }
}

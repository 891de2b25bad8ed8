use anyhow::{Result, bail};
use jetty::PseudoJet;
use serde::Serialize;

use super::decay::TwoBodyDecay;
use super::jets::JetDefinition;
use super::vec4::Vec4;
use crate::config::Config;
use crate::events::{EventChain, Field, Row, Shape};
use crate::weights::{Reweight, Reweighter};

/// Leading/subleading decay-product acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonCuts {
    /// Minimum pt of the leading and subleading product.
    pub pt_min: [f64; 2],
    /// Forbidden `(min, max)` bands of |eta|, both ends exclusive; `None` is open.
    pub eta_gaps: Vec<(f64, Option<f64>)>,
}

impl PhotonCuts {
    fn in_gap(&self, abs_eta: f64) -> bool {
        self.eta_gaps
            .iter()
            .any(|&(lo, hi)| lo < abs_eta && hi.is_none_or(|hi| abs_eta < hi))
    }

    /// Orders the pair by descending pt, then applies the cuts.
    pub fn pass(&self, photons: &mut [Vec4; 2]) -> bool {
        if photons[0].pt2() < photons[1].pt2() {
            photons.swap(0, 1);
        }
        photons
            .iter()
            .zip(self.pt_min)
            .all(|(p, min)| !(p.pt() < min) && !self.in_gap(p.eta().abs()))
    }
}

/// Run-level counters written as `N` in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub entries: u64,
    pub events: u64,
    pub count: u64,
}

/// Cross-row state owned by the driver.
#[derive(Debug)]
pub struct PipelineState {
    pub previous_id: Option<i64>,
    /// Per-row weight vector, one slot per catalog entry.
    pub weights: Vec<f64>,
    pub counts: RunCounts,
    jets: Vec<Vec4>,
}

impl PipelineState {
    pub fn new(width: usize) -> Self {
        Self {
            previous_id: None,
            weights: vec![0.0; width],
            counts: RunCounts::default(),
            jets: Vec::new(),
        }
    }

    /// Count the row; returns whether it opens a new logical event.
    pub fn observe(&mut self, id: i64, ncount: Option<i64>) -> Result<bool> {
        self.counts.entries += 1;
        if self.previous_id == Some(id) {
            return Ok(false);
        }
        self.previous_id = Some(id);
        let n = ncount.unwrap_or(1);
        if n < 1 {
            bail!("ncount must be at least 1, got {n} for event id {id}");
        }
        self.counts.events += 1;
        self.counts.count += n as u64;
        Ok(true)
    }
}

/// Observables of a row that passed the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observables {
    pub id: i64,
    pub njets: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Fill(Observables),
    Skip,
}

/// Branches the selection reads from every row.
#[derive(Debug, Clone, Copy)]
struct Branches {
    id: Field,
    kf: Field,
    px: Field,
    py: Field,
    pz: Field,
    e: Field,
    weight: Field,
    ncount: Option<Field>,
}

impl Branches {
    fn bind(chain: &EventChain, weight: &str) -> Result<Self> {
        Ok(Self {
            id: chain.int_field("id", Shape::Row)?,
            kf: chain.int_field("kf", Shape::Particle)?,
            px: chain.particle_field("px")?,
            py: chain.particle_field("py")?,
            pz: chain.particle_field("pz")?,
            e: chain.particle_field("E")?,
            weight: chain.row_field(weight)?,
            ncount: if chain.has("ncount") {
                Some(chain.int_field("ncount", Shape::Row)?)
            } else {
                None
            },
        })
    }
}

/// Per-row selection: parent lookup, optional decay cuts, jets, weights.
pub struct Selection {
    branches: Branches,
    parent_kf: i64,
    photon_cuts: Option<PhotonCuts>,
    decay: TwoBodyDecay,
    jet_def: JetDefinition,
    njets_min: usize,
    reweighters: Vec<Reweighter>,
}

impl Selection {
    pub fn new(chain: &EventChain, conf: &Config, reweighters: Vec<Reweighter>) -> Result<Self> {
        Ok(Self {
            branches: Branches::bind(chain, &conf.weight)?,
            parent_kf: conf.parent_kf,
            photon_cuts: conf.apply_photon_cuts.then(|| PhotonCuts {
                pt_min: conf.photon_pt_cuts,
                eta_gaps: conf.photon_eta_gaps.clone(),
            }),
            decay: TwoBodyDecay::new(conf.higgs_decay_seed, conf.decay_policy),
            jet_def: conf.jet_definition(),
            njets_min: conf.njets_min,
            reweighters,
        })
    }

    pub fn jet_definition(&self) -> &JetDefinition {
        &self.jet_def
    }

    /// Run one row through the selection. Errors abort the whole run.
    pub fn process(&mut self, row: &Row<'_>, state: &mut PipelineState) -> Result<Outcome> {
        let b = self.branches;
        let id = row.int(b.id);
        let new_event = state.observe(id, b.ncount.map(|f| row.int(f)))?;

        // four-momenta
        let mut parent: Option<Vec4> = None;
        let mut partons: Vec<PseudoJet> = Vec::with_capacity(row.n_particles());
        for i in 0..row.n_particles() {
            let p = Vec4::new(
                row.particle_float(b.px, i),
                row.particle_float(b.py, i),
                row.particle_float(b.pz, i),
                row.particle_float(b.e, i),
            );
            if row.particle_int(b.kf, i) == self.parent_kf {
                if parent.is_some() {
                    bail!(
                        "event {} has more than one particle with kf == {} (row {} of {})",
                        id,
                        self.parent_kf,
                        row.index(),
                        row.table().path.display()
                    );
                }
                parent = Some(p);
            } else {
                partons.push(JetDefinition::pseudojet(&p));
            }
        }
        let Some(parent) = parent else {
            bail!(
                "event {} without parent particle (kf == {}) at row {} of {}",
                id,
                self.parent_kf,
                row.index(),
                row.table().path.display()
            );
        };

        if let Some(cuts) = &self.photon_cuts {
            let mut photons = self.decay.decay(&parent, new_event)?;
            if !cuts.pass(&mut photons) {
                return Ok(Outcome::Skip);
            }
        }

        self.jet_def.jets(partons, &mut state.jets);
        let njets = state.jets.len();

        // weights: baseline first, then every reweighter in catalog order
        let mut w = 0;
        state.weights[w] = row.checked_float(b.weight)?;
        w += 1;
        for rew in &mut self.reweighters {
            rew.recompute(row)?;
            for i in 0..rew.nweights() {
                state.weights[w] = rew.value_at(i);
                w += 1;
            }
        }
        debug_assert_eq!(w, state.weights.len());

        if njets < self.njets_min {
            return Ok(Outcome::Skip);
        }
        Ok(Outcome::Fill(Observables { id, njets }))
    }
}

use serde_json::{Map, Value, json};

use super::axis::Axis;
use super::bin::{MultiBin, SumW2};
use crate::selection::Observables;
use crate::weights::WeightCatalog;

/// Which quantity of a selected row picks the bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    /// Constant; pairs with [`Axis::Single`].
    Total,
    NJets,
}

impl Observable {
    fn value(self, obs: &Observables) -> f64 {
        match self {
            Observable::Total => 0.0,
            Observable::NJets => obs.njets as f64,
        }
    }
}

#[derive(Debug)]
pub struct Histogram {
    axis: Axis,
    observable: Observable,
    bins: Vec<MultiBin>,
}

impl Histogram {
    /// Bins are sized from the catalog, which must already be sealed.
    pub fn new(axis: Axis, observable: Observable, catalog: &WeightCatalog, mode: SumW2) -> Self {
        let width = catalog.width();
        let bins = (0..axis.bin_count())
            .map(|_| MultiBin::new(width, mode))
            .collect();
        Self {
            axis,
            observable,
            bins,
        }
    }

    pub fn fill(&mut self, obs: &Observables, weights: &[f64]) {
        let i = self.axis.bin_index(self.observable.value(obs));
        self.bins[i].fill_event(weights, obs.id);
    }

    pub fn finalize(&mut self) {
        for bin in &mut self.bins {
            bin.finalize();
        }
    }

    pub fn bins(&self) -> &[MultiBin] {
        &self.bins
    }
}

/// Named histograms sharing one weight catalog.
#[derive(Debug)]
pub struct HistogramSet {
    weights: Vec<String>,
    hists: Vec<(String, Histogram)>,
}

impl HistogramSet {
    pub fn new(catalog: &WeightCatalog) -> Self {
        Self {
            weights: catalog.names().to_vec(),
            hists: Vec::new(),
        }
    }

    pub fn add(&mut self, name: &str, hist: Histogram) {
        assert!(
            self.get(name).is_none(),
            "histogram \"{name}\" defined twice"
        );
        self.hists.push((name.to_string(), hist));
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.hists.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    pub fn fill(&mut self, obs: &Observables, weights: &[f64]) {
        for (_, h) in &mut self.hists {
            h.fill(obs, weights);
        }
    }

    pub fn finalize(&mut self) {
        for (_, h) in &mut self.hists {
            h.finalize();
        }
    }

    /// `{name: {axes, weights, bins}, ...}`
    pub fn to_json(&self) -> Map<String, Value> {
        self.hists
            .iter()
            .map(|(name, h)| {
                (
                    name.clone(),
                    json!({
                        "axes": [h.axis.describe()],
                        "weights": self.weights,
                        "bins": h.bins,
                    }),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> WeightCatalog {
        let mut c = WeightCatalog::new(names[0]);
        for n in &names[1..] {
            c.register(n);
        }
        c.seal();
        c
    }

    #[test]
    fn njets_routes_to_edge_bins() {
        let cat = catalog(&["w"]);
        let mut h = Histogram::new(
            Axis::edges(vec![0.0, 1.0, 2.0]).unwrap(),
            Observable::NJets,
            &cat,
            SumW2::Row,
        );
        for (id, njets) in [(1, 0), (2, 1), (3, 1), (4, 5)] {
            h.fill(&Observables { id, njets }, &[1.0]);
        }
        h.finalize();
        let n: Vec<u64> = h.bins().iter().map(|b| b.n_entries()).collect();
        assert_eq!(n, vec![0, 1, 2, 1]);
    }

    #[test]
    #[should_panic(expected = "before it was sealed")]
    fn unsealed_catalog_cannot_size_bins() {
        let cat = WeightCatalog::new("w");
        Histogram::new(Axis::Single, Observable::Total, &cat, SumW2::Row);
    }

    #[test]
    fn json_layout() {
        let cat = catalog(&["w", "a"]);
        let mut set = HistogramSet::new(&cat);
        set.add(
            "total",
            Histogram::new(Axis::Single, Observable::Total, &cat, SumW2::Row),
        );
        set.fill(&Observables { id: 1, njets: 2 }, &[1.0, 0.5]);
        set.finalize();
        let j = Value::Object(set.to_json());
        assert_eq!(j["total"]["axes"], json!([null]));
        assert_eq!(j["total"]["weights"], json!(["w", "a"]));
        assert_eq!(j["total"]["bins"][0]["w"], json!([1.0, 0.5]));
        assert_eq!(j["total"]["bins"][0]["nent"], json!(1));
    }
}

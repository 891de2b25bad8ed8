use serde::{Deserialize, Serialize};

/// How `sum_w2` treats rows that share an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SumW2 {
    /// Every fill is squared on its own.
    #[default]
    Row,
    /// Rows of one logical event are summed before squaring.
    Event,
}

/// Histogram bin with one `(sum_w, sum_w2, n)` triple per catalog weight.
#[derive(Debug, Clone, Serialize)]
pub struct MultiBin {
    #[serde(rename = "w")]
    sum_w: Vec<f64>,
    #[serde(rename = "w2")]
    sum_w2: Vec<f64>,
    n: Vec<u64>,
    mean: Vec<f64>,
    #[serde(rename = "nent")]
    n_entries: u64,

    #[serde(skip)]
    mode: SumW2,
    #[serde(skip)]
    pending: Vec<f64>,
    #[serde(skip)]
    pending_id: Option<i64>,
    #[serde(skip)]
    finalized: bool,
}

impl MultiBin {
    pub fn new(width: usize, mode: SumW2) -> Self {
        Self {
            sum_w: vec![0.0; width],
            sum_w2: vec![0.0; width],
            n: vec![0; width],
            mean: vec![0.0; width],
            n_entries: 0,
            mode,
            pending: match mode {
                SumW2::Row => Vec::new(),
                SumW2::Event => vec![0.0; width],
            },
            pending_id: None,
            finalized: false,
        }
    }

    #[inline]
    fn check(&self, weights: &[f64]) {
        assert!(!self.finalized, "fill of a finalized bin");
        assert_eq!(
            weights.len(),
            self.sum_w.len(),
            "weight vector length does not match the catalog"
        );
    }

    /// Add one row, squaring each weight on its own.
    pub fn fill(&mut self, weights: &[f64]) {
        self.check(weights);
        for (i, &w) in weights.iter().enumerate() {
            self.sum_w[i] += w;
            self.sum_w2[i] += w * w;
            self.n[i] += 1;
        }
        self.n_entries += 1;
    }

    /// Add one row of event `id`; honours the bin's [`SumW2`] mode.
    pub fn fill_event(&mut self, weights: &[f64], id: i64) {
        if self.mode == SumW2::Row {
            return self.fill(weights);
        }
        self.check(weights);
        if self.pending_id != Some(id) {
            self.flush();
            self.pending_id = Some(id);
        }
        for (i, &w) in weights.iter().enumerate() {
            self.sum_w[i] += w;
            self.pending[i] += w;
        }
        self.n_entries += 1;
    }

    fn flush(&mut self) {
        if self.pending_id.take().is_none() {
            return;
        }
        for (i, p) in self.pending.iter_mut().enumerate() {
            self.sum_w2[i] += *p * *p;
            self.n[i] += 1;
            *p = 0.0;
        }
    }

    fn compute_derived(&mut self) {
        for ((m, &w), &n) in self.mean.iter_mut().zip(&self.sum_w).zip(&self.n) {
            *m = if n > 0 { w / n as f64 } else { 0.0 };
        }
    }

    /// Close the bin. Called once, after the last fill.
    pub fn finalize(&mut self) {
        assert!(!self.finalized, "bin finalized twice");
        self.flush();
        self.compute_derived();
        self.finalized = true;
    }

    pub fn sum_w(&self) -> &[f64] {
        &self.sum_w
    }
    pub fn sum_w2(&self) -> &[f64] {
        &self.sum_w2
    }
    pub fn n_filled(&self) -> &[u64] {
        &self.n
    }
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }
    pub fn n_entries(&self) -> u64 {
        self.n_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fill_two_weights() {
        let mut b = MultiBin::new(2, SumW2::Row);
        b.fill(&[1.0, 2.0]);
        b.finalize();
        assert_eq!(b.sum_w(), [1.0, 2.0]);
        assert_eq!(b.n_filled(), [1, 1]);
        assert_eq!(b.mean(), [1.0, 2.0]);
        assert_eq!(b.n_entries(), 1);
    }

    #[test]
    fn two_fills_accumulate_squares() {
        let mut b = MultiBin::new(1, SumW2::Row);
        b.fill(&[1.0]);
        b.fill(&[3.0]);
        b.finalize();
        assert_eq!(b.sum_w(), [4.0]);
        assert_eq!(b.sum_w2(), [10.0]);
        assert_eq!(b.n_filled(), [2]);
        assert_eq!(b.mean(), [2.0]);
    }

    #[test]
    fn empty_bin_has_zero_mean() {
        let mut b = MultiBin::new(3, SumW2::Row);
        b.finalize();
        assert_eq!(b.mean(), [0.0, 0.0, 0.0]);
        assert_eq!(b.n_entries(), 0);
    }

    #[test]
    fn derived_statistics_are_idempotent() {
        let mut b = MultiBin::new(2, SumW2::Event);
        b.fill_event(&[1.0, 2.0], 1);
        b.fill_event(&[3.0, 4.0], 1);
        b.finalize();
        let before = (b.sum_w2().to_vec(), b.n_filled().to_vec(), b.mean().to_vec());
        b.flush();
        b.compute_derived();
        let after = (b.sum_w2().to_vec(), b.n_filled().to_vec(), b.mean().to_vec());
        assert_eq!(before, after);
    }

    #[test]
    fn event_mode_squares_event_sums() {
        let mut b = MultiBin::new(1, SumW2::Event);
        b.fill_event(&[1.0], 7);
        b.fill_event(&[2.0], 7);
        b.fill_event(&[-1.0], 8);
        b.finalize();
        assert_eq!(b.sum_w(), [2.0]);
        assert_eq!(b.sum_w2(), [9.0 + 1.0]);
        assert_eq!(b.n_filled(), [2]);
        assert_eq!(b.n_entries(), 3);
    }

    #[test]
    fn row_mode_ignores_event_id() {
        let mut b = MultiBin::new(1, SumW2::Row);
        b.fill_event(&[1.0], 7);
        b.fill_event(&[2.0], 7);
        b.finalize();
        assert_eq!(b.sum_w2(), [5.0]);
        assert_eq!(b.n_filled(), [2]);
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn fill_after_finalize_panics() {
        let mut b = MultiBin::new(1, SumW2::Row);
        b.finalize();
        b.fill(&[1.0]);
    }

    #[test]
    #[should_panic(expected = "does not match the catalog")]
    fn width_mismatch_panics() {
        let mut b = MultiBin::new(2, SumW2::Row);
        b.fill(&[1.0]);
    }

    #[test]
    fn serializes_statistics_only() {
        let mut b = MultiBin::new(1, SumW2::Row);
        b.fill(&[2.0]);
        b.finalize();
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"w":[2.0],"w2":[4.0],"n":[1],"mean":[2.0],"nent":1})
        );
    }
}

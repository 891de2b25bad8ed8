use jetty::{PseudoJet, anti_kt_f, cluster_if};

use super::vec4::{Vec4, sort_by_pt};

/// Anti-kt clustering plus the jet acceptance cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetDefinition {
    pub radius: f64,
    pub pt_cut: f64,
    pub eta_cut: f64,
}

impl JetDefinition {
    pub fn description(&self) -> String {
        format!(
            "anti-kt R={} | pt >= {} GeV, |eta| <= {}",
            self.radius, self.pt_cut, self.eta_cut
        )
    }

    pub fn pseudojet(p: &Vec4) -> PseudoJet {
        [p.e(), p.px(), p.py(), p.pz()].into()
    }

    /// Cluster `partons` and return the jets passing both cuts, hardest first.
    pub fn jets(&self, partons: Vec<PseudoJet>, out: &mut Vec<Vec4>) {
        out.clear();
        if partons.is_empty() {
            return;
        }
        let minpt2 = self.pt_cut * self.pt_cut;
        let clustered = cluster_if(partons, &anti_kt_f(self.radius), |jet| {
            f64::from(jet.pt2()) >= minpt2
        });
        out.extend(clustered.iter().map(|j| {
            Vec4::new(
                f64::from(j.px()),
                f64::from(j.py()),
                f64::from(j.pz()),
                f64::from(j.e()),
            )
        }));
        self.apply_cuts(out);
    }

    /// Drop jets below `pt_cut` or beyond `eta_cut`, then sort by descending pt.
    pub fn apply_cuts(&self, jets: &mut Vec<Vec4>) {
        jets.retain(|j| !(j.pt() < self.pt_cut) && !(j.eta().abs() > self.eta_cut));
        sort_by_pt(jets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> JetDefinition {
        JetDefinition {
            radius: 0.4,
            pt_cut: 30.0,
            eta_cut: 4.4,
        }
    }

    #[test]
    fn cuts_then_descending_pt() {
        let mut jets: Vec<Vec4> = [10.0, 50.0, 30.0, 80.0]
            .iter()
            .map(|&pt| Vec4::from_pt_eta_phi(pt, 0.5, 1.0))
            .collect();
        jets.push(Vec4::from_pt_eta_phi(100.0, 4.6, 0.0));
        def().apply_cuts(&mut jets);
        let pts: Vec<f64> = jets.iter().map(|j| j.pt().round()).collect();
        assert_eq!(pts, vec![80.0, 50.0, 30.0]);
    }

    #[test]
    fn sort_only_keeps_every_jet() {
        let loose = JetDefinition {
            pt_cut: 0.0,
            ..def()
        };
        let mut jets: Vec<Vec4> = [10.0, 50.0, 30.0]
            .iter()
            .map(|&pt| Vec4::from_pt_eta_phi(pt, 0.0, 0.0))
            .collect();
        loose.apply_cuts(&mut jets);
        let pts: Vec<f64> = jets.iter().map(|j| j.pt().round()).collect();
        assert_eq!(pts, vec![50.0, 30.0, 10.0]);
    }

    #[test]
    fn separated_partons_become_separate_jets() {
        let partons = vec![
            JetDefinition::pseudojet(&Vec4::from_pt_eta_phi(60.0, 0.0, 0.0)),
            JetDefinition::pseudojet(&Vec4::from_pt_eta_phi(40.0, 0.0, 3.0)),
            JetDefinition::pseudojet(&Vec4::from_pt_eta_phi(10.0, 1.0, 1.5)),
        ];
        let mut jets = Vec::new();
        def().jets(partons, &mut jets);
        assert_eq!(jets.len(), 2);
        assert!((jets[0].pt() - 60.0).abs() < 1e-6);
        assert!((jets[1].pt() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn nearby_partons_merge() {
        let partons = vec![
            JetDefinition::pseudojet(&Vec4::from_pt_eta_phi(30.0, 0.0, 0.0)),
            JetDefinition::pseudojet(&Vec4::from_pt_eta_phi(20.0, 0.1, 0.1)),
        ];
        let mut jets = Vec::new();
        def().jets(partons, &mut jets);
        assert_eq!(jets.len(), 1);
        assert!(jets[0].pt() > 49.0);
    }
}

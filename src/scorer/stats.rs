use super::{Moment, Scorer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one parameter within one group. Variance is the sample variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamStats {
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub n: usize,
}

impl ParamStats {
    pub fn from_moment(m: &Moment) -> Option<Self> {
        let mean = m.mean()?;
        let variance = m.sample_variance()?;
        Some(Self {
            mean,
            variance,
            std: variance.sqrt(),
            n: m.n,
        })
    }
}

/// Per-group map of parameter -> stats. A parameter with no values in a group
/// is left out of that group's map.
pub fn group_stats(scorer: &Scorer, labels: &[usize]) -> Vec<BTreeMap<String, ParamStats>> {
    let moments = scorer.moments(labels);
    let mut out = vec![BTreeMap::new(); scorer.groups()];
    for (p, name) in scorer.params().iter().enumerate() {
        for (g, cell) in moments.param(p).iter().enumerate() {
            if let Some(stats) = ParamStats::from_moment(cell) {
                out[g].insert(name.clone(), stats);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{Cohort, Subject};
    use crate::config::Normalization;

    #[test]
    fn test_group_stats_skip_empty_cells() {
        let cohort = Cohort::from_subjects(vec![
            Subject::new("a").with("weight", 20.0).with("intake", 3.0),
            Subject::new("b").with("weight", 22.0),
            Subject::new("c").with("weight", 18.0),
        ])
        .unwrap();
        let scorer = Scorer::new(&cohort, 2, Normalization::Raw).unwrap();
        let stats = group_stats(&scorer, &[0, 0, 1]);

        let w0 = stats[0]["weight"];
        assert_eq!(w0.n, 2);
        assert!((w0.mean - 21.0).abs() < 1e-12);
        assert!((w0.variance - 2.0).abs() < 1e-12);
        assert!(stats[1].get("intake").is_none());
        assert_eq!(stats[1]["weight"].variance, 0.0);
    }
}

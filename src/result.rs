use crate::cohort::Cohort;
use crate::config::Normalization;
use crate::groups::{GroupSpec, LayeringSpec, ResolvedGroups};
use crate::scorer::stats::{group_stats, ParamStats};
use crate::scorer::Scorer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::Display;

/// Everything needed to rebuild the scorer for a stored result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsSnapshot {
    pub cohort: Cohort,
    pub layering: LayeringSpec,
    pub group_spec: GroupSpec,
    pub groups: ResolvedGroups,
    pub normalization: Normalization,
    pub bins: usize,
}

impl InputsSnapshot {
    pub fn scorer(&self) -> crate::error::GfResult<Scorer> {
        Scorer::new(&self.cohort, self.groups.len(), self.normalization)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultOrigin {
    TrialSearch,
    FineTune,
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage: Option<String>,
    pub size: usize,
    pub members: Vec<String>,
    pub stats: BTreeMap<String, ParamStats>,
}

/// An immutable grouping. Fine-tuning produces a new result with a new id;
/// the inputs snapshot is shared with the parent rather than copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub origin: ResultOrigin,
    /// Group index per subject, in cohort order.
    pub labels: Arc<Vec<usize>>,
    pub groups: Vec<GroupSummary>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trial_scores: Vec<f64>,
    pub inputs: Arc<InputsSnapshot>,
}

impl GroupingResult {
    pub fn build(
        id: String,
        origin: ResultOrigin,
        parent_id: Option<String>,
        labels: Vec<usize>,
        scorer: &Scorer,
        inputs: Arc<InputsSnapshot>,
    ) -> Self {
        let score = scorer.score(&labels);
        let stats = group_stats(scorer, &labels);
        let subjects = inputs.cohort.subjects();

        let groups = stats
            .into_iter()
            .enumerate()
            .map(|(g, stats)| {
                let members: Vec<String> = labels
                    .iter()
                    .enumerate()
                    .filter(|(_, &l)| l == g)
                    .map(|(s, _)| subjects[s].id.clone())
                    .collect();
                GroupSummary {
                    name: inputs.groups.names[g].clone(),
                    cage: inputs.groups.cages[g].clone(),
                    size: members.len(),
                    members,
                    stats,
                }
            })
            .collect();

        Self {
            id,
            parent_id,
            origin,
            labels: Arc::new(labels),
            groups,
            score,
            trial_scores: Vec::new(),
            inputs,
        }
    }

    pub fn with_trial_scores(mut self, scores: Vec<f64>) -> Self {
        self.trial_scores = scores;
        self
    }

    /// Subject id -> group name.
    pub fn assignment(&self) -> BTreeMap<&str, &str> {
        self.inputs
            .cohort
            .subjects()
            .iter()
            .zip(self.labels.iter())
            .map(|(s, &g)| (s.id.as_str(), self.groups[g].name.as_str()))
            .collect()
    }

    pub fn group_of(&self, subject_id: &str) -> Option<&str> {
        let idx = self
            .inputs
            .cohort
            .subjects()
            .iter()
            .position(|s| s.id == subject_id)?;
        Some(self.groups[self.labels[idx]].name.as_str())
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.size).collect()
    }
}

/// One point of a convergence trace: a simulation step for the basic tuner,
/// a candidate sample size for the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub step: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendLog(Vec<TrendEntry>);

impl TrendLog {
    pub fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    pub fn push(&mut self, entry: TrendEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[TrendEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TrendEntry> for TrendLog {
    fn from_iter<I: IntoIterator<Item = TrendEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningStats {
    pub original_variance: f64,
    pub final_variance: f64,
    pub improvement: f64,
}

impl TuningStats {
    pub fn new(original: f64, final_score: f64) -> Self {
        Self {
            original_variance: original,
            final_variance: final_score,
            improvement: original - final_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepStats {
    pub best_sample_size: usize,
    pub original_variance: f64,
    pub min_variance: f64,
    pub improvement: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Subject;

    fn sample() -> GroupingResult {
        let cohort = Cohort::from_subjects(vec![
            Subject::new("A1").with("weight", 20.0),
            Subject::new("A2").with("weight", 22.0),
            Subject::new("A3").with("weight", 21.0),
        ])
        .unwrap();
        let spec = GroupSpec::custom(vec![2, 1]).with_names(["ctrl", "dose"]);
        let groups = spec.resolve(3).unwrap();
        let inputs = Arc::new(InputsSnapshot {
            cohort,
            layering: LayeringSpec::new(["weight"]),
            group_spec: spec,
            groups,
            normalization: Normalization::Raw,
            bins: 5,
        });
        let scorer = inputs.scorer().unwrap();
        GroupingResult::build(
            "ABC123".into(),
            ResultOrigin::TrialSearch,
            None,
            vec![0, 1, 0],
            &scorer,
            inputs,
        )
    }

    #[test]
    fn test_summary_and_lookup() {
        let r = sample();
        assert_eq!(r.sizes(), vec![2, 1]);
        assert_eq!(r.groups[0].members, vec!["A1", "A3"]);
        assert_eq!(r.group_of("A2"), Some("dose"));
        assert_eq!(r.group_of("Z9"), None);
        assert_eq!(r.assignment().len(), 3);
        assert!((r.groups[0].stats["weight"].mean - 20.5).abs() < 1e-12);
    }

    #[test]
    fn test_json_round_trip_preserves_result() {
        let r = sample();
        let json = serde_json::to_string(&r).unwrap();
        let back: GroupingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(json.contains("\"origin\":\"trial_search\""));
    }
}

pub mod moments;
pub mod stats;

pub use self::moments::{GroupMoments, Moment};
pub use self::stats::ParamStats;

use crate::cohort::{Cohort, ColumnKind};
use crate::config::Normalization;
use crate::error::{GfResult, GroupingError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Score contribution of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamScore {
    pub param: String,
    pub between: f64,
    pub within: f64,
}

impl ParamScore {
    pub fn total(&self) -> f64 {
        self.between + self.within
    }
}

/// Balance score of an assignment; lower is better.
///
/// For every scored parameter: the sample variance of the group means plus the
/// mean of the within-group population variances, summed over parameters.
/// With k equally sized groups this is a constant plus
/// `SS_between * (1/(k-1) - 1/k) / n`, so the score falls exactly as the group
/// means draw together, whatever the group size. Under
/// [`Normalization::Standardized`] each parameter's pair of terms is divided by
/// that parameter's variance over the whole cohort.
#[derive(Debug, Clone)]
pub struct Scorer {
    params: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
    scales: Vec<f64>,
    groups: usize,
    normalization: Normalization,
}

impl Scorer {
    /// Scores every numeric column of the cohort.
    pub fn new(cohort: &Cohort, groups: usize, normalization: Normalization) -> GfResult<Self> {
        Self::with_params(cohort, &cohort.numeric_columns(), groups, normalization)
    }

    pub fn with_params(
        cohort: &Cohort,
        params: &[String],
        groups: usize,
        normalization: Normalization,
    ) -> GfResult<Self> {
        if groups == 0 {
            return Err(GroupingError::validation("scorer needs at least one group"));
        }
        for p in params {
            match cohort.column_kind(p) {
                Some(ColumnKind::Numeric) | Some(ColumnKind::Empty) => {}
                Some(ColumnKind::Text) => {
                    return Err(GroupingError::Validation(format!(
                        "scored parameter '{}' is not numeric",
                        p
                    )))
                }
                None => {
                    return Err(GroupingError::Validation(format!(
                        "scored parameter '{}' is not a column of the data",
                        p
                    )))
                }
            }
        }

        let values: Vec<Vec<Option<f64>>> =
            params.iter().map(|p| cohort.numeric_values(p)).collect();

        let scales = values
            .iter()
            .map(|column| match normalization {
                Normalization::Raw => 1.0,
                Normalization::Standardized => {
                    let mut m = Moment::default();
                    column.iter().flatten().for_each(|&x| m.add(x));
                    match m.sample_variance() {
                        Some(v) if v > 0.0 => 1.0 / v,
                        _ => 0.0,
                    }
                }
            })
            .collect();

        debug!(
            "Scorer: {} parameters, {} groups, {} normalization",
            params.len(),
            groups,
            normalization
        );

        Ok(Self {
            params: params.to_vec(),
            values,
            scales,
            groups,
            normalization,
        })
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn subjects(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn values(&self) -> &[Vec<Option<f64>>] {
        &self.values
    }

    pub fn moments(&self, labels: &[usize]) -> GroupMoments {
        GroupMoments::build(&self.values, labels, self.groups)
    }

    /// Full scoring pass from scratch.
    pub fn score(&self, labels: &[usize]) -> f64 {
        self.score_moments(&self.moments(labels))
    }

    pub fn score_moments(&self, moments: &GroupMoments) -> f64 {
        (0..self.params.len())
            .map(|p| {
                let (between, within) = param_terms(moments.param(p));
                (between + within) * self.scales[p]
            })
            .sum()
    }

    /// Per-parameter terms, already scaled by the normalization policy.
    pub fn breakdown(&self, labels: &[usize]) -> Vec<ParamScore> {
        let moments = self.moments(labels);
        self.params
            .iter()
            .enumerate()
            .map(|(p, name)| {
                let (between, within) = param_terms(moments.param(p));
                ParamScore {
                    param: name.clone(),
                    between: between * self.scales[p],
                    within: within * self.scales[p],
                }
            })
            .collect()
    }

    /// Applies `(subject, from, to)` moves to a moment table.
    #[inline(always)]
    pub fn apply_moves(&self, moments: &mut GroupMoments, moves: &[(usize, usize, usize)]) {
        for &(subject, from, to) in moves {
            moments.relabel(&self.values, subject, from, to);
        }
    }
}

/// (sample variance of group means, mean of within-group population variances)
/// over the groups that hold at least one value. A lone group contributes 0.
fn param_terms(cells: &[Moment]) -> (f64, f64) {
    let mut means = Moment::default();
    let mut within_sum = 0.0;
    let mut populated = 0usize;

    for cell in cells {
        if let (Some(mean), Some(var)) = (cell.mean(), cell.population_variance()) {
            means.add(mean);
            within_sum += var;
            populated += 1;
        }
    }

    if populated == 0 {
        return (0.0, 0.0);
    }
    let between = means.sample_variance().unwrap_or(0.0);
    (between, within_sum / populated as f64)
}

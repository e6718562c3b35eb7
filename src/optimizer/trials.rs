use super::{assignment, try_best_of};
use crate::error::{GfResult, GroupingError};
use crate::scorer::Scorer;
use crate::strata::Strata;
use fastrand::Rng;
use tracing::{debug, info};

/// Best of `trials` independent stratified random assignments.
pub struct TrialSearch<'a> {
    scorer: &'a Scorer,
    strata: &'a Strata,
    sizes: &'a [usize],
    trials: usize,
}

#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub labels: Vec<usize>,
    pub score: f64,
    pub best_trial: usize,
    /// Score of every trial in draw order.
    pub trial_scores: Vec<f64>,
}

impl<'a> TrialSearch<'a> {
    pub fn new(scorer: &'a Scorer, strata: &'a Strata, sizes: &'a [usize], trials: usize) -> Self {
        Self {
            scorer,
            strata,
            sizes,
            trials,
        }
    }

    pub fn run(&self, rng: &mut Rng) -> GfResult<TrialOutcome> {
        if self.trials == 0 {
            return Err(GroupingError::validation("trial count must be at least 1"));
        }
        if self.strata.len() < self.sizes.len() {
            return Err(GroupingError::DegenerateInput {
                subjects: self.strata.len(),
                groups: self.sizes.len(),
            });
        }

        let best = try_best_of(
            self.trials,
            |i| {
                let labels = assignment::assign(self.strata, self.sizes, rng)?;
                debug!("Trial {} drawn", i + 1);
                Ok::<_, GroupingError>(labels)
            },
            |labels| self.scorer.score(labels),
        )?
        .ok_or_else(|| GroupingError::validation("trial search produced no candidate"))?;

        info!(
            "Trial search: best score {:.4} from trial {} of {}",
            best.score,
            best.index + 1,
            self.trials
        );

        Ok(TrialOutcome {
            labels: best.best,
            score: best.score,
            best_trial: best.index,
            trial_scores: best.scores,
        })
    }
}

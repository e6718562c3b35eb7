use super::SearchState;
use crate::config::TuningParams;
use crate::error::{GfResult, GroupingError};
use crate::result::{TrendEntry, TrendLog, TuningStats};
use crate::scorer::Scorer;
use fastrand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FineTuneOptions {
    pub simulations: usize,
    pub min_extract: usize,
    pub max_extract: usize,
    pub candidates_per_step: usize,
}

impl From<&TuningParams> for FineTuneOptions {
    fn from(p: &TuningParams) -> Self {
        Self {
            simulations: p.simulations,
            min_extract: p.min_extract,
            max_extract: p.max_extract,
            candidates_per_step: p.candidates_per_step,
        }
    }
}

impl FineTuneOptions {
    pub fn validate(&self, subjects: usize) -> GfResult<()> {
        if self.simulations == 0 {
            return Err(GroupingError::validation("simulations must be at least 1"));
        }
        if self.min_extract == 0 {
            return Err(GroupingError::validation("min_extract must be at least 1"));
        }
        if self.min_extract > self.max_extract {
            return Err(GroupingError::Validation(format!(
                "min_extract ({}) exceeds max_extract ({})",
                self.min_extract, self.max_extract
            )));
        }
        if self.min_extract > subjects {
            return Err(GroupingError::Validation(format!(
                "min_extract ({}) exceeds subject count ({})",
                self.min_extract, subjects
            )));
        }
        if self.candidates_per_step == 0 {
            return Err(GroupingError::validation(
                "candidates_per_step must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TuneOutcome {
    pub labels: Vec<usize>,
    pub trend: TrendLog,
    pub stats: TuningStats,
    pub accepted: usize,
}

/// Extract-and-reassign hill climbing from an existing labelling.
///
/// Every simulation draws an extract count uniformly from
/// `[min_extract, max_extract]` (capped at the cohort size) and logs the
/// score after the step.
pub fn fine_tune(
    scorer: &Scorer,
    labels: &[usize],
    opts: &FineTuneOptions,
    rng: &mut Rng,
) -> GfResult<TuneOutcome> {
    let subjects = labels.len();
    opts.validate(subjects)?;

    let original = scorer.score(labels);
    let hi = opts.max_extract.min(subjects);
    let lo = opts.min_extract.min(hi);

    info!(
        "Fine-tuning: {} simulations, extract {}..={}, start {:.4}",
        opts.simulations, lo, hi, original
    );

    let mut state = SearchState::new(scorer, labels.to_vec());
    let mut trend = TrendLog::with_capacity(opts.simulations);

    for step in 1..=opts.simulations {
        let extract = rng.usize(lo..=hi);
        if state.step(extract, opts.candidates_per_step, rng) {
            debug!("Step {}: accepted, score {:.4}", step, state.score());
        }
        trend.push(TrendEntry {
            step,
            score: state.score(),
        });
    }

    let accepted = state.accepted();
    let mut final_labels = state.into_labels();
    let mut final_score = scorer.score(&final_labels);
    // Guard against accumulated drift in the incremental moments.
    if final_score > original {
        final_labels = labels.to_vec();
        final_score = original;
    }

    info!(
        "Fine-tuning done: {:.4} -> {:.4} ({} moves accepted)",
        original, final_score, accepted
    );

    Ok(TuneOutcome {
        labels: final_labels,
        trend,
        stats: TuningStats::new(original, final_score),
        accepted,
    })
}

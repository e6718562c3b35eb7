use super::{best_of, SearchState};
use crate::error::{GfResult, GroupingError};
use crate::result::{SweepStats, TrendEntry, TrendLog};
use crate::scorer::Scorer;
use fastrand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

/// Settings for one sample-size sweep.
///
/// A move only permutes labels among the extracted subjects, so a candidate
/// size below 2 never changes the grouping: its trend entry is the starting
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    pub simulations: usize,
    /// First candidate extract count. Sizes 0 and 1 are no-op moves.
    pub sample_size: usize,
    pub iterations: usize,
    pub candidates_per_step: usize,
    pub parallel: bool,
}

impl SweepOptions {
    pub fn validate(&self) -> GfResult<()> {
        if self.sample_size == 0 {
            return Err(GroupingError::validation("sample_size must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(GroupingError::validation("iteration_count must be at least 1"));
        }
        if self.simulations == 0 {
            return Err(GroupingError::validation("simulations must be at least 1"));
        }
        if self.candidates_per_step == 0 {
            return Err(GroupingError::validation(
                "candidates_per_step must be at least 1",
            ));
        }
        if self.sample_size.checked_add(self.iterations).is_none() {
            return Err(GroupingError::validation(
                "sample_size + iteration_count overflows",
            ));
        }
        Ok(())
    }

    /// Candidate perturbation sizes, `sample_size ..= sample_size + iterations - 1`.
    pub fn sizes(&self) -> impl Iterator<Item = usize> {
        self.sample_size..self.sample_size.saturating_add(self.iterations)
    }
}

#[derive(Debug, Clone)]
struct SizeRun {
    sample_size: usize,
    labels: Vec<usize>,
    score: f64,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub labels: Vec<usize>,
    pub trend: TrendLog,
    pub stats: SweepStats,
}

/// Runs a fixed-size extract-and-reassign search for each candidate size,
/// every one starting from `initial`, and keeps the size that ends lowest.
///
/// Seeds for the per-size runs are drawn from `rng` up front, so the parallel
/// and sequential paths give identical results.
pub fn sweep(
    scorer: &Scorer,
    initial: &[usize],
    opts: &SweepOptions,
    rng: &mut Rng,
) -> GfResult<SweepOutcome> {
    opts.validate()?;
    let original = scorer.score(initial);

    let plan: Vec<(usize, u64)> = opts.sizes().map(|size| (size, rng.u64(..))).collect();
    info!(
        "Sweep: sizes {}..={}, {} simulations each, start {:.4}",
        opts.sample_size,
        opts.sample_size + opts.iterations - 1,
        opts.simulations,
        original
    );

    let run = |&(size, seed): &(usize, u64)| -> SizeRun {
        let mut local = Rng::with_seed(seed);
        let mut state = SearchState::new(scorer, initial.to_vec());
        for _ in 0..opts.simulations {
            state.step(size, opts.candidates_per_step, &mut local);
        }
        let labels = state.into_labels();
        let mut score = scorer.score(&labels);
        let labels = if score > original {
            score = original;
            initial.to_vec()
        } else {
            labels
        };
        debug!("Sample size {}: {:.4}", size, score);
        SizeRun {
            sample_size: size,
            labels,
            score,
        }
    };

    let runs: Vec<SizeRun> = if opts.parallel {
        plan.par_iter().map(run).collect()
    } else {
        plan.iter().map(run).collect()
    };

    let trend: TrendLog = runs
        .iter()
        .map(|r| TrendEntry {
            step: r.sample_size,
            score: r.score,
        })
        .collect();

    let best = best_of(runs.len(), |i| i, |&i| runs[i].score)
        .ok_or_else(|| GroupingError::validation("sweep evaluated no sizes"))?;
    let winner = &runs[best.best];

    info!(
        "Sweep done: best sample size {} with {:.4}",
        winner.sample_size, winner.score
    );

    Ok(SweepOutcome {
        labels: winner.labels.clone(),
        trend,
        stats: SweepStats {
            best_sample_size: winner.sample_size,
            original_variance: original,
            min_variance: winner.score,
            improvement: original - winner.score,
        },
    })
}

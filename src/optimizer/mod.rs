pub mod assignment;
pub mod sweep;
pub mod trials;
pub mod tuner;

pub use self::sweep::{SweepOptions, SweepOutcome};
pub use self::trials::{TrialOutcome, TrialSearch};
pub use self::tuner::{FineTuneOptions, TuneOutcome};

use crate::consts::IMPROVEMENT_EPSILON;
use crate::scorer::{GroupMoments, Scorer};
use fastrand::Rng;
use std::convert::Infallible;

pub fn rng_from(seed: Option<u64>) -> Rng {
    if let Some(s) = seed {
        Rng::with_seed(s)
    } else {
        Rng::new()
    }
}

/// Winner of a best-of-n run, plus every trial's score in trial order.
#[derive(Debug, Clone)]
pub struct BestOf<T> {
    pub best: T,
    pub score: f64,
    pub index: usize,
    pub scores: Vec<f64>,
}

/// Runs `trial` `n` times and keeps the lowest-scoring result.
/// Ties keep the earliest trial. Returns `None` when `n == 0`.
pub fn try_best_of<T, E>(
    n: usize,
    mut trial: impl FnMut(usize) -> Result<T, E>,
    mut score: impl FnMut(&T) -> f64,
) -> Result<Option<BestOf<T>>, E> {
    let mut best: Option<(T, f64, usize)> = None;
    let mut scores = Vec::with_capacity(n);

    for i in 0..n {
        let candidate = trial(i)?;
        let s = score(&candidate);
        scores.push(s);
        let better = match &best {
            None => true,
            Some((_, best_score, _)) => s < *best_score,
        };
        if better {
            best = Some((candidate, s, i));
        }
    }

    Ok(best.map(|(best, score, index)| BestOf {
        best,
        score,
        index,
        scores,
    }))
}

pub fn best_of<T>(
    n: usize,
    mut trial: impl FnMut(usize) -> T,
    score: impl FnMut(&T) -> f64,
) -> Option<BestOf<T>> {
    try_best_of::<T, Infallible>(n, |i| Ok(trial(i)), score).unwrap_or_else(|e| match e {})
}

/// An extract-and-reassign proposal: `(subject, from, to)` label changes.
/// The extracted subjects trade labels among themselves, so group sizes hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Move {
    pub changes: Vec<(usize, usize, usize)>,
}

impl Move {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Hill-climbing state: the current assignment and its score.
/// Moves are proposed, scored on a copy of the moment table, and only
/// committed when they strictly improve the score.
#[derive(Debug, Clone)]
pub struct SearchState<'a> {
    scorer: &'a Scorer,
    labels: Vec<usize>,
    moments: GroupMoments,
    score: f64,
    accepted: usize,
}

impl<'a> SearchState<'a> {
    pub fn new(scorer: &'a Scorer, labels: Vec<usize>) -> Self {
        let moments = scorer.moments(&labels);
        let score = scorer.score_moments(&moments);
        Self {
            scorer,
            labels,
            moments,
            score,
            accepted: 0,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }

    /// Picks `extract` distinct subjects and shuffles their labels among them.
    pub fn propose(&self, extract: usize, rng: &mut Rng) -> Move {
        let n = self.labels.len();
        let k = extract.min(n);
        if k < 2 {
            return Move::default();
        }

        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = rng.usize(i..n);
            pool.swap(i, j);
        }
        let picked = &pool[..k];

        let mut targets: Vec<usize> = picked.iter().map(|&s| self.labels[s]).collect();
        rng.shuffle(&mut targets);

        let mut changes = Vec::with_capacity(k);
        for (&subject, to) in picked.iter().zip(targets) {
            let from = self.labels[subject];
            if from != to {
                changes.push((subject, from, to));
            }
        }
        Move { changes }
    }

    pub fn evaluate(&self, mv: &Move) -> f64 {
        if mv.is_noop() {
            return self.score;
        }
        let mut moments = self.moments.clone();
        self.scorer.apply_moves(&mut moments, &mv.changes);
        self.scorer.score_moments(&moments)
    }

    /// Commits `mv` if `score` beats the current score; never accepts a worsening move.
    pub fn accept_if_better(&mut self, mv: &Move, score: f64) -> bool {
        let margin = IMPROVEMENT_EPSILON * self.score.abs().max(1.0);
        if mv.is_noop() || score.is_nan() || score >= self.score - margin {
            return false;
        }
        self.scorer.apply_moves(&mut self.moments, &mv.changes);
        for &(subject, _, to) in &mv.changes {
            self.labels[subject] = to;
        }
        self.score = score;
        self.accepted += 1;
        true
    }

    /// One simulation: best of `candidates` proposals, kept only if it improves.
    pub fn step(&mut self, extract: usize, candidates: usize, rng: &mut Rng) -> bool {
        let Some(best) = best_of(
            candidates.max(1),
            |_| self.propose(extract, rng),
            |mv| self.evaluate(mv),
        ) else {
            return false;
        };
        self.accept_if_better(&best.best, best.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{Cohort, Subject};
    use crate::config::Normalization;

    #[test]
    fn test_best_of_keeps_first_minimum() {
        let scores = [3.0, 1.0, 2.0, 1.0];
        let best = best_of(4, |i| i, |&i| scores[i]).unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.best, 1);
        assert_eq!(best.scores, scores.to_vec());
    }

    #[test]
    fn test_best_of_zero_trials() {
        assert!(best_of(0, |i| i, |_| 0.0).is_none());
    }

    #[test]
    fn test_try_best_of_propagates_error() {
        let out: Result<Option<BestOf<usize>>, String> = try_best_of(
            5,
            |i| if i == 2 { Err("boom".to_string()) } else { Ok(i) },
            |_| 1.0,
        );
        assert_eq!(out.unwrap_err(), "boom");
    }

    fn sorted_state_scorer() -> Scorer {
        let subjects = (0..12)
            .map(|i| Subject::new(format!("s{}", i)).with("weight", i as f64))
            .collect();
        let cohort = Cohort::from_subjects(subjects).unwrap();
        Scorer::new(&cohort, 3, Normalization::Raw).unwrap()
    }

    #[test]
    fn test_moves_preserve_group_sizes() {
        let scorer = sorted_state_scorer();
        let labels: Vec<usize> = (0..12).map(|i| i / 4).collect();
        let state = SearchState::new(&scorer, labels.clone());
        let mut rng = Rng::with_seed(7);

        for _ in 0..50 {
            let mv = state.propose(5, &mut rng);
            let mut next = labels.clone();
            for &(s, from, to) in &mv.changes {
                assert_eq!(next[s], from);
                next[s] = to;
            }
            for g in 0..3 {
                assert_eq!(next.iter().filter(|&&l| l == g).count(), 4);
            }
        }
    }

    #[test]
    fn test_worsening_move_rejected() {
        let scorer = sorted_state_scorer();
        // Perfectly interleaved start; swapping 0 and 11 makes group means diverge
        let labels: Vec<usize> = (0..12).map(|i| i % 3).collect();
        let mut state = SearchState::new(&scorer, labels.clone());
        let before = state.score();

        let mv = Move {
            changes: vec![(0, 0, 2), (11, 2, 0)],
        };
        let candidate = state.evaluate(&mv);
        assert!(candidate > before);
        assert!(!state.accept_if_better(&mv, candidate));
        assert_eq!(state.labels(), labels.as_slice());
        assert_eq!(state.score(), before);
    }

    #[test]
    fn test_steps_never_worsen() {
        let scorer = sorted_state_scorer();
        let labels: Vec<usize> = (0..12).map(|i| i / 4).collect();
        let mut state = SearchState::new(&scorer, labels);
        let mut rng = Rng::with_seed(11);
        let mut last = state.score();
        for _ in 0..100 {
            state.step(3, 2, &mut rng);
            assert!(state.score() <= last);
            last = state.score();
        }
        assert!(state.accepted() > 0);
    }
}

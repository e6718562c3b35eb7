use cohortforge::cohort::{Cohort, Subject};
use cohortforge::config::Normalization;
use cohortforge::groups::{GroupSpec, LayeringSpec};
use cohortforge::optimizer::{assignment, best_of, sweep, tuner, FineTuneOptions, SweepOptions};
use cohortforge::scorer::Scorer;
use cohortforge::strata;
use proptest::prelude::*;

// --- STRATEGIES ---

prop_compose! {
    fn arb_cohort()(
        rows in proptest::collection::vec(
            (prop::option::weighted(0.9, 10.0..40.0f64), 0.5..5.0f64),
            4..60,
        )
    ) -> Cohort {
        let subjects = rows
            .into_iter()
            .enumerate()
            .map(|(i, (weight, intake))| {
                let s = Subject::new(format!("P{:03}", i)).with("intake", intake);
                match weight {
                    Some(w) => s.with("weight", w),
                    None => s,
                }
            })
            .collect();
        // "weight" stays declared even when every draw is missing.
        Cohort::new(vec!["weight".into(), "intake".into()], subjects).unwrap()
    }
}

fn counts(labels: &[usize], groups: usize) -> Vec<usize> {
    let mut out = vec![0; groups];
    for &l in labels {
        out[l] += 1;
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_assignment_matches_sizes(
        cohort in arb_cohort(),
        k in 1usize..5,
        bins in 1usize..7,
        seed in any::<u64>()
    ) {
        prop_assume!(cohort.len() >= k);
        let sizes = GroupSpec::average(k).resolve_sizes(cohort.len()).unwrap();
        let strata = strata::bin(&cohort, &LayeringSpec::new(["weight", "intake"]), bins).unwrap();

        let mut rng = fastrand::Rng::with_seed(seed);
        let labels = assignment::assign(&strata, &sizes, &mut rng).unwrap();

        prop_assert_eq!(labels.len(), cohort.len());
        prop_assert!(labels.iter().all(|&l| l < k));
        prop_assert_eq!(counts(&labels, k), sizes);
    }

    #[test]
    fn prop_fine_tune_never_worsens(
        cohort in arb_cohort(),
        k in 2usize..5,
        seed in any::<u64>()
    ) {
        prop_assume!(cohort.len() >= k);
        let sizes = GroupSpec::average(k).resolve_sizes(cohort.len()).unwrap();
        let scorer = Scorer::new(&cohort, k, Normalization::Raw).unwrap();
        let mut rng = fastrand::Rng::with_seed(seed);
        let start = assignment::assign(&strata::Strata::single(cohort.len()), &sizes, &mut rng).unwrap();

        let opts = FineTuneOptions {
            simulations: 40,
            min_extract: 1,
            max_extract: 6,
            candidates_per_step: 2,
        };
        let out = tuner::fine_tune(&scorer, &start, &opts, &mut rng).unwrap();

        prop_assert!(out.stats.final_variance <= out.stats.original_variance);
        prop_assert_eq!(counts(&out.labels, k), sizes);
        prop_assert_eq!(scorer.score(&out.labels), out.stats.final_variance);
    }

    #[test]
    fn prop_sweep_never_worsens(
        cohort in arb_cohort(),
        sample_size in 1usize..4,
        iterations in 1usize..4,
        seed in any::<u64>()
    ) {
        prop_assume!(cohort.len() >= 2);
        let scorer = Scorer::new(&cohort, 2, Normalization::Standardized).unwrap();
        let start: Vec<usize> = (0..cohort.len()).map(|i| i % 2).collect();
        let opts = SweepOptions {
            simulations: 15,
            sample_size,
            iterations,
            candidates_per_step: 1,
            parallel: false,
        };
        let mut rng = fastrand::Rng::with_seed(seed);
        let out = sweep::sweep(&scorer, &start, &opts, &mut rng).unwrap();

        prop_assert_eq!(out.trend.len(), iterations);
        prop_assert!(out.stats.min_variance <= out.stats.original_variance);
        prop_assert!(out.stats.best_sample_size >= sample_size);
        prop_assert!(out.stats.best_sample_size < sample_size + iterations);
    }

    #[test]
    fn prop_best_of_is_minimum(scores in proptest::collection::vec(-1e6..1e6f64, 1..50)) {
        let best = best_of(scores.len(), |i| i, |&i| scores[i]).unwrap();
        prop_assert!(scores.iter().all(|&s| best.score <= s));
        prop_assert_eq!(scores.iter().position(|&s| s == best.score), Some(best.index));
        prop_assert_eq!(best.scores, scores);
    }
}

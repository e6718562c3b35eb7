use crate::error::{GfResult, GroupingError};
use crate::strata::Strata;
use fastrand::Rng;
use tracing::debug;

/// Draws one subject -> group labelling honouring `sizes` exactly.
///
/// Each stratum is shuffled and every group first receives its proportional
/// share (`floor(stratum_len * size / total)`). The remaining subjects are
/// then spread over groups that still need members, starting from a random
/// group per stratum so one stratum's leftovers land in different groups.
pub fn assign(strata: &Strata, sizes: &[usize], rng: &mut Rng) -> GfResult<Vec<usize>> {
    let total = strata.len();
    let requested: usize = sizes.iter().sum();
    if sizes.is_empty() {
        return Err(GroupingError::validation("at least one group is required"));
    }
    if requested != total {
        return Err(GroupingError::Validation(format!(
            "sum of group sizes ({}) does not match subject count ({})",
            requested, total
        )));
    }

    let groups = sizes.len();
    let mut labels = vec![usize::MAX; total];
    let mut filled = vec![0usize; groups];
    let mut leftovers: Vec<Vec<usize>> = Vec::new();

    for members in strata.buckets().into_values() {
        let mut members = members;
        rng.shuffle(&mut members);
        let len = members.len();

        let mut cursor = 0;
        for (g, &size) in sizes.iter().enumerate() {
            let quota = len * size / total;
            for &subject in &members[cursor..cursor + quota] {
                labels[subject] = g;
            }
            filled[g] += quota;
            cursor += quota;
        }
        leftovers.push(members[cursor..].to_vec());
    }

    for rest in leftovers.iter().filter(|r| !r.is_empty()) {
        let mut open: Vec<usize> = (0..groups).filter(|&g| filled[g] < sizes[g]).collect();
        rng.shuffle(&mut open);
        for (i, &subject) in rest.iter().enumerate() {
            let target = open
                .iter()
                .cycle()
                .skip(i)
                .take(open.len())
                .copied()
                .find(|&g| filled[g] < sizes[g]);
            if let Some(g) = target {
                labels[subject] = g;
                filled[g] += 1;
            }
        }
    }

    rebalance(&mut labels, sizes, rng);
    Ok(labels)
}

/// Moves randomly chosen surplus subjects into undersized groups until every
/// group matches its target size. Unlabelled entries (`usize::MAX`) count as
/// surplus of no group and are placed first. Returns the number of moves.
pub fn rebalance(labels: &mut [usize], sizes: &[usize], rng: &mut Rng) -> usize {
    let groups = sizes.len();
    let mut counts = vec![0usize; groups];
    let mut loose = Vec::new();
    for (subject, &g) in labels.iter().enumerate() {
        if g < groups {
            counts[g] += 1;
        } else {
            loose.push(subject);
        }
    }

    for g in 0..groups {
        if counts[g] > sizes[g] {
            let mut members: Vec<usize> = (0..labels.len()).filter(|&s| labels[s] == g).collect();
            rng.shuffle(&mut members);
            let surplus = counts[g] - sizes[g];
            loose.extend(members.into_iter().take(surplus));
            counts[g] = sizes[g];
        }
    }
    rng.shuffle(&mut loose);

    let moved = loose.len();
    let mut loose = loose.into_iter();
    for g in 0..groups {
        while counts[g] < sizes[g] {
            match loose.next() {
                Some(subject) => {
                    labels[subject] = g;
                    counts[g] += 1;
                }
                None => break,
            }
        }
    }

    if moved > 0 {
        debug!("Rebalanced {} subjects to meet group sizes", moved);
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{Cohort, Subject};
    use crate::groups::LayeringSpec;
    use crate::strata;

    fn strata_for(weights: &[f64]) -> Strata {
        let subjects = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Subject::new(format!("s{}", i)).with("weight", w))
            .collect();
        let cohort = Cohort::from_subjects(subjects).unwrap();
        strata::bin(&cohort, &LayeringSpec::new(["weight"]), 5).unwrap()
    }

    fn counts(labels: &[usize], groups: usize) -> Vec<usize> {
        (0..groups)
            .map(|g| labels.iter().filter(|&&l| l == g).count())
            .collect()
    }

    #[test]
    fn test_exact_sizes_with_uneven_strata() {
        let weights: Vec<f64> = (0..23).map(|i| (i * i % 17) as f64).collect();
        let strata = strata_for(&weights);
        let mut rng = Rng::with_seed(3);
        for sizes in [vec![8, 8, 7], vec![20, 2, 1], vec![23]] {
            let labels = assign(&strata, &sizes, &mut rng).unwrap();
            assert_eq!(counts(&labels, sizes.len()), sizes);
        }
    }

    #[test]
    fn test_strata_spread_evenly() {
        // two clean strata of 6: each of 3 groups should get 2 from each
        let weights = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0];
        let strata = strata_for(&weights);
        let mut rng = Rng::with_seed(99);
        let labels = assign(&strata, &[4, 4, 4], &mut rng).unwrap();
        for g in 0..3 {
            let heavy = (6..12).filter(|&s| labels[s] == g).count();
            assert_eq!(heavy, 2);
        }
    }

    #[test]
    fn test_size_mismatch_is_validation_error() {
        let strata = strata_for(&[1.0, 2.0, 3.0]);
        let mut rng = Rng::with_seed(1);
        let err = assign(&strata, &[2, 2], &mut rng).unwrap_err();
        assert!(matches!(err, GroupingError::Validation(_)));
    }

    #[test]
    fn test_rebalance_fixes_skew() {
        let mut labels = vec![0, 0, 0, 0, 0, 1, usize::MAX];
        let mut rng = Rng::with_seed(5);
        let moved = rebalance(&mut labels, &[3, 2, 2], &mut rng);
        assert_eq!(counts(&labels, 3), vec![3, 2, 2]);
        assert_eq!(moved, 3);
    }

    #[test]
    fn test_rebalance_noop_when_sizes_match() {
        let mut labels = vec![0, 1, 1, 0];
        let mut rng = Rng::with_seed(5);
        assert_eq!(rebalance(&mut labels, &[2, 2], &mut rng), 0);
        assert_eq!(labels, vec![0, 1, 1, 0]);
    }
}

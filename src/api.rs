use crate::cohort::Cohort;
use crate::config::Config;
use crate::error::GfResult;
use crate::groups::{GroupSpec, LayeringSpec};
use crate::optimizer::{rng_from, sweep, tuner, FineTuneOptions, SweepOptions, TrialSearch};
use crate::result::{
    GroupingResult, InputsSnapshot, ResultOrigin, SweepStats, TrendLog, TuningStats,
};
use crate::scorer::Scorer;
use crate::store::{allocate_id, ResultStore};
use crate::strata;
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuneReport {
    pub result: GroupingResult,
    pub trend: TrendLog,
    pub stats: TuningStats,
}

/// Raw input for the sample-size sweep; nothing is read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub cohort: Cohort,
    pub layering: LayeringSpec,
    pub groups: GroupSpec,
    pub simulations: usize,
    pub sample_size: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Best grouping found across all candidate sizes.
    pub result: GroupingResult,
    /// The trial-search grouping the sweep started from.
    pub initial: GroupingResult,
    pub trend: TrendLog,
    pub stats: SweepStats,
}

/// Request-scoped entry points over a result store.
///
/// Each call runs to completion on the caller's thread (except the optional
/// rayon sweep) and persists exactly the results it returns.
pub struct GroupingService<S: ResultStore> {
    store: S,
    config: Config,
}

struct Seeded {
    inputs: Arc<InputsSnapshot>,
    scorer: Scorer,
    labels: Vec<usize>,
    trial_scores: Vec<f64>,
}

impl<S: ResultStore> GroupingService<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fine-tuning options from the loaded config.
    pub fn tune_options(&self) -> FineTuneOptions {
        FineTuneOptions::from(&self.config.tuning)
    }

    pub fn get(&self, id: &str) -> GfResult<GroupingResult> {
        self.store.get(id)
    }

    fn trial_search(
        &self,
        cohort: Cohort,
        layering: LayeringSpec,
        group_spec: GroupSpec,
        rng: &mut Rng,
    ) -> GfResult<Seeded> {
        let groups = group_spec.resolve(cohort.len())?;
        let bins = self.config.search.bins;
        let strata = strata::bin(&cohort, &layering, bins)?;
        let scorer = Scorer::new(&cohort, groups.len(), self.config.scoring.normalization)?;

        let outcome =
            TrialSearch::new(&scorer, &strata, &groups.sizes, self.config.search.trials).run(rng)?;

        let inputs = Arc::new(InputsSnapshot {
            cohort,
            layering,
            group_spec,
            groups,
            normalization: self.config.scoring.normalization,
            bins,
        });

        Ok(Seeded {
            inputs,
            scorer,
            labels: outcome.labels,
            trial_scores: outcome.trial_scores,
        })
    }

    fn persist(&self, result: GroupingResult) -> GfResult<GroupingResult> {
        self.store.put(&result)?;
        info!("Stored {} result {}", result.origin, result.id);
        Ok(result)
    }

    /// Stratified best-of-N grouping of a fresh cohort.
    pub fn initial_group(
        &self,
        cohort: Cohort,
        layering: LayeringSpec,
        group_spec: GroupSpec,
        seed: Option<u64>,
    ) -> GfResult<GroupingResult> {
        let mut rng = rng_from(seed);
        let seeded = self.trial_search(cohort, layering, group_spec, &mut rng)?;
        let id = allocate_id(&self.store, &mut rng)?;

        let result = GroupingResult::build(
            id,
            ResultOrigin::TrialSearch,
            None,
            seeded.labels,
            &seeded.scorer,
            seeded.inputs,
        )
        .with_trial_scores(seeded.trial_scores);
        self.persist(result)
    }

    /// Hill-climbs a stored result. The stored record is left untouched; the
    /// improved grouping is stored under a new id with `parent_id` set.
    pub fn fine_tune(
        &self,
        id: &str,
        opts: &FineTuneOptions,
        seed: Option<u64>,
    ) -> GfResult<FineTuneReport> {
        let parent = self.store.get(id)?;
        let scorer = parent.inputs.scorer()?;
        let mut rng = rng_from(seed);

        let outcome = tuner::fine_tune(&scorer, &parent.labels, opts, &mut rng)?;
        let new_id = allocate_id(&self.store, &mut rng)?;

        let result = GroupingResult::build(
            new_id,
            ResultOrigin::FineTune,
            Some(parent.id.clone()),
            outcome.labels,
            &scorer,
            Arc::clone(&parent.inputs),
        );
        Ok(FineTuneReport {
            result: self.persist(result)?,
            trend: outcome.trend,
            stats: outcome.stats,
        })
    }

    /// Trial search on raw input, then a sweep over perturbation sizes.
    /// Both the starting grouping and the sweep winner are stored.
    pub fn advanced_fine_tune(
        &self,
        request: SweepRequest,
        seed: Option<u64>,
    ) -> GfResult<SweepReport> {
        let opts = SweepOptions {
            simulations: request.simulations,
            sample_size: request.sample_size,
            iterations: request.iterations,
            candidates_per_step: self.config.tuning.candidates_per_step,
            parallel: self.config.tuning.parallel_sweep,
        };
        opts.validate()?;

        let mut rng = rng_from(seed);
        let seeded = self.trial_search(request.cohort, request.layering, request.groups, &mut rng)?;
        let outcome = sweep::sweep(&seeded.scorer, &seeded.labels, &opts, &mut rng)?;

        let initial_id = allocate_id(&self.store, &mut rng)?;
        let initial = GroupingResult::build(
            initial_id,
            ResultOrigin::TrialSearch,
            None,
            seeded.labels,
            &seeded.scorer,
            Arc::clone(&seeded.inputs),
        )
        .with_trial_scores(seeded.trial_scores);
        let initial = self.persist(initial)?;

        let best_id = allocate_id(&self.store, &mut rng)?;
        let result = GroupingResult::build(
            best_id,
            ResultOrigin::Sweep,
            Some(initial.id.clone()),
            outcome.labels,
            &seeded.scorer,
            seeded.inputs,
        );

        Ok(SweepReport {
            result: self.persist(result)?,
            initial,
            trend: outcome.trend,
            stats: outcome.stats,
        })
    }
}

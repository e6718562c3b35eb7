use super::{write_json, InputArgs};
use crate::reports;
use clap::Args;
use cohortforge::api::GroupingService;
use cohortforge::config::Config;
use cohortforge::error::GfResult;
use cohortforge::store::ResultStore;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct GroupArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub config: Config,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Also write the result JSON here
    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn run<S: ResultStore>(args: GroupArgs, service: &GroupingService<S>) -> GfResult<()> {
    let (cohort, layering, spec) = args.input.load()?;
    info!(
        "Grouping {} subjects into {} groups ({} trials)",
        cohort.len(),
        spec.group_count,
        service.config().search.trials
    );

    let result = service.initial_group(cohort, layering, spec, args.seed)?;
    reports::print_result(&result);
    reports::print_trial_scores(&result.trial_scores);

    if let Some(path) = &args.out {
        write_json(path, &result)?;
        info!("Wrote {}", path);
    }
    Ok(())
}

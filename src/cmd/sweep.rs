use super::{write_json, InputArgs};
use crate::reports;
use clap::Args;
use cohortforge::api::{GroupingService, SweepRequest};
use cohortforge::config::Config;
use cohortforge::error::GfResult;
use cohortforge::store::ResultStore;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub config: Config,

    /// Smallest perturbation size tried
    #[arg(long, default_value_t = 1)]
    pub sample_size: usize,

    /// Number of consecutive sizes tried, starting at --sample-size
    #[arg(long, default_value_t = 5)]
    pub iterations: usize,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn run<S: ResultStore>(args: SweepArgs, service: &GroupingService<S>) -> GfResult<()> {
    let (cohort, layering, groups) = args.input.load()?;
    let request = SweepRequest {
        cohort,
        layering,
        groups,
        simulations: service.config().tuning.simulations,
        sample_size: args.sample_size,
        iterations: args.iterations,
    };

    let report = service.advanced_fine_tune(request, args.seed)?;

    reports::print_result(&report.result);
    reports::print_trend(&report.trend, "Sample size");
    reports::print_sweep_stats(&report.stats);

    if let Some(path) = &args.out {
        write_json(path, &report)?;
        info!("Wrote {}", path);
    }
    Ok(())
}

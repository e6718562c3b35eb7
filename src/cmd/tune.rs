use super::write_json;
use crate::reports;
use clap::Args;
use cohortforge::api::GroupingService;
use cohortforge::config::Config;
use cohortforge::error::GfResult;
use cohortforge::store::ResultStore;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct TuneArgs {
    #[command(flatten)]
    pub config: Config,

    /// Id of the stored grouping to refine
    #[arg(short, long)]
    pub id: String,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn run<S: ResultStore>(args: TuneArgs, service: &GroupingService<S>) -> GfResult<()> {
    let report = service.fine_tune(&args.id, &service.tune_options(), args.seed)?;

    reports::print_result(&report.result);
    reports::print_trend(&report.trend, "Step");
    reports::print_tuning_stats(&report.stats);

    if let Some(path) = &args.out {
        write_json(path, &report)?;
        info!("Wrote {}", path);
    }
    Ok(())
}

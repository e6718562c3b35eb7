use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use cohortforge::api::GroupingService;
use cohortforge::config::Config;
use cohortforge::error::GfResult;
use cohortforge::store::JsonDirStore;
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with search / tuning / scoring parameters
    #[arg(global = true, long = "config")]
    config_file: Option<String>,

    /// Directory holding stored results, one JSON file per id
    #[arg(global = true, long, default_value = "data/results")]
    store: String,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stratified best-of-N grouping of a subject table
    Group(cmd::group::GroupArgs),
    /// Refine a stored grouping by id
    Tune(cmd::tune::TuneArgs),
    /// Group raw input, then search over perturbation sizes
    Sweep(cmd::sweep::SweepArgs),
    /// Print a stored grouping, or list stored ids
    Show(cmd::show::ShowArgs),
}

/// File config first, then whatever flags were typed on this subcommand.
fn resolve_config(path: Option<&str>, cli_config: &Config, matches: &ArgMatches) -> GfResult<Config> {
    let Some(path) = path else {
        return Ok(cli_config.clone());
    };
    info!("Loading config from {}", path);
    let mut config = Config::load_from_file(path)?;
    if let Some((_, sub)) = matches.subcommand() {
        config.merge_from_cli(cli_config, sub);
    }
    Ok(config)
}

fn run(cli: Cli, matches: &ArgMatches) -> GfResult<()> {
    let store = JsonDirStore::open(&cli.store)?;
    let file = cli.config_file.as_deref();

    match cli.command {
        Commands::Group(args) => {
            let config = resolve_config(file, &args.config, matches)?;
            cmd::group::run(args, &GroupingService::new(store, config))
        }
        Commands::Tune(args) => {
            let config = resolve_config(file, &args.config, matches)?;
            cmd::tune::run(args, &GroupingService::new(store, config))
        }
        Commands::Sweep(args) => {
            let config = resolve_config(file, &args.config, matches)?;
            cmd::sweep::run(args, &GroupingService::new(store, config))
        }
        Commands::Show(args) => cmd::show::run(args, &store),
    }
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &matches) {
        error!("{}", e);
        process::exit(1);
    }
}

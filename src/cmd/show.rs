use crate::reports;
use clap::Args;
use cohortforge::error::GfResult;
use cohortforge::store::ResultStore;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Result to print; lists stored ids when omitted
    #[arg(short, long)]
    pub id: Option<String>,

    /// Print the raw JSON record instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run<S: ResultStore>(args: ShowArgs, store: &S) -> GfResult<()> {
    let Some(id) = args.id else {
        for id in store.ids()? {
            println!("{}", id);
        }
        return Ok(());
    };

    let result = store.get(&id)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        reports::print_result(&result);
        reports::print_assignment(&result);
    }
    Ok(())
}

pub mod group;
pub mod show;
pub mod sweep;
pub mod tune;

use cohortforge::cohort::Cohort;
use cohortforge::error::{GfResult, GroupingError};
use cohortforge::groups::{GroupSpec, LayeringSpec};
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

/// Subject table plus grouping layout, shared by `group` and `sweep`.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// CSV with a header row; the first column is the subject id
    #[arg(short = 'd', long)]
    pub data: String,

    /// Layering columns, separated by ',' or '，'
    #[arg(short = 'l', long, default_value = "")]
    pub layers: String,

    /// Number of groups (equal sizes unless --sizes is given)
    #[arg(short = 'g', long)]
    pub groups: Option<usize>,

    #[arg(long)]
    pub names: Option<String>,

    /// Explicit group sizes, e.g. "4,3,3"
    #[arg(long)]
    pub sizes: Option<String>,

    /// Cage descriptions per group, passed through to the summary
    #[arg(long)]
    pub cages: Option<String>,
}

/// Splits a typed list on ASCII and full-width commas.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl InputArgs {
    pub fn group_spec(&self) -> GfResult<GroupSpec> {
        let mut spec = match (&self.sizes, self.groups) {
            (Some(raw), groups) => {
                let sizes = split_list(raw)
                    .iter()
                    .map(|s| {
                        s.parse::<i64>().map_err(|_| {
                            GroupingError::Validation(format!("group size '{}' is not an integer", s))
                        })
                    })
                    .collect::<GfResult<Vec<i64>>>()?;
                let mut spec = GroupSpec::custom(sizes);
                if let Some(k) = groups {
                    spec.group_count = k;
                }
                spec
            }
            (None, Some(k)) => GroupSpec::average(k),
            (None, None) => {
                return Err(GroupingError::validation(
                    "either --groups or --sizes is required",
                ))
            }
        };
        if let Some(names) = &self.names {
            spec = spec.with_names(split_list(names));
        }
        if let Some(cages) = &self.cages {
            spec = spec.with_cages(cages.split([',', '，']).map(str::trim));
        }
        Ok(spec)
    }

    pub fn load(&self) -> GfResult<(Cohort, LayeringSpec, GroupSpec)> {
        let cohort = Cohort::load_from_file(&self.data)?;
        let layering = LayeringSpec::new(split_list(&self.layers));
        Ok((cohort, layering, self.group_spec()?))
    }
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> GfResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

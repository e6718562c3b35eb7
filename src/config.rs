use crate::consts::{DEFAULT_BIN_COUNT, DEFAULT_TRIAL_COUNT};
use crate::error::GfResult;
use clap::{parser::ValueSource, ArgMatches, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub tuning: TuningParams,
    #[command(flatten)]
    pub scoring: ScoringParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Independent random assignments drawn for an initial grouping
    #[arg(long, default_value_t = DEFAULT_TRIAL_COUNT)]
    pub trials: usize,
    /// Equal-width bins per layering parameter
    #[arg(long, default_value_t = DEFAULT_BIN_COUNT)]
    pub bins: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIAL_COUNT,
            bins: DEFAULT_BIN_COUNT,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParams {
    #[arg(long, default_value_t = 100)]
    pub simulations: usize,
    #[arg(long, default_value_t = 2)]
    pub min_extract: usize,
    #[arg(long, default_value_t = 5)]
    pub max_extract: usize,
    /// Label permutations compared per simulation step
    #[arg(long, default_value_t = 1)]
    pub candidates_per_step: usize,
    /// Evaluate sweep candidates on the rayon pool
    #[arg(long, default_value_t = false)]
    pub parallel_sweep: bool,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            simulations: 100,
            min_extract: 2,
            max_extract: 5,
            candidates_per_step: 1,
            parallel_sweep: false,
        }
    }
}

/// How per-parameter terms are combined into one score.
#[derive(
    ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Normalization {
    /// Plain sum of between- and within-group variances in native units
    #[default]
    Raw,
    /// Each parameter's terms divided by its cohort variance
    Standardized,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringParams {
    #[arg(long, value_enum, default_value_t = Normalization::Raw)]
    pub normalization: Normalization,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlays only the flags the user actually typed onto a file-loaded config.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(search.trials);
        update_if_present!(search.bins);

        update_if_present!(tuning.simulations);
        update_if_present!(tuning.min_extract);
        update_if_present!(tuning.max_extract);
        update_if_present!(tuning.candidates_per_step);
        update_if_present!(tuning.parallel_sweep);

        update_if_present!(scoring.normalization);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"tuning": {"simulations": 7}}"#).unwrap();
        assert_eq!(cfg.tuning.simulations, 7);
        assert_eq!(cfg.tuning.max_extract, 5);
        assert_eq!(cfg.search.trials, DEFAULT_TRIAL_COUNT);
        assert_eq!(cfg.scoring.normalization, Normalization::Raw);
    }

    #[test]
    fn test_normalization_names() {
        assert_eq!(Normalization::Standardized.to_string(), "standardized");
        assert_eq!(<Normalization as FromStr>::from_str("raw").unwrap(), Normalization::Raw);
        let json = serde_json::to_string(&Normalization::Standardized).unwrap();
        assert_eq!(json, "\"standardized\"");
    }
}

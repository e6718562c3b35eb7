use crate::cohort::{Cohort, ColumnKind};
use crate::error::{GfResult, GroupingError};
use crate::groups::LayeringSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-layering-parameter bin indices of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stratum(pub Vec<usize>);

/// Equal-width bins over `[min, max]`.
///
/// Intervals are left-closed `[lo, hi)`; the last bin is also closed on the
/// right so the maximum lands in bin `k - 1`. A degenerate range is one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}

impl BinEdges {
    pub fn from_values(values: impl IntoIterator<Item = f64>, bins: usize) -> Option<Self> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let bins = if max > min { bins } else { 1 };
        Some(Self { min, max, bins })
    }

    pub fn is_collapsed(&self) -> bool {
        self.bins <= 1
    }

    pub fn index(&self, value: f64) -> usize {
        if self.is_collapsed() {
            return 0;
        }
        let width = (self.max - self.min) / self.bins as f64;
        let raw = ((value - self.min) / width).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.bins - 1)
        }
    }
}

/// The stratum of every subject in a run, in cohort order.
#[derive(Debug, Clone, PartialEq)]
pub struct Strata {
    keys: Vec<Stratum>,
}

impl Strata {
    /// Every subject in a single stratum.
    pub fn single(subjects: usize) -> Self {
        Self {
            keys: vec![Stratum(Vec::new()); subjects],
        }
    }

    pub fn key(&self, subject: usize) -> &Stratum {
        &self.keys[subject]
    }

    pub fn keys(&self) -> &[Stratum] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Subject indices per stratum, strata in key order, members in cohort order.
    pub fn buckets(&self) -> BTreeMap<&Stratum, Vec<usize>> {
        let mut out: BTreeMap<&Stratum, Vec<usize>> = BTreeMap::new();
        for (i, key) in self.keys.iter().enumerate() {
            out.entry(key).or_default().push(i);
        }
        out
    }
}

/// Assigns each subject its stratum from the layering parameters.
///
/// Unknown or textual parameters are rejected. Parameters with no spread (or no
/// values at all) collapse to a single bin, and subjects missing a value are
/// routed to bin 0 for that parameter.
pub fn bin(cohort: &Cohort, layering: &LayeringSpec, bins: usize) -> GfResult<Strata> {
    if bins == 0 {
        return Err(GroupingError::validation("bin count must be at least 1"));
    }
    if layering.is_empty() {
        debug!("No layering parameters: single stratum");
        return Ok(Strata::single(cohort.len()));
    }

    let mut per_param: Vec<Vec<usize>> = Vec::with_capacity(layering.len());
    for param in layering.params() {
        match cohort.column_kind(param) {
            None => {
                return Err(GroupingError::Validation(format!(
                    "layering parameter '{}' is not a column of the data",
                    param
                )))
            }
            Some(ColumnKind::Text) => {
                return Err(GroupingError::Validation(format!(
                    "layering parameter '{}' is not numeric",
                    param
                )))
            }
            Some(ColumnKind::Empty) | Some(ColumnKind::Numeric) => {}
        }

        let values = cohort.numeric_values(param);
        let edges = BinEdges::from_values(values.iter().flatten().copied(), bins);

        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            warn!(
                "{} subjects lack '{}'; placing them in bin 0",
                missing, param
            );
        }

        let indices = match edges {
            Some(e) if !e.is_collapsed() => {
                debug!("'{}' binned over [{}, {}] into {}", param, e.min, e.max, e.bins);
                values
                    .iter()
                    .map(|v| v.map_or(0, |x| e.index(x)))
                    .collect()
            }
            _ => {
                warn!("'{}' has no spread; collapsing to one bin", param);
                vec![0; values.len()]
            }
        };
        per_param.push(indices);
    }

    let keys = (0..cohort.len())
        .map(|i| Stratum(per_param.iter().map(|col| col[i]).collect()))
        .collect();
    Ok(Strata { keys })
}

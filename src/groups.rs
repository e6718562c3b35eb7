use crate::error::{GfResult, GroupingError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How subjects are split between groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sizes", rename_all = "lowercase")]
pub enum Sizing {
    /// Equal sizes; the first `n % k` groups take one extra subject.
    Average,
    /// Explicit per-group sizes. Signed so malformed input can be reported.
    Custom(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub group_count: usize,
    #[serde(default)]
    pub names: Vec<String>,
    pub sizing: Sizing,
    /// Opaque cage / enclosure descriptions, echoed into summaries.
    #[serde(default)]
    pub cages: Vec<String>,
}

/// A group spec checked against a concrete cohort size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGroups {
    pub names: Vec<String>,
    pub sizes: Vec<usize>,
    pub cages: Vec<Option<String>>,
}

impl ResolvedGroups {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl GroupSpec {
    pub fn average(group_count: usize) -> Self {
        Self {
            group_count,
            names: Vec::new(),
            sizing: Sizing::Average,
            cages: Vec::new(),
        }
    }

    pub fn custom(sizes: Vec<i64>) -> Self {
        Self {
            group_count: sizes.len(),
            names: Vec::new(),
            sizing: Sizing::Custom(sizes),
            cages: Vec::new(),
        }
    }

    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cages<S: Into<String>>(mut self, cages: impl IntoIterator<Item = S>) -> Self {
        self.cages = cages.into_iter().map(Into::into).collect();
        self
    }

    /// Supplied names, or `group_1..group_k`.
    pub fn group_names(&self) -> GfResult<Vec<String>> {
        if self.names.is_empty() {
            return Ok((1..=self.group_count).map(|i| format!("group_{}", i)).collect());
        }
        if self.names.len() != self.group_count {
            return Err(GroupingError::Validation(format!(
                "{} group names given for {} groups",
                self.names.len(),
                self.group_count
            )));
        }
        let unique: HashSet<&str> = self.names.iter().map(|n| n.trim()).collect();
        if unique.len() != self.names.len() || unique.contains("") {
            return Err(GroupingError::validation(
                "group names must be non-empty and unique",
            ));
        }
        Ok(self.names.iter().map(|n| n.trim().to_string()).collect())
    }

    pub fn resolve_sizes(&self, total: usize) -> GfResult<Vec<usize>> {
        if self.group_count == 0 {
            return Err(GroupingError::validation("group_count must be at least 1"));
        }
        if total < self.group_count {
            return Err(GroupingError::DegenerateInput {
                subjects: total,
                groups: self.group_count,
            });
        }

        match &self.sizing {
            Sizing::Average => {
                let base = total / self.group_count;
                let remainder = total % self.group_count;
                Ok((0..self.group_count)
                    .map(|i| base + usize::from(i < remainder))
                    .collect())
            }
            Sizing::Custom(sizes) => {
                if sizes.len() != self.group_count {
                    return Err(GroupingError::Validation(format!(
                        "{} sizes given for {} groups",
                        sizes.len(),
                        self.group_count
                    )));
                }
                if let Some(bad) = sizes.iter().find(|&&s| s <= 0) {
                    return Err(GroupingError::Validation(format!(
                        "group sizes must be positive, got {}",
                        bad
                    )));
                }
                let sum: i64 = sizes.iter().sum();
                if sum != total as i64 {
                    return Err(GroupingError::Validation(format!(
                        "sum of group sizes ({}) does not match subject count ({})",
                        sum, total
                    )));
                }
                Ok(sizes.iter().map(|&s| s as usize).collect())
            }
        }
    }

    pub fn resolve(&self, total: usize) -> GfResult<ResolvedGroups> {
        let sizes = self.resolve_sizes(total)?;
        let names = self.group_names()?;
        let cages = if self.cages.is_empty() {
            vec![None; self.group_count]
        } else if self.cages.len() == self.group_count {
            self.cages
                .iter()
                .map(|c| Some(c.clone()).filter(|c| !c.trim().is_empty()))
                .collect()
        } else {
            return Err(GroupingError::Validation(format!(
                "{} cage entries given for {} groups",
                self.cages.len(),
                self.group_count
            )));
        };
        Ok(ResolvedGroups {
            names,
            sizes,
            cages,
        })
    }
}

/// Ordered, duplicate-free list of layering attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayeringSpec(Vec<String>);

impl LayeringSpec {
    pub fn new<S: Into<String>>(params: impl IntoIterator<Item = S>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for p in params {
            let p = p.into();
            let p = p.trim();
            if !p.is_empty() && !out.iter().any(|o| o == p) {
                out.push(p.to_string());
            }
        }
        Self(out)
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn params(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30, 3, vec![10, 10, 10])]
    #[case(10, 3, vec![4, 3, 3])]
    #[case(11, 3, vec![4, 4, 3])]
    #[case(5, 1, vec![5])]
    fn test_average_sizes(#[case] total: usize, #[case] k: usize, #[case] expected: Vec<usize>) {
        assert_eq!(GroupSpec::average(k).resolve_sizes(total).unwrap(), expected);
    }

    #[rstest]
    #[case(vec![3, 3, 4])]
    #[case(vec![3, 3, 2])]
    #[case(vec![5, -1, 5])]
    #[case(vec![9, 0, 0])]
    #[case(vec![4, 5])]
    fn test_bad_custom_sizes(#[case] sizes: Vec<i64>) {
        let mut spec = GroupSpec::custom(sizes);
        spec.group_count = 3;
        let err = spec.resolve_sizes(9).unwrap_err();
        assert!(matches!(err, GroupingError::Validation(_)), "{:?}", err);
    }

    #[test]
    fn test_too_few_subjects_is_degenerate() {
        let err = GroupSpec::average(4).resolve_sizes(3).unwrap_err();
        assert!(matches!(
            err,
            GroupingError::DegenerateInput {
                subjects: 3,
                groups: 4
            }
        ));
    }

    #[test]
    fn test_default_names_and_cages() {
        let resolved = GroupSpec::average(2)
            .with_cages(["2x5", ""])
            .resolve(10)
            .unwrap();
        assert_eq!(resolved.names, vec!["group_1", "group_2"]);
        assert_eq!(resolved.cages, vec![Some("2x5".to_string()), None]);
    }

    #[test]
    fn test_name_count_mismatch() {
        let spec = GroupSpec::average(3).with_names(["ctrl", "low"]);
        assert!(matches!(
            spec.resolve(9),
            Err(GroupingError::Validation(_))
        ));
    }

    #[test]
    fn test_layering_dedupes_in_order() {
        let spec = LayeringSpec::new(["weight", " intake", "weight", ""]);
        assert_eq!(spec.params(), &["weight", "intake"]);
    }

    #[test]
    fn test_sizing_json_shape() {
        let json = serde_json::to_string(&Sizing::Custom(vec![3, 3])).unwrap();
        assert_eq!(json, r#"{"kind":"custom","sizes":[3,3]}"#);
        let avg: Sizing = serde_json::from_str(r#"{"kind":"average"}"#).unwrap();
        assert_eq!(avg, Sizing::Average);
    }
}

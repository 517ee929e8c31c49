//! Filtering, sorting and limiting of upstream record collections
//!
//! A [`FilterSpec`] is applied in a fixed order:
//! 1. numeric ranges (every constraint must hold)
//! 2. categorical membership (every constraint must intersect)
//! 3. boolean flags
//! 4. stable sort
//! 5. limit
//!
//! The input slice is never modified; [`apply`] returns a new sequence.

use crate::record::RawRecord;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(Error::validation(format!(
                "Unknown sort order '{}'. Use 'asc' or 'desc'",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Inclusive numeric range on one field
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Keep records where the field is absent instead of dropping them
    pub keep_absent: bool,
}

impl RangeFilter {
    fn matches(&self, record: &RawRecord) -> bool {
        let Some(value) = record.number(&self.field) else {
            return self.keep_absent;
        };
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Set membership on a string (or string array) field, ASCII case-insensitive
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFilter {
    pub field: String,
    /// Accepted values, lowercased
    pub values: Vec<String>,
}

impl CategoryFilter {
    fn matches(&self, record: &RawRecord) -> bool {
        record
            .labels(&self.field)
            .iter()
            .any(|label| self.values.iter().any(|v| v.eq_ignore_ascii_case(label)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagFilter {
    pub field: String,
    pub expected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

/// Caller-supplied constraints for a record collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub ranges: Vec<RangeFilter>,
    pub categories: Vec<CategoryFilter>,
    pub flags: Vec<FlagFilter>,
    pub sort: Option<SortSpec>,
    /// `None` or `Some(0)` means unlimited
    pub limit: Option<usize>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `min <= field <= max`; a no-op when both bounds are `None`
    pub fn range(self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.push_range(field, min, max, false)
    }

    /// Like [`FilterSpec::range`] but records without the field pass
    pub fn range_or_absent(self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.push_range(field, min, max, true)
    }

    fn push_range(mut self, field: &str, min: Option<f64>, max: Option<f64>, keep_absent: bool) -> Self {
        if min.is_some() || max.is_some() {
            self.ranges.push(RangeFilter {
                field: field.to_string(),
                min,
                max,
                keep_absent,
            });
        }
        self
    }

    /// Require `field` to carry one of `values`; a no-op for an empty set
    pub fn one_of<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.categories.push(CategoryFilter {
                field: field.to_string(),
                values,
            });
        }
        self
    }

    pub fn flag(mut self, field: &str, expected: bool) -> Self {
        self.flags.push(FlagFilter {
            field: field.to_string(),
            expected,
        });
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some(SortSpec {
            field: field.to_string(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Reject ranges that can never match
    pub fn validate(&self) -> Result<()> {
        for range in &self.ranges {
            for bound in [range.min, range.max].into_iter().flatten() {
                if !bound.is_finite() {
                    return Err(Error::validation(format!(
                        "Bound for '{}' must be a finite number",
                        range.field
                    )));
                }
            }
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(Error::validation(format!(
                        "Minimum {} for '{}' is greater than maximum {}",
                        min, range.field, max
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &RawRecord) -> bool {
        self.ranges.iter().all(|r| r.matches(record))
            && self.categories.iter().all(|c| c.matches(record))
            && self
                .flags
                .iter()
                .all(|f| record.bool(&f.field) == Some(f.expected))
    }
}

/// Sort key extracted from a record; variants are ordered lowest first
#[derive(Debug, Clone, Copy)]
enum SortValue<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> SortValue<'a> {
    fn of(record: &'a RawRecord, field: &str) -> Self {
        if let Some(n) = record.number(field) {
            SortValue::Number(n)
        } else if let Some(s) = record.text(field) {
            SortValue::Text(s)
        } else {
            SortValue::Missing
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        use SortValue::*;
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Missing, _) => Ordering::Less,
            (_, Missing) => Ordering::Greater,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Number(_), Text(_)) => Ordering::Less,
            (Text(_), Number(_)) => Ordering::Greater,
            (Text(a), Text(b)) => a.cmp(b),
        }
    }
}

/// Filter, sort and truncate `records` according to `spec`
pub fn apply(records: &[RawRecord], spec: &FilterSpec) -> Vec<RawRecord> {
    let mut kept: Vec<RawRecord> = records
        .iter()
        .filter(|record| spec.matches(record))
        .cloned()
        .collect();

    if let Some(sort) = &spec.sort {
        // Vec::sort_by is stable, so ties keep their input order
        kept.sort_by(|a, b| {
            let ord = SortValue::of(a, &sort.field).cmp(&SortValue::of(b, &sort.field));
            match sort.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    if let Some(limit) = spec.limit.filter(|&n| n > 0) {
        kept.truncate(limit);
    }

    kept
}

/// [`apply`], also returning how many records matched before the limit
pub fn apply_with_total(records: &[RawRecord], spec: &FilterSpec) -> (Vec<RawRecord>, usize) {
    let unlimited = FilterSpec {
        limit: None,
        ..spec.clone()
    };
    let mut kept = apply(records, &unlimited);
    let total = kept.len();
    if let Some(limit) = spec.limit.filter(|&n| n > 0) {
        kept.truncate(limit);
    }
    (kept, total)
}

//! Split-apply-combine over the full Cartesian product of grouping levels.
//!
//! Unlike a plain group-by, every combination of declared levels produces a
//! group, observed or not. Downstream moves rely on this to keep dodge slots
//! and stack order consistent across subsets of the data.

use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::warn;

use super::data::{Column, DataFrame, DataValue};
use super::rules::categorical_order;
use crate::error::{Error, Result};

/// A scalar reduction applied to one group's non-missing values.
pub type Reducer<'a> = &'a dyn Fn(&[f64]) -> f64;

/// Grouping specification: variable names with optional explicit level orders.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    order: IndexMap<String, Option<Vec<DataValue>>>,
}

/// One group: its key (one level per present grouping variable) and the row
/// indices of the data it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// `(variable, level)` pairs in grouping order.
    pub key: Vec<(String, DataValue)>,
    /// Rows of the source frame in this group. Empty for unobserved groups.
    pub rows: Vec<usize>,
}

impl Group {
    /// Level of one grouping variable, if it is part of the key.
    #[must_use]
    pub fn level(&self, var: &str) -> Option<&DataValue> {
        self.key.iter().find(|(k, _)| k == var).map(|(_, v)| v)
    }
}

impl GroupBy {
    /// Group by the named variables, deriving level orders from the data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no variable is given.
    pub fn new<I, S>(variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_order(variables.into_iter().map(|v| (v.into(), None)).collect())
    }

    /// Group with explicit level orders; `None` derives the order from data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when `order` is empty.
    pub fn with_order(order: IndexMap<String, Option<Vec<DataValue>>>) -> Result<Self> {
        if order.is_empty() {
            return Err(Error::config("GroupBy requires at least one grouping variable"));
        }
        Ok(Self { order })
    }

    /// The declared grouping variables and their orders.
    #[must_use]
    pub fn order(&self) -> &IndexMap<String, Option<Vec<DataValue>>> {
        &self.order
    }

    /// Whether `var` is one of the declared grouping variables.
    #[must_use]
    pub fn contains(&self, var: &str) -> bool {
        self.order.contains_key(var)
    }

    /// Grouping variables present in `data`, with their resolved levels.
    #[must_use]
    pub fn levels(&self, data: &DataFrame) -> IndexMap<String, Vec<DataValue>> {
        self.order
            .iter()
            .filter_map(|(var, order)| {
                data.get(var).map(|col| (var.clone(), categorical_order(col, order.as_deref())))
            })
            .collect()
    }

    /// Every group key, in declared level order, observed or not.
    #[must_use]
    pub fn group_index(&self, data: &DataFrame) -> Vec<Vec<(String, DataValue)>> {
        let levels = self.levels(data);
        if levels.is_empty() {
            return Vec::new();
        }
        let names: Vec<&String> = levels.keys().collect();
        levels
            .values()
            .map(|v| v.iter().cloned())
            .multi_cartesian_product()
            .map(|key| names.iter().map(|n| (*n).clone()).zip(key).collect())
            .collect()
    }

    /// Split `data` into groups following [`GroupBy::group_index`].
    ///
    /// Rows with a missing value in any grouping column belong to no group.
    /// Returns `None` when no grouping variable is present in the data.
    #[must_use]
    pub fn partition(&self, data: &DataFrame) -> Option<Vec<Group>> {
        let index = self.group_index(data);
        let vars: Vec<&Column> = self.order.keys().filter_map(|v| data.get(v)).collect();
        if vars.is_empty() {
            return None;
        }

        let mut rows_by_key: HashMap<Vec<DataValue>, Vec<usize>> = HashMap::new();
        for row in 0..data.nrow() {
            let key: Option<Vec<DataValue>> =
                vars.iter().map(|c| c.get(row).filter(|v| !v.is_null()).cloned()).collect();
            if let Some(key) = key {
                rows_by_key.entry(key).or_default().push(row);
            }
        }

        Some(
            index
                .into_iter()
                .map(|key| {
                    let lookup: Vec<DataValue> = key.iter().map(|(_, v)| v.clone()).collect();
                    let rows = rows_by_key.get(&lookup).cloned().unwrap_or_default();
                    Group { key, rows }
                })
                .collect(),
        )
    }

    /// Reduce columns per group, producing one row per group key.
    ///
    /// Unobserved groups get null aggregates. The output keeps the input's
    /// column order, followed by any columns the input lacked.
    ///
    /// # Errors
    ///
    /// Returns an error when no grouping variable is present or an aggregated
    /// column is missing.
    pub fn agg(&self, data: &DataFrame, aggs: &[(&str, Reducer<'_>)]) -> Result<DataFrame> {
        let groups = self.partition(data).ok_or_else(|| {
            Error::value("No grouping variables are present in the data")
        })?;
        let mut sources = Vec::with_capacity(aggs.len());
        for (name, _) in aggs {
            let values = data
                .numeric(name)
                .ok_or_else(|| Error::value(format!("cannot aggregate missing column `{name}`")))?;
            sources.push(values);
        }

        let mut key_cols: IndexMap<String, Vec<DataValue>> = IndexMap::new();
        let mut agg_cols: Vec<Vec<DataValue>> = vec![Vec::with_capacity(groups.len()); aggs.len()];
        let mut unobserved = 0;
        for group in &groups {
            for (var, level) in &group.key {
                key_cols.entry(var.clone()).or_default().push(level.clone());
            }
            if group.rows.is_empty() {
                unobserved += 1;
            }
            for (i, (_, func)) in aggs.iter().enumerate() {
                let value = if group.rows.is_empty() {
                    DataValue::Null
                } else {
                    let vals: Vec<f64> = group
                        .rows
                        .iter()
                        .map(|&r| sources[i][r])
                        .filter(|v| !v.is_nan())
                        .collect();
                    DataValue::Number(func(&vals))
                };
                agg_cols[i].push(value);
            }
        }
        if unobserved > 0 {
            warn!(unobserved, total = groups.len(), "filling unobserved groups with null aggregates");
        }

        let mut res = DataFrame::new();
        for (var, values) in key_cols {
            let categories = data.get(&var).and_then(Column::categories).map(<[DataValue]>::to_vec);
            let col = match categories {
                Some(cats) => Column::categorical(values, cats),
                None => Column::new(values),
            };
            res.insert(var, col)?;
        }
        for ((name, _), values) in aggs.iter().zip(agg_cols) {
            res.insert(*name, Column::new(values))?;
        }
        Ok(reorder_columns(&res, data))
    }

    /// Apply a frame-to-frame function per group and stack the results in
    /// group order, tagging each part with its group levels.
    ///
    /// Unobserved groups are passed an empty slice of `data`, so functions that
    /// produce output for empty input (zero-count bins, for instance) are
    /// represented. Without any grouping variable present the function sees
    /// the whole frame.
    ///
    /// # Errors
    ///
    /// Propagates errors from `func`.
    pub fn apply<F>(&self, data: &DataFrame, mut func: F) -> Result<DataFrame>
    where
        F: FnMut(&DataFrame) -> Result<DataFrame>,
    {
        let Some(groups) = self.partition(data) else {
            return Ok(reorder_columns(&func(data)?, data));
        };

        let mut parts = Vec::with_capacity(groups.len());
        for group in groups {
            let subset = data.take(&group.rows);
            let mut part = func(&subset)?;
            let n = part.nrow();
            for (var, level) in group.key {
                let categories =
                    data.get(&var).and_then(Column::categories).map(<[DataValue]>::to_vec);
                let values = vec![level; n];
                let col = match categories {
                    Some(cats) => Column::categorical(values, cats),
                    None => Column::new(values),
                };
                part.insert(var, col)?;
            }
            parts.push(part);
        }
        let res = DataFrame::concat(&parts);
        Ok(reorder_columns(&res, data))
    }
}

/// Columns of `data` first (those present in `res`), then columns new to `res`.
fn reorder_columns(res: &DataFrame, data: &DataFrame) -> DataFrame {
    let mut cols: Vec<&str> = data.columns().into_iter().filter(|c| res.has_column(c)).collect();
    cols.extend(res.columns().into_iter().filter(|c| !data.has_column(c)));
    res.select(&cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(v: &[f64]) -> f64 {
        if v.is_empty() {
            f64::NAN
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    }

    fn sample() -> DataFrame {
        DataFrame::new()
            .column("x", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .column("a", vec!["a1", "a1", "a2", "a2"])
            .unwrap()
            .column("b", vec!["b1", "b2", "b1", "b1"])
            .unwrap()
    }

    #[test]
    fn test_requires_a_variable() {
        let err = GroupBy::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_group_index_is_cartesian() {
        let g = GroupBy::new(["a", "b"]).unwrap();
        let index = g.group_index(&sample());
        assert_eq!(index.len(), 4);
        assert_eq!(index[1][0].1, DataValue::from("a1"));
        assert_eq!(index[1][1].1, DataValue::from("b2"));
    }

    #[test]
    fn test_absent_variables_dropped() {
        let g = GroupBy::new(["a", "missing"]).unwrap();
        assert_eq!(g.group_index(&sample()).len(), 2);
    }

    #[test]
    fn test_agg_empty_groups_are_null() {
        let df = DataFrame::new()
            .column("v", vec![1.0, 2.0])
            .unwrap()
            .column("A", vec!["a1", "a1"])
            .unwrap()
            .column("B", vec!["b1", "b1"])
            .unwrap();
        let mut order = IndexMap::new();
        order.insert("A".to_string(), Some(vec!["a1".into(), "a2".into()]));
        order.insert("B".to_string(), Some(vec!["b1".into(), "b2".into()]));
        let g = GroupBy::with_order(order).unwrap();
        let res = g.agg(&df, &[("v", &mean)]).unwrap();
        assert_eq!(res.nrow(), 4);
        let v = res.get("v").unwrap().values();
        assert_eq!(v[0], DataValue::from(1.5));
        assert!(v[1..].iter().all(DataValue::is_null));
    }

    #[test]
    fn test_agg_column_order_follows_input() {
        let g = GroupBy::new(["a"]).unwrap();
        let res = g.agg(&sample(), &[("x", &mean)]).unwrap();
        assert_eq!(res.columns(), vec!["x", "a"]);
        assert_eq!(res.numeric("x").unwrap(), vec![1.5, 3.5]);
    }

    #[test]
    fn test_agg_without_groupers_errors() {
        let g = GroupBy::new(["nope"]).unwrap();
        assert!(g.agg(&sample(), &[("x", &mean)]).is_err());
    }

    #[test]
    fn test_apply_calls_empty_groups() {
        let g = GroupBy::new(["a", "b"]).unwrap();
        let mut calls = 0;
        let res = g
            .apply(&sample(), |df| {
                calls += 1;
                DataFrame::new().column("n", vec![df.nrow() as f64])
            })
            .unwrap();
        assert_eq!(calls, 4);
        assert_eq!(res.numeric("n").unwrap(), vec![1.0, 1.0, 2.0, 0.0]);
        assert_eq!(res.columns(), vec!["a", "b", "n"]);
    }

    #[test]
    fn test_apply_without_groupers_uses_whole_frame() {
        let g = GroupBy::new(["nope"]).unwrap();
        let res = g.apply(&sample(), |df| Ok(df.select(&["x"]))).unwrap();
        assert_eq!(res.nrow(), 4);
    }

    #[test]
    fn test_partition_skips_null_keys() {
        let df = DataFrame::new()
            .column("g", Column::new(vec![DataValue::from("u"), DataValue::Null]))
            .unwrap();
        let groups = GroupBy::new(["g"]).unwrap().partition(&df).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows, vec![0]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(48))]

            #[test]
            fn prop_agg_is_order_invariant(rows in prop::collection::vec((0u8..3, 0u8..3, -10.0f64..10.0), 1..30), seed in any::<u64>()) {
                let build = |rows: &[(u8, u8, f64)]| {
                    let a: Vec<String> = rows.iter().map(|r| format!("a{}", r.0)).collect();
                    let b: Vec<String> = rows.iter().map(|r| format!("b{}", r.1)).collect();
                    let v: Vec<f64> = rows.iter().map(|r| r.2).collect();
                    DataFrame::new().column("a", a).unwrap().column("b", b).unwrap().column("v", v).unwrap()
                };
                let mut shuffled = rows.clone();
                let n = shuffled.len();
                for i in (1..n).rev() {
                    let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
                    shuffled.swap(i, j);
                }

                let mut order = IndexMap::new();
                order.insert("a".to_string(), Some(vec!["a0".into(), "a1".into(), "a2".into()]));
                order.insert("b".to_string(), Some(vec!["b0".into(), "b1".into(), "b2".into()]));
                let g = GroupBy::with_order(order).unwrap();
                let sum = |v: &[f64]| v.iter().sum::<f64>();

                let left = g.agg(&build(&rows), &[("v", &sum)]).unwrap();
                let right = g.agg(&build(&shuffled), &[("v", &sum)]).unwrap();
                prop_assert_eq!(left.nrow(), 9);
                prop_assert_eq!(left.get("a"), right.get("a"));
                prop_assert_eq!(left.get("b"), right.get("b"));
                let lv = left.numeric("v").unwrap();
                let rv = right.numeric("v").unwrap();
                for (l, r) in lv.iter().zip(&rv) {
                    prop_assert!((l.is_nan() && r.is_nan()) || (l - r).abs() < 1e-9);
                }
            }
        }
    }
}

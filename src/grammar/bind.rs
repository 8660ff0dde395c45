//! Binding plot variables to data.
//!
//! [`PlotData`] is the canonical long-form table the compiler works on: one
//! column per plot variable (`x`, `y`, `color`, `col`, ...) plus a registry of
//! where each variable came from. Layers refine the plot-level binding with
//! [`PlotData::join`], which never mutates its receiver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::data::{Column, DataFrame, DataValue};
use super::rules::{variable_type, VarType};
use crate::error::{Error, Result};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn fresh_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// What a plot variable is assigned to.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableSpec {
    /// A column of the data source, by name.
    Column(String),
    /// Values supplied directly.
    Vector {
        /// Optional name, used for axis labels and legend titles.
        name: Option<String>,
        /// The values.
        values: Column,
        /// Identity of this vector.
        token: u64,
    },
    /// Explicitly unset; in a layer this drops an inherited variable.
    Null,
}

impl VariableSpec {
    /// Reference a column by name.
    pub fn column(name: impl Into<String>) -> Self {
        VariableSpec::Column(name.into())
    }

    /// Anonymous vector of values.
    pub fn vector(values: impl Into<Column>) -> Self {
        VariableSpec::Vector { name: None, values: values.into(), token: fresh_token() }
    }

    /// Named vector of values.
    pub fn named(name: impl Into<String>, values: impl Into<Column>) -> Self {
        VariableSpec::Vector { name: Some(name.into()), values: values.into(), token: fresh_token() }
    }
}

impl From<&str> for VariableSpec {
    fn from(name: &str) -> Self {
        VariableSpec::column(name)
    }
}

impl From<String> for VariableSpec {
    fn from(name: String) -> Self {
        VariableSpec::Column(name)
    }
}

impl From<Column> for VariableSpec {
    fn from(values: Column) -> Self {
        VariableSpec::vector(values)
    }
}

impl From<Vec<f64>> for VariableSpec {
    fn from(values: Vec<f64>) -> Self {
        VariableSpec::vector(values)
    }
}

impl<T: Into<VariableSpec>> From<Option<T>> for VariableSpec {
    fn from(value: Option<T>) -> Self {
        value.map_or(VariableSpec::Null, Into::into)
    }
}

/// Ordered variable assignments.
pub type Variables = IndexMap<String, VariableSpec>;

/// Identity of the data behind a variable.
///
/// Variables with equal identities represent the same data and share a
/// legend section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableId {
    /// A named column or vector.
    Name(String),
    /// An anonymous vector.
    Token(u64),
}

/// Long-form plot data with its name and identity registry.
#[derive(Debug, Clone, Default)]
pub struct PlotData {
    /// One column per bound variable.
    pub frame: DataFrame,
    /// Source name of each variable, used for default labels.
    pub names: IndexMap<String, Option<String>>,
    /// Identity of each variable.
    pub ids: IndexMap<String, VariableId>,
    /// Per-pairing frames produced by stats when the plot is paired, keyed by
    /// the `(x, y)` variable names of the pairing.
    pub frames: IndexMap<(String, String), DataFrame>,
    source_data: Option<Arc<DataFrame>>,
    source_vars: Variables,
}

impl PlotData {
    /// Bind `variables` against `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binding`] when a column name is absent from the data
    /// (or no data was given), or when a vector's length disagrees with the
    /// data or with other vectors.
    pub fn new(data: Option<&Arc<DataFrame>>, variables: &Variables) -> Result<Self> {
        let mut columns: Vec<(String, Column)> = Vec::new();
        let mut names = IndexMap::new();
        let mut ids = IndexMap::new();
        let mut expected_len = data.map(|d| d.nrow());

        for (key, spec) in variables {
            match spec {
                VariableSpec::Null => {}
                VariableSpec::Column(name) => {
                    let col = data.and_then(|d| d.get(name)).ok_or_else(|| {
                        let reason = if data.is_none() {
                            format!("`{name}` is a column name, but no data was passed")
                        } else {
                            format!("no entry named `{name}` appears in the data")
                        };
                        Error::Binding { variable: key.clone(), reason }
                    })?;
                    columns.push((key.clone(), col.clone()));
                    names.insert(key.clone(), Some(name.clone()));
                    ids.insert(key.clone(), VariableId::Name(name.clone()));
                }
                VariableSpec::Vector { name, values, token } => {
                    if values.is_empty() {
                        continue;
                    }
                    match expected_len {
                        Some(n) if n != values.len() => {
                            let reason = if data.is_some() {
                                format!(
                                    "vector length {} does not match the data length {n}",
                                    values.len()
                                )
                            } else {
                                format!(
                                    "vector length {} does not match other vectors of length {n}",
                                    values.len()
                                )
                            };
                            return Err(Error::Binding { variable: key.clone(), reason });
                        }
                        Some(_) => {}
                        None => expected_len = Some(values.len()),
                    }
                    columns.push((key.clone(), values.clone()));
                    names.insert(key.clone(), name.clone());
                    let id = name.clone().map_or(VariableId::Token(*token), VariableId::Name);
                    ids.insert(key.clone(), id);
                }
            }
        }

        let mut frame = DataFrame::new();
        for (key, col) in columns {
            frame.insert(key, col)?;
        }
        Ok(Self {
            frame,
            names,
            ids,
            frames: IndexMap::new(),
            source_data: data.cloned(),
            source_vars: variables.clone(),
        })
    }

    /// Bind a wide-form table: every numeric column is melted into `y`, the
    /// row position becomes `x` and the column name becomes `color`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binding`] when the table has no numeric column.
    pub fn wide(data: &Arc<DataFrame>) -> Result<Self> {
        let numeric: Vec<(&str, &Column)> = data
            .iter()
            .filter(|(_, c)| variable_type(c, VarType::Numeric, false) == VarType::Numeric)
            .collect();
        if numeric.is_empty() {
            return Err(Error::Binding {
                variable: "y".into(),
                reason: "wide-form data has no numeric columns".into(),
            });
        }

        let n = data.nrow();
        let mut x = Vec::with_capacity(n * numeric.len());
        let mut y = Vec::with_capacity(n * numeric.len());
        let mut hue = Vec::with_capacity(n * numeric.len());
        for (name, col) in &numeric {
            for (i, v) in col.iter().enumerate() {
                x.push(DataValue::from(i));
                y.push(v.clone());
                hue.push(DataValue::from(*name));
            }
        }
        let levels: Vec<DataValue> = numeric.iter().map(|(n, _)| DataValue::from(*n)).collect();

        let frame = DataFrame::new()
            .column("x", Column::new(x))?
            .column("y", Column::new(y))?
            .column("color", Column::categorical(hue, levels))?;
        let mut names = IndexMap::new();
        let mut ids = IndexMap::new();
        for var in ["x", "y", "color"] {
            names.insert(var.to_string(), None);
            ids.insert(var.to_string(), VariableId::Token(fresh_token()));
        }
        Ok(Self {
            frame,
            names,
            ids,
            frames: IndexMap::new(),
            source_data: Some(Arc::clone(data)),
            source_vars: Variables::new(),
        })
    }

    /// Overlay new assignments on this binding.
    ///
    /// `data` defaults to the original source; empty `variables` re-resolve
    /// the original assignments against `data`. Variables assigned
    /// [`VariableSpec::Null`] are dropped from the result.
    ///
    /// # Errors
    ///
    /// Propagates binding errors from the new assignments.
    pub fn join(&self, data: Option<&Arc<DataFrame>>, variables: Option<&Variables>) -> Result<Self> {
        let data = data.or(self.source_data.as_ref());
        let variables = match variables {
            Some(v) if !v.is_empty() => v,
            _ => &self.source_vars,
        };
        let disinherit: Vec<&str> = variables
            .iter()
            .filter(|(_, v)| matches!(v, VariableSpec::Null))
            .map(|(k, _)| k.as_str())
            .collect();

        let mut new = PlotData::new(data, variables)?;

        let inherited: Vec<(&str, &Column)> = self
            .frame
            .iter()
            .filter(|(name, _)| !new.frame.has_column(name) && !disinherit.contains(name))
            .collect();
        // Only columns that survive the overlay take part in the row count.
        let n_rows = if inherited.is_empty() { new.frame.nrow() } else { self.frame.nrow().max(new.frame.nrow()) };
        let mut frame = DataFrame::new();
        for (name, col) in inherited {
            frame.insert(name, pad(col, n_rows))?;
        }
        for (name, col) in new.frame.iter() {
            frame.insert(name, pad(col, n_rows))?;
        }

        let mut names: IndexMap<String, Option<String>> = self
            .names
            .iter()
            .filter(|(k, _)| !disinherit.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        names.extend(new.names.drain(..));
        let mut ids: IndexMap<String, VariableId> = self
            .ids
            .iter()
            .filter(|(k, _)| !disinherit.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ids.extend(new.ids.drain(..));

        Ok(Self {
            frame,
            names,
            ids,
            frames: IndexMap::new(),
            source_data: self.source_data.clone(),
            source_vars: self.source_vars.clone(),
        })
    }

    /// Whether any data is bound, either in the main frame or per pairing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.ncol() == 0 && self.frames.is_empty()
    }
}

fn pad(col: &Column, n: usize) -> Column {
    if col.len() >= n {
        return col.clone();
    }
    let mut out = col.clone();
    out.extend(&Column::nulls(n - col.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Arc<DataFrame> {
        Arc::new(
            DataFrame::new()
                .column("a", vec![1.0, 2.0, 3.0])
                .unwrap()
                .column("b", vec![4.0, 5.0, 6.0])
                .unwrap()
                .column("g", vec!["u", "v", "u"])
                .unwrap(),
        )
    }

    fn vars(pairs: &[(&str, VariableSpec)]) -> Variables {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_bind_columns() {
        let data = source();
        let p = PlotData::new(Some(&data), &vars(&[("x", "a".into()), ("color", "g".into())])).unwrap();
        assert_eq!(p.frame.columns(), vec!["x", "color"]);
        assert_eq!(p.names["x"], Some("a".to_string()));
        assert_eq!(p.ids["color"], VariableId::Name("g".into()));
    }

    #[test]
    fn test_missing_column_is_binding_error() {
        let data = source();
        let err = PlotData::new(Some(&data), &vars(&[("y", "zzz".into())])).unwrap_err();
        assert!(matches!(err, Error::Binding { ref variable, .. } if variable == "y"));
    }

    #[test]
    fn test_column_name_without_data() {
        let err = PlotData::new(None, &vars(&[("x", "a".into())])).unwrap_err();
        assert!(err.to_string().contains("no data was passed"));
    }

    #[test]
    fn test_vector_length_must_match_data() {
        let data = source();
        let err = PlotData::new(Some(&data), &vars(&[("x", VariableSpec::vector(vec![1.0]))]))
            .unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
    }

    #[test]
    fn test_vectors_must_agree_without_data() {
        let v = vars(&[
            ("x", VariableSpec::vector(vec![1.0, 2.0])),
            ("y", VariableSpec::vector(vec![1.0, 2.0, 3.0])),
        ]);
        assert!(PlotData::new(None, &v).is_err());
    }

    #[test]
    fn test_anonymous_vectors_get_distinct_ids() {
        let v = vars(&[
            ("x", VariableSpec::vector(vec![1.0, 2.0])),
            ("y", VariableSpec::vector(vec![1.0, 2.0])),
        ]);
        let p = PlotData::new(None, &v).unwrap();
        assert_ne!(p.ids["x"], p.ids["y"]);
        assert_eq!(p.names["x"], None);
    }

    #[test]
    fn test_join_overrides_and_inherits() {
        let data = source();
        let base = PlotData::new(Some(&data), &vars(&[("x", "a".into()), ("y", "b".into())])).unwrap();
        let joined = base.join(None, Some(&vars(&[("y", "a".into())]))).unwrap();
        assert_eq!(joined.frame.columns(), vec!["x", "y"]);
        assert_eq!(joined.names["y"], Some("a".to_string()));
        assert_eq!(base.names["y"], Some("b".to_string()));
    }

    #[test]
    fn test_join_null_disinherits() {
        let data = source();
        let base = PlotData::new(Some(&data), &vars(&[("x", "a".into()), ("color", "g".into())])).unwrap();
        let joined = base.join(None, Some(&vars(&[("color", VariableSpec::Null)]))).unwrap();
        assert!(!joined.frame.has_column("color"));
        assert!(!joined.names.contains_key("color"));
    }

    #[test]
    fn test_join_new_data_reuses_variables() {
        let data = source();
        let base = PlotData::new(Some(&data), &vars(&[("x", "a".into())])).unwrap();
        let other = Arc::new(DataFrame::new().column("a", vec![9.0, 8.0]).unwrap());
        let joined = base.join(Some(&other), None).unwrap();
        assert_eq!(joined.frame.numeric("x").unwrap(), vec![9.0, 8.0]);
        assert_eq!(joined.frame.nrow(), 2);
    }

    #[test]
    fn test_join_shorter_replacement_is_not_padded() {
        let data = source();
        let base = PlotData::new(Some(&data), &vars(&[("x", "a".into()), ("color", "g".into())])).unwrap();
        let other = Arc::new(DataFrame::new().column("c", vec![5.0]).unwrap());
        let joined =
            base.join(Some(&other), Some(&vars(&[("color", VariableSpec::Null), ("x", "c".into())]))).unwrap();
        assert_eq!(joined.frame.nrow(), 1);
        assert_eq!(joined.frame.numeric("x").unwrap(), vec![5.0]);
        assert!(!joined.frame.has_column("color"));
    }

    #[test]
    fn test_join_pads_shorter_columns() {
        let data = source();
        let base = PlotData::new(Some(&data), &vars(&[("x", "a".into())])).unwrap();
        let joined = base.join(None, Some(&vars(&[("y", VariableSpec::vector(vec![1.0, 2.0, 3.0, 4.0]))])));
        // The layer vector disagrees with the inherited source length.
        assert!(joined.is_err());
        let other = Arc::new(DataFrame::new().column("c", vec![1.0, 2.0, 3.0, 4.0]).unwrap());
        let joined = base.join(Some(&other), Some(&vars(&[("y", "c".into())]))).unwrap();
        assert_eq!(joined.frame.nrow(), 4);
        assert!(joined.frame.get("x").unwrap().values()[3].is_null());
    }

    #[test]
    fn test_wide_form_melts_numeric_columns() {
        let data = source();
        let p = PlotData::wide(&data).unwrap();
        assert_eq!(p.frame.nrow(), 6);
        assert_eq!(p.frame.numeric("x").unwrap(), vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(p.frame.numeric("y").unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let color = p.frame.get("color").unwrap();
        assert_eq!(color.categories().unwrap().len(), 2);
    }
}

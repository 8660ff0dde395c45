//! Columnar data model consumed by the plot compiler.
//!
//! A [`DataFrame`] is an insertion-ordered set of equal-length [`Column`]s.
//! Cells are [`DataValue`]s, which have a total order (for level sorting) and
//! hash by bit pattern (for level lookup). Numeric extraction turns anything
//! non-numeric into NaN, which every downstream step treats as missing.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A single cell value.
#[derive(Debug, Clone)]
pub enum DataValue {
    /// A numeric value. NaN counts as missing.
    Number(f64),
    /// A text value.
    Text(String),
    /// A boolean value.
    Bool(bool),
    /// A timestamp.
    DateTime(NaiveDateTime),
    /// A missing value.
    Null,
}

impl DataValue {
    /// Whether the value is missing (`Null` or a NaN number).
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric view: numbers as-is, booleans as 0/1, timestamps as fractional
    /// days since the Unix epoch.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) if !n.is_nan() => Some(*n),
            DataValue::Bool(b) => Some(f64::from(u8::from(*b))),
            DataValue::DateTime(dt) => Some(datetime_to_num(dt)),
            _ => None,
        }
    }

    /// Text view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean view: booleans, and numbers exactly 0 or 1.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            DataValue::Number(n) if *n == 0.0 => Some(false),
            DataValue::Number(n) if *n == 1.0 => Some(true),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DataValue::Bool(_) => 0,
            DataValue::Number(_) => 1,
            DataValue::DateTime(_) => 2,
            DataValue::Text(_) => 3,
            DataValue::Null => 4,
        }
    }
}

/// Fractional days since 1970-01-01, the numeric encoding of timestamps.
#[must_use]
pub fn datetime_to_num(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / 86_400_000.0
}

/// Inverse of [`datetime_to_num`].
#[must_use]
pub fn num_to_datetime(days: f64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_millis((days * 86_400_000.0).round() as i64)
        .map(|dt| dt.naive_utc())
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DataValue {}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DataValue::Number(a), DataValue::Number(b)) => a.total_cmp(b),
            (DataValue::Text(a), DataValue::Text(b)) => a.cmp(b),
            (DataValue::Bool(a), DataValue::Bool(b)) => a.cmp(b),
            (DataValue::DateTime(a), DataValue::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            DataValue::Number(n) => n.to_bits().hash(state),
            DataValue::Text(s) => s.hash(state),
            DataValue::Bool(b) => b.hash(state),
            DataValue::DateTime(dt) => dt.hash(state),
            DataValue::Null => {}
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Number(n) => write!(f, "{n}"),
            DataValue::Text(s) => f.write_str(s),
            DataValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            DataValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            DataValue::Null => f.write_str("null"),
        }
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Number(v)
    }
}

impl From<f32> for DataValue {
    fn from(v: f32) -> Self {
        DataValue::Number(f64::from(v))
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Number(f64::from(v))
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Number(v as f64)
    }
}

impl From<usize> for DataValue {
    fn from(v: usize) -> Self {
        DataValue::Number(v as f64)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Text(s)
    }
}

impl From<NaiveDateTime> for DataValue {
    fn from(dt: NaiveDateTime) -> Self {
        DataValue::DateTime(dt)
    }
}

impl From<NaiveDate> for DataValue {
    fn from(d: NaiveDate) -> Self {
        DataValue::DateTime(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DataValue::Null, Into::into)
    }
}

/// One column of values, optionally carrying an intrinsic category order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    values: Vec<DataValue>,
    categories: Option<Vec<DataValue>>,
}

impl Column {
    /// Column from any convertible values.
    pub fn new<T: Into<DataValue>>(values: impl IntoIterator<Item = T>) -> Self {
        Self { values: values.into_iter().map(Into::into).collect(), categories: None }
    }

    /// Categorical column whose level order is `categories`.
    pub fn categorical<T: Into<DataValue>, C: Into<DataValue>>(
        values: impl IntoIterator<Item = T>,
        categories: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            categories: Some(categories.into_iter().map(Into::into).collect()),
        }
    }

    /// Column of `n` missing values.
    #[must_use]
    pub fn nulls(n: usize) -> Self {
        Self { values: vec![DataValue::Null; n], categories: None }
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The values.
    #[must_use]
    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    /// Value at a row.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&DataValue> {
        self.values.get(row)
    }

    /// Intrinsic category order, if the column is categorical.
    #[must_use]
    pub fn categories(&self) -> Option<&[DataValue]> {
        self.categories.as_deref()
    }

    /// Values as `f64`, with NaN for anything non-numeric.
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect()
    }

    /// Rows selected by index, keeping categories.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            values: rows.iter().map(|&i| self.values.get(i).cloned().unwrap_or(DataValue::Null)).collect(),
            categories: self.categories.clone(),
        }
    }

    /// Append another column's values.
    pub fn extend(&mut self, other: &Column) {
        self.values.extend(other.values.iter().cloned());
    }

    /// Iterate over the values.
    pub fn iter(&self) -> std::slice::Iter<'_, DataValue> {
        self.values.iter()
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::new(v)
    }
}

impl From<Vec<DataValue>> for Column {
    fn from(values: Vec<DataValue>) -> Self {
        Self { values, categories: None }
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::new(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::new(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::new(v)
    }
}

impl From<Vec<i32>> for Column {
    fn from(v: Vec<i32>) -> Self {
        Column::new(v)
    }
}

impl From<Vec<NaiveDateTime>> for Column {
    fn from(v: Vec<NaiveDateTime>) -> Self {
        Column::new(v)
    }
}

impl<const N: usize> From<[f64; N]> for Column {
    fn from(v: [f64; N]) -> Self {
        Column::new(v)
    }
}

impl<const N: usize> From<[&str; N]> for Column {
    fn from(v: [&str; N]) -> Self {
        Column::new(v)
    }
}

impl<const N: usize> From<[bool; N]> for Column {
    fn from(v: [bool; N]) -> Self {
        Column::new(v)
    }
}

impl FromIterator<DataValue> for Column {
    fn from_iter<I: IntoIterator<Item = DataValue>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect(), categories: None }
    }
}

impl<'a> IntoIterator for &'a Column {
    type Item = &'a DataValue;
    type IntoIter = std::slice::Iter<'a, DataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Insertion-ordered table of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: IndexMap<String, Column>,
    n_rows: usize,
}

impl DataFrame {
    /// Create a new empty data frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insertion.
    ///
    /// # Errors
    ///
    /// Returns an error when the column length differs from existing columns.
    pub fn column(mut self, name: impl Into<String>, values: impl Into<Column>) -> Result<Self> {
        self.insert(name, values)?;
        Ok(self)
    }

    /// Insert or replace a column.
    ///
    /// # Errors
    ///
    /// Returns an error when the column length differs from existing columns.
    pub fn insert(&mut self, name: impl Into<String>, values: impl Into<Column>) -> Result<()> {
        let name = name.into();
        let col = values.into();
        let others = self.columns.keys().any(|k| *k != name);
        if others && col.len() != self.n_rows {
            return Err(Error::value(format!(
                "column `{name}` has {} rows but the frame has {}",
                col.len(),
                self.n_rows
            )));
        }
        self.n_rows = col.len();
        self.columns.insert(name, col);
        Ok(())
    }

    /// Remove a column, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Column> {
        let col = self.columns.shift_remove(name);
        if self.columns.is_empty() {
            self.n_rows = 0;
        }
        col
    }

    /// Rename a column in place, keeping its position.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.columns.get_index_of(from) {
            if let Some((_, col)) = self.columns.shift_remove_index(idx) {
                self.columns.shift_remove(to);
                let idx = idx.min(self.columns.len());
                self.columns.shift_insert(idx, to.to_string(), col);
            }
        }
    }

    /// Look up a column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Column as `f64`, NaN for non-numeric cells.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<Vec<f64>> {
        self.columns.get(name).map(Column::to_f64)
    }

    /// Number of rows.
    #[must_use]
    pub fn nrow(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn ncol(&self) -> usize {
        self.columns.len()
    }

    /// Whether a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Iterate over `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Rows selected by index.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|(k, c)| (k.clone(), c.take(rows))).collect(),
            n_rows: rows.len(),
        }
    }

    /// Rows where `keep` is true.
    #[must_use]
    pub fn filter(&self, keep: &[bool]) -> Self {
        let rows: Vec<usize> =
            keep.iter().enumerate().filter_map(|(i, &k)| k.then_some(i)).collect();
        self.take(&rows)
    }

    /// Rows with no missing value in any of `subset` (columns the frame
    /// lacks are ignored).
    #[must_use]
    pub fn drop_nulls(&self, subset: &[&str]) -> Self {
        let cols: Vec<&Column> = subset.iter().filter_map(|n| self.columns.get(*n)).collect();
        let keep: Vec<bool> = (0..self.n_rows)
            .map(|row| cols.iter().all(|c| c.get(row).is_some_and(|v| !v.is_null())))
            .collect();
        self.filter(&keep)
    }

    /// Rows reordered by a numeric column (stable; NaN last).
    #[must_use]
    pub fn sort_by_column(&self, name: &str) -> Self {
        let Some(keys) = self.numeric(name) else {
            return self.clone();
        };
        let mut rows: Vec<usize> = (0..self.n_rows).collect();
        rows.sort_by(|&a, &b| match (keys[a].is_nan(), keys[b].is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => keys[a].total_cmp(&keys[b]),
        });
        self.take(&rows)
    }

    /// Only the named columns, in the order given; unknown names are skipped.
    #[must_use]
    pub fn select(&self, names: &[&str]) -> Self {
        let columns: IndexMap<String, Column> = names
            .iter()
            .filter_map(|n| self.columns.get(*n).map(|c| ((*n).to_string(), c.clone())))
            .collect();
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Self { columns, n_rows }
    }

    /// Stack frames vertically. The result has the union of columns in
    /// first-seen order; cells for columns a frame lacks are null.
    #[must_use]
    pub fn concat<'a>(frames: impl IntoIterator<Item = &'a DataFrame>) -> Self {
        let frames: Vec<&DataFrame> = frames.into_iter().collect();
        let mut columns: IndexMap<String, Column> = IndexMap::new();
        let mut n_rows = 0;
        for frame in &frames {
            for name in frame.columns.keys() {
                columns.entry(name.clone()).or_insert_with(|| Column::nulls(n_rows));
            }
            for (name, col) in &mut columns {
                match frame.columns.get(name) {
                    Some(src) => {
                        if col.categories.is_none() {
                            col.categories.clone_from(&src.categories);
                        }
                        col.extend(src);
                    }
                    None => col.extend(&Column::nulls(frame.n_rows)),
                }
            }
            n_rows += frame.n_rows;
        }
        Self { columns, n_rows }
    }
}

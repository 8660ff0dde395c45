//! Variable type inference and canonical level ordering.

use std::collections::HashSet;
use std::fmt;

use super::data::{Column, DataValue};

/// Broad kind of a data column, used to choose default scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    /// Numbers (booleans count as numbers unless requested otherwise).
    Numeric,
    /// Timestamps.
    Datetime,
    /// Anything else, including strings and mixed columns.
    Categorical,
    /// Only true/false (or 0/1) values.
    Boolean,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarType::Numeric => "numeric",
            VarType::Datetime => "datetime",
            VarType::Categorical => "categorical",
            VarType::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// Classify a column.
///
/// A column with intrinsic categories is categorical. An all-missing column is
/// numeric. Boolean-looking data is reported as `boolean_type`: with
/// `strict_boolean` only true boolean cells qualify, otherwise numbers that
/// are exactly 0 or 1 do as well. Mixed columns fall through to categorical.
///
/// ```
/// use trueno_plot::grammar::{variable_type, Column, VarType};
///
/// let col = Column::from(vec![true, false]);
/// assert_eq!(variable_type(&col, VarType::Boolean, true), VarType::Boolean);
/// assert_eq!(variable_type(&col, VarType::Numeric, true), VarType::Numeric);
/// ```
#[must_use]
pub fn variable_type(col: &Column, boolean_type: VarType, strict_boolean: bool) -> VarType {
    if col.categories().is_some() {
        return VarType::Categorical;
    }
    let present: Vec<&DataValue> = col.iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return VarType::Numeric;
    }

    let boolean = if strict_boolean {
        present.iter().all(|v| matches!(v, DataValue::Bool(_)))
    } else {
        present.iter().all(|v| v.as_bool().is_some())
    };
    if boolean {
        return boolean_type;
    }

    if present.iter().all(|v| matches!(v, DataValue::Number(_) | DataValue::Bool(_))) {
        return VarType::Numeric;
    }
    if present.iter().all(|v| matches!(v, DataValue::DateTime(_))) {
        return VarType::Datetime;
    }
    VarType::Categorical
}

/// Ordered unique levels of a column, nulls excluded.
///
/// An explicit `order` is returned verbatim, including levels the data never
/// shows. Otherwise intrinsic categories win, numeric and datetime data are
/// sorted, and everything else keeps first-seen order.
///
/// ```
/// use trueno_plot::grammar::{categorical_order, Column, DataValue};
///
/// let col = Column::from(vec!["b", "a", "c"]);
/// let order: Vec<DataValue> = vec!["c".into(), "a".into(), "b".into()];
/// assert_eq!(categorical_order(&col, Some(&order)), order);
/// ```
#[must_use]
pub fn categorical_order(col: &Column, order: Option<&[DataValue]>) -> Vec<DataValue> {
    if let Some(order) = order {
        return order.to_vec();
    }
    if let Some(categories) = col.categories() {
        return categories.iter().filter(|v| !v.is_null()).cloned().collect();
    }

    let mut seen = HashSet::new();
    let mut levels: Vec<DataValue> =
        col.iter().filter(|v| !v.is_null() && seen.insert(*v)).cloned().collect();
    if matches!(
        variable_type(col, VarType::Numeric, true),
        VarType::Numeric | VarType::Datetime
    ) {
        levels.sort();
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strs(values: &[&str]) -> Vec<DataValue> {
        values.iter().map(|s| DataValue::from(*s)).collect()
    }

    #[test]
    fn test_numeric() {
        let col = Column::from(vec![1.0, 2.5, f64::NAN]);
        assert_eq!(variable_type(&col, VarType::Numeric, false), VarType::Numeric);
    }

    #[test]
    fn test_all_missing_is_numeric() {
        assert_eq!(variable_type(&Column::nulls(3), VarType::Boolean, true), VarType::Numeric);
    }

    #[test]
    fn test_loose_boolean_accepts_zero_one() {
        let col = Column::from(vec![0.0, 1.0, 1.0]);
        assert_eq!(variable_type(&col, VarType::Boolean, false), VarType::Boolean);
        assert_eq!(variable_type(&col, VarType::Boolean, true), VarType::Numeric);
    }

    #[test]
    fn test_strings_and_mixed_are_categorical() {
        assert_eq!(
            variable_type(&Column::from(vec!["a", "b"]), VarType::Numeric, false),
            VarType::Categorical
        );
        let mixed = Column::new(vec![DataValue::from(1.0), DataValue::from("a")]);
        assert_eq!(variable_type(&mixed, VarType::Numeric, false), VarType::Categorical);
    }

    #[test]
    fn test_datetime() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)).unwrap();
        let col = Column::from(vec![d, d]);
        assert_eq!(variable_type(&col, VarType::Numeric, false), VarType::Datetime);
    }

    #[test]
    fn test_categorical_dtype_wins() {
        let col = Column::categorical(vec![1.0, 2.0], vec![2.0, 1.0]);
        assert_eq!(variable_type(&col, VarType::Numeric, false), VarType::Categorical);
        assert_eq!(
            categorical_order(&col, None),
            vec![DataValue::from(2.0), DataValue::from(1.0)]
        );
    }

    #[test]
    fn test_explicit_order_verbatim() {
        let col = Column::from(vec!["b", "a", "c"]);
        let order = strs(&["c", "a", "b"]);
        assert_eq!(categorical_order(&col, Some(&order)), strs(&["c", "a", "b"]));
    }

    #[test]
    fn test_explicit_order_keeps_absent_levels() {
        let col = Column::from(vec!["a"]);
        let order = strs(&["z", "a"]);
        assert_eq!(categorical_order(&col, Some(&order)).len(), 2);
    }

    #[test]
    fn test_strings_first_seen() {
        let col = Column::from(vec!["b", "a", "b", "c"]);
        assert_eq!(categorical_order(&col, None), strs(&["b", "a", "c"]));
    }

    #[test]
    fn test_numbers_sorted_without_nulls() {
        let col = Column::from(vec![3.0, f64::NAN, 1.0, 2.0, 1.0]);
        let expected: Vec<DataValue> = vec![1.0.into(), 2.0.into(), 3.0.into()];
        assert_eq!(categorical_order(&col, None), expected);
    }

    #[test]
    fn test_booleans_sorted_false_first() {
        let col = Column::from(vec![true, false, true]);
        assert_eq!(categorical_order(&col, None), vec![false.into(), true.into()]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_numeric_order_is_sorted_and_unique(values in prop::collection::vec(-50i32..50, 0..40)) {
                let col = Column::from(values.clone());
                let levels = categorical_order(&col, None);
                prop_assert!(levels.windows(2).all(|w| w[0] < w[1]));
                let mut expected: Vec<i32> = values;
                expected.sort_unstable();
                expected.dedup();
                prop_assert_eq!(levels.len(), expected.len());
            }

            #[test]
            fn prop_string_order_independent_of_duplicates(words in prop::collection::vec("[a-e]", 1..30)) {
                let col = Column::from(words.clone());
                let levels = categorical_order(&col, None);
                let first = DataValue::from(words[0].as_str());
                prop_assert_eq!(&levels[0], &first);
                let set: HashSet<_> = words.iter().collect();
                prop_assert_eq!(levels.len(), set.len());
            }
        }
    }
}

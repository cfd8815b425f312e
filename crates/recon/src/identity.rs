use std::collections::BTreeMap;

use crate::audit::AuditLog;
use crate::model::{mixed_key_types, Dataset, KeyValue};

/// Primary-key gate. Joins on a missing or non-unique key are meaningless,
/// so callers must stop when this returns false.
pub fn validate_identity(old: &Dataset, new: &Dataset, pkey: &str, log: &mut AuditLog) -> bool {
    log.debug("Testing primary key", true);

    if !old.has_column(pkey) || !new.has_column(pkey) {
        log.error(format!(
            "Primary key {pkey} not found in one or both of the datasets"
        ));
        return false;
    }

    for (label, dataset) in [("old", old), ("new", new)] {
        if !key_is_unique(dataset, pkey) {
            log.error(format!("Primary key {pkey} not unique in {label} dataset"));
            return false;
        }
    }

    if let (Some(o), Some(n)) = (old.column(pkey), new.column(pkey)) {
        if mixed_key_types(o, n) {
            log.warning(format!(
                "Primary key {pkey} is numeric in one dataset and text in the other; matching on rendered values"
            ));
        }
    }

    log.debug("Primary key tests pass", false);
    true
}

/// True when every row has a distinct `pkey` value (nulls count as one value).
/// A dataset without the column has no unique key.
pub fn key_is_unique(dataset: &Dataset, pkey: &str) -> bool {
    dataset
        .column(pkey)
        .map(|col| col.distinct_count() == dataset.row_count())
        .unwrap_or(false)
}

/// Key values that occur more than once, with their counts, in key order.
pub fn duplicate_keys(dataset: &Dataset, pkey: &str) -> Vec<(KeyValue, usize)> {
    let Some(col) = dataset.column(pkey) else {
        return Vec::new();
    };
    let mut counts: BTreeMap<KeyValue, usize> = BTreeMap::new();
    for value in &col.values {
        *counts.entry(value.key()).or_default() += 1;
    }
    counts.into_iter().filter(|(_, n)| *n > 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogSeverity;
    use crate::model::Value;

    fn ds(keys: Vec<Value>) -> Dataset {
        let rows = keys.into_iter().map(|k| vec![k, "x".into()]).collect();
        Dataset::from_rows(&["id", "val"], rows).unwrap()
    }

    #[test]
    fn unique_keys_pass() {
        let mut log = AuditLog::new();
        let old = ds(vec![1.0.into(), 2.0.into()]);
        let new = ds(vec![2.0.into(), 3.0.into()]);
        assert!(validate_identity(&old, &new, "id", &mut log));
        assert!(!log.error_detected());
        assert_eq!(log.entries().len(), 2);
        assert!(log.entries()[0].header);
        assert_eq!(log.entries()[1].severity, LogSeverity::Debug);
    }

    #[test]
    fn missing_key_fails() {
        let mut log = AuditLog::new();
        let old = ds(vec![1.0.into()]);
        let new = Dataset::from_rows(&["other"], vec![vec![1.0.into()]]).unwrap();
        assert!(!validate_identity(&old, &new, "id", &mut log));
        assert!(log.error_detected());
        assert!(log.entries()[1].message.contains("not found"));
    }

    #[test]
    fn duplicate_in_new_fails() {
        let mut log = AuditLog::new();
        let old = ds(vec![1.0.into(), 2.0.into()]);
        let new = ds(vec!["a".into(), "a".into()]);
        assert!(!validate_identity(&old, &new, "id", &mut log));
        assert!(log.entries()[1].message.contains("not unique in new"));
    }

    #[test]
    fn mixed_key_types_warn_but_pass() {
        let mut log = AuditLog::new();
        let old = ds(vec![1001.0.into(), 1002.0.into()]);
        let new = ds(vec!["1001".into(), "X9".into()]);
        assert!(validate_identity(&old, &new, "id", &mut log));
        assert!(!log.error_detected());
        assert_eq!(log.count(LogSeverity::Warning), 1);
        assert!(log.entries()[1].message.contains("numeric in one dataset and text in the other"));
    }

    #[test]
    fn two_nulls_are_duplicates() {
        let with_nulls = ds(vec![Value::Null, Value::Null]);
        assert!(!key_is_unique(&with_nulls, "id"));
        let one_null = ds(vec![Value::Null, 1.0.into()]);
        assert!(key_is_unique(&one_null, "id"));
    }

    #[test]
    fn empty_datasets_pass() {
        let mut log = AuditLog::new();
        let empty = ds(vec![]);
        assert!(validate_identity(&empty, &empty, "id", &mut log));
    }

    #[test]
    fn duplicates_are_counted() {
        let data = ds(vec![3.0.into(), 1.0.into(), 3.0.into(), Value::Null, Value::Null, 3.0.into()]);
        assert_eq!(
            duplicate_keys(&data, "id"),
            vec![(Value::Null.key(), 2), (Value::Number(3.0).key(), 3)]
        );
        assert!(duplicate_keys(&data, "missing").is_empty());
    }
}

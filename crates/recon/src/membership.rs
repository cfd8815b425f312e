use std::collections::BTreeSet;

use crate::audit::AuditLog;
use crate::model::{join_keys, Column, Dataset, KeyValue, MembershipReport, Value};

/// Compare the primary-key sets of both datasets.
///
/// Purely diagnostic: a membership gap is logged as a warning and reported,
/// never treated as fatal. Rows present on only one side are left out of
/// content comparison by the join.
pub fn compare_membership(
    old: &Dataset,
    new: &Dataset,
    pkey: &str,
    log: &mut AuditLog,
) -> MembershipReport {
    log.debug("Testing joins", true);

    let (old_keys, new_keys) = key_sets(old, new, pkey);

    let old_only: Vec<KeyValue> = old_keys.difference(&new_keys).cloned().collect();
    let new_only: Vec<KeyValue> = new_keys.difference(&old_keys).cloned().collect();
    let shared = old_keys.intersection(&new_keys).count();

    let report = MembershipReport {
        old_keys: old_keys.len(),
        new_keys: new_keys.len(),
        shared,
        old_only_pct: percent_of(old_only.len(), old_keys.len()),
        new_only_pct: percent_of(new_only.len(), new_keys.len()),
        old_only,
        new_only,
    };

    if !report.old_only.is_empty() {
        log.warning(format!(
            "Rows in old not in new: {} ({}%)",
            report.old_only.len(),
            report.old_only_pct
        ));
    }
    if !report.new_only.is_empty() {
        log.warning(format!(
            "Rows in new not in old: {} ({}%)",
            report.new_only.len(),
            report.new_only_pct
        ));
    }
    if report.issues() == 0 {
        log.debug("Join tests pass", false);
    }

    report
}

fn key_sets(old: &Dataset, new: &Dataset, pkey: &str) -> (BTreeSet<KeyValue>, BTreeSet<KeyValue>) {
    match (old.column(pkey), new.column(pkey)) {
        (Some(o), Some(n)) => {
            let (o, n) = join_keys(o, n);
            (o.into_iter().collect(), n.into_iter().collect())
        }
        (o, n) => {
            let native = |col: Option<&Column>| {
                col.map(|c| c.values.iter().map(Value::key).collect()).unwrap_or_default()
            };
            (native(o), native(n))
        }
    }
}

/// Share of `total` as a percentage with two decimals; an empty side is 0%.
fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogSeverity;

    fn keyed(keys: &[f64]) -> Dataset {
        let rows = keys.iter().map(|k| vec![Value::Number(*k)]).collect();
        Dataset::from_rows(&["id"], rows).unwrap()
    }

    #[test]
    fn overlapping_keys() {
        let mut log = AuditLog::new();
        let report = compare_membership(&keyed(&[1.0, 2.0, 3.0]), &keyed(&[2.0, 3.0, 4.0]), "id", &mut log);

        assert_eq!(report.shared, 2);
        assert_eq!(report.old_only, vec![Value::Number(1.0).key()]);
        assert_eq!(report.new_only, vec![Value::Number(4.0).key()]);
        assert_eq!(report.old_only_pct, 33.33);
        assert_eq!(report.new_only_pct, 33.33);
        assert_eq!(report.issues(), 2);
        assert_eq!(log.count(LogSeverity::Warning), 2);
        assert!(log.entries()[1].message.contains("Rows in old not in new: 1 (33.33%)"));
    }

    #[test]
    fn identical_keys_confirm() {
        let mut log = AuditLog::new();
        let report = compare_membership(&keyed(&[1.0, 2.0]), &keyed(&[2.0, 1.0]), "id", &mut log);
        assert_eq!(report.issues(), 0);
        assert!(!log.warning_detected());
        assert_eq!(log.entries().last().unwrap().message, "Join tests pass");
    }

    #[test]
    fn disjoint_keys() {
        let mut log = AuditLog::new();
        let report = compare_membership(&keyed(&[1.0, 2.0]), &keyed(&[3.0, 4.0]), "id", &mut log);

        assert_eq!(report.shared, 0);
        assert_eq!(report.old_only, vec![Value::Number(1.0).key(), Value::Number(2.0).key()]);
        assert_eq!(report.new_only, vec![Value::Number(3.0).key(), Value::Number(4.0).key()]);
        assert_eq!(report.old_only_pct, 100.0);
        assert_eq!(report.new_only_pct, 100.0);
        assert_eq!(log.count(LogSeverity::Warning), 2);
        assert!(log.entries()[1].message.contains("Rows in old not in new: 2 (100%)"));
        assert!(log.entries()[2].message.contains("Rows in new not in old: 2 (100%)"));
    }

    #[test]
    fn numeric_keys_meet_text_keys() {
        let old = keyed(&[1001.0, 1002.0]);
        let new = Dataset::from_rows(&["id"], vec![vec!["1001".into()], vec!["1002".into()], vec!["X9".into()]])
            .unwrap();
        let mut log = AuditLog::new();
        let report = compare_membership(&old, &new, "id", &mut log);

        assert_eq!(report.shared, 2);
        assert!(report.old_only.is_empty());
        assert_eq!(report.new_only, vec![KeyValue::Text("X9".into())]);
        assert_eq!(log.count(LogSeverity::Warning), 1);
    }

    #[test]
    fn empty_side_reports_zero_percent() {
        let mut log = AuditLog::new();
        let report = compare_membership(&keyed(&[]), &keyed(&[7.0]), "id", &mut log);
        assert_eq!(report.old_only_pct, 0.0);
        assert!(report.old_only.is_empty());
        assert_eq!(report.new_only_pct, 100.0);
        assert_eq!(report.issues(), 1);

        let mut log = AuditLog::new();
        let report = compare_membership(&keyed(&[]), &keyed(&[]), "id", &mut log);
        assert_eq!(report.issues(), 0);
        assert_eq!(report.new_only_pct, 0.0);
    }
}

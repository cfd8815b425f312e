use crate::audit::AuditLog;
use crate::model::{Dataset, StructureReport};

/// Column-set parity. Returns true iff both datasets carry the same column names.
///
/// The default pipeline keeps going on `false` and compares the intersection.
pub fn compare_columns(old: &Dataset, new: &Dataset, log: &mut AuditLog) -> bool {
    column_differences(old, new, log).identical()
}

/// Same check as [`compare_columns`], returning the full breakdown.
/// Shared columns keep old's order; one-sided columns keep their own side's order.
pub fn column_differences(old: &Dataset, new: &Dataset, log: &mut AuditLog) -> StructureReport {
    log.debug("Comparing columns", true);

    let shared: Vec<String> = old
        .column_names()
        .filter(|c| new.has_column(c))
        .map(String::from)
        .collect();
    let old_only: Vec<String> = old
        .column_names()
        .filter(|c| !new.has_column(c))
        .map(String::from)
        .collect();
    let new_only: Vec<String> = new
        .column_names()
        .filter(|c| !old.has_column(c))
        .map(String::from)
        .collect();

    if !old_only.is_empty() {
        log.warning(format!(
            "There are {} columns in old not in new: {}",
            old_only.len(),
            old_only.join(" ")
        ));
    }
    if !new_only.is_empty() {
        log.warning(format!(
            "There are {} columns in new not in old: {}",
            new_only.len(),
            new_only.join(" ")
        ));
    }

    let report = StructureReport {
        shared,
        old_only,
        new_only,
    };
    if report.identical() {
        log.debug("Columns match exactly", false);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogSeverity;

    fn with_columns(names: &[&str]) -> Dataset {
        Dataset::from_rows(names, Vec::new()).unwrap()
    }

    #[test]
    fn identical_columns_in_any_order() {
        let mut log = AuditLog::new();
        assert!(compare_columns(
            &with_columns(&["id", "a", "b"]),
            &with_columns(&["b", "id", "a"]),
            &mut log
        ));
        assert!(!log.warning_detected());
    }

    #[test]
    fn one_sided_columns_are_issues() {
        let mut log = AuditLog::new();
        let report = column_differences(
            &with_columns(&["id", "legacy", "a"]),
            &with_columns(&["id", "a", "extra1", "extra2"]),
            &mut log,
        );
        assert_eq!(report.shared, vec!["id", "a"]);
        assert_eq!(report.old_only, vec!["legacy"]);
        assert_eq!(report.new_only, vec!["extra1", "extra2"]);
        assert_eq!(report.issues(), 2);
        assert_eq!(log.count(LogSeverity::Warning), 2);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message == "There are 2 columns in new not in old: extra1 extra2"));
    }
}

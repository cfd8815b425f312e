use tracing::info_span;

use crate::audit::AuditLog;
use crate::config::{ComparisonOptions, ReconConfig};
use crate::content::compare_content;
use crate::error::Result;
use crate::identity::validate_identity;
use crate::mapping::apply_value_mappings;
use crate::membership::compare_membership;
use crate::model::{
    ContentReport, Dataset, JoinedDataset, MembershipReport, ReconInput, ReconMeta, ReconResult,
    RunStatus, StructureReport,
};
use crate::structure::column_differences;

/// Everything a completed (non-aborted) comparison produces.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub joined: JoinedDataset,
    pub membership: MembershipReport,
    pub structure: StructureReport,
    pub content: ContentReport,
}

/// Run the pipeline on two loaded datasets.
///
/// Excluded columns are dropped from `old` and its value mappings applied
/// before the identity gate. `Ok(None)` means the gate failed and nothing
/// after it ran. Membership and column differences never stop the run.
pub fn run_comparison(
    mut old: Dataset,
    new: &Dataset,
    options: &ComparisonOptions,
    log: &mut AuditLog,
) -> Result<Option<ComparisonOutcome>> {
    let pkey = options.primary_key.as_str();
    let span = info_span!("comparison", pkey);
    let _enter = span.enter();

    log.debug("Starting comparison", true);
    log.debug(format!("Numeral tolerances: {}", options.tolerance), false);

    let dropped = old.drop_columns(&options.exclude_old_columns);
    if !dropped.is_empty() {
        log.debug(format!("Dropped columns from old: {}", dropped.join(" ")), false);
    }

    let old = apply_value_mappings(old, &options.value_mappings, log);

    if !validate_identity(&old, new, pkey, log) {
        log.debug("Aborting comparison", true);
        return Ok(None);
    }

    let membership = compare_membership(&old, new, pkey, log);
    let structure = column_differences(&old, new, log);
    let content = compare_content(&old, new, options, log)?;

    log.debug("Completed comparison", true);

    if let Some(path) = &options.out_file {
        log.store(path)?;
    }

    Ok(Some(ComparisonOutcome {
        joined: content.joined,
        membership,
        structure,
        content: content.report,
    }))
}

/// Run a configured comparison and package the result.
pub fn run(config: &ReconConfig, input: ReconInput, log: &mut AuditLog) -> Result<ReconResult> {
    let outcome = run_comparison(input.old, &input.new, &config.comparison, log)?;

    let meta = ReconMeta {
        config_name: config.name.clone(),
        primary_key: config.comparison.primary_key.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    };

    let (status, membership, structure, content, joined) = match outcome {
        Some(o) => (
            RunStatus::Done,
            Some(o.membership),
            Some(o.structure),
            Some(o.content),
            Some(o.joined),
        ),
        None => (RunStatus::Aborted, None, None, None, None),
    };

    Ok(ReconResult {
        meta,
        status,
        membership,
        structure,
        content,
        warning_detected: log.warning_detected(),
        error_detected: log.error_detected(),
        log: log.entries().to_vec(),
        joined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogSeverity;
    use crate::model::Value;

    fn ds(headers: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::from_rows(headers, rows).unwrap()
    }

    fn messages(log: &AuditLog) -> Vec<&str> {
        log.entries().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn aborts_on_duplicate_key() {
        let old = ds(&["id", "v"], vec![vec![1.0.into(), "a".into()], vec![1.0.into(), "b".into()]]);
        let new = ds(&["id", "v"], vec![vec![1.0.into(), "a".into()]]);
        let mut log = AuditLog::new();

        let outcome = run_comparison(old, &new, &ComparisonOptions::new("id"), &mut log).unwrap();
        assert!(outcome.is_none());
        assert!(log.error_detected());
        assert!(!messages(&log).contains(&"Testing joins"));
    }

    #[test]
    fn excluded_columns_are_dropped_before_checks() {
        let old = ds(
            &["id", "v", "legacy"],
            vec![vec![1.0.into(), "a".into(), "x".into()]],
        );
        let new = ds(&["id", "v"], vec![vec![1.0.into(), "a".into()]]);
        let mut opts = ComparisonOptions::new("id");
        opts.exclude_old_columns = vec!["legacy".into()];
        let mut log = AuditLog::new();

        let outcome = run_comparison(old, &new, &opts, &mut log).unwrap().unwrap();
        assert!(outcome.structure.identical());
        assert!(!log.warning_detected());
        assert_eq!(log.count(LogSeverity::Error), 0);
    }

    #[test]
    fn mappings_apply_to_old_before_content() {
        let old = ds(&["id", "status"], vec![vec![1.0.into(), "A".into()], vec![2.0.into(), Value::Null]]);
        let new = ds(
            &["id", "status"],
            vec![vec![1.0.into(), "Active".into()], vec![2.0.into(), "Unknown".into()]],
        );
        let mut opts = ComparisonOptions::new("id");
        let mut status = indexmap::IndexMap::new();
        status.insert("A".to_string(), Value::text("Active"));
        status.insert("null".to_string(), Value::text("Unknown"));
        opts.value_mappings.insert("status".into(), status);
        let mut log = AuditLog::new();

        let outcome = run_comparison(old, &new, &opts, &mut log).unwrap().unwrap();
        assert_eq!(outcome.content.column("status").unwrap().match_rate, 1.0);
    }

    #[test]
    fn membership_scenario_restricts_content_to_shared_keys() {
        let old = ds(
            &["id", "v"],
            vec![vec![1.0.into(), "a".into()], vec![2.0.into(), "b".into()], vec![3.0.into(), "c".into()]],
        );
        let new = ds(
            &["id", "v"],
            vec![vec![2.0.into(), "b".into()], vec![3.0.into(), "c".into()], vec![4.0.into(), "d".into()]],
        );
        let mut log = AuditLog::new();

        let outcome = run_comparison(old, &new, &ComparisonOptions::new("id"), &mut log).unwrap().unwrap();
        assert_eq!(outcome.membership.old_only, vec![Value::Number(1.0).key()]);
        assert_eq!(outcome.membership.new_only, vec![Value::Number(4.0).key()]);
        assert_eq!(outcome.membership.old_only_pct, 33.33);
        assert_eq!(outcome.content.joined_rows, 2);
        assert_eq!(outcome.content.column("v").unwrap().match_rate, 1.0);
        assert_eq!(outcome.joined.row_count(), 2);
    }

    #[test]
    fn stage_headers_in_order() {
        let old = ds(&["id"], vec![vec![1.0.into()]]);
        let mut log = AuditLog::new();
        run_comparison(old.clone(), &old, &ComparisonOptions::new("id"), &mut log).unwrap();

        let headers: Vec<&str> = log
            .entries()
            .iter()
            .filter(|e| e.header)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(
            headers,
            vec![
                "Starting comparison",
                "Testing primary key",
                "Testing joins",
                "Comparing columns",
                "Comparing content",
                "Completed comparison",
            ]
        );
        assert!(messages(&log).contains(&"Numeral tolerances: 0.0001"));
    }

    #[test]
    fn stores_log_when_out_file_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let old = ds(&["id"], vec![vec![1.0.into()]]);
        let mut opts = ComparisonOptions::new("id");
        opts.out_file = Some(path.clone());
        let mut log = AuditLog::new();

        run_comparison(old.clone(), &old, &opts, &mut log).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.lines().last().unwrap().ends_with("DEBUG Completed comparison"));
    }

    #[test]
    fn run_reports_aborted_status() {
        let config = ReconConfig::from_toml(
            "name = \"t\"\n[old]\nfile = \"a\"\n[new]\nfile = \"b\"\n[comparison]\nprimary_key = \"id\"\n",
        )
        .unwrap();
        let input = ReconInput {
            old: ds(&["key"], vec![vec![1.0.into()]]),
            new: ds(&["id"], vec![vec![1.0.into()]]),
        };
        let mut log = AuditLog::new();

        let result = run(&config, input, &mut log).unwrap();
        assert_eq!(result.status, RunStatus::Aborted);
        assert!(result.content.is_none());
        assert!(result.error_detected);
        assert_eq!(result.meta.primary_key, "id");
    }
}

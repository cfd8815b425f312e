use std::path::PathBuf;

use parity_recon::config::SourceConfig;
use parity_recon::loader::{load_dataset, LoadOptions};
use parity_recon::model::{FieldCategory, KeyValue, ReconInput, ReconResult, RunStatus, Severity, Value};
use parity_recon::{run, AuditLog, Dataset, LogSeverity, ReconConfig};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_source(source: &SourceConfig, log: &mut AuditLog) -> Dataset {
    let path = fixtures_dir().join(&source.file);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let options = LoadOptions::with_delimiter(source.delimiter.byte());
    load_dataset(source.label(), &text, &options, log).unwrap()
}

fn load_and_run(config_toml: &str) -> (ReconResult, AuditLog) {
    let config = ReconConfig::from_toml(config_toml).unwrap();
    let mut log = AuditLog::new();
    let input = ReconInput {
        old: load_source(&config.old, &mut log),
        new: load_source(&config.new, &mut log),
    };
    let result = run(&config, input, &mut log).unwrap();
    (result, log)
}

fn case_info_toml() -> String {
    std::fs::read_to_string(fixtures_dir().join("case_info.recon.toml")).unwrap()
}

fn key(n: f64) -> KeyValue {
    Value::Number(n).key()
}

// -------------------------------------------------------------------------
// Full run
// -------------------------------------------------------------------------

#[test]
fn case_info_full_run() {
    let (result, log) = load_and_run(&case_info_toml());

    assert_eq!(result.status, RunStatus::Done);
    assert_eq!(result.meta.config_name, "case_info");
    assert!(result.warning_detected);
    assert!(result.error_detected);

    let membership = result.membership.as_ref().unwrap();
    assert_eq!(membership.old_keys, 10);
    assert_eq!(membership.new_keys, 10);
    assert_eq!(membership.shared, 9);
    assert_eq!(membership.old_only, vec![key(1001.0)]);
    assert_eq!(membership.new_only, vec![key(1011.0)]);
    assert_eq!(membership.old_only_pct, 10.0);

    // CostsUnbilled was excluded, so only Region differs
    let structure = result.structure.as_ref().unwrap();
    assert!(structure.old_only.is_empty());
    assert_eq!(structure.new_only, vec!["Region"]);

    let content = result.content.as_ref().unwrap();
    assert_eq!(content.joined_rows, 9);
    let names: Vec<&str> = content.columns.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(names, vec!["Status", "TotalCharge", "DateOpened", "PostCode"]);

    let status = content.column("Status").unwrap();
    assert_eq!(status.category, FieldCategory::Exact);
    assert_eq!(status.match_rate, 1.0);

    let charge = content.column("TotalCharge").unwrap();
    assert_eq!(charge.category, FieldCategory::Numeric);
    assert_eq!(charge.tolerance, Some(0.01));
    assert_eq!(charge.matched_rows, 8);
    assert_eq!(charge.severity, Some(Severity::Error));

    let opened = content.column("DateOpened").unwrap();
    assert_eq!(opened.category, FieldCategory::Date);
    assert_eq!(opened.match_rate, 1.0);

    assert_eq!(content.column("PostCode").unwrap().category, FieldCategory::Exact);
    assert_eq!(content.column("PostCode").unwrap().match_rate, 1.0);
    assert_eq!(content.issues.total(), 1);

    let joined = result.joined.as_ref().unwrap();
    assert_eq!(joined.mismatched_keys("TotalCharge"), vec![&key(1010.0)]);

    let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"Read 10 rows from legacy extract"));
    assert!(messages.contains(&"Read 10 rows from case_info_new.csv"));
    assert!(messages.contains(&"Rows in old not in new: 1 (10%)"));
    assert!(messages.contains(&"There are 1 columns in new not in old: Region"));
    assert_eq!(log.count(LogSeverity::Error), 1);
}

#[test]
fn duplicate_key_aborts_run() {
    let toml = case_info_toml().replace("case_info_new.csv", "case_info_dup.csv");
    let (result, log) = load_and_run(&toml);

    assert_eq!(result.status, RunStatus::Aborted);
    assert!(result.membership.is_none());
    assert!(result.content.is_none());
    assert!(result.joined.is_none());
    assert!(log
        .entries()
        .iter()
        .any(|e| e.message == "Primary key CaseNumber not unique in new dataset"));
}

#[test]
fn month_first_reading_breaks_ambiguous_dates() {
    // 05/06/2023 read month-first is May 6th, which no longer matches 2023-06-05
    let toml = case_info_toml().replace("day_first = true", "day_first = false");
    let (result, _) = load_and_run(&toml);

    let opened = result.content.as_ref().unwrap().column("DateOpened").unwrap();
    assert_eq!(opened.compared_rows, 9);
    assert!(opened.match_rate < 1.0);
}

#[test]
fn without_mappings_status_fails() {
    let toml = case_info_toml();
    let cut = toml.find("[comparison.value_mappings.Status]").unwrap();
    let end = toml.find("[output]").unwrap();
    let toml = format!("{}{}", &toml[..cut], &toml[end..]);

    let (result, _) = load_and_run(&toml);
    let status = result.content.as_ref().unwrap().column("Status").unwrap();
    assert_eq!(status.match_rate, 0.0);
    assert_eq!(status.severity, Some(Severity::Error));
}

#[test]
fn identical_inputs_are_clean() {
    let toml = case_info_toml().replace("case_info_new.csv", "case_info_old.txt");
    let toml = toml.replace("[new]\n", "[new]\ndelimiter = \"tab\"\n");
    let toml = toml.replace("exclude_old_columns = [\"CostsUnbilled\"]\n", "");
    let cut = toml.find("[comparison.value_mappings.Status]").unwrap();
    let end = toml.find("[output]").unwrap();
    let toml = format!("{}{}", &toml[..cut], &toml[end..]);

    let (result, log) = load_and_run(&toml);
    assert_eq!(result.status, RunStatus::Done);
    assert!(!result.warning_detected);
    assert!(!result.error_detected);
    assert!(result.content.as_ref().unwrap().match_rates().values().all(|r| *r == 1.0));
    assert_eq!(log.count(LogSeverity::Warning), 0);
}

// -------------------------------------------------------------------------
// Outputs
// -------------------------------------------------------------------------

#[test]
fn json_report_shape() {
    let (result, _) = load_and_run(&case_info_toml());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["status"], "done");
    assert_eq!(json["meta"]["primary_key"], "CaseNumber");
    assert_eq!(json["membership"]["old_only"][0], 1001.0);
    assert_eq!(json["content"]["columns"][1]["column"], "TotalCharge");
    assert_eq!(json["content"]["columns"][1]["severity"], "error");
    assert_eq!(json["content"]["columns"][1]["category"], "numeric");
    assert!(json["content"]["columns"][0].get("severity").is_none());
    assert!(json.get("joined").is_none());
    assert_eq!(json["log"][0]["severity"], "DEBUG");
}

#[test]
fn joined_export_and_log_store() {
    let (result, log) = load_and_run(&case_info_toml());
    let joined = result.joined.as_ref().unwrap();

    let mut buf = Vec::new();
    joined.write_csv(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "CaseNumber,Status_old,Status_new,Status_match,\
         TotalCharge_old,TotalCharge_new,TotalCharge_match,\
         DateOpened_old,DateOpened_new,DateOpened_match,\
         PostCode_old,PostCode_new,PostCode_match"
    );
    assert_eq!(text.lines().count(), 10);
    assert!(text.contains("1010,Closed,Closed,true,500,505,false"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case_info.log");
    log.store(&path).unwrap();
    let stored = std::fs::read_to_string(&path).unwrap();
    assert_eq!(stored.lines().count(), log.entries().len());
    assert!(stored.contains(" ERROR Column TotalCharge match rate: "));
}

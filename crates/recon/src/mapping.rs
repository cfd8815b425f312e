//! Pre-comparison value translation for the old dataset (code renames,
//! default fills) so expected semantic changes don't register as mismatches.

use indexmap::IndexMap;

use crate::audit::AuditLog;
use crate::model::{Dataset, Value};

/// Source key that targets missing values instead of a literal.
pub const NULL_SENTINEL: &str = "null";

/// column -> (source literal or `"null"`) -> replacement, in declaration order.
pub type ValueMappings = IndexMap<String, IndexMap<String, Value>>;

/// Apply `mappings` and return the mapped dataset.
///
/// Pairs run in declaration order and each pass sees the output of the one
/// before it, so `A -> B` followed by `B -> C` turns `A` into `C`. The null
/// sentinel fills missing values with its target. Literal sources match a
/// cell by its rendered form, so `"1"` matches the number 1.
/// Columns missing from the dataset are skipped with a warning.
pub fn apply_value_mappings(mut dataset: Dataset, mappings: &ValueMappings, log: &mut AuditLog) -> Dataset {
    if mappings.is_empty() {
        return dataset;
    }

    log.debug("Mapping values prior to doing the comparison", false);

    for (column, mapping) in mappings {
        let Some(col) = dataset.column_mut(column) else {
            log.warning(format!("Cannot map values: column {column} not in dataset"));
            continue;
        };

        let mut changed = 0usize;
        for (source, target) in mapping {
            for value in col.values.iter_mut() {
                let hit = if source == NULL_SENTINEL {
                    value.is_null()
                } else {
                    !value.is_null() && value.literal() == *source
                };
                if hit && value != target {
                    *value = target.clone();
                    changed += 1;
                }
            }
        }

        log.debug(format!("Mapped {changed} values in column {column}"), false);
    }

    dataset
}

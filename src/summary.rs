//! Partitioning of the open-schema summary metrics into renderable tables:
//! known per-chain vectors, known per-chain-pair matrices, and everything
//! else as a generic key/value table.

use polars::prelude::*;
use serde_json::Value;
use tracing::warn;

/// Metrics holding one value per chain, matched to chain ids by position.
pub const PER_CHAIN_METRICS: [&str; 2] = ["chain_iptm", "chain_ptm"];
/// Metrics holding a chain-by-chain matrix.
pub const PER_CHAIN_PAIR_METRICS: [&str; 2] = ["chain_pair_iptm", "chain_pair_pae_min"];

/// Decimal precision used for scalar metric display.
const SCALAR_PRECISION: usize = 2;

/// The partitioned summary metrics, ready for tabulation.
#[derive(Debug, Clone)]
pub struct SummaryTables {
    /// Per-chain metrics, one DataFrame per metric
    pub per_chain: Vec<(String, DataFrame)>,
    /// Per-chain-pair metrics, one chain-by-chain DataFrame per metric
    pub per_pair: Vec<(String, DataFrame)>,
    /// All remaining metrics as formatted key/value rows
    pub scalars: DataFrame,
}

fn as_f64_vec(value: &Value) -> Option<Vec<f64>> {
    let arr = value.as_array()?;
    let nums: Vec<f64> = arr.iter().filter_map(Value::as_f64).collect();
    (nums.len() == arr.len()).then_some(nums)
}

fn as_f64_matrix(value: &Value) -> Option<Vec<Vec<f64>>> {
    let arr = value.as_array()?;
    let rows: Vec<Vec<f64>> = arr.iter().filter_map(as_f64_vec).collect();
    (rows.len() == arr.len()).then_some(rows)
}

/// Build the table for a per-chain metric, or `None` when the value count
/// does not match the chain ids (the mismatch is warned about and the
/// metric skipped).
pub fn chain_metric_df(name: &str, value: &Value, chain_ids: &[String]) -> Option<DataFrame> {
    let values = as_f64_vec(value)?;
    if values.len() != chain_ids.len() {
        warn!(
            "Metric '{name}' has {} values for {} chains; skipping it.",
            values.len(),
            chain_ids.len()
        );
        return None;
    }
    df!(
        "chain" => chain_ids.to_vec(),
        name => values,
    )
    .ok()
}

/// Build the chain-by-chain table for a pair metric, or `None` on a shape
/// mismatch (warned about and skipped).
pub fn chain_pair_metric_df(name: &str, value: &Value, chain_ids: &[String]) -> Option<DataFrame> {
    let matrix = as_f64_matrix(value)?;
    let n = chain_ids.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        warn!("Metric '{name}' does not match the {n} chain ids; skipping it.");
        return None;
    }

    let mut columns: Vec<Column> = vec![Column::new("chain".into(), chain_ids.to_vec())];
    for (j, chain) in chain_ids.iter().enumerate() {
        let col: Vec<f64> = matrix.iter().map(|row| row[j]).collect();
        columns.push(Column::new(chain.as_str().into(), col));
    }
    DataFrame::new(columns).ok()
}

/// Format a scalar/other metric value for the generic table.
fn format_scalar(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(v) => format!("{v:.prec$}", prec = SCALAR_PRECISION),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Partition the summary metrics against the chain id list.
///
/// Known per-chain and per-chain-pair metrics become their own tables when
/// their shape matches; mismatches are warned about and skipped. Everything
/// else lands in the scalar table with fixed decimal precision.
pub fn partition_summary(
    summary: &serde_json::Map<String, Value>,
    chain_ids: &[String],
) -> SummaryTables {
    let mut per_chain = Vec::new();
    let mut per_pair = Vec::new();
    let mut scalar_names: Vec<String> = Vec::new();
    let mut scalar_values: Vec<String> = Vec::new();

    for (name, value) in summary {
        if PER_CHAIN_METRICS.contains(&name.as_str()) && as_f64_vec(value).is_some() {
            if let Some(df) = chain_metric_df(name, value, chain_ids) {
                per_chain.push((name.clone(), df));
            }
            continue;
        }
        if PER_CHAIN_PAIR_METRICS.contains(&name.as_str()) && as_f64_matrix(value).is_some() {
            if let Some(df) = chain_pair_metric_df(name, value, chain_ids) {
                per_pair.push((name.clone(), df));
            }
            continue;
        }
        scalar_names.push(name.clone());
        scalar_values.push(format_scalar(value));
    }

    let scalars = df!(
        "metric" => scalar_names,
        "value" => scalar_values,
    )
    .expect("metric/value columns always have equal length");

    SummaryTables {
        per_chain,
        per_pair,
        scalars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chains(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn summary_map(raw: serde_json::Value) -> serde_json::Map<String, Value> {
        match raw {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn per_chain_metric_matches_ids_by_position() {
        let df = chain_metric_df(
            "chain_iptm",
            &json!([0.9, 0.8]),
            &chains(&["A", "B"]),
        )
        .unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(
            df.column("chain").unwrap().str().unwrap().get(1),
            Some("B")
        );
        assert_eq!(
            df.column("chain_iptm").unwrap().f64().unwrap().get(0),
            Some(0.9)
        );
    }

    #[test]
    fn mismatched_chain_metric_is_skipped() {
        assert!(chain_metric_df(
            "chain_iptm",
            &json!([0.9, 0.8]),
            &chains(&["A", "B", "C"]),
        )
        .is_none());
    }

    #[test]
    fn pair_metric_becomes_chain_by_chain_table() {
        let df = chain_pair_metric_df(
            "chain_pair_iptm",
            &json!([[1.0, 0.5], [0.5, 1.0]]),
            &chains(&["A", "B"]),
        )
        .unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("B").unwrap().f64().unwrap().get(0), Some(0.5));
    }

    #[test]
    fn non_square_pair_metric_is_skipped() {
        assert!(chain_pair_metric_df(
            "chain_pair_iptm",
            &json!([[1.0, 0.5]]),
            &chains(&["A", "B"]),
        )
        .is_none());
    }

    #[test]
    fn partition_splits_known_and_scalar_metrics() {
        let summary = summary_map(json!({
            "chain_iptm": [0.9, 0.8],
            "chain_pair_iptm": [[1.0, 0.5], [0.5, 1.0]],
            "ptm": 0.823456,
            "has_clash": false,
        }));
        let tables = partition_summary(&summary, &chains(&["A", "B"]));
        assert_eq!(tables.per_chain.len(), 1);
        assert_eq!(tables.per_pair.len(), 1);
        assert_eq!(tables.scalars.height(), 2);

        let values = tables.scalars.column("value").unwrap();
        let values = values.str().unwrap();
        // BTreeMap ordering puts has_clash before ptm
        assert_eq!(values.get(0), Some("false"));
        assert_eq!(values.get(1), Some("0.82"));
    }

    #[test]
    fn mismatched_metric_falls_nowhere_but_job_continues() {
        let summary = summary_map(json!({
            "chain_iptm": [0.9, 0.8],
            "ranking_score": 0.5,
        }));
        let tables = partition_summary(&summary, &chains(&["A", "B", "C"]));
        assert!(tables.per_chain.is_empty());
        assert_eq!(tables.scalars.height(), 1);
    }

    #[test]
    fn unknown_array_metric_renders_as_json_text() {
        let summary = summary_map(json!({"atom_plddts": [1.0, 2.0]}));
        let tables = partition_summary(&summary, &[]);
        let values = tables.scalars.column("value").unwrap();
        assert_eq!(values.str().unwrap().get(0), Some("[1.0,2.0]"));
    }
}

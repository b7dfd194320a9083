//! CSV input and output tables.
//!
//! Readers accept anything implementing [`io::Read`] and writers anything
//! implementing [`io::Write`]; every table has a header row.

use std::collections::HashMap;
use std::io;

use rebalance_core::CorrelationMatrix;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RebalanceError, RebalanceResult};

/// One row of the segment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Segment identifier.
    pub segment_id: String,
    /// Owning asset.
    pub asset: String,
    /// Current exposure.
    pub exposure: f64,
    /// Expected profitability rate.
    pub average_profitability: f64,
    /// Regulatory risk weight.
    pub risk_weight: f64,
    /// Cost rate of shrinking the segment (0 when absent).
    #[serde(default)]
    pub rel_sell_cost: Option<f64>,
    /// Cost rate of growing the segment (0 when absent).
    #[serde(default)]
    pub rel_origination_cost: Option<f64>,
}

/// One row of the asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Asset identifier.
    pub asset: String,
    /// Largest allowed relative shrink, in `[0, 1]`.
    pub max_exposure_decrease: f64,
    /// Largest allowed relative growth.
    pub max_exposure_increase: f64,
    /// Standard deviation of profitability (0 when absent).
    #[serde(default)]
    pub stdev_profitability: Option<f64>,
}

/// Reads the segment table.
pub fn read_segments<R: io::Read>(reader: R) -> RebalanceResult<Vec<SegmentRecord>> {
    read_records(reader, "segments")
}

/// Reads the asset table.
pub fn read_assets<R: io::Read>(reader: R) -> RebalanceResult<Vec<AssetRecord>> {
    read_records(reader, "assets")
}

fn read_records<R: io::Read, T: DeserializeOwned>(reader: R, table: &str) -> RebalanceResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.map_err(|e| RebalanceError::table(format!("{} table: {}", table, e)))?;
        records.push(record);
    }
    debug!(table, rows = records.len(), "read table");
    Ok(records)
}

/// Reads a correlation table.
///
/// The first column holds row labels; the remaining header cells are the
/// column labels. Rows may appear in any order but must cover exactly the
/// column labels.
pub fn read_correlation<R: io::Read>(reader: R) -> RebalanceResult<CorrelationMatrix> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let labels: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if labels.is_empty() {
        return Err(RebalanceError::table("correlation table has no asset columns"));
    }

    let column_of: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let mut rows: Vec<Option<Vec<f64>>> = vec![None; labels.len()];

    for result in rdr.records() {
        let record = result?;
        let label = record.get(0).unwrap_or_default();
        let index = *column_of.get(label).ok_or_else(|| {
            RebalanceError::table(format!("correlation row '{}' has no matching column", label))
        })?;
        if rows[index].is_some() {
            return Err(RebalanceError::table(format!(
                "correlation row '{}' appears twice",
                label
            )));
        }
        let values = record
            .iter()
            .skip(1)
            .map(|cell| {
                cell.parse::<f64>().map_err(|e| {
                    RebalanceError::table(format!(
                        "correlation row '{}': cannot parse '{}': {}",
                        label, cell, e
                    ))
                })
            })
            .collect::<RebalanceResult<Vec<f64>>>()?;
        rows[index] = Some(values);
    }

    let rows = rows
        .into_iter()
        .zip(&labels)
        .map(|(row, label)| {
            row.ok_or_else(|| RebalanceError::table(format!("correlation row '{}' is missing", label)))
        })
        .collect::<RebalanceResult<Vec<_>>>()?;

    debug!(assets = labels.len(), "read correlation table");
    Ok(CorrelationMatrix::from_rows(labels, &rows)?)
}

/// Writes serializable rows as CSV with a header.
pub fn write_records<W: io::Write, T: Serialize>(writer: W, records: &[T]) -> RebalanceResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

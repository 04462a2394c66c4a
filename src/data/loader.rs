use std::collections::BTreeSet;
use std::path::Path;

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::model::{
    Direction, EventRecord, EventTable, AZIMUTH, BATCH_ID, BINS, EVENT_ID, FIRST_PULSE_INDEX,
    FOLD, LAST_PULSE_INDEX, N_PULSES, REQUIRED_COLUMNS, UNASSIGNED_FOLD, ZENITH,
};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an event metadata table.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columnar metadata as shipped with the detector data (recommended)
/// * `.json`    – `[{ "batch_id": 1, "event_id": 24, ... }, ...]`
/// * `.csv`     – header row with one column per field
///
/// Tables written by [`write_file`](super::writer::write_file) load back with
/// their `n_pulses`, `bins` and `fold` columns intact.
pub fn load_file(path: &Path) -> Result<EventTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => return Err(Error::invalid(format!("unsupported file extension: .{other}"))),
    };
    debug!("loaded {} events from {}", table.len(), path.display());
    Ok(table)
}

/// Fail fast when one of the [`REQUIRED_COLUMNS`] is absent.
pub fn check_schema<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let missing = missing_columns(columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

fn missing_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let present: BTreeSet<&str> = columns.into_iter().collect();
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect()
}

// ---------------------------------------------------------------------------
// Row layout shared by the CSV and JSON formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FlatRow {
    pub batch_id: i64,
    pub event_id: i64,
    pub first_pulse_index: i64,
    pub last_pulse_index: i64,
    #[serde(default)]
    pub azimuth: Option<f64>,
    #[serde(default)]
    pub zenith: Option<f64>,
    #[serde(default)]
    pub n_pulses: Option<i64>,
    #[serde(default)]
    pub bins: Option<i64>,
    #[serde(default)]
    pub fold: Option<i64>,
}

impl From<FlatRow> for EventRecord {
    fn from(row: FlatRow) -> Self {
        let direction = match (row.azimuth, row.zenith) {
            (Some(az), Some(zen)) => Some(Direction::new(az, zen)),
            _ => None,
        };
        EventRecord {
            batch_id: row.batch_id,
            event_id: row.event_id,
            first_pulse_index: row.first_pulse_index,
            last_pulse_index: row.last_pulse_index,
            direction,
            n_pulses: row.n_pulses,
            bins: row.bins,
            fold: row.fold.unwrap_or(UNASSIGNED_FOLD),
        }
    }
}

impl From<&EventRecord> for FlatRow {
    fn from(rec: &EventRecord) -> Self {
        FlatRow {
            batch_id: rec.batch_id,
            event_id: rec.event_id,
            first_pulse_index: rec.first_pulse_index,
            last_pulse_index: rec.last_pulse_index,
            azimuth: rec.direction.map(|d| d.azimuth),
            zenith: rec.direction.map(|d| d.zenith),
            n_pulses: rec.n_pulses,
            bins: rec.bins,
            fold: Some(rec.fold),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<EventTable> {
    let text = std::fs::read_to_string(path)?;
    let rows: Vec<Map<String, JsonValue>> = serde_json::from_str(&text)?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, obj) in rows.into_iter().enumerate() {
        let missing = missing_columns(obj.keys().map(String::as_str));
        if !missing.is_empty() {
            return Err(Error::invalid(format!(
                "row {i}: missing required column(s): {}",
                missing.join(", ")
            )));
        }
        let row: FlatRow = serde_json::from_value(JsonValue::Object(obj))?;
        records.push(row.into());
    }

    Ok(EventTable::new(records))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<EventTable> {
    let mut reader = csv::Reader::from_path(path)?;
    check_schema(reader.headers()?.iter())?;

    let records = reader
        .deserialize::<FlatRow>()
        .map(|row| row.map(EventRecord::from).map_err(Error::from))
        .collect::<Result<Vec<_>>>()?;

    Ok(EventTable::new(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet metadata table.
///
/// Integer columns may be any of Int16/Int32/Int64/UInt32/UInt64, direction
/// columns Float32 or Float64.  Works with files written by **Pandas** and
/// **Polars** alike.
fn load_parquet(path: &Path) -> Result<EventTable> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    {
        let schema = builder.schema();
        check_schema(schema.fields().iter().map(|f| f.name().as_str()))?;
    }
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        append_batch(&batch, &mut records)?;
    }

    Ok(EventTable::new(records))
}

fn append_batch(batch: &RecordBatch, records: &mut Vec<EventRecord>) -> Result<()> {
    let required = |name: &str| -> Result<Vec<Option<i64>>> {
        let col = batch
            .column_by_name(name)
            .ok_or_else(|| Error::invalid(format!("missing required column: {name}")))?;
        i64_values(col, name)
    };
    let optional_i64 = |name: &str| -> Result<Option<Vec<Option<i64>>>> {
        batch.column_by_name(name).map(|c| i64_values(c, name)).transpose()
    };
    let optional_f64 = |name: &str| -> Result<Option<Vec<Option<f64>>>> {
        batch.column_by_name(name).map(|c| f64_values(c, name)).transpose()
    };

    let batch_ids = required(BATCH_ID)?;
    let event_ids = required(EVENT_ID)?;
    let firsts = required(FIRST_PULSE_INDEX)?;
    let lasts = required(LAST_PULSE_INDEX)?;
    let azimuths = optional_f64(AZIMUTH)?;
    let zeniths = optional_f64(ZENITH)?;
    let n_pulses = optional_i64(N_PULSES)?;
    let bins = optional_i64(BINS)?;
    let folds = optional_i64(FOLD)?;

    let base = records.len();
    for row in 0..batch.num_rows() {
        let non_null = |values: &[Option<i64>], name: &str| {
            values[row].ok_or_else(|| {
                Error::invalid(format!("row {}: null in required column '{name}'", base + row))
            })
        };
        let at = |values: &Option<Vec<Option<i64>>>| values.as_ref().and_then(|v| v[row]);

        let direction = match (&azimuths, &zeniths) {
            (Some(az), Some(zen)) => match (az[row], zen[row]) {
                (Some(a), Some(z)) => Some(Direction::new(a, z)),
                _ => None,
            },
            _ => None,
        };

        records.push(EventRecord {
            batch_id: non_null(&batch_ids, BATCH_ID)?,
            event_id: non_null(&event_ids, EVENT_ID)?,
            first_pulse_index: non_null(&firsts, FIRST_PULSE_INDEX)?,
            last_pulse_index: non_null(&lasts, LAST_PULSE_INDEX)?,
            direction,
            n_pulses: at(&n_pulses),
            bins: at(&bins),
            fold: at(&folds).unwrap_or(UNASSIGNED_FOLD),
        });
    }
    Ok(())
}

// -- Arrow helpers --

fn layout_error(name: &str) -> Error {
    Error::invalid(format!("column '{name}': unexpected array layout"))
}

/// Widen any supported integer column to `i64`.
fn i64_values(col: &ArrayRef, name: &str) -> Result<Vec<Option<i64>>> {
    match col.data_type() {
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().collect())
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().map(|v| v.map(i64::from)).collect())
        }
        DataType::Int16 => {
            let arr = col.as_any().downcast_ref::<Int16Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().map(|v| v.map(i64::from)).collect())
        }
        DataType::UInt32 => {
            let arr = col.as_any().downcast_ref::<UInt32Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().map(|v| v.map(i64::from)).collect())
        }
        DataType::UInt64 => {
            let arr = col.as_any().downcast_ref::<UInt64Array>().ok_or_else(|| layout_error(name))?;
            let mut out = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                let widened = v
                    .map(i64::try_from)
                    .transpose()
                    .map_err(|_| Error::invalid(format!("column '{name}': value exceeds i64")))?;
                out.push(widened);
            }
            Ok(out)
        }
        other => Err(Error::invalid(format!(
            "column '{name}': expected an integer column, got {other:?}"
        ))),
    }
}

fn f64_values(col: &ArrayRef, name: &str) -> Result<Vec<Option<f64>>> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().collect())
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().ok_or_else(|| layout_error(name))?;
            Ok(arr.iter().map(|v| v.map(f64::from)).collect())
        }
        other => Err(Error::invalid(format!(
            "column '{name}': expected a float column, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn schema_check_names_missing_columns() {
        let err = check_schema(["batch_id", "event_id"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("first_pulse_index"));
        assert!(msg.contains("last_pulse_index"));
        assert!(check_schema(REQUIRED_COLUMNS).is_ok());
    }

    #[test]
    fn csv_with_directions() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "batch_id,event_id,first_pulse_index,last_pulse_index,azimuth,zenith").unwrap();
        writeln!(file, "1,24,0,61,5.03,2.41").unwrap();
        writeln!(file, "1,41,61,110,0.41,1.21").unwrap();
        file.flush().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].pulse_count(), Some(49));
        assert_eq!(table.records[0].direction, Some(Direction::new(5.03, 2.41)));
        assert!(!table.records[0].is_assigned());
    }

    #[test]
    fn csv_without_required_column_is_invalid() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "batch_id,event_id,first_pulse_index").unwrap();
        writeln!(file, "1,24,0").unwrap();
        file.flush().unwrap();

        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn json_rows_are_checked_individually() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"batch_id": 1, "event_id": 2, "first_pulse_index": 0, "last_pulse_index": 9}},
                {{"batch_id": 1, "event_id": 3, "first_pulse_index": 9}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let err = load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("meta.feather")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}

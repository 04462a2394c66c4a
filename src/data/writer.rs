use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

use super::loader::FlatRow;
use super::model::{
    EventTable, AZIMUTH, BATCH_ID, BINS, EVENT_ID, FIRST_PULSE_INDEX, FOLD, LAST_PULSE_INDEX,
    N_PULSES, ZENITH,
};
use crate::error::{Error, Result};

/// Persist an event table.  Dispatch by extension, mirroring
/// [`load_file`](super::loader::load_file).
pub fn write_file(table: &EventTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path)?,
        "csv" => write_csv(table, path)?,
        "json" => write_json(table, path)?,
        other => return Err(Error::invalid(format!("unsupported file extension: .{other}"))),
    }
    info!("wrote {} events to {}", table.len(), path.display());
    Ok(())
}

/// Build one Arrow batch holding the whole table.
///
/// `azimuth`/`zenith` are emitted when any row has a direction, null on the
/// rows without one.  The derived columns are nullable so unassigned tables
/// round-trip.
pub fn to_record_batch(table: &EventTable) -> Result<RecordBatch> {
    let recs = &table.records;
    let int_col = |f: &dyn Fn(usize) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from((0..recs.len()).map(f).collect::<Vec<_>>()))
    };
    let opt_int_col = |f: &dyn Fn(usize) -> Option<i64>| -> ArrayRef {
        Arc::new(Int64Array::from((0..recs.len()).map(f).collect::<Vec<_>>()))
    };

    let mut fields = vec![
        Field::new(BATCH_ID, DataType::Int64, false),
        Field::new(EVENT_ID, DataType::Int64, false),
        Field::new(FIRST_PULSE_INDEX, DataType::Int64, false),
        Field::new(LAST_PULSE_INDEX, DataType::Int64, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        int_col(&|i| recs[i].batch_id),
        int_col(&|i| recs[i].event_id),
        int_col(&|i| recs[i].first_pulse_index),
        int_col(&|i| recs[i].last_pulse_index),
    ];

    if recs.iter().any(|r| r.direction.is_some()) {
        let (az, zen): (Vec<Option<f64>>, Vec<Option<f64>>) = recs
            .iter()
            .map(|r| (r.direction.map(|d| d.azimuth), r.direction.map(|d| d.zenith)))
            .unzip();
        fields.push(Field::new(AZIMUTH, DataType::Float64, true));
        fields.push(Field::new(ZENITH, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(az)));
        columns.push(Arc::new(Float64Array::from(zen)));
    }

    fields.push(Field::new(N_PULSES, DataType::Int64, true));
    fields.push(Field::new(BINS, DataType::Int64, true));
    fields.push(Field::new(FOLD, DataType::Int64, false));
    columns.push(opt_int_col(&|i| recs[i].n_pulses));
    columns.push(opt_int_col(&|i| recs[i].bins));
    columns.push(int_col(&|i| recs[i].fold));

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn write_parquet(table: &EventTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(table: &EventTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for rec in &table.records {
        writer.serialize(FlatRow::from(rec))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(table: &EventTable, path: &Path) -> Result<()> {
    let rows: Vec<FlatRow> = table.records.iter().map(FlatRow::from).collect();
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &rows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_file;
    use crate::data::model::{Direction, EventRecord};
    use arrow::array::Array;

    fn table_with_gap() -> EventTable {
        let records = (0..100)
            .map(|i| {
                let rec = EventRecord::new(1, i, 10 * i, 10 * i + 5);
                if i == 37 {
                    rec
                } else {
                    rec.with_direction(Direction::new(0.01 * i as f64, 0.02 * i as f64))
                }
            })
            .collect();
        EventTable::new(records)
    }

    #[test]
    fn partial_directions_become_nulls() {
        let batch = to_record_batch(&table_with_gap()).unwrap();
        let azimuth = batch.column_by_name(AZIMUTH).unwrap();
        assert_eq!(azimuth.null_count(), 1);
        assert!(azimuth.is_null(37));
        assert!(batch.schema().field_with_name(ZENITH).unwrap().is_nullable());
    }

    #[test]
    fn no_directions_no_angle_columns() {
        let table = EventTable::new(vec![EventRecord::new(1, 0, 0, 3)]);
        let batch = to_record_batch(&table).unwrap();
        assert!(batch.column_by_name(AZIMUTH).is_none());
        assert!(batch.column_by_name(ZENITH).is_none());
    }

    #[test]
    fn parquet_keeps_directions_around_a_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.parquet");
        let table = table_with_gap();
        write_file(&table, &path).unwrap();

        let reloaded = load_file(&path).unwrap();
        assert_eq!(reloaded.records.iter().filter(|r| r.direction.is_some()).count(), 99);
        assert_eq!(reloaded.records[37].direction, None);
        assert_eq!(reloaded, table);
    }
}

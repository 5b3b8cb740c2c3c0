use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::frame::{Cell, Column, Table};
use crate::error::Result;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Header row of column names, then one line per row. No index column.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.column_names())?;
    for row in (0..table.n_rows()).filter_map(|i| table.row(i)) {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    log::info!(
        "wrote {} rows x {} columns to {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow / Parquet
// ---------------------------------------------------------------------------

/// Convert to a single Arrow record batch.
///
/// Columns holding any text become nullable `Utf8` (numbers rendered as in
/// CSV); all-numeric columns become nullable `Float64`.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.n_cols());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.n_cols());

    for col in table.columns() {
        let (field, array) = column_to_arrow(col);
        fields.push(field);
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    if arrays.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn column_to_arrow(col: &Column) -> (Field, ArrayRef) {
    let has_text = col.cells.iter().any(|c| matches!(c, Cell::Text(_)));
    if has_text {
        let array: StringArray = col
            .cells
            .iter()
            .map(|c| match c {
                Cell::Null => None,
                other => Some(other.to_string()),
            })
            .collect();
        let array: ArrayRef = Arc::new(array);
        (Field::new(col.name.as_str(), DataType::Utf8, true), array)
    } else {
        let array: Float64Array = col.cells.iter().map(Cell::as_f64).collect();
        let array: ArrayRef = Arc::new(array);
        (Field::new(col.name.as_str(), DataType::Float64, true), array)
    }
}

pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    log::info!(
        "wrote {} rows x {} columns to {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::Float64Type;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn table() -> Table {
        let mut t = Table::from_columns(vec![
            Column {
                name: "sample".into(),
                cells: vec!["gold".into(), "gold".into()],
            },
            Column {
                name: "value".into(),
                cells: vec![2.0.into(), 0.5.into()],
            },
        ]);
        t.append(&Table::from_columns(vec![Column {
            name: "angle".into(),
            cells: vec![11.0.into()],
        }]));
        t
    }

    #[test]
    fn csv_has_header_and_blank_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");

        write_csv(&table(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "sample,value,angle\ngold,2.0,\ngold,0.5,\n,,11.0\n");
    }

    #[test]
    fn record_batch_types_follow_content() {
        let batch = to_record_batch(&table()).unwrap();

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);
        assert!(batch.column(0).is_null(2));
        assert!(batch.column(1).is_null(2));
    }

    #[test]
    fn parquet_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_parquet(&table(), &path).unwrap();

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 3);

        let angle = batches[0].column_by_name("angle").unwrap();
        let angle = angle.as_primitive::<Float64Type>();
        assert!(angle.is_null(0));
        assert_eq!(angle.value(2), 11.0);
    }

    #[test]
    fn empty_table_gives_empty_batch() {
        let batch = to_record_batch(&Table::new()).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 0);
    }
}

// CSV parsing for the processed-data preview
use crate::domain::loaded::DataPreview;

#[derive(Debug, thiserror::Error)]
pub enum CsvPreviewError {
    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Parse a whole CSV document with a header row, keeping the first `max_rows` records.
///
/// Records shorter than the header are padded with empty cells. A record with more
/// fields than the header fails the whole parse, wherever it appears.
pub fn parse_preview(bytes: &[u8], max_rows: usize) -> Result<DataPreview, CsvPreviewError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if columns.is_empty() {
        return Err(CsvPreviewError::NoColumns);
    }

    let mut rows = Vec::with_capacity(max_rows);
    let mut total_rows = 0;

    for result in reader.records() {
        let record = result?;
        if record.len() > columns.len() {
            return Err(CsvPreviewError::TooManyFields {
                line: record.position().map_or(0, |p| p.line()),
                expected: columns.len(),
                found: record.len(),
            });
        }

        total_rows += 1;
        if rows.len() < max_rows {
            let mut row: Vec<String> = record.iter().map(String::from).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
    }

    Ok(DataPreview::new(columns, rows, total_rows))
}

// What was learned from reading processed data and model artifacts

#[derive(Debug, Clone, PartialEq)]
pub struct DataPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl DataPreview {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>, total_rows: usize) -> Self {
        Self {
            columns,
            rows,
            total_rows,
        }
    }
}

/// What a successful model check learned about the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub size_bytes: usize,
    pub root_kind: &'static str,
}

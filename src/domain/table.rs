//! Labelled numeric tables for report output.

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Rows of optional numbers under named columns. A `None` cell is written
/// as an empty field.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub label_header: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(label_header: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label_header: label_header.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating `values` to the column count.
    pub fn push_row(&mut self, label: impl Into<String>, mut values: Vec<Option<f64>>) {
        values.resize(self.columns.len(), None);
        self.rows.push(TableRow {
            label: label.into(),
            values,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row_label: &str, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.label == row_label)
            .and_then(|r| r.values[col])
    }
}

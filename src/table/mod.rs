use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::provider::RowSet;

/// The run's accumulated results. Append-only; row sets from different
/// items may disagree on columns, so appends union the column list and
/// rows render an empty cell for any column they never carried. Column
/// order is first-seen, which makes a given run deterministic.
#[derive(Debug, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, Value>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Append one item's rows. Content is kept as returned; no coercion.
    pub fn append(&mut self, set: RowSet) {
        for col in &set.columns {
            if !self.columns.contains(col) {
                self.columns.push(col.clone());
            }
        }
        for row in set.rows {
            self.rows
                .push(set.columns.iter().cloned().zip(row).collect());
        }
    }

    /// Write the whole table as UTF-8 tab-delimited text. Called exactly
    /// once, at run end; an empty table still produces the file.
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("cannot create output file {}", path.display()))?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(BufWriter::new(file));
        if !self.columns.is_empty() {
            wtr.write_record(&self.columns)?;
            for row in &self.rows {
                let record: Vec<String> = self
                    .columns
                    .iter()
                    .map(|col| render_cell(row.get(col)))
                    .collect();
                wtr.write_record(&record)?;
            }
        }
        wtr.flush()
            .with_context(|| format!("flushing output file {}", path.display()))?;
        Ok(())
    }
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn set(columns: &[&str], rows: Vec<Vec<Value>>) -> RowSet {
        RowSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn appends_preserve_content_and_order() {
        let mut table = ResultTable::new();
        table.append(set(
            &["Instrument", "Price Close"],
            vec![vec![json!("US1"), json!(10.5)], vec![json!("US1"), json!(11.0)]],
        ));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns(), ["Instrument", "Price Close"]);
    }

    #[test]
    fn differing_columns_union_without_realigning() {
        let mut table = ResultTable::new();
        table.append(set(&["Instrument", "Price Close"], vec![vec![json!("US1"), json!(10.5)]]));
        table.append(set(&["Instrument", "Investor"], vec![vec![json!("NL2"), json!("Fund A")]]));
        assert_eq!(table.columns(), ["Instrument", "Price Close", "Investor"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn writes_tab_delimited_utf8() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out.tsv");
        let mut table = ResultTable::new();
        table.append(set(
            &["Instrument", "Price Close"],
            vec![vec![json!("US1"), json!(10.5)], vec![json!("NL2"), Value::Null]],
        ));
        table.write_tsv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Instrument\tPrice Close");
        assert_eq!(lines[1], "US1\t10.5");
        assert_eq!(lines[2], "NL2\t");
    }

    #[test]
    fn empty_table_still_writes_a_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("empty.tsv");
        ResultTable::new().write_tsv(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// One unit of work: an identifier plus whatever query window the input
/// supplied for it. Never mutated after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestItem {
    pub key: String,
    pub name: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    identifier: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

/// Read the full item list before any request is made. `.csv` inputs carry
/// `identifier,name,start_date,end_date` columns; anything else is treated
/// as one identifier per line. Any read or parse failure here is fatal.
pub fn read_items(path: &Path) -> Result<Vec<RequestItem>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_csv(path)
    } else {
        read_lines(path)
    }
}

fn read_csv(path: &Path) -> Result<Vec<RequestItem>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open input file {}", path.display()))?;
    let mut items = Vec::new();
    for (i, record) in reader.deserialize::<CsvRecord>().enumerate() {
        let record =
            record.with_context(|| format!("bad record on line {} of {}", i + 2, path.display()))?;
        let key = record.identifier.trim().to_string();
        if key.is_empty() {
            continue;
        }
        items.push(RequestItem {
            key,
            name: record.name.filter(|n| !n.trim().is_empty()),
            start: record.start_date,
            end: record.end_date,
        });
    }
    Ok(items)
}

fn read_lines(path: &Path) -> Result<Vec<RequestItem>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot open input file {}", path.display()))?;
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| RequestItem {
            key: line.to_string(),
            name: None,
            start: None,
            end: None,
        })
        .collect())
}

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::config::JobKind;
use crate::input::RequestItem;
use crate::provider::{DataProvider, FetchError};
use crate::table::ResultTable;

/// What a run produced: the accumulated table plus which items failed and
/// why. Failed items contribute no rows.
pub struct BatchReport {
    pub table: ResultTable,
    pub attempted: usize,
    pub failures: Vec<(String, String)>,
}

/// The sequential fetch loop: one query per item in input order, results
/// appended to the table, provider failures logged and skipped, and the
/// `pacing` hook invoked after every item regardless of outcome — the
/// provider rate limit applies win or lose. A `Fatal` fetch error aborts
/// the run; nothing else does.
pub fn run<P: DataProvider>(
    items: &[RequestItem],
    provider: &P,
    job: JobKind,
    pacing: &mut dyn FnMut(),
) -> Result<BatchReport> {
    let total = items.len();
    let fields = job.fields();
    let mut table = ResultTable::new();
    let mut failures = Vec::new();

    for (i, item) in items.iter().enumerate() {
        println!("Retrieving data for item {} of {}: {} ...", i + 1, total, item.key);
        info!(key = %item.key, "requesting item {}/{}", i + 1, total);

        let params = job.params_for(item);
        match provider.get_data(&[item.key.as_str()], fields, &params) {
            Ok(set) => {
                info!(key = %item.key, rows = set.rows.len(), "fetched");
                table.append(set);
            }
            Err(FetchError::Provider(msg)) => {
                error!(key = %item.key, "provider error: {msg}");
                failures.push((item.key.clone(), msg));
            }
            Err(FetchError::Fatal(msg)) => {
                return Err(anyhow!("aborting run at item {}: {msg}", item.key));
            }
        }
        pacing();
    }

    Ok(BatchReport {
        table,
        attempted: total,
        failures,
    })
}

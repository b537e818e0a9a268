use std::path::PathBuf;

use clap::ValueEnum;

use crate::input::RequestItem;
use crate::provider::Parameters;

/// Everything a run needs to know up front. Built from the CLI before the
/// loop starts; nothing is prompted for interactively.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub job: JobKind,
}

static EVENT_PRICE_FIELDS: &[&str] = &["TR.PriceClose", "TR.PriceCloseDate"];

static SHAREHOLDER_FIELDS: &[&str] = &[
    "TR.SharesHeld.investorname",
    "TR.SharesHeld",
    "TR.SharesHeldValue",
    "TR.PctOfSharesOutHeld",
    "TR.HoldingsDate",
    "TR.FilingType",
    "TR.InvestorType",
    "TR.InvAddrCountry",
];

/// Snapshot date used when an item carries no date range of its own.
const DEFAULT_SNAPSHOT_DATE: &str = "2022-12-31";

/// The two datasets this tool knows how to pull. Each pairs a provider
/// field list with a rule for deriving query parameters from an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobKind {
    /// Daily close prices over each item's event window, in EUR.
    EventPrices,
    /// Shareholder registry snapshot per issuer.
    Shareholders,
}

impl JobKind {
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            JobKind::EventPrices => EVENT_PRICE_FIELDS,
            JobKind::Shareholders => SHAREHOLDER_FIELDS,
        }
    }

    /// Short tag used in output filenames.
    pub fn slug(&self) -> &'static str {
        match self {
            JobKind::EventPrices => "events",
            JobKind::Shareholders => "shareholders",
        }
    }

    /// Derive the query parameters for one item: its date range when it has
    /// one, the fixed snapshot date otherwise. Event prices additionally pin
    /// daily frequency and EUR.
    pub fn params_for(&self, item: &RequestItem) -> Parameters {
        let start_date = Some(
            item.start
                .map_or_else(|| DEFAULT_SNAPSHOT_DATE.to_string(), |d| d.to_string()),
        );
        let end_date = item.end.map(|d| d.to_string());
        match self {
            JobKind::EventPrices => Parameters {
                start_date,
                end_date,
                frequency: Some("D".to_string()),
                currency: Some("EUR".to_string()),
            },
            JobKind::Shareholders => Parameters {
                start_date,
                end_date,
                ..Default::default()
            },
        }
    }
}

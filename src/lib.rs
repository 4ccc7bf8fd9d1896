//! # Trail Tracing Sheets
//!
//! Maps hiking progress recorded in a "tracing" workbook onto trail geometry.
//!
//! A tracing workbook has a `Summary` tab naming the guidebook edition in cell A2 and
//! one tab per guidebook section, each holding a loosely placed table with a
//! "Trail Name" column, a total-mileage column and a miles-to-do column. The crate
//! finds those tables, extracts per-trail mileage keyed by `"<tab>, <trail name>"` and
//! joins it against trail geometry to produce map layers and a report of the trails
//! that could not be drawn.
//!
//! ## Features
//!
//! - **Both workbook formats**: Excel 97-2003 (`.xls`, BIFF8 in an OLE compound file)
//!   and Excel 2007+ (`.xlsx`), read by in-house parsers
//! - **Layout discovery**: header row and columns found by scanning cell text
//! - **Identifier reconciliation**: direct and alternate-identifier matching
//! - **GeoJSON output**: trail and peak layers ready for any web map
//!
//! ## Example
//!
//! ```no_run
//! use trailsheet::config::{ExpectedTabs, TraceConfig};
//!
//! let config = TraceConfig {
//!     workbook: "data/tracing.xlsx".into(),
//!     expected_tabs: ExpectedTabs::from_json_path("data/tabs_expected.json")?,
//!     geometry: "data/trails.geojson".into(),
//!     peaks: Some("data/amc_4k_peaks.csv".into()),
//! };
//! let outcome = trailsheet::trace_workbook(&config)?;
//! if let Some(report) = outcome.report() {
//!     println!("{report}");
//! }
//! # Ok::<(), trailsheet::TrailSheetError>(())
//! ```

pub mod config;
pub mod error;
mod helpers;
pub mod logging;
pub mod map;
pub mod progress;
pub mod spreadsheet;

pub use crate::error::TrailSheetError;

use crate::config::ExpectedTabs;
use crate::config::TraceConfig;
use crate::map::load_peaks;
use crate::map::reconcile;
use crate::map::without_geometry_report;
use crate::map::GeometrySet;
use crate::map::MapLayers;
use crate::map::Peak;
use crate::map::Reconciliation;
use crate::progress::Edition;
use crate::progress::TracingWorkbook;
use crate::progress::TrailTable;
use tracing::info;

/// Everything one tracing run produced.
#[derive(Debug)]
pub struct TraceOutcome {
    pub edition: Edition,
    pub attributes: TrailTable,
    pub geometry: GeometrySet,
    pub reconciliation: Reconciliation,
    pub peaks: Vec<Peak>,
}

impl TraceOutcome {
    pub fn layers(&self, expected_tabs: &ExpectedTabs) -> MapLayers {
        MapLayers::build(&self.geometry, &self.reconciliation, expected_tabs, &self.peaks)
    }

    /// Report of the trails without geometry, if there are any.
    pub fn report(&self) -> Option<String> {
        without_geometry_report(&self.reconciliation.without_geometry)
    }
}

/// Runs one trace: load geometry, validate the workbook, extract every trail tab,
/// reconcile against the geometry and load the peaks.
pub fn trace_workbook(config: &TraceConfig) -> Result<TraceOutcome, TrailSheetError> {
    let mut geometry = GeometrySet::from_geojson_path(&config.geometry)?;

    let mut workbook = TracingWorkbook::open(&config.workbook, &config.expected_tabs)?;
    let attributes = workbook.collect_trail_attributes()?;
    let edition = workbook.edition();
    drop(workbook);

    let reconciliation = reconcile(&attributes, &mut geometry);
    let peaks = match &config.peaks {
        Some(path) => load_peaks(path)?,
        None => Vec::new(),
    };
    info!(
        trails = attributes.len(),
        drawn = reconciliation.to_draw.len(),
        without_geometry = reconciliation.without_geometry.len(),
        peaks = peaks.len(),
        "traced workbook"
    );

    Ok(TraceOutcome {
        edition,
        attributes,
        geometry,
        reconciliation,
        peaks,
    })
}

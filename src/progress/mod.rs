//! # Hiking Progress
//!
//! Reads the tracker's progress out of a workbook: validates the workbook, discovers
//! the trail table in each tab and extracts per-trail mileage.

pub mod attributes;
pub mod bounds;
pub mod workbook;

pub use attributes::extract_trail_attributes;
pub use attributes::trail_id;
pub use attributes::TrailAttributes;
pub use attributes::TrailTable;
pub use bounds::BoundsInvariant;
pub use bounds::TabBounds;
pub use bounds::TableBoundsError;
pub use workbook::Edition;
pub use workbook::TracingWorkbook;
pub use workbook::SUMMARY_TAB;

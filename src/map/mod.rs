//! # Map
//!
//! Joins the workbook progress to trail geometry and renders the result as map layers.

pub mod geometry;
pub mod layers;
pub mod peaks;
pub mod reconcile;

pub use geometry::GeometryError;
pub use geometry::GeometrySet;
pub use geometry::TrailGeometry;
pub use layers::without_geometry_report;
pub use layers::MapLayers;
pub use peaks::load_peaks;
pub use peaks::Peak;
pub use reconcile::reconcile;
pub use reconcile::Reconciliation;

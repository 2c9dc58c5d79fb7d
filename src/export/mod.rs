//! Session export as a JSON bundle or a flat CSV table.

mod bundle;
mod coordinator;
mod csv;

pub use bundle::{DerivedFields, ExportBundle, ExportedCapture};
pub use coordinator::{ExportCoordinator, ExportFormat, ExportOptions, ExportProgress};
pub use csv::{escape_field, to_csv, CSV_COLUMNS, DERIVED_CSV_COLUMNS};

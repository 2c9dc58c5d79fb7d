pub mod blob_cache;
pub mod controller;
pub mod request;
pub mod state;

pub use blob_cache::BlobCache;
pub use controller::{LoadOutcome, StyleUsageView, VariantSummary, ViewerController, ViewerSnapshot};
pub use request::{RefreshGuard, RefreshTicket, RequestCursor};
pub use state::ViewerState;

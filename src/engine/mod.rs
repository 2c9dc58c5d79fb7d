//! Deterministic derivation over capture records.
//!
//! Everything in here is synchronous and side-effect free: the same captures
//! under the same grouping mode always produce the same groups, variants,
//! components and style entries, in the same order.

pub mod drawer;
pub mod grouping;
pub mod inventory;
pub mod normalize;
pub mod overlay;
pub mod scope;
pub mod signature;
pub mod source;
pub mod styles;

pub use drawer::{component_captures, related_components, style_locations, StyleLocation};
pub use grouping::{derive_variants, group_captures, CaptureGroup, Variant};
pub use inventory::{derive_inventory, Component, Inventory};
pub use overlay::{resolve_component, resolve_inventory, ResolvedComponent};
pub use scope::{CaptureFilter, ProjectScope};
pub use signature::{group_key, variant_key, GroupingMode, SIGNATURE_VERSION};
pub use styles::{build_style_inventory, extract_token, StyleEntry, StyleKind};

pub mod blob;
pub mod capture;
pub mod overlay;
pub mod project;

pub use blob::Blob;
pub use capture::{
    parse_capture_document, CaptureDocument, CaptureDocumentV2, CaptureRecord, ColorValue,
    Padding, Screenshot, Shadow, StylePrimitives, NO_NAME,
};
pub use overlay::{
    compound_key, Annotation, AnnotationInput, ComponentOverride, OverrideInput, ProjectTag,
};
pub use project::{Project, ProjectSessionLink, Session};

//! Open Packaging Convention (OPC) implementation
//!
//! This module handles the ZIP-based package format used by DOCX files:
//! part names, content types, relationship tables, loading and streaming
//! writes.

mod content_types;
mod package;
mod part;
mod part_uri;
mod registry;
mod relationships;
mod writer;

pub use content_types::{
    ContentTypes, CORE_PROPERTIES, EXTENDED_PROPERTIES, FOOTER, HEADER, MAIN_DOCUMENT,
    RELATIONSHIPS, STYLES, XML,
};
pub use package::{Package, PackageLimits, MAX_PART_BYTES, MAX_TOTAL_BYTES};
pub use part::Part;
pub use part_uri::{well_known, PartUri};
pub use registry::RelationshipRegistry;
pub use relationships::{rel_types, Relationship, Relationships, TargetMode};
pub use writer::{PackageWriter, SaveOptions};

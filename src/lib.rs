//! # wordpack
//!
//! Build, read and rewrite DOCX (Office Open XML word-processing) packages.
//!
//! ## Features
//!
//! - Typed document model: sections, paragraphs, runs, tables, fields,
//!   inline pictures, headers and footers
//! - Per-document managers for IDs, relationships, media and styles
//! - Round-trip preservation (unknown elements and parts are kept intact)
//! - Validation before any byte is written
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wordpack::Document;
//!
//! // Open a document
//! let doc = Document::open("example.docx")?;
//!
//! // Read paragraphs
//! for para in doc.paragraphs() {
//!     println!("{}", para.text());
//! }
//!
//! // Create a new document
//! let mut doc = Document::new();
//! doc.add_paragraph("Hello World!").runs_mut().for_each(|r| r.set_bold(true));
//! doc.save("output.docx")?;
//! ```

pub mod document;
pub mod error;
pub mod ids;
pub mod opc;
pub mod xml;

pub use document::{Document, Paragraph, Run, Section, Table};
pub use error::{Error, ErrorKind, Result};
pub use ids::{IdManager, IdNamespace};
pub use opc::{Package, PackageLimits, Part, PartUri, SaveOptions};

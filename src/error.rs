//! Error types for wordpack

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Malformed XML in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Package limit exceeded: {0}")]
    PackageLimit(String),

    #[error("Missing required part or element: {0}")]
    Structure(String),

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("{operation}: invalid {field} '{value}'")]
    Validation {
        operation: String,
        field: String,
        value: String,
    },

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Coarse error category
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Package,
    Parse,
    Structure,
    Validation,
    Relationship,
    NotFound,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Package(_) | Error::PackageLimit(_) => ErrorKind::Package,
            Error::Xml(_)
            | Error::XmlEncoding(_)
            | Error::XmlAttr(_)
            | Error::Utf8(_)
            | Error::Parse { .. }
            | Error::MissingAttribute { .. } => ErrorKind::Parse,
            Error::Structure(_) => ErrorKind::Structure,
            Error::InvalidPartUri(_) | Error::Validation { .. } => ErrorKind::Validation,
            Error::Relationship(_) => ErrorKind::Relationship,
            Error::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub(crate) fn validation(
        operation: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Error::Validation {
            operation: operation.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

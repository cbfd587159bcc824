//! Part representation for OPC packages

use crate::error::Result;
use crate::opc::{PartUri, Relationships};

/// A part loaded from an OPC package
#[derive(Clone, Debug)]
pub struct Part {
    uri: PartUri,
    content_type: String,
    data: Vec<u8>,
    relationships: Option<Relationships>,
}

impl Part {
    /// Create a new part
    pub fn new(uri: PartUri, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            uri,
            content_type: content_type.into(),
            data,
            relationships: None,
        }
    }

    /// Get the part URI
    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    /// Get the content type
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get data as UTF-8 string
    pub fn data_as_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.data)?)
    }

    /// Get relationships
    pub fn relationships(&self) -> Option<&Relationships> {
        self.relationships.as_ref()
    }

    /// Set relationships
    pub fn set_relationships(&mut self, rels: Relationships) {
        self.relationships = Some(rels);
    }

    /// Split into the raw bytes and the relationship table
    pub fn into_data(self) -> (Vec<u8>, Option<Relationships>) {
        (self.data, self.relationships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_as_str_rejects_invalid_utf8() {
        let part = Part::new(
            PartUri::new("/word/document.xml").unwrap(),
            "application/xml",
            vec![0xff, 0xfe],
        );
        let err = part.data_as_str().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }
}

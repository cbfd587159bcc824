//! Inline pictures (w:drawing / wp:inline)

use crate::document::validate::check_emu;
use crate::error::Result;
use crate::xml::{RawXmlElement, A, PIC};
use quick_xml::Writer;

/// EMUs per inch
pub const EMU_PER_INCH: u64 = 914_400;
/// EMUs per pixel at 96 DPI
pub const EMU_PER_PIXEL: u64 = 9_525;

/// An inline picture referencing an image part through a relationship
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Drawing {
    rel_id: String,
    id: u64,
    cx: u64,
    cy: u64,
    name: String,
    description: String,
}

impl Drawing {
    /// Create a drawing of `cx` x `cy` EMUs showing the image behind `rel_id`.
    ///
    /// `id` is the document-unique `wp:docPr` id.
    pub fn new(rel_id: impl Into<String>, id: u64, cx: u64, cy: u64) -> Result<Self> {
        check_emu("new_drawing", "cx", cx)?;
        check_emu("new_drawing", "cy", cy)?;
        Ok(Self {
            rel_id: rel_id.into(),
            id,
            cx,
            cy,
            name: format!("Picture {}", id),
            description: String::new(),
        })
    }

    /// Set the alternative text
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Relationship ID of the embedded image
    pub fn rel_id(&self) -> &str {
        &self.rel_id
    }

    /// Drawing object ID (`wp:docPr id`)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width and height in EMUs
    pub fn extent(&self) -> (u64, u64) {
        (self.cx, self.cy)
    }

    /// Drawing object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative text
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_emu("validate", "drawing cx", self.cx)?;
        check_emu("validate", "drawing cy", self.cy)
    }

    fn to_element(&self) -> RawXmlElement {
        let cx = self.cx.to_string();
        let cy = self.cy.to_string();
        let id = self.id.to_string();

        let picture = RawXmlElement::new("pic:pic")
            .with_attr("xmlns:pic", PIC)
            .with_child(
                RawXmlElement::new("pic:nvPicPr")
                    .with_child(
                        RawXmlElement::new("pic:cNvPr")
                            .with_attr("id", "0")
                            .with_attr("name", self.name.as_str())
                            .with_attr("descr", self.description.as_str()),
                    )
                    .with_child(RawXmlElement::new("pic:cNvPicPr")),
            )
            .with_child(
                RawXmlElement::new("pic:blipFill")
                    .with_child(RawXmlElement::new("a:blip").with_attr("r:embed", self.rel_id.as_str()))
                    .with_child(
                        RawXmlElement::new("a:stretch").with_child(RawXmlElement::new("a:fillRect")),
                    ),
            )
            .with_child(
                RawXmlElement::new("pic:spPr")
                    .with_child(
                        RawXmlElement::new("a:xfrm")
                            .with_child(RawXmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                            .with_child(
                                RawXmlElement::new("a:ext")
                                    .with_attr("cx", cx.as_str())
                                    .with_attr("cy", cy.as_str()),
                            ),
                    )
                    .with_child(
                        RawXmlElement::new("a:prstGeom")
                            .with_attr("prst", "rect")
                            .with_child(RawXmlElement::new("a:avLst")),
                    ),
            );

        let inline = RawXmlElement::new("wp:inline")
            .with_attr("distT", "0")
            .with_attr("distB", "0")
            .with_attr("distL", "0")
            .with_attr("distR", "0")
            .with_child(
                RawXmlElement::new("wp:extent")
                    .with_attr("cx", cx.as_str())
                    .with_attr("cy", cy.as_str()),
            )
            .with_child(
                RawXmlElement::new("wp:effectExtent")
                    .with_attr("l", "0")
                    .with_attr("t", "0")
                    .with_attr("r", "0")
                    .with_attr("b", "0"),
            )
            .with_child(
                RawXmlElement::new("wp:docPr")
                    .with_attr("id", id.as_str())
                    .with_attr("name", self.name.as_str())
                    .with_attr("descr", self.description.as_str()),
            )
            .with_child(
                RawXmlElement::new("wp:cNvGraphicFramePr").with_child(
                    RawXmlElement::new("a:graphicFrameLocks")
                        .with_attr("xmlns:a", A)
                        .with_attr("noChangeAspect", "1"),
                ),
            )
            .with_child(
                RawXmlElement::new("a:graphic").with_attr("xmlns:a", A).with_child(
                    RawXmlElement::new("a:graphicData")
                        .with_attr("uri", PIC)
                        .with_child(picture),
                ),
            );

        RawXmlElement::new("w:drawing").with_child(inline)
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        self.to_element().write_to(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_is_validated() {
        assert!(Drawing::new("rId1", 1, 0, 100).is_err());
        assert!(Drawing::new("rId1", 1, 100, MAX_EMU_PLUS_ONE).is_err());
        let drawing = Drawing::new("rId1", 1, EMU_PER_INCH, EMU_PER_INCH / 2).unwrap();
        assert_eq!(drawing.extent(), (914_400, 457_200));
    }

    const MAX_EMU_PLUS_ONE: u64 = crate::document::validate::MAX_EMU + 1;

    #[test]
    fn test_written_markup_references_relationship() {
        let drawing = Drawing::new("rId7", 3, 9525, 19050)
            .unwrap()
            .with_description("logo");
        let mut out = Vec::new();
        drawing.write_to(&mut Writer::new(&mut out)).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.starts_with("<w:drawing><wp:inline"));
        assert!(xml.contains(r#"<wp:extent cx="9525" cy="19050"/>"#));
        assert!(xml.contains(r#"<wp:docPr id="3" name="Picture 3" descr="logo"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId7"/>"#));
    }
}

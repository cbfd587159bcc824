//! Table-related types and enums

use crate::xml::get_w_attr;
use quick_xml::events::BytesStart;

/// Grid column definition
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridColumn {
    /// Width in twips
    pub width: Option<u32>,
}

/// Vertical merge type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VMerge {
    /// Start of a new vertical merge group
    Restart,
    /// Continuation of a vertical merge
    Continue,
}

/// Width of a table or cell (`w:tblW`, `w:tcW`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableWidth {
    /// Automatic width
    #[default]
    Auto,
    /// Fiftieths of a percent (5000 = 100%)
    Percent(u32),
    /// Width in twips (1/20 of a point)
    Twips(u32),
}

impl TableWidth {
    /// Parse from `w:w` / `w:type`; `None` for forms kept verbatim
    pub(crate) fn parse(e: &BytesStart) -> Option<Self> {
        let attrs = crate::xml::attributes_of(e);
        if !attrs.iter().all(|(k, _)| k == "w:w" || k == "w:type") {
            return None;
        }
        let value = get_w_attr(e, "w");
        match get_w_attr(e, "type").as_deref() {
            Some("auto") => match value.as_deref() {
                None | Some("0") => Some(TableWidth::Auto),
                _ => None,
            },
            Some("dxa") | None => value?.parse().ok().map(TableWidth::Twips),
            Some("pct") => value?.parse().ok().map(TableWidth::Percent),
            _ => None,
        }
    }

    /// `(w:w, w:type)` attribute values
    pub(crate) fn attributes(&self) -> (String, &'static str) {
        match self {
            TableWidth::Auto => ("0".to_string(), "auto"),
            TableWidth::Percent(v) => (v.to_string(), "pct"),
            TableWidth::Twips(v) => (v.to_string(), "dxa"),
        }
    }
}

/// Table alignment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableAlignment {
    /// Left aligned (default)
    #[default]
    Left,
    /// Center aligned
    Center,
    /// Right aligned
    Right,
}

impl TableAlignment {
    /// Parse from OOXML string value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(TableAlignment::Left),
            "center" => Some(TableAlignment::Center),
            "right" => Some(TableAlignment::Right),
            _ => None,
        }
    }

    /// Convert to OOXML string value
    pub fn as_str(&self) -> &'static str {
        match self {
            TableAlignment::Left => "left",
            TableAlignment::Center => "center",
            TableAlignment::Right => "right",
        }
    }
}

/// Vertical alignment for table cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    /// Top aligned (default)
    #[default]
    Top,
    /// Center aligned
    Center,
    /// Bottom aligned
    Bottom,
}

impl VerticalAlignment {
    /// Parse from OOXML string value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top" => Some(VerticalAlignment::Top),
            "center" => Some(VerticalAlignment::Center),
            "bottom" => Some(VerticalAlignment::Bottom),
            _ => None,
        }
    }

    /// Convert to OOXML string value
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }
}

/// Extent of a cell in grid columns and rows.
///
/// A cell covered by a vertical merge from above has `rowspan == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSpan {
    pub colspan: usize,
    pub rowspan: usize,
}

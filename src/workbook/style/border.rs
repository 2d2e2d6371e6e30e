use crate::workbook::style::color::Color;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    fn as_xml_attr(&self) -> Option<&'static str> {
        match self {
            BorderStyle::None => None,
            BorderStyle::Thin => Some("thin"),
            BorderStyle::Medium => Some("medium"),
            BorderStyle::Thick => Some("thick"),
            BorderStyle::Dashed => Some("dashed"),
            BorderStyle::Dotted => Some("dotted"),
            BorderStyle::Double => Some("double"),
            BorderStyle::Hair => Some("hair"),
            BorderStyle::MediumDashed => Some("mediumDashed"),
            BorderStyle::DashDot => Some("dashDot"),
            BorderStyle::MediumDashDot => Some("mediumDashDot"),
            BorderStyle::DashDotDot => Some("dashDotDot"),
            BorderStyle::MediumDashDotDot => Some("mediumDashDotDot"),
            BorderStyle::SlantDashDot => Some("slantDashDot"),
        }
    }

    pub fn from_xml_attr(s: &str) -> Self {
        match s {
            "thin" => BorderStyle::Thin,
            "medium" => BorderStyle::Medium,
            "thick" => BorderStyle::Thick,
            "dashed" => BorderStyle::Dashed,
            "dotted" => BorderStyle::Dotted,
            "double" => BorderStyle::Double,
            "hair" => BorderStyle::Hair,
            "mediumDashed" => BorderStyle::MediumDashed,
            "dashDot" => BorderStyle::DashDot,
            "mediumDashDot" => BorderStyle::MediumDashDot,
            "dashDotDot" => BorderStyle::DashDotDot,
            "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
            "slantDashDot" => BorderStyle::SlantDashDot,
            _ => BorderStyle::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Option<Color>,
}

impl BorderSide {
    pub fn new(style: BorderStyle) -> Self {
        BorderSide { style, color: None }
    }

    fn to_xml(&self, tag: &str) -> String {
        let style = self
            .style
            .as_xml_attr()
            .map(|s| format!(" style=\"{s}\""))
            .unwrap_or_default();
        match &self.color {
            None => format!("<{tag}{style}/>"),
            Some(c) => format!("<{tag}{style}>{}</{tag}>", c.to_xml("color")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Border {
    pub left: BorderSide,
    pub right: BorderSide,
    pub top: BorderSide,
    pub bottom: BorderSide,
    pub diagonal: BorderSide,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

impl Border {
    pub fn to_xml(&self) -> String {
        let mut open = String::from("<border");
        if self.diagonal_up {
            open.push_str(" diagonalUp=\"1\"");
        }
        if self.diagonal_down {
            open.push_str(" diagonalDown=\"1\"");
        }
        format!(
            "{open}>{}{}{}{}{}</border>",
            self.left.to_xml("left"),
            self.right.to_xml("right"),
            self.top.to_xml("top"),
            self.bottom.to_xml("bottom"),
            self.diagonal.to_xml("diagonal"),
        )
    }
}

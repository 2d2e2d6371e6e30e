use crate::workbook::{style::color::Color, xml_escape};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fill {
    None,
    Solid(Color),
    /// Any other pattern ("gray125", "lightGrid", ...) with its optional colors.
    Pattern {
        pattern: String,
        fg: Option<Color>,
        bg: Option<Color>,
    },
    Gradient(GradientFill),
}

/// A `<gradientFill>`. Numeric attributes are kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GradientFill {
    /// "linear" (the default) or "path".
    pub kind: Option<String>,
    pub degree: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
    pub top: Option<String>,
    pub bottom: Option<String>,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GradientStop {
    pub position: String,
    pub color: Color,
}

impl GradientFill {
    fn to_xml(&self) -> String {
        let mut xml = String::from("<gradientFill");
        for (name, value) in [
            ("type", &self.kind),
            ("degree", &self.degree),
            ("left", &self.left),
            ("right", &self.right),
            ("top", &self.top),
            ("bottom", &self.bottom),
        ] {
            if let Some(value) = value {
                xml.push_str(&format!(" {name}=\"{}\"", xml_escape(value)));
            }
        }
        xml.push('>');
        for stop in &self.stops {
            xml.push_str(&format!(
                "<stop position=\"{}\">{}</stop>",
                xml_escape(&stop.position),
                stop.color.to_xml("color")
            ));
        }
        xml.push_str("</gradientFill>");
        xml
    }
}

impl Fill {
    pub fn to_xml(&self) -> String {
        match self {
            Fill::None => "<fill><patternFill/></fill>".into(),
            Fill::Solid(c) => format!(
                "<fill><patternFill patternType=\"solid\">{}</patternFill></fill>",
                c.to_xml("fgColor")
            ),
            Fill::Pattern { pattern, fg, bg } => {
                let fg = fg.as_ref().map(|c| c.to_xml("fgColor")).unwrap_or_default();
                let bg = bg.as_ref().map(|c| c.to_xml("bgColor")).unwrap_or_default();
                format!(
                    "<fill><patternFill patternType=\"{}\">{fg}{bg}</patternFill></fill>",
                    xml_escape(pattern)
                )
            }
            Fill::Gradient(gradient) => format!("<fill>{}</fill>", gradient.to_xml()),
        }
    }
}

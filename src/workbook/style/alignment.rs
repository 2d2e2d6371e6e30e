use crate::workbook::xml_escape;

/// Cell alignment. Values are the raw OOXML attribute values ("center",
/// "left", "top", ...) so any alignment read from a workbook is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub indent: u32,
    /// Degrees 0-180, or 255 for stacked text.
    pub text_rotation: Option<u32>,
    pub shrink_to_fit: bool,
    pub reading_order: Option<u32>,
    pub justify_last_line: bool,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Alignment::default()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<alignment");
        if let Some(h) = &self.horizontal {
            xml.push_str(&format!(" horizontal=\"{}\"", xml_escape(h)));
        }
        if let Some(v) = &self.vertical {
            xml.push_str(&format!(" vertical=\"{}\"", xml_escape(v)));
        }
        if let Some(r) = self.text_rotation {
            xml.push_str(&format!(" textRotation=\"{r}\""));
        }
        if self.wrap_text {
            xml.push_str(" wrapText=\"1\"");
        }
        if self.indent > 0 {
            xml.push_str(&format!(" indent=\"{}\"", self.indent));
        }
        if self.justify_last_line {
            xml.push_str(" justifyLastLine=\"1\"");
        }
        if self.shrink_to_fit {
            xml.push_str(" shrinkToFit=\"1\"");
        }
        if let Some(order) = self.reading_order {
            xml.push_str(&format!(" readingOrder=\"{order}\""));
        }
        xml.push_str("/>");
        xml
    }
}

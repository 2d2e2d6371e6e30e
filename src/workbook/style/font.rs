use crate::workbook::{style::color::Color, xml_escape};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl Underline {
    /// `<u/>` without a value means single.
    pub fn from_xml_attr(val: Option<&str>) -> Self {
        match val {
            None | Some("single") => Underline::Single,
            Some("double") => Underline::Double,
            Some("singleAccounting") => Underline::SingleAccounting,
            Some("doubleAccounting") => Underline::DoubleAccounting,
            Some(_) => Underline::None,
        }
    }

    fn to_xml(self) -> &'static str {
        match self {
            Underline::None => "",
            Underline::Single => "<u/>",
            Underline::Double => "<u val=\"double\"/>",
            Underline::SingleAccounting => "<u val=\"singleAccounting\"/>",
            Underline::DoubleAccounting => "<u val=\"doubleAccounting\"/>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strike: bool,
    pub outline: bool,
    pub shadow: bool,
    /// "superscript" or "subscript".
    pub vert_align: Option<String>,
    /// In twentieths of a point, so 11pt is 220.
    pub size: u32,
    pub color: Option<Color>,
    pub name: String,
    pub family: Option<u32>,
    pub charset: Option<u32>,
    /// "major" or "minor" when the font follows the theme.
    pub scheme: Option<String>,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            bold: false,
            italic: false,
            underline: Underline::None,
            strike: false,
            outline: false,
            shadow: false,
            vert_align: None,
            size: 220,
            color: None,
            name: "Calibri".into(),
            family: None,
            charset: None,
            scheme: None,
        }
    }
}

impl Font {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<font>");
        if self.bold {
            xml.push_str("<b/>");
        }
        if self.italic {
            xml.push_str("<i/>");
        }
        if self.strike {
            xml.push_str("<strike/>");
        }
        if self.outline {
            xml.push_str("<outline/>");
        }
        if self.shadow {
            xml.push_str("<shadow/>");
        }
        xml.push_str(self.underline.to_xml());
        if let Some(v) = &self.vert_align {
            xml.push_str(&format!("<vertAlign val=\"{}\"/>", xml_escape(v)));
        }

        let pt = f64::from(self.size) / 20.0;
        xml.push_str(&format!("<sz val=\"{pt}\"/>"));

        if let Some(c) = &self.color {
            xml.push_str(&c.to_xml("color"));
        }

        xml.push_str(&format!("<name val=\"{}\"/>", xml_escape(&self.name)));
        if let Some(family) = self.family {
            xml.push_str(&format!("<family val=\"{family}\"/>"));
        }
        if let Some(charset) = self.charset {
            xml.push_str(&format!("<charset val=\"{charset}\"/>"));
        }
        if let Some(scheme) = &self.scheme {
            xml.push_str(&format!("<scheme val=\"{}\"/>", xml_escape(scheme)));
        }
        xml.push_str("</font>");
        xml
    }
}

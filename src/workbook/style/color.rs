use crate::workbook::xml_escape;

/// A color as stored in styles.xml. Theme and indexed colors are kept as
/// references; theme colors resolve against the theme part copied from the
/// source, indexed colors against the default palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    Rgb(String),
    Theme { theme: u32, tint: Option<String> },
    Indexed(u32),
    Auto,
}

impl Color {
    /// Accepts "#RRGGBB", "RRGGBB" or "AARRGGBB".
    pub fn new(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            Color::Rgb(format!("FF{}", hex.to_uppercase()))
        } else {
            Color::Rgb(hex.to_uppercase())
        }
    }

    /// Renders the color attributes, e.g. `rgb="FF000000"` or `theme="1" tint="-0.5"`.
    pub(crate) fn attrs(&self) -> String {
        match self {
            Color::Rgb(argb) => format!("rgb=\"{}\"", xml_escape(argb)),
            Color::Theme { theme, tint: None } => format!("theme=\"{theme}\""),
            Color::Theme {
                theme,
                tint: Some(tint),
            } => format!("theme=\"{theme}\" tint=\"{}\"", xml_escape(tint)),
            Color::Indexed(i) => format!("indexed=\"{i}\""),
            Color::Auto => "auto=\"1\"".into(),
        }
    }

    pub(crate) fn to_xml(&self, tag: &str) -> String {
        format!("<{tag} {}/>", self.attrs())
    }
}

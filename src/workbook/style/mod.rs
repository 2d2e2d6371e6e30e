use std::collections::HashMap;

use crate::workbook::{
    style::{
        alignment::Alignment,
        border::{Border, BorderStyle},
        color::Color,
        fill::Fill,
        font::{Font, Underline},
        number::NumberFormat,
        protection::Protection,
    },
    xml_escape,
};
pub mod alignment;
pub mod border;
pub mod color;
pub mod fill;
pub mod font;
pub mod number;
pub mod protection;

/// Everything a `cellXfs` entry points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Style {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub number_format: NumberFormat,
    pub alignment: Alignment,
    pub protection: Protection,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            font: Font::default(),
            fill: Fill::None,
            border: Border::default(),
            number_format: NumberFormat::General,
            alignment: Alignment::default(),
            protection: Protection::default(),
        }
    }
}

impl Style {
    pub fn new() -> Self {
        Style::default()
    }

    pub fn bold(mut self) -> Self {
        self.font.bold = true;
        self
    }
    pub fn italic(mut self) -> Self {
        self.font.italic = true;
        self
    }
    pub fn underline(mut self) -> Self {
        self.font.underline = Underline::Single;
        self
    }
    pub fn font_size(mut self, pt: u32) -> Self {
        self.font.size = pt * 20;
        self
    }
    pub fn font_color(mut self, hex: &str) -> Self {
        self.font.color = Some(Color::new(hex));
        self
    }
    pub fn font_name(mut self, name: &str) -> Self {
        self.font.name = name.into();
        self
    }

    pub fn bg(mut self, hex: &str) -> Self {
        self.fill = Fill::Solid(Color::new(hex));
        self
    }

    pub fn border_all(mut self, style: BorderStyle) -> Self {
        self.border.left.style = style;
        self.border.right.style = style;
        self.border.top.style = style;
        self.border.bottom.style = style;
        self
    }
    pub fn border_left(mut self, style: BorderStyle) -> Self {
        self.border.left.style = style;
        self
    }
    pub fn border_right(mut self, style: BorderStyle) -> Self {
        self.border.right.style = style;
        self
    }
    pub fn border_top(mut self, style: BorderStyle) -> Self {
        self.border.top.style = style;
        self
    }
    pub fn border_bottom(mut self, style: BorderStyle) -> Self {
        self.border.bottom.style = style;
        self
    }

    pub fn border_color(mut self, hex: &str) -> Self {
        let color = Some(Color::new(hex));
        self.border.left.color = color.clone();
        self.border.right.color = color.clone();
        self.border.top.color = color.clone();
        self.border.bottom.color = color;
        self
    }

    pub fn format(mut self, fmt: NumberFormat) -> Self {
        self.number_format = fmt;
        self
    }
    pub fn custom_format(mut self, fmt: &str) -> Self {
        self.number_format = NumberFormat::Custom(fmt.into());
        self
    }

    pub fn align(mut self, horizontal: &str) -> Self {
        self.alignment.horizontal = Some(horizontal.into());
        self
    }
    pub fn wrap(mut self) -> Self {
        self.alignment.wrap_text = true;
        self
    }
}

type XfKey = (usize, usize, usize, u32, usize, Protection);

/// Deduplicating table of fonts, fills, borders, number formats and xfs
/// that renders to `xl/styles.xml`. Index 0 of every table is the default.
pub struct StyleRegistry {
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    alignments: Vec<Alignment>,
    num_fmts: Vec<(u32, String)>,
    font_index: HashMap<Font, usize>,
    fill_index: HashMap<Fill, usize>,
    border_index: HashMap<Border, usize>,
    alignment_index: HashMap<Alignment, usize>,
    num_fmt_index: HashMap<String, u32>,
    xfs: Vec<XfKey>,
    xf_index: HashMap<XfKey, usize>,

    next_num_fmt_id: u32,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRegistry {
    pub fn new() -> Self {
        let mut reg = StyleRegistry {
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            alignments: Vec::new(),
            num_fmts: Vec::new(),
            font_index: HashMap::new(),
            fill_index: HashMap::new(),
            border_index: HashMap::new(),
            alignment_index: HashMap::new(),
            num_fmt_index: HashMap::new(),
            xfs: Vec::new(),
            xf_index: HashMap::new(),
            next_num_fmt_id: 164,
        };

        // Excel requires fills 0 and 1 to be "none" and "gray125".
        reg.intern_font(Font::default());
        reg.intern_fill(Fill::None);
        reg.intern_fill(Fill::Pattern {
            pattern: "gray125".into(),
            fg: None,
            bg: None,
        });
        reg.intern_border(Border::default());
        reg.intern_alignment(Alignment::default());
        reg.intern_xf((0, 0, 0, 0, 0, Protection::default()));

        reg
    }

    /// Returns the `cellXfs` index for `style`, adding it if unseen.
    pub fn register(&mut self, style: &Style) -> usize {
        let font_id = self.intern_font(style.font.clone());
        let fill_id = self.intern_fill(style.fill.clone());
        let border_id = self.intern_border(style.border.clone());
        let fmt_id = self.intern_num_fmt(&style.number_format);
        let align_id = self.intern_alignment(style.alignment.clone());
        self.intern_xf((font_id, fill_id, border_id, fmt_id, align_id, style.protection))
    }

    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }

    fn intern_font(&mut self, font: Font) -> usize {
        if let Some(&i) = self.font_index.get(&font) {
            return i;
        }
        let i = self.fonts.len();
        self.font_index.insert(font.clone(), i);
        self.fonts.push(font);
        i
    }

    fn intern_fill(&mut self, fill: Fill) -> usize {
        if let Some(&i) = self.fill_index.get(&fill) {
            return i;
        }
        let i = self.fills.len();
        self.fill_index.insert(fill.clone(), i);
        self.fills.push(fill);
        i
    }

    fn intern_border(&mut self, border: Border) -> usize {
        if let Some(&i) = self.border_index.get(&border) {
            return i;
        }
        let i = self.borders.len();
        self.border_index.insert(border.clone(), i);
        self.borders.push(border);
        i
    }

    fn intern_alignment(&mut self, alignment: Alignment) -> usize {
        if let Some(&i) = self.alignment_index.get(&alignment) {
            return i;
        }
        let i = self.alignments.len();
        self.alignment_index.insert(alignment.clone(), i);
        self.alignments.push(alignment);
        i
    }

    fn intern_num_fmt(&mut self, fmt: &NumberFormat) -> u32 {
        if let Some(id) = fmt.builtin_id() {
            return id;
        }
        if let NumberFormat::Custom(code) = fmt {
            if let Some(&id) = self.num_fmt_index.get(code) {
                return id;
            }
            let id = self.next_num_fmt_id;
            self.next_num_fmt_id += 1;
            self.num_fmt_index.insert(code.clone(), id);
            self.num_fmts.push((id, code.clone()));
            return id;
        }
        0
    }

    fn intern_xf(&mut self, key: XfKey) -> usize {
        if let Some(&i) = self.xf_index.get(&key) {
            return i;
        }
        let i = self.xfs.len();
        self.xf_index.insert(key, i);
        self.xfs.push(key);
        i
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        out.push_str(
            "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\n",
        );

        if !self.num_fmts.is_empty() {
            out.push_str(&format!("<numFmts count=\"{}\">\n", self.num_fmts.len()));
            for (id, code) in &self.num_fmts {
                out.push_str(&format!(
                    "<numFmt numFmtId=\"{id}\" formatCode=\"{}\"/>\n",
                    xml_escape(code)
                ));
            }
            out.push_str("</numFmts>\n");
        }

        out.push_str(&format!("<fonts count=\"{}\">\n", self.fonts.len()));
        for font in &self.fonts {
            out.push_str(&format!("{}\n", font.to_xml()));
        }
        out.push_str("</fonts>\n");

        out.push_str(&format!("<fills count=\"{}\">\n", self.fills.len()));
        for fill in &self.fills {
            out.push_str(&format!("{}\n", fill.to_xml()));
        }
        out.push_str("</fills>\n");

        out.push_str(&format!("<borders count=\"{}\">\n", self.borders.len()));
        for border in &self.borders {
            out.push_str(&format!("{}\n", border.to_xml()));
        }
        out.push_str("</borders>\n");

        out.push_str("<cellStyleXfs count=\"1\">\n");
        out.push_str("<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/>\n");
        out.push_str("</cellStyleXfs>\n");

        out.push_str(&format!("<cellXfs count=\"{}\">\n", self.xfs.len()));
        for &(font_id, fill_id, border_id, num_fmt_id, align_id, protection) in &self.xfs {
            let mut xf = format!(
                "<xf numFmtId=\"{num_fmt_id}\" fontId=\"{font_id}\" fillId=\"{fill_id}\" borderId=\"{border_id}\" xfId=\"0\""
            );
            if num_fmt_id != 0 {
                xf.push_str(" applyNumberFormat=\"1\"");
            }
            if font_id != 0 {
                xf.push_str(" applyFont=\"1\"");
            }
            if fill_id != 0 {
                xf.push_str(" applyFill=\"1\"");
            }
            if border_id != 0 {
                xf.push_str(" applyBorder=\"1\"");
            }
            let alignment = &self.alignments[align_id];
            let mut children = String::new();
            if !alignment.is_default() {
                xf.push_str(" applyAlignment=\"1\"");
                children.push_str(&alignment.to_xml());
            }
            if !protection.is_default() {
                xf.push_str(" applyProtection=\"1\"");
                children.push_str(&protection.to_xml());
            }
            if children.is_empty() {
                xf.push_str("/>\n");
            } else {
                xf.push_str(&format!(">{children}</xf>\n"));
            }
            out.push_str(&xf);
        }
        out.push_str("</cellXfs>\n");

        out.push_str("<cellStyles count=\"1\">\n");
        out.push_str("<cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/>\n");
        out.push_str("</cellStyles>\n");

        out.push_str("</styleSheet>");
        out
    }
}

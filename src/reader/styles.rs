use std::collections::HashMap;

use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};

use crate::Result;
use crate::reader::{attr_val, is_true};
use crate::workbook::style::{
    Style,
    alignment::Alignment,
    border::{Border, BorderSide, BorderStyle},
    color::Color,
    fill::{Fill, GradientFill, GradientStop},
    font::{Font, Underline},
    number::NumberFormat,
    protection::Protection,
};

/// The part of styles.xml being read. Elements outside these sections
/// (`cellStyleXfs`, `dxfs`, ...) reuse the same tag names and are ignored.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
    Diagonal,
}

#[derive(Default)]
struct PendingFill {
    pattern: Option<String>,
    fg: Option<Color>,
    bg: Option<Color>,
    gradient: Option<GradientFill>,
    /// Position of the `<stop>` being read.
    stop: Option<String>,
}

impl PendingFill {
    fn finish(self) -> Fill {
        if let Some(gradient) = self.gradient {
            return Fill::Gradient(gradient);
        }
        match self.pattern.as_deref() {
            None | Some("none") => Fill::None,
            Some(pattern) => Fill::Pattern {
                pattern: pattern.to_string(),
                fg: self.fg,
                bg: self.bg,
            },
        }
    }
}

struct Xf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

struct StylesParser {
    section: Section,
    num_fmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    xfs: Vec<Xf>,

    font: Option<Font>,
    fill: Option<PendingFill>,
    border: Option<Border>,
    side: Option<Side>,
    xf: Option<Xf>,
}

/// Parses `xl/styles.xml` into one [`Style`] per `cellXfs` entry.
pub fn parse_styles(bytes: &[u8]) -> Result<Vec<Style>> {
    let mut xml = XmlReader::from_reader(bytes);
    xml.config_mut().trim_text(true);

    let mut parser = StylesParser {
        section: Section::Other,
        num_fmts: HashMap::new(),
        fonts: Vec::new(),
        fills: Vec::new(),
        borders: Vec::new(),
        xfs: Vec::new(),
        font: None,
        fill: None,
        border: None,
        side: None,
        xf: None,
    };

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => parser.open(e),
            Event::Empty(ref e) => {
                parser.open(e);
                parser.close(e.local_name().as_ref());
            }
            Event::End(ref e) => parser.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.into_styles())
}

fn parse_color(e: &BytesStart) -> Option<Color> {
    let mut rgb = None;
    let mut theme = None;
    let mut tint = None;
    let mut indexed = None;
    let mut auto = false;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"rgb" => rgb = Some(attr_val(&attr)),
            b"theme" => theme = attr_val(&attr).parse().ok(),
            b"tint" => tint = Some(attr_val(&attr)),
            b"indexed" => indexed = attr_val(&attr).parse().ok(),
            b"auto" => auto = is_true(&attr_val(&attr)),
            _ => {}
        }
    }
    match (rgb, theme, indexed) {
        (Some(rgb), ..) => Some(Color::new(&rgb)),
        (None, Some(theme), _) => Some(Color::Theme { theme, tint }),
        (None, None, Some(i)) => Some(Color::Indexed(i)),
        _ if auto => Some(Color::Auto),
        _ => None,
    }
}

/// `<b/>` and `<b val="1"/>` are on, `<b val="0"/>` is off.
fn flag(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"val")
        .map(|a| is_true(&attr_val(&a)))
        .unwrap_or(true)
}

fn val(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"val")
        .map(|a| attr_val(&a))
}

impl StylesParser {
    fn open(&mut self, e: &BytesStart) {
        let name = e.local_name();
        match (self.section, name.as_ref()) {
            (_, b"numFmts") => self.section = Section::NumFmts,
            (_, b"fonts") => self.section = Section::Fonts,
            (_, b"fills") => self.section = Section::Fills,
            (_, b"borders") => self.section = Section::Borders,
            (_, b"cellXfs") => self.section = Section::CellXfs,
            (_, b"cellStyleXfs" | b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors") => {
                self.section = Section::Other
            }

            (Section::NumFmts, b"numFmt") => {
                let mut id = None;
                let mut code = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => id = attr_val(&attr).parse().ok(),
                        b"formatCode" => code = Some(attr_val(&attr)),
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    self.num_fmts.insert(id, code);
                }
            }

            (Section::Fonts, b"font") => self.font = Some(Font::default()),
            (Section::Fonts, tag) => {
                let Some(font) = self.font.as_mut() else {
                    return;
                };
                match tag {
                    b"b" => font.bold = flag(e),
                    b"i" => font.italic = flag(e),
                    b"strike" => font.strike = flag(e),
                    b"outline" => font.outline = flag(e),
                    b"shadow" => font.shadow = flag(e),
                    b"u" => font.underline = Underline::from_xml_attr(val(e).as_deref()),
                    b"vertAlign" => font.vert_align = val(e),
                    b"family" => font.family = val(e).and_then(|v| v.parse().ok()),
                    b"charset" => font.charset = val(e).and_then(|v| v.parse().ok()),
                    b"scheme" => font.scheme = val(e),
                    b"sz" => {
                        if let Some(pt) = val(e).and_then(|v| v.parse::<f64>().ok()) {
                            font.size = (pt * 20.0).round() as u32;
                        }
                    }
                    b"name" => {
                        if let Some(name) = val(e) {
                            font.name = name;
                        }
                    }
                    b"color" => font.color = parse_color(e),
                    _ => {}
                }
            }

            (Section::Fills, b"fill") => self.fill = Some(PendingFill::default()),
            (Section::Fills, tag) => {
                let Some(fill) = self.fill.as_mut() else {
                    return;
                };
                match tag {
                    b"patternFill" => {
                        fill.pattern = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"patternType")
                            .map(|a| attr_val(&a));
                    }
                    b"fgColor" => fill.fg = parse_color(e),
                    b"bgColor" => fill.bg = parse_color(e),
                    b"gradientFill" => {
                        let mut gradient = GradientFill::default();
                        for attr in e.attributes().flatten() {
                            let value = Some(attr_val(&attr));
                            match attr.key.as_ref() {
                                b"type" => gradient.kind = value,
                                b"degree" => gradient.degree = value,
                                b"left" => gradient.left = value,
                                b"right" => gradient.right = value,
                                b"top" => gradient.top = value,
                                b"bottom" => gradient.bottom = value,
                                _ => {}
                            }
                        }
                        fill.gradient = Some(gradient);
                    }
                    b"stop" => {
                        fill.stop = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"position")
                            .map(|a| attr_val(&a));
                    }
                    b"color" => {
                        if let (Some(gradient), Some(position), Some(color)) =
                            (fill.gradient.as_mut(), fill.stop.take(), parse_color(e))
                        {
                            gradient.stops.push(GradientStop { position, color });
                        }
                    }
                    _ => {}
                }
            }

            (Section::Borders, b"border") => {
                let mut border = Border::default();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"diagonalUp" => border.diagonal_up = is_true(&attr_val(&attr)),
                        b"diagonalDown" => border.diagonal_down = is_true(&attr_val(&attr)),
                        _ => {}
                    }
                }
                self.border = Some(border);
            }
            (Section::Borders, tag) => {
                let Some(border) = self.border.as_mut() else {
                    return;
                };
                let side = match tag {
                    b"left" | b"start" => Side::Left,
                    b"right" | b"end" => Side::Right,
                    b"top" => Side::Top,
                    b"bottom" => Side::Bottom,
                    b"diagonal" => Side::Diagonal,
                    b"color" => {
                        if let Some(side) = self.side {
                            side_mut(border, side).color = parse_color(e);
                        }
                        return;
                    }
                    _ => return,
                };
                let style = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"style")
                    .map(|a| BorderStyle::from_xml_attr(&attr_val(&a)))
                    .unwrap_or_default();
                *side_mut(border, side) = BorderSide::new(style);
                self.side = Some(side);
            }

            (Section::CellXfs, b"xf") => {
                let mut xf = Xf {
                    num_fmt_id: 0,
                    font_id: 0,
                    fill_id: 0,
                    border_id: 0,
                    alignment: Alignment::default(),
                    protection: Protection::default(),
                };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => xf.num_fmt_id = attr_val(&attr).parse().unwrap_or(0),
                        b"fontId" => xf.font_id = attr_val(&attr).parse().unwrap_or(0),
                        b"fillId" => xf.fill_id = attr_val(&attr).parse().unwrap_or(0),
                        b"borderId" => xf.border_id = attr_val(&attr).parse().unwrap_or(0),
                        _ => {}
                    }
                }
                self.xf = Some(xf);
            }
            (Section::CellXfs, b"alignment") => {
                let Some(xf) = self.xf.as_mut() else {
                    return;
                };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"horizontal" => xf.alignment.horizontal = Some(attr_val(&attr)),
                        b"vertical" => xf.alignment.vertical = Some(attr_val(&attr)),
                        b"wrapText" => xf.alignment.wrap_text = is_true(&attr_val(&attr)),
                        b"indent" => xf.alignment.indent = attr_val(&attr).parse().unwrap_or(0),
                        b"textRotation" => xf.alignment.text_rotation = attr_val(&attr).parse().ok(),
                        b"shrinkToFit" => xf.alignment.shrink_to_fit = is_true(&attr_val(&attr)),
                        b"readingOrder" => xf.alignment.reading_order = attr_val(&attr).parse().ok(),
                        b"justifyLastLine" => {
                            xf.alignment.justify_last_line = is_true(&attr_val(&attr))
                        }
                        _ => {}
                    }
                }
            }
            (Section::CellXfs, b"protection") => {
                let Some(xf) = self.xf.as_mut() else {
                    return;
                };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"locked" => xf.protection.locked = is_true(&attr_val(&attr)),
                        b"hidden" => xf.protection.hidden = is_true(&attr_val(&attr)),
                        _ => {}
                    }
                }
            }

            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match (self.section, name) {
            (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs") => {
                self.section = Section::Other
            }
            (Section::Fonts, b"font") => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            (Section::Fills, b"fill") => {
                if let Some(fill) = self.fill.take() {
                    self.fills.push(fill.finish());
                }
            }
            (Section::Borders, b"border") => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
            }
            (
                Section::Borders,
                b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" | b"diagonal",
            ) => {
                self.side = None
            }
            (Section::CellXfs, b"xf") => {
                if let Some(xf) = self.xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn into_styles(self) -> Vec<Style> {
        self.xfs
            .into_iter()
            .map(|xf| Style {
                font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
                fill: self.fills.get(xf.fill_id).cloned().unwrap_or(Fill::None),
                border: self.borders.get(xf.border_id).cloned().unwrap_or_default(),
                number_format: NumberFormat::from_id(
                    xf.num_fmt_id,
                    self.num_fmts.get(&xf.num_fmt_id).map(String::as_str),
                ),
                alignment: xf.alignment,
                protection: xf.protection,
            })
            .collect()
    }
}

fn side_mut(border: &mut Border, side: Side) -> &mut BorderSide {
    match side {
        Side::Left => &mut border.left,
        Side::Right => &mut border.right,
        Side::Top => &mut border.top,
        Side::Bottom => &mut border.bottom,
        Side::Diagonal => &mut border.diagonal,
    }
}

//! Moving A1 references of a shared formula to the cell that reuses it.

use crate::reader::col_ref_to_index;
use crate::workbook::col_to_letters;

const MAX_COL: i64 = 16_383;
const MAX_ROW: i64 = 1_048_575;
const REF_ERROR: &str = "#REF!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefPart {
    Cell {
        col: i64,
        col_abs: bool,
        row: i64,
        row_abs: bool,
    },
    Col {
        col: i64,
        abs: bool,
    },
    Row {
        row: i64,
        abs: bool,
    },
}

/// Shifts every relative reference in `formula` by `rows` and `cols`.
///
/// `$`-anchored parts stay put. String literals, quoted sheet names,
/// bracketed structured references and function names are copied as-is.
/// A reference pushed off the grid becomes `#REF!`.
pub(crate) fn shift_formula(formula: &str, rows: i64, cols: i64) -> String {
    if rows == 0 && cols == 0 {
        return formula.to_string();
    }

    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' | '\'' => i = copy_quoted(&chars, i, &mut out),
            '[' => i = copy_bracketed(&chars, i, &mut out),
            c if is_token_char(c) => {
                let (token, end) = read_token(&chars, i);
                i = end;

                let next = chars.get(i).copied();
                if matches!(next, Some('(') | Some('!')) {
                    out.push_str(&token);
                    continue;
                }

                let Some(first) = parse_part(&token) else {
                    out.push_str(&token);
                    continue;
                };

                if next == Some(':') {
                    let (second_token, after) = read_token(&chars, i + 1);
                    if let Some(second) = parse_part(&second_token).filter(|s| same_kind(first, *s)) {
                        match (shift_part(first, rows, cols), shift_part(second, rows, cols)) {
                            (Some(a), Some(b)) => {
                                out.push_str(&a);
                                out.push(':');
                                out.push_str(&b);
                            }
                            _ => out.push_str(REF_ERROR),
                        }
                        i = after;
                        continue;
                    }
                }

                match first {
                    RefPart::Cell { .. } => {
                        out.push_str(&shift_part(first, rows, cols).unwrap_or_else(|| REF_ERROR.into()));
                    }
                    _ => out.push_str(&token),
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '\\')
}

fn read_token(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_token_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

/// Copies a `"..."` literal or `'...'` sheet name; a doubled quote is an escape.
fn copy_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == quote {
            if chars.get(i) == Some(&quote) {
                out.push(quote);
                i += 1;
            } else {
                break;
            }
        }
    }
    i
}

fn copy_bracketed(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    i
}

fn strip_dollar(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

fn parse_row(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: i64 = digits.parse().ok()?;
    (1..=MAX_ROW + 1).contains(&row).then_some(row - 1)
}

fn parse_part(token: &str) -> Option<RefPart> {
    let (col_abs, rest) = strip_dollar(token);
    let letters = rest.bytes().take_while(u8::is_ascii_uppercase).count();
    let (letters, rest) = rest.split_at(letters);

    if letters.is_empty() {
        return parse_row(rest).map(|row| RefPart::Row { row, abs: col_abs });
    }
    let col = i64::from(col_ref_to_index(letters)?);
    if rest.is_empty() {
        return Some(RefPart::Col { col, abs: col_abs });
    }
    let (row_abs, digits) = strip_dollar(rest);
    let row = parse_row(digits)?;
    Some(RefPart::Cell {
        col,
        col_abs,
        row,
        row_abs,
    })
}

fn same_kind(a: RefPart, b: RefPart) -> bool {
    matches!(
        (a, b),
        (RefPart::Cell { .. }, RefPart::Cell { .. })
            | (RefPart::Col { .. }, RefPart::Col { .. })
            | (RefPart::Row { .. }, RefPart::Row { .. })
    )
}

fn moved(index: i64, abs: bool, by: i64, max: i64) -> Option<i64> {
    let index = if abs { index } else { index + by };
    (0..=max).contains(&index).then_some(index)
}

fn dollar(abs: bool) -> &'static str {
    if abs { "$" } else { "" }
}

fn shift_part(part: RefPart, rows: i64, cols: i64) -> Option<String> {
    Some(match part {
        RefPart::Cell {
            col,
            col_abs,
            row,
            row_abs,
        } => {
            let col = moved(col, col_abs, cols, MAX_COL)?;
            let row = moved(row, row_abs, rows, MAX_ROW)?;
            format!(
                "{}{}{}{}",
                dollar(col_abs),
                col_to_letters(col as u32),
                dollar(row_abs),
                row + 1
            )
        }
        RefPart::Col { col, abs } => {
            let col = moved(col, abs, cols, MAX_COL)?;
            format!("{}{}", dollar(abs), col_to_letters(col as u32))
        }
        RefPart::Row { row, abs } => {
            let row = moved(row, abs, rows, MAX_ROW)?;
            format!("{}{}", dollar(abs), row + 1)
        }
    })
}

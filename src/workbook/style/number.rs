#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    General,  // (default)
    Integer,  // e.g 1,234
    Decimal2, // e.g 1,234.56
    Percent,  // e.g 12.3%
    Currency, // e.g $1,234.56
    Date,     // e.g 2024-01-31
    DateTime, // e.g 2024-01-31 14:30
    /// Any other built-in id, written back as-is.
    Builtin(u32),
    Custom(String),
}

impl NumberFormat {
    pub fn builtin_id(&self) -> Option<u32> {
        match self {
            NumberFormat::General => Some(0),
            NumberFormat::Integer => Some(1),   // "0"
            NumberFormat::Decimal2 => Some(4),  // "#,##0.00"
            NumberFormat::Percent => Some(10),  // "0.00%"
            NumberFormat::Currency => Some(7),  // "$#,##0.00"
            NumberFormat::Date => Some(14),     // "m/d/yyyy"
            NumberFormat::DateTime => Some(22), // "m/d/yyyy h:mm"
            NumberFormat::Builtin(id) => Some(*id),
            NumberFormat::Custom(_) => None,
        }
    }

    /// Maps a `numFmtId` from styles.xml. `custom` is the code declared under
    /// `<numFmts>` for that id, if any.
    pub fn from_id(id: u32, custom: Option<&str>) -> Self {
        if let Some(code) = custom {
            return NumberFormat::Custom(code.to_string());
        }
        match id {
            0 => NumberFormat::General,
            1 => NumberFormat::Integer,
            4 => NumberFormat::Decimal2,
            7 => NumberFormat::Currency,
            10 => NumberFormat::Percent,
            14 => NumberFormat::Date,
            22 => NumberFormat::DateTime,
            other => NumberFormat::Builtin(other),
        }
    }

    /// Whether numbers under this format display as dates or times.
    pub fn is_date(&self) -> bool {
        match self {
            NumberFormat::Date | NumberFormat::DateTime => true,
            NumberFormat::Builtin(id) => is_builtin_date_id(*id),
            NumberFormat::Custom(code) => is_date_format(code),
            _ => false,
        }
    }
}

fn is_builtin_date_id(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Scans the first section of a format code for unquoted, unescaped date or
/// time tokens. Elapsed-time codes such as `[h]:mm` are durations, not dates.
pub fn is_date_format(code: &str) -> bool {
    let mut escaped = false;
    let mut quoted = false;
    let mut brackets = 0u8;
    let mut prev = ' ';
    let mut elapsed = false;
    let mut am_pm = false;

    for ch in code.chars() {
        match (ch, escaped, quoted, am_pm, brackets) {
            (_, true, ..) => escaped = false,
            ('_' | '\\', ..) => escaped = true,
            ('"', _, true, _, _) => quoted = false,
            (_, _, true, _, _) => (),
            ('"', ..) => quoted = true,
            (';', ..) => return false,
            ('[', ..) => brackets += 1,
            (']', .., 1) if elapsed => return false,
            (']', ..) => brackets = brackets.saturating_sub(1),
            ('a' | 'A', _, _, false, 0) => am_pm = true,
            ('p' | 'm' | '/' | 'P' | 'M', _, _, true, 0) => return true,
            ('d' | 'm' | 'h' | 'y' | 's' | 'D' | 'M' | 'H' | 'Y' | 'S', _, _, false, 0) => {
                return true;
            }
            _ => {
                if !(elapsed && ch.eq_ignore_ascii_case(&prev)) {
                    elapsed = prev == '[' && matches!(ch, 'm' | 'h' | 's' | 'M' | 'H' | 'S');
                }
            }
        }
        prev = ch;
    }
    false
}

/// Cell protection, effective once the sheet is protected. Cells are locked
/// and visible unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Protection {
            locked: true,
            hidden: false,
        }
    }
}

impl Protection {
    pub fn is_default(&self) -> bool {
        *self == Protection::default()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<protection");
        if !self.locked {
            xml.push_str(" locked=\"0\"");
        }
        if self.hidden {
            xml.push_str(" hidden=\"1\"");
        }
        xml.push_str("/>");
        xml
    }
}

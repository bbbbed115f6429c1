//! Single-byte Cyrillic code pages used by the Bank of Russia publications.
//!
//! The registry tables are written in CP866 (DOS), the XML feeds declare Windows-1251. Both map
//! `0x00..=0x7F` to ASCII; only the upper half differs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codepage {
    Utf8,
    Cp866,
    Cp1251,
}

impl Codepage {
    /// Code page announced by a dBase language driver id (header byte 29).
    ///
    /// Unknown and zero ids fall back to CP866, which is what the registry is published in.
    pub fn from_dbase_driver(id: u8) -> Self {
        match id {
            0x57 | 0xC9 => Codepage::Cp1251,
            _ => Codepage::Cp866,
        }
    }

    /// Code page from an XML declaration `encoding` label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Codepage::Utf8),
            "windows-1251" | "cp1251" | "win-1251" => Some(Codepage::Cp1251),
            "cp866" | "ibm866" | "866" => Some(Codepage::Cp866),
            _ => None,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Codepage::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Codepage::Cp866 => bytes.iter().map(|&b| cp866(b)).collect(),
            Codepage::Cp1251 => bytes.iter().map(|&b| cp1251(b)).collect(),
        }
    }

    /// Inverse of [`Codepage::decode`]. Characters outside the code page become `?`.
    #[cfg(test)]
    pub(crate) fn encode(self, text: &str) -> Vec<u8> {
        let lookup: fn(u8) -> char = match self {
            Codepage::Utf8 => return text.as_bytes().to_vec(),
            Codepage::Cp866 => cp866,
            Codepage::Cp1251 => cp1251,
        };
        text.chars()
            .map(|c| {
                if c.is_ascii() {
                    c as u8
                } else {
                    (0x80..=0xFF).find(|&b| lookup(b) == c).unwrap_or(b'?')
                }
            })
            .collect()
    }
}

/// Locate the `encoding="..."` label of an XML declaration, if any.
pub(crate) fn xml_declared(bytes: &[u8]) -> Option<Codepage> {
    let head = &bytes[..bytes.len().min(200)];
    let head = std::str::from_utf8(head)
        .ok()
        .or_else(|| std::str::from_utf8(&head[..head.iter().position(|&b| b >= 0x80)?]).ok())?;
    let decl = &head[head.find("<?xml")?..];
    let decl = &decl[..decl.find("?>")?];
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    Codepage::from_label(&rest[..rest.find(quote)?])
}

fn cp866(b: u8) -> char {
    match b {
        0x00..=0x7F => b as char,
        0x80..=0xAF => char_at(0x0410, b - 0x80),
        0xB0..=0xDF => CP866_BOX[(b - 0xB0) as usize],
        0xE0..=0xEF => char_at(0x0440, b - 0xE0),
        0xF0..=0xFF => CP866_TAIL[(b - 0xF0) as usize],
    }
}

fn cp1251(b: u8) -> char {
    match b {
        0x00..=0x7F => b as char,
        0x80..=0xBF => CP1251_HIGH[(b - 0x80) as usize],
        0xC0..=0xFF => char_at(0x0410, b - 0xC0),
    }
}

fn char_at(base: u32, offset: u8) -> char {
    char::from_u32(base + offset as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

const CP866_BOX: [char; 48] = [
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
];

const CP866_TAIL: [char; 16] = [
    'Ё', 'ё', 'Є', 'є', 'Ї', 'ї', 'Ў', 'ў', '°', '∙', '·', '√', '№', '¤', '■', '\u{A0}',
];

const CP1251_HIGH: [char; 64] = [
    'Ђ', 'Ѓ', '‚', 'ѓ', '„', '…', '†', '‡', '€', '‰', 'Љ', '‹', 'Њ', 'Ќ', 'Ћ', 'Џ',
    'ђ', '‘', '’', '“', '”', '•', '–', '—', '\u{FFFD}', '™', 'љ', '›', 'њ', 'ќ', 'ћ', 'џ',
    '\u{A0}', 'Ў', 'ў', 'Ј', '¤', 'Ґ', '¦', '§', 'Ё', '©', 'Є', '«', '¬', '\u{AD}', '®', 'Ї',
    '°', '±', 'І', 'і', 'ґ', 'µ', '¶', '·', 'ё', '№', 'є', '»', 'ј', 'Ѕ', 'ѕ', 'ї',
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_letters() {
        // "Доллар США"
        let cp1251 = [
            0xC4, 0xEE, 0xEB, 0xEB, 0xE0, 0xF0, 0x20, 0xD1, 0xD8, 0xC0,
        ];
        assert_eq!(Codepage::Cp1251.decode(&cp1251), "Доллар США");

        // "НОВОСИБИРСК"
        let cp866 = [
            0x8D, 0x8E, 0x82, 0x8E, 0x91, 0x88, 0x81, 0x88, 0x90, 0x91, 0x8A,
        ];
        assert_eq!(Codepage::Cp866.decode(&cp866), "НОВОСИБИРСК");
        assert_eq!(Codepage::Cp866.decode(&[0xE0, 0xF1]), "рё");
    }

    #[test]
    fn test_encode_inverts_decode() {
        for page in [Codepage::Cp866, Codepage::Cp1251] {
            let text = "Ёлка №5, г. Новосибирск";
            assert_eq!(page.decode(&page.encode(text)), text);
        }
        assert_eq!(Codepage::Cp866.encode("日"), b"?");
    }

    #[test]
    fn test_xml_declaration() {
        let doc = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><ValCurs/>";
        assert_eq!(xml_declared(doc), Some(Codepage::Cp1251));
        assert_eq!(xml_declared(b"<?xml version='1.0' encoding='UTF-8'?>"), Some(Codepage::Utf8));
        assert_eq!(xml_declared(b"<ValCurs/>"), None);
    }

    #[test]
    fn test_dbase_driver() {
        assert_eq!(Codepage::from_dbase_driver(0x00), Codepage::Cp866);
        assert_eq!(Codepage::from_dbase_driver(0x65), Codepage::Cp866);
        assert_eq!(Codepage::from_dbase_driver(0xC9), Codepage::Cp1251);
    }
}

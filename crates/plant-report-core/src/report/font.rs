//! Base-14 Helvetica metrics and WinAnsi text encoding.
//!
//! Reports use the standard Type1 fonts every PDF viewer ships, so nothing
//! is embedded. Widths come from the Adobe AFM files (1/1000 em) and are
//! used for word wrapping and centering.

use lopdf::{Dictionary, Object};

/// Widths for ASCII 32..=126, Helvetica.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Widths for ASCII 32..=126, Helvetica-Bold.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

/// Width used for Latin-1 letters outside ASCII (mostly accented vowels).
const LATIN1_FALLBACK_WIDTH: u16 = 556;

/// Byte written for characters WinAnsi cannot represent.
const REPLACEMENT: u8 = b'?';

/// The two faces a report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFont {
    Regular,
    Bold,
}

impl ReportFont {
    pub const ALL: [Self; 2] = [Self::Regular, Self::Bold];

    /// Resource name referenced by `Tf`.
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    pub const fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }

    /// Font dictionary for the document's resources.
    pub fn dictionary(self) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    /// Advance width of one encoded byte in 1/1000 em.
    fn byte_width(self, byte: u8) -> u16 {
        let table = match self {
            Self::Regular => &HELVETICA_WIDTHS,
            Self::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            0x85 | 0x97 => 1000, // ellipsis, em dash
            0x91 | 0x92 => 222,
            0x93 | 0x94 => 333,
            0x95 => 350,
            0x96 => 556,
            0xA0 => 278,
            _ => LATIN1_FALLBACK_WIDTH,
        }
    }

    /// Width of `text` in points at `font_size`.
    #[allow(clippy::cast_precision_loss)]
    pub fn string_width(self, text: &str, font_size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| u32::from(self.byte_width(b)))
            .sum();
        units as f32 * font_size / 1000.0
    }
}

/// Map one character to its WinAnsiEncoding byte.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\t' => b' ',
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        // ASCII and the Latin-1 supplement map straight through
        ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(c).unwrap_or(REPLACEMENT),
        _ => REPLACEMENT,
    }
}

/// Encode text for a `Tj` string operand.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(encode_win_ansi("Fern (Pteridophyta)"), b"Fern (Pteridophyta)");
    }

    #[test]
    fn test_typographic_characters_use_win_ansi_slots() {
        assert_eq!(encode_win_ansi("\u{201C}hi\u{201D}"), vec![0x93, b'h', b'i', 0x94]);
        assert_eq!(encode_win_ansi("caf\u{E9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{2022} item"), vec![0x95, b' ', b'i', b't', b'e', b'm']);
    }

    #[test]
    fn test_unrepresentable_becomes_question_mark() {
        assert_eq!(encode_win_ansi("\u{1F331}"), b"?");
        assert_eq!(encode_win_ansi("\u{690D}\u{7269}"), b"??");
    }

    #[test]
    fn test_widths_follow_afm() {
        // "Hello" in Helvetica: 722 + 556 + 222 + 222 + 556 = 2278
        let width = ReportFont::Regular.string_width("Hello", 10.0);
        assert!((width - 22.78).abs() < 0.001);
        assert!(ReportFont::Bold.string_width("Hello", 10.0) > width);
    }
}

//! Line breaking for report text.

use super::font::ReportFont;

/// Break a paragraph into lines no wider than `max_width` points.
///
/// Words are separated by whitespace; a single word wider than a line is
/// split between characters. An empty paragraph yields one empty line so
/// blank lines in the source keep their vertical space.
pub fn wrap_paragraph(text: &str, font: ReportFont, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if font.string_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if font.string_width(word, font_size) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = split_long_word(word, font, font_size, max_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

/// Split text into lines, honouring explicit newlines.
pub fn wrap_text(text: &str, font: ReportFont, font_size: f32, max_width: f32) -> Vec<String> {
    text.lines()
        .flat_map(|paragraph| wrap_paragraph(paragraph, font, font_size, max_width))
        .collect()
}

fn split_long_word(word: &str, font: ReportFont, font_size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();

    for c in word.chars() {
        piece.push(c);
        if font.string_width(&piece, font_size) > max_width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: f32 = 10.0;

    #[test]
    fn test_short_text_is_one_line() {
        let lines = wrap_paragraph("Snake plant", ReportFont::Regular, SIZE, 400.0);
        assert_eq!(lines, vec!["Snake plant"]);
    }

    #[test]
    fn test_wraps_at_width() {
        let text = "Hello world this is a test";
        let width = ReportFont::Regular.string_width("world this", SIZE);
        let lines = wrap_paragraph(text, ReportFont::Regular, SIZE, width);

        assert_eq!(lines, vec!["Hello", "world this", "is a test"]);
        for line in &lines {
            assert!(ReportFont::Regular.string_width(line, SIZE) <= width);
        }
    }

    #[test]
    fn test_empty_paragraph_keeps_a_line() {
        assert_eq!(wrap_paragraph("", ReportFont::Regular, SIZE, 100.0), vec![""]);
        assert_eq!(wrap_paragraph("   ", ReportFont::Regular, SIZE, 100.0), vec![""]);
    }

    #[test]
    fn test_long_word_is_split() {
        let word = "Pneumonoultramicroscopicsilicovolcanoconiosis";
        let max = ReportFont::Regular.string_width("Pneumono", SIZE);
        let lines = wrap_paragraph(word, ReportFont::Regular, SIZE, max);

        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(ReportFont::Regular.string_width(line, SIZE) <= max);
        }
    }

    #[test]
    fn test_newlines_and_blank_lines_survive() {
        let lines = wrap_text("Name: Fern\n\nCare: shade", ReportFont::Regular, SIZE, 400.0);
        assert_eq!(lines, vec!["Name: Fern", "", "Care: shade"]);
    }
}

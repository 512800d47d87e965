//! The header/footer escape-code mini-language.
//!
//! Header and footer strings are a compact left-to-right code stream:
//! `&L`/`&C`/`&R` switch sections, `&P`/`&N`/`&D`/`&T`/`&Z`/`&F`/`&A`/`&G`
//! insert fields, `&"font,style"`, `&B`, `&I`, `&U`, `&E`, `&KRRGGBB` and
//! digit runs set run formatting, and `&&` is a literal ampersand. Codes with
//! no rich-text equivalent are preserved as literal escape sequences inside
//! run text so they survive a decode/encode round trip.

use gridline_model::rich_text::{RichText, RunFont};
use gridline_model::style::{Argb, Color, UnderlineStyle};
use gridline_model::HeaderFooterSection;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Text(String),
    LeftSection,
    CenterSection,
    RightSection,
    CurrentPage,
    TotalPages,
    Date,
    Time,
    FilePath,
    FileName,
    SheetName,
    Picture,
    FontSize(String),
    FontColor(String),
    FontName(String),
    Bold,
    Italic,
    SingleUnderline,
    DoubleUnderline,
    Strikethrough,
    Superscript,
    Subscript,
    Outline,
    Shadow,
    AddPage,
    SubtractPage,
}

fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut position = 0usize;

    while position < chars.len() {
        if chars[position] != '&' {
            let mut text = String::new();
            while position < chars.len() && chars[position] != '&' {
                text.push(chars[position]);
                position += 1;
            }
            tokens.push(Token::Text(text));
            continue;
        }

        // At an ampersand; the next character selects the code.
        let Some(&code) = chars.get(position + 1) else {
            tokens.push(Token::Text("&".to_string()));
            break;
        };
        position += 2;

        match code {
            '&' => tokens.push(Token::Text("&&".to_string())),
            '"' => {
                let mut value = String::new();
                while position < chars.len() && chars[position] != '"' {
                    value.push(chars[position]);
                    position += 1;
                }
                if position < chars.len() {
                    position += 1; // closing quote
                }
                tokens.push(Token::FontName(value));
            }
            'L' => tokens.push(Token::LeftSection),
            'C' => tokens.push(Token::CenterSection),
            'R' => tokens.push(Token::RightSection),
            'P' => tokens.push(Token::CurrentPage),
            'N' => tokens.push(Token::TotalPages),
            'D' => tokens.push(Token::Date),
            'T' => tokens.push(Token::Time),
            'Z' => tokens.push(Token::FilePath),
            'F' => tokens.push(Token::FileName),
            'A' => tokens.push(Token::SheetName),
            'G' => tokens.push(Token::Picture),
            'B' => tokens.push(Token::Bold),
            'I' => tokens.push(Token::Italic),
            'U' => tokens.push(Token::SingleUnderline),
            'E' => tokens.push(Token::DoubleUnderline),
            'S' => tokens.push(Token::Strikethrough),
            'X' => tokens.push(Token::Superscript),
            'Y' => tokens.push(Token::Subscript),
            'O' => tokens.push(Token::Outline),
            'H' => tokens.push(Token::Shadow),
            '+' => tokens.push(Token::AddPage),
            '-' => tokens.push(Token::SubtractPage),
            'K' => {
                // `&KRRGGBB` or theme form `&KTTSNN` / `&KTT+NN`.
                let len = if chars.get(position + 2) == Some(&'+')
                    || chars.get(position + 2) == Some(&'-')
                {
                    5
                } else {
                    6
                };
                let value: String = chars[position..(position + len).min(chars.len())]
                    .iter()
                    .collect();
                position += value.chars().count();
                tokens.push(Token::FontColor(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                digits.push(c);
                while position < chars.len() && chars[position].is_ascii_digit() {
                    digits.push(chars[position]);
                    position += 1;
                }
                tokens.push(Token::FontSize(digits));
            }
            other => {
                // Not a recognized code; keep the raw pair as text.
                tokens.push(Token::Text(format!("&{other}")));
            }
        }
    }

    tokens
}

/// Split a raw header/footer string into its left/center/right section code
/// strings. Text before any section marker belongs to the center section.
pub(crate) fn split_sections(input: &str) -> HeaderFooterSection {
    #[derive(Copy, Clone)]
    enum Slot {
        Left,
        Center,
        Right,
    }

    fn slot_of(section: &mut HeaderFooterSection, slot: Slot) -> &mut String {
        let field = match slot {
            Slot::Left => &mut section.left,
            Slot::Center => &mut section.center,
            Slot::Right => &mut section.right,
        };
        field.get_or_insert_with(String::new)
    }

    let mut section = HeaderFooterSection::default();
    if input.is_empty() {
        return section;
    }

    let mut current = Slot::Center;
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '&' {
            match chars.peek() {
                Some('L') => {
                    chars.next();
                    current = Slot::Left;
                    continue;
                }
                Some('C') => {
                    chars.next();
                    current = Slot::Center;
                    continue;
                }
                Some('R') => {
                    chars.next();
                    current = Slot::Right;
                    continue;
                }
                Some('&') => {
                    chars.next();
                    slot_of(&mut section, current).push_str("&&");
                    continue;
                }
                Some('"') => {
                    // Copy the quoted font spec wholesale so a quoted `L`
                    // cannot be mistaken for a section marker.
                    chars.next();
                    let target = slot_of(&mut section, current);
                    target.push_str("&\"");
                    for inner in chars.by_ref() {
                        target.push(inner);
                        if inner == '"' {
                            break;
                        }
                    }
                    continue;
                }
                _ => {}
            }
            slot_of(&mut section, current).push('&');
            continue;
        }
        slot_of(&mut section, current).push(ch);
    }

    section
}

/// Join per-section code strings back into the wire form.
pub(crate) fn join_sections(section: &HeaderFooterSection) -> String {
    let mut out = String::new();
    if let Some(left) = &section.left {
        out.push_str("&L");
        out.push_str(left);
    }
    if let Some(center) = &section.center {
        out.push_str("&C");
        out.push_str(center);
    }
    if let Some(right) = &section.right {
        out.push_str("&R");
        out.push_str(right);
    }
    out
}

/// Decode one section's code string into rich text.
///
/// Formatting codes become run font state; field codes (`&P`, `&N`, `&D`,
/// `&T`, `&Z`, `&F`, `&A`, `&G`) stay in the run text as literal escapes.
/// Each formatting code flushes the pending run, so formatting applies from
/// the code to the next flush.
pub fn decode_section(code: &str) -> RichText {
    let tokens = tokenize(code);
    let mut segments: Vec<(String, Option<RunFont>)> = Vec::new();
    let mut text = String::new();
    let mut font: Option<RunFont> = None;

    let mut flush = |text: &mut String, font: &mut Option<RunFont>| {
        if !text.is_empty() {
            segments.push((std::mem::take(text), font.take()));
        }
    };

    for token in tokens {
        match token {
            Token::Text(t) => text.push_str(&t),
            Token::CurrentPage => text.push_str("&P"),
            Token::TotalPages => text.push_str("&N"),
            Token::Date => text.push_str("&D"),
            Token::Time => text.push_str("&T"),
            Token::FilePath => text.push_str("&Z"),
            Token::FileName => text.push_str("&F"),
            Token::SheetName => text.push_str("&A"),
            Token::Picture => text.push_str("&G"),
            Token::AddPage => text.push_str("&+"),
            Token::SubtractPage => text.push_str("&-"),
            Token::FontSize(digits) => {
                flush(&mut text, &mut font);
                if let Ok(size) = digits.parse::<f64>() {
                    font.get_or_insert_with(RunFont::default).size = Some(size);
                }
            }
            Token::FontColor(value) => {
                flush(&mut text, &mut font);
                if value.len() == 6 {
                    if let Ok(rgb) = u32::from_str_radix(&value, 16) {
                        font.get_or_insert_with(RunFont::default).color =
                            Some(Color::Rgb(Argb(0xFF00_0000 | rgb)));
                    }
                }
            }
            Token::FontName(value) => {
                flush(&mut text, &mut font);
                let font = font.get_or_insert_with(RunFont::default);
                let (name, style) = match value.split_once(',') {
                    Some((name, style)) => (name, Some(style)),
                    None => (value.as_str(), None),
                };
                if name != "-" {
                    font.name = Some(name.to_string());
                }
                match style {
                    Some("Bold") => font.bold = Some(true),
                    Some("Italic") => font.italic = Some(true),
                    Some("BoldItalic") => {
                        font.bold = Some(true);
                        font.italic = Some(true);
                    }
                    _ => {}
                }
            }
            Token::Bold => {
                flush(&mut text, &mut font);
                font.get_or_insert_with(RunFont::default).bold = Some(true);
            }
            Token::Italic => {
                flush(&mut text, &mut font);
                font.get_or_insert_with(RunFont::default).italic = Some(true);
            }
            Token::SingleUnderline => {
                flush(&mut text, &mut font);
                font.get_or_insert_with(RunFont::default).underline =
                    Some(UnderlineStyle::Single);
            }
            Token::DoubleUnderline => {
                flush(&mut text, &mut font);
                font.get_or_insert_with(RunFont::default).underline =
                    Some(UnderlineStyle::Double);
            }
            Token::Strikethrough => {
                flush(&mut text, &mut font);
                font.get_or_insert_with(RunFont::default).strikethrough = Some(true);
            }
            // Section markers never reach here; superscript/subscript and
            // outline/shadow have no rich-text representation and are
            // dropped, as the source library does.
            Token::LeftSection
            | Token::CenterSection
            | Token::RightSection
            | Token::Superscript
            | Token::Subscript
            | Token::Outline
            | Token::Shadow => {
                flush(&mut text, &mut font);
            }
        }
    }
    flush(&mut text, &mut font);

    RichText::from_segments(segments)
}

/// Encode rich text back into one section's code string: the inverse of
/// [`decode_section`] for every supported code.
pub fn encode_section(rich: &RichText) -> String {
    let mut out = String::new();

    for (text, font) in rich.segments() {
        if text.is_empty() {
            continue;
        }
        if let Some(font) = font {
            if let Some(name) = &font.name {
                out.push_str("&\"");
                out.push_str(name);
                out.push(',');
                out.push_str(match (font.bold == Some(true), font.italic == Some(true)) {
                    (true, true) => "BoldItalic",
                    (true, false) => "Bold",
                    (false, true) => "Italic",
                    (false, false) => "Regular",
                });
                out.push('"');
            } else {
                if font.bold == Some(true) {
                    out.push_str("&B");
                }
                if font.italic == Some(true) {
                    out.push_str("&I");
                }
            }
            if let Some(size) = font.size {
                out.push('&');
                out.push_str(&crate::xml::format_f64(size));
            }
            match font.underline {
                Some(UnderlineStyle::Single) | Some(UnderlineStyle::SingleAccounting) => {
                    out.push_str("&U")
                }
                Some(UnderlineStyle::Double) | Some(UnderlineStyle::DoubleAccounting) => {
                    out.push_str("&E")
                }
                _ => {}
            }
            if font.strikethrough == Some(true) {
                out.push_str("&S");
            }
            if let Some(Color::Rgb(argb)) = font.color {
                out.push_str(&format!("&K{:06X}", argb.0 & 0x00FF_FFFF));
            }
        }
        out.push_str(&text);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_split_left_to_right() {
        let section = split_sections("&LLeft text&CPage &P of &N&RRight");
        assert_eq!(section.left.as_deref(), Some("Left text"));
        assert_eq!(section.center.as_deref(), Some("Page &P of &N"));
        assert_eq!(section.right.as_deref(), Some("Right"));
    }

    #[test]
    fn unmarked_text_is_center() {
        let section = split_sections("Just a title");
        assert_eq!(section.center.as_deref(), Some("Just a title"));
        assert_eq!(section.left, None);
    }

    #[test]
    fn quoted_font_specs_hide_section_letters() {
        let section = split_sections("&C&\"Lucida,Bold\"x");
        assert_eq!(section.center.as_deref(), Some("&\"Lucida,Bold\"x"));
    }

    #[test]
    fn decode_keeps_field_codes_literal() {
        let rich = decode_section("Page &P of &N");
        assert_eq!(rich.text, "Page &P of &N");
        assert!(rich.runs.iter().all(|r| r.font.is_none()));
    }

    #[test]
    fn decode_applies_formatting_codes() {
        let rich = decode_section("&B&14Bold big");
        assert_eq!(rich.text, "Bold big");
        let font = rich.runs[0].font.as_ref().unwrap();
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.size, Some(14.0));
    }

    #[test]
    fn decode_font_name_and_color() {
        let rich = decode_section("&\"Arial,BoldItalic\"&KFF0000styled");
        let font = rich.runs[0].font.as_ref().unwrap();
        assert_eq!(font.name.as_deref(), Some("Arial"));
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.italic, Some(true));
        assert_eq!(font.color, Some(Color::Rgb(Argb(0xFFFF0000))));
    }

    #[test]
    fn encode_decode_roundtrip() {
        for code in [
            "Page &P of &N",
            "&BTotals",
            "&\"Arial,Bold\"&12Header &D",
            "&UUnderlined&E then double",
        ] {
            let decoded = decode_section(code);
            assert_eq!(encode_section(&decoded), code, "code {code:?}");
        }
    }

    #[test]
    fn join_is_inverse_of_split() {
        for raw in ["&LLeft&CMid&RRight", "&COnly center", "&RJust right"] {
            let section = split_sections(raw);
            assert_eq!(join_sections(&section), raw);
        }
    }
}

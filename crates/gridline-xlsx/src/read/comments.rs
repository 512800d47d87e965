use gridline_model::{CellRef, Comment};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ReadError;
use crate::rich_text::{attr_string, attr_u32, parse_rich_text, read_text};

/// Parse a legacy comments part (`xl/comments1.xml`): an author table plus
/// per-cell rich text bodies.
pub(crate) fn parse_comments(xml: &[u8]) -> Result<Vec<(CellRef, Comment)>, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut authors: Vec<String> = Vec::new();
    let mut comments: Vec<(CellRef, Comment)> = Vec::new();
    let mut in_authors = false;

    let mut current_ref: Option<CellRef> = None;
    let mut current_author: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"authors" => in_authors = true,
            Event::End(e) if e.local_name().as_ref() == b"authors" => in_authors = false,
            Event::Start(e) if in_authors && e.local_name().as_ref() == b"author" => {
                authors.push(read_text(&mut reader, b"author")?);
            }
            Event::Empty(e) if in_authors && e.local_name().as_ref() == b"author" => {
                authors.push(String::new());
            }
            Event::Start(e) if e.local_name().as_ref() == b"comment" => {
                let reference = attr_string(&e, b"ref")?;
                current_ref = match reference {
                    Some(a1) => {
                        Some(CellRef::from_a1(&a1).map_err(|_| ReadError::InvalidCellRef(a1))?)
                    }
                    None => None,
                };
                current_author = attr_u32(&e, b"authorId")?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"text" => {
                let text = parse_rich_text(&mut reader, b"text")?;
                if let Some(cell) = current_ref {
                    let author = current_author
                        .and_then(|id| authors.get(id as usize))
                        .cloned()
                        .unwrap_or_default();
                    comments.push((cell, Comment { author, text }));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"comment" => {
                current_ref = None;
                current_author = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_attach_author_and_text() {
        let xml = br#"<?xml version="1.0"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors><author>alice</author><author>bob</author></authors>
  <commentList>
    <comment ref="B2" authorId="1"><text><t>check this</t></text></comment>
  </commentList>
</comments>"#;
        let comments = parse_comments(xml).unwrap();
        assert_eq!(comments.len(), 1);
        let (cell, comment) = &comments[0];
        assert_eq!(*cell, CellRef::new(1, 1));
        assert_eq!(comment.author, "bob");
        assert_eq!(comment.text.text, "check this");
    }
}

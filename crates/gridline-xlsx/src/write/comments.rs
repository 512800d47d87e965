use std::collections::BTreeMap;

use gridline_model::{CellRef, Comment};

use crate::rich_text::write_rich_text;
use crate::xml::escape_text;

/// Serialize a legacy comments part: the author table followed by one
/// `<comment>` per cell.
pub(crate) fn write_comments_xml(comments: &[(CellRef, &Comment)]) -> Vec<u8> {
    // Authors are deduplicated; each comment references its author by index.
    let mut author_ids: BTreeMap<&str, usize> = BTreeMap::new();
    let mut authors: Vec<&str> = Vec::new();
    for (_, comment) in comments {
        if !author_ids.contains_key(comment.author.as_str()) {
            author_ids.insert(comment.author.as_str(), authors.len());
            authors.push(comment.author.as_str());
        }
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<comments xmlns="{}">"#,
        crate::openxml::NS_SPREADSHEETML
    ));

    xml.push_str("<authors>");
    for author in &authors {
        xml.push_str("<author>");
        xml.push_str(&escape_text(author));
        xml.push_str("</author>");
    }
    xml.push_str("</authors>");

    xml.push_str("<commentList>");
    for (cell_ref, comment) in comments {
        let author_id = author_ids[comment.author.as_str()];
        xml.push_str(&format!(
            r#"<comment ref="{}" authorId="{author_id}"><text>"#,
            cell_ref.to_a1()
        ));
        write_rich_text(&mut xml, &comment.text);
        xml.push_str("</text></comment>");
    }
    xml.push_str("</commentList>");

    xml.push_str("</comments>");
    xml.into_bytes()
}

/// The companion VML drawing Excel needs to place comment notes. One shape
/// per comment, anchored near its cell.
pub(crate) fn write_vml_xml(comments: &[(CellRef, &Comment)]) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(concat!(
        r#"<xml xmlns:v="urn:schemas-microsoft-com:vml""#,
        r#" xmlns:o="urn:schemas-microsoft-com:office:office""#,
        r#" xmlns:x="urn:schemas-microsoft-com:office:excel">"#,
        r#"<o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="1"/></o:shapelayout>"#,
        r#"<v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" path="m,l,21600r21600,l21600,xe">"#,
        r#"<v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/>"#,
        r#"</v:shapetype>"#,
    ));

    for (index, (cell_ref, _)) in comments.iter().enumerate() {
        xml.push_str(&format!(
            concat!(
                r##"<v:shape id="_x0000_s{id}" type="#_x0000_t202""##,
                r#" style="position:absolute;margin-left:80pt;margin-top:{top}pt;width:108pt;height:59pt;z-index:{z};visibility:hidden""#,
                r##" fillcolor="#ffffe1" o:insetmode="auto">"##,
                r##"<v:fill color2="#ffffe1"/>"##,
                r#"<v:shadow on="t" color="black" obscured="t"/>"#,
                r#"<x:ClientData ObjectType="Note">"#,
                r#"<x:MoveWithCells/><x:SizeWithCells/>"#,
                r#"<x:AutoFill>False</x:AutoFill>"#,
                r#"<x:Row>{row}</x:Row><x:Column>{col}</x:Column>"#,
                r#"</x:ClientData></v:shape>"#
            ),
            id = 1025 + index,
            top = cell_ref.row * 14,
            z = index + 1,
            row = cell_ref.row,
            col = cell_ref.col,
        ));
    }

    xml.push_str("</xml>");
    xml.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::parse_comments;

    #[test]
    fn comments_roundtrip() {
        let note = Comment::new("alice", "needs review");
        let comments = vec![(CellRef::new(1, 1), &note)];
        let xml = write_comments_xml(&comments);
        let parsed = parse_comments(&xml).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, CellRef::new(1, 1));
        assert_eq!(parsed[0].1.author, "alice");
        assert_eq!(parsed[0].1.text.text, "needs review");
    }
}

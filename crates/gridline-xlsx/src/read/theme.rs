use gridline_model::ThemePalette;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ReadError;
use crate::rich_text::attr_string;

/// Slot order of the twelve color-scheme entries in `theme1.xml`.
const SLOTS: [&[u8]; 12] = [
    b"dk1", b"lt1", b"dk2", b"lt2", b"accent1", b"accent2", b"accent3", b"accent4", b"accent5",
    b"accent6", b"hlink", b"folHlink",
];

/// Parse the color scheme out of `xl/theme/theme1.xml`. The rest of the
/// theme (fonts, effects) is not modeled; a default is substituted on write.
pub(crate) fn parse_theme(xml: &[u8]) -> Result<ThemePalette, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut palette = ThemePalette::office();
    let mut current_slot: Option<usize> = None;
    let mut in_scheme = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"clrScheme" => {
                in_scheme = true;
                if let Some(name) = attr_string(&e, b"name")? {
                    palette.name = name;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"clrScheme" => break,
            Event::Start(e) if in_scheme => {
                let local = e.local_name();
                if let Some(slot) = SLOTS.iter().position(|s| *s == local.as_ref()) {
                    current_slot = Some(slot);
                }
            }
            Event::Empty(e) if in_scheme => {
                let value = match e.local_name().as_ref() {
                    b"srgbClr" => attr_string(&e, b"val")?,
                    b"sysClr" => attr_string(&e, b"lastClr")?,
                    _ => None,
                };
                if let (Some(slot), Some(value)) = (current_slot, value) {
                    palette.colors[slot] = value;
                }
            }
            Event::End(e) if in_scheme => {
                let local = e.local_name();
                if SLOTS.iter().any(|s| *s == local.as_ref()) {
                    current_slot = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_color_scheme() {
        let xml = br#"<?xml version="1.0"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="112233"/></a:dk2>
      <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
      <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
      <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
      <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
      <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
      <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
      <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
      <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
    </a:clrScheme>
  </a:themeElements>
</a:theme>"#;
        let palette = parse_theme(xml).unwrap();
        assert_eq!(palette.name, "Office");
        assert_eq!(palette.colors[0], "000000");
        assert_eq!(palette.colors[2], "112233");
        assert_eq!(palette.colors[11], "954F72");
    }
}

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use zip::ZipArchive;

use crate::error::ReadError;

/// All parts of an OPC package inflated into memory (part name → bytes).
///
/// ZIP entry names are normalized to canonical part names (no leading `/`,
/// forward slashes) so downstream lookups can assume `xl/...` keys.
#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
        Self::from_reader(Cursor::new(bytes))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, ReadError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name();
            let name = name.strip_prefix('/').unwrap_or(name).replace('\\', "/");
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|b| b.as_slice())
    }

    /// A part that a relationship claims exists; missing is an invalid-file
    /// error, not a silent skip.
    pub fn part_required(&self, name: &str) -> Result<&[u8], ReadError> {
        self.part(name)
            .ok_or_else(|| ReadError::MissingPart(name.to_string()))
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn entry_names_are_normalized() {
        let bytes = build_zip(&[("/xl/workbook.xml", b"<workbook/>")]);
        let package = Package::from_bytes(&bytes).unwrap();
        assert!(package.has_part("xl/workbook.xml"));
    }

    #[test]
    fn missing_required_part_is_an_error() {
        let bytes = build_zip(&[("xl/workbook.xml", b"<workbook/>")]);
        let package = Package::from_bytes(&bytes).unwrap();
        assert!(matches!(
            package.part_required("xl/styles.xml"),
            Err(ReadError::MissingPart(_))
        ));
    }
}

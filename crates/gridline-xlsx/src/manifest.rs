use std::collections::BTreeMap;

use thiserror::Error;

use crate::path::resolve_target;

/// Whether a relationship target lives inside the package or points at an
/// external resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetMode {
    Internal,
    External,
}

/// One relationship: an id scoped to its source part, a type URI, and a
/// target resolved against the source part's directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub mode: TargetMode,
}

impl Relationship {
    pub fn internal(id: impl Into<String>, type_uri: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_uri: type_uri.into(),
            target: target.into(),
            mode: TargetMode::Internal,
        }
    }

    pub fn external(id: impl Into<String>, type_uri: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_uri: type_uri.into(),
            target: target.into(),
            mode: TargetMode::External,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("relationship {id} already registered for part {part:?}")]
    DuplicateId { part: String, id: String },
    #[error("no relationship of type {type_uri} on part {part:?}")]
    NotFound { part: String, type_uri: String },
    #[error("part {part:?} has {found} relationships of type {type_uri}, expected exactly one")]
    Ambiguous {
        part: String,
        type_uri: String,
        found: usize,
    },
    #[error("no relationship with id {id} on part {part:?}")]
    IdNotFound { part: String, id: String },
}

/// The package relationship graph plus content-type registrations.
///
/// Built fresh per read or write pass; only its effects (the `.rels` and
/// `[Content_Types].xml` parts) are persisted. The source part for
/// package-root relationships is the empty string.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    /// source part → relationships in registration order.
    relationships: BTreeMap<String, Vec<Relationship>>,
    /// extension (lowercase, without dot) → default content type.
    defaults: BTreeMap<String, String>,
    /// part name (with leading slash, as declared) → override content type.
    overrides: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relationship scoped to `source_part`.
    ///
    /// Re-registering an id already present on the same source part is a
    /// logic error, not a silent overwrite.
    pub fn register_relationship(
        &mut self,
        source_part: &str,
        rel: Relationship,
    ) -> Result<(), ManifestError> {
        let rels = self.relationships.entry(source_part.to_string()).or_default();
        if rels.iter().any(|existing| existing.id == rel.id) {
            return Err(ManifestError::DuplicateId {
                part: source_part.to_string(),
                id: rel.id,
            });
        }
        rels.push(rel);
        Ok(())
    }

    /// All relationships of `source_part`, optionally filtered by type.
    /// Each call produces a fresh, restartable iterator.
    pub fn relationships<'a>(
        &'a self,
        source_part: &str,
        type_uri: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .get(source_part)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(move |rel| type_uri.map_or(true, |t| rel.type_uri == t))
    }

    /// The unique relationship of `type_uri` on `source_part`; zero or more
    /// than one match is an error.
    pub fn relationship_by_type(
        &self,
        source_part: &str,
        type_uri: &str,
    ) -> Result<&Relationship, ManifestError> {
        let mut matches = self.relationships(source_part, Some(type_uri));
        let first = matches.next().ok_or_else(|| ManifestError::NotFound {
            part: source_part.to_string(),
            type_uri: type_uri.to_string(),
        })?;
        let extra = matches.count();
        if extra > 0 {
            return Err(ManifestError::Ambiguous {
                part: source_part.to_string(),
                type_uri: type_uri.to_string(),
                found: extra + 1,
            });
        }
        Ok(first)
    }

    /// The relationship with `id` on `source_part`.
    pub fn relationship_by_id(
        &self,
        source_part: &str,
        id: &str,
    ) -> Result<&Relationship, ManifestError> {
        self.relationships(source_part, None)
            .find(|rel| rel.id == id)
            .ok_or_else(|| ManifestError::IdNotFound {
                part: source_part.to_string(),
                id: id.to_string(),
            })
    }

    pub fn has_relationships(&self, source_part: &str) -> bool {
        self.relationships
            .get(source_part)
            .is_some_and(|v| !v.is_empty())
    }

    /// The next free `rIdN` on `source_part`; ids are assigned sequentially
    /// per source part.
    pub fn next_relationship_id(&self, source_part: &str) -> String {
        let mut max_id = 0u32;
        for rel in self.relationships(source_part, None) {
            if let Some(rest) = rel.id.strip_prefix("rId") {
                if let Ok(n) = rest.parse::<u32>() {
                    max_id = max_id.max(n);
                }
            }
        }
        format!("rId{}", max_id + 1)
    }

    /// Resolve an ordered relationship chain (e.g. package → workbook →
    /// theme → image) to the final absolute part path: each relationship's
    /// target resolves against its source's parent path, normalizing `..`.
    pub fn canonicalize<'a>(&self, chain: impl IntoIterator<Item = &'a Relationship>) -> String {
        let mut current = String::new();
        for rel in chain {
            current = resolve_target(&current, &rel.target);
        }
        current
    }

    /// Resolve a relationship's target against its source part.
    pub fn target_part(&self, source_part: &str, rel: &Relationship) -> String {
        resolve_target(source_part, &rel.target)
    }

    pub fn register_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_ascii_lowercase(), content_type.to_string());
    }

    pub fn register_override(&mut self, part: &str, content_type: &str) {
        let part = if part.starts_with('/') {
            part.to_string()
        } else {
            format!("/{part}")
        };
        self.overrides.insert(part, content_type.to_string());
    }

    /// A part's declared content type; an override beats the extension
    /// default.
    pub fn content_type(&self, part: &str) -> Option<&str> {
        let keyed = if part.starts_with('/') {
            part.to_string()
        } else {
            format!("/{part}")
        };
        if let Some(ct) = self.overrides.get(&keyed) {
            return Some(ct);
        }
        let extension = part.rsplit_once('.').map(|(_, ext)| ext)?;
        self.defaults.get(&extension.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Source parts that carry at least one relationship.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|(_, rels)| !rels.is_empty())
            .map(|(part, _)| part.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openxml;

    #[test]
    fn duplicate_id_is_rejected() {
        let mut manifest = Manifest::new();
        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId1", openxml::REL_TYPE_WORKSHEET, "worksheets/sheet1.xml"),
            )
            .unwrap();
        let err = manifest.register_relationship(
            "xl/workbook.xml",
            Relationship::internal("rId1", openxml::REL_TYPE_STYLES, "styles.xml"),
        );
        assert_eq!(
            err,
            Err(ManifestError::DuplicateId {
                part: "xl/workbook.xml".to_string(),
                id: "rId1".to_string(),
            })
        );
    }

    #[test]
    fn typed_lookup_requires_exactly_one() {
        let mut manifest = Manifest::new();
        assert!(matches!(
            manifest.relationship_by_type("xl/workbook.xml", openxml::REL_TYPE_STYLES),
            Err(ManifestError::NotFound { .. })
        ));

        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId1", openxml::REL_TYPE_WORKSHEET, "worksheets/sheet1.xml"),
            )
            .unwrap();
        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId2", openxml::REL_TYPE_WORKSHEET, "worksheets/sheet2.xml"),
            )
            .unwrap();
        assert!(matches!(
            manifest.relationship_by_type("xl/workbook.xml", openxml::REL_TYPE_WORKSHEET),
            Err(ManifestError::Ambiguous { found: 2, .. })
        ));
    }

    #[test]
    fn relationship_queries_are_restartable() {
        let mut manifest = Manifest::new();
        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId1", openxml::REL_TYPE_WORKSHEET, "worksheets/sheet1.xml"),
            )
            .unwrap();
        assert_eq!(manifest.relationships("xl/workbook.xml", None).count(), 1);
        assert_eq!(manifest.relationships("xl/workbook.xml", None).count(), 1);
    }

    #[test]
    fn sequential_id_assignment() {
        let mut manifest = Manifest::new();
        assert_eq!(manifest.next_relationship_id("xl/workbook.xml"), "rId1");
        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId1", openxml::REL_TYPE_WORKSHEET, "worksheets/sheet1.xml"),
            )
            .unwrap();
        manifest
            .register_relationship(
                "xl/workbook.xml",
                Relationship::internal("rId7", openxml::REL_TYPE_STYLES, "styles.xml"),
            )
            .unwrap();
        assert_eq!(manifest.next_relationship_id("xl/workbook.xml"), "rId8");
    }

    #[test]
    fn canonicalize_resolves_chains() {
        let manifest = Manifest::new();
        let package_to_workbook =
            Relationship::internal("rId1", openxml::REL_TYPE_OFFICE_DOCUMENT, "xl/workbook.xml");
        let workbook_to_theme =
            Relationship::internal("rId2", openxml::REL_TYPE_THEME, "theme/theme1.xml");
        let resolved = manifest.canonicalize([&package_to_workbook, &workbook_to_theme]);
        assert_eq!(resolved, "xl/theme/theme1.xml");
    }

    #[test]
    fn content_type_override_beats_default() {
        let mut manifest = Manifest::new();
        manifest.register_default("xml", openxml::CONTENT_TYPE_XML);
        manifest.register_override("/xl/workbook.xml", openxml::CONTENT_TYPE_WORKBOOK);
        assert_eq!(
            manifest.content_type("xl/workbook.xml"),
            Some(openxml::CONTENT_TYPE_WORKBOOK)
        );
        assert_eq!(
            manifest.content_type("xl/worksheets/sheet1.xml"),
            Some(openxml::CONTENT_TYPE_XML)
        );
        assert_eq!(manifest.content_type("xl/media/image1.png"), None);
    }
}

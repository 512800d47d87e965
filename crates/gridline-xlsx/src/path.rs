//! OPC part-name arithmetic. Part names are POSIX-style forward-slash paths
//! resolved against the package root, without a leading slash.

/// The `.rels` part that carries a part's relationships.
pub fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file_name)) => format!("{dir}/_rels/{file_name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// The relationships part of the package root (`_rels/.rels`).
pub fn package_rels() -> &'static str {
    "_rels/.rels"
}

/// Resolve a relationship target against its source part.
///
/// Targets may be relative to the source part's folder
/// (`worksheets/sheet1.xml`), package-absolute (`/xl/styles.xml`), or carry a
/// URI fragment that is not part of the part name.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    if target.is_empty() {
        // A target of just `#fragment` refers to the source part itself.
        return normalize(source_part);
    }
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }

    let base_dir = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("");
    normalize(&format!("{base_dir}/{target}"))
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

/// The relative target written into a source part's `.rels` for `part`.
///
/// Walks up from the source part's directory with `..` segments, then down
/// into the target, so `xl/workbook.xml` → `xl/worksheets/sheet1.xml` yields
/// `worksheets/sheet1.xml`.
pub fn relativize(source_part: &str, part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let target: Vec<&str> = part.split('/').filter(|s| !s.is_empty()).collect();

    let mut common = 0usize;
    while common < source_dir.len()
        && common + 1 < target.len()
        && source_dir[common] == target[common]
    {
        common += 1;
    }

    let mut out: Vec<&str> = Vec::new();
    for _ in common..source_dir.len() {
        out.push("..");
    }
    out.extend(&target[common..]);
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rels_part_names() {
        assert_eq!(rels_for_part("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_for_part("workbook.xml"), "_rels/workbook.xml.rels");
    }

    #[test]
    fn resolve_relative_to_source_dir() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../media/image1.png"),
            "xl/media/image1.png"
        );
    }

    #[test]
    fn resolve_absolute_and_fragments() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/../docProps/core.xml"),
            "docProps/core.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml#frag"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(resolve_target("xl/workbook.xml", "#frag"), "xl/workbook.xml");
    }

    #[test]
    fn relativize_against_source() {
        assert_eq!(
            relativize("xl/workbook.xml", "xl/worksheets/sheet1.xml"),
            "worksheets/sheet1.xml"
        );
        assert_eq!(relativize("xl/workbook.xml", "xl/styles.xml"), "styles.xml");
        assert_eq!(
            relativize("xl/worksheets/sheet1.xml", "xl/comments1.xml"),
            "../comments1.xml"
        );
        // Package-root relationships resolve against the empty source part.
        assert_eq!(relativize("", "xl/workbook.xml"), "xl/workbook.xml");
    }
}

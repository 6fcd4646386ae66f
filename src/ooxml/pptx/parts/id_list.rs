//! Ordered id lists of PresentationML parts.
//!
//! `p:sldMasterIdLst` and `p:sldIdLst` on the presentation and
//! `p:sldLayoutIdLst` on a slide master pair a numeric id with the rId of a
//! relationship. The lists are derived data: after a structural change they
//! are rebuilt from the owning part's relationships.

use crate::ooxml::opc::constants::namespace as NS;
use crate::ooxml::xml::{XmlElement, XmlNode, split_qname};

/// Lowest id of the shared slide master / slide layout id space.
pub const MIN_STRUCTURAL_ID: u32 = 2_147_483_648;

/// Lowest slide id.
pub const MIN_SLIDE_ID: u32 = 256;

/// Shape of one id list in its parent element.
#[derive(Debug, Clone, Copy)]
pub struct IdListKind {
    /// Local name of the list element
    pub list: &'static str,
    /// Local name of each entry
    pub entry: &'static str,
    /// Sibling elements the list must precede, in schema order
    pub successors: &'static [&'static str],
}

pub const SLIDE_MASTER_ID_LIST: IdListKind = IdListKind {
    list: "sldMasterIdLst",
    entry: "sldMasterId",
    successors: &[
        "notesMasterIdLst",
        "handoutMasterIdLst",
        "sldIdLst",
        "sldSz",
        "notesSz",
        "smartTags",
        "embeddedFontLst",
        "custShowLst",
        "photoAlbum",
        "custDataLst",
        "kinsoku",
        "defaultTextStyle",
        "modifyVerifier",
        "extLst",
    ],
};

pub const SLIDE_ID_LIST: IdListKind = IdListKind {
    list: "sldIdLst",
    entry: "sldId",
    successors: &[
        "sldSz",
        "notesSz",
        "smartTags",
        "embeddedFontLst",
        "custShowLst",
        "photoAlbum",
        "custDataLst",
        "kinsoku",
        "defaultTextStyle",
        "modifyVerifier",
        "extLst",
    ],
};

pub const SLIDE_LAYOUT_ID_LIST: IdListKind = IdListKind {
    list: "sldLayoutIdLst",
    entry: "sldLayoutId",
    successors: &["transition", "timing", "hf", "txStyles", "extLst"],
};

/// One entry of an id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEntry {
    pub id: u32,
    pub r_id: String,
}

/// Read the entries of a list, in document order.
///
/// Entries with an unparseable id are returned with id 0; entries without an
/// rId are skipped.
pub fn entries(root: &XmlElement, kind: &IdListKind) -> Vec<IdEntry> {
    let Some(list) = root.child(kind.list) else {
        return Vec::new();
    };

    list.elements()
        .filter(|e| e.local_name() == kind.entry)
        .filter_map(|e| {
            let r_id = entry_r_id(e)?;
            let id = e
                .attr("id")
                .and_then(|v| atoi_simd::parse::<u32, false, false>(v.as_bytes()).ok())
                .unwrap_or(0);
            Some(IdEntry {
                id,
                r_id: r_id.to_string(),
            })
        })
        .collect()
}

/// The rIds listed, in document order.
pub fn r_ids(root: &XmlElement, kind: &IdListKind) -> Vec<String> {
    entries(root, kind).into_iter().map(|e| e.r_id).collect()
}

/// The prefixed `id` attribute of an entry holds the rId.
fn entry_r_id(entry: &XmlElement) -> Option<&str> {
    entry
        .attributes()
        .find(|(key, _)| matches!(split_qname(key), (Some(prefix), "id") if prefix != "xmlns"))
        .map(|(_, value)| value)
}

/// Remove a list entirely, returning whether one was present.
pub fn strip(root: &mut XmlElement, kind: &IdListKind) -> bool {
    root.remove_children(kind.list) > 0
}

/// Rebuild a list so it holds exactly one entry per live rId.
///
/// Entries naming a live rId keep their id and position (first occurrence
/// wins); stale and duplicate entries are dropped; live rIds without an entry
/// are appended in the given order with ids counted up from `next_id`.
/// Returns the next unused id.
pub fn rebuild(root: &mut XmlElement, kind: &IdListKind, live_r_ids: &[String], mut next_id: u32) -> u32 {
    let r_prefix = relationships_prefix(root);
    let element_prefix = root.prefix().map(str::to_string);
    let qualify = |local: &str| match &element_prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    };

    let existing = entries(root, kind);
    let mut kept: Vec<IdEntry> = Vec::with_capacity(live_r_ids.len());
    for entry in existing {
        if live_r_ids.contains(&entry.r_id) && !kept.iter().any(|k| k.r_id == entry.r_id) {
            kept.push(entry);
        }
    }
    for r_id in live_r_ids {
        if !kept.iter().any(|k| &k.r_id == r_id) {
            kept.push(IdEntry {
                id: next_id,
                r_id: r_id.clone(),
            });
            next_id = next_id.saturating_add(1);
        }
    }

    let mut list = XmlElement::new(qualify(kind.list));
    for entry in &kept {
        list.push_child(
            XmlElement::new(qualify(kind.entry))
                .with_attr("id", &entry.id.to_string())
                .with_attr(&format!("{}:id", r_prefix), &entry.r_id),
        );
    }

    match root
        .children_mut()
        .iter()
        .position(|n| matches!(n, XmlNode::Element(e) if e.local_name() == kind.list))
    {
        Some(idx) => root.children_mut()[idx] = XmlNode::Element(list),
        None => {
            root.insert_before(XmlNode::Element(list), kind.successors);
        },
    }

    next_id
}

/// Largest id used by a list, if it has entries.
pub fn max_id(root: &XmlElement, kind: &IdListKind) -> Option<u32> {
    entries(root, kind).iter().map(|e| e.id).max()
}

/// The prefix bound to the relationships namespace on a root element.
///
/// Declares `xmlns:r` when the root has no binding for it.
pub fn relationships_prefix(root: &mut XmlElement) -> String {
    if let Some((prefix, _)) = root
        .namespace_decls()
        .find(|(prefix, uri)| !prefix.is_empty() && *uri == NS::OFC_RELATIONSHIPS)
    {
        return prefix.to_string();
    }

    let prefix = if root.namespace_decls().any(|(p, _)| p == "r") {
        "rel"
    } else {
        "r"
    };
    root.set_attr(&format!("xmlns:{}", prefix), NS::OFC_RELATIONSHIPS);
    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld/><p:clrMap/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId9"/><p:sldLayoutId id="2147483651" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles/></p:sldMaster>"#;

    #[test]
    fn test_entries() {
        let root = XmlElement::parse(MASTER.as_bytes()).unwrap();
        let entries = entries(&root, &SLIDE_LAYOUT_ID_LIST);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], IdEntry { id: 2_147_483_649, r_id: "rId1".to_string() });
        assert_eq!(max_id(&root, &SLIDE_LAYOUT_ID_LIST), Some(2_147_483_651));
    }

    #[test]
    fn test_rebuild_drops_stale_and_appends_missing() {
        let mut root = XmlElement::parse(MASTER.as_bytes()).unwrap();
        let live = vec!["rId1".to_string(), "rId2".to_string()];
        let next = rebuild(&mut root, &SLIDE_LAYOUT_ID_LIST, &live, 2_147_483_700);

        assert_eq!(next, 2_147_483_701);
        let entries = entries(&root, &SLIDE_LAYOUT_ID_LIST);
        assert_eq!(
            entries,
            vec![
                IdEntry { id: 2_147_483_649, r_id: "rId1".to_string() },
                IdEntry { id: 2_147_483_700, r_id: "rId2".to_string() },
            ]
        );
        // Still in front of txStyles
        let names: Vec<_> = root.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["cSld", "clrMap", "sldLayoutIdLst", "txStyles"]);
    }

    #[test]
    fn test_rebuild_inserts_in_schema_position() {
        let mut root = XmlElement::parse(MASTER.as_bytes()).unwrap();
        assert!(strip(&mut root, &SLIDE_LAYOUT_ID_LIST));
        assert!(!strip(&mut root, &SLIDE_LAYOUT_ID_LIST));

        rebuild(&mut root, &SLIDE_LAYOUT_ID_LIST, &["rId3".to_string()], MIN_STRUCTURAL_ID);
        let names: Vec<_> = root.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["cSld", "clrMap", "sldLayoutIdLst", "txStyles"]);
        assert!(root.to_fragment().contains(r#"<p:sldLayoutId id="2147483648" r:id="rId3"/>"#));
    }

    #[test]
    fn test_relationships_prefix_declared_when_missing() {
        let mut root = XmlElement::parse(
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldSz cx="1" cy="1"/></p:presentation>"#,
        )
        .unwrap();
        assert_eq!(relationships_prefix(&mut root), "r");
        assert_eq!(root.attr("xmlns:r"), Some(NS::OFC_RELATIONSHIPS));

        rebuild(&mut root, &SLIDE_ID_LIST, &["rId7".to_string()], MIN_SLIDE_ID);
        let names: Vec<_> = root.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["sldIdLst", "sldSz"]);
        assert_eq!(r_ids(&root, &SLIDE_ID_LIST), ["rId7"]);
    }

    #[test]
    fn test_custom_relationships_prefix() {
        let mut root = XmlElement::parse(
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:rel="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
        )
        .unwrap();
        assert_eq!(relationships_prefix(&mut root), "rel");
        rebuild(&mut root, &SLIDE_MASTER_ID_LIST, &["rId1".to_string()], MIN_STRUCTURAL_ID);
        assert!(root.to_fragment().contains(r#"rel:id="rId1""#));
    }
}

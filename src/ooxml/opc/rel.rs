/// Relationship-related objects for OPC packages.
///
/// This module provides types for managing relationships between parts in an OPC package,
/// including internal and external relationships. Relationships keep their document order,
/// which matters for the structural lists rebuilt from them.
use crate::common::xml::escape_xml;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a relative part reference or external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Get the absolute target partname for internal relationships.
    ///
    /// Returns an error if this is an external relationship.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external and has no target partname",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Ordered collection of relationships from a single source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    /// Relationships in document order
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI for resolving relative references
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: Vec::new(),
        }
    }

    /// Get the base URI targets are resolved against.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection, replacing any with the same rId.
    ///
    /// # Returns
    /// Reference to the newly added relationship
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target_ref: String,
        r_id: String,
        is_external: bool,
    ) -> &Relationship {
        let rel = Relationship::new(r_id, reltype, target_ref, self.base_uri.clone(), is_external);
        let idx = match self.rels.iter().position(|r| r.r_id == rel.r_id) {
            Some(idx) => {
                self.rels[idx] = rel;
                idx
            },
            None => {
                self.rels.push(rel);
                self.rels.len() - 1
            },
        };
        &self.rels[idx]
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Get or add an internal relationship to a target part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns that relationship. Otherwise, creates a new one with the
    /// next available rId.
    pub fn get_or_add(&mut self, reltype: &str, target: &PackURI) -> &Relationship {
        let target_ref = target.relative_ref(&self.base_uri);
        let existing = self.rels.iter().position(|rel| {
            !rel.is_external && rel.reltype == reltype && rel.target_ref == target_ref
        });

        match existing {
            Some(idx) => &self.rels[idx],
            None => {
                let r_id = self.next_r_id();
                self.add_relationship(reltype.to_string(), target_ref, r_id, false)
            },
        }
    }

    /// Get or add an external relationship, returning its rId.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(rel) = self
            .rels
            .iter()
            .find(|rel| rel.is_external && rel.reltype == reltype && rel.target_ref == target_ref)
        {
            return rel.r_id.clone();
        }

        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target_ref.to_string(), r_id.clone(), true);
        r_id
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps
    /// if any exist.
    pub(crate) fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| {
                rel.r_id
                    .strip_prefix("rId")
                    .and_then(|n| atoi_simd::parse::<u32, false, false>(n.as_bytes()).ok())
            })
            .collect();
        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        format!("rId{}", next_num)
    }

    /// Get the single relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found,
    /// or if multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.with_reltype(reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Iterate the relationships of a specific type in document order.
    pub fn with_reltype<'a, 'b>(&'a self, reltype: &'b str) -> impl Iterator<Item = &'a Relationship> {
        self.rels.iter().filter(move |rel| rel.reltype == reltype)
    }

    /// Get an iterator over all relationships in document order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let idx = self.rels.iter().position(|rel| rel.r_id == r_id)?;
        Some(self.rels.remove(idx))
    }

    /// Serialize relationships to the XML of a .rels part, in document order.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for rel in &self.rels {
            let target_mode = if rel.is_external {
                r#" TargetMode="External""#
            } else {
                ""
            };

            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref),
                target_mode
            ));
        }

        xml.push_str("</Relationships>");
        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/".to_string())
    }
}

impl<'a> IntoIterator for &'a Relationships {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.rels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as RT;

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        assert_eq!(rels.next_r_id(), "rId1");

        rels.add_relationship("t".into(), "a.xml".into(), "rId1".into(), false);
        rels.add_relationship("t".into(), "b.xml".into(), "rId3".into(), false);
        assert_eq!(rels.next_r_id(), "rId2");

        rels.add_relationship("t".into(), "c.xml".into(), "rId2".into(), false);
        assert_eq!(rels.next_r_id(), "rId4");
    }

    #[test]
    fn test_get_or_add_computes_relative_ref() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        let layout = uri("/ppt/slideLayouts/slideLayout1.xml");

        let rel = rels.get_or_add(RT::SLIDE_LAYOUT, &layout);
        assert_eq!(rel.r_id(), "rId1");
        assert_eq!(rel.target_ref(), "../slideLayouts/slideLayout1.xml");
        assert_eq!(rel.target_partname().unwrap(), layout);

        // Same target, same type: reused
        assert_eq!(rels.get_or_add(RT::SLIDE_LAYOUT, &layout).r_id(), "rId1");
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn test_external_relationships() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        let r1 = rels.get_or_add_ext_rel(RT::HYPERLINK, "https://example.com/?a=1&b=2");
        let r2 = rels.get_or_add_ext_rel(RT::HYPERLINK, "https://example.com/?a=1&b=2");
        assert_eq!(r1, r2);

        let rel = rels.get(&r1).unwrap();
        assert!(rel.is_external());
        assert!(rel.target_partname().is_err());

        let xml = rels.to_xml();
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
    }

    #[test]
    fn test_part_with_reltype() {
        let mut rels = Relationships::new("/ppt/slideMasters".to_string());
        assert!(matches!(
            rels.part_with_reltype(RT::THEME),
            Err(OpcError::RelationshipNotFound(_))
        ));

        rels.get_or_add(RT::THEME, &uri("/ppt/theme/theme1.xml"));
        rels.get_or_add(RT::SLIDE_LAYOUT, &uri("/ppt/slideLayouts/slideLayout1.xml"));
        rels.get_or_add(RT::SLIDE_LAYOUT, &uri("/ppt/slideLayouts/slideLayout2.xml"));

        assert_eq!(rels.part_with_reltype(RT::THEME).unwrap().r_id(), "rId1");
        assert!(matches!(
            rels.part_with_reltype(RT::SLIDE_LAYOUT),
            Err(OpcError::InvalidRelationship(_))
        ));

        let layouts: Vec<&str> = rels.with_reltype(RT::SLIDE_LAYOUT).map(|r| r.r_id()).collect();
        assert_eq!(layouts, ["rId2", "rId3"]);
    }

    #[test]
    fn test_to_xml_keeps_document_order() {
        let mut rels = Relationships::new("/ppt".to_string());
        rels.add_relationship("t".into(), "z.xml".into(), "rId9".into(), false);
        rels.add_relationship("t".into(), "a.xml".into(), "rId2".into(), false);

        let xml = rels.to_xml();
        let first = xml.find("rId9").unwrap();
        let second = xml.find("rId2").unwrap();
        assert!(first < second);
    }
}

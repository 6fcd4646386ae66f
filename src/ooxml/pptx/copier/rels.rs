//! Copying non-structural relationships between parts and remapping the
//! references to them.
//!
//! A copy happens in two steps. [`RelationshipPlan::build`] reads everything
//! it needs from the source package; [`RelationshipPlan::commit`] then creates
//! parts and relationships in the target and returns the rIds that changed.
//! [`remap_references`] applies that map to a cloned content tree.

use super::cache::IdentityCache;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{namespace as NS, relationship_type as rt};
use crate::ooxml::opc::{PackURI, PartFactory};
use crate::ooxml::pptx::Package;
use crate::ooxml::xml::{NamespaceScope, XmlElement, split_qname};
use log::{debug, warn};
use std::collections::HashMap;

/// Old rId to new rId, for the rIds that changed.
pub(crate) type RIdMap = HashMap<String, String>;

/// Local names of the attributes rewritten by [`remap_references`].
const REFERENCE_ATTRIBUTES: [&str; 3] = ["embed", "link", "id"];

/// Which relationships a copy carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyScope {
    /// Every non-structural relationship; used for masters and layouts
    NonStructural,
    /// Images and external targets only; used for slide content
    SlideContent,
}

#[derive(Debug)]
enum PlannedTarget {
    External(String),
    Image {
        blob: Vec<u8>,
        content_type: String,
        ext: String,
    },
    Part {
        source: PackURI,
        blob: Vec<u8>,
        content_type: String,
    },
}

#[derive(Debug)]
struct PlannedRelationship {
    r_id: String,
    reltype: String,
    target: PlannedTarget,
}

/// The relationships of one source part, read and ready to be recreated.
#[derive(Debug)]
pub(crate) struct RelationshipPlan {
    owner: PackURI,
    planned: Vec<PlannedRelationship>,
    /// rIds of the source part left out of the plan, with the reason
    uncarried: HashMap<String, String>,
}

impl RelationshipPlan {
    /// Read the relationships of a source part.
    ///
    /// Structural relationships are never planned. With
    /// [`CopyScope::SlideContent`], internal non-image relationships and
    /// images whose part is missing are left out and reported through
    /// [`uncarried_reason`](Self::uncarried_reason); with
    /// [`CopyScope::NonStructural`] a missing target part is an error.
    pub(crate) fn build(source: &Package, owner: &PackURI, scope: CopyScope) -> Result<Self> {
        let part = source.part(owner)?;
        let mut planned = Vec::new();
        let mut uncarried = HashMap::new();

        for rel in part.rels() {
            if rt::is_structural(rel.reltype()) {
                uncarried.insert(
                    rel.r_id().to_string(),
                    format!("{} is a structural relationship", rel.r_id()),
                );
                continue;
            }

            if rel.is_external() {
                planned.push(PlannedRelationship {
                    r_id: rel.r_id().to_string(),
                    reltype: rel.reltype().to_string(),
                    target: PlannedTarget::External(rel.target_ref().to_string()),
                });
                continue;
            }

            let is_image = rel.reltype() == rt::IMAGE;
            if scope == CopyScope::SlideContent && !is_image {
                uncarried.insert(
                    rel.r_id().to_string(),
                    format!("{} targets a {} part", rel.r_id(), short_reltype(rel.reltype())),
                );
                continue;
            }

            let target_partname = rel.target_partname()?;
            let target = match source.part(&target_partname) {
                Ok(target) => target,
                Err(_) if scope == CopyScope::SlideContent => {
                    warn!("{}: {} targets missing part {}", owner, rel.r_id(), target_partname);
                    uncarried.insert(
                        rel.r_id().to_string(),
                        format!("{} targets missing part {}", rel.r_id(), target_partname),
                    );
                    continue;
                },
                Err(_) => {
                    return Err(OoxmlError::PartNotFound(format!(
                        "{} (target of {} in {})",
                        target_partname,
                        rel.r_id(),
                        owner
                    )));
                },
            };

            let blob = target.blob().into_owned();
            let content_type = target.content_type().to_string();
            let target = if is_image {
                PlannedTarget::Image {
                    blob,
                    content_type,
                    ext: target_partname.ext().to_string(),
                }
            } else {
                PlannedTarget::Part {
                    source: target_partname,
                    blob,
                    content_type,
                }
            };
            planned.push(PlannedRelationship {
                r_id: rel.r_id().to_string(),
                reltype: rel.reltype().to_string(),
                target,
            });
        }

        Ok(Self {
            owner: owner.clone(),
            planned,
            uncarried,
        })
    }

    /// Whether a reference to this rId stays valid once the plan is committed.
    pub(crate) fn carries(&self, r_id: &str) -> bool {
        self.planned.iter().any(|p| p.r_id == r_id)
    }

    /// Why a reference to this rId would dangle after the copy.
    pub(crate) fn uncarried_reason(&self, r_id: &str) -> String {
        self.uncarried
            .get(r_id)
            .cloned()
            .unwrap_or_else(|| format!("{} is not a relationship of {}", r_id, self.owner))
    }

    /// Recreate the planned relationships on a target part.
    ///
    /// Images are content-addressed in the target package; other parts are
    /// duplicated once per source part and operation through the cache.
    pub(crate) fn commit(self, target: &mut Package, owner: &PackURI, cache: &mut IdentityCache) -> Result<RIdMap> {
        let mut map = RIdMap::new();

        for planned in self.planned {
            let new_r_id = match planned.target {
                PlannedTarget::External(target_ref) => target
                    .opc_package_mut()
                    .relate_ext(owner, &target_ref, &planned.reltype)?,
                PlannedTarget::Image {
                    blob,
                    content_type,
                    ext,
                } => {
                    let image = target.get_or_add_image_part(&blob, &content_type, &ext)?;
                    target.opc_package_mut().relate(owner, &image, &planned.reltype)?
                },
                PlannedTarget::Part {
                    source,
                    blob,
                    content_type,
                } => {
                    let copy = match cache.get(&source) {
                        Some(copy) if target.opc_package().contains_part(copy) => copy.clone(),
                        _ => {
                            let copy = target.opc_package().next_partname(&source.template())?;
                            target
                                .opc_package_mut()
                                .add_part(PartFactory::load(copy.clone(), content_type, blob)?)?;
                            debug!("copied {} to {}", source, copy);
                            cache.insert(source, copy.clone());
                            copy
                        },
                    };
                    target.opc_package_mut().relate(owner, &copy, &planned.reltype)?
                },
            };

            if new_r_id != planned.r_id {
                map.insert(planned.r_id, new_r_id);
            }
        }

        Ok(map)
    }
}

/// Last path segment of a relationship type, e.g. "chart".
fn short_reltype(reltype: &str) -> &str {
    reltype.rsplit('/').next().unwrap_or(reltype)
}

/// Rewrite relationship references throughout a content tree.
///
/// Every `embed`, `link` and `id` attribute in the relationships namespace
/// whose value is a key of `map` gets the mapped value. Prefixes are resolved
/// through the `xmlns` declarations in scope, starting from `scope`.
/// Returns the number of attributes rewritten.
pub(crate) fn remap_references(element: &mut XmlElement, scope: &mut NamespaceScope, map: &RIdMap) -> usize {
    if map.is_empty() {
        return 0;
    }

    scope.push(element);
    let mut rewritten = 0;
    for (key, value) in element.attributes_mut() {
        if !REFERENCE_ATTRIBUTES.contains(&split_qname(key).1)
            || scope.attribute_namespace(key) != Some(NS::OFC_RELATIONSHIPS)
        {
            continue;
        }
        if let Some(new_r_id) = map.get(value.as_str()) {
            *value = new_r_id.clone();
            rewritten += 1;
        }
    }
    for child in element.elements_mut() {
        rewritten += remap_references(child, scope, map);
    }
    scope.pop();

    rewritten
}

/// Every relationship reference in a content tree, in document order.
///
/// Any attribute in the relationships namespace counts, including the
/// diagram references (`dm`, `lo`, `qs`, `cs`) that are never remapped.
pub(crate) fn collect_references(element: &XmlElement, scope: &mut NamespaceScope, out: &mut Vec<String>) {
    scope.push(element);
    for (key, value) in element.attributes() {
        if value.is_empty() || scope.attribute_namespace(key) != Some(NS::OFC_RELATIONSHIPS) {
            continue;
        }
        if !out.iter().any(|r| r == value) {
            out.push(value.to_string());
        }
    }
    for child in element.elements() {
        collect_references(child, scope, out);
    }
    scope.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    const PICTURE: &str = r#"<p:pic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:rel="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:nvPicPr><p:cNvPr id="4" name="Picture"><a:hlinkClick rel:id="rId5"/></p:cNvPr></p:nvPicPr><p:blipFill><a:blip rel:embed="rId2"/></p:blipFill><p:spPr><a:ext id="rId2" uri="x"/></p:spPr></p:pic>"#;

    fn map(pairs: &[(&str, &str)]) -> RIdMap {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_remap_resolves_prefix() {
        let mut element = XmlElement::parse(PICTURE.as_bytes()).unwrap();
        let rewritten = remap_references(
            &mut element,
            &mut NamespaceScope::new(),
            &map(&[("rId2", "rId7"), ("rId5", "rId8")]),
        );

        assert_eq!(rewritten, 2);
        let xml = element.to_fragment();
        assert!(xml.contains(r#"<a:blip rel:embed="rId7"/>"#));
        assert!(xml.contains(r#"rel:id="rId8""#));
        // Unprefixed id attributes are not references
        assert!(xml.contains(r#"<a:ext id="rId2""#));
    }

    #[test]
    fn test_remap_swaps_without_chaining() {
        let mut element = XmlElement::parse(
            br#"<p:sp xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><a r:embed="rId1"/><b r:embed="rId2"/></p:sp>"#,
        )
        .unwrap();
        remap_references(
            &mut element,
            &mut NamespaceScope::new(),
            &map(&[("rId1", "rId2"), ("rId2", "rId1")]),
        );
        let xml = element.to_fragment();
        assert!(xml.contains(r#"<a r:embed="rId2"/><b r:embed="rId1"/>"#));
    }

    #[test]
    fn test_remap_ignores_other_namespaces() {
        let mut element =
            XmlElement::parse(br#"<x:root xmlns:x="urn:x" xmlns:r="urn:not-relationships"><x:a r:embed="rId1"/></x:root>"#)
                .unwrap();
        assert_eq!(
            remap_references(&mut element, &mut NamespaceScope::new(), &map(&[("rId1", "rId9")])),
            0
        );
    }

    #[test]
    fn test_remap_uses_outer_scope() {
        let outer = XmlElement::parse(
            br#"<p:sld xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
        )
        .unwrap();
        let mut shape = XmlElement::parse(br#"<p:pic><a:blip r:embed="rId3"/></p:pic>"#).unwrap();

        let mut scope = NamespaceScope::from_ancestors([&outer]);
        assert_eq!(remap_references(&mut shape, &mut scope, &map(&[("rId3", "rId4")])), 1);
        assert!(shape.to_fragment().contains(r#"r:embed="rId4""#));
    }

    #[test]
    fn test_collect_references() {
        let element = XmlElement::parse(PICTURE.as_bytes()).unwrap();
        let mut refs = Vec::new();
        collect_references(&element, &mut NamespaceScope::new(), &mut refs);
        assert_eq!(refs, ["rId5", "rId2"]);
    }

    #[test]
    fn test_collect_skips_empty_references() {
        let element = XmlElement::parse(
            br#"<p:sp xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><a:hlinkClick r:id="" action="ppaction://hlinkshowjump?jump=nextslide"/><dgm r:dm="rId4"/></p:sp>"#,
        )
        .unwrap();
        let mut refs = Vec::new();
        collect_references(&element, &mut NamespaceScope::new(), &mut refs);
        assert_eq!(refs, ["rId4"]);
    }
}

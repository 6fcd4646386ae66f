//! Copying one slide into the target package.

use super::cache::IdentityCache;
use super::layout::resolve_layout;
use super::options::{CopyOptions, ShapeFailurePolicy};
use super::rels::{CopyScope, RIdMap, RelationshipPlan, collect_references, remap_references};
use super::{CopiedSlide, CopyDiagnostic, LayoutMap};
use crate::common::unit::emu_to_inches;
use crate::common::xml::unescape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::parts::SlidePart;
use crate::ooxml::xml::{NamespaceScope, XmlElement, XmlNode};
use log::{debug, warn};

/// Elements following `p:clrMapOvr` in a slide.
const COLOR_MAP_SUCCESSORS: [&str; 3] = ["transition", "timing", "extLst"];

/// Hyperlink elements that attach an action to a shape or a text run.
const ACTION_ELEMENTS: [&str; 3] = ["hlinkClick", "hlinkHover", "hlinkMouseOver"];

pub(crate) fn copy_slide(
    source: &Package,
    index: usize,
    target: &mut Package,
    layout_map: Option<&LayoutMap>,
    options: &CopyOptions,
) -> Result<CopiedSlide> {
    let slides = source.slide_partnames()?;
    let source_slide = slides.get(index).ok_or(OoxmlError::IndexOutOfRange {
        index,
        len: slides.len(),
    })?;
    let source_layout = source.layout_of_slide(source_slide)?;

    let mapped_layout = match layout_map {
        Some(layouts) => {
            let name = source.layout_name(&source_layout)?;
            match layouts.get(&name) {
                Some(layout) => Some(layout.clone()),
                None => return Err(OoxmlError::LayoutNotFound(name)),
            }
        },
        None => None,
    };

    let plan = RelationshipPlan::build(source, source_slide, CopyScope::SlideContent)?;
    let content = SlideContent::read(&source.slide(source_slide)?, &plan, options)?;
    let mut diagnostics = content.diagnostics.clone();

    if options.copy_slide_size {
        let outcome = copy_slide_size(source, target)
            .unwrap_or_else(|e| Some(format!("slide size could not be set: {}", e)));
        if let Some(reason) = outcome {
            warn!("{}: {}", source_slide, reason);
            diagnostics.push(CopyDiagnostic::SlideSizeNotCopied { reason });
        }
    }

    let mut cache = IdentityCache::new();
    let layout = match mapped_layout {
        Some(layout) => layout,
        None => resolve_layout(source, &source_layout, target, &mut cache)?,
    };

    let slide = target.add_slide(&layout)?;
    let r_id_map = plan.commit(target, &slide, &mut cache)?;
    content.write(target.element_mut(&slide)?, &r_id_map)?;

    debug!("copied slide {} ({}) to {}", index, source_slide, slide);
    Ok(CopiedSlide {
        slide,
        layout,
        diagnostics,
    })
}

/// Carry the source slide size over when the target can take it.
///
/// Returns the reason when the size is left alone.
fn copy_slide_size(source: &Package, target: &mut Package) -> Result<Option<String>> {
    let Some((cx, cy)) = source.slide_size()? else {
        return Ok(Some("source presentation declares no slide size".to_string()));
    };

    let current = target.slide_size()?;
    if current == Some((cx, cy)) {
        return Ok(None);
    }
    if let Some((target_cx, target_cy)) = current
        && target.slide_count()? > 0
    {
        return Ok(Some(format!(
            "target slides are {:.2}x{:.2} in and already in use, source slides are {:.2}x{:.2} in",
            emu_to_inches(target_cx),
            emu_to_inches(target_cy),
            emu_to_inches(cx),
            emu_to_inches(cy)
        )));
    }

    target.set_slide_size(cx, cy)?;
    debug!("slide size set to {}x{} EMU", cx, cy);
    Ok(None)
}

/// The parts of a source slide carried onto the new slide.
#[derive(Debug)]
struct SlideContent {
    /// Namespace declarations in scope at the shape tree, outermost first
    namespaces: Vec<(String, String)>,
    /// Other attributes of the slide root (`show`, `showMasterSp`, ...), unescaped
    root_attributes: Vec<(String, String)>,
    background: Option<XmlElement>,
    shapes: Vec<XmlElement>,
    color_map_override: Option<XmlElement>,
    diagnostics: Vec<CopyDiagnostic>,
}

impl SlideContent {
    /// Clone what gets copied, checking every shape against the plan.
    ///
    /// Actions pointing at a relationship the plan does not carry are
    /// removed from the shape. A shape still referencing such a
    /// relationship is left out, or fails the copy under
    /// [`ShapeFailurePolicy::Abort`].
    fn read(slide: &SlidePart<'_>, plan: &RelationshipPlan, options: &CopyOptions) -> Result<Self> {
        let root = slide.element();
        let c_sld = root
            .child("cSld")
            .ok_or_else(|| OoxmlError::InvalidFormat(format!("{} has no cSld", slide.part().partname())))?;
        let sp_tree = slide.shape_tree()?;

        let mut namespaces: Vec<(String, String)> = Vec::new();
        for element in [root, c_sld, sp_tree] {
            for (prefix, uri) in element.namespace_decls() {
                namespaces.retain(|(p, _)| p != prefix);
                namespaces.push((prefix.to_string(), unescape_xml(uri).into_owned()));
            }
        }

        let root_attributes = root
            .attributes()
            .filter(|(key, _)| *key != "xmlns" && !key.starts_with("xmlns:"))
            .map(|(key, value)| (key.to_string(), unescape_xml(value).into_owned()))
            .collect();

        let mut diagnostics = Vec::new();

        let mut background = None;
        if options.copy_background
            && let Some(bg) = slide.background()
        {
            let mut scope = NamespaceScope::from_ancestors([root, c_sld]);
            match first_uncarried(bg, &mut scope, plan) {
                None => background = Some(bg.clone()),
                Some(reason) => {
                    warn!("{}: background skipped: {}", slide.part().partname(), reason);
                    diagnostics.push(CopyDiagnostic::BackgroundSkipped { reason });
                },
            }
        }

        let mut shapes = Vec::new();
        for (index, shape) in slide.shapes()?.into_iter().enumerate() {
            let mut shape = shape.clone();
            let mut scope = NamespaceScope::from_ancestors([root, c_sld, sp_tree]);
            let removed = strip_uncarried_actions(&mut shape, &mut scope, plan);

            let Some(reason) = first_uncarried(&shape, &mut scope, plan) else {
                for (element, reason) in removed {
                    warn!("{}: shape {} lost its {}: {}", slide.part().partname(), index, element, reason);
                    diagnostics.push(CopyDiagnostic::ActionRemoved {
                        index,
                        element,
                        reason,
                    });
                }
                shapes.push(shape);
                continue;
            };

            let element = shape.name().to_string();
            match options.shape_failure_policy {
                ShapeFailurePolicy::Abort => {
                    return Err(OoxmlError::ShapeCopyFailed {
                        index,
                        element,
                        reason,
                    });
                },
                ShapeFailurePolicy::Skip => {
                    warn!("{}: shape {} ({}) skipped: {}", slide.part().partname(), index, element, reason);
                    diagnostics.push(CopyDiagnostic::ShapeSkipped {
                        index,
                        element,
                        reason,
                    });
                },
            }
        }

        Ok(Self {
            namespaces,
            root_attributes,
            background,
            shapes,
            color_map_override: slide.color_map_override().cloned(),
            diagnostics,
        })
    }

    /// Write the content into the root of a freshly added slide.
    fn write(self, root: &mut XmlElement, r_id_map: &RIdMap) -> Result<()> {
        // Declarations the new root binds differently go on each copied node
        let mut node_namespaces = Vec::new();
        for (prefix, uri) in &self.namespaces {
            let attr = match prefix.as_str() {
                "" => "xmlns".to_string(),
                prefix => format!("xmlns:{}", prefix),
            };
            match root.attr_unescaped(&attr) {
                None => root.set_attr(&attr, uri),
                Some(existing) if &existing != uri => node_namespaces.push((attr, uri.clone())),
                Some(_) => {},
            }
        }
        for (key, value) in &self.root_attributes {
            root.set_attr(key, value);
        }
        let with_namespaces = |mut element: XmlElement| {
            for (attr, uri) in &node_namespaces {
                if element.attr(attr).is_none() {
                    element.set_attr(attr, uri);
                }
            }
            element
        };

        let c_sld = root
            .child_mut("cSld")
            .ok_or_else(|| OoxmlError::InvalidFormat("new slide has no cSld".to_string()))?;
        if let Some(bg) = self.background {
            c_sld.remove_children("bg");
            c_sld.children_mut().insert(0, XmlNode::Element(with_namespaces(bg)));
        }

        let sp_tree = c_sld
            .child_mut("spTree")
            .ok_or_else(|| OoxmlError::InvalidFormat("new slide has no spTree".to_string()))?;
        for shape in self.shapes {
            sp_tree.insert_before(XmlNode::Element(with_namespaces(shape)), &["extLst"]);
        }

        if let Some(color_map) = self.color_map_override {
            root.remove_children("clrMapOvr");
            root.insert_before(XmlNode::Element(with_namespaces(color_map)), &COLOR_MAP_SUCCESSORS);
        }

        remap_references(root, &mut NamespaceScope::new(), r_id_map);
        Ok(())
    }
}

/// Reason the first relationship reference in a subtree would dangle.
fn first_uncarried(element: &XmlElement, scope: &mut NamespaceScope, plan: &RelationshipPlan) -> Option<String> {
    let mut references = Vec::new();
    collect_references(element, scope, &mut references);
    references
        .iter()
        .find(|r_id| !plan.carries(r_id))
        .map(|r_id| plan.uncarried_reason(r_id))
}

/// Remove action elements whose relationship would dangle after the copy.
///
/// Returns the qualified name of each removed element with the reason.
fn strip_uncarried_actions(
    element: &mut XmlElement,
    scope: &mut NamespaceScope,
    plan: &RelationshipPlan,
) -> Vec<(String, String)> {
    let mut removed = Vec::new();
    strip_actions_into(element, scope, plan, &mut removed);
    removed
}

fn strip_actions_into(
    element: &mut XmlElement,
    scope: &mut NamespaceScope,
    plan: &RelationshipPlan,
    removed: &mut Vec<(String, String)>,
) {
    scope.push(element);
    element.children_mut().retain(|node| {
        let XmlNode::Element(child) = node else {
            return true;
        };
        if !ACTION_ELEMENTS.contains(&child.local_name()) {
            return true;
        }
        match first_uncarried(child, scope, plan) {
            None => true,
            Some(reason) => {
                removed.push((child.name().to_string(), reason));
                false
            },
        }
    });
    for child in element.elements_mut() {
        strip_actions_into(child, scope, plan, removed);
    }
    scope.pop();
}

//! Resolving source slide layouts in the target package.

use super::cache::IdentityCache;
use super::master::resolve_master;
use super::rels::{CopyScope, RelationshipPlan, remap_references};
use super::LayoutMap;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{PackURI, XmlPart};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::package::SLIDE_LAYOUT_TEMPLATE;
use crate::ooxml::xml::NamespaceScope;
use log::{debug, warn};

/// Get the target layout standing in for a source layout.
///
/// The layout's master is resolved first. When that master was reused, a
/// layout of the same name under it is reused too; otherwise the layout is
/// copied and attached to the target master.
pub(crate) fn resolve_layout(
    source: &Package,
    source_layout: &PackURI,
    target: &mut Package,
    cache: &mut IdentityCache,
) -> Result<PackURI> {
    if let Some(resolved) = cache.get(source_layout) {
        return Ok(resolved.clone());
    }

    let source_master = source.master_of_layout(source_layout)?;
    let name = source.layout_name(source_layout)?;
    let target_master = resolve_master(source, &source_master, target, cache)?;

    if cache.is_reused_master(&source_master)
        && let Some(existing) = find_layout_by_name(target, &target_master, &name)?
    {
        debug!("{} reuses layout {} ({:?})", source_layout, existing, name);
        cache.insert(source_layout.clone(), existing.clone());
        return Ok(existing);
    }

    let layout = copy_layout(source, source_layout, &target_master, target, cache)?;
    cache.insert(source_layout.clone(), layout.clone());
    Ok(layout)
}

fn find_layout_by_name(target: &Package, master: &PackURI, name: &str) -> Result<Option<PackURI>> {
    for layout in target.layout_partnames(master)? {
        if target.layout_name(&layout)? == name {
            return Ok(Some(layout));
        }
    }
    Ok(None)
}

fn copy_layout(
    source: &Package,
    source_layout: &PackURI,
    target_master: &PackURI,
    target: &mut Package,
    cache: &mut IdentityCache,
) -> Result<PackURI> {
    let source_part = source.part(source_layout)?;
    let element = source_part
        .element()
        .ok_or_else(|| OoxmlError::InvalidFormat(format!("{} is not an XML part", source_layout)))?
        .clone();
    let content_type = source_part.content_type().to_string();
    let plan = RelationshipPlan::build(source, source_layout, CopyScope::NonStructural)?;

    let layout = target.opc_package().next_partname(SLIDE_LAYOUT_TEMPLATE)?;
    target
        .opc_package_mut()
        .add_part(Box::new(XmlPart::new(layout.clone(), content_type, element)))?;

    let r_id_map = plan.commit(target, &layout, cache)?;
    remap_references(target.element_mut(&layout)?, &mut NamespaceScope::new(), &r_id_map);
    target.attach_layout(&layout, target_master)?;

    debug!("copied layout {} to {} under {}", source_layout, layout, target_master);
    Ok(layout)
}

/// Resolve every layout of the source, master by master, into a name map.
///
/// When two source layouts share a name, the one resolved last wins.
pub(crate) fn copy_layouts(source: &Package, target: &mut Package) -> Result<LayoutMap> {
    let mut cache = IdentityCache::new();
    let mut layouts = LayoutMap::new();

    for master in source.master_partnames()? {
        for layout in source.layout_partnames(&master)? {
            let name = source.layout_name(&layout)?;
            let resolved = resolve_layout(source, &layout, target, &mut cache)?;
            if let Some(previous) = layouts.insert(name.clone(), resolved.clone())
                && previous != resolved
            {
                warn!("layout name {:?} maps to both {} and {}; keeping {}", name, previous, resolved, resolved);
            }
        }
    }

    Ok(layouts)
}

//! Resolving a source slide master in the target package.

use super::cache::IdentityCache;
use super::rels::{CopyScope, RelationshipPlan, remap_references};
use super::theme::{ThemeCopy, matching_master};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::{PackURI, XmlPart};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::package::SLIDE_MASTER_TEMPLATE;
use crate::ooxml::pptx::parts::id_list::{self, SLIDE_LAYOUT_ID_LIST};
use crate::ooxml::xml::NamespaceScope;
use log::debug;

/// Get the target master standing in for a source master.
///
/// A target master with an identical theme is reused as is; otherwise the
/// source master is copied with its theme and media and attached to the
/// target presentation. Either way the result is cached for the rest of the
/// operation.
pub(crate) fn resolve_master(
    source: &Package,
    source_master: &PackURI,
    target: &mut Package,
    cache: &mut IdentityCache,
) -> Result<PackURI> {
    if let Some(resolved) = cache.get(source_master) {
        return Ok(resolved.clone());
    }

    if let Some(matched) = matching_master(source, source_master, target)? {
        debug!("{} reuses {} (identical theme)", source_master, matched);
        cache.insert_reused_master(source_master.clone(), matched.clone());
        return Ok(matched);
    }

    let master = copy_master(source, source_master, target, cache)?;
    cache.insert(source_master.clone(), master.clone());
    Ok(master)
}

fn copy_master(
    source: &Package,
    source_master: &PackURI,
    target: &mut Package,
    cache: &mut IdentityCache,
) -> Result<PackURI> {
    let source_part = source.part(source_master)?;
    let mut element = source_part
        .element()
        .ok_or_else(|| OoxmlError::InvalidFormat(format!("{} is not an XML part", source_master)))?
        .clone();
    // Rebuilt from relationships as layouts get attached
    id_list::strip(&mut element, &SLIDE_LAYOUT_ID_LIST);
    let content_type = source_part.content_type().to_string();
    let theme = ThemeCopy::plan(source, source_master)?;
    let plan = RelationshipPlan::build(source, source_master, CopyScope::NonStructural)?;

    let master = target.opc_package().next_partname(SLIDE_MASTER_TEMPLATE)?;
    target
        .opc_package_mut()
        .add_part(Box::new(XmlPart::new(master.clone(), content_type, element)))?;

    if let Some(theme) = theme {
        let theme = theme.commit(target, cache)?;
        target.opc_package_mut().relate(&master, &theme, rt::THEME)?;
    }

    let r_id_map = plan.commit(target, &master, cache)?;
    remap_references(target.element_mut(&master)?, &mut NamespaceScope::new(), &r_id_map);
    target.attach_master(&master)?;

    debug!("copied master {} to {}", source_master, master);
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;

    #[test]
    fn test_matching_master_is_reused() {
        let source = Package::new().unwrap();
        let mut target = Package::new().unwrap();
        let source_master = source.master_partnames().unwrap().remove(0);
        let mut cache = IdentityCache::new();

        let resolved = resolve_master(&source, &source_master, &mut target, &mut cache).unwrap();
        assert_eq!(resolved, target.master_partnames().unwrap()[0]);
        assert!(cache.is_reused_master(&source_master));
        assert_eq!(target.partnames_with_content_type(ct::PML_SLIDE_MASTER).len(), 1);
    }
}

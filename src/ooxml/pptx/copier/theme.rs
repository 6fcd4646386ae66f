//! Theme comparison and copying.
//!
//! Two slide masters are interchangeable when their themes are byte-for-byte
//! identical; that decides whether a source master is reused or copied.

use super::cache::IdentityCache;
use crate::ooxml::error::Result;
use crate::ooxml::opc::{BlobPart, PackURI};
use crate::ooxml::pptx::Package;
use crate::ooxml::pptx::package::THEME_TEMPLATE;
use log::debug;

/// Find the first target master, in master-list order, whose theme payload
/// equals the source master's.
///
/// A source master without a theme matches nothing; target masters without
/// a theme are passed over.
pub(crate) fn matching_master(source: &Package, source_master: &PackURI, target: &Package) -> Result<Option<PackURI>> {
    let Some(source_theme) = source.theme_of_master(source_master)? else {
        return Ok(None);
    };
    let source_blob = source.part(&source_theme)?.blob();

    for master in target.master_partnames()? {
        let Some(theme) = target.theme_of_master(&master)? else {
            continue;
        };
        if target.part(&theme)?.blob() == source_blob {
            return Ok(Some(master));
        }
    }

    Ok(None)
}

/// A source theme read ahead of being copied.
#[derive(Debug)]
pub(crate) struct ThemeCopy {
    source: PackURI,
    blob: Vec<u8>,
    content_type: String,
}

impl ThemeCopy {
    /// Read the theme of a source master, if it has one.
    pub(crate) fn plan(source: &Package, master: &PackURI) -> Result<Option<Self>> {
        let Some(theme) = source.theme_of_master(master)? else {
            return Ok(None);
        };
        let part = source.part(&theme)?;
        Ok(Some(Self {
            blob: part.blob().into_owned(),
            content_type: part.content_type().to_string(),
            source: theme,
        }))
    }

    /// Add the theme to the target, once per source theme and operation.
    pub(crate) fn commit(self, target: &mut Package, cache: &mut IdentityCache) -> Result<PackURI> {
        if let Some(copied) = cache.get(&self.source)
            && target.opc_package().contains_part(copied)
        {
            return Ok(copied.clone());
        }

        let theme = target.opc_package().next_partname(THEME_TEMPLATE)?;
        target.opc_package_mut().add_part(Box::new(BlobPart::new(
            theme.clone(),
            self.content_type,
            self.blob,
        )))?;
        debug!("copied theme {} to {}", self.source, theme);
        cache.insert(self.source, theme.clone());
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_templates_match() {
        let source = Package::new().unwrap();
        let target = Package::new().unwrap();
        let master = source.master_partnames().unwrap().remove(0);

        let matched = matching_master(&source, &master, &target).unwrap();
        assert_eq!(matched, Some(target.master_partnames().unwrap().remove(0)));
    }

    #[test]
    fn test_theme_copied_once_per_operation() {
        let source = Package::new().unwrap();
        let mut target = Package::new().unwrap();
        let master = source.master_partnames().unwrap().remove(0);
        let mut cache = IdentityCache::new();

        let first = ThemeCopy::plan(&source, &master).unwrap().unwrap().commit(&mut target, &mut cache).unwrap();
        let second = ThemeCopy::plan(&source, &master).unwrap().unwrap().commit(&mut target, &mut cache).unwrap();

        assert_eq!(first.as_str(), "/ppt/theme/theme2.xml");
        assert_eq!(first, second);
    }
}

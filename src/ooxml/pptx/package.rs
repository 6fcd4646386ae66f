/// Package implementation for PowerPoint presentations.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::error::OpcError;
use crate::ooxml::opc::{BlobPart, OpcPackage, PackURI, Part, XmlPart};
use crate::ooxml::pptx::parts::id_list::{
    self, MIN_SLIDE_ID, MIN_STRUCTURAL_ID, SLIDE_ID_LIST, SLIDE_LAYOUT_ID_LIST,
    SLIDE_MASTER_ID_LIST,
};
use crate::ooxml::pptx::parts::presentation::set_slide_size;
use crate::ooxml::pptx::parts::{PresentationPart, SlideLayoutPart, SlideMasterPart, SlidePart};
use crate::ooxml::pptx::template;
use crate::ooxml::xml::XmlElement;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::io::{Read, Seek};
use std::path::Path;

/// Partname template for slides.
pub const SLIDE_TEMPLATE: &str = "/ppt/slides/slide%d.xml";
/// Partname template for slide layouts.
pub const SLIDE_LAYOUT_TEMPLATE: &str = "/ppt/slideLayouts/slideLayout%d.xml";
/// Partname template for slide masters.
pub const SLIDE_MASTER_TEMPLATE: &str = "/ppt/slideMasters/slideMaster%d.xml";
/// Partname template for themes.
pub const THEME_TEMPLATE: &str = "/ppt/theme/theme%d.xml";

const PRESENTATION_PARTNAME: &str = "/ppt/presentation.xml";

/// A PowerPoint (.pptx) package.
///
/// This is the main entry point for working with PowerPoint presentations.
/// It wraps an OPC package and provides the PresentationML structure on top
/// of it: slides, slide layouts and slide masters in document order, the
/// slide size, and the operations that add slides and attach masters and
/// layouts while keeping the id lists consistent.
///
/// # Examples
///
/// ```rust,no_run
/// use pptx_slide_copier::ooxml::pptx::Package;
///
/// let pkg = Package::open("presentation.pptx")?;
/// println!("Presentation has {} slides", pkg.slide_count()?);
///
/// for master in pkg.master_partnames()? {
///     for layout in pkg.layout_partnames(&master)? {
///         println!("{}: {}", layout, pkg.layout_name(&layout)?);
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Package {
    /// The underlying OPC package
    opc: OpcPackage,
}

fn partname(uri: impl Into<String>) -> Result<PackURI> {
    Ok(PackURI::new(uri).map_err(OpcError::InvalidPackUri)?)
}

impl Package {
    /// Create a blank presentation.
    ///
    /// The package holds no slides, one slide master with the "Office Theme"
    /// and the layouts "Title Slide", "Title and Content" and "Title Only",
    /// with a 10in x 7.5in slide size.
    pub fn new() -> Result<Self> {
        let mut opc = OpcPackage::new();

        let presentation = partname(PRESENTATION_PARTNAME)?;
        opc.add_part(Box::new(XmlPart::load(
            presentation.clone(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            template::PRESENTATION_XML.as_bytes(),
        )?))?;
        opc.relate_to(&presentation, rt::OFFICE_DOCUMENT);

        let master = partname(SLIDE_MASTER_TEMPLATE.replace("%d", "1"))?;
        opc.add_part(Box::new(XmlPart::load(
            master.clone(),
            ct::PML_SLIDE_MASTER.to_string(),
            template::SLIDE_MASTER_XML.as_bytes(),
        )?))?;

        let theme = partname(THEME_TEMPLATE.replace("%d", "1"))?;
        opc.add_part(Box::new(BlobPart::new(
            theme.clone(),
            ct::OFC_THEME.to_string(),
            template::THEME_XML.as_bytes().to_vec(),
        )))?;
        opc.relate(&master, &theme, rt::THEME)?;

        let mut package = Self { opc };
        package.attach_master(&master)?;

        for (idx, layout) in template::DEFAULT_LAYOUTS.iter().enumerate() {
            let layout_partname =
                partname(SLIDE_LAYOUT_TEMPLATE.replace("%d", &(idx + 1).to_string()))?;
            let xml = template::slide_layout_xml(layout);
            package.opc.add_part(Box::new(XmlPart::load(
                layout_partname.clone(),
                ct::PML_SLIDE_LAYOUT.to_string(),
                xml.as_bytes(),
            )?))?;
            package.attach_layout(&layout_partname, &master)?;
        }

        Ok(package)
    }

    /// Open a .pptx package from a file path.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pptx_slide_copier::ooxml::pptx::Package;
    ///
    /// let pkg = Package::open("presentation.pptx")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_opc(OpcPackage::open(path)?)
    }

    /// Create a .pptx package from a reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - A reader containing the .pptx file data (must implement Read + Seek)
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_opc(OpcPackage::from_reader(reader)?)
    }

    /// Create a .pptx package from in-memory bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_opc(OpcPackage::from_bytes(data)?)
    }

    /// Wrap an OPC package, verifying its main part is a presentation.
    pub fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main_part = opc
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main presentation part: {}", e)))?;

        let content_type = main_part.content_type();
        // Regular, macro-enabled, template and slideshow presentations share one structure
        if !matches!(
            content_type,
            ct::PML_PRESENTATION_MAIN
                | ct::PML_PRES_MACRO_MAIN
                | ct::PML_TEMPLATE_MAIN
                | ct::PML_SLIDESHOW_MAIN
        ) {
            return Err(OoxmlError::InvalidContentType {
                expected: format!("{} or {}", ct::PML_PRESENTATION_MAIN, ct::PML_PRES_MACRO_MAIN),
                got: content_type.to_string(),
            });
        }

        Ok(Self { opc })
    }

    /// Save the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(self.opc.save(path)?)
    }

    /// Serialize the package to .pptx bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.opc.to_bytes()?)
    }

    /// Get the underlying OPC package.
    #[inline]
    pub fn opc_package(&self) -> &OpcPackage {
        &self.opc
    }

    /// Get mutable access to the underlying OPC package.
    #[inline]
    pub fn opc_package_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    /// Get the partname of the presentation part.
    pub fn presentation_partname(&self) -> Result<PackURI> {
        Ok(self.opc.main_document_partname()?)
    }

    /// Get the presentation part.
    pub fn presentation(&self) -> Result<PresentationPart<'_>> {
        PresentationPart::from_part(self.opc.main_document_part()?)
    }

    /// Get a part by partname.
    pub fn part(&self, partname: &PackURI) -> Result<&dyn Part> {
        Ok(self.opc.get_part(partname)?)
    }

    /// Get a slide part by partname.
    pub fn slide(&self, partname: &PackURI) -> Result<SlidePart<'_>> {
        SlidePart::from_part(self.part(partname)?)
    }

    /// Get mutable access to the content tree of an XML part.
    pub fn element_mut(&mut self, partname: &PackURI) -> Result<&mut XmlElement> {
        self.opc
            .get_part_mut(partname)?
            .element_mut()
            .ok_or_else(|| OoxmlError::InvalidFormat(format!("{} is not an XML part", partname)))
    }

    /// Partnames of the slides, in presentation order.
    pub fn slide_partnames(&self) -> Result<Vec<PackURI>> {
        let presentation = self.presentation()?;
        self.resolve_listed(presentation.part(), &presentation.slide_rids(), rt::SLIDE, false)
    }

    /// Number of slides in the presentation.
    pub fn slide_count(&self) -> Result<usize> {
        Ok(self.slide_partnames()?.len())
    }

    /// Partnames of the slide masters, in presentation order.
    ///
    /// Masters related to the presentation but missing from its master list
    /// follow the listed ones.
    pub fn master_partnames(&self) -> Result<Vec<PackURI>> {
        let presentation = self.presentation()?;
        self.resolve_listed(presentation.part(), &presentation.master_rids(), rt::SLIDE_MASTER, true)
    }

    /// Partnames of the layouts of a slide master, in master order.
    ///
    /// Layouts related to the master but missing from its layout list follow
    /// the listed ones.
    pub fn layout_partnames(&self, master: &PackURI) -> Result<Vec<PackURI>> {
        let master_part = SlideMasterPart::from_part(self.part(master)?)?;
        self.resolve_listed(
            master_part.part(),
            &master_part.slide_layout_rids(),
            rt::SLIDE_LAYOUT,
            true,
        )
    }

    /// Resolve id-list rIds of a part to partnames.
    ///
    /// Entries whose rId names no internal relationship of the expected type
    /// are skipped.
    fn resolve_listed(
        &self,
        owner: &dyn Part,
        r_ids: &[String],
        reltype: &str,
        include_unlisted: bool,
    ) -> Result<Vec<PackURI>> {
        let mut partnames = Vec::with_capacity(r_ids.len());
        for r_id in r_ids {
            match owner.rels().get(r_id) {
                Some(rel) if rel.reltype() == reltype && !rel.is_external() => {
                    let target = rel.target_partname()?;
                    if !partnames.contains(&target) {
                        partnames.push(target);
                    }
                },
                _ => warn!(
                    "{}: id list entry {} names no {} relationship",
                    owner.partname(),
                    r_id,
                    reltype
                ),
            }
        }

        if include_unlisted {
            for rel in owner.rels().with_reltype(reltype) {
                if rel.is_external() {
                    continue;
                }
                let target = rel.target_partname()?;
                if !partnames.contains(&target) {
                    partnames.push(target);
                }
            }
        }

        Ok(partnames)
    }

    fn single_related(&self, source: &PackURI, reltype: &str) -> Result<PackURI> {
        let part = self.part(source)?;
        match part.rels().with_reltype(reltype).find(|rel| !rel.is_external()) {
            Some(rel) => Ok(rel.target_partname()?),
            None => Err(OoxmlError::missing_relationship(source, reltype)),
        }
    }

    /// The layout a slide is based on.
    pub fn layout_of_slide(&self, slide: &PackURI) -> Result<PackURI> {
        self.single_related(slide, rt::SLIDE_LAYOUT)
    }

    /// The master a layout inherits from.
    pub fn master_of_layout(&self, layout: &PackURI) -> Result<PackURI> {
        self.single_related(layout, rt::SLIDE_MASTER)
    }

    /// The theme of a master, if it has one present in the package.
    pub fn theme_of_master(&self, master: &PackURI) -> Result<Option<PackURI>> {
        match self.single_related(master, rt::THEME) {
            Ok(theme) if self.opc.contains_part(&theme) => Ok(Some(theme)),
            Ok(_) | Err(OoxmlError::MissingRelationship { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get the name of a layout.
    pub fn layout_name(&self, layout: &PackURI) -> Result<String> {
        Ok(SlideLayoutPart::from_part(self.part(layout)?)?.name())
    }

    /// Get the slide size `(cx, cy)` in EMUs.
    pub fn slide_size(&self) -> Result<Option<(i64, i64)>> {
        self.presentation()?.slide_size()
    }

    /// Set the slide size in EMUs.
    pub fn set_slide_size(&mut self, cx: i64, cy: i64) -> Result<()> {
        if cx <= 0 || cy <= 0 {
            return Err(OoxmlError::InvalidFormat(format!("Invalid slide size {}x{}", cx, cy)));
        }
        let presentation = self.presentation_partname()?;
        set_slide_size(self.element_mut(&presentation)?, cx, cy);
        Ok(())
    }

    /// Partnames of every part with a content type, sorted.
    pub fn partnames_with_content_type(&self, content_type: &str) -> Vec<PackURI> {
        let mut partnames: Vec<PackURI> = self
            .opc
            .iter_parts()
            .filter(|part| part.content_type() == content_type)
            .map(|part| part.partname().clone())
            .collect();
        partnames.sort();
        partnames
    }

    /// Add an empty slide based on a layout, appended to the slide list.
    ///
    /// The slide gets a bare shape tree; layout placeholders are not cloned
    /// onto it.
    pub fn add_slide(&mut self, layout: &PackURI) -> Result<PackURI> {
        let layout_part = self.part(layout)?;
        if layout_part.content_type() != ct::PML_SLIDE_LAYOUT {
            return Err(OoxmlError::InvalidContentType {
                expected: ct::PML_SLIDE_LAYOUT.to_string(),
                got: layout_part.content_type().to_string(),
            });
        }

        let slide = self.opc.next_partname(SLIDE_TEMPLATE)?;
        self.opc.add_part(Box::new(XmlPart::load(
            slide.clone(),
            ct::PML_SLIDE.to_string(),
            template::SLIDE_XML.as_bytes(),
        )?))?;
        self.opc.relate(&slide, layout, rt::SLIDE_LAYOUT)?;

        let presentation = self.presentation_partname()?;
        let r_id = self.opc.relate(&presentation, &slide, rt::SLIDE)?;
        let next_id = self
            .presentation()?
            .max_slide_id()
            .map_or(MIN_SLIDE_ID, |max| max.saturating_add(1).max(MIN_SLIDE_ID));

        let root = self.element_mut(&presentation)?;
        let mut listed = id_list::r_ids(root, &SLIDE_ID_LIST);
        listed.push(r_id);
        id_list::rebuild(root, &SLIDE_ID_LIST, &listed, next_id);

        debug!("added {} based on {}", slide, layout);
        Ok(slide)
    }

    /// Relate the presentation to a master and rebuild the master id list.
    ///
    /// Returns the rId of the presentation's relationship to the master.
    pub fn attach_master(&mut self, master: &PackURI) -> Result<String> {
        let presentation = self.presentation_partname()?;
        let r_id = self.opc.relate(&presentation, master, rt::SLIDE_MASTER)?;

        let live = self.internal_rids(&presentation, rt::SLIDE_MASTER)?;
        let next_id = self.next_structural_id()?;
        id_list::rebuild(self.element_mut(&presentation)?, &SLIDE_MASTER_ID_LIST, &live, next_id);
        Ok(r_id)
    }

    /// Relate a layout and a master both ways and rebuild the master's
    /// layout id list.
    pub fn attach_layout(&mut self, layout: &PackURI, master: &PackURI) -> Result<()> {
        self.opc.relate(layout, master, rt::SLIDE_MASTER)?;
        self.opc.relate(master, layout, rt::SLIDE_LAYOUT)?;
        self.rebuild_layout_list(master)
    }

    /// Rebuild a master's layout id list from its layout relationships.
    pub fn rebuild_layout_list(&mut self, master: &PackURI) -> Result<()> {
        let live = self.internal_rids(master, rt::SLIDE_LAYOUT)?;
        let next_id = self.next_structural_id()?;
        id_list::rebuild(self.element_mut(master)?, &SLIDE_LAYOUT_ID_LIST, &live, next_id);
        Ok(())
    }

    fn internal_rids(&self, owner: &PackURI, reltype: &str) -> Result<Vec<String>> {
        Ok(self
            .part(owner)?
            .rels()
            .with_reltype(reltype)
            .filter(|rel| !rel.is_external())
            .map(|rel| rel.r_id().to_string())
            .collect())
    }

    /// Next free id of the space shared by slide master and layout ids.
    ///
    /// Scans the presentation's master list and the layout list of every
    /// master part in the package, attached or not.
    fn next_structural_id(&self) -> Result<u32> {
        let mut highest = self.presentation()?.max_master_id();
        for part in self.opc.iter_parts() {
            if part.content_type() != ct::PML_SLIDE_MASTER {
                continue;
            }
            if let Some(max) = SlideMasterPart::from_part(part)?.max_layout_id() {
                highest = Some(highest.map_or(max, |h| h.max(max)));
            }
        }

        Ok(match highest {
            Some(max) => max.saturating_add(1).max(MIN_STRUCTURAL_ID),
            None => MIN_STRUCTURAL_ID,
        })
    }

    /// Get an image part with this payload, adding one when none exists.
    ///
    /// Existing image parts are matched by SHA-256 digest; among several
    /// matches the lowest partname wins. New parts are named
    /// `/ppt/media/image%d.<ext>`.
    pub fn get_or_add_image_part(&mut self, blob: &[u8], content_type: &str, ext: &str) -> Result<PackURI> {
        let digest = Sha256::digest(blob);
        let existing = self
            .opc
            .iter_parts()
            .filter(|part| part.content_type().starts_with("image/"))
            .filter(|part| {
                let candidate = part.blob();
                candidate.len() == blob.len() && Sha256::digest(&*candidate) == digest
            })
            .map(|part| part.partname().clone())
            .min();

        if let Some(image) = existing {
            debug!("reusing image part {}", image);
            return Ok(image);
        }

        let ext = match ext.to_ascii_lowercase() {
            ext if ext.is_empty() => "bin".to_string(),
            ext => ext,
        };
        let image = self.opc.next_partname(&format!("/ppt/media/image%d.{}", ext))?;
        self.opc.add_part(Box::new(BlobPart::new(
            image.clone(),
            content_type.to_string(),
            blob.to_vec(),
        )))?;
        debug!("added image part {}", image);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_package_structure() {
        let pkg = Package::new().unwrap();

        assert_eq!(pkg.slide_count().unwrap(), 0);
        assert_eq!(pkg.slide_size().unwrap(), Some((9_144_000, 6_858_000)));

        let masters = pkg.master_partnames().unwrap();
        assert_eq!(masters.len(), 1);
        let layouts = pkg.layout_partnames(&masters[0]).unwrap();
        let names: Vec<_> = layouts.iter().map(|l| pkg.layout_name(l).unwrap()).collect();
        assert_eq!(names, ["Title Slide", "Title and Content", "Title Only"]);

        for layout in &layouts {
            assert_eq!(&pkg.master_of_layout(layout).unwrap(), &masters[0]);
        }
        assert_eq!(
            pkg.theme_of_master(&masters[0]).unwrap().unwrap().as_str(),
            "/ppt/theme/theme1.xml"
        );
    }

    #[test]
    fn test_structural_ids_are_unique() {
        let pkg = Package::new().unwrap();
        let pres = pkg.presentation().unwrap();
        let master_part = pkg.part(&pkg.master_partnames().unwrap()[0]).unwrap();

        let mut ids: Vec<u32> = id_list::entries(pres.part().element().unwrap(), &SLIDE_MASTER_ID_LIST)
            .into_iter()
            .chain(id_list::entries(master_part.element().unwrap(), &SLIDE_LAYOUT_ID_LIST))
            .map(|e| e.id)
            .collect();
        assert_eq!(ids.len(), 4);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|&id| id >= MIN_STRUCTURAL_ID));
    }

    #[test]
    fn test_add_slide_appends_in_order() {
        let mut pkg = Package::new().unwrap();
        let master = pkg.master_partnames().unwrap().remove(0);
        let layouts = pkg.layout_partnames(&master).unwrap();

        let first = pkg.add_slide(&layouts[1]).unwrap();
        let second = pkg.add_slide(&layouts[0]).unwrap();

        assert_eq!(first.as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(pkg.slide_partnames().unwrap(), vec![first.clone(), second.clone()]);
        assert_eq!(pkg.layout_of_slide(&second).unwrap(), layouts[0]);

        let pres = pkg.presentation().unwrap();
        assert_eq!(pres.max_slide_id(), Some(257));
    }

    #[test]
    fn test_add_slide_rejects_non_layout() {
        let mut pkg = Package::new().unwrap();
        let master = pkg.master_partnames().unwrap().remove(0);
        assert!(pkg.add_slide(&master).is_err());
        assert_eq!(pkg.slide_count().unwrap(), 0);
    }

    #[test]
    fn test_missing_layout_relationship() {
        let mut pkg = Package::new().unwrap();
        let master = pkg.master_partnames().unwrap().remove(0);
        let layout = pkg.layout_partnames(&master).unwrap().remove(0);
        let slide = pkg.add_slide(&layout).unwrap();

        let r_id = pkg
            .part(&slide)
            .unwrap()
            .rels()
            .part_with_reltype(rt::SLIDE_LAYOUT)
            .unwrap()
            .r_id()
            .to_string();
        pkg.opc_package_mut().get_part_mut(&slide).unwrap().rels_mut().remove(&r_id);

        assert!(matches!(
            pkg.layout_of_slide(&slide),
            Err(OoxmlError::MissingRelationship { .. })
        ));
    }

    #[test]
    fn test_set_slide_size() {
        let mut pkg = Package::new().unwrap();
        pkg.set_slide_size(12_192_000, 6_858_000).unwrap();
        assert_eq!(pkg.slide_size().unwrap(), Some((12_192_000, 6_858_000)));
        assert!(pkg.set_slide_size(0, 10).is_err());
    }

    #[test]
    fn test_image_parts_are_content_addressed() {
        let mut pkg = Package::new().unwrap();
        let a = pkg.get_or_add_image_part(b"png-bytes", ct::PNG, "PNG").unwrap();
        let b = pkg.get_or_add_image_part(b"png-bytes", ct::PNG, "png").unwrap();
        let c = pkg.get_or_add_image_part(b"other-bytes", ct::PNG, "png").unwrap();

        assert_eq!(a.as_str(), "/ppt/media/image1.png");
        assert_eq!(a, b);
        assert_eq!(c.as_str(), "/ppt/media/image2.png");
        assert_eq!(pkg.partnames_with_content_type(ct::PNG).len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let mut pkg = Package::new().unwrap();
        let master = pkg.master_partnames().unwrap().remove(0);
        let layout = pkg.layout_partnames(&master).unwrap().remove(2);
        pkg.add_slide(&layout).unwrap();

        let reloaded = Package::from_bytes(&pkg.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.slide_count().unwrap(), 1);
        let slide = reloaded.slide_partnames().unwrap().remove(0);
        let layout = reloaded.layout_of_slide(&slide).unwrap();
        assert_eq!(reloaded.layout_name(&layout).unwrap(), "Title Only");
        assert_eq!(reloaded.partnames_with_content_type(ct::OFC_THEME).len(), 1);
    }

    #[test]
    fn test_rejects_non_presentation() {
        let mut opc = OpcPackage::new();
        let doc = PackURI::new("/word/document.xml").unwrap();
        opc.add_part(Box::new(BlobPart::new(doc.clone(), "application/xml".to_string(), Vec::new())))
            .unwrap();
        opc.relate_to(&doc, rt::OFFICE_DOCUMENT);

        assert!(matches!(
            Package::from_opc(opc),
            Err(OoxmlError::InvalidContentType { .. })
        ));
    }
}

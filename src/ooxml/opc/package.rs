/// Objects that implement reading and writing OPC packages.
///
/// This module provides the main OpcPackage type, which represents an Open Packaging
/// Convention package in memory. It owns the parts and the package relationships,
/// mints fresh partnames and walks the relationship graph.
use crate::ooxml::opc::constants::relationship_type;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::{Part, PartFactory};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::PackageReader;
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::Relationships;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};
use std::path::Path;

/// Main API class for working with OPC packages.
///
/// OpcPackage represents an Open Packaging Convention package in memory,
/// providing access to parts, relationships, and package-level operations.
#[derive(Debug)]
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package, indexed by partname
    parts: HashMap<String, Box<dyn Part>>,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open an OPC package from a file.
    ///
    /// # Example
    /// ```no_run
    /// use pptx_slide_copier::ooxml::opc::OpcPackage;
    ///
    /// let pkg = OpcPackage::open("deck.pptx")?;
    /// # Ok::<(), pptx_slide_copier::ooxml::opc::error::OpcError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::open(path)?)
    }

    /// Load an OPC package from a seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::new(reader)?)
    }

    /// Load an OPC package from in-memory bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_bytes(data)?)
    }

    fn from_phys_reader(phys_reader: PhysPkgReader) -> Result<Self> {
        Self::unmarshal(PackageReader::from_phys_reader(phys_reader)?)
    }

    /// Convert serialized parts and relationships into the in-memory object graph.
    fn unmarshal(mut pkg_reader: PackageReader) -> Result<Self> {
        let mut package = Self::new();

        for srel in pkg_reader.take_pkg_srels() {
            let is_external = srel.is_external();
            package
                .rels
                .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
        }

        for spart in pkg_reader.take_sparts() {
            let mut part = PartFactory::load(spart.partname, spart.content_type, spart.blob)?;
            for srel in spart.srels {
                let is_external = srel.is_external();
                part.rels_mut()
                    .add_relationship(srel.reltype, srel.target_ref, srel.r_id, is_external);
            }
            package.parts.insert(part.partname().to_string(), part);
        }

        Ok(package)
    }

    /// Save the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// Serialize the package to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }

    /// Get the partname of the main document part (e.g. presentation.xml).
    pub fn main_document_partname(&self) -> Result<PackURI> {
        self.rels
            .part_with_reltype(relationship_type::OFFICE_DOCUMENT)?
            .target_partname()
    }

    /// Get a reference to the main document part.
    pub fn main_document_part(&self) -> Result<&dyn Part> {
        let partname = self.main_document_partname()?;
        self.get_part(&partname)
    }

    /// Get a part by its partname.
    pub fn get_part(&self, partname: &PackURI) -> Result<&dyn Part> {
        self.parts
            .get(partname.as_str())
            .map(|b| &**b as &dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Get a mutable reference to a part by its partname.
    pub fn get_part_mut(&mut self, partname: &PackURI) -> Result<&mut dyn Part> {
        self.parts
            .get_mut(partname.as_str())
            .map(|b| &mut **b as &mut dyn Part)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Add a new part to the package.
    ///
    /// Fails if a part with the same partname already exists.
    pub fn add_part(&mut self, part: Box<dyn Part>) -> Result<()> {
        let partname = part.partname().to_string();
        if self.parts.contains_key(&partname) {
            return Err(OpcError::DuplicatePart(partname));
        }
        self.parts.insert(partname, part);
        Ok(())
    }

    /// Swap an existing part for a new one with the same partname.
    ///
    /// The replacement keeps its own relationships; returns the old part.
    pub fn replace_part(&mut self, part: Box<dyn Part>) -> Result<Box<dyn Part>> {
        let partname = part.partname().to_string();
        match self.parts.get_mut(&partname) {
            Some(slot) => Ok(std::mem::replace(slot, part)),
            None => Err(OpcError::PartNotFound(partname)),
        }
    }

    /// Get an iterator over all parts in the package, in no particular order.
    pub fn iter_parts(&self) -> impl Iterator<Item = &dyn Part> {
        self.parts.values().map(|b| &**b as &dyn Part)
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Relate the package itself to a part, returning the rId.
    pub fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        self.rels.get_or_add(reltype, target).r_id().to_string()
    }

    /// Relate one part to another, returning the rId on the source part.
    ///
    /// Both parts must already be in the package.
    pub fn relate(&mut self, source: &PackURI, target: &PackURI, reltype: &str) -> Result<String> {
        if !self.contains_part(target) {
            return Err(OpcError::PartNotFound(target.to_string()));
        }
        Ok(self.get_part_mut(source)?.relate_to(target, reltype))
    }

    /// Add an external relationship from a part, returning the rId.
    pub fn relate_ext(&mut self, source: &PackURI, target_url: &str, reltype: &str) -> Result<String> {
        Ok(self.get_part_mut(source)?.relate_to_ext(target_url, reltype))
    }

    /// Get the partname a part's single relationship of a type points to.
    pub fn related_partname(&self, source: &PackURI, reltype: &str) -> Result<PackURI> {
        self.get_part(source)?.related_partname(reltype)
    }

    /// Find the next available partname for a part template.
    ///
    /// The template carries a `%d` counter (e.g. "/ppt/slides/slide%d.xml"). The
    /// result uses one more than the highest counter currently in use, so
    /// allocation depends only on the package contents.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let highest = self
            .parts
            .values()
            .filter_map(|part| part.partname().template_index(template))
            .max()
            .unwrap_or(0);
        let next = highest
            .checked_add(1)
            .ok_or_else(|| OpcError::PartnameExhausted(template.to_string()))?;

        PackURI::new(template.replacen("%d", &next.to_string(), 1)).map_err(OpcError::InvalidPackUri)
    }

    /// Walk the relationship graph from the package relationships.
    ///
    /// Yields every part reachable through internal relationships, each once,
    /// in breadth-first order.
    pub fn iter_reachable_parts(&self) -> Vec<&dyn Part> {
        let mut visited: HashSet<PackURI> = HashSet::new();
        let mut queue: VecDeque<PackURI> = VecDeque::new();
        let mut reachable = Vec::new();

        let mut enqueue = |rels: &Relationships, queue: &mut VecDeque<PackURI>| {
            for rel in rels.iter().filter(|rel| !rel.is_external()) {
                if let Ok(partname) = rel.target_partname()
                    && visited.insert(partname.clone())
                {
                    queue.push_back(partname);
                }
            }
        };

        enqueue(&self.rels, &mut queue);
        while let Some(partname) = queue.pop_front() {
            if let Ok(part) = self.get_part(&partname) {
                enqueue(part.rels(), &mut queue);
                reachable.push(part);
            }
        }

        reachable
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as CT;
    use crate::ooxml::opc::part::BlobPart;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn create_minimal_pptx() -> Vec<u8> {
        let mut zip_data = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut zip_data));
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="png" ContentType="image/png"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
</Types>"#).unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("ppt/presentation.xml", options).unwrap();
            writer.write_all(br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#).unwrap();

            writer.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
</Relationships>"#).unwrap();

            writer.start_file("ppt/media/image1.png", options).unwrap();
            writer.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

            writer.start_file("ppt/media/orphan.png", options).unwrap();
            writer.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

            writer.finish().unwrap();
        }
        zip_data
    }

    #[test]
    fn test_open_package_walks_relationships() {
        let pkg = OpcPackage::from_bytes(&create_minimal_pptx()).unwrap();

        // The orphan member is not reachable, so it is not loaded
        assert_eq!(pkg.part_count(), 2);

        let main_part = pkg.main_document_part().unwrap();
        assert_eq!(main_part.content_type(), CT::PML_PRESENTATION_MAIN);
        assert!(main_part.element().is_some());

        let image = PackURI::new("/ppt/media/image1.png").unwrap();
        assert_eq!(pkg.get_part(&image).unwrap().content_type(), CT::PNG);
    }

    #[test]
    fn test_round_trip_bytes() {
        let pkg = OpcPackage::from_bytes(&create_minimal_pptx()).unwrap();
        let bytes = pkg.to_bytes().unwrap();
        let reloaded = OpcPackage::from_bytes(&bytes).unwrap();

        assert_eq!(reloaded.part_count(), 2);
        assert_eq!(reloaded.iter_reachable_parts().len(), 2);
        let pres = reloaded.main_document_partname().unwrap();
        assert_eq!(
            reloaded.related_partname(&pres, relationship_type::IMAGE).unwrap().as_str(),
            "/ppt/media/image1.png"
        );
    }

    #[test]
    fn test_next_partname_uses_highest_counter() {
        let mut pkg = OpcPackage::new();
        let template = "/ppt/slides/slide%d.xml";
        assert_eq!(pkg.next_partname(template).unwrap().as_str(), "/ppt/slides/slide1.xml");

        for name in ["/ppt/slides/slide1.xml", "/ppt/slides/slide4.xml", "/ppt/slideLayouts/slideLayout9.xml"] {
            let part = BlobPart::new(PackURI::new(name).unwrap(), CT::PML_SLIDE.into(), Vec::new());
            pkg.add_part(Box::new(part)).unwrap();
        }
        assert_eq!(pkg.next_partname(template).unwrap().as_str(), "/ppt/slides/slide5.xml");
    }

    #[test]
    fn test_add_part_rejects_duplicates() {
        let mut pkg = OpcPackage::new();
        let name = PackURI::new("/ppt/media/image1.png").unwrap();
        pkg.add_part(Box::new(BlobPart::new(name.clone(), CT::PNG.into(), vec![1])))
            .unwrap();
        let result = pkg.add_part(Box::new(BlobPart::new(name, CT::PNG.into(), vec![2])));
        assert!(matches!(result, Err(OpcError::DuplicatePart(_))));
    }

    #[test]
    fn test_relate_requires_both_parts() {
        let mut pkg = OpcPackage::new();
        let slide = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let image = PackURI::new("/ppt/media/image1.png").unwrap();
        pkg.add_part(Box::new(BlobPart::new(slide.clone(), CT::PML_SLIDE.into(), Vec::new())))
            .unwrap();

        assert!(pkg.relate(&slide, &image, relationship_type::IMAGE).is_err());

        pkg.add_part(Box::new(BlobPart::new(image.clone(), CT::PNG.into(), vec![1])))
            .unwrap();
        let r_id = pkg.relate(&slide, &image, relationship_type::IMAGE).unwrap();
        assert_eq!(pkg.get_part(&slide).unwrap().target_ref(&r_id).unwrap(), "../media/image1.png");

        let ext = pkg
            .relate_ext(&slide, "https://example.com", relationship_type::HYPERLINK)
            .unwrap();
        assert_ne!(ext, r_id);
    }
}

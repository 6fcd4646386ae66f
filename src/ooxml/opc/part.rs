/// Open Packaging Convention (OPC) objects related to package parts.
///
/// This module provides the Part trait with its two implementations: [`BlobPart`]
/// for opaque payloads (media, themes, embedded objects) and [`XmlPart`] for the
/// PresentationML parts whose content tree gets edited (presentation, slides,
/// slide layouts, slide masters).
use crate::ooxml::opc::constants::content_type as CT;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;
use crate::ooxml::xml::XmlElement;
use std::borrow::Cow;
use std::sync::Arc;

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI), a content type, and may have relationships
/// to other parts.
pub trait Part: std::fmt::Debug {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Get the serialized content of this part.
    ///
    /// Blob parts borrow their payload; XML parts serialize their current tree.
    fn blob(&self) -> Cow<'_, [u8]>;

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Get the parsed content tree, for parts that keep one.
    fn element(&self) -> Option<&XmlElement> {
        None
    }

    /// Get mutable access to the parsed content tree, for parts that keep one.
    fn element_mut(&mut self) -> Option<&mut XmlElement> {
        None
    }

    /// Add or get a relationship to another part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns its rId. Otherwise, creates a new relationship and returns
    /// the new rId.
    fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        let rel = self.rels_mut().get_or_add(reltype, target);
        rel.r_id().to_string()
    }

    /// Add or get an external relationship.
    fn relate_to_ext(&mut self, target_url: &str, reltype: &str) -> String {
        self.rels_mut().get_or_add_ext_rel(reltype, target_url)
    }

    /// Get the target reference for a relationship ID.
    fn target_ref(&self, r_id: &str) -> Result<&str> {
        self.rels()
            .get(r_id)
            .map(|rel| rel.target_ref())
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("rId: {}", r_id)))
    }

    /// Get the partname targeted by this part's single relationship of a type.
    fn related_partname(&self, reltype: &str) -> Result<PackURI> {
        self.rels().part_with_reltype(reltype)?.target_partname()
    }
}

/// A part that stores its content as opaque bytes.
///
/// The payload is shared via Arc, so copying a part between packages does not
/// duplicate the bytes until one side is serialized.
#[derive(Debug, Clone)]
pub struct BlobPart {
    partname: PackURI,
    content_type: String,
    blob: Arc<Vec<u8>>,
    rels: Relationships,
}

impl BlobPart {
    /// Create a new BlobPart.
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        Self::from_shared(partname, content_type, Arc::new(blob))
    }

    /// Create a BlobPart sharing an existing payload.
    pub fn from_shared(partname: PackURI, content_type: String, blob: Arc<Vec<u8>>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Get the shared payload.
    #[inline]
    pub fn shared_blob(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.blob)
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.blob.as_slice())
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}

/// An XML part holding a parsed, editable content tree.
#[derive(Debug, Clone)]
pub struct XmlPart {
    partname: PackURI,
    content_type: String,
    element: XmlElement,
    rels: Relationships,
}

impl XmlPart {
    /// Create a new XmlPart from a content tree.
    pub fn new(partname: PackURI, content_type: String, element: XmlElement) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            element,
            rels,
        }
    }

    /// Load an XML part by parsing its serialized content.
    pub fn load(partname: PackURI, content_type: String, xml_bytes: &[u8]) -> Result<Self> {
        let element = XmlElement::parse(xml_bytes).map_err(|e| {
            OpcError::XmlError(format!("Failed to parse part {}: {}", partname, e))
        })?;
        Ok(Self::new(partname, content_type, element))
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.element.to_bytes())
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn element(&self) -> Option<&XmlElement> {
        Some(&self.element)
    }

    fn element_mut(&mut self) -> Option<&mut XmlElement> {
        Some(&mut self.element)
    }
}

/// Factory for creating Part instances based on content type.
///
/// Only the parts whose content tree is read or edited are parsed; everything
/// else, themes included, stays a byte-exact [`BlobPart`].
pub struct PartFactory;

impl PartFactory {
    /// Content types loaded as [`XmlPart`].
    const PARSED_CONTENT_TYPES: [&'static str; 7] = [
        CT::PML_PRESENTATION_MAIN,
        CT::PML_PRES_MACRO_MAIN,
        CT::PML_TEMPLATE_MAIN,
        CT::PML_SLIDESHOW_MAIN,
        CT::PML_SLIDE,
        CT::PML_SLIDE_LAYOUT,
        CT::PML_SLIDE_MASTER,
    ];

    /// Load a part from raw data, selecting the appropriate Part type based on content type.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Box<dyn Part>> {
        if Self::is_parsed_content_type(&content_type) {
            Ok(Box::new(XmlPart::load(partname, content_type, &blob)?))
        } else {
            Ok(Box::new(BlobPart::new(partname, content_type, blob)))
        }
    }

    #[inline]
    fn is_parsed_content_type(content_type: &str) -> bool {
        Self::PARSED_CONTENT_TYPES.contains(&content_type)
    }
}

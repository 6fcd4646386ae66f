//! Low-level, read-only API to a serialized Open Packaging Convention (OPC) package.
//!
//! This module provides the PackageReader for parsing OPC packages, including
//! content type mapping, relationship resolution, and part loading. Parts are
//! discovered by walking the relationship graph from the package relationships,
//! so members no relationship reaches are not loaded.

use crate::ooxml::opc::constants::target_mode;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};

/// Relationship lists are short; most parts have fewer than eight.
pub type SerializedRelationships = SmallVec<[SerializedRelationship; 8]>;

/// Serialized part with its content and relationships.
///
/// Represents a part as loaded from the physical package, before
/// being converted into a Part object.
#[derive(Debug)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackURI,

    /// The content type of this part
    pub content_type: String,

    /// The relationship type that first referred to this part
    pub reltype: String,

    /// The binary content of this part
    pub blob: Vec<u8>,

    /// Serialized relationships from this part, in document order
    pub srels: SerializedRelationships,
}

/// Serialized relationship as read from a .rels file.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    /// Base URI for resolving relative references
    pub base_uri: String,

    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative URI or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    /// Get the target partname for internal relationships.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external() {
            return Err(OpcError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and Override elements
/// from [Content_Types].xml. Partname and extension matching are case-insensitive.
struct ContentTypeMap {
    /// Maps lowercase file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps lowercase partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse content types from [Content_Types].xml.
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        };
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let key_attr: Option<&[u8]> = match e.local_name().as_ref() {
                        b"Default" => Some(&b"Extension"[..]),
                        b"Override" => Some(&b"PartName"[..]),
                        _ => None,
                    };

                    if let Some(key_attr) = key_attr {
                        let mut key = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            if attr.key.as_ref() == key_attr {
                                key = Some(attr.unescape_value()?.to_lowercase());
                            } else if attr.key.as_ref() == b"ContentType" {
                                content_type = Some(attr.unescape_value()?.to_string());
                            }
                        }

                        if let (Some(key), Some(ct)) = (key, content_type) {
                            if key_attr == b"Extension" {
                                map.defaults.insert(key, ct);
                            } else {
                                map.overrides.insert(key, ct);
                            }
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Get the content type for a partname.
    ///
    /// First checks for an override, then falls back to the default
    /// based on file extension.
    fn get(&self, pack_uri: &PackURI) -> Result<String> {
        if let Some(ct) = self.overrides.get(&pack_uri.as_str().to_lowercase()) {
            return Ok(ct.clone());
        }
        if let Some(ct) = self.defaults.get(&pack_uri.ext().to_lowercase()) {
            return Ok(ct.clone());
        }
        Err(OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Package reader that provides access to serialized parts and relationships.
pub struct PackageReader {
    /// Package-level relationships
    pkg_srels: SerializedRelationships,

    /// All serialized parts reachable from the package relationships
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    /// Parse the logical structure of a physical package.
    ///
    /// 1. Parse content types
    /// 2. Parse package-level relationships
    /// 3. Traverse the relationship graph breadth-first, taking ownership of part blobs
    pub fn from_phys_reader(mut phys_reader: PhysPkgReader) -> Result<Self> {
        let content_types = ContentTypeMap::from_xml(phys_reader.content_types_xml()?)?;

        let package_uri = PackURI::new(PACKAGE_URI).map_err(OpcError::InvalidPackUri)?;
        let pkg_srels = Self::load_rels(&phys_reader, &package_uri)?;

        let sparts = Self::load_parts(&mut phys_reader, &pkg_srels, &content_types)?;

        Ok(Self { pkg_srels, sparts })
    }

    fn load_rels(phys_reader: &PhysPkgReader, source_uri: &PackURI) -> Result<SerializedRelationships> {
        match phys_reader.rels_xml_for(source_uri)? {
            Some(xml) => Self::parse_rels_xml(xml, source_uri.base_uri()),
            None => Ok(SmallVec::new()),
        }
    }

    /// Parse relationships XML into SerializedRelationship structs.
    fn parse_rels_xml(rels_xml: &[u8], base_uri: &str) -> Result<SerializedRelationships> {
        let mut srels = SmallVec::new();
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut target_mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                                b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                                b"TargetMode" => target_mode = attr.unescape_value()?.to_string(),
                                _ => {},
                            }
                        }

                        if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                            srels.push(SerializedRelationship {
                                base_uri: base_uri.to_string(),
                                r_id: id,
                                reltype: rt,
                                target_ref: tr,
                                target_mode,
                            });
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(srels)
    }

    /// Load all parts reachable from the package relationships.
    ///
    /// Relationships to members missing from the archive are tolerated: the
    /// relationship is kept but no part is loaded for it.
    fn load_parts(
        phys_reader: &mut PhysPkgReader,
        pkg_srels: &[SerializedRelationship],
        content_types: &ContentTypeMap,
    ) -> Result<Vec<SerializedPart>> {
        let mut sparts = Vec::with_capacity(phys_reader.len());
        let mut visited = HashSet::new();
        let mut queue: VecDeque<(PackURI, String)> = VecDeque::new();

        let enqueue = |srels: &[SerializedRelationship],
                       visited: &mut HashSet<PackURI>,
                       queue: &mut VecDeque<(PackURI, String)>| {
            for srel in srels.iter().filter(|srel| !srel.is_external()) {
                if let Ok(partname) = srel.target_partname()
                    && visited.insert(partname.clone())
                {
                    queue.push_back((partname, srel.reltype.clone()));
                }
            }
        };

        enqueue(pkg_srels, &mut visited, &mut queue);

        while let Some((partname, reltype)) = queue.pop_front() {
            if !phys_reader.contains(&partname) {
                log::warn!("relationship target {} is missing from the package", partname);
                continue;
            }

            let srels = Self::load_rels(phys_reader, &partname)?;
            enqueue(&srels[..], &mut visited, &mut queue);

            let blob = phys_reader.take_blob(&partname)?;
            let content_type = content_types.get(&partname)?;

            sparts.push(SerializedPart {
                partname,
                content_type,
                reltype,
                blob,
                srels,
            });
        }

        Ok(sparts)
    }

    /// Get an iterator over all serialized parts.
    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Get package-level relationships.
    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    /// Take ownership of package-level relationships.
    pub fn take_pkg_srels(&mut self) -> SerializedRelationships {
        std::mem::take(&mut self.pkg_srels)
    }

    /// Take ownership of all serialized parts.
    pub fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }
}

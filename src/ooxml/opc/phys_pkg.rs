//! Provides a general interface to a physical OPC package (ZIP file).
//!
//! Reading decompresses every member up front into memory, after which the
//! package reader walks the relationship graph without touching the archive
//! again. Writing streams members into a deflate-compressed archive.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Physical package reader holding the decompressed members of a ZIP-based OPC package.
pub struct PhysPkgReader {
    /// Member bytes keyed by membername (partname without the leading slash)
    members: HashMap<String, Vec<u8>>,
}

impl PhysPkgReader {
    /// Open an OPC package from a file path.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or isn't a valid ZIP file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        let file = std::fs::File::open(path)?;
        Self::new(std::io::BufReader::new(file))
    }

    /// Read an OPC package from in-memory bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::new(Cursor::new(data))
    }

    /// Read an OPC package from any seekable reader.
    pub fn new<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut members = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)?;
            members.insert(name, data);
        }

        Ok(Self { members })
    }

    /// Get the binary content of a member by its PackURI.
    pub fn blob_for(&self, pack_uri: &PackURI) -> Result<&[u8]> {
        self.members
            .get(pack_uri.membername())
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(pack_uri.to_string()))
    }

    /// Get the [Content_Types].xml content.
    pub fn content_types_xml(&self) -> Result<&[u8]> {
        self.members
            .get(CONTENT_TYPES_URI.trim_start_matches('/'))
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))
    }

    /// Get the relationships XML for a source URI, if the source has any.
    pub fn rels_xml_for(&self, source_uri: &PackURI) -> Result<Option<&[u8]>> {
        let rels_uri = source_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
        Ok(self.members.get(rels_uri.membername()).map(Vec::as_slice))
    }

    /// Take ownership of a member's bytes.
    pub fn take_blob(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        self.members
            .remove(pack_uri.membername())
            .ok_or_else(|| OpcError::PartNotFound(pack_uri.to_string()))
    }

    /// Check if a member exists in the package.
    #[inline]
    pub fn contains(&self, pack_uri: &PackURI) -> bool {
        self.members.contains_key(pack_uri.membername())
    }

    /// Get the number of members in the package.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Physical package writer producing a deflate-compressed ZIP archive in memory.
pub struct PhysPkgWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PhysPkgWriter {
    /// Create a writer over an empty in-memory archive.
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Write a member for a PackURI.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.zip.start_file(pack_uri.membername(), self.options)?;
        self.zip.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_members() {
        let mut writer = PhysPkgWriter::new();
        let ct = PackURI::new(CONTENT_TYPES_URI).unwrap();
        let slide = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        writer.write(&ct, b"<Types/>").unwrap();
        writer.write(&slide, b"<p:sld/>").unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = PhysPkgReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.content_types_xml().unwrap(), b"<Types/>");
        assert!(reader.contains(&slide));
        assert_eq!(reader.rels_xml_for(&slide).unwrap(), None);
        assert_eq!(reader.take_blob(&slide).unwrap(), b"<p:sld/>");
        assert!(matches!(reader.blob_for(&slide), Err(OpcError::PartNotFound(_))));
    }

    #[test]
    fn test_rejects_non_zip_data() {
        assert!(matches!(
            PhysPkgReader::from_bytes(b"definitely not a zip"),
            Err(OpcError::ZipError(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            PhysPkgReader::open("/nonexistent/deck.pptx"),
            Err(OpcError::PackageNotFound(_))
        ));
    }
}

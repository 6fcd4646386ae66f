/// Provides the PackURI value type and utilities for working with package URIs.
///
/// A PackURI represents a part name within an OPC package, following the URI format
/// defined by the Open Packaging Conventions specification. PackURIs are also the
/// stable identity of a part: the slide copier keys its caches and returns its
/// handles as PackURIs.

/// Placeholder for the counter in a partname template (e.g. `/ppt/slides/slide%d.xml`).
pub const TEMPLATE_COUNTER: &str = "%d";

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/presentation.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// # Returns
    /// * `Ok(PackURI)` if the URI is valid
    /// * `Err` if the URI doesn't start with a forward slash
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackURI must begin with slash, got '{}'", uri));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../slideLayouts/slideLayout1.xml")
    /// onto a base URI (like "/ppt/slides") to produce an absolute PackURI
    /// (like "/ppt/slideLayouts/slideLayout1.xml"). Absolute references are only normalized.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self, String> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else {
            Self::join_paths(base_uri, relative_ref)
        };
        Self::new(Self::normalize_path(&joined))
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI, e.g. "slide1.xml".
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") returns
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        // Never treat the filename itself as a shared directory
        let common = from_parts
            .iter()
            .zip(to_parts.iter().take(to_parts.len().saturating_sub(1)))
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = Vec::with_capacity(from_parts.len() + to_parts.len());
        segments.extend(std::iter::repeat_n("..", from_parts.len() - common));
        segments.extend(to_parts.iter().skip(common));
        segments.join("/")
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/ppt/slides/_rels/slide1.xml.rels" for "/ppt/slides/slide1.xml",
    /// and "/_rels/.rels" for the package pseudo-partname.
    pub fn rels_uri(&self) -> Result<PackURI, String> {
        let rels_filename = format!("{}.rels", self.filename());
        let base_uri = self.base_uri();
        let rels_uri_str = if base_uri == "/" {
            format!("/_rels/{}", rels_filename)
        } else {
            format!("{}/_rels/{}", base_uri, rels_filename)
        };

        Self::new(rels_uri_str)
    }

    /// Derive a partname template from this partname.
    ///
    /// The trailing digits of the file stem become the `%d` counter, so
    /// "/ppt/media/image3.png" yields "/ppt/media/image%d.png". A stem without
    /// trailing digits gets the counter appended: "/ppt/media/clip.mp4" yields
    /// "/ppt/media/clip%d.mp4".
    pub fn template(&self) -> String {
        let filename = self.filename();
        let (stem, ext) = match filename.rfind('.') {
            Some(pos) => filename.split_at(pos),
            None => (filename, ""),
        };
        let digits = stem.bytes().rev().take_while(u8::is_ascii_digit).count();
        let prefix_len = self.uri.len() - filename.len();

        format!(
            "{}{}{}{}",
            &self.uri[..prefix_len],
            &stem[..stem.len() - digits],
            TEMPLATE_COUNTER,
            ext
        )
    }

    /// Get the counter value of this partname relative to a `%d` template.
    ///
    /// Returns None when the partname does not belong to the template family,
    /// e.g. "/ppt/slides/slide12.xml" yields 12 for "/ppt/slides/slide%d.xml"
    /// but None for "/ppt/slideLayouts/slideLayout%d.xml".
    pub fn template_index(&self, template: &str) -> Option<u32> {
        let (prefix, suffix) = template.split_once(TEMPLATE_COUNTER)?;
        let middle = self
            .uri
            .strip_prefix(prefix)?
            .strip_suffix(suffix)?
            .as_bytes();
        if middle.is_empty() || !middle.iter().all(u8::is_ascii_digit) {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(middle).ok()
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Helper function to join two paths using forward slashes
    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Helper function to normalize a path (resolve ".." and ".")
    fn normalize_path(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }

        format!("/{}", parts.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/ppt/presentation.xml").is_ok());
        assert!(PackURI::new("ppt/presentation.xml").is_err());
    }

    #[test]
    fn test_base_uri_and_filename() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
        assert_eq!(root.filename(), "");
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.relative_ref("/ppt/slides"), "../slideLayouts/slideLayout1.xml");

        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.relative_ref("/ppt"), "slides/slide1.xml");
        assert_eq!(uri.relative_ref("/"), "ppt/slides/slide1.xml");

        let uri = PackURI::new("/ppt/media/image1.png").unwrap();
        assert_eq!(uri.relative_ref("/ppt/media"), "image1.png");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/ppt/slides", "../slideLayouts/slideLayout2.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slideLayouts/slideLayout2.xml");

        let uri = PackURI::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");

        let uri = PackURI::from_rel_ref("/ppt/slides", "/ppt/media/image1.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/image1.png");
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.rels_uri().unwrap().as_str(), "/ppt/slides/_rels/slide1.xml.rels");

        let root = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    #[test]
    fn test_template() {
        let uri = PackURI::new("/ppt/media/image3.png").unwrap();
        assert_eq!(uri.template(), "/ppt/media/image%d.png");

        let uri = PackURI::new("/ppt/media/clip.mp4").unwrap();
        assert_eq!(uri.template(), "/ppt/media/clip%d.mp4");

        let uri = PackURI::new("/ppt/embeddings/oleObject12.bin").unwrap();
        assert_eq!(uri.template(), "/ppt/embeddings/oleObject%d.bin");
    }

    #[test]
    fn test_template_index() {
        let template = "/ppt/slides/slide%d.xml";
        let uri = PackURI::new("/ppt/slides/slide12.xml").unwrap();
        assert_eq!(uri.template_index(template), Some(12));

        let uri = PackURI::new("/ppt/slideLayouts/slideLayout3.xml").unwrap();
        assert_eq!(uri.template_index(template), None);

        let uri = PackURI::new("/ppt/slides/slide.xml").unwrap();
        assert_eq!(uri.template_index(template), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_template_round_trips_index(stem in "[a-zA-Z]{1,12}", n in 1u32..100_000) {
                let uri = PackURI::new(format!("/ppt/media/{}{}.bin", stem, n)).unwrap();
                let template = uri.template();
                prop_assert_eq!(uri.template_index(&template), Some(n));
            }

            #[test]
            fn prop_relative_ref_resolves_back(dir in "[a-z]{1,8}", file in "[a-z]{1,8}[0-9]{0,3}\\.xml") {
                let target = PackURI::new(format!("/ppt/{}/{}", dir, file)).unwrap();
                for base in ["/", "/ppt", "/ppt/slides", "/ppt/slideLayouts/_rels"] {
                    let rel = target.relative_ref(base);
                    let resolved = PackURI::from_rel_ref(base, &rel).unwrap();
                    prop_assert_eq!(resolved, target.clone());
                }
            }
        }
    }
}

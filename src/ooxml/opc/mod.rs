/// Open Packaging Conventions (OPC) implementation.
///
/// This module provides the packaging layer PresentationML documents live in:
///
/// - Package structure (parts, relationships)
/// - Content type management
/// - ZIP-based physical packaging
/// - Partname allocation from `%d` templates
///
/// # Performance Features
///
/// - Uses `atoi_simd` for fast integer parsing of rIds and partname counters
/// - Uses `quick-xml` for streaming parsing of `.rels` and `[Content_Types].xml`
/// - Shares media payloads via `Arc` instead of copying them
pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::{BlobPart, Part, PartFactory, XmlPart};
pub use rel::{Relationship, Relationships};

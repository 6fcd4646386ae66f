//! Office Open XML (OOXML) format implementation.
//!
//! The module is organized into layers:
//!
//! 1. **OPC Layer** (`opc`): Low-level package handling (ZIP, parts, relationships)
//! 2. **XML Layer** (`xml`): Owned, editable content trees of XML parts
//! 3. **PresentationML** (`pptx`): Presentations and copying slides between them
//!
//! # Example: Copying a Slide
//!
//! ```rust,no_run
//! use pptx_slide_copier::ooxml::pptx::{Package, copier};
//!
//! let source = Package::open("source.pptx")?;
//! let mut target = Package::open("target.pptx")?;
//!
//! copier::copy_slide(&source, 0, &mut target, None)?;
//! target.save("target.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod error;
pub mod opc;
pub mod pptx;
pub mod xml;

// Re-export commonly used types from OPC layer
pub use opc::{OpcPackage, PackURI};

// Re-export error types
pub use error::{OoxmlError, Result};

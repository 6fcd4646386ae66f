//! PowerPoint (.pptx) presentation support.
//!
//! This module provides the PresentationML layer over the OPC package and the
//! slide copier built on it:
//!
//! - `Package`: a .pptx package with its slides, layouts and masters
//! - `parts`: read-only views of the presentation, slide, layout and master parts
//! - `copier`: copying slides, with their layouts, masters, themes and media,
//!   from one presentation into another
//!
//! # Example
//!
//! ```rust,no_run
//! use pptx_slide_copier::ooxml::pptx::{Package, copier};
//!
//! let source = Package::open("source.pptx")?;
//! let mut target = Package::new()?;
//!
//! let copied = copier::copy_slide(&source, 0, &mut target, None)?;
//! println!("{} uses layout {}", copied.slide, target.layout_name(&copied.layout)?);
//! target.save("copy.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod copier;
pub mod package;
pub mod parts;
pub mod template;

pub use copier::{CopiedSlide, CopyDiagnostic, CopyOptions, LayoutMap, ShapeFailurePolicy, SlideCopier};
pub use package::Package;

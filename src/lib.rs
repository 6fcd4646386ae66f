//! pptx-slide-copier - copy slides between PowerPoint presentations
//!
//! A slide only looks right together with the layout it is based on, the
//! slide master above that layout and the master's theme. This library copies
//! a slide from one .pptx package into another and brings that style chain
//! along, reusing what the target already has instead of piling up
//! duplicates.
//!
//! # Features
//!
//! - **Style chain resolution**: masters with a byte-identical theme are reused,
//!   their layouts matched by name; everything else is copied once per operation
//! - **Relationship remapping**: images, external links and media referenced by
//!   copied content are recreated in the target and every rId is rewritten
//! - **Content-addressed images**: identical pictures are stored once
//! - **Consistent id lists**: master, layout and slide id lists are rebuilt from
//!   relationships after every structural change
//! - **Diagnostics**: shapes or backgrounds that cannot be carried over are
//!   reported, or fail the copy when configured to
//!
//! # Example - Copying slides
//!
//! ```no_run
//! use pptx_slide_copier::ooxml::pptx::{Package, copier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Package::open("quarterly.pptx")?;
//! let mut target = Package::new()?;
//!
//! // Resolve every layout once, then copy the slides that matter
//! let layouts = copier::copy_layouts(&source, &mut target)?;
//! for index in [3, 0] {
//!     let copied = copier::copy_slide(&source, index, &mut target, Some(&layouts))?;
//!     println!("{} -> {}", index, copied.slide);
//! }
//!
//! target.save("highlights.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Options
//!
//! ```no_run
//! use pptx_slide_copier::ooxml::pptx::{CopyOptions, Package, SlideCopier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CopyOptions::from_yaml(&std::fs::read_to_string("copy.yaml")?)?;
//! let source = Package::open("deck.pptx")?;
//! let mut target = Package::open("merged.pptx")?;
//!
//! SlideCopier::new(&source)
//!     .with_options(options)
//!     .copy_slides(&mut target, None)?;
//! target.save("merged.pptx")?;
//! # Ok(())
//! # }
//! ```

/// Utilities shared across the OOXML layers: EMU conversion, XML escaping.
pub mod common;

/// OOXML (Office Open XML) packages and PresentationML
///
/// This module provides the OPC package layer, editable XML part trees and
/// the presentation model the slide copier works on.
pub mod ooxml;

// Re-export commonly used types for convenience
pub use ooxml::error::{OoxmlError, Result};
pub use ooxml::pptx::copier::{copy_layouts, copy_slide, copy_slides};
pub use ooxml::pptx::{CopiedSlide, CopyDiagnostic, CopyOptions, LayoutMap, Package, ShapeFailurePolicy, SlideCopier};

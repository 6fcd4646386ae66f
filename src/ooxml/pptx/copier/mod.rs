//! Copying slides between presentations.
//!
//! A copied slide keeps its look: its layout, the layout's slide master and
//! the master's theme come along, together with the images and links they
//! use. Nothing is duplicated needlessly:
//!
//! - a source master whose theme is byte-identical to a target master's is
//!   replaced by that target master, and its layouts by the target layouts of
//!   the same name
//! - a master, layout, theme or media part is copied at most once per
//!   operation
//! - images are matched by content against those already in the target
//!
//! Id lists of the target (`sldMasterIdLst`, `sldLayoutIdLst`, `sldIdLst`)
//! are rebuilt from relationships after every structural change, and every
//! relationship reference inside copied content is rewritten to the rIds of
//! its new owner.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pptx_slide_copier::ooxml::pptx::Package;
//! use pptx_slide_copier::ooxml::pptx::copier;
//!
//! let source = Package::open("quarterly.pptx")?;
//! let mut target = Package::open("summary.pptx")?;
//!
//! // Every slide, in order
//! let copied = copier::copy_slides(&source, &mut target, None)?;
//! for slide in &copied {
//!     for diagnostic in &slide.diagnostics {
//!         eprintln!("{}: {}", slide.slide, diagnostic);
//!     }
//! }
//! target.save("summary.pptx")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod layout;
mod master;
mod options;
mod rels;
mod slide;
mod theme;


pub use options::{CopyOptions, ShapeFailurePolicy};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::PackURI;
use crate::ooxml::pptx::Package;
use std::collections::HashMap;
use std::fmt;

/// Layout name to the target layout resolved for it.
pub type LayoutMap = HashMap<String, PackURI>;

/// Something a slide copy left out or could not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyDiagnostic {
    /// A top-level shape was not copied
    ShapeSkipped {
        /// Position among the source slide's shapes
        index: usize,
        /// Qualified element name, e.g. "p:graphicFrame"
        element: String,
        reason: String,
    },
    /// A click or hover action was removed from a copied shape
    ActionRemoved {
        /// Position among the source slide's shapes
        index: usize,
        /// Qualified name of the removed element, e.g. "a:hlinkClick"
        element: String,
        reason: String,
    },
    /// The slide's own background was not copied
    BackgroundSkipped { reason: String },
    /// The target kept its slide size
    SlideSizeNotCopied { reason: String },
}

impl fmt::Display for CopyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyDiagnostic::ShapeSkipped {
                index,
                element,
                reason,
            } => write!(f, "shape {} ({}) skipped: {}", index, element, reason),
            CopyDiagnostic::ActionRemoved {
                index,
                element,
                reason,
            } => write!(f, "shape {} lost its {}: {}", index, element, reason),
            CopyDiagnostic::BackgroundSkipped { reason } => write!(f, "background skipped: {}", reason),
            CopyDiagnostic::SlideSizeNotCopied { reason } => {
                write!(f, "slide size not copied: {}", reason)
            },
        }
    }
}

/// A slide created in the target package.
#[derive(Debug, Clone)]
pub struct CopiedSlide {
    /// Partname of the new slide
    pub slide: PackURI,
    /// Partname of the target layout it is based on
    pub layout: PackURI,
    /// What the copy left out, empty when the slide was copied in full
    pub diagnostics: Vec<CopyDiagnostic>,
}

impl CopiedSlide {
    /// Whether every shape and the background made it over.
    ///
    /// Removed actions do not count: the shape itself was copied.
    pub fn is_complete(&self) -> bool {
        !self.diagnostics.iter().any(|d| {
            matches!(
                d,
                CopyDiagnostic::ShapeSkipped { .. } | CopyDiagnostic::BackgroundSkipped { .. }
            )
        })
    }
}

/// Copies slides out of one source presentation.
///
/// # Examples
///
/// ```rust,no_run
/// use pptx_slide_copier::ooxml::pptx::Package;
/// use pptx_slide_copier::ooxml::pptx::copier::{CopyOptions, ShapeFailurePolicy, SlideCopier};
///
/// let source = Package::open("deck.pptx")?;
/// let mut target = Package::new()?;
///
/// let copier = SlideCopier::new(&source).with_options(
///     CopyOptions::new().with_shape_failure_policy(ShapeFailurePolicy::Abort),
/// );
/// let layouts = copier.copy_layouts(&mut target)?;
/// copier.copy_slide(2, &mut target, Some(&layouts))?;
/// copier.copy_slide(0, &mut target, Some(&layouts))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct SlideCopier<'a> {
    source: &'a Package,
    options: CopyOptions,
}

impl<'a> SlideCopier<'a> {
    /// Create a copier with default options.
    pub fn new(source: &'a Package) -> Self {
        Self {
            source,
            options: CopyOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Resolve every source layout in the target, returning them by name.
    ///
    /// Running it again against the same target creates nothing new.
    pub fn copy_layouts(&self, target: &mut Package) -> Result<LayoutMap> {
        layout::copy_layouts(self.source, target)
    }

    /// Copy the slide at `index` to the end of the target.
    ///
    /// With a layout map the slide's layout is looked up by name; without
    /// one its layout chain is resolved on demand.
    pub fn copy_slide(
        &self,
        index: usize,
        target: &mut Package,
        layout_map: Option<&LayoutMap>,
    ) -> Result<CopiedSlide> {
        slide::copy_slide(self.source, index, target, layout_map, &self.options)
    }

    /// Copy several slides, all of them in order when `indices` is None.
    ///
    /// Indices are checked before the target is touched; layouts are
    /// resolved once for the whole batch.
    pub fn copy_slides(&self, target: &mut Package, indices: Option<&[usize]>) -> Result<Vec<CopiedSlide>> {
        let len = self.source.slide_count()?;
        let indices: Vec<usize> = match indices {
            Some(indices) => indices.to_vec(),
            None => (0..len).collect(),
        };
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(OoxmlError::IndexOutOfRange { index, len });
        }

        let layout_map = self.copy_layouts(target)?;
        indices
            .into_iter()
            .map(|index| self.copy_slide(index, target, Some(&layout_map)))
            .collect()
    }
}

/// Resolve every source layout in the target, returning them by name.
pub fn copy_layouts(source: &Package, target: &mut Package) -> Result<LayoutMap> {
    SlideCopier::new(source).copy_layouts(target)
}

/// Copy one slide with default options.
pub fn copy_slide(
    source: &Package,
    index: usize,
    target: &mut Package,
    layout_map: Option<&LayoutMap>,
) -> Result<CopiedSlide> {
    SlideCopier::new(source).copy_slide(index, target, layout_map)
}

/// Copy several slides with default options.
pub fn copy_slides(source: &Package, target: &mut Package, indices: Option<&[usize]>) -> Result<Vec<CopiedSlide>> {
    SlideCopier::new(source).copy_slides(target, indices)
}

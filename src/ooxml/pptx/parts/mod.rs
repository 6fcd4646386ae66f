/// Parts for PowerPoint presentation documents.
///
/// This module contains read-only wrapper types over the XML parts of a .pptx
/// package, plus the id-list helpers used to keep their structural lists
/// consistent.
pub mod id_list;
pub mod presentation;
pub mod slide;

pub use presentation::PresentationPart;
pub use slide::{SlideLayoutPart, SlideMasterPart, SlidePart};

//! Owned XML content trees for OOXML parts.
//!
//! - [`XmlElement`] / [`XmlNode`]: a parsed tree that can be cloned, edited and serialized
//! - [`NamespaceScope`]: prefix resolution through in-scope `xmlns` declarations

pub mod element;
pub mod namespace;

pub use element::{Descendants, XML_DECLARATION, XmlElement, XmlNode};
pub use namespace::{NamespaceScope, split_qname};

//! In-scope namespace tracking for owned XML trees.
//!
//! OOXML producers are free to bind any prefix to a namespace, so attribute
//! lookups that care about a namespace (such as relationship references in
//! `http://schemas.openxmlformats.org/officeDocument/2006/relationships`)
//! must resolve prefixes through the `xmlns` declarations in scope rather
//! than match a literal `r:` prefix.

use super::element::XmlElement;

/// The `xml` prefix is bound by definition and never declared.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A stack of namespace bindings following a tree walk.
///
/// Call [`push`](Self::push) when entering an element and [`pop`](Self::pop)
/// when leaving it; [`resolve`](Self::resolve) answers with the innermost
/// binding of a prefix.
#[derive(Debug, Default, Clone)]
pub struct NamespaceScope {
    /// (prefix, uri) bindings, innermost last; the default namespace uses ""
    bindings: Vec<(String, String)>,
    /// Number of bindings contributed by each entered element
    frames: Vec<usize>,
}

impl NamespaceScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope holding the declarations of the given ancestors, outermost first.
    pub fn from_ancestors<'a, I>(ancestors: I) -> Self
    where
        I: IntoIterator<Item = &'a XmlElement>,
    {
        let mut scope = Self::new();
        for element in ancestors {
            scope.push(element);
        }
        scope
    }

    /// Enter an element, binding every namespace it declares.
    pub fn push(&mut self, element: &XmlElement) {
        let before = self.bindings.len();
        self.bindings.extend(
            element
                .namespace_decls()
                .map(|(prefix, uri)| (prefix.to_string(), uri.to_string())),
        );
        self.frames.push(self.bindings.len() - before);
    }

    /// Leave the innermost entered element.
    pub fn pop(&mut self) {
        if let Some(count) = self.frames.pop() {
            let keep = self.bindings.len() - count;
            self.bindings.truncate(keep);
        }
    }

    /// Resolve a prefix ("" for the default namespace) to its namespace URI.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Resolve the namespace of a qualified attribute name.
    ///
    /// Unprefixed attributes are in no namespace, so they resolve to None
    /// even when a default namespace is in scope.
    pub fn attribute_namespace(&self, qname: &str) -> Option<&str> {
        let (prefix, _) = qname.split_once(':')?;
        self.resolve(prefix)
    }
}

/// Split a qualified name into its optional prefix and local name.
#[inline]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::namespace as NS;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("r:embed"), (Some("r"), "embed"));
        assert_eq!(split_qname("name"), (None, "name"));
    }

    #[test]
    fn test_scope_resolves_innermost_binding() {
        let outer = XmlElement::parse(
            br#"<p:sld xmlns:p="urn:p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><x:inner xmlns:r="urn:other" xmlns:x="urn:x"/></p:sld>"#,
        )
        .unwrap();
        let inner = outer.elements().next().unwrap();

        let mut scope = NamespaceScope::new();
        scope.push(&outer);
        assert_eq!(scope.resolve("r"), Some(NS::OFC_RELATIONSHIPS));

        scope.push(inner);
        assert_eq!(scope.resolve("r"), Some("urn:other"));
        assert_eq!(scope.attribute_namespace("x:attr"), Some("urn:x"));

        scope.pop();
        assert_eq!(scope.resolve("r"), Some(NS::OFC_RELATIONSHIPS));
        assert_eq!(scope.resolve("x"), None);
        assert_eq!(scope.resolve("xml"), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_unprefixed_attributes_have_no_namespace() {
        let root = XmlElement::parse(br#"<root xmlns="urn:default" id="1"/>"#).unwrap();
        let scope = NamespaceScope::from_ancestors([&root]);
        assert_eq!(scope.resolve(""), Some("urn:default"));
        assert_eq!(scope.attribute_namespace("id"), None);
    }
}

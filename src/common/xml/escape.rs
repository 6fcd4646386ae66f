use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use std::borrow::Cow;

const SPECIAL_CHARS: [&str; 5] = ["&", "<", ">", "\"", "'"];
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(SPECIAL_CHARS)
        .expect("Failed to build XML escaper")
});

static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(ENTITIES)
        .expect("Failed to build XML unescaper")
});

/// Escape XML special characters for use in text or attribute values.
///
/// Borrows the input when nothing needs escaping.
///
/// # Examples
///
/// ```
/// use pptx_slide_copier::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("Title Slide"), "Title Slide");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if XML_ESCAPER.is_match(s) {
        Cow::Owned(XML_ESCAPER.replace_all(s, &ENTITIES))
    } else {
        Cow::Borrowed(s)
    }
}

/// Unescape the five predefined XML entities.
///
/// Character references and unknown entities are left unchanged.
///
/// # Examples
///
/// ```
/// use pptx_slide_copier::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("Q&amp;A"), "Q&A");
/// assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
/// assert_eq!(unescape_xml("&invalid;"), "&invalid;");
/// ```
#[inline]
pub fn unescape_xml(s: &str) -> Cow<'_, str> {
    if memchr::memchr(b'&', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(XML_UNESCAPER.replace_all(s, &SPECIAL_CHARS))
}

/// Slide parts and related types.
///
/// This module contains parts for slides, slide layouts, and slide masters.
use super::id_list::{self, SLIDE_LAYOUT_ID_LIST};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::part::Part;
use crate::ooxml::xml::XmlElement;

/// Children of `p:spTree` that describe the tree itself rather than a shape.
pub const SHAPE_TREE_PROPERTIES: [&str; 3] = ["nvGrpSpPr", "grpSpPr", "extLst"];

fn content_tree(part: &dyn Part) -> Result<&XmlElement> {
    part.element()
        .ok_or_else(|| OoxmlError::InvalidFormat(format!("{} is not an XML part", part.partname())))
}

/// `name` attribute of `p:cSld`, unescaped; empty when absent.
fn common_slide_name(root: &XmlElement) -> String {
    root.child("cSld")
        .and_then(|c_sld| c_sld.attr_unescaped("name"))
        .unwrap_or_default()
}

/// A slide part.
///
/// Corresponds to `/ppt/slides/slideN.xml` in the package.
pub struct SlidePart<'a> {
    /// The underlying OPC part
    part: &'a dyn Part,
    element: &'a XmlElement,
}

impl<'a> SlidePart<'a> {
    /// Create a SlidePart from an OPC Part.
    pub fn from_part(part: &'a dyn Part) -> Result<Self> {
        Ok(Self {
            part,
            element: content_tree(part)?,
        })
    }

    /// Get the slide name.
    ///
    /// Returns the name attribute from the <p:cSld> element.
    pub fn name(&self) -> String {
        common_slide_name(self.element)
    }

    /// Get the underlying OPC part.
    #[inline]
    pub fn part(&self) -> &'a dyn Part {
        self.part
    }

    /// The root `p:sld` element.
    #[inline]
    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    /// The `p:cSld/p:spTree` element.
    pub fn shape_tree(&self) -> Result<&'a XmlElement> {
        self.element.find(&["cSld", "spTree"]).ok_or_else(|| {
            OoxmlError::InvalidFormat(format!("{} has no shape tree", self.part.partname()))
        })
    }

    /// Top-level shape elements of the shape tree, in document order.
    ///
    /// Group, graphic frame, connector and `mc:AlternateContent` nodes all
    /// count as shapes; the tree's own properties and extension list do not.
    pub fn shapes(&self) -> Result<Vec<&'a XmlElement>> {
        Ok(self
            .shape_tree()?
            .elements()
            .filter(|e| !SHAPE_TREE_PROPERTIES.contains(&e.local_name()))
            .collect())
    }

    /// The `p:cSld/p:bg` element, if the slide overrides its background.
    pub fn background(&self) -> Option<&'a XmlElement> {
        self.element.find(&["cSld", "bg"])
    }

    /// The `p:clrMapOvr` element, if present.
    pub fn color_map_override(&self) -> Option<&'a XmlElement> {
        self.element.child("clrMapOvr")
    }
}

/// A slide layout part.
///
/// Corresponds to `/ppt/slideLayouts/slideLayoutN.xml` in the package.
pub struct SlideLayoutPart<'a> {
    part: &'a dyn Part,
    element: &'a XmlElement,
}

impl<'a> SlideLayoutPart<'a> {
    /// Create a SlideLayoutPart from an OPC Part.
    pub fn from_part(part: &'a dyn Part) -> Result<Self> {
        Ok(Self {
            part,
            element: content_tree(part)?,
        })
    }

    /// Get the layout name, e.g. "Title Slide".
    pub fn name(&self) -> String {
        common_slide_name(self.element)
    }

    #[inline]
    pub fn part(&self) -> &'a dyn Part {
        self.part
    }
}

/// A slide master part.
///
/// Corresponds to `/ppt/slideMasters/slideMasterN.xml` in the package.
pub struct SlideMasterPart<'a> {
    part: &'a dyn Part,
    element: &'a XmlElement,
}

impl<'a> SlideMasterPart<'a> {
    /// Create a SlideMasterPart from an OPC Part.
    pub fn from_part(part: &'a dyn Part) -> Result<Self> {
        Ok(Self {
            part,
            element: content_tree(part)?,
        })
    }

    /// Get the master name.
    pub fn name(&self) -> String {
        common_slide_name(self.element)
    }

    /// Get the rIds listed in `<p:sldLayoutIdLst>`, in order.
    pub fn slide_layout_rids(&self) -> Vec<String> {
        id_list::r_ids(self.element, &SLIDE_LAYOUT_ID_LIST)
    }

    /// Highest layout id listed.
    pub fn max_layout_id(&self) -> Option<u32> {
        id_list::max_id(self.element, &SLIDE_LAYOUT_ID_LIST)
    }

    #[inline]
    pub fn part(&self) -> &'a dyn Part {
        self.part
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::opc::{BlobPart, PackURI, XmlPart};

    const SLIDE: &str = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Intro &amp; Agenda"><p:bg><p:bgRef idx="1001"/></p:bg><p:spTree>
<p:nvGrpSpPr/><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/></p:nvSpPr></p:sp>
<p:grpSp/><p:graphicFrame/>
<p:extLst/></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#;

    #[test]
    fn test_slide_accessors() {
        let part = XmlPart::load(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            SLIDE.as_bytes(),
        )
        .unwrap();
        let slide = SlidePart::from_part(&part).unwrap();

        assert_eq!(slide.name(), "Intro & Agenda");
        let shapes: Vec<_> = slide.shapes().unwrap().iter().map(|e| e.local_name()).collect();
        assert_eq!(shapes, ["sp", "grpSp", "graphicFrame"]);
        assert!(slide.background().is_some());
        assert!(slide.color_map_override().is_some());
    }

    #[test]
    fn test_blob_part_rejected() {
        let part = BlobPart::new(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            SLIDE.as_bytes().to_vec(),
        );
        assert!(SlidePart::from_part(&part).is_err());
    }

    #[test]
    fn test_master_layout_rids() {
        let part = XmlPart::load(
            PackURI::new("/ppt/slideMasters/slideMaster1.xml").unwrap(),
            ct::PML_SLIDE_MASTER.to_string(),
            br#"<p:sldMaster xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:cSld/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId2"/><p:sldLayoutId id="2147483650" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
        )
        .unwrap();
        let master = SlideMasterPart::from_part(&part).unwrap();
        assert_eq!(master.slide_layout_rids(), ["rId2", "rId1"]);
        assert_eq!(master.max_layout_id(), Some(2_147_483_650));
        assert_eq!(master.name(), "");
    }
}

/// Presentation part - the main part in a .pptx package.
///
/// Corresponds to `/ppt/presentation.xml` in the package.
use super::id_list::{self, SLIDE_ID_LIST, SLIDE_MASTER_ID_LIST};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::part::Part;
use crate::ooxml::xml::XmlElement;

/// The main presentation part.
///
/// This part holds the ordered slide master and slide lists and the slide
/// size.
///
/// # Example
///
/// ```rust,ignore
/// let pres_part = PresentationPart::from_part(opc_part)?;
/// let slide_count = pres_part.slide_count();
/// ```
pub struct PresentationPart<'a> {
    /// The underlying OPC part
    part: &'a dyn Part,
    /// Its parsed content tree
    element: &'a XmlElement,
}

impl<'a> PresentationPart<'a> {
    /// Create a PresentationPart from an OPC Part.
    ///
    /// Fails when the part carries no parsed content tree.
    pub fn from_part(part: &'a dyn Part) -> Result<Self> {
        let element = part.element().ok_or_else(|| {
            OoxmlError::InvalidFormat(format!("{} is not an XML part", part.partname()))
        })?;
        Ok(Self { part, element })
    }

    /// Get the underlying OPC part.
    #[inline]
    pub fn part(&self) -> &'a dyn Part {
        self.part
    }

    /// rIds of the slides, in presentation order.
    pub fn slide_rids(&self) -> Vec<String> {
        id_list::r_ids(self.element, &SLIDE_ID_LIST)
    }

    /// Get the number of slides in the presentation.
    ///
    /// This counts the `<p:sldId>` entries of `<p:sldIdLst>`.
    pub fn slide_count(&self) -> usize {
        id_list::entries(self.element, &SLIDE_ID_LIST).len()
    }

    /// rIds of the slide masters, in presentation order.
    pub fn master_rids(&self) -> Vec<String> {
        id_list::r_ids(self.element, &SLIDE_MASTER_ID_LIST)
    }

    /// Highest slide id in use.
    pub fn max_slide_id(&self) -> Option<u32> {
        id_list::max_id(self.element, &SLIDE_ID_LIST)
    }

    /// Highest slide master id in use.
    pub fn max_master_id(&self) -> Option<u32> {
        id_list::max_id(self.element, &SLIDE_MASTER_ID_LIST)
    }

    /// Get the slide size `(cx, cy)` in EMUs.
    ///
    /// Returns None if `<p:sldSz>` is absent.
    pub fn slide_size(&self) -> Result<Option<(i64, i64)>> {
        let Some(sld_sz) = self.element.child("sldSz") else {
            return Ok(None);
        };
        let dimension = |name: &str| -> Result<i64> {
            let value = sld_sz
                .attr(name)
                .ok_or_else(|| OoxmlError::Xml(format!("sldSz has no {} attribute", name)))?;
            atoi_simd::parse::<i64, false, false>(value.as_bytes())
                .map_err(|_| OoxmlError::Xml(format!("Invalid slide {}: {}", name, value)))
        };
        Ok(Some((dimension("cx")?, dimension("cy")?)))
    }
}

/// Set the slide size on a presentation content tree.
///
/// The `type` attribute describes a preset size, so it is dropped when the
/// dimensions change.
pub fn set_slide_size(root: &mut XmlElement, cx: i64, cy: i64) {
    if root.child("sldSz").is_none() {
        let name = match root.prefix() {
            Some(prefix) => format!("{}:sldSz", prefix),
            None => "sldSz".to_string(),
        };
        root.insert_before(
            XmlElement::new(name).into(),
            &SLIDE_ID_LIST.successors[1..],
        );
    }

    if let Some(sld_sz) = root.child_mut("sldSz") {
        let unchanged = sld_sz.attr("cx") == Some(cx.to_string().as_str())
            && sld_sz.attr("cy") == Some(cy.to_string().as_str());
        if !unchanged {
            sld_sz.set_attr("cx", &cx.to_string());
            sld_sz.set_attr("cy", &cy.to_string());
            sld_sz.remove_attr("type");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;
    use crate::ooxml::opc::{PackURI, XmlPart};

    fn presentation(xml: &str) -> XmlPart {
        XmlPart::load(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            xml.as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_lists_and_size() {
        let part = presentation(
            r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="258" r:id="rId2"/></p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
        );
        let pres = PresentationPart::from_part(&part).unwrap();
        assert_eq!(pres.slide_rids(), ["rId3", "rId2"]);
        assert_eq!(pres.slide_count(), 2);
        assert_eq!(pres.master_rids(), ["rId1"]);
        assert_eq!(pres.max_slide_id(), Some(258));
        assert_eq!(pres.slide_size().unwrap(), Some((12_192_000, 6_858_000)));
    }

    #[test]
    fn test_missing_size() {
        let part = presentation(
            r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#,
        );
        let pres = PresentationPart::from_part(&part).unwrap();
        assert_eq!(pres.slide_size().unwrap(), None);
        assert_eq!(pres.slide_count(), 0);
    }

    #[test]
    fn test_set_slide_size() {
        let mut root = XmlElement::parse(
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst/><p:sldSz cx="9144000" cy="6858000" type="screen4x3"/><p:notesSz cx="1" cy="1"/></p:presentation>"#,
        )
        .unwrap();
        set_slide_size(&mut root, 12_192_000, 6_858_000);
        let sld_sz = root.child("sldSz").unwrap();
        assert_eq!(sld_sz.attr("cx"), Some("12192000"));
        assert_eq!(sld_sz.attr("type"), None);

        let mut bare = XmlElement::parse(
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst/><p:notesSz cx="1" cy="1"/></p:presentation>"#,
        )
        .unwrap();
        set_slide_size(&mut bare, 100, 200);
        let names: Vec<_> = bare.elements().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["p:sldIdLst", "p:sldSz", "p:notesSz"]);
    }
}

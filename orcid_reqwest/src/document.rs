//! Decoded XML documents

use std::borrow::Cow;

use xmltree::{Element, ParseError};

/// An XML document returned by the ORCID API
///
/// Holds both the parsed element tree and the raw text it was parsed from.
#[derive(Clone, Debug, PartialEq)]
pub struct XmlDocument {
    root: Element,
    text: String,
}

impl XmlDocument {
    /// Parses a document from its textual form
    pub fn parse(text: impl Into<String>) -> Result<Self, ParseError> {
        let text = text.into();
        let root = Element::parse(text.as_bytes())?;
        Ok(Self { root, text })
    }

    /// The root element
    #[inline]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The raw text of the document
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the document, returning the root element
    pub fn into_root(self) -> Element {
        self.root
    }

    /// Follows a path of child element names from the root and returns the
    /// text of the element found there
    ///
    /// Names are matched against local names, ignoring namespace prefixes.
    /// An empty path returns the text of the root element.
    pub fn find_text(&self, path: &[&str]) -> Option<Cow<'_, str>> {
        path.iter()
            .try_fold(&self.root, |el, name| el.get_child(*name))?
            .get_text()
    }
}

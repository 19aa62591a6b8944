//! Structural checks on a fetched vehicle file before it is allowed on disk.

use crate::error::InstallError;

pub const XML_DECL_PREFIX: &str = "<?xml";
pub const VEHICLE_ROOT: &str = "vehicle";

/// Accepts only a well-formed XML document whose root element is `<vehicle>`.
///
/// The declaration prefix is checked on the text with leading whitespace ignored and
/// before any parsing happens.
pub fn validate(text: &str) -> Result<(), InstallError> {
    if !text.trim_start().starts_with(XML_DECL_PREFIX) {
        return Err(InstallError::NotXml);
    }
    let root = parse_root(text)?;
    if root != VEHICLE_ROOT {
        return Err(InstallError::WrongRoot { found: root });
    }
    Ok(())
}

/// Parses the whole document and returns the name of its root element.
///
/// A namespaced root comes back as `{uri}name`, so it never equals a bare tag.
pub fn parse_root(text: &str) -> Result<String, InstallError> {
    // A declaration is only legal as the very first bytes of the document.
    if text.trim_start().starts_with(XML_DECL_PREFIX) && !text.starts_with(XML_DECL_PREFIX) {
        let at = text.len() - text.trim_start().len();
        return Err(InstallError::MalformedXml(format!(
            "XML declaration not at start of document (at byte {at})"
        )));
    }
    let document = roxmltree::Document::parse(text)
        .map_err(|err| InstallError::MalformedXml(err.to_string()))?;
    let tag = document.root_element().tag_name();
    Ok(match tag.namespace() {
        Some(uri) => format!("{{{uri}}}{}", tag.name()),
        None => tag.name().to_string(),
    })
}

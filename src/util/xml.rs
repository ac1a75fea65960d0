use quick_xml::events::{BytesCData, BytesStart, BytesText};
use quick_xml::Reader;

use crate::errors::Result;

/// A reader over an in-memory document with whitespace-only text trimmed.
pub(crate) fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

/// Unescaped content of a text node.
///
/// Only the predefined XML entities are expanded; DTD entity declarations
/// are never parsed.
pub(crate) fn text(e: &BytesText<'_>) -> Result<String> {
    Ok(e.unescape()?.into_owned())
}

pub(crate) fn cdata(e: &BytesCData<'_>) -> String {
    String::from_utf8_lossy(e).into_owned()
}

/// Element name without its namespace prefix.
pub(crate) fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}

/// Unescaped value of the attribute `name`; malformed attributes are skipped.
pub(crate) fn attr(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    name: &[u8],
) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed XML attribute");
                continue;
            }
        };
        if attr.key.as_ref() == name {
            let value = attr.decode_and_unescape_value(reader.decoder())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

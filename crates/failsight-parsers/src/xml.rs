//! Small helpers shared by the XML-based parsers.

use quick_xml::events::BytesStart;
use std::io::Read;
use std::path::Path;

/// Read an attribute value, tolerating absence and escape problems.
///
/// Parsers treat missing optional attributes as empty, so attribute-level
/// decode errors are deliberately swallowed here; structural errors still
/// surface through the event reader.
pub(crate) fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Read up to the first 4 KiB of a file for format probing.
pub(crate) fn read_probe_head(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut buf = vec![0u8; 4096];
    let n = file.read(&mut buf).ok()?;
    buf.truncate(n);
    Some(String::from_utf8_lossy(&buf).into_owned())
}

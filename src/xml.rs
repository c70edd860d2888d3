use std::io::Cursor;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Writer;

use crate::error::{Result, TaskError};

pub type XmlWriter = Writer<Cursor<Vec<u8>>>;

pub fn indented_writer(indent: usize) -> XmlWriter {
    Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent)
}

pub fn plain_writer() -> XmlWriter {
    Writer::new(Cursor::new(Vec::new()))
}

pub fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| TaskError::Xml(format!("write error: {e}")))
}

pub fn finish(writer: XmlWriter) -> Result<String> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| TaskError::Xml(format!("encoding error: {e}")))
}

/// Unescaped value of attribute `name`, if present.
pub fn attribute(element: &BytesStart<'_>, name: &str) -> std::result::Result<Option<String>, String> {
    match element.try_get_attribute(name) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|value| Some(value.into_owned()))
            .map_err(|e| e.to_string()),
        Ok(None) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

pub fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

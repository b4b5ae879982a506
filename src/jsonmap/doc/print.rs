//! Serializes a [`Document`] tree into a caller-provided byte buffer.
//!
//! Minified output carries no whitespace at all. Pretty output indents by
//! two spaces per level and breaks objects and arrays of containers across
//! lines, but keeps arrays made purely of leaf values on one line.

use core::fmt::{self, Write as _};

use crate::jsonmap::doc::{Document, NodeRef, Value};
use crate::jsonmap::error::Error;
use crate::jsonmap::types::Format;

/// Prints the tree under `root`, returning the number of bytes written.
pub(crate) fn print_document(
    doc: &Document<'_, '_>,
    root: NodeRef,
    out: &mut [u8],
    format: Format,
) -> Result<usize, Error> {
    let mut writer = Writer { out, pos: 0 };
    print_value(doc, root, &mut writer, format, 0)?;
    Ok(writer.pos)
}

struct Writer<'o> {
    out: &'o mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() > self.out.len() - self.pos {
            return Err(Error::BufferTooSmall);
        }
        self.out[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.put(&[byte])
    }
}

impl fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

fn print_value(
    doc: &Document<'_, '_>,
    node: NodeRef,
    writer: &mut Writer<'_>,
    format: Format,
    depth: usize,
) -> Result<(), Error> {
    match doc.value(node) {
        Value::Null => writer.put(b"null"),
        Value::Bool(true) => writer.put(b"true"),
        Value::Bool(false) => writer.put(b"false"),
        Value::Number(n) => print_number(writer, *n),
        Value::Str(s) => print_string(writer, s.as_str()),
        Value::Object(_) => print_object(doc, node, writer, format, depth),
        Value::Array(_) => print_array(doc, node, writer, format, depth),
    }
}

fn print_number(writer: &mut Writer<'_>, n: f64) -> Result<(), Error> {
    // JSON has no lexeme for NaN or infinities.
    if !n.is_finite() {
        return writer.put(b"null");
    }
    write!(writer, "{n}").map_err(|_| Error::BufferTooSmall)
}

fn print_string(writer: &mut Writer<'_>, s: &str) -> Result<(), Error> {
    writer.put_byte(b'"')?;
    for c in s.chars() {
        match c {
            '"' => writer.put(b"\\\"")?,
            '\\' => writer.put(b"\\\\")?,
            '\n' => writer.put(b"\\n")?,
            '\r' => writer.put(b"\\r")?,
            '\t' => writer.put(b"\\t")?,
            '\u{8}' => writer.put(b"\\b")?,
            '\u{c}' => writer.put(b"\\f")?,
            c if (c as u32) < 0x20 => {
                write!(writer, "\\u{:04x}", c as u32).map_err(|_| Error::BufferTooSmall)?;
            }
            c => {
                let mut utf8 = [0u8; 4];
                writer.put(c.encode_utf8(&mut utf8).as_bytes())?;
            }
        }
    }
    writer.put_byte(b'"')
}

fn print_object(
    doc: &Document<'_, '_>,
    node: NodeRef,
    writer: &mut Writer<'_>,
    format: Format,
    depth: usize,
) -> Result<(), Error> {
    if doc.child_count(node) == 0 {
        return writer.put(b"{}");
    }
    let pretty = format == Format::Pretty;
    writer.put_byte(b'{')?;
    let mut cursor = doc.first_child(node);
    let mut first = true;
    while let Some(member) = cursor {
        if !first {
            writer.put_byte(b',')?;
        }
        first = false;
        if pretty {
            newline_indent(writer, depth + 1)?;
        }
        print_string(writer, doc.key(member).unwrap_or(""))?;
        writer.put_byte(b':')?;
        if pretty {
            writer.put_byte(b' ')?;
        }
        print_value(doc, member, writer, format, depth + 1)?;
        cursor = doc.next(member);
    }
    if pretty {
        newline_indent(writer, depth)?;
    }
    writer.put_byte(b'}')
}

fn print_array(
    doc: &Document<'_, '_>,
    node: NodeRef,
    writer: &mut Writer<'_>,
    format: Format,
    depth: usize,
) -> Result<(), Error> {
    if doc.child_count(node) == 0 {
        return writer.put(b"[]");
    }
    let multiline = format == Format::Pretty && has_container_element(doc, node);
    writer.put_byte(b'[')?;
    let mut cursor = doc.first_child(node);
    let mut first = true;
    while let Some(element) = cursor {
        if !first {
            writer.put_byte(b',')?;
        }
        first = false;
        if multiline {
            newline_indent(writer, depth + 1)?;
        }
        print_value(doc, element, writer, format, depth + 1)?;
        cursor = doc.next(element);
    }
    if multiline {
        newline_indent(writer, depth)?;
    }
    writer.put_byte(b']')
}

fn has_container_element(doc: &Document<'_, '_>, node: NodeRef) -> bool {
    let mut cursor = doc.first_child(node);
    while let Some(element) = cursor {
        if matches!(doc.value(element), Value::Array(_) | Value::Object(_)) {
            return true;
        }
        cursor = doc.next(element);
    }
    false
}

fn newline_indent(writer: &mut Writer<'_>, depth: usize) -> Result<(), Error> {
    writer.put_byte(b'\n')?;
    for _ in 0..depth {
        writer.put(b"  ")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonmap::mem::MemoryContext;

    fn printed(
        build: impl FnOnce(&mut Document<'_, '_>) -> NodeRef,
        format: Format,
    ) -> heapless::String<256> {
        let mut buf = [0u8; 2048];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();
        let mut doc = Document::new(&mut mem);
        let root = build(&mut doc);
        doc.set_root(root);

        let mut out = [0u8; 256];
        let len = print_document(&doc, root, &mut out, format).unwrap();
        let mut text = heapless::String::new();
        text.push_str(core::str::from_utf8(&out[..len]).unwrap())
            .unwrap();
        text
    }

    fn sample(doc: &mut Document<'_, '_>) -> NodeRef {
        let obj = doc.create_object().unwrap();
        let name = doc.create_string("Adam").unwrap();
        doc.set_key(name, "name").unwrap();
        doc.attach(obj, name);
        let pos = doc.create_array().unwrap();
        for n in [12.0, 34.0] {
            let item = doc.create_number(n).unwrap();
            doc.attach(pos, item);
        }
        doc.set_key(pos, "position").unwrap();
        doc.attach(obj, pos);
        obj
    }

    #[test]
    fn minified_has_no_whitespace() {
        let text = printed(sample, Format::Minified);
        assert_eq!(text.as_str(), r#"{"name":"Adam","position":[12,34]}"#);
    }

    #[test]
    fn pretty_indents_and_inlines_leaf_arrays() {
        let text = printed(sample, Format::Pretty);
        assert_eq!(
            text.as_str(),
            "{\n  \"name\": \"Adam\",\n  \"position\": [12,34]\n}"
        );
    }

    #[test]
    fn pretty_breaks_arrays_of_objects() {
        let text = printed(
            |doc| {
                let arr = doc.create_array().unwrap();
                let inner = doc.create_object().unwrap();
                let x = doc.create_number(1.0).unwrap();
                doc.set_key(x, "x").unwrap();
                doc.attach(inner, x);
                doc.attach(arr, inner);
                arr
            },
            Format::Pretty,
        );
        assert_eq!(text.as_str(), "[\n  {\n    \"x\": 1\n  }\n]");
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        let text = printed(
            |doc| doc.create_number(42.0).unwrap(),
            Format::Minified,
        );
        assert_eq!(text.as_str(), "42");

        let text = printed(
            |doc| doc.create_number(-2.5).unwrap(),
            Format::Minified,
        );
        assert_eq!(text.as_str(), "-2.5");
    }

    #[test]
    fn non_finite_numbers_become_null() {
        let text = printed(|doc| doc.create_number(f64::NAN).unwrap(), Format::Minified);
        assert_eq!(text.as_str(), "null");
    }

    #[test]
    fn strings_are_escaped() {
        let text = printed(
            |doc| doc.create_string("a\"b\\c\nd\u{1}").unwrap(),
            Format::Minified,
        );
        assert_eq!(text.as_str(), r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn empty_containers_print_compact() {
        let text = printed(|doc| doc.create_object().unwrap(), Format::Pretty);
        assert_eq!(text.as_str(), "{}");
        let text = printed(|doc| doc.create_array().unwrap(), Format::Pretty);
        assert_eq!(text.as_str(), "[]");
    }

    #[test]
    fn overflowing_buffer_reports_too_small() {
        let mut buf = [0u8; 1024];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();
        let mut doc = Document::new(&mut mem);
        let root = sample(&mut doc);
        doc.set_root(root);

        let mut out = [0u8; 8];
        assert_eq!(
            print_document(&doc, root, &mut out, Format::Minified),
            Err(Error::BufferTooSmall)
        );
    }
}

//! Recursive-descent JSON parser producing a [`Document`] tree.
//!
//! Strings are decoded in two passes: a validating scan that also measures
//! the unescaped length, then a copy into a strategy-memory block of exactly
//! that size. Any syntax error deletes whatever partial subtree was built so
//! the strategy ends the call with no leaked blocks.

use crate::jsonmap::doc::{Bytes, Document, NodeRef};
use crate::jsonmap::error::Error;
use crate::jsonmap::mem::MemoryContext;

pub(crate) fn parse_document<'m, 'b>(
    mem: &'m mut MemoryContext<'b>,
    text: &str,
) -> Result<Document<'m, 'b>, Error> {
    let mut doc = Document::new(mem);
    let mut reader = Reader {
        bytes: text.as_bytes(),
        pos: 0,
    };
    reader.skip_ws();
    let root = parse_value(&mut reader, &mut doc)?;
    doc.set_root(root);
    reader.skip_ws();
    if reader.pos != reader.bytes.len() {
        log::debug!("trailing bytes after document at offset {}", reader.pos);
        return Err(Error::Malformed);
    }
    Ok(doc)
}

struct Reader<'t> {
    bytes: &'t [u8],
    pos: usize,
}

impl Reader<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), Error> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(Error::Malformed)
        }
    }

    fn expect_word(&mut self, word: &[u8]) -> Result<(), Error> {
        if self.bytes[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(Error::Malformed)
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }
}

fn parse_value(reader: &mut Reader<'_>, doc: &mut Document<'_, '_>) -> Result<NodeRef, Error> {
    match reader.peek().ok_or(Error::Malformed)? {
        b'{' => parse_object(reader, doc),
        b'[' => parse_array(reader, doc),
        b'"' => {
            let bytes = parse_string(reader, doc)?;
            doc.create_string_from(bytes)
        }
        b't' => {
            reader.expect_word(b"true")?;
            doc.create_bool(true)
        }
        b'f' => {
            reader.expect_word(b"false")?;
            doc.create_bool(false)
        }
        b'n' => {
            reader.expect_word(b"null")?;
            doc.create_null()
        }
        b'-' | b'0'..=b'9' => parse_number(reader, doc),
        _ => Err(Error::Malformed),
    }
}

fn parse_object(reader: &mut Reader<'_>, doc: &mut Document<'_, '_>) -> Result<NodeRef, Error> {
    let obj = doc.create_object()?;
    match parse_object_body(reader, doc, obj) {
        Ok(()) => Ok(obj),
        Err(e) => {
            doc.delete(obj);
            Err(e)
        }
    }
}

fn parse_object_body(
    reader: &mut Reader<'_>,
    doc: &mut Document<'_, '_>,
    obj: NodeRef,
) -> Result<(), Error> {
    reader.expect(b'{')?;
    reader.skip_ws();
    if reader.eat(b'}') {
        return Ok(());
    }
    loop {
        if reader.peek() != Some(b'"') {
            return Err(Error::Malformed);
        }
        let key = parse_string(reader, doc)?;
        reader.skip_ws();
        if let Err(e) = reader.expect(b':') {
            doc.release_bytes(key);
            return Err(e);
        }
        reader.skip_ws();
        let member = match parse_value(reader, doc) {
            Ok(member) => member,
            Err(e) => {
                doc.release_bytes(key);
                return Err(e);
            }
        };
        doc.set_key_bytes(member, key);
        doc.attach(obj, member);
        reader.skip_ws();
        if reader.eat(b',') {
            reader.skip_ws();
            continue;
        }
        return reader.expect(b'}');
    }
}

fn parse_array(reader: &mut Reader<'_>, doc: &mut Document<'_, '_>) -> Result<NodeRef, Error> {
    let arr = doc.create_array()?;
    match parse_array_body(reader, doc, arr) {
        Ok(()) => Ok(arr),
        Err(e) => {
            doc.delete(arr);
            Err(e)
        }
    }
}

fn parse_array_body(
    reader: &mut Reader<'_>,
    doc: &mut Document<'_, '_>,
    arr: NodeRef,
) -> Result<(), Error> {
    reader.expect(b'[')?;
    reader.skip_ws();
    if reader.eat(b']') {
        return Ok(());
    }
    loop {
        let element = parse_value(reader, doc)?;
        doc.attach(arr, element);
        reader.skip_ws();
        if reader.eat(b',') {
            reader.skip_ws();
            continue;
        }
        return reader.expect(b']');
    }
}

fn parse_number(reader: &mut Reader<'_>, doc: &mut Document<'_, '_>) -> Result<NodeRef, Error> {
    let start = reader.pos;
    let _ = reader.eat(b'-');
    while matches!(
        reader.peek(),
        Some(b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
    ) {
        reader.pos += 1;
    }
    let token =
        core::str::from_utf8(&reader.bytes[start..reader.pos]).map_err(|_| Error::Malformed)?;
    let value: f64 = token.parse().map_err(|_| Error::Malformed)?;
    doc.create_number(value)
}

/// Parses a quoted string, leaving the reader past the closing quote and
/// returning the decoded contents in strategy memory.
fn parse_string(reader: &mut Reader<'_>, doc: &mut Document<'_, '_>) -> Result<Bytes, Error> {
    reader.expect(b'"')?;
    let start = reader.pos;
    let (end, decoded_len) = scan_string(reader.bytes, start)?;
    let mut bytes = doc.alloc_bytes(decoded_len)?;
    decode_string(&reader.bytes[start..end], bytes.as_mut_slice());
    reader.pos = end + 1;
    Ok(bytes)
}

/// Validates the raw span of a string and measures its decoded length.
/// Returns the index of the closing quote.
fn scan_string(bytes: &[u8], mut pos: usize) -> Result<(usize, usize), Error> {
    let mut out = 0usize;
    loop {
        let b = *bytes.get(pos).ok_or(Error::Malformed)?;
        match b {
            b'"' => return Ok((pos, out)),
            b'\\' => {
                pos += 1;
                let escape = *bytes.get(pos).ok_or(Error::Malformed)?;
                match escape {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {
                        out += 1;
                        pos += 1;
                    }
                    b'u' => {
                        let (cp, consumed) = scan_unicode(bytes, pos + 1)?;
                        out += utf8_len(cp);
                        pos += 1 + consumed;
                    }
                    _ => return Err(Error::Malformed),
                }
            }
            // Unescaped control characters are not valid JSON.
            0x00..=0x1F => return Err(Error::Malformed),
            _ => {
                out += 1;
                pos += 1;
            }
        }
    }
}

/// Reads the hex digits of a `\u` escape at `pos`, combining surrogate
/// pairs. Returns the code point and the number of bytes consumed.
fn scan_unicode(bytes: &[u8], pos: usize) -> Result<(u32, usize), Error> {
    let high = hex4(bytes, pos)?;
    if (0xDC00..=0xDFFF).contains(&high) {
        return Err(Error::Malformed);
    }
    if (0xD800..=0xDBFF).contains(&high) {
        if bytes.get(pos + 4) != Some(&b'\\') || bytes.get(pos + 5) != Some(&b'u') {
            return Err(Error::Malformed);
        }
        let low = hex4(bytes, pos + 6)?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(Error::Malformed);
        }
        let cp = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return Ok((cp, 10));
    }
    Ok((high, 4))
}

fn hex4(bytes: &[u8], pos: usize) -> Result<u32, Error> {
    let mut value = 0u32;
    for i in 0..4 {
        let digit = match bytes.get(pos + i) {
            Some(b @ b'0'..=b'9') => u32::from(b - b'0'),
            Some(b @ b'a'..=b'f') => u32::from(b - b'a') + 10,
            Some(b @ b'A'..=b'F') => u32::from(b - b'A') + 10,
            _ => return Err(Error::Malformed),
        };
        value = value << 4 | digit;
    }
    Ok(value)
}

fn utf8_len(cp: u32) -> usize {
    match cp {
        0..=0x7F => 1,
        0x80..=0x7FF => 2,
        0x800..=0xFFFF => 3,
        _ => 4,
    }
}

/// Copies the already-validated raw span into `out`, resolving escapes.
fn decode_string(src: &[u8], out: &mut [u8]) {
    let mut pos = 0;
    let mut at = 0;
    while pos < src.len() {
        let b = src[pos];
        if b != b'\\' {
            out[at] = b;
            at += 1;
            pos += 1;
            continue;
        }
        pos += 1;
        let escape = src[pos];
        pos += 1;
        let literal = match escape {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            _ => {
                // A `\u` escape; the scan already validated it.
                let (cp, consumed) = scan_unicode(src, pos).unwrap_or((0xFFFD, 4));
                pos += consumed;
                let c = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut utf8 = [0u8; 4];
                let encoded = c.encode_utf8(&mut utf8);
                out[at..at + encoded.len()].copy_from_slice(encoded.as_bytes());
                at += encoded.len();
                continue;
            }
        };
        out[at] = literal;
        at += 1;
    }
    debug_assert_eq!(at, out.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonmap::doc::Value;

    fn with_doc<R>(text: &str, f: impl FnOnce(Result<Document<'_, '_>, Error>) -> R) -> R {
        let mut buf = [0u8; 2048];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();
        f(parse_document(&mut mem, text))
    }

    #[test_log::test]
    fn parses_a_nested_object() {
        with_doc(
            r#"{"name":"Adam","tags":["a","b"],"meta":{"ok":true}}"#,
            |doc| {
                let doc = doc.unwrap();
                let root = doc.root().unwrap();
                assert_eq!(doc.child_count(root), 3);

                let name = doc.lookup(root, "name").unwrap();
                assert!(matches!(doc.value(name), Value::Str(s) if s.as_str() == "Adam"));

                let tags = doc.lookup(root, "tags").unwrap();
                assert_eq!(doc.child_count(tags), 2);

                let meta = doc.lookup(root, "meta").unwrap();
                let ok = doc.lookup(meta, "ok").unwrap();
                assert!(matches!(doc.value(ok), Value::Bool(true)));
            },
        );
    }

    #[test]
    fn parses_scalars_and_literals() {
        with_doc(r#"[null,true,false,-12.5,1e3]"#, |doc| {
            let doc = doc.unwrap();
            let root = doc.root().unwrap();
            let mut cursor = doc.first_child(root);
            let mut seen = 0;
            while let Some(node) = cursor {
                match (seen, doc.value(node)) {
                    (0, Value::Null) => {}
                    (1, Value::Bool(true)) => {}
                    (2, Value::Bool(false)) => {}
                    (3, Value::Number(n)) if *n == -12.5 => {}
                    (4, Value::Number(n)) if *n == 1000.0 => {}
                    _ => panic!("unexpected element {seen}"),
                }
                seen += 1;
                cursor = doc.next(node);
            }
            assert_eq!(seen, 5);
        });
    }

    #[test]
    fn decodes_escapes_and_surrogate_pairs() {
        with_doc(r#""a\"b\\c\nd\u00e9\ud83d\ude00""#, |doc| {
            let doc = doc.unwrap();
            let root = doc.root().unwrap();
            assert!(matches!(
                doc.value(root),
                Value::Str(s) if s.as_str() == "a\"b\\c\ndé😀"
            ));
        });
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        with_doc(" \t\r\n {\"x\": 1} \n", |doc| {
            assert!(doc.is_ok());
        });
    }

    #[test_log::test]
    fn rejects_malformed_input() {
        for text in [
            "",
            "{",
            "[1,",
            "{\"a\":}",
            "{\"a\" 1}",
            "{'a':1}",
            "tru",
            "+5",
            "1.2.3",
            "\"unterminated",
            "\"bad \u{1} control\"",
            "\"\\q\"",
            "\"\\ud800\"",
            "{} trailing",
        ] {
            with_doc(text, |doc| {
                assert!(
                    matches!(doc.map(|_| ()), Err(Error::Malformed)),
                    "accepted {text:?}"
                );
            });
        }
    }

    #[test]
    fn error_paths_release_partial_trees() {
        let mut buf = [0u8; 1024];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();
        assert!(parse_document(&mut mem, r#"{"a":[1,2,{"b":"text"}],"c""#).is_err());

        // Everything the failed parse allocated came back.
        mem.acquire(960).unwrap();
    }
}

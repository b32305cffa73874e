//! PHP `serialize()` codec
//!
//! PEAR keeps its per-environment configuration (`etc/pear.conf`) as the
//! output of PHP's `serialize()`: a nested array of arrays of scalars,
//! usually preceded by a `#PEAR_Config 0.9` header line. This module parses
//! that format into a [`Value`] tree and writes it back.
//!
//! ## Value model
//!
//! PHP arrays are ordered maps. An array whose keys are exactly `0..n` in
//! order is decoded as a [`Value::Sequence`]; every other array is a
//! [`Value::Mapping`] with its keys kept in file order. Both encode back to the
//! same bytes they were decoded from.
//!
//! ## Supported tokens
//!
//! | Token              | Meaning            |
//! |--------------------|--------------------|
//! | `N;`               | null               |
//! | `b:0;` / `b:1;`    | boolean            |
//! | `i:<int>;`         | integer            |
//! | `d:<float>;`       | float (lexical)    |
//! | `s:<len>:"...";`   | byte string        |
//! | `a:<n>:{...}`      | array              |
//!
//! Objects (`O:`, `C:`), enums (`E:`) and references (`r:`, `R:`) never
//! appear in PEAR configuration and are rejected as corrupt.
//!
//! String lengths are byte counts, so they are recomputed on encode. This is
//! what keeps the file valid after a path inside it changes length.

use std::io::Write;

use crate::error::{Error, Result};

/// Arrays nested deeper than this are rejected instead of overflowing the
/// stack.
pub const MAX_DEPTH: usize = 256;

/// A decoded serialized value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Float kept in its lexical form (`0.5`, `1.0E+25`, `INF`) so that
    /// re-encoding reproduces the original bytes.
    Float(String),
    String(Vec<u8>),
    Sequence(Vec<Value>),
    Mapping(Vec<(Key, Value)>),
}

/// An array key. PHP only allows integers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    String(Vec<u8>),
}

impl Key {
    /// Build a string key from text.
    pub fn str(key: &str) -> Self {
        Key::String(key.as_bytes().to_vec())
    }
}

impl Value {
    /// Build a string value from text.
    pub fn str(value: &str) -> Self {
        Value::String(value.as_bytes().to_vec())
    }

    /// Borrow the bytes of a string value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Look up a mapping entry by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Key::String(s) if s == key.as_bytes()))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A whole serialized configuration file.
///
/// `header` holds an optional leading `#`-comment line (newline included)
/// and `trailer` any whitespace after the value. Both are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: Option<Vec<u8>>,
    pub value: Value,
    pub trailer: Vec<u8>,
}

impl Document {
    /// Parse a configuration file's bytes.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let (header, body_start) = if input.first() == Some(&b'#') {
            match input.iter().position(|&b| b == b'\n') {
                Some(end) => (Some(input[..=end].to_vec()), end + 1),
                None => {
                    return Err(Error::Serialized {
                        offset: input.len(),
                        message: "header line is not followed by serialized data".to_string(),
                    })
                }
            }
        } else {
            (None, 0)
        };

        let mut parser = Parser {
            input,
            pos: body_start,
        };
        let value = parser.value(0)?;

        let trailer = &input[parser.pos..];
        if !trailer.iter().all(u8::is_ascii_whitespace) {
            return Err(parser.error("unexpected data after serialized value"));
        }

        Ok(Self {
            header,
            value,
            trailer: trailer.to_vec(),
        })
    }

    /// Encode the document back to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(header) = &self.header {
            out.extend_from_slice(header);
        }
        encode_into(&self.value, &mut out);
        out.extend_from_slice(&self.trailer);
        out
    }
}

/// Decode a single serialized value with no header or trailer.
pub fn decode(input: &[u8]) -> Result<Value> {
    let mut parser = Parser { input, pos: 0 };
    let value = parser.value(0)?;
    if parser.pos != input.len() {
        return Err(parser.error("unexpected data after serialized value"));
    }
    Ok(value)
}

/// Encode a single value.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    // Writes into a Vec<u8> cannot fail.
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(b) => {
            let _ = write!(out, "b:{};", u8::from(*b));
        }
        Value::Int(i) => {
            let _ = write!(out, "i:{};", i);
        }
        Value::Float(text) => {
            let _ = write!(out, "d:{};", text);
        }
        Value::String(bytes) => encode_string(bytes, out),
        Value::Sequence(items) => {
            let _ = write!(out, "a:{}:{{", items.len());
            for (index, item) in items.iter().enumerate() {
                let _ = write!(out, "i:{};", index);
                encode_into(item, out);
            }
            out.push(b'}');
        }
        Value::Mapping(entries) => {
            let _ = write!(out, "a:{}:{{", entries.len());
            for (key, item) in entries {
                match key {
                    Key::Int(i) => {
                        let _ = write!(out, "i:{};", i);
                    }
                    Key::String(bytes) => encode_string(bytes, out),
                }
                encode_into(item, out);
            }
            out.push(b'}');
        }
    }
}

fn encode_string(bytes: &[u8], out: &mut Vec<u8>) {
    let _ = write!(out, "s:{}:\"", bytes.len());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\";");
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> Error {
        Error::Serialized {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(&format!(
                "expected '{}', found '{}'",
                byte as char,
                b.escape_ascii()
            ))),
            None => Err(self.error(&format!(
                "expected '{}', found end of data",
                byte as char
            ))),
        }
    }

    /// Read bytes up to (not including) `end`, consuming the terminator.
    fn until(&mut self, end: u8) -> Result<&'a [u8]> {
        let start = self.pos;
        match self.input[start..].iter().position(|&b| b == end) {
            Some(len) => {
                self.pos = start + len + 1;
                Ok(&self.input[start..start + len])
            }
            None => Err(self.error(&format!("missing '{}'", end as char))),
        }
    }

    fn integer(&mut self, end: u8) -> Result<i64> {
        let start = self.pos;
        let raw = self.until(end)?;
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| Error::Serialized {
                offset: start,
                message: format!("invalid integer '{}'", raw.escape_ascii()),
            })
    }

    fn length(&mut self, end: u8) -> Result<usize> {
        let start = self.pos;
        let n = self.integer(end)?;
        usize::try_from(n).map_err(|_| Error::Serialized {
            offset: start,
            message: format!("negative length {}", n),
        })
    }

    fn string_body(&mut self) -> Result<Vec<u8>> {
        let len = self.length(b':')?;
        self.expect(b'"')?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error(&format!("string length {} runs past end of data", len)))?;
        let bytes = self.input[self.pos..end].to_vec();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(bytes)
    }

    fn tag(&mut self) -> Result<u8> {
        let tag = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of data"))?;
        self.pos += 1;
        Ok(tag)
    }

    fn key(&mut self) -> Result<Key> {
        let start = self.pos;
        match self.tag()? {
            b'i' => {
                self.expect(b':')?;
                Ok(Key::Int(self.integer(b';')?))
            }
            b's' => {
                self.expect(b':')?;
                Ok(Key::String(self.string_body()?))
            }
            other => Err(Error::Serialized {
                offset: start,
                message: format!("invalid array key type '{}'", other.escape_ascii()),
            }),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("arrays nested too deeply"));
        }

        let start = self.pos;
        match self.tag()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.integer(b';')? {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    n => Err(Error::Serialized {
                        offset: start,
                        message: format!("invalid boolean {}", n),
                    }),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::Int(self.integer(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let raw = self.until(b';')?;
                let text = std::str::from_utf8(raw)
                    .ok()
                    .filter(|s| is_float_literal(s))
                    .ok_or_else(|| Error::Serialized {
                        offset: start,
                        message: format!("invalid float '{}'", raw.escape_ascii()),
                    })?;
                Ok(Value::Float(text.to_string()))
            }
            b's' => {
                self.expect(b':')?;
                Ok(Value::String(self.string_body()?))
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.length(b':')?;
                self.expect(b'{')?;
                let mut entries = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let key = self.key()?;
                    let item = self.value(depth + 1)?;
                    entries.push((key, item));
                }
                self.expect(b'}')?;
                Ok(array_value(entries))
            }
            tag @ (b'O' | b'C' | b'E' | b'r' | b'R') => Err(Error::Serialized {
                offset: start,
                message: format!("unsupported token '{}'", tag as char),
            }),
            other => Err(Error::Serialized {
                offset: start,
                message: format!("unknown token '{}'", other.escape_ascii()),
            }),
        }
    }
}

fn is_float_literal(text: &str) -> bool {
    matches!(text, "INF" | "-INF" | "NAN") || text.parse::<f64>().is_ok()
}

fn array_value(entries: Vec<(Key, Value)>) -> Value {
    let is_list = entries
        .iter()
        .enumerate()
        .all(|(index, (key, _))| matches!(key, Key::Int(i) if usize::try_from(*i) == Ok(index)));
    if is_list {
        Value::Sequence(entries.into_iter().map(|(_, v)| v).collect())
    } else {
        Value::Mapping(entries)
    }
}

use std::collections::HashMap;

use crate::errors::{Error, Result};

/// Percent/plus decoding for query and form strings.
pub trait QueryStringDecode {
    fn decode_query(&self) -> Result<String>;
}

impl QueryStringDecode for str {
    /// Single left-to-right pass: `%XX` decodes to its byte, `%%` collapses
    /// to a literal `%`, `+` becomes a space. A `%` followed by fewer than
    /// two characters, or by non-hex digits, fails instead of reading past
    /// the end of the string.
    fn decode_query(&self) -> Result<String> {
        let bytes = self.as_bytes();
        let mut decoded = Vec::with_capacity(bytes.len());
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'%' => {
                    if pos + 1 < bytes.len() && bytes[pos + 1] == b'%' {
                        decoded.push(b'%');
                        pos += 2;
                    } else if pos + 2 < bytes.len() {
                        let high = hex_value(bytes[pos + 1])
                            .ok_or(Error::MalformedEncoding { position: pos + 1 })?;
                        let low = hex_value(bytes[pos + 2])
                            .ok_or(Error::MalformedEncoding { position: pos + 2 })?;
                        decoded.push(high << 4 | low);
                        pos += 3;
                    } else {
                        return Err(Error::MalformedEncoding { position: pos });
                    }
                }
                b'+' => {
                    decoded.push(b' ');
                    pos += 1;
                }
                byte => {
                    decoded.push(byte);
                    pos += 1;
                }
            }
        }

        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Split a raw query/form string into a parameter map.
///
/// The whole string is decoded first, then split on `&` and on the first
/// `=` of each segment, so an encoded `%26` ends up splitting like a
/// literal `&`. A segment without `=` keeps an empty value, and empty
/// segments (consecutive or trailing `&`) survive as an empty-key entry.
/// If decoding fails somewhere, only the segments carrying the broken
/// escape are dropped.
pub fn parse_parameters(raw: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    if raw.is_empty() {
        return parameters;
    }

    match raw.decode_query() {
        Ok(decoded) => fill_parameters(&decoded, &mut parameters),
        Err(_) => {
            for segment in raw.split('&') {
                if let Ok(decoded) = segment.decode_query() {
                    fill_parameters(&decoded, &mut parameters);
                }
            }
        }
    }

    parameters
}

fn fill_parameters(decoded: &str, parameters: &mut HashMap<String, String>) {
    for segment in decoded.split('&') {
        match segment.split_once('=') {
            Some((key, value)) => parameters.insert(key.to_owned(), value.to_owned()),
            None => parameters.insert(segment.to_owned(), String::new()),
        };
    }
}

/// Split a raw `Cookie:` header value into a cookie map.
///
/// Cookie values are stored exactly as received. Unlike parameters they
/// are never percent-decoded; applications that put encoded data in a
/// cookie see the encoded form back.
pub fn parse_cookies(raw: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for segment in raw.split(';') {
        let Some(eq) = segment.find('=') else {
            continue;
        };
        let key = segment[..eq].trim_start_matches(|c: char| !c.is_ascii_graphic());
        let value = &segment[eq + 1..];
        if key.is_empty() || value.is_empty() {
            continue;
        }
        cookies.insert(key.to_owned(), value.to_owned());
    }

    cookies
}

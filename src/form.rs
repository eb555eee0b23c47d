use std::io::Read;

use indexmap::IndexMap;

use crate::builder::{MultipartReader, Part, ReaderConfig};
use crate::error::MultipartError;
use crate::options::{parse_boundary, parse_options_header};

// ---------------------------------------------------------------------------
// MultiDict
// ---------------------------------------------------------------------------

/// An insertion-ordered multi-valued map.
///
/// Keys are case-sensitive; each key maps to one or more values in the
/// order they were inserted, and keys themselves keep first-insertion
/// order.
#[derive(Debug)]
pub struct MultiDict<V> {
    items: IndexMap<String, Vec<V>>,
}

impl<V> Default for MultiDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MultiDict<V> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Append a value under `key`.
    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.items.entry(key.into()).or_default().push(value);
    }

    /// The first value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.items.get(key).and_then(|values| values.first())
    }

    /// All values for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[V] {
        self.items.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// All `(key, value)` pairs, grouped by key in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.items
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v)))
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Request-level helpers
// ---------------------------------------------------------------------------

/// Parsed form content: text fields and file parts, each keyed by field
/// name in stream order.
#[derive(Debug, Default)]
pub struct FormData {
    /// Text values: segments without a filename whose body stayed in
    /// memory.
    pub fields: MultiDict<String>,
    /// File parts: segments with a filename, plus oversized text fields
    /// that spilled to disk.
    pub files: MultiDict<Part>,
}

/// `true` when the `Content-Type` announces a form body, irrespective of
/// the HTTP method: `multipart/form-data` or
/// `application/x-www-form-urlencoded`.
pub fn is_form_request(content_type: &str) -> bool {
    match parse_options_header(content_type) {
        Ok((primary, _)) => {
            primary == "multipart/form-data" || primary == "application/x-www-form-urlencoded"
        }
        Err(_) => false,
    }
}

/// Parse a form request body into `(fields, files)`.
///
/// Strict mode propagates parse errors; lenient mode returns whatever
/// was parsed before the failure. Use [`parse_form_data_with`] to force
/// errors regardless of mode.
///
/// # Errors
///
/// A missing or invalid boundary, an unsupported content type, or (per
/// the mode above) any parse error.
pub fn parse_form_data<R: Read>(
    source: R,
    content_type: &str,
    config: ReaderConfig,
) -> Result<FormData, MultipartError> {
    let raise_on_error = config.parser.strict;
    parse_form_data_with(source, content_type, config, raise_on_error)
}

/// [`parse_form_data`] with an explicit error policy.
pub fn parse_form_data_with<R: Read>(
    source: R,
    content_type: &str,
    config: ReaderConfig,
    raise_on_error: bool,
) -> Result<FormData, MultipartError> {
    let (primary, _) = parse_options_header(content_type)?;

    match primary.as_str() {
        "multipart/form-data" => {
            let boundary = parse_boundary(content_type)?;
            parse_multipart_form(source, &boundary, config, raise_on_error)
        }
        "application/x-www-form-urlencoded" => parse_urlencoded_form(source, config),
        _ if raise_on_error => Err(MultipartError::InvalidHeader(format!(
            "unsupported form content type '{primary}'"
        ))),
        _ => Ok(FormData::default()),
    }
}

fn parse_multipart_form<R: Read>(
    source: R,
    boundary: &[u8],
    config: ReaderConfig,
    raise_on_error: bool,
) -> Result<FormData, MultipartError> {
    let mut reader = MultipartReader::with_config(source, boundary, config)?;
    let mut form = FormData::default();

    loop {
        let part = match reader.next_part() {
            Ok(Some(part)) => part,
            Ok(None) => break,
            Err(err) if raise_on_error => return Err(err),
            // Lenient: keep what was parsed before the fault.
            Err(_) => break,
        };
        if part.is_file() || part.is_spilled() {
            form.files.push(part.name().to_owned(), part);
        } else {
            let value = part.value()?;
            form.fields.push(part.name().to_owned(), value);
        }
    }
    Ok(form)
}

fn parse_urlencoded_form<R: Read>(
    source: R,
    config: ReaderConfig,
) -> Result<FormData, MultipartError> {
    let mut body = Vec::new();
    source
        .take(config.mem_limit + 1)
        .read_to_end(&mut body)
        .map_err(MultipartError::from)?;
    if body.len() as u64 > config.mem_limit {
        return Err(MultipartError::LimitReached("mem_limit"));
    }

    let charset = config.parser.charset;
    let mut form = FormData::default();
    let (text, ..) = charset.decode(&body);
    for pair in text.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        form.fields.push(url_decode(key), url_decode(value));
    }
    Ok(form)
}

/// Decode one query-string token: `+` becomes a space, `%XX` becomes the
/// byte it names. Malformed escapes are copied through untouched.
fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match hex_pair(bytes.get(i + 1).copied(), bytes.get(i + 2).copied()) {
                Some(decoded) => {
                    out.push(decoded);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(high: Option<u8>, low: Option<u8>) -> Option<u8> {
    let high = char::from(high?).to_digit(16)?;
    let low = char::from(low?).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multidict_preserves_order_and_duplicates() {
        let mut dict = MultiDict::new();
        dict.push("a", 1);
        dict.push("b", 2);
        dict.push("a", 3);

        assert_eq!(dict.get("a"), Some(&1));
        assert_eq!(dict.get_all("a"), &[1, 3]);
        assert_eq!(dict.get_all("missing"), &[] as &[i32]);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn form_request_detection() {
        assert!(is_form_request("multipart/form-data; boundary=x"));
        assert!(is_form_request("application/x-www-form-urlencoded"));
        assert!(is_form_request("Multipart/Form-Data; boundary=x"));
        assert!(!is_form_request("application/json"));
        assert!(!is_form_request("text/plain"));
    }

    #[test]
    fn url_decoding() {
        assert_eq!(url_decode("a+b"), "a b");
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("bad%zzescape"), "bad%zzescape");
    }
}

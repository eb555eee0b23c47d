use indexmap::IndexMap;

use crate::error::MultipartError;

// ---------------------------------------------------------------------------
// Quote dialects
// ---------------------------------------------------------------------------

/// How quoted option values are escaped and unescaped.
///
/// Browsers historically disagreed on this; both dialects survive in the
/// wild, so the caller picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// RFC 2616: surrounding double quotes, backslash escapes any
    /// following character.
    Legacy,
    /// HTML5 / WHATWG: CR, LF and `"` are percent-encoded as `%0D`,
    /// `%0A` and `%22`.
    Whatwg,
}

// ---------------------------------------------------------------------------
// Option-list parsing
// ---------------------------------------------------------------------------

/// Parse a header of the shape `value; key=val; key="quoted val"`.
///
/// Returns the primary value (lowercased) and the option map with
/// lowercased keys. The first occurrence of a key wins; later duplicates
/// are ignored. Option values are unquoted with the legacy dialect.
///
/// # Errors
///
/// Returns [`MultipartError::InvalidHeader`] for an unterminated quoted
/// string or a bad escape.
pub fn parse_options_header(
    value: &str,
) -> Result<(String, IndexMap<String, String>), MultipartError> {
    parse_options_header_with(value, QuoteStyle::Legacy)
}

/// [`parse_options_header`] with an explicit unquote dialect.
pub fn parse_options_header_with(
    value: &str,
    style: QuoteStyle,
) -> Result<(String, IndexMap<String, String>), MultipartError> {
    let (primary, raw) = split_options(value)?;
    let mut options = IndexMap::with_capacity(raw.len());
    for (key, raw_value) in raw {
        if !options.contains_key(&key) {
            options.insert(key, header_unquote(&raw_value, style)?);
        }
    }
    Ok((primary, options))
}

/// Parse a `Content-Disposition` header value.
///
/// Identical splitting rules to [`parse_options_header`], but option
/// values go through [`content_disposition_unquote`] so that both
/// WHATWG percent escapes and legacy backslash escapes in field names
/// and filenames are decoded.
pub fn parse_content_disposition(
    value: &str,
) -> Result<(String, IndexMap<String, String>), MultipartError> {
    let (primary, raw) = split_options(value)?;
    let mut options = IndexMap::with_capacity(raw.len());
    for (key, raw_value) in raw {
        if !options.contains_key(&key) {
            options.insert(key, content_disposition_unquote(&raw_value)?);
        }
    }
    Ok((primary, options))
}

/// Split an option list on unquoted `;`, without unquoting the values.
///
/// Option values keep their surrounding quotes so the caller can apply
/// the dialect of its choice. Options without `=` are skipped.
fn split_options(input: &str) -> Result<(String, Vec<(String, String)>), MultipartError> {
    let (primary, mut rest) = match input.find(';') {
        Some(pos) => (&input[..pos], &input[pos + 1..]),
        None => (input, ""),
    };
    let primary = primary.trim().to_ascii_lowercase();

    let mut options = Vec::new();
    while !rest.is_empty() {
        let (option, tail) = take_option(rest)?;
        rest = tail;
        let Some((key, raw_value)) = option else {
            continue;
        };
        options.push((key.trim().to_ascii_lowercase(), raw_value));
    }
    Ok((primary, options))
}

/// Consume one `key=value` option from the front of `input`, stopping at
/// the next unquoted `;`. Returns `None` for empty or valueless options.
fn take_option(input: &str) -> Result<(Option<(String, String)>, &str), MultipartError> {
    let Some(eq) = input.find(['=', ';']) else {
        // Trailing flag without a value; nothing left to parse.
        return Ok((None, ""));
    };
    if input.as_bytes()[eq] == b';' {
        return Ok((None, &input[eq + 1..]));
    }

    let key = &input[..eq];
    let value_part = input[eq + 1..].trim_start();

    if value_part.starts_with('"') {
        let end = scan_quoted(value_part)?;
        let raw_value = value_part[..end].to_owned();
        let after = value_part[end..].trim_start();
        let tail = match after.strip_prefix(';') {
            Some(t) => t,
            None if after.is_empty() => "",
            None => {
                return Err(MultipartError::InvalidHeader(
                    "unexpected characters after quoted option value".into(),
                ));
            }
        };
        Ok((Some((key.to_owned(), raw_value)), tail))
    } else {
        let (raw_value, tail) = match value_part.find(';') {
            Some(pos) => (&value_part[..pos], &value_part[pos + 1..]),
            None => (value_part, ""),
        };
        Ok((Some((key.to_owned(), raw_value.trim_end().to_owned())), tail))
    }
}

/// Return the byte length of the quoted string at the start of `input`
/// (including both quotes), honoring backslash escapes.
fn scan_quoted(input: &str) -> Result<usize, MultipartError> {
    debug_assert!(input.starts_with('"'));
    let bytes = input.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    return Err(MultipartError::InvalidHeader(
                        "bad escape in quoted option value".into(),
                    ));
                }
                i += 2;
            }
            b'"' => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(MultipartError::InvalidHeader(
        "unterminated quoted option value".into(),
    ))
}

// ---------------------------------------------------------------------------
// Unquoting
// ---------------------------------------------------------------------------

/// Remove quoting from a single option value.
///
/// Unquoted input is returned unchanged. See [`QuoteStyle`] for the two
/// dialects.
pub fn header_unquote(value: &str, style: QuoteStyle) -> Result<String, MultipartError> {
    match strip_quotes(value) {
        Some(inner) => match style {
            QuoteStyle::Legacy => backslash_unescape(inner),
            QuoteStyle::Whatwg => {
                if inner.contains('"') {
                    return Err(MultipartError::InvalidHeader(
                        "unescaped quote inside quoted option value".into(),
                    ));
                }
                Ok(percent_decode_ctl(inner))
            }
        },
        None => Ok(value.to_owned()),
    }
}

/// Unquote a `Content-Disposition` option value (field name, filename).
///
/// Applies the WHATWG percent escapes and additionally decodes the
/// legacy backslash escapes `\"`, `\r`, `\n` that older browsers emitted
/// in field names.
pub fn content_disposition_unquote(value: &str) -> Result<String, MultipartError> {
    let inner = strip_quotes(value).unwrap_or(value);
    let unescaped = inner
        .replace("\\\"", "\"")
        .replace("\\r", "\r")
        .replace("\\n", "\n");
    Ok(percent_decode_ctl(&unescaped))
}

fn strip_quotes(value: &str) -> Option<&str> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

fn backslash_unescape(value: &str) -> Result<String, MultipartError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(esc) => out.push(esc),
                None => {
                    return Err(MultipartError::InvalidHeader(
                        "bad escape in quoted option value".into(),
                    ));
                }
            },
            '"' => {
                return Err(MultipartError::InvalidHeader(
                    "unescaped quote inside quoted option value".into(),
                ));
            }
            _ => out.push(ch),
        }
    }
    Ok(out)
}

/// Decode the WHATWG control escapes `%0D`, `%0A` and `%22`.
///
/// Any other `%` sequence is copied through untouched.
fn percent_decode_ctl(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let b = tail.as_bytes();
        if b.len() >= 3 {
            match (b[1].to_ascii_uppercase(), b[2].to_ascii_uppercase()) {
                (b'0', b'D') => {
                    out.push('\r');
                    rest = &tail[3..];
                    continue;
                }
                (b'0', b'A') => {
                    out.push('\n');
                    rest = &tail[3..];
                    continue;
                }
                (b'2', b'2') => {
                    out.push('"');
                    rest = &tail[3..];
                    continue;
                }
                _ => {}
            }
        }
        out.push('%');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

/// Quote an option value for round-tripping through a header.
///
/// Legacy values made only of token characters are returned bare;
/// everything else is escaped and wrapped in double quotes.
pub fn header_quote(value: &str, style: QuoteStyle) -> String {
    match style {
        QuoteStyle::Legacy => {
            if !value.is_empty() && value.bytes().all(is_token_char) {
                return value.to_owned();
            }
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        }
        QuoteStyle::Whatwg => format!("\"{}\"", percent_encode_ctl(value)),
    }
}

/// Quote a `Content-Disposition` option value the WHATWG way.
pub fn content_disposition_quote(value: &str) -> String {
    format!("\"{}\"", percent_encode_ctl(value))
}

fn percent_encode_ctl(value: &str) -> String {
    value
        .replace('\r', "%0D")
        .replace('\n', "%0A")
        .replace('"', "%22")
}

// ---------------------------------------------------------------------------
// Boundary handling
// ---------------------------------------------------------------------------

/// Extract the `boundary` option from a `Content-Type` header value.
///
/// # Errors
///
/// Returns [`MultipartError::InvalidBoundary`] when the option is absent
/// or empty, and any error from [`parse_options_header`].
pub fn parse_boundary(content_type: &str) -> Result<Vec<u8>, MultipartError> {
    let (_, options) = parse_options_header(content_type)?;
    match options.get("boundary") {
        Some(b) if !b.is_empty() => Ok(b.as_bytes().to_vec()),
        Some(_) => Err(MultipartError::InvalidBoundary(
            "empty boundary option in Content-Type".into(),
        )),
        None => Err(MultipartError::InvalidBoundary(
            "no boundary option in Content-Type".into(),
        )),
    }
}

/// Check a boundary against the RFC 2046 constraints: 1-70 bytes, all
/// from the `bchars` set, no trailing space.
pub fn validate_boundary(boundary: &[u8]) -> Result<(), MultipartError> {
    if boundary.is_empty() || boundary.len() > 70 {
        return Err(MultipartError::InvalidBoundary(format!(
            "boundary length {} outside 1..=70",
            boundary.len()
        )));
    }
    if let Some(&bad) = boundary.iter().find(|&&b| !is_bchar(b)) {
        return Err(MultipartError::InvalidBoundary(format!(
            "boundary contains invalid byte 0x{bad:02X}"
        )));
    }
    if boundary.ends_with(b" ") {
        return Err(MultipartError::InvalidBoundary(
            "boundary must not end with a space".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 2046 / RFC 9110)
// ---------------------------------------------------------------------------

/// `bchars` - characters allowed in a multipart boundary.
///
/// ```text
/// bchars = ALPHA / DIGIT / "'" / "(" / ")" / "+" / "_" / "," / "-" /
///          "." / "/" / ":" / "=" / "?" / " "
/// ```
#[inline]
pub(crate) fn is_bchar(b: u8) -> bool {
    matches!(
        b,
        b'\'' | b'('
            | b')'
            | b'+'
            | b'_'
            | b','
            | b'-'
            | b'.'
            | b'/'
            | b':'
            | b'='
            | b'?'
            | b' '
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// `tchar` - characters allowed in HTTP tokens (header and option names).
#[inline]
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

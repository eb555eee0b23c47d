use serde::Serialize;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A single segment header field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header field name (original casing preserved, ASCII).
    pub name: String,
    /// Header field value (leading/trailing OWS trimmed, decoded through
    /// the configured charset).
    pub value: String,
}

// ---------------------------------------------------------------------------
// SegmentHeaders
// ---------------------------------------------------------------------------

/// The fully parsed header block of one segment of a multipart stream.
///
/// Carries the ordered raw header pairs plus the fields derived from
/// `Content-Disposition` and `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentHeaders {
    /// Zero-based position of this segment in the stream.
    pub index: usize,
    /// All header pairs in stream order.
    pub headers: Vec<Header>,
    /// The `name` option of `Content-Disposition`. Required, may be empty.
    pub name: String,
    /// The `filename` option of `Content-Disposition`, if present.
    pub filename: Option<String>,
    /// The segment's `Content-Type`. When the header is absent this
    /// defaults to `text/plain` for plain fields and
    /// `application/octet-stream` for segments with a filename.
    pub content_type: String,
}

impl SegmentHeaders {
    /// Look up the first header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Return all values for headers matching `name` (case-insensitive).
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// `true` when the segment announced itself as a file upload.
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// The `charset` option of the segment's own `Content-Type` header,
    /// if one was sent.
    pub fn charset(&self) -> Option<String> {
        let content_type = self.header_value("content-type")?;
        let (_, options) = crate::options::parse_options_header(content_type).ok()?;
        options.get("charset").cloned()
    }
}

// ---------------------------------------------------------------------------
// ParseEvent
// ---------------------------------------------------------------------------

/// One event produced by the push parser.
///
/// For every segment the parser emits exactly one [`Headers`] event,
/// zero or more [`Data`] events whose payloads concatenate to the exact
/// segment body, and one [`End`] event. `Data` borrows the parser's
/// internal buffer and is only valid until the event cursor advances;
/// callers that keep body bytes must copy them.
///
/// [`Headers`]: ParseEvent::Headers
/// [`Data`]: ParseEvent::Data
/// [`End`]: ParseEvent::End
#[derive(Debug, PartialEq, Eq)]
pub enum ParseEvent<'a> {
    /// The header block of the next segment is complete.
    Headers(SegmentHeaders),
    /// A non-empty slice of the current segment's body.
    Data(&'a [u8]),
    /// The current segment's body is complete.
    End,
}

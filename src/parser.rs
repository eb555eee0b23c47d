use encoding_rs::{Encoding, UTF_8};
use tracing::{trace, warn};

use crate::error::MultipartError;
use crate::options::{self, is_token_char};
use crate::types::{Header, ParseEvent, SegmentHeaders};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits and behavior for the push parser.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Charset used to decode header values and, downstream, text fields
    /// (default: UTF-8).
    pub charset: &'static Encoding,
    /// Reject input that is tolerated in lenient mode: preamble junk and
    /// a missing CRLF after the final boundary (default: on; the
    /// buffered reader turns it off).
    pub strict: bool,
    /// Maximum size of a segment's header block, and of the preamble
    /// window searched for the first boundary (default: 4 096).
    pub max_header_size: usize,
    /// Maximum length of a single header line, excluding CRLF
    /// (default: 4 096).
    pub max_header_line: usize,
    /// Maximum number of header fields per segment (default: 8).
    pub max_header_count: usize,
    /// Maximum number of segments in the stream (default: 128).
    pub max_segments: usize,
    /// Maximum body size of a single segment; `0` means unlimited
    /// (default: 0).
    pub max_segment_size: u64,
    /// Maximum total body size across all segments; `0` means unlimited
    /// (default: 0).
    pub max_body_size: u64,
    /// Count header-block bytes against `max_body_size` as well
    /// (default: off, the historical behavior).
    pub count_headers_in_body: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            charset: UTF_8,
            strict: true,
            max_header_size: 4_096,
            max_header_line: 4_096,
            max_header_count: 8,
            max_segments: 128,
            max_segment_size: 0,
            max_body_size: 0,
            count_headers_in_body: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first dash-boundary.
    Preamble,
    /// Reading the header block of the current segment.
    Header,
    /// Streaming the body of the current segment.
    Body,
    /// Terminator seen; all further input is epilogue and is discarded.
    Complete,
    /// Terminal fault; the error kind is retained and re-raised.
    Error,
    /// Closed by the caller.
    Closed,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// An incremental, non-blocking multipart/form-data parser.
///
/// Feed arbitrary byte chunks with [`parse`](PushParser::parse) and drain
/// the returned [`Events`] cursor. For every segment the cursor yields one
/// [`ParseEvent::Headers`], zero or more [`ParseEvent::Data`] slices and
/// one [`ParseEvent::End`]; an empty chunk signals end of input.
///
/// # Usage
///
/// ```rust
/// use formwire::{ParseEvent, PushParser};
///
/// let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nhello\r\n--B--\r\n";
///
/// let mut parser = PushParser::new(b"B").unwrap();
/// let mut field = Vec::new();
///
/// let mut events = parser.parse(body).unwrap();
/// while let Some(event) = events.next().unwrap() {
///     if let ParseEvent::Data(data) = event {
///         field.extend_from_slice(data);
///     }
/// }
/// assert_eq!(field, b"hello");
/// assert!(parser.is_closed());
/// ```
#[derive(Debug)]
pub struct PushParser {
    state: State,
    config: ParserConfig,
    dash_boundary: Vec<u8>,
    delimiter: Vec<u8>,

    // Unconsumed input. Compacted at the start of every `parse` call so
    // the retained tail stays bounded by the partial-delimiter window
    // (plus, in `Header` state, the header block itself).
    buffer: Vec<u8>,
    offset: usize,

    error: Option<MultipartError>,

    // Preamble bookkeeping
    preamble_discarded: usize,

    // Header-block accumulation for the current segment
    segments_opened: usize,
    headers: Vec<Header>,
    header_bytes: usize,

    // Body bookkeeping
    segment_size: u64,
    total_size: u64,
    body_started: bool,

    // Epilogue: 0 = nothing after terminator yet, 1 = CR seen,
    // 2 = CRLF seen, 3 = terminator followed by something else.
    epilogue_state: u8,
}

impl PushParser {
    /// Create a parser with default configuration (strict mode on).
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidBoundary`] if the boundary
    /// violates RFC 2046.
    pub fn new(boundary: &[u8]) -> Result<Self, MultipartError> {
        Self::with_config(boundary, ParserConfig::default())
    }

    /// Create a parser with custom limits.
    pub fn with_config(boundary: &[u8], config: ParserConfig) -> Result<Self, MultipartError> {
        options::validate_boundary(boundary)?;

        let mut dash_boundary = Vec::with_capacity(boundary.len() + 2);
        dash_boundary.extend_from_slice(b"--");
        dash_boundary.extend_from_slice(boundary);

        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary);

        Ok(Self {
            state: State::Preamble,
            config,
            dash_boundary,
            delimiter,
            buffer: Vec::new(),
            offset: 0,
            error: None,
            preamble_discarded: 0,
            segments_opened: 0,
            headers: Vec::new(),
            header_bytes: 0,
            segment_size: 0,
            total_size: 0,
            body_started: false,
            epilogue_state: 0,
        })
    }

    /// Feed a chunk of bytes and return the event cursor for it.
    ///
    /// The cursor mutably borrows the parser, so it must be dropped
    /// (normally: fully drained) before the next `parse` call. An empty
    /// chunk signals end of input and fails unless the terminator has
    /// been seen.
    ///
    /// # Errors
    ///
    /// Any [`MultipartError`] on malformed input or a breached limit.
    /// Errors are terminal: every later call fails with the same kind.
    pub fn parse(&mut self, chunk: &[u8]) -> Result<Events<'_>, MultipartError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.state == State::Closed {
            return Err(MultipartError::State("parse called on a closed parser"));
        }

        if chunk.is_empty() {
            if self.state != State::Complete {
                return Err(self.fail(MultipartError::State("incomplete input")));
            }
            if self.config.strict && self.epilogue_state < 2 {
                return Err(self.fail(MultipartError::Strict(
                    "missing CRLF after final boundary",
                )));
            }
            return Ok(Events { parser: self });
        }

        if self.state == State::Complete {
            // Epilogue bytes are discarded, never buffered.
            self.absorb_epilogue(chunk)?;
            return Ok(Events { parser: self });
        }

        if self.offset > 0 {
            self.buffer.drain(..self.offset);
            self.offset = 0;
        }
        self.buffer.extend_from_slice(chunk);
        Ok(Events { parser: self })
    }

    /// Close the parser.
    ///
    /// Idempotent once the stream completed. Fails with
    /// [`MultipartError::State`] when the terminator has not been seen,
    /// or re-raises the terminal error of a failed parse.
    pub fn close(&mut self) -> Result<(), MultipartError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match self.state {
            State::Complete => {
                if self.config.strict && self.epilogue_state < 2 {
                    return Err(self.fail(MultipartError::Strict(
                        "missing CRLF after final boundary",
                    )));
                }
                self.state = State::Closed;
                Ok(())
            }
            State::Closed => Ok(()),
            _ => Err(MultipartError::State("incomplete input")),
        }
    }

    /// `true` once the terminator has been parsed or the parser was
    /// closed. No further events will be emitted.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Complete | State::Closed)
    }

    /// Total body bytes emitted across all segments so far.
    pub fn bytes_emitted(&self) -> u64 {
        self.total_size
    }

    // ----- event production ------------------------------------------------

    fn next_event(&mut self) -> Result<Option<ParseEvent<'_>>, MultipartError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        // Free the prefix consumed by the previous event; this keeps the
        // retained tail bounded by the partial-delimiter window (plus the
        // current header block).
        if self.offset > 0 {
            self.buffer.drain(..self.offset);
            self.offset = 0;
        }

        loop {
            match self.state {
                State::Preamble => {
                    if !self.scan_preamble()? {
                        return Ok(None);
                    }
                }

                State::Header => match self.scan_header_line()? {
                    HeaderProgress::NeedMore => return Ok(None),
                    HeaderProgress::Line => {}
                    HeaderProgress::BlockDone => {
                        let headers = self.finish_headers()?;
                        trace!(
                            index = headers.index,
                            name = headers.name.as_str(),
                            file = headers.filename.is_some(),
                            "segment headers parsed"
                        );
                        self.state = State::Body;
                        self.segment_size = 0;
                        self.body_started = false;
                        return Ok(Some(ParseEvent::Headers(headers)));
                    }
                },

                State::Body => return self.scan_body(),

                State::Complete | State::Closed => return Ok(None),

                State::Error => {
                    // `self.error` is set whenever this state is entered.
                    unreachable!("error state without stored error");
                }
            }
        }
    }

    // ----- PREAMBLE --------------------------------------------------------

    /// Look for the first dash-boundary. Returns `true` when the parser
    /// transitioned out of the preamble, `false` when more input is
    /// needed.
    fn scan_preamble(&mut self) -> Result<bool, MultipartError> {
        let unread = &self.buffer[self.offset..];

        if let Some(pos) = find_subslice(unread, &self.dash_boundary) {
            if self.config.strict && !is_crlf_run(&unread[..pos]) {
                return Err(self.fail(MultipartError::Strict(
                    "unexpected data before first boundary",
                )));
            }
            let after = pos + self.dash_boundary.len();
            if unread.len() < after + 2 {
                // Keep the candidate boundary, drop the preamble before it.
                self.preamble_discarded += pos;
                self.offset += pos;
                return Ok(false);
            }
            match [unread[after], unread[after + 1]] {
                [b'\r', b'\n'] => {
                    self.offset += after + 2;
                    self.open_segment()?;
                    Ok(true)
                }
                [b'-', b'-'] => {
                    self.finish_stream(after + 2)?;
                    Ok(true)
                }
                _ => Err(self.fail(MultipartError::InvalidBoundary(
                    "first boundary not followed by CRLF or '--'".into(),
                ))),
            }
        } else {
            if self.preamble_discarded + unread.len() > self.config.max_header_size {
                return Err(self.fail(MultipartError::InvalidBoundaryLocation));
            }
            let discard = if self.config.strict {
                if !strict_preamble_prefix(unread, &self.dash_boundary) {
                    return Err(self.fail(MultipartError::Strict(
                        "unexpected data before first boundary",
                    )));
                }
                // Drop only complete CRLF pairs so the window stays
                // aligned for the run check above.
                let mut pairs = 0;
                while unread.len() >= pairs + 2 && &unread[pairs..pairs + 2] == b"\r\n" {
                    pairs += 2;
                }
                pairs
            } else {
                // Discard everything that can no longer start the boundary.
                let keep = self.dash_boundary.len().saturating_sub(1);
                unread.len().saturating_sub(keep)
            };
            self.preamble_discarded += discard;
            self.offset += discard;
            Ok(false)
        }
    }

    // ----- HEADER ----------------------------------------------------------

    /// Consume one complete CRLF-terminated header line, enforcing line
    /// and block limits eagerly.
    fn scan_header_line(&mut self) -> Result<HeaderProgress, MultipartError> {
        let unread = &self.buffer[self.offset..];

        let line_len = match scan_line(unread) {
            LineScan::Complete(len) => len,
            LineScan::NeedMore(seen) => {
                self.check_header_limits(seen)?;
                return Ok(HeaderProgress::NeedMore);
            }
            LineScan::BareBreak => {
                return Err(self.fail(MultipartError::InvalidLineBreak));
            }
        };
        self.check_header_limits(line_len)?;

        let consumed = line_len + 2;
        self.header_bytes += consumed;
        if self.config.count_headers_in_body {
            let max_body = self.config.max_body_size;
            if max_body > 0 && self.total_size + consumed as u64 > max_body {
                return Err(self.fail(MultipartError::LimitReached("max_body_size")));
            }
            self.total_size += consumed as u64;
        }

        if line_len == 0 {
            self.offset += consumed;
            return Ok(HeaderProgress::BlockDone);
        }

        let header = self.parse_header_line(self.offset, line_len)?;
        self.offset += consumed;
        self.headers.push(header);
        if self.headers.len() > self.config.max_header_count {
            return Err(self.fail(MultipartError::LimitReached("max_header_count")));
        }
        Ok(HeaderProgress::Line)
    }

    fn check_header_limits(&mut self, line_len: usize) -> Result<(), MultipartError> {
        if line_len > self.config.max_header_line {
            return Err(self.fail(MultipartError::LimitReached("max_header_line")));
        }
        if self.header_bytes + line_len > self.config.max_header_size {
            return Err(self.fail(MultipartError::HeaderTooLong));
        }
        Ok(())
    }

    /// Parse `token ":" OWS value OWS` at `start..start + len` of the
    /// buffer. Continuation lines are not supported.
    fn parse_header_line(&mut self, start: usize, len: usize) -> Result<Header, MultipartError> {
        let line = &self.buffer[start..start + len];

        if line[0] == b' ' || line[0] == b'\t' {
            return Err(self.fail(MultipartError::InvalidHeader(
                "continuation lines are not supported".into(),
            )));
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(self.fail(MultipartError::InvalidHeader(
                "header line has no colon".into(),
            )));
        };
        let name = &line[..colon];
        if name.is_empty() {
            return Err(self.fail(MultipartError::EmptyHeader));
        }
        if let Some(&bad) = name.iter().find(|&&b| !is_token_char(b)) {
            return Err(self.fail(MultipartError::InvalidHeader(format!(
                "invalid byte 0x{bad:02X} in header name"
            ))));
        }

        let value = trim_ows(&line[colon + 1..]);
        let (decoded, ..) = self.config.charset.decode(value);
        Ok(Header {
            name: String::from_utf8_lossy(name).into_owned(),
            value: decoded.into_owned(),
        })
    }

    /// Validate the accumulated block and derive the segment fields.
    fn finish_headers(&mut self) -> Result<SegmentHeaders, MultipartError> {
        let headers = std::mem::take(&mut self.headers);

        let mut dispositions = headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("content-disposition"));
        let disposition = match (dispositions.next(), dispositions.next()) {
            (Some(first), None) => first.value.clone(),
            (Some(_), Some(_)) => {
                return Err(self.fail(MultipartError::InvalidHeader(
                    "duplicate Content-Disposition header".into(),
                )));
            }
            (None, _) => return Err(self.fail(MultipartError::MissingDisposition)),
        };

        let (primary, options) = match options::parse_content_disposition(&disposition) {
            Ok(parsed) => parsed,
            Err(err) => return Err(self.fail(err)),
        };
        if primary != "form-data" {
            return Err(self.fail(MultipartError::InvalidHeader(format!(
                "Content-Disposition is '{primary}', expected 'form-data'"
            ))));
        }
        let Some(name) = options.get("name").cloned() else {
            return Err(self.fail(MultipartError::InvalidHeader(
                "Content-Disposition has no name option".into(),
            )));
        };
        let filename = options.get("filename").cloned();

        if let Some(encoding) = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-transfer-encoding"))
            .map(|h| h.value.trim().to_ascii_lowercase())
        {
            if encoding == "base64" || encoding == "quoted-printable" {
                return Err(self.fail(MultipartError::UnsupportedTransferEncoding(encoding)));
            }
        }

        let content_type = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.clone())
            .unwrap_or_else(|| {
                if filename.is_some() {
                    "application/octet-stream".to_owned()
                } else {
                    "text/plain".to_owned()
                }
            });

        Ok(SegmentHeaders {
            index: self.segments_opened - 1,
            headers,
            name,
            filename,
            content_type,
        })
    }

    // ----- BODY ------------------------------------------------------------

    fn scan_body(&mut self) -> Result<Option<ParseEvent<'_>>, MultipartError> {
        let unread = &self.buffer[self.offset..];

        // A dash-boundary directly at body start is accepted as a
        // zero-length final body (its leading CRLF was consumed as the
        // header-block terminator).
        if !self.body_started && self.segment_size == 0 {
            let needed = self.dash_boundary.len() + 2;
            if unread.len() >= needed {
                if unread.starts_with(&self.dash_boundary) {
                    let dash_len = self.dash_boundary.len();
                    match [unread[dash_len], unread[dash_len + 1]] {
                        [b'\r', b'\n'] => {
                            self.offset += needed;
                            self.open_segment()?;
                            return Ok(Some(ParseEvent::End));
                        }
                        [b'-', b'-'] => {
                            self.finish_stream(needed)?;
                            return Ok(Some(ParseEvent::End));
                        }
                        // Anything else is ordinary body content.
                        _ => {}
                    }
                }
            } else {
                let cmp = unread.len().min(self.dash_boundary.len());
                if unread[..cmp] == self.dash_boundary[..cmp] {
                    // Could still become an immediate closing boundary.
                    return Ok(None);
                }
            }
        }

        if let Some(pos) = find_subslice(unread, &self.delimiter) {
            if pos > 0 {
                // Emit the final body chunk before the delimiter.
                return self.emit_data(pos).map(Some);
            }
            let after = self.delimiter.len();
            if unread.len() < after + 2 {
                return Ok(None);
            }
            match [unread[after], unread[after + 1]] {
                [b'\r', b'\n'] => {
                    self.offset += after + 2;
                    self.open_segment()?;
                    Ok(Some(ParseEvent::End))
                }
                [b'-', b'-'] => {
                    self.finish_stream(after + 2)?;
                    Ok(Some(ParseEvent::End))
                }
                _ => Err(self.fail(MultipartError::InvalidBoundary(
                    "boundary not followed by CRLF or '--'".into(),
                ))),
            }
        } else {
            // Hold back the longest tail that could still begin the
            // delimiter; everything before it is clean body data.
            let hold = self.delimiter.len() - 1;
            let safe = unread.len().saturating_sub(hold);
            if safe == 0 {
                return Ok(None);
            }
            self.emit_data(safe).map(Some)
        }
    }

    fn emit_data(&mut self, len: usize) -> Result<ParseEvent<'_>, MultipartError> {
        self.check_body_limits(len as u64)?;
        let start = self.offset;
        self.offset += len;
        self.segment_size += len as u64;
        self.total_size += len as u64;
        self.body_started = true;
        Ok(ParseEvent::Data(&self.buffer[start..start + len]))
    }

    fn check_body_limits(&mut self, additional: u64) -> Result<(), MultipartError> {
        let max_segment = self.config.max_segment_size;
        if max_segment > 0 && self.segment_size + additional > max_segment {
            return Err(self.fail(MultipartError::LimitReached("max_segment_size")));
        }
        let max_body = self.config.max_body_size;
        if max_body > 0 && self.total_size + additional > max_body {
            return Err(self.fail(MultipartError::LimitReached("max_body_size")));
        }
        Ok(())
    }

    // ----- transitions -----------------------------------------------------

    /// Start the next segment's header block. The dash-boundary (or
    /// delimiter) and its trailing CRLF have already been consumed.
    fn open_segment(&mut self) -> Result<(), MultipartError> {
        if self.segments_opened >= self.config.max_segments {
            return Err(self.fail(MultipartError::LimitReached("max_segments")));
        }
        self.segments_opened += 1;
        self.headers.clear();
        self.header_bytes = 0;
        self.state = State::Header;
        trace!(index = self.segments_opened - 1, "segment opened");
        Ok(())
    }

    /// Terminator consumed; discard the rest of the buffer as epilogue.
    fn finish_stream(&mut self, consumed: usize) -> Result<(), MultipartError> {
        self.offset += consumed;

        let tail = &self.buffer[self.offset..];
        let mut head = [0u8; 2];
        let head_len = tail.len().min(2);
        head[..head_len].copy_from_slice(&tail[..head_len]);

        self.buffer.clear();
        self.offset = 0;
        self.state = State::Complete;
        trace!(segments = self.segments_opened, "terminator reached");

        self.absorb_epilogue(&head[..head_len])
    }

    /// Track (and in strict mode validate) the bytes after the
    /// terminator. Only the first two matter; everything is discarded.
    fn absorb_epilogue(&mut self, bytes: &[u8]) -> Result<(), MultipartError> {
        for &b in bytes {
            match self.epilogue_state {
                0 => self.epilogue_state = if b == b'\r' { 1 } else { 3 },
                1 => self.epilogue_state = if b == b'\n' { 2 } else { 3 },
                _ => break,
            }
        }
        if self.config.strict && self.epilogue_state == 3 {
            return Err(self.fail(MultipartError::Strict(
                "missing CRLF after final boundary",
            )));
        }
        Ok(())
    }

    fn fail(&mut self, err: MultipartError) -> MultipartError {
        warn!(error = %err, "parser entering error state");
        self.state = State::Error;
        self.error = Some(err.clone());
        err
    }
}

// ---------------------------------------------------------------------------
// Event cursor
// ---------------------------------------------------------------------------

/// Cursor over the events produced by one [`PushParser::parse`] call.
///
/// Mutably borrows the parser, so interleaving `parse` calls with a live
/// cursor is rejected at compile time. [`next`](Events::next) returns
/// `None` when the parser needs more input or the stream completed.
#[derive(Debug)]
pub struct Events<'p> {
    parser: &'p mut PushParser,
}

impl Events<'_> {
    /// Advance to the next event.
    ///
    /// # Errors
    ///
    /// Any [`MultipartError`] on malformed input or a breached limit.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<ParseEvent<'_>>, MultipartError> {
        self.parser.next_event()
    }
}

// ---------------------------------------------------------------------------
// Scanning helpers
// ---------------------------------------------------------------------------

enum HeaderProgress {
    /// One header line consumed; keep going.
    Line,
    /// The empty line ended the block.
    BlockDone,
    /// No complete line buffered yet.
    NeedMore,
}

enum LineScan {
    /// Complete line of this many content bytes (CRLF excluded).
    Complete(usize),
    /// No line break yet; this many bytes are pending.
    NeedMore(usize),
    /// A bare CR or bare LF.
    BareBreak,
}

fn scan_line(unread: &[u8]) -> LineScan {
    for (i, &b) in unread.iter().enumerate() {
        match b {
            b'\r' => {
                return match unread.get(i + 1) {
                    Some(b'\n') => LineScan::Complete(i),
                    Some(_) => LineScan::BareBreak,
                    None => LineScan::NeedMore(i),
                };
            }
            b'\n' => return LineScan::BareBreak,
            _ => {}
        }
    }
    LineScan::NeedMore(unread.len())
}

fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// `true` if `bytes` is a run of complete CRLF pairs.
fn is_crlf_run(bytes: &[u8]) -> bool {
    bytes.len() % 2 == 0 && bytes.chunks(2).all(|pair| pair == b"\r\n")
}

/// Strict-mode check for a preamble window with no boundary match yet:
/// only CRLF pairs followed by a partial CRLF or a prefix of the
/// dash-boundary may be pending.
fn strict_preamble_prefix(unread: &[u8], dash_boundary: &[u8]) -> bool {
    let mut rest = unread;
    while rest.len() >= 2 && &rest[..2] == b"\r\n" {
        rest = &rest[2..];
    }
    if rest == b"\r" {
        return true;
    }
    let cmp = rest.len().min(dash_boundary.len());
    rest.len() <= dash_boundary.len() && rest[..cmp] == dash_boundary[..cmp]
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_boundaries() {
        assert!(PushParser::new(b"").is_err());
        assert!(PushParser::new(&[b'a'; 71]).is_err());
        assert!(PushParser::new(b"ends-with-space ").is_err());
        assert!(PushParser::new(b"bad\x7fbyte").is_err());
        assert!(PushParser::new(b"ok-boundary_123").is_ok());
    }

    #[test]
    fn derived_tokens() {
        let parser = PushParser::new(b"xyz").unwrap();
        assert_eq!(parser.dash_boundary, b"--xyz");
        assert_eq!(parser.delimiter, b"\r\n--xyz");
    }

    #[test]
    fn scan_line_variants() {
        assert!(matches!(scan_line(b"abc\r\n"), LineScan::Complete(3)));
        assert!(matches!(scan_line(b"abc"), LineScan::NeedMore(3)));
        assert!(matches!(scan_line(b"abc\r"), LineScan::NeedMore(3)));
        assert!(matches!(scan_line(b"abc\nx"), LineScan::BareBreak));
        assert!(matches!(scan_line(b"abc\rx"), LineScan::BareBreak));
        assert!(matches!(scan_line(b"\r\n"), LineScan::Complete(0)));
    }

    #[test]
    fn subslice_search() {
        assert_eq!(find_subslice(b"abcdef", b"cd"), Some(2));
        assert_eq!(find_subslice(b"abcdef", b"fg"), None);
        assert_eq!(find_subslice(b"ab", b"abc"), None);
        assert_eq!(find_subslice(b"abc", b""), None);
    }

    #[test]
    fn crlf_run_detection() {
        assert!(is_crlf_run(b""));
        assert!(is_crlf_run(b"\r\n\r\n"));
        assert!(!is_crlf_run(b"\r\nx"));
        assert!(!is_crlf_run(b"x\r\n"));
    }

    #[test]
    fn strict_preamble_prefix_check() {
        let dash = b"--B".as_slice();
        assert!(strict_preamble_prefix(b"", dash));
        assert!(strict_preamble_prefix(b"\r\n", dash));
        assert!(strict_preamble_prefix(b"\r\n\r", dash));
        assert!(strict_preamble_prefix(b"--", dash));
        assert!(strict_preamble_prefix(b"\r\n--", dash));
        assert!(!strict_preamble_prefix(b"junk", dash));
        assert!(!strict_preamble_prefix(b"\r\nx", dash));
    }

    #[test]
    fn ows_trimming() {
        assert_eq!(trim_ows(b"  value \t"), b"value");
        assert_eq!(trim_ows(b"value"), b"value");
        assert_eq!(trim_ows(b" \t "), b"");
    }
}

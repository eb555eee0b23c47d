use std::fmt;

/// Errors that can occur while parsing a multipart/form-data stream.
///
/// Every variant carries enough context for a human-readable message, and
/// [`status`](MultipartError::status) maps it to the HTTP status a server
/// would typically answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// The boundary string violates RFC 2046 (length, character set,
    /// trailing space), or a boundary line in the stream is not followed
    /// by CRLF or `--`.
    InvalidBoundary(String),
    /// The first dash-boundary was not found within the allowed preamble
    /// window.
    InvalidBoundaryLocation,
    /// A segment header line is malformed (bad name token, missing colon,
    /// continuation line, broken quoted string, duplicate disposition).
    InvalidHeader(String),
    /// A bare LF or bare CR was found where CRLF is required.
    InvalidLineBreak,
    /// A segment has no `Content-Disposition: form-data` header.
    MissingDisposition,
    /// A segment declares a `Content-Transfer-Encoding` this parser does
    /// not decode (`base64`, `quoted-printable`).
    UnsupportedTransferEncoding(String),
    /// A header line has an empty name (`": value"`).
    EmptyHeader,
    /// The segment header block outgrew `max_header_size`.
    HeaderTooLong,
    /// A configured limit was exceeded. The payload names the cap.
    LimitReached(&'static str),
    /// Input that is tolerated in lenient mode but rejected under strict
    /// mode (preamble junk, missing final CRLF).
    Strict(&'static str),
    /// API misuse: parse after close, close before complete, EOF before
    /// the terminator.
    State(&'static str),
    /// The byte source handed to the builder failed.
    Io(std::io::ErrorKind, String),
}

impl MultipartError {
    /// HTTP status hint for this error: `400` for malformed input, `413`
    /// for exceeded limits, `500` for state and I/O faults.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidBoundary(_)
            | Self::InvalidBoundaryLocation
            | Self::InvalidHeader(_)
            | Self::InvalidLineBreak
            | Self::MissingDisposition
            | Self::UnsupportedTransferEncoding(_)
            | Self::EmptyHeader
            | Self::Strict(_) => 400,
            Self::HeaderTooLong | Self::LimitReached(_) => 413,
            Self::State(_) | Self::Io(..) => 500,
        }
    }

    /// `true` for errors only raised under strict mode.
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict(_))
    }

    /// `true` when a configured resource cap was hit.
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::HeaderTooLong | Self::LimitReached(_))
    }
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBoundary(b) => write!(f, "invalid multipart boundary: {b}"),
            Self::InvalidBoundaryLocation => {
                write!(f, "no multipart boundary found within the preamble window")
            }
            Self::InvalidHeader(h) => write!(f, "malformed segment header: {h}"),
            Self::InvalidLineBreak => write!(f, "bare CR or LF in segment header (CRLF required)"),
            Self::MissingDisposition => {
                write!(f, "segment has no Content-Disposition: form-data header")
            }
            Self::UnsupportedTransferEncoding(e) => {
                write!(f, "unsupported Content-Transfer-Encoding: '{e}'")
            }
            Self::EmptyHeader => write!(f, "segment header line has an empty name"),
            Self::HeaderTooLong => write!(f, "segment header block exceeds maximum size"),
            Self::LimitReached(cap) => write!(f, "configured limit exceeded: {cap}"),
            Self::Strict(msg) => write!(f, "strict mode violation: {msg}"),
            Self::State(msg) => write!(f, "parser state error: {msg}"),
            Self::Io(kind, msg) => write!(f, "I/O error while reading source ({kind:?}): {msg}"),
        }
    }
}

impl std::error::Error for MultipartError {}

impl From<std::io::Error> for MultipartError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind(), err.to_string())
    }
}

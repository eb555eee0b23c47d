//! # formwire
//!
//! A **streaming multipart/form-data parser** (RFC 7578 / HTML5)
//! implemented as a push state machine, with a buffered part builder on
//! top, designed for use both as a Rust library and as a CLI tool.
//!
//! The core [`PushParser`] consumes byte chunks of any size at any
//! split point and emits typed events, never buffering more than the
//! current header block plus a partial-boundary window. The
//! [`MultipartReader`] drives it from any [`std::io::Read`] source and
//! materializes each segment into a [`Part`] whose body lives in memory
//! below a threshold and overflows to a temp file above it.
//!
//! ## Quick start — buffered parsing
//!
//! ```rust
//! use formwire::parse_multipart;
//!
//! let body = b"--B\r\nContent-Disposition: form-data; name=\"greeting\"\r\n\r\n\
//!              hello\r\n--B--\r\n";
//!
//! let parts = parse_multipart(body.as_slice(), b"B").expect("valid form");
//! assert_eq!(parts.len(), 1);
//! assert_eq!(parts[0].name(), "greeting");
//! assert_eq!(parts[0].value().unwrap(), "hello");
//! ```
//!
//! ## Quick start — incremental parsing
//!
//! ```rust
//! use formwire::{ParseEvent, PushParser};
//!
//! let mut parser = PushParser::new(b"B").unwrap();
//! let mut body = Vec::new();
//!
//! // Feed data in arbitrary chunks; drain the cursor after each feed.
//! for chunk in [
//!     b"--B\r\nContent-Disposition".as_slice(),
//!     b": form-data; name=\"a\"\r\n\r\nsplit ac",
//!     b"ross chunks\r\n--B--\r\n",
//! ] {
//!     let mut events = parser.parse(chunk).unwrap();
//!     while let Some(event) = events.next().unwrap() {
//!         if let ParseEvent::Data(data) = event {
//!             body.extend_from_slice(data);
//!         }
//!     }
//! }
//!
//! assert_eq!(body, b"split across chunks");
//! assert!(parser.is_closed());
//! ```

mod builder;
mod error;
mod form;
mod options;
mod output;
mod parser;
mod types;

// Re-export public API.
pub use builder::{MultipartReader, Part, PartReader, ReaderConfig};
pub use error::MultipartError;
pub use form::{FormData, MultiDict, is_form_request, parse_form_data, parse_form_data_with};
pub use options::{
    QuoteStyle, content_disposition_quote, content_disposition_unquote, header_quote,
    header_unquote, parse_boundary, parse_content_disposition, parse_options_header,
    parse_options_header_with,
};
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{Events, ParserConfig, PushParser};
pub use types::{Header, ParseEvent, SegmentHeaders};

/// Parse a **complete** multipart body from a byte slice in one call.
///
/// This is a convenience wrapper around [`MultipartReader`] with default
/// (lenient) configuration. For streaming sources or custom limits,
/// create a `MultipartReader` directly.
///
/// # Errors
///
/// Returns [`MultipartError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_multipart(data: &[u8], boundary: &[u8]) -> Result<Vec<Part>, MultipartError> {
    MultipartReader::new(data, boundary)?.into_parts()
}

/// Parse a **complete** multipart body using custom [`ReaderConfig`]
/// limits.
///
/// # Errors
///
/// Returns [`MultipartError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_multipart_with_config(
    data: &[u8],
    boundary: &[u8],
    config: ReaderConfig,
) -> Result<Vec<Part>, MultipartError> {
    MultipartReader::with_config(data, boundary, config)?.into_parts()
}

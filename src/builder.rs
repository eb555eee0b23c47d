use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use encoding_rs::Encoding;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::MultipartError;
use crate::parser::{ParserConfig, PushParser};
use crate::types::{ParseEvent, SegmentHeaders};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Limits and behavior for [`MultipartReader`], on top of the push
/// parser's [`ParserConfig`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Push-parser limits. Strict mode defaults to **off** here, the
    /// historical behavior for buffered form parsing.
    pub parser: ParserConfig,
    /// Chunk size for reads from the byte source (default: 65 536).
    pub buffer_size: usize,
    /// Per-part threshold above which the body migrates from memory to a
    /// temp file (default: 262 144).
    pub memfile_limit: u64,
    /// Total in-memory body bytes across all parts (default: 2 097 152).
    pub mem_limit: u64,
    /// Total on-disk body bytes across all parts (default:
    /// 1 073 741 824).
    pub disk_limit: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig {
                strict: false,
                ..ParserConfig::default()
            },
            buffer_size: 65_536,
            memfile_limit: 262_144,
            mem_limit: 2_097_152,
            disk_limit: 1_073_741_824,
        }
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A materialized segment: headers plus a readable body backing.
///
/// Bodies live in memory until they outgrow the reader's
/// `memfile_limit`, then spill to a [`NamedTempFile`]. Dropping a part
/// deletes its temp file; [`close`](Part::close) is the explicit form.
#[derive(Debug)]
pub struct Part {
    headers: SegmentHeaders,
    backing: Backing,
    size: u64,
    charset: &'static Encoding,
}

#[derive(Debug)]
enum Backing {
    Memory(Vec<u8>),
    File(NamedTempFile),
}

impl Part {
    pub(crate) fn new(headers: SegmentHeaders, charset: &'static Encoding) -> Self {
        Self {
            headers,
            backing: Backing::Memory(Vec::new()),
            size: 0,
            charset,
        }
    }

    /// Append body bytes, spilling to disk once the accumulated size
    /// would exceed `memfile_limit`.
    pub(crate) fn append(&mut self, data: &[u8], memfile_limit: u64) -> io::Result<()> {
        match &mut self.backing {
            Backing::Memory(buf) => {
                if self.size + data.len() as u64 > memfile_limit {
                    debug!(
                        name = self.headers.name.as_str(),
                        buffered = self.size,
                        "part body spilling to temp file"
                    );
                    let mut file = NamedTempFile::new()?;
                    file.write_all(buf)?;
                    file.write_all(data)?;
                    self.backing = Backing::File(file);
                } else {
                    buf.extend_from_slice(data);
                }
            }
            Backing::File(file) => file.write_all(data)?,
        }
        self.size += data.len() as u64;
        Ok(())
    }

    /// The `name` option of the part's `Content-Disposition`.
    pub fn name(&self) -> &str {
        &self.headers.name
    }

    /// The `filename` option, if the part is a file upload.
    pub fn filename(&self) -> Option<&str> {
        self.headers.filename.as_deref()
    }

    /// The part's content type (explicit or defaulted).
    pub fn content_type(&self) -> &str {
        &self.headers.content_type
    }

    /// Total body size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The full parsed header block.
    pub fn headers(&self) -> &SegmentHeaders {
        &self.headers
    }

    /// `true` when the segment announced itself as a file upload.
    pub fn is_file(&self) -> bool {
        self.headers.is_file()
    }

    /// `true` once the body has spilled to a temp file.
    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Backing::File(_))
    }

    /// The body bytes, when still held in memory.
    pub fn memory_bytes(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Memory(buf) => Some(buf),
            Backing::File(_) => None,
        }
    }

    /// Filesystem path of the spill file, while one exists. The file is
    /// deleted when the part is closed or dropped.
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::File(file) => Some(file.path()),
        }
    }

    /// The charset used to decode this part as text: the `charset`
    /// option of its own `Content-Type` when recognized, else the
    /// parser-wide configured charset.
    pub fn charset(&self) -> &'static Encoding {
        self.headers
            .charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(self.charset)
    }

    /// Decode an in-memory body as text.
    ///
    /// # Errors
    ///
    /// [`MultipartError::LimitReached`] when the body spilled to disk;
    /// bodies that large are not meant to be handled as field values.
    pub fn value(&self) -> Result<String, MultipartError> {
        match &self.backing {
            Backing::Memory(buf) => {
                let (text, ..) = self.charset().decode(buf);
                Ok(text.into_owned())
            }
            Backing::File(_) => Err(MultipartError::LimitReached("memfile_limit")),
        }
    }

    /// The raw body bytes, read back from disk if necessary.
    pub fn raw(&self) -> Result<Vec<u8>, MultipartError> {
        match &self.backing {
            Backing::Memory(buf) => Ok(buf.clone()),
            Backing::File(file) => {
                let mut out = Vec::new();
                file.reopen()?.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }

    /// A fresh reader over the body, positioned at offset 0.
    pub fn reader(&self) -> Result<PartReader<'_>, MultipartError> {
        match &self.backing {
            Backing::Memory(buf) => Ok(PartReader(ReaderKind::Memory(Cursor::new(buf)))),
            Backing::File(file) => Ok(PartReader(ReaderKind::File(file.reopen()?))),
        }
    }

    /// Stream the body to `path`. The part keeps its backing, so this
    /// can be called more than once.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<u64, MultipartError> {
        let mut dest = File::create(path)?;
        let mut src = self.reader()?;
        let written = io::copy(&mut src, &mut dest)?;
        Ok(written)
    }

    /// Release the body backing, deleting any temp file. Dropping the
    /// part has the same effect.
    pub fn close(self) {
        drop(self);
    }
}

/// Readable handle over a part body, starting at offset 0.
#[derive(Debug)]
pub struct PartReader<'a>(ReaderKind<'a>);

#[derive(Debug)]
enum ReaderKind<'a> {
    Memory(Cursor<&'a Vec<u8>>),
    File(File),
}

impl Read for PartReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.0 {
            ReaderKind::Memory(cursor) => cursor.read(buf),
            ReaderKind::File(file) => file.read(buf),
        }
    }
}

// ---------------------------------------------------------------------------
// MultipartReader
// ---------------------------------------------------------------------------

/// Buffered multipart reader over a blocking byte source.
///
/// Drives a [`PushParser`] from `buffer_size` reads and materializes
/// each segment into a [`Part`]. Parts come back in stream order, either
/// streamed one at a time with [`next_part`](MultipartReader::next_part)
/// or drained and memoized with [`parts`](MultipartReader::parts).
///
/// Temp files of in-flight parts are removed on every exit path: parts
/// delete their backing on drop, and so does the reader for a part it
/// still owns when an error aborts iteration.
pub struct MultipartReader<R> {
    source: R,
    parser: PushParser,
    read_buf: Vec<u8>,
    memfile_limit: u64,
    mem_limit: u64,
    disk_limit: u64,
    charset: &'static Encoding,

    current: Option<Part>,
    queue: VecDeque<Part>,
    cached: Vec<Part>,
    mem_used: u64,
    disk_used: u64,
    drained: bool,
    error: Option<MultipartError>,
}

impl<R: Read> MultipartReader<R> {
    /// Create a reader with default configuration (lenient mode).
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidBoundary`] if the boundary
    /// violates RFC 2046.
    pub fn new(source: R, boundary: &[u8]) -> Result<Self, MultipartError> {
        Self::with_config(source, boundary, ReaderConfig::default())
    }

    /// Create a reader with custom limits.
    pub fn with_config(
        source: R,
        boundary: &[u8],
        config: ReaderConfig,
    ) -> Result<Self, MultipartError> {
        let charset = config.parser.charset;
        let parser = PushParser::with_config(boundary, config.parser)?;
        Ok(Self {
            source,
            parser,
            read_buf: vec![0; config.buffer_size.max(1)],
            memfile_limit: config.memfile_limit,
            mem_limit: config.mem_limit,
            disk_limit: config.disk_limit,
            charset,
            current: None,
            queue: VecDeque::new(),
            cached: Vec::new(),
            mem_used: 0,
            disk_used: 0,
            drained: false,
            error: None,
        })
    }

    /// The next completed part, or `None` once the stream terminator has
    /// been consumed. Parts returned here are handed off and do not end
    /// up in the memoized [`parts`](MultipartReader::parts) slice.
    ///
    /// # Errors
    ///
    /// Any [`MultipartError`] from the parser, the limits, or the source.
    pub fn next_part(&mut self) -> Result<Option<Part>, MultipartError> {
        loop {
            // Parts completed before a fault are still handed out; the
            // stored error surfaces once the queue is empty.
            if let Some(part) = self.queue.pop_front() {
                return Ok(Some(part));
            }
            if let Some(err) = &self.error {
                return Err(err.clone());
            }
            if self.drained {
                return Ok(None);
            }
            if let Err(err) = self.pump() {
                // Release the in-flight part (and its temp file) now.
                self.current = None;
                self.error = Some(err);
            }
        }
    }

    /// Parse the remaining input and return all parts in stream order.
    ///
    /// The result is memoized: repeated calls never re-read the source.
    pub fn parts(&mut self) -> Result<&[Part], MultipartError> {
        while let Some(part) = self.next_part()? {
            self.cached.push(part);
        }
        Ok(&self.cached)
    }

    /// The first part with the given field name, if any.
    pub fn get(&mut self, name: &str) -> Result<Option<&Part>, MultipartError> {
        Ok(self.parts()?.iter().find(|p| p.name() == name))
    }

    /// Consume the reader and return all parts.
    pub fn into_parts(mut self) -> Result<Vec<Part>, MultipartError> {
        self.parts()?;
        Ok(std::mem::take(&mut self.cached))
    }

    /// Read one chunk from the source and feed it through the parser,
    /// moving completed parts onto the queue.
    fn pump(&mut self) -> Result<(), MultipartError> {
        let n = self.source.read(&mut self.read_buf)?;
        if n == 0 {
            self.parser.parse(&[])?;
            self.parser.close()?;
            self.drained = true;
            return Ok(());
        }

        let mut events = self.parser.parse(&self.read_buf[..n])?;
        while let Some(event) = events.next()? {
            match event {
                ParseEvent::Headers(headers) => {
                    self.current = Some(Part::new(headers, self.charset));
                }
                ParseEvent::Data(data) => {
                    let Some(part) = self.current.as_mut() else {
                        unreachable!("data event before segment headers");
                    };
                    let was_spilled = part.is_spilled();
                    let before = part.size();
                    part.append(data, self.memfile_limit)?;

                    if part.is_spilled() {
                        if was_spilled {
                            self.disk_used += data.len() as u64;
                        } else {
                            // The whole body just moved to disk.
                            self.mem_used -= before;
                            self.disk_used += part.size();
                        }
                        if self.disk_used > self.disk_limit {
                            return Err(MultipartError::LimitReached("disk_limit"));
                        }
                    } else {
                        self.mem_used += data.len() as u64;
                        if self.mem_used > self.mem_limit {
                            return Err(MultipartError::LimitReached("mem_limit"));
                        }
                    }
                }
                ParseEvent::End => {
                    let Some(part) = self.current.take() else {
                        unreachable!("segment end before segment headers");
                    };
                    self.queue.push_back(part);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn headers(name: &str, filename: Option<&str>) -> SegmentHeaders {
        SegmentHeaders {
            index: 0,
            headers: Vec::new(),
            name: name.to_owned(),
            filename: filename.map(str::to_owned),
            content_type: "text/plain".to_owned(),
        }
    }

    #[test]
    fn part_stays_in_memory_below_threshold() {
        let mut part = Part::new(headers("a", None), UTF_8);
        part.append(b"hello", 100).unwrap();
        assert!(!part.is_spilled());
        assert_eq!(part.size(), 5);
        assert_eq!(part.value().unwrap(), "hello");
        assert_eq!(part.raw().unwrap(), b"hello");
    }

    #[test]
    fn part_spills_past_threshold() {
        let mut part = Part::new(headers("a", None), UTF_8);
        part.append(b"0123456789", 16).unwrap();
        assert!(!part.is_spilled());
        part.append(b"0123456789", 16).unwrap();
        assert!(part.is_spilled());
        assert_eq!(part.size(), 20);
        assert_eq!(part.raw().unwrap(), b"01234567890123456789");
        assert!(part.value().is_err());
    }

    #[test]
    fn spilled_reader_starts_at_zero() {
        let mut part = Part::new(headers("a", None), UTF_8);
        part.append(b"abcdef", 2).unwrap();
        let mut out = Vec::new();
        part.reader().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
        // A second reader sees the same bytes again.
        let mut again = Vec::new();
        part.reader().unwrap().read_to_end(&mut again).unwrap();
        assert_eq!(again, b"abcdef");
    }

    #[test]
    fn append_after_spill_goes_to_disk() {
        let mut part = Part::new(headers("a", None), UTF_8);
        part.append(b"aaaa", 2).unwrap();
        part.append(b"bbbb", 2).unwrap();
        assert_eq!(part.raw().unwrap(), b"aaaabbbb");
    }
}

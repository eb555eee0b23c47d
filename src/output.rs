use serde::Serialize;

use crate::builder::Part;
use crate::types::Header;

/// Flat, serializable view of a parsed part for JSON output.
#[derive(Serialize)]
struct PartRecord<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
    content_type: &'a str,
    size: u64,
    headers: &'a [Header],
    /// Body text for in-memory parts; `None` once spilled to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

impl<'a> PartRecord<'a> {
    fn from_part(part: &'a Part) -> Self {
        Self {
            name: part.name(),
            filename: part.filename(),
            content_type: part.content_type(),
            size: part.size(),
            headers: &part.headers().headers,
            body: part
                .memory_bytes()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Serialize parsed parts to a JSON array.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(parts: &[Part], pretty: bool) -> String {
    let records: Vec<PartRecord<'_>> = parts.iter().map(PartRecord::from_part).collect();
    if pretty {
        serde_json::to_string_pretty(&records).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(&records).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Render parsed parts in a human-readable debug format.
pub fn format_debug(parts: &[Part]) -> String {
    let mut out = String::with_capacity(256);

    out.push_str(&format!("=== Multipart Form ({} parts) ===\n", parts.len()));

    for part in parts {
        out.push_str(&format!("\n--- Part {}: {:?} ---\n", part.headers().index, part.name()));
        if let Some(filename) = part.filename() {
            out.push_str(&format!("Filename:     {filename}\n"));
        }
        out.push_str(&format!("Content-Type: {}\n", part.content_type()));
        out.push_str(&format!("Size:         {} bytes\n", part.size()));

        match part.memory_bytes() {
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => out.push_str(&format!("Body:         {s}\n")),
                Err(_) => {
                    out.push_str(&format!("Body:         <binary data: {} bytes>\n", bytes.len()));
                }
            },
            None => {
                out.push_str(&format!("Body:         <spilled to disk: {} bytes>\n", part.size()));
            }
        }
    }

    out.push_str("=============================\n");
    out
}

/// Render only the header blocks of the parsed parts (no bodies).
pub fn format_headers_only(parts: &[Part]) -> String {
    let mut out = String::with_capacity(64 + parts.len() * 80);

    for part in parts {
        for header in &part.headers().headers {
            out.push_str(&format!("{}: {}\n", header.name, header.value));
        }
        out.push('\n');
    }

    out
}

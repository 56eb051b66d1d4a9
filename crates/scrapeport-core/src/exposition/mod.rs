//! Exposition formats and content negotiation.
//!
//! - Text: `text/plain; version=0.0.4`, the default.
//! - Protobuf: length-delimited `io.prometheus.client.MetricFamily` records,
//!   chosen only when the Accept header asks for it explicitly.

pub mod proto;
pub mod text;

use std::io::Write;

use crate::error::Result;
use crate::registry::Snapshot;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
pub const PROTOBUF_CONTENT_TYPE: &str =
    "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited";

const PROTOBUF_MEDIA_TYPE: &str = "application/vnd.google.protobuf";
const PROTOBUF_PROTO_PARAM: &str = "io.prometheus.client.MetricFamily";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Protobuf,
}

impl ContentType {
    /// Value for the `Content-Type` response header.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => TEXT_CONTENT_TYPE,
            ContentType::Protobuf => PROTOBUF_CONTENT_TYPE,
        }
    }

    /// Short label used in logs and self-metrics.
    pub fn format_name(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Protobuf => "protobuf",
        }
    }

    /// Pick the response format from an `Accept` header.
    ///
    /// Protobuf is selected when any media range names
    /// `application/vnd.google.protobuf`, its `proto` and `encoding`
    /// parameters (if present) match the delimited MetricFamily stream, and
    /// it is not excluded with `q=0`. Everything else falls back to text.
    pub fn negotiate(accept: Option<&str>) -> ContentType {
        let Some(accept) = accept else { return ContentType::Text; };

        for range in accept.split(',') {
            let mut parts = range.split(';');
            let media = parts.next().unwrap_or("").trim();
            if !media.eq_ignore_ascii_case(PROTOBUF_MEDIA_TYPE) {
                continue;
            }

            let mut acceptable = true;
            for param in parts {
                let Some((k, v)) = param.split_once('=') else { continue; };
                let k = k.trim();
                let v = v.trim().trim_matches('"');
                if k.eq_ignore_ascii_case("proto") && v != PROTOBUF_PROTO_PARAM {
                    acceptable = false;
                } else if k.eq_ignore_ascii_case("encoding") && !v.eq_ignore_ascii_case("delimited") {
                    acceptable = false;
                } else if k.eq_ignore_ascii_case("q") && v.parse::<f64>().map_or(false, |q| q <= 0.0) {
                    acceptable = false;
                }
            }
            if acceptable {
                return ContentType::Protobuf;
            }
        }

        ContentType::Text
    }
}

/// Serialize `snapshot` in `content_type` into `sink`.
pub fn process_scrape_request<W: Write>(
    snapshot: &Snapshot,
    content_type: ContentType,
    sink: &mut W,
) -> Result<()> {
    match content_type {
        ContentType::Text => {
            let body = text::render(snapshot);
            sink.write_all(body.as_bytes())?;
        }
        ContentType::Protobuf => {
            let body = proto::encode_delimited(snapshot)?;
            sink.write_all(&body)?;
        }
    }
    sink.flush()?;
    Ok(())
}

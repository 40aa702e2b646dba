//! Fetching upstream media and relaying it with Range semantics

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{future, StreamExt};
use reqwest::header::{HeaderName, CONTENT_RANGE, CONTENT_TYPE, RANGE, USER_AGENT};
use reqwest::StatusCode;
use std::fmt;
use std::io;

use super::range::{ByteRange, ContentRange};
use crate::constants::BROWSER_USER_AGENT;
use crate::error::StrategyError;

pub type BodyStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Upstream audio ready to be relayed
pub struct AudioStream {
    pub content_type: String,
    /// Span present in `body` when upstream already answered a range
    pub served: Option<ContentRange>,
    /// Size of the whole resource, when declared
    pub total_len: Option<u64>,
    pub body: BodyStream,
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioStream")
            .field("content_type", &self.content_type)
            .field("served", &self.served)
            .field("total_len", &self.total_len)
            .finish_non_exhaustive()
    }
}

/// How a stream is delivered to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 200 with the body as is
    Full { length: Option<u64> },
    /// 206 with the body as is; upstream already cut it
    Partial(ContentRange),
    /// 206 after cutting the span out of a full body locally
    Slice(ContentRange),
}

impl Delivery {
    pub fn content_range(&self) -> Option<ContentRange> {
        match *self {
            Delivery::Full { .. } => None,
            Delivery::Partial(range) | Delivery::Slice(range) => Some(range),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        match *self {
            Delivery::Full { length } => length,
            Delivery::Partial(range) | Delivery::Slice(range) => Some(range.length()),
        }
    }
}

impl AudioStream {
    /// A complete body of `total_len` bytes
    pub fn full(content_type: &str, total_len: Option<u64>, body: BodyStream) -> Self {
        Self {
            content_type: content_type.to_string(),
            served: None,
            total_len,
            body,
        }
    }

    /// Decide how to answer a client that asked for `requested`.
    ///
    /// A start past the end of the resource falls back to the full body.
    pub fn delivery(&self, requested: Option<ByteRange>) -> Delivery {
        if let Some(served) = self.served {
            return Delivery::Partial(served);
        }
        match (requested, self.total_len) {
            (Some(range), Some(total)) => match range.resolve(total) {
                Some((start, end)) => Delivery::Slice(ContentRange {
                    start,
                    end,
                    total: Some(total),
                }),
                None => Delivery::Full {
                    length: Some(total),
                },
            },
            _ => Delivery::Full {
                length: self.total_len,
            },
        }
    }

    /// Body to send for `delivery`
    pub fn into_body(self, delivery: Delivery) -> BodyStream {
        match delivery {
            Delivery::Slice(range) => slice_body(self.body, range.start, range.length()),
            _ => self.body,
        }
    }
}

/// Skip `start` bytes of `body` and yield the next `len`
pub fn slice_body(body: BodyStream, start: u64, len: u64) -> BodyStream {
    let end = start.saturating_add(len);
    body.scan(0u64, move |pos, chunk| {
        let item = match chunk {
            Err(e) => Some(Err(e)),
            Ok(bytes) => {
                let chunk_start = *pos;
                let chunk_len = bytes.len() as u64;
                *pos += chunk_len;
                if chunk_start >= end {
                    None
                } else {
                    let from = start.saturating_sub(chunk_start).min(chunk_len) as usize;
                    let to = (end - chunk_start).min(chunk_len) as usize;
                    Some(Ok(bytes.slice(from..to)))
                }
            }
        };
        future::ready(item)
    })
    .filter(|item| future::ready(!matches!(item, Ok(bytes) if bytes.is_empty())))
    .boxed()
}

/// GET `url`, forwarding `range`, and wrap the response for relaying.
///
/// `mime_hint` and `known_len` fill in what upstream does not declare.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    range: Option<ByteRange>,
    mime_hint: &str,
    known_len: Option<u64>,
) -> Result<AudioStream, StrategyError> {
    // A range past the known end cannot be served; ask for the whole body
    let range = range.filter(|r| known_len.map_or(true, |total| r.resolve(total).is_some()));
    let mut response = get(client, url, range).send().await?;
    if response.status() == StatusCode::RANGE_NOT_SATISFIABLE && range.is_some() {
        tracing::debug!("Upstream rejected {:?}, refetching without a range", range);
        response = get(client, url, None).send().await?;
    }

    let status = response.status();
    if !status.is_success() {
        return Err(StrategyError::Status(status.as_u16()));
    }

    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let content_type = header(CONTENT_TYPE)
        .filter(|ct| ct.starts_with("audio/") || ct.starts_with("video/"))
        .unwrap_or_else(|| mime_hint.to_string());

    let served = if status == StatusCode::PARTIAL_CONTENT {
        let raw = header(CONTENT_RANGE)
            .ok_or_else(|| StrategyError::Parse("206 without Content-Range".into()))?;
        Some(
            ContentRange::parse(&raw)
                .ok_or_else(|| StrategyError::Parse(format!("bad Content-Range: {}", raw)))?,
        )
    } else {
        None
    };

    let total_len = match served {
        Some(range) => range.total.or(known_len),
        None => response.content_length().or(known_len),
    };

    tracing::debug!(
        "Upstream answered {} ({}, total {:?})",
        status,
        content_type,
        total_len
    );

    let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other)).boxed();
    Ok(AudioStream {
        content_type,
        served,
        total_len,
        body,
    })
}

fn get(client: &reqwest::Client, url: &str, range: Option<ByteRange>) -> reqwest::RequestBuilder {
    let request = client.get(url).header(USER_AGENT, BROWSER_USER_AGENT);
    match range {
        Some(range) => request.header(RANGE, range.to_string()),
        None => request,
    }
}

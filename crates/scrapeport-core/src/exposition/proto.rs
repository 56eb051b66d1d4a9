//! Delimited protobuf exposition.
//!
//! Messages mirror `io.prometheus.client` from the upstream `metrics.proto`
//! (proto2, same field numbers), so the varint-length-prefixed stream is
//! byte-compatible with existing scrapers.

use bytes::{Buf, Bytes, BytesMut};
use prost::Message;

use crate::error::{Result, ScrapeError};
use crate::metric::{self, MetricKind, PointValue};
use crate::registry::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    Counter = 0,
    Gauge = 1,
    Summary = 2,
    Untyped = 3,
    Histogram = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LabelPair {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Gauge {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Counter {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Quantile {
    #[prost(double, optional, tag = "1")]
    pub quantile: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Summary {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub quantile: Vec<Quantile>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Untyped {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Bucket {
    #[prost(uint64, optional, tag = "1")]
    pub cumulative_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub upper_bound: Option<f64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Histogram {
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: Option<u64>,
    #[prost(double, optional, tag = "2")]
    pub sample_sum: Option<f64>,
    #[prost(message, repeated, tag = "3")]
    pub bucket: Vec<Bucket>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Metric {
    #[prost(message, repeated, tag = "1")]
    pub label: Vec<LabelPair>,
    #[prost(message, optional, tag = "2")]
    pub gauge: Option<Gauge>,
    #[prost(message, optional, tag = "3")]
    pub counter: Option<Counter>,
    #[prost(message, optional, tag = "4")]
    pub summary: Option<Summary>,
    #[prost(message, optional, tag = "5")]
    pub untyped: Option<Untyped>,
    #[prost(int64, optional, tag = "6")]
    pub timestamp_ms: Option<i64>,
    #[prost(message, optional, tag = "7")]
    pub histogram: Option<Histogram>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MetricFamily {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub help: Option<String>,
    #[prost(enumeration = "MetricType", optional, tag = "3")]
    pub r#type: Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub metric: Vec<Metric>,
}

fn metric_type(kind: MetricKind) -> MetricType {
    match kind {
        MetricKind::Counter => MetricType::Counter,
        MetricKind::Gauge => MetricType::Gauge,
        MetricKind::Histogram => MetricType::Histogram,
        MetricKind::Summary => MetricType::Summary,
        MetricKind::Untyped => MetricType::Untyped,
    }
}

/// Convert one collected family into its wire message.
pub fn to_proto(family: &metric::MetricFamily) -> MetricFamily {
    let metric = family
        .points
        .iter()
        .map(|point| {
            let mut m = Metric {
                label: family
                    .label_names
                    .iter()
                    .zip(point.label_values.iter())
                    .map(|(k, v)| LabelPair {
                        name: Some(k.clone()),
                        value: Some(v.clone()),
                    })
                    .collect(),
                timestamp_ms: point.timestamp_ms,
                ..Default::default()
            };
            match &point.value {
                PointValue::Counter(v) => m.counter = Some(Counter { value: Some(*v) }),
                PointValue::Gauge(v) => m.gauge = Some(Gauge { value: Some(*v) }),
                PointValue::Untyped(v) => m.untyped = Some(Untyped { value: Some(*v) }),
                PointValue::Histogram(h) => {
                    m.histogram = Some(Histogram {
                        sample_count: Some(h.count),
                        sample_sum: Some(h.sum),
                        bucket: h
                            .buckets
                            .iter()
                            .map(|b| Bucket {
                                cumulative_count: Some(b.cumulative_count),
                                upper_bound: Some(b.upper_bound),
                            })
                            .collect(),
                    })
                }
                PointValue::Summary(s) => {
                    m.summary = Some(Summary {
                        sample_count: Some(s.count),
                        sample_sum: Some(s.sum),
                        quantile: s
                            .quantiles
                            .iter()
                            .map(|(q, v)| Quantile {
                                quantile: Some(*q),
                                value: Some(*v),
                            })
                            .collect(),
                    })
                }
            }
            m
        })
        .collect();

    MetricFamily {
        name: Some(family.name.clone()),
        help: Some(family.help.clone()),
        r#type: Some(metric_type(family.kind) as i32),
        metric,
    }
}

/// Encode every family as a varint-length-prefixed record.
pub fn encode_delimited(snapshot: &Snapshot) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    for family in &snapshot.families {
        to_proto(family)
            .encode_length_delimited(&mut buf)
            .map_err(|e| ScrapeError::Io(format!("protobuf encode failed: {e}")))?;
    }
    Ok(buf.freeze())
}

/// Decode a delimited stream back into wire messages.
pub fn decode_delimited(mut buf: Bytes) -> Result<Vec<MetricFamily>> {
    let mut out = Vec::new();
    while buf.has_remaining() {
        let family = MetricFamily::decode_length_delimited(&mut buf).map_err(|e| {
            ScrapeError::Parse(format!("record {}: {e}", out.len()))
        })?;
        out.push(family);
    }
    Ok(out)
}

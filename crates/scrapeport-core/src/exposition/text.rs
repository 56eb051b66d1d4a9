//! Text exposition format (version 0.0.4): renderer and parser.
//!
//! ```text
//! # HELP http_requests_total Requests served.
//! # TYPE http_requests_total counter
//! http_requests_total{method="GET"} 12
//! ```
//!
//! Labels keep the family's declared order, with `le` / `quantile` last.

use std::fmt::Write;

use crate::error::{Result, ScrapeError};
use crate::metric::{format_float, is_valid_metric_name, parse_float, MetricKind, Sample};
use crate::registry::Snapshot;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape_help(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    let mut chars = v.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn write_sample(out: &mut String, s: &Sample) {
    out.push_str(&s.name);
    if !s.labels.is_empty() {
        let label_str = s
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");
        let _ = write!(out, "{{{}}}", label_str);
    }
    let _ = write!(out, " {}", format_float(s.value));
    if let Some(ts) = s.timestamp_ms {
        let _ = write!(out, " {}", ts);
    }
    out.push('\n');
}

/// Render a snapshot in the text exposition format.
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for family in &snapshot.families {
        if family.help.is_empty() {
            let _ = writeln!(out, "# HELP {}", family.name);
        } else {
            let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        }
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for sample in family.samples() {
            write_sample(&mut out, &sample);
        }
    }
    out
}

/// One family as read back from text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFamily {
    pub name: String,
    pub help: Option<String>,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl TextFamily {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            kind: MetricKind::Untyped,
            samples: Vec::new(),
        }
    }

    fn owns(&self, sample_name: &str) -> bool {
        if sample_name == self.name {
            return true;
        }
        let suffixes: &[&str] = match self.kind {
            MetricKind::Histogram => &["_bucket", "_sum", "_count"],
            MetricKind::Summary => &["_sum", "_count"],
            _ => &[],
        };
        sample_name
            .strip_prefix(self.name.as_str())
            .is_some_and(|rest| suffixes.contains(&rest))
    }
}

fn parse_err(line: usize, msg: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Parse(format!("line {line}: {msg}"))
}

/// Parse text exposition input into families.
///
/// `# HELP` / `# TYPE` open or update a family; samples attach to the most
/// recent family that owns their name (directly or via a histogram/summary
/// suffix), otherwise they start a new untyped family.
pub fn parse(input: &str) -> Result<Vec<TextFamily>> {
    let mut families: Vec<TextFamily> = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let lineno = idx + 1;
        // Trailing whitespace is significant in HELP text, so only samples are trimmed at the end.
        let line = raw.trim_start();
        if line.trim_end().is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim_start();
            if let Some(rest) = keyword(comment, "HELP") {
                let (name, help) = rest.split_once(' ').unwrap_or((rest, ""));
                if !is_valid_metric_name(name) {
                    return Err(parse_err(lineno, format!("invalid metric name {name:?}")));
                }
                family_mut(&mut families, name).help = Some(unescape_help(help));
            } else if let Some(rest) = keyword(comment, "TYPE") {
                let mut it = rest.split_whitespace();
                let (Some(name), Some(kind)) = (it.next(), it.next()) else {
                    return Err(parse_err(lineno, "TYPE needs a name and a kind"));
                };
                let kind = MetricKind::parse(kind)
                    .ok_or_else(|| parse_err(lineno, format!("unknown metric kind {kind:?}")))?;
                family_mut(&mut families, name).kind = kind;
            }
            continue;
        }

        let sample = parse_sample(line.trim_end(), lineno)?;
        match families.last_mut() {
            Some(f) if f.owns(&sample.name) => f.samples.push(sample),
            _ => {
                let mut f = TextFamily::new(&sample.name);
                f.samples.push(sample);
                families.push(f);
            }
        }
    }

    Ok(families)
}

/// Text after `kw` and the whitespace that must follow it; `# HELPER` is a plain comment.
fn keyword<'a>(comment: &'a str, kw: &str) -> Option<&'a str> {
    let rest = comment.strip_prefix(kw)?;
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => Some(chars.as_str().trim_start_matches([' ', '\t'])),
        _ => None,
    }
}

/// Flat list of every sample in `input`.
pub fn parse_samples(input: &str) -> Result<Vec<Sample>> {
    Ok(parse(input)?.into_iter().flat_map(|f| f.samples).collect())
}

fn family_mut<'a>(families: &'a mut Vec<TextFamily>, name: &str) -> &'a mut TextFamily {
    let reuse = families.last().is_some_and(|f| f.name == name);
    if !reuse {
        families.push(TextFamily::new(name));
    }
    let last = families.len() - 1;
    &mut families[last]
}

fn parse_sample(line: &str, lineno: usize) -> Result<Sample> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| parse_err(lineno, "sample has no value"))?;
    let name = &line[..name_end];
    if !is_valid_metric_name(name) {
        return Err(parse_err(lineno, format!("invalid metric name {name:?}")));
    }

    let mut rest = &line[name_end..];
    let mut labels = Vec::new();
    if let Some(body) = rest.strip_prefix('{') {
        let (parsed, after) = parse_labels(body, lineno)?;
        labels = parsed;
        rest = after;
    }

    let mut fields = rest.split_whitespace();
    let value_str = fields
        .next()
        .ok_or_else(|| parse_err(lineno, "sample has no value"))?;
    let value = parse_float(value_str)
        .ok_or_else(|| parse_err(lineno, format!("invalid value {value_str:?}")))?;
    let timestamp_ms = match fields.next() {
        Some(ts) => Some(
            ts.parse::<i64>()
                .map_err(|_| parse_err(lineno, format!("invalid timestamp {ts:?}")))?,
        ),
        None => None,
    };
    if fields.next().is_some() {
        return Err(parse_err(lineno, "trailing data after timestamp"));
    }

    Ok(Sample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parse `k="v",...}`; returns the labels and the input following `}`.
fn parse_labels(body: &str, lineno: usize) -> Result<(Vec<(String, String)>, &str)> {
    let mut labels = Vec::new();
    let mut chars = body.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        match chars.peek() {
            Some(&(i, '}')) => return Ok((labels, &body[i + 1..])),
            None => return Err(parse_err(lineno, "unterminated label set")),
            _ => {}
        }

        let mut key = String::new();
        while let Some((_, c)) = chars.next_if(|(_, c)| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next().map(|(_, c)| c) != Some('=') {
            return Err(parse_err(lineno, format!("expected '=' after label {key:?}")));
        }
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next().map(|(_, c)| c) != Some('"') {
            return Err(parse_err(lineno, format!("label {key:?} value must be quoted")));
        }

        let mut value = String::new();
        loop {
            match chars.next() {
                Some((_, '"')) => break,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(parse_err(lineno, "unterminated label value")),
                },
                Some((_, c)) => value.push(c),
                None => return Err(parse_err(lineno, "unterminated label value")),
            }
        }
        labels.push((key, value));

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        match chars.next() {
            Some((_, ',')) => continue,
            Some((i, '}')) => return Ok((labels, &body[i + 1..])),
            _ => return Err(parse_err(lineno, "expected ',' or '}' in label set")),
        }
    }
}

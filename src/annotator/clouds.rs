//! # clouds.yaml Normalization
//!
//! The root secret carries an OpenStack `clouds.yaml`. Installers often author
//! it with `cacert` pointing at a path that only existed on the installing
//! host, while consumers see the CA bundle at a fixed mount path. This module
//! rewrites `clouds.openstack.cacert` to that path and nothing else.

use super::error::AnnotatorError;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;

/// Top level of a `clouds.yaml` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CloudsConfig {
    #[serde(default)]
    pub clouds: Clouds,
    /// Top-level keys other than `clouds`, kept verbatim
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Clouds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenStackCloud>,
    /// Clouds other than `openstack`, kept verbatim
    #[serde(flatten)]
    pub other: Mapping,
}

/// The `clouds.openstack` entry
///
/// Only `cacert` is ever modified; every other value is carried as read.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenStackCloud {
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub auth: Mapping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_api_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Value>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl CloudsConfig {
    pub fn parse(payload: &[u8]) -> Result<Self, AnnotatorError> {
        serde_yaml::from_slice(payload).map_err(AnnotatorError::MalformedConfig)
    }

    /// Configured CA certificate path, `None` when absent or empty
    #[must_use]
    pub fn ca_cert(&self) -> Option<&str> {
        self.clouds
            .openstack
            .as_ref()
            .and_then(|cloud| cloud.cacert.as_deref())
            .filter(|path| !path.is_empty())
    }
}

/// Result of [`normalize_ca_cert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayload<'a> {
    /// Payload to store; borrowed from the input when nothing changed
    pub payload: Cow<'a, [u8]>,
    pub changed: bool,
}

/// Point `clouds.openstack.cacert` at `canonical_path`
///
/// A document without a CA certificate, or already using the canonical path,
/// is returned byte-for-byte. Otherwise only the text of the `cacert` value is
/// replaced, so every other scalar, comment and key keeps its original
/// spelling. A document that does not parse is an error and must not be
/// written back.
pub fn normalize_ca_cert<'a>(
    payload: &'a [u8],
    canonical_path: &str,
) -> Result<NormalizedPayload<'a>, AnnotatorError> {
    let config = CloudsConfig::parse(payload)?;

    let unchanged = NormalizedPayload {
        payload: Cow::Borrowed(payload),
        changed: false,
    };
    match config.ca_cert() {
        None => return Ok(unchanged),
        Some(path) if path == canonical_path => return Ok(unchanged),
        Some(_) => {}
    }

    let rewrite_error = |reason: String| AnnotatorError::CaCertRewrite { reason };
    let text = std::str::from_utf8(payload).map_err(|e| rewrite_error(e.to_string()))?;
    let scalar = serde_yaml::to_string(canonical_path)
        .map_err(|e| rewrite_error(format!("cannot encode {canonical_path:?}: {e}")))?;
    let rewritten = replace_ca_cert_value(text, scalar.trim_end()).ok_or_else(|| {
        rewrite_error("cacert is not a single-line scalar under clouds.openstack".to_string())
    })?;

    let mut expected = config;
    if let Some(cloud) = expected.clouds.openstack.as_mut() {
        cloud.cacert = Some(canonical_path.to_string());
    }
    let actual = CloudsConfig::parse(rewritten.as_bytes())
        .map_err(|e| rewrite_error(format!("rewritten document does not parse: {e}")))?;
    if actual != expected {
        return Err(rewrite_error(
            "rewritten document differs from the original beyond cacert".to_string(),
        ));
    }

    Ok(NormalizedPayload {
        payload: Cow::Owned(rewritten.into_bytes()),
        changed: true,
    })
}

const CA_CERT_PARENTS: [&str; 2] = ["clouds", "openstack"];
const CA_CERT_KEY: &str = "cacert";

/// Replace the value of `clouds.openstack.cacert` in block-style YAML text
///
/// Walks the lines keeping a stack of enclosing keys by indentation. Returns
/// `None` when the value is not a single-line plain or quoted scalar.
fn replace_ca_cert_value(text: &str, scalar: &str) -> Option<String> {
    let mut parents: Vec<(usize, &str)> = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);
        let body = content.trim_start_matches(' ');
        if body.is_empty() || body.starts_with('#') || body.starts_with("---") {
            continue;
        }
        let indent = content.len() - body.len();
        while parents.last().is_some_and(|(depth, _)| *depth >= indent) {
            parents.pop();
        }

        let Some((key, rest)) = split_key(body) else {
            continue;
        };
        let under_openstack = parents.len() == CA_CERT_PARENTS.len()
            && parents
                .iter()
                .zip(CA_CERT_PARENTS)
                .all(|((_, parent), expected)| *parent == expected);
        if under_openstack && key == CA_CERT_KEY {
            let (lead, len) = scalar_span(rest)?;
            let from = line_start + indent + (body.len() - rest.len()) + lead;
            let mut out = String::with_capacity(text.len() + scalar.len());
            out.push_str(&text[..from]);
            out.push_str(scalar);
            out.push_str(&text[from + len..]);
            return Some(out);
        }
        parents.push((indent, key));
    }
    None
}

/// Split `key: rest` into the unquoted key and whatever follows the colon
fn split_key(body: &str) -> Option<(&str, &str)> {
    if body == "-" || body.starts_with("- ") {
        return None;
    }
    let (key, after) = match body.chars().next()? {
        quote @ ('"' | '\'') => {
            let close = body[1..].find(quote)? + 1;
            (&body[1..close], &body[close + 1..])
        }
        _ => {
            let colon = body
                .match_indices(':')
                .map(|(i, _)| i)
                .find(|&i| matches!(body.as_bytes().get(i + 1), None | Some(b' ')))?;
            (body[..colon].trim_end(), &body[colon..])
        }
    };
    let rest = after.strip_prefix(':')?;
    (rest.is_empty() || rest.starts_with(' ')).then_some((key, rest))
}

/// Leading spaces and length of the scalar at the start of `rest`
fn scalar_span(rest: &str) -> Option<(usize, usize)> {
    let value = rest.trim_start_matches(' ');
    let lead = rest.len() - value.len();
    let len = match value.chars().next()? {
        '"' => closing_double_quote(value)? + 1,
        '\'' => closing_single_quote(value)? + 1,
        '|' | '>' | '&' | '*' | '!' | '{' | '[' | '#' => return None,
        _ => {
            let end = value.find(" #").unwrap_or(value.len());
            value[..end].trim_end().len()
        }
    };
    Some((lead, len))
}

fn closing_double_quote(value: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in value.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn closing_single_quote(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            // '' is an escaped quote
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

//! Network-call payloads carried over the text channel.
//!
//! Request payload (after the `h` prefix):
//!
//! ```text
//!   METHOD|URL|key|value|key|value|~key|rest of the text, pipes included
//! ```
//!
//! Reply: two status characters followed by the raw body.

use async_trait::async_trait;

pub const FIELD_DELIMITER: char = '|';
pub const TAIL_SENTINEL: char = '~';

/// One form field of a network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    Pair { key: String, value: String },
    /// Takes the whole remainder of the payload as its value.
    Tail { key: String, value: String },
}

impl FormField {
    pub fn key(&self) -> &str {
        match self {
            FormField::Pair { key, .. } | FormField::Tail { key, .. } => key,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            FormField::Pair { value, .. } | FormField::Tail { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkRequest {
    pub method: String,
    pub url: String,
    pub fields: Vec<FormField>,
}

impl NetworkRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::Pair {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn tail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::Tail {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Decode a payload. Never fails: missing method, url or values come
    /// back as empty strings.
    pub fn decode(payload: &str) -> Self {
        let mut parts = payload.split(FIELD_DELIMITER);
        let method = parts.next().unwrap_or_default().to_string();
        let url = parts.next().unwrap_or_default().to_string();

        let rest: Vec<&str> = parts.collect();
        let mut fields = Vec::new();
        let mut i = 0;
        while i < rest.len() {
            if let Some(key) = rest[i].strip_prefix(TAIL_SENTINEL) {
                fields.push(FormField::Tail {
                    key: key.to_string(),
                    value: rest[i + 1..].join("|"),
                });
                break;
            }
            fields.push(FormField::Pair {
                key: rest[i].to_string(),
                value: rest.get(i + 1).copied().unwrap_or_default().to_string(),
            });
            i += 2;
        }

        Self {
            method,
            url,
            fields,
        }
    }

    /// Encode as a channel payload (without the command prefix).
    pub fn encode(&self) -> String {
        let mut out = format!("{}{}{}", self.method, FIELD_DELIMITER, self.url);
        for field in &self.fields {
            out.push(FIELD_DELIMITER);
            match field {
                FormField::Pair { key, value } => {
                    out.push_str(key);
                    out.push(FIELD_DELIMITER);
                    out.push_str(value);
                }
                FormField::Tail { key, value } => {
                    out.push(TAIL_SENTINEL);
                    out.push_str(key);
                    out.push(FIELD_DELIMITER);
                    out.push_str(value);
                }
            }
        }
        out
    }

    /// Effective form values: a repeated key keeps its first position and
    /// takes its last value.
    pub fn values(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match out.iter_mut().find(|(k, _)| *k == field.key()) {
                Some(slot) => slot.1 = field.value(),
                None => out.push((field.key(), field.value())),
            }
        }
        out
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.key() == key)
            .map(FormField::value)
    }

    /// Only `POST` carries a form body; the match is case-sensitive.
    pub fn has_body(&self) -> bool {
        self.method == "POST"
    }
}

// ════════════════════════════════════════════════════════════════════
// Reply
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReply {
    pub status: i32,
    pub body: String,
}

impl NetworkReply {
    /// The call could not be made at all (bad request, cancelled, timed out).
    pub const UNREACHABLE: i32 = -1;
    /// The transport failed after the request was issued.
    pub const TRANSPORT_FAILURE: i32 = 0;

    pub fn new(status: i32, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn unreachable() -> Self {
        Self::new(Self::UNREACHABLE, String::new())
    }

    /// Two status characters (hundreds, remainder) then the body verbatim.
    pub fn encode(&self) -> String {
        let status = i64::from(self.status);
        let mut out = String::with_capacity(self.body.len() + 8);
        out.push(status_unit(status.div_euclid(100) % 100));
        out.push(status_unit(status % 100));
        out.push_str(&self.body);
        out
    }

    /// Interpreter-side decode. `None` if the reply is shorter than the
    /// status prefix.
    pub fn decode(reply: &str) -> Option<Self> {
        let mut chars = reply.chars();
        let hi = unit_value(chars.next()?);
        let lo = unit_value(chars.next()?);
        Some(Self {
            status: hi * 100 + lo.rem_euclid(100),
            body: chars.as_str().to_string(),
        })
    }
}

/// A status part as one UTF-16 unit, wrapping negatives the way a 16-bit
/// character conversion does.
fn status_unit(value: i64) -> char {
    let unit = value.rem_euclid(0x1_0000) as u32;
    char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn unit_value(ch: char) -> i32 {
    i32::from(ch as u32 as u16 as i16)
}

// ════════════════════════════════════════════════════════════════════
// Transport seam
// ════════════════════════════════════════════════════════════════════

/// Whatever actually performs the call. Failures are reported through the
/// reply status, never as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &NetworkRequest) -> NetworkReply;
}

//! Outbound request description

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

use crate::{DevSocialError, Result};

pub use reqwest::Method;

/// A single field of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

/// Value of a multipart form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    /// Plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// File field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime_type: mime_type.into(),
                bytes,
            },
        }
    }
}

/// Request body: JSON for everything except file uploads.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// Deterministic textual form used for cache key derivation.
    ///
    /// JSON objects are written with sorted keys, so two logically equal
    /// bodies always produce the same string regardless of insertion order.
    pub fn canonical(&self) -> String {
        match self {
            RequestBody::Json(value) => {
                let mut out = String::new();
                write_canonical(value, &mut out);
                out
            }
            RequestBody::Multipart(parts) => {
                let mut out = String::from("multipart");
                for part in parts {
                    out.push('|');
                    out.push_str(&part.name);
                    out.push('=');
                    match &part.value {
                        FormValue::Text(text) => {
                            out.push_str(&Value::String(text.clone()).to_string())
                        }
                        FormValue::File {
                            file_name,
                            mime_type,
                            bytes,
                        } => {
                            out.push_str(&format!(
                                "file:{file_name}:{mime_type}:{}:{}",
                                bytes.len(),
                                content_fingerprint(bytes)
                            ));
                        }
                    }
                }
                out
            }
        }
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hash of the file bytes. Deterministic within a process, which is all an
/// in-memory key needs.
fn content_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Options for a single call to [`CachedClient::request`](crate::CachedClient::request).
///
/// ```rust
/// # use devsocial::RequestOptions;
/// let options = RequestOptions::post()
///     .json(serde_json::json!({ "content": "hello" }))
///     .header("X-Client", "cli");
/// assert_eq!(options.method.as_str(), "POST");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add an extra request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Serialize `value` and attach it as the JSON body.
    pub fn try_json<T: Serialize>(self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| DevSocialError::InvalidInput(format!("unserializable body: {e}")))?;
        Ok(self.json(value))
    }

    /// Attach a multipart form body.
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self
    }

    /// Whether this is a cacheable read.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether a successful response should invalidate cached reads.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}

#![allow(missing_docs)]

//! Provider-agnostic description of an outgoing HTTP request.

use masking::{Maskable, Secret};
use serde::{Deserialize, Serialize};

/// Header list of an outgoing request
pub type Headers = Vec<(String, Maskable<String>)>;

/// HTTP method of an outgoing request
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

/// Body of an outgoing request
#[derive(Clone)]
pub enum RequestContent {
    /// Serialized as `application/json`
    Json(serde_json::Value),
    /// Serialized as `application/x-www-form-urlencoded`
    FormUrlEncoded(serde_json::Value),
    /// Sent verbatim, the caller sets the content type
    RawBytes(Vec<u8>),
}

impl std::fmt::Debug for RequestContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json(_) => "JsonRequestBody",
            Self::FormUrlEncoded(_) => "FormUrlEncodedRequestBody",
            Self::RawBytes(_) => "RawBytesRequestBody",
        })
    }
}

impl RequestContent {
    /// Body rendered as text for audit logs. Raw bytes that are not UTF-8 render as empty.
    pub fn get_inner_value(&self) -> Secret<String> {
        match self {
            Self::Json(value) => value.to_string().into(),
            Self::FormUrlEncoded(value) => {
                serde_urlencoded::to_string(value).unwrap_or_default().into()
            }
            Self::RawBytes(bytes) => String::from_utf8(bytes.clone()).unwrap_or_default().into(),
        }
    }
}

/// Outgoing request, built with [`RequestBuilder`]
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub headers: Headers,
    pub method: Method,
    pub body: Option<RequestContent>,
}

fn default_request_headers() -> [(String, Maskable<String>); 1] {
    use http::header;

    [(
        header::VIA.to_string(),
        crate::consts::USER_AGENT.to_string().into(),
    )]
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    pub url: String,
    pub headers: Headers,
    pub method: Method,
    pub body: Option<RequestContent>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: Method::Get,
            url: String::with_capacity(256),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn attach_default_headers(mut self) -> Self {
        self.headers.extend(default_request_headers());
        self
    }

    pub fn header(mut self, header: &str, value: &str) -> Self {
        self.headers.push((header.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: Vec<(String, Maskable<String>)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn set_body(mut self, body: RequestContent) -> Self {
        self.body.replace(body);
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

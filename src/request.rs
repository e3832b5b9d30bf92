use std::collections::HashMap;
use std::net::SocketAddr;

use http::Method;
use serde_json::Value;

use crate::field::FormData;
use crate::helpers::traits::query_string::{parse_cookies, parse_parameters};
use crate::session::SessionStore;

/// Payload compression negotiated on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Gzip,
    Deflate,
    None,
}

/// Per-connection data owned by the transport layer and borrowed by every
/// request on that connection.
pub struct ClientContext {
    pub peer_addr: SocketAddr,
    pub compression: CompressionMode,
    /// Distinguished name of the peer certificate when the connection
    /// authenticated with a client certificate.
    pub peer_dn: Option<String>,
}

impl ClientContext {
    pub fn new(peer_addr: SocketAddr, compression: CompressionMode) -> ClientContext {
        ClientContext {
            peer_addr,
            compression,
            peer_dn: None,
        }
    }
}

/// Everything a handler sees of one incoming request.
///
/// Built once per request from the raw strings the header parser hands
/// over; the parameter and cookie maps never change afterwards. The
/// borrow of [`ClientContext`] ties the request's lifetime to its
/// connection.
pub struct HttpRequest<'a> {
    method: Method,
    url: String,
    origin: String,
    auth_username: String,
    client: &'a ClientContext,
    parameters: HashMap<String, String>,
    cookies: HashMap<String, String>,
    session_id: String,
    json_payload: String,
    multipart: Option<FormData>,
}

impl<'a> HttpRequest<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: Method,
        url: impl Into<String>,
        raw_parameters: &str,
        raw_cookies: &str,
        origin: impl Into<String>,
        auth_username: impl Into<String>,
        client: &'a ClientContext,
        json_payload: impl Into<String>,
        multipart: Option<FormData>,
    ) -> HttpRequest<'a> {
        let mut request = HttpRequest {
            method,
            url: url.into(),
            origin: origin.into(),
            auth_username: auth_username.into(),
            client,
            parameters: parse_parameters(raw_parameters),
            cookies: parse_cookies(raw_cookies),
            session_id: String::new(),
            json_payload: json_payload.into(),
            multipart,
        };
        request.bind_session();
        request
    }

    // A `SID` cookie naming a live session binds the request to it;
    // anything else leaves the request unbound until create_session.
    fn bind_session(&mut self) {
        if let Some(sid) = self.cookies.get("SID") {
            if SessionStore::find(sid) {
                self.session_id = sid.clone();
            }
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn auth_username(&self) -> &str {
        &self.auth_username
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.client.peer_addr
    }

    pub fn compression_mode(&self) -> CompressionMode {
        self.client.compression
    }

    pub fn peer_dn(&self) -> Option<&str> {
        self.client.peer_dn.as_deref()
    }

    pub fn is_x509_auth(&self) -> bool {
        self.client.peer_dn.is_some()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookie_names(&self) -> Vec<&str> {
        self.cookies.keys().map(String::as_str).collect()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_session_valid(&self) -> bool {
        !self.session_id.is_empty()
    }

    /// Bind a fresh session if the request has none yet.
    pub fn create_session(&mut self) -> &str {
        if self.session_id.is_empty() {
            self.session_id = SessionStore::create();
        }
        &self.session_id
    }

    pub fn remove_session(&mut self) {
        if !self.session_id.is_empty() {
            SessionStore::remove(&self.session_id);
            self.session_id.clear();
        }
    }

    /// Store a session attribute, creating the session on first use.
    pub fn set_session_attribute(&mut self, name: &str, value: Value) {
        if self.session_id.is_empty() {
            self.create_session();
        }
        SessionStore::set_attribute(&self.session_id, name, value);
    }

    pub fn session_attribute(&self, name: &str) -> Option<Value> {
        if self.session_id.is_empty() {
            return None;
        }
        SessionStore::get_attribute(&self.session_id, name)
    }

    pub fn session_attribute_names(&self) -> Vec<String> {
        if self.session_id.is_empty() {
            return Vec::new();
        }
        SessionStore::attribute_names(&self.session_id)
    }

    pub fn remove_session_attribute(&self, name: &str) {
        if !self.session_id.is_empty() {
            SessionStore::remove_attribute(&self.session_id, name);
        }
    }

    pub fn json_payload(&self) -> &str {
        &self.json_payload
    }

    /// JSON body as a generic value; an absent body reads as `{}`.
    pub fn json_value(&self) -> crate::errors::Result<Value> {
        match self.json_payload.as_str() {
            "" => Ok(serde_json::json!({})),
            payload => Ok(serde_json::from_str(payload)?),
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::errors::Result<T> {
        Ok(serde_json::from_str(&self.json_payload)?)
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart.is_some()
    }

    pub fn multipart(&self) -> Option<&FormData> {
        self.multipart.as_ref()
    }

    pub fn multipart_mut(&mut self) -> Option<&mut FormData> {
        self.multipart.as_mut()
    }
}

//! Single-shot HTTP access shared by every provider.
//!
//! A request goes through four steps: connectivity pre-flight, query merge,
//! one round-trip, and status classification. Nothing is retried.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::RequestError,
    network::Connectivity,
    query::{QueryParams, query_string},
};

/// Everything needed to replay a request; attached to HTTP errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParams {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Merged into `url` right before sending.
    pub query: Option<QueryParams>,
}

impl RequestParams {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            query: None,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn prepare(mut self) -> Self {
        if let Some(query) = self.query.take() {
            self.url = query_string(&query, &self.url);
        }
        if self.header("Content-Type").is_none() {
            self.headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        self
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    connectivity: Connectivity,
}

impl HttpClient {
    pub fn new(timeout: Duration, connectivity: Connectivity) -> Result<Self, RequestError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, connectivity })
    }

    pub async fn request(&self, params: RequestParams) -> Result<Payload, RequestError> {
        if !self.connectivity.is_connected() {
            return Err(RequestError::NoNetwork);
        }

        let params = params.prepare();
        debug!(method = %params.method, url = %params.url, "request");

        let mut builder = self.http.request(params.method.clone(), &params.url);
        for (name, value) in &params.headers {
            builder = builder.header(name, value);
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;

        classify_response(status, &body, &params)
    }

    /// Same as [`HttpClient::request`] but insists on a JSON body of type `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        params: RequestParams,
    ) -> Result<T, RequestError> {
        match self.request(params).await? {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| RequestError::malformed(e.to_string())),
            Payload::Text(text) => Err(RequestError::malformed(format!(
                "expected JSON, got: {}",
                truncate_body(&text)
            ))),
        }
    }
}

/// Turn a status and body into a payload or a typed HTTP error.
pub fn classify_response(
    status: u16,
    body: &str,
    request: &RequestParams,
) -> Result<Payload, RequestError> {
    let json = serde_json::from_str::<Value>(body).ok();

    if (200..300).contains(&status) {
        return Ok(match json {
            Some(value) => Payload::Json(value),
            None => Payload::Text(body.to_string()),
        });
    }

    let Some(json) = json else {
        let message = html_title(body).unwrap_or(body).to_string();
        warn!(status, %message, "request failed");
        return Err(http_error(status, message, request));
    };

    let json = match json {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };

    if status == 401 && json.get("error").and_then(Value::as_str) == Some("invalid_grant") {
        return Err(retry_request(request));
    }

    let error = truthy(json.get("error_description"))
        .or_else(|| truthy(json.get("error")))
        .unwrap_or(&json);

    let code = truthy(error.get("code"))
        .and_then(|c| {
            c.as_u64()
                .or_else(|| c.as_str().and_then(|s| s.parse().ok()))
        })
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(status);

    let message = ["error_description", "form", "message", "error"]
        .iter()
        .find_map(|key| truthy(error.get(*key)))
        .map_or_else(|| value_text(error), value_text);

    warn!(status = code, %message, "request failed");
    Err(http_error(code, message, request))
}

/// Single-attempt retry policy: a rejected grant is reported, never refreshed.
fn retry_request(request: &RequestParams) -> RequestError {
    http_error(401, "HTTP error".to_string(), request)
}

fn http_error(status: u16, message: String, request: &RequestParams) -> RequestError {
    RequestError::Http {
        status,
        message,
        request: Box::new(request.clone()),
    }
}

fn html_title(body: &str) -> Option<&str> {
    let start = body.find("<title>")? + "<title>".len();
    let len = body[start..].find("</title>")?;
    let title = body[start..start + len].trim_end_matches('\n');
    (!title.contains('\n')).then_some(title)
}

fn truthy(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req() -> RequestParams {
        RequestParams::get("https://api.example.test/data")
    }

    fn expect_http(result: Result<Payload, RequestError>) -> (u16, String) {
        match result {
            Err(RequestError::Http { status, message, .. }) => (status, message),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn success_returns_json_or_text() {
        let ok = classify_response(200, r#"{"a":1}"#, &req()).unwrap();
        assert_eq!(ok, Payload::Json(json!({"a": 1})));

        let ok = classify_response(204, "plain", &req()).unwrap();
        assert_eq!(ok, Payload::Text("plain".into()));
    }

    #[test]
    fn html_error_uses_title() {
        let (status, message) = expect_http(classify_response(
            404,
            "<html><title>Not Found</title></html>",
            &req(),
        ));
        assert_eq!(status, 404);
        assert_eq!(message, "Not Found");
    }

    #[test]
    fn title_with_trailing_newlines_is_trimmed() {
        let (_, message) = expect_http(classify_response(
            502,
            "<html><title>Bad Gateway\n\n</title></html>",
            &req(),
        ));
        assert_eq!(message, "Bad Gateway");
    }

    #[test]
    fn raw_text_when_no_title() {
        let (status, message) = expect_http(classify_response(500, "boom", &req()));
        assert_eq!(status, 500);
        assert_eq!(message, "boom");
    }

    #[test]
    fn error_description_wins() {
        let body = r#"{"error":"bad_request","error_description":"Missing q"}"#;
        let (status, message) = expect_http(classify_response(400, body, &req()));
        assert_eq!(status, 400);
        assert_eq!(message, "Missing q");
    }

    #[test]
    fn string_error_field() {
        let body = r#"{"code":400,"error":"The given location is invalid."}"#;
        let (status, message) = expect_http(classify_response(400, body, &req()));
        assert_eq!(status, 400);
        assert_eq!(message, "The given location is invalid.");
    }

    #[test]
    fn nested_error_object_supplies_code_and_message() {
        let body = r#"{"error":{"code":429,"message":"slow down"}}"#;
        let (status, message) = expect_http(classify_response(400, body, &req()));
        assert_eq!(status, 429);
        assert_eq!(message, "slow down");
    }

    #[test]
    fn zero_code_falls_back_to_http_status() {
        let body = r#"{"code":0,"message":"boom"}"#;
        let (status, message) = expect_http(classify_response(500, body, &req()));
        assert_eq!(status, 500);
        assert_eq!(message, "boom");
    }

    #[test]
    fn top_level_message_is_used() {
        let body = r#"{"cod":"404","message":"city not found"}"#;
        let (status, message) = expect_http(classify_response(404, body, &req()));
        assert_eq!(status, 404);
        assert_eq!(message, "city not found");
    }

    #[test]
    fn json_array_uses_first_element() {
        let body = r#"[{"message":"first"},{"message":"second"}]"#;
        let (_, message) = expect_http(classify_response(422, body, &req()));
        assert_eq!(message, "first");
    }

    #[test]
    fn json_without_known_fields_renders_body() {
        let (_, message) = expect_http(classify_response(418, r#"{"teapot":true}"#, &req()));
        assert_eq!(message, r#"{"teapot":true}"#);
    }

    #[test]
    fn invalid_grant_is_not_retried() {
        let body = r#"{"error":"invalid_grant"}"#;
        let (status, message) = expect_http(classify_response(401, body, &req()));
        assert_eq!(status, 401);
        assert_eq!(message, "HTTP error");
    }

    #[test]
    fn error_carries_request() {
        let request = req().with_header("Accept", "application/json");
        match classify_response(500, "x", &request) {
            Err(RequestError::Http { request: carried, .. }) => assert_eq!(*carried, request),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prepare_merges_query_and_defaults_content_type() {
        let params = RequestParams::get("https://h/api?x=1")
            .with_query(QueryParams::new().set("q", "a b"))
            .prepare();
        assert_eq!(params.url, "https://h/api?x=1&q=a%20b");
        assert!(params.query.is_none());
        assert_eq!(params.header("content-type"), Some("application/json"));

        let params = RequestParams::get("u").with_header("Content-Type", "text/plain").prepare();
        assert_eq!(params.headers.len(), 1);
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }
}

use std::fmt;

use serde_json::{Map, Value as JsonValue};

/// HTTP methods used against the inventory API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoded answer of the API
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    pub status: u16,
    /// `message` field of the body, empty when absent
    pub message: String,
    pub body: Map<String, JsonValue>,
}

impl ApiResponse {
    pub fn new(status: u16, body: JsonValue) -> Self {
        let body = match body {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            message,
            body,
        }
    }

    /// The `data` field of the body.
    pub fn data(&self) -> Option<&JsonValue> {
        self.body.get("data")
    }

    /// Message shown when the status is not the expected one.
    pub fn error_message(&self) -> String {
        let mut msg = format!("[Response From API] {}", self.message);
        if let Some(JsonValue::Array(errors)) = self.body.get("errors") {
            for err in errors {
                if let Some(err) = err.as_str() {
                    msg.push_str("\n    ");
                    msg.push_str(err);
                }
            }
        }
        msg
    }
}

/// Network error types
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The API answered with another status than the expected one
    UnexpectedStatus { status: u16, message: String },
    /// Body could not be decoded as JSON
    InvalidBody { route: String, body: String },
    /// Transport failure
    FetchError { message: String },
}

impl NetworkError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedStatus { message, .. } => write!(f, "{}", message),
            Self::InvalidBody { route, body } => {
                write!(f, "on {} : cannot unmarshal json : \n{}", route, body)
            }
            Self::FetchError { message } => write!(f, "Fetch error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Request/response contract with the inventory API.
///
/// Implementors only provide `send`; status checking is shared.
pub trait ApiPort {
    fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonValue>,
    ) -> Result<ApiResponse, NetworkError>;

    /// Send and check the status, the response is kept in the error's message.
    fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonValue>,
        expected_status: u16,
    ) -> Result<ApiResponse, NetworkError> {
        tracing::debug!(%method, endpoint, "api request");
        let response = self.send(method, endpoint, body)?;
        if response.status != expected_status {
            tracing::debug!(status = response.status, expected_status, "unexpected api status");
            return Err(NetworkError::UnexpectedStatus {
                status: response.status,
                message: response.error_message(),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Recorded call to the mock API
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: HttpMethod,
        pub endpoint: String,
        pub body: Option<JsonValue>,
    }

    /// In-memory API answering canned responses by method and endpoint
    #[derive(Default)]
    pub struct MockApi {
        responses: RefCell<HashMap<(HttpMethod, String), ApiResponse>>,
        pub requests: RefCell<Vec<RecordedRequest>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, method: HttpMethod, endpoint: &str, status: u16, body: JsonValue) {
            self.responses
                .borrow_mut()
                .insert((method, endpoint.to_string()), ApiResponse::new(status, body));
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn calls_to(&self, method: HttpMethod, endpoint: &str) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|r| r.method == method && r.endpoint == endpoint)
                .count()
        }

        pub fn last(&self) -> Option<RecordedRequest> {
            self.requests.borrow().last().cloned()
        }
    }

    impl ApiPort for MockApi {
        fn send(
            &self,
            method: HttpMethod,
            endpoint: &str,
            body: Option<&JsonValue>,
        ) -> Result<ApiResponse, NetworkError> {
            self.requests.borrow_mut().push(RecordedRequest {
                method,
                endpoint: endpoint.to_string(),
                body: body.cloned(),
            });
            Ok(self
                .responses
                .borrow()
                .get(&(method, endpoint.to_string()))
                .cloned()
                .unwrap_or_else(|| {
                    ApiResponse::new(404, serde_json::json!({"message": "not found"}))
                }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockApi;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_method_from_str() {
        assert_eq!(HttpMethod::from_str("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_str("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_str("invalid"), None);
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(format!("{}", HttpMethod::Delete), "DELETE");
    }

    #[test]
    fn test_error_message_lists_errors() {
        let response = ApiResponse::new(
            400,
            json!({"message": "Error while creating", "errors": ["bad color", "bad slug"]}),
        );
        assert_eq!(
            response.error_message(),
            "[Response From API] Error while creating\n    bad color\n    bad slug"
        );
    }

    #[test]
    fn test_request_checks_status() {
        let api = MockApi::new();
        api.on(HttpMethod::Get, "/api/sites", 200, json!({"data": {"objects": []}}));
        assert!(api.request(HttpMethod::Get, "/api/sites", None, 200).is_ok());

        let err = api
            .request(HttpMethod::Get, "/api/unknown", None, 200)
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "[Response From API] not found");
        assert_eq!(api.calls(), 2);
    }
}

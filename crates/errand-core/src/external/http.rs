//! Generic HTTP dispatch port.

use std::collections::BTreeMap;

use errand_types::error::ServiceError;
use serde_json::Value;

/// A generic HTTP request parsed from a task's `request_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestSpec {
    /// HTTP method; defaults to GET.
    pub method: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpRequestSpec {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            body: None,
            headers: BTreeMap::new(),
        }
    }
}

impl HttpRequestSpec {
    /// Parse `{method, body, headers}` from request_data. Absent fields
    /// default; a non-object is rejected.
    pub fn from_request_data(data: &Value) -> Result<Self, ServiceError> {
        let obj = match data {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => {
                return Err(ServiceError::BadRequestData(format!(
                    "expected an object, got {other}"
                )));
            }
        };

        let method = match obj.get("method") {
            None | Some(Value::Null) => "GET".to_string(),
            Some(Value::String(m)) => m.to_uppercase(),
            Some(other) => {
                return Err(ServiceError::BadRequestData(format!(
                    "method must be a string, got {other}"
                )));
            }
        };

        let mut headers = BTreeMap::new();
        if let Some(raw) = obj.get("headers") {
            let Value::Object(map) = raw else {
                return Err(ServiceError::BadRequestData(
                    "headers must be an object".to_string(),
                ));
            };
            for (name, value) in map {
                let Value::String(value) = value else {
                    return Err(ServiceError::BadRequestData(format!(
                        "header '{name}' must be a string"
                    )));
                };
                headers.insert(name.clone(), value.clone());
            }
        }

        Ok(Self {
            method,
            body: obj.get("body").filter(|b| !b.is_null()).cloned(),
            headers,
        })
    }
}

/// Port for outbound HTTP. The live implementation is a reqwest client in
/// errand-infra.
pub trait HttpDispatcher: Send + Sync {
    /// Execute a generic request against `url` and return the response
    /// body (JSON when possible, otherwise a string value).
    fn dispatch(
        &self,
        url: &str,
        spec: &HttpRequestSpec,
    ) -> impl std::future::Future<Output = Result<Value, ServiceError>> + Send;

    /// POST an MCP action payload to `endpoint`. Success is HTTP 200;
    /// anything else is `ServiceError::McpStatus`.
    fn post_mcp(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> impl std::future::Future<Output = Result<Value, ServiceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_get_with_no_body() {
        let spec = HttpRequestSpec::from_request_data(&json!({})).unwrap();
        assert_eq!(spec.method, "GET");
        assert!(spec.body.is_none());
        assert!(spec.headers.is_empty());

        let spec = HttpRequestSpec::from_request_data(&Value::Null).unwrap();
        assert_eq!(spec, HttpRequestSpec::default());
    }

    #[test]
    fn parses_method_body_and_headers() {
        let spec = HttpRequestSpec::from_request_data(&json!({
            "method": "post",
            "body": {"q": "btc"},
            "headers": {"authorization": "Bearer x"}
        }))
        .unwrap();
        assert_eq!(spec.method, "POST");
        assert_eq!(spec.body.unwrap()["q"], "btc");
        assert_eq!(spec.headers["authorization"], "Bearer x");
    }

    #[test]
    fn rejects_malformed_request_data() {
        assert!(HttpRequestSpec::from_request_data(&json!("GET")).is_err());
        assert!(HttpRequestSpec::from_request_data(&json!({"method": 5})).is_err());
        assert!(HttpRequestSpec::from_request_data(&json!({"headers": ["x"]})).is_err());
    }
}

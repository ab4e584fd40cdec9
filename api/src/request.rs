use std::collections::HashMap;

use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use base64::Engine;
use base64::engine::general_purpose;
use http::Method;

use crate::error::AppError;

/// One inbound HTTP request, built fresh for every invocation.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    query: HashMap<String, String>,
    path_params: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Request {
        Request {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: HashMap::new(),
            path_params: HashMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Request {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Request {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }
}

impl TryFrom<ApiGatewayProxyRequest> for Request {
    type Error = AppError;

    fn try_from(event: ApiGatewayProxyRequest) -> Result<Self, Self::Error> {
        let headers = event
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        // multi-value entries are applied last so the final occurrence wins
        let mut query = HashMap::new();
        for (name, value) in event
            .query_string_parameters
            .iter()
            .chain(event.multi_value_query_string_parameters.iter())
        {
            query.insert(name.to_string(), value.to_string());
        }

        let body = match event.body {
            Some(body) if event.is_base64_encoded => Some(
                general_purpose::STANDARD
                    .decode(body.as_bytes())
                    .map_err(|err| {
                        AppError::validation(format!("Request body is not valid base64: {err}"))
                    })?,
            ),
            Some(body) => Some(body.into_bytes()),
            None => None,
        };

        Ok(Request {
            method: event.http_method,
            path: event.path.unwrap_or_else(|| "/".to_string()),
            headers,
            query,
            path_params: HashMap::new(),
            body,
        })
    }
}

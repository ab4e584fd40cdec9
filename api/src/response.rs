use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_lambda_events::encodings::Body;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{AppError, ErrorBody};
use crate::validation::SchemaError;

/// Uniform wrapper for handled responses. Exactly one of `data` and `error`
/// is set, and `success` says which.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    success: bool,
    data: Option<Value>,
    error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    pub fn ok(data: Value) -> ResponseEnvelope {
        ResponseEnvelope {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: ErrorBody) -> ResponseEnvelope {
        ResponseEnvelope {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Status and JSON body of a finished invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub status: u16,
    pub body: Value,
}

impl Rendered {
    fn new(status: u16, body: impl Serialize) -> serde_json::Result<Rendered> {
        Ok(Rendered {
            status,
            body: serde_json::to_value(body)?,
        })
    }
}

pub fn render_success(data: Value) -> serde_json::Result<Rendered> {
    Rendered::new(200, ResponseEnvelope::ok(data))
}

pub fn render_error(err: &AppError) -> serde_json::Result<Rendered> {
    Rendered::new(err.status(), ResponseEnvelope::failed(err.format()))
}

/// Schema failures are reported unwrapped, in the resolver's own shape.
pub fn render_schema_error(err: &SchemaError) -> serde_json::Result<Rendered> {
    Rendered::new(
        422,
        json!({
            "statusCode": 422,
            "detail": err.violations(),
        }),
    )
}

pub fn render_route_not_found() -> serde_json::Result<Rendered> {
    Rendered::new(404, json!({ "statusCode": 404, "message": "Not found" }))
}

impl From<Rendered> for ApiGatewayProxyResponse {
    fn from(rendered: Rendered) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut response = ApiGatewayProxyResponse::default();
        response.status_code = i64::from(rendered.status);
        response.headers = headers;
        response.body = Some(Body::Text(rendered.body.to_string()));
        response.is_base64_encoded = false;
        response
    }
}

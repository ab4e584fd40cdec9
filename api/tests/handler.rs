use std::collections::HashMap;

use api::AppState;
use api::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_lambda_events::encodings::Body;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::Object;
use aws_sdk_s3::types::error::{NoSuchKey, NotFound};
use aws_sdk_ses::operation::send_email::{SendEmailError, SendEmailOutput};
use aws_sdk_ses::types::error::MessageRejected;
use aws_smithy_mocks::{mock, mock_client};
use lambda_runtime::{Context, LambdaEvent};
use serde_json::{Value, json};
use services::Connections;

const BUCKET: &str = "test-bucket";

fn sdk_config() -> SdkConfig {
    SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .build()
}

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|name| vars.get(name).cloned())
}

fn state(config: Config, connections: Connections) -> AppState {
    AppState::with_connections(config, connections).unwrap()
}

fn default_state() -> AppState {
    state(
        config(&[("DATA_BUCKET", BUCKET)]),
        Connections::new(&sdk_config(), "test"),
    )
}

fn fixture() -> Value {
    serde_json::from_str(include_str!("fixtures/apigw_hello_event.json")).unwrap()
}

fn api_event(method: &str, path: &str, body: Option<Value>) -> Value {
    let mut event = fixture();
    event["httpMethod"] = json!(method);
    event["path"] = json!(path);
    event["resource"] = json!(path);
    event["requestContext"]["httpMethod"] = json!(method);
    event["requestContext"]["resourcePath"] = json!(path);
    event["queryStringParameters"] = Value::Null;
    event["multiValueQueryStringParameters"] = Value::Null;
    event["body"] = body.map_or(Value::Null, |b| json!(b.to_string()));
    event
}

fn scheduled_event() -> Value {
    json!({
        "version": "0",
        "id": "53dc4d37-cffa-4f76-80c9-8b7d4a4d2eaa",
        "detail-type": "Scheduled Event",
        "source": "aws.events",
        "account": "123456789012",
        "time": "2024-01-01T02:00:00Z",
        "region": "us-east-1",
        "resources": ["arn:aws:events:us-east-1:123456789012:rule/nightly-email"],
        "detail": {}
    })
}

async fn try_invoke(state: &AppState, payload: Value) -> anyhow::Result<(i64, Value)> {
    let response: ApiGatewayProxyResponse =
        api::handle(state, LambdaEvent::new(payload, Context::default())).await?;

    assert_eq!(
        response.headers.get("content-type").unwrap(),
        "application/json"
    );
    let body = match response.body {
        Some(Body::Text(text)) => serde_json::from_str(&text)?,
        other => panic!("unexpected body: {other:?}"),
    };
    Ok((response.status_code, body))
}

async fn invoke(state: &AppState, payload: Value) -> (i64, Value) {
    try_invoke(state, payload).await.unwrap()
}

fn assert_envelope(body: &Value) {
    let success = body["success"].as_bool().unwrap();
    assert_eq!(success, !body["data"].is_null());
    assert_eq!(success, body["error"].is_null());
}

#[tokio::test]
async fn test_should_answer_hello_from_fixture() {
    let state = default_state();

    let (status, body) = invoke(&state, fixture()).await;

    assert_eq!(status, 200);
    assert_envelope(&body);
    assert_eq!(body["data"]["message"], json!("hello world"));
    assert_eq!(
        body["data"]["helper_module_test"],
        json!({"greeting": "Hello, Lambda!", "source": "helper module", "status": "success"})
    );
    assert_eq!(body["data"]["multiplication_result"], json!(42));
}

#[tokio::test]
async fn test_should_report_health_with_configuration_checks() {
    let state = default_state();

    let (status, body) = invoke(&state, api_event("GET", "/health", None)).await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], json!("healthy"));
    assert_eq!(body["data"]["service"], json!("lambda-api"));
    assert_eq!(body["data"]["environment"], json!("dev"));
    assert_eq!(body["data"]["checks"]["storage"], json!("configured"));
    assert_eq!(body["data"]["checks"]["mail"], json!("not_configured"));
}

#[tokio::test]
async fn test_should_create_user_starting_at_1000() {
    let state = default_state();
    let payload = json!({"name": "John Doe", "email": "john@example.com", "age": 30});

    let (status, body) = invoke(&state, api_event("POST", "/users", Some(payload))).await;

    assert_eq!(status, 200);
    assert_envelope(&body);
    assert_eq!(body["data"]["status"], json!("success"));
    assert_eq!(
        body["data"]["user"],
        json!({
            "user_id": 1000,
            "name": "John Doe",
            "email": "john@example.com",
            "age": 30,
            "is_active": true
        })
    );
}

#[tokio::test]
async fn test_should_reject_invalid_user_payloads_with_422() {
    let state = default_state();

    let out_of_range = json!({"name": "John", "email": "john@example.com", "age": 200});
    let (status, body) = invoke(&state, api_event("POST", "/users", Some(out_of_range))).await;
    assert_eq!(status, 422);
    assert!(body.get("success").is_none());
    assert!(body.to_string().contains("\"age\""));

    let missing_email = json!({"name": "John", "age": 30});
    let (status, body) = invoke(&state, api_event("POST", "/users", Some(missing_email))).await;
    assert_eq!(status, 422);
    assert!(body.to_string().contains("\"email\""));
}

#[tokio::test]
async fn test_should_look_up_users() {
    let state = default_state();

    let (status, body) = invoke(&state, api_event("GET", "/users/1000", None)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user_id"], json!(1000));
    assert_eq!(body["data"]["name"], json!("John Doe"));

    let (status, body) = invoke(&state, api_event("GET", "/users/9999", None)).await;
    assert_eq!(status, 404);
    assert_envelope(&body);
    assert_eq!(body["error"]["type"], json!("NotFoundError"));
    assert_eq!(body["error"]["details"]["resource_type"], json!("User"));
    assert_eq!(body["error"]["details"]["resource_id"], json!("9999"));

    let (status, body) = invoke(&state, api_event("GET", "/users/abc", None)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["type"], json!("ValidationError"));
    assert_eq!(body["error"]["details"]["user_id"], json!("abc"));
}

#[tokio::test]
async fn test_should_return_404_for_unknown_route() {
    let state = default_state();

    let (status, body) = invoke(&state, api_event("GET", "/missing", None)).await;

    assert_eq!(status, 404);
    assert_eq!(body, json!({"statusCode": 404, "message": "Not found"}));
}

#[tokio::test]
async fn test_should_round_trip_uploaded_file() {
    let put = mock!(aws_sdk_s3::Client::put_object)
        .match_requests(|req| {
            req.bucket() == Some(BUCKET)
                && req.content_type() == Some("text/plain")
                && req
                    .metadata()
                    .and_then(|m| m.get("file-name"))
                    .is_some_and(|name| name == "hello.txt")
        })
        .then_output(|| PutObjectOutput::builder().build());
    let get = mock!(aws_sdk_s3::Client::get_object)
        .match_requests(|req| req.bucket() == Some(BUCKET))
        .then_output(|| {
            GetObjectOutput::builder()
                .body(ByteStream::from_static(b"hello world"))
                .build()
        });
    let connections =
        Connections::new(&sdk_config(), "test").with_s3(mock_client!(aws_sdk_s3, [&put, &get]));
    let state = state(config(&[("DATA_BUCKET", BUCKET)]), connections);

    let upload = json!({
        "file_name": "hello.txt",
        "content": "aGVsbG8gd29ybGQ=",
        "content_type": "text/plain"
    });
    let (status, body) = invoke(&state, api_event("POST", "/files", Some(upload))).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["file_name"], json!("hello.txt"));
    assert_eq!(body["data"]["size"], json!(11));
    let file_id = body["data"]["file_id"].as_str().unwrap().to_string();

    let (status, body) =
        invoke(&state, api_event("GET", &format!("/files/{file_id}"), None)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["file_id"], json!(file_id));
    assert_eq!(body["data"]["content"], json!("aGVsbG8gd29ybGQ="));
    assert_eq!(body["data"]["size"], json!(11));
    assert_eq!(put.num_calls(), 1);
    assert_eq!(get.num_calls(), 1);
}

#[tokio::test]
async fn test_should_reject_undecodable_upload() {
    let state = default_state();
    let upload = json!({"file_name": "bad.bin", "content": "%%% not base64 %%%"});

    let (status, body) = invoke(&state, api_event("POST", "/files", Some(upload))).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["type"], json!("ValidationError"));
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid base64 content")
    );
}

#[tokio::test]
async fn test_should_return_404_for_missing_file() {
    let get = mock!(aws_sdk_s3::Client::get_object)
        .then_error(|| GetObjectError::NoSuchKey(NoSuchKey::builder().build()));
    let connections =
        Connections::new(&sdk_config(), "test").with_s3(mock_client!(aws_sdk_s3, [&get]));
    let state = state(config(&[("DATA_BUCKET", BUCKET)]), connections);

    let (status, body) = invoke(&state, api_event("GET", "/files/nope", None)).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"]["details"]["resource_type"], json!("File"));
    assert_eq!(body["error"]["details"]["resource_id"], json!("nope"));
}

#[tokio::test]
async fn test_should_delete_once_then_report_missing() {
    let found = mock!(aws_sdk_s3::Client::head_object)
        .then_output(|| HeadObjectOutput::builder().build());
    let delete = mock!(aws_sdk_s3::Client::delete_object)
        .match_requests(|req| req.key() == Some("report.csv"))
        .then_output(|| DeleteObjectOutput::builder().build());
    let gone = mock!(aws_sdk_s3::Client::head_object)
        .then_error(|| HeadObjectError::NotFound(NotFound::builder().build()));
    let connections = Connections::new(&sdk_config(), "test")
        .with_s3(mock_client!(aws_sdk_s3, [&found, &delete, &gone]));
    let state = state(config(&[("DATA_BUCKET", BUCKET)]), connections);

    let (status, body) = invoke(&state, api_event("DELETE", "/files/report.csv", None)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["file_id"], json!("report.csv"));

    let (status, body) = invoke(&state, api_event("DELETE", "/files/report.csv", None)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["type"], json!("NotFoundError"));
    assert_eq!(delete.num_calls(), 1);
}

#[tokio::test]
async fn test_should_list_files_with_prefix() {
    let list = mock!(aws_sdk_s3::Client::list_objects_v2)
        .match_requests(|req| req.prefix() == Some("reports/"))
        .then_output(|| {
            ListObjectsV2Output::builder()
                .contents(
                    Object::builder()
                        .key("reports/daily.csv")
                        .size(42)
                        .last_modified(DateTime::from_secs(1_700_000_000))
                        .build(),
                )
                .build()
        });
    let connections =
        Connections::new(&sdk_config(), "test").with_s3(mock_client!(aws_sdk_s3, [&list]));
    let state = state(config(&[("DATA_BUCKET", BUCKET)]), connections);

    let mut event = api_event("GET", "/files", None);
    event["queryStringParameters"] = json!({"prefix": "reports/"});
    let (status, body) = invoke(&state, event).await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["count"], json!(1));
    assert_eq!(
        body["data"]["files"][0],
        json!({
            "key": "reports/daily.csv",
            "size": "42",
            "last_modified": "2023-11-14T22:13:20Z"
        })
    );
}

#[tokio::test]
async fn test_should_propagate_unset_bucket_to_runtime() {
    let state = state(config(&[]), Connections::new(&sdk_config(), "test"));

    let result = try_invoke(&state, api_event("GET", "/files", None)).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("bucket name must be provided"));
}

fn mail_config() -> Config {
    config(&[
        ("FROM_EMAIL", "noreply@example.com"),
        ("ADMIN_EMAIL", "admin@example.com"),
        ("ENVIRONMENT", "staging"),
    ])
}

#[tokio::test]
async fn test_should_send_nightly_email_on_schedule() {
    let send = mock!(aws_sdk_ses::Client::send_email)
        .match_requests(|req| {
            req.source() == Some("noreply@example.com")
                && req
                    .destination()
                    .is_some_and(|d| d.to_addresses() == ["admin@example.com"])
        })
        .then_output(|| {
            SendEmailOutput::builder()
                .message_id("nightly-1")
                .build()
                .unwrap()
        });
    let connections =
        Connections::new(&sdk_config(), "staging").with_ses(mock_client!(aws_sdk_ses, [&send]));
    let state = state(mail_config(), connections);

    let (status, body) = invoke(&state, scheduled_event()).await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["message_id"], json!("nightly-1"));
    assert_eq!(body["data"]["recipient"], json!("admin@example.com"));
    assert_eq!(send.num_calls(), 1);
}

#[tokio::test]
async fn test_should_send_nightly_email_on_request() {
    let send = mock!(aws_sdk_ses::Client::send_email).then_output(|| {
        SendEmailOutput::builder()
            .message_id("nightly-2")
            .build()
            .unwrap()
    });
    let connections =
        Connections::new(&sdk_config(), "staging").with_ses(mock_client!(aws_sdk_ses, [&send]));
    let state = state(mail_config(), connections);

    let (status, body) =
        invoke(&state, api_event("POST", "/tasks/nightly-email", None)).await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["message"], json!("Nightly email sent successfully"));
}

#[tokio::test]
async fn test_should_require_admin_email() {
    let state = state(
        config(&[("FROM_EMAIL", "noreply@example.com")]),
        Connections::new(&sdk_config(), "test"),
    );

    let (status, body) = invoke(&state, scheduled_event()).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["type"], json!("ValidationError"));
}

#[tokio::test]
async fn test_should_normalize_mail_failure_to_500() {
    let send = mock!(aws_sdk_ses::Client::send_email).then_error(|| {
        SendEmailError::MessageRejected(
            MessageRejected::builder()
                .message("Email address is not verified.")
                .build(),
        )
    });
    let connections =
        Connections::new(&sdk_config(), "staging").with_ses(mock_client!(aws_sdk_ses, [&send]));
    let state = state(mail_config(), connections);

    let (status, body) = invoke(&state, scheduled_event()).await;

    assert_eq!(status, 500);
    assert_envelope(&body);
    assert_eq!(body["error"]["type"], json!("AppError"));
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to send nightly email")
    );
}

use serde_json::{Value, json};

pub const COLD_START: &str = "ColdStart";
pub const USER_CREATIONS: &str = "UserCreations";
pub const HELLO_WORLD_INVOCATIONS: &str = "HelloWorldInvocations";
pub const FILE_UPLOADS: &str = "FileUploads";
pub const NIGHTLY_EMAILS_SENT: &str = "NightlyEmailsSent";

/// Writes CloudWatch Embedded Metric Format records to stdout.
#[derive(Debug, Clone)]
pub struct Metrics {
    namespace: String,
    service: String,
}

impl Metrics {
    pub fn new(namespace: impl Into<String>, service: impl Into<String>) -> Metrics {
        Metrics {
            namespace: namespace.into(),
            service: service.into(),
        }
    }

    pub fn count(&self, name: &str) {
        println!("{}", self.record(name, 1.0, &[]));
    }

    pub fn cold_start(&self, function_name: &str) {
        let dimensions = [("function_name", function_name)];
        let dimensions: &[(&str, &str)] = if function_name.is_empty() {
            &[]
        } else {
            &dimensions
        };
        println!("{}", self.record(COLD_START, 1.0, dimensions));
    }

    /// Build one EMF document. `service` is always a dimension.
    pub fn record(&self, name: &str, value: f64, extra: &[(&str, &str)]) -> Value {
        let mut dimension_names = vec!["service"];
        dimension_names.extend(extra.iter().map(|(key, _)| *key));

        let mut record = json!({
            "_aws": {
                "Timestamp": chrono::Utc::now().timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [dimension_names],
                    "Metrics": [{"Name": name, "Unit": "Count"}],
                }],
            },
            "service": self.service,
        });
        for (key, val) in extra {
            record[*key] = json!(val);
        }
        record[name] = json!(value);
        record
    }
}

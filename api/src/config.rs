const DEFAULT_ENVIRONMENT: &str = "dev";
const DEFAULT_SERVICE_NAME: &str = "lambda-api";
const DEFAULT_METRICS_NAMESPACE: &str = "Powertools";

/// Settings read once at cold start. Resource keys that are unset resolve to
/// an empty string, which the connection cache rejects on first use.
#[derive(Debug, Clone, Default)]
pub struct Config {
    bucket: Option<String>,
    queue_url: Option<String>,
    table_name: Option<String>,
    from_email: Option<String>,
    admin_email: Option<String>,
    environment: Option<String>,
    service_name: Option<String>,
    metrics_namespace: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Config {
            bucket: read("DATA_BUCKET"),
            queue_url: read("SQS_QUEUE_URL"),
            table_name: read("DYNAMODB_TABLE"),
            from_email: read("FROM_EMAIL"),
            admin_email: read("ADMIN_EMAIL"),
            environment: read("ENVIRONMENT"),
            service_name: read("POWERTOOLS_SERVICE_NAME"),
            metrics_namespace: read("POWERTOOLS_METRICS_NAMESPACE"),
        }
    }

    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or_default()
    }

    pub fn queue_url(&self) -> &str {
        self.queue_url.as_deref().unwrap_or_default()
    }

    pub fn table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or_default()
    }

    pub fn from_email(&self) -> &str {
        self.from_email.as_deref().unwrap_or_default()
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.admin_email.as_deref()
    }

    pub fn environment(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(DEFAULT_SERVICE_NAME)
    }

    pub fn metrics_namespace(&self) -> &str {
        self.metrics_namespace
            .as_deref()
            .unwrap_or(DEFAULT_METRICS_NAMESPACE)
    }

    /// Which resource keys are set, keyed by the name reported in health checks.
    pub fn checks(&self) -> [(&'static str, bool); 4] {
        [
            ("storage", self.bucket.is_some()),
            ("queue", self.queue_url.is_some()),
            ("table", self.table_name.is_some()),
            ("mail", self.from_email.is_some()),
        ]
    }
}

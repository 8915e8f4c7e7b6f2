#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub stripe: Stripe,
    pub dashboard: Dashboard,
    pub event_processing: EventProcessing,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance_seconds: i64,
    pub trial_period_days: u32,
}

impl std::fmt::Debug for Stripe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stripe")
            .field("secret_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("webhook_tolerance_seconds", &self.webhook_tolerance_seconds)
            .field("trial_period_days", &self.trial_period_days)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EventProcessing {
    pub processing_lease_seconds: i64,
    pub replay_interval_seconds: u64,
    pub replay_batch_size: i64,
}

impl Default for EventProcessing {
    fn default() -> Self {
        Self {
            processing_lease_seconds: 300,
            replay_interval_seconds: 60,
            replay_batch_size: 50,
        }
    }
}

/// Settings the replay worker needs; it serves no HTTP.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: Database,
    pub stripe: Stripe,
    pub event_processing: EventProcessing,
    pub stage: Stage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Local,
    Development,
    Production,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Local => "local",
            Stage::Development => "development",
            Stage::Production => "production",
        }
    }
}

impl TryFrom<&str> for Stage {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Stage::Local),
            "development" | "dev" => Ok(Stage::Development),
            "production" | "prod" => Ok(Stage::Production),
            other => anyhow::bail!("unknown stage: {other}"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

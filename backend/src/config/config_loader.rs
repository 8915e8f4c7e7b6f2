use std::str::FromStr;

use anyhow::{Context, Result};

use super::config_model::{
    BackendServer, Dashboard, Database, DotEnvyConfig, EventProcessing, Stage, Stripe, Supabase,
    WorkerConfig,
};

const DEFAULT_WEBHOOK_TOLERANCE_SECONDS: i64 = 300;
const DEFAULT_TRIAL_PERIOD_DAYS: u32 = 7;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let supabase = Supabase {
        jwt_secret: std::env::var("SUPABASE_JWT_SECRET").expect("SUPABASE_JWT_SECRET is invalid"),
    };

    let dashboard = Dashboard {
        base_url: std::env::var("DASHBOARD_BASE_URL")
            .expect("DASHBOARD_BASE_URL is invalid")
            .trim_end_matches('/')
            .to_string(),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database: load_database(),
        supabase,
        stripe: load_stripe()?,
        dashboard,
        event_processing: load_event_processing()?,
        stage: get_stage(),
    })
}

pub fn load_worker() -> Result<WorkerConfig> {
    dotenvy::dotenv().ok();

    Ok(WorkerConfig {
        database: load_database(),
        stripe: load_stripe()?,
        event_processing: load_event_processing()?,
        stage: get_stage(),
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(stage_str.as_str()).unwrap_or_default()
}

fn load_database() -> Database {
    Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    }
}

fn load_stripe() -> Result<Stripe> {
    Ok(Stripe {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
        webhook_tolerance_seconds: parse_or_default(
            "STRIPE_WEBHOOK_TOLERANCE_SECONDS",
            std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECONDS").ok(),
            DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
        )?,
        trial_period_days: parse_or_default(
            "STRIPE_TRIAL_PERIOD_DAYS",
            std::env::var("STRIPE_TRIAL_PERIOD_DAYS").ok(),
            DEFAULT_TRIAL_PERIOD_DAYS,
        )?,
    })
}

fn load_event_processing() -> Result<EventProcessing> {
    let defaults = EventProcessing::default();

    Ok(EventProcessing {
        processing_lease_seconds: parse_or_default(
            "WEBHOOK_PROCESSING_LEASE_SECONDS",
            std::env::var("WEBHOOK_PROCESSING_LEASE_SECONDS").ok(),
            defaults.processing_lease_seconds,
        )?,
        replay_interval_seconds: parse_or_default(
            "EVENT_REPLAY_INTERVAL_SECONDS",
            std::env::var("EVENT_REPLAY_INTERVAL_SECONDS").ok(),
            defaults.replay_interval_seconds,
        )?,
        replay_batch_size: parse_or_default(
            "EVENT_REPLAY_BATCH_SIZE",
            std::env::var("EVENT_REPLAY_BATCH_SIZE").ok(),
            defaults.replay_batch_size,
        )?,
    })
}

/// Blank or unset falls back to `default`; anything else must parse.
fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{key} is invalid: {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_values_use_default() {
        assert_eq!(parse_or_default::<i64>("X", None, 300).unwrap(), 300);
        assert_eq!(parse_or_default::<u32>("X", Some("  ".to_string()), 7).unwrap(), 7);
    }

    #[test]
    fn set_values_are_parsed() {
        assert_eq!(
            parse_or_default::<i64>("X", Some(" 120 ".to_string()), 300).unwrap(),
            120
        );
    }

    #[test]
    fn unparsable_values_are_rejected_with_key() {
        let err = parse_or_default::<u64>("EVENT_REPLAY_INTERVAL_SECONDS", Some("soon".into()), 60)
            .unwrap_err();
        assert!(err.to_string().contains("EVENT_REPLAY_INTERVAL_SECONDS"));
    }

    #[test]
    fn stage_parsing_is_lenient_about_case() {
        assert_eq!(Stage::try_from("Production").unwrap(), Stage::Production);
        assert_eq!(Stage::try_from("dev").unwrap(), Stage::Development);
        assert!(Stage::try_from("staging").is_err());
        assert_eq!(Stage::default(), Stage::Local);
    }
}

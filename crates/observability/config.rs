use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

impl ServiceContext {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::resolve(
            component,
            env_string("SERVICE_NAME"),
            env_string("STAGE"),
        )
    }

    fn resolve(
        component: &str,
        service_name: Option<String>,
        environment: Option<String>,
    ) -> Self {
        let component = component.trim().to_string();

        let service_name = service_name
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("billing-{component}"));

        let environment = environment
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "local".to_string());

        Self {
            service_name,
            environment,
            component,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_component_and_local_stage() {
        let context = ServiceContext::resolve(" worker ", None, Some(String::new()));

        assert_eq!(context.component, "worker");
        assert_eq!(context.service_name, "billing-worker");
        assert_eq!(context.environment, "local");
    }

    #[test]
    fn explicit_values_win() {
        let context = ServiceContext::resolve(
            "backend",
            Some("billing-api".to_string()),
            Some("production".to_string()),
        );

        assert_eq!(context.service_name, "billing-api");
        assert_eq!(context.environment, "production");
    }
}

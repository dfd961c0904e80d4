//! Session resolution: explicit values first, config environment second

use crate::config::{Config, DEFAULT_CONFIG_ENV};
use crate::session::Session;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Merge explicit session values with a config environment.
///
/// When both address and password are explicit the config is ignored
/// entirely. Otherwise every field falls back independently to the
/// environment named `env` (`default` when `None`). A missing environment
/// contributes nothing and is not an error.
pub fn resolve(explicit: Session, config: &Config, env: Option<&str>) -> Session {
    if !explicit.address.is_empty() && !explicit.password.is_empty() {
        return explicit;
    }

    let name = env.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_CONFIG_ENV);
    let Some(environment) = config.environment(name) else {
        debug!("Config environment {} not found", name);
        return explicit;
    };

    let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);
    let mut session = explicit;

    if session.address.is_empty() {
        session.address = non_empty(&environment.address).unwrap_or_default();
    }
    if session.password.is_empty() {
        session.password = non_empty(&environment.password).unwrap_or_default();
    }
    if session.log.is_none() {
        session.log = non_empty(&environment.log).map(PathBuf::from);
    }
    if session.protocol.is_none() {
        // Config::validate has already rejected unknown tags
        session.protocol = environment.protocol().ok().flatten();
    }
    if !session.skip_errors {
        session.skip_errors = environment.skip_errors.unwrap_or(false);
    }
    // Zero seconds means unset, like a missing value
    if session.timeout.is_none_or(|t| t.is_zero()) {
        session.timeout = environment
            .timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
    }

    debug!("Resolved session from {} environment: {:?}", name, session);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::session::{DEFAULT_TIMEOUT, Protocol};
    use std::collections::BTreeMap;

    fn config_with(name: &str, environment: Environment) -> Config {
        let mut map = BTreeMap::new();
        map.insert(name.to_string(), environment);
        Config::from(map)
    }

    fn full_environment() -> Environment {
        Environment {
            address: Some("A".into()),
            password: Some("P".into()),
            log: Some("L".into()),
            protocol: Some("telnet".into()),
            skip_errors: Some(true),
            timeout: Some(3),
        }
    }

    #[test]
    fn test_default_environment_fills_everything() {
        let config = config_with(
            "default",
            Environment {
                address: Some("A".into()),
                password: Some("P".into()),
                log: Some("L".into()),
                ..Default::default()
            },
        );

        let session = resolve(Session::default(), &config, None);
        assert_eq!(session.address, "A");
        assert_eq!(session.password, "P");
        assert_eq!(session.log, Some(PathBuf::from("L")));
        assert_eq!(session.protocol, None);
    }

    #[test]
    fn test_explicit_credentials_ignore_config() {
        let config = config_with("default", full_environment());
        let explicit = Session::new("127.0.0.1:16260", "secret");

        let session = resolve(explicit.clone(), &config, None);
        assert_eq!(session, explicit);
        assert_eq!(session.log, None);
        assert_eq!(session.protocol, None);
    }

    #[test]
    fn test_per_field_precedence() {
        let config = config_with("prod", full_environment());
        let explicit = Session {
            address: "explicit:1".into(),
            protocol: Some(Protocol::Web),
            ..Default::default()
        };

        let session = resolve(explicit, &config, Some("prod"));
        assert_eq!(session.address, "explicit:1");
        assert_eq!(session.password, "P");
        assert_eq!(session.protocol, Some(Protocol::Web));
        assert_eq!(session.log, Some(PathBuf::from("L")));
        assert!(session.skip_errors);
        assert_eq!(session.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_missing_environment_is_not_an_error() {
        let config = config_with("default", full_environment());
        let explicit = Session::new("", "secret");

        let session = resolve(explicit, &config, Some("staging"));
        assert_eq!(session.address, "");
        assert_eq!(session.password, "secret");
        assert_eq!(session.log, None);
    }

    #[test]
    fn test_zero_timeout_counts_as_unset() {
        let config = config_with(
            "default",
            Environment {
                timeout: Some(0),
                ..Default::default()
            },
        );

        let session = resolve(Session::default(), &config, None);
        assert_eq!(session.timeout, None);
        assert_eq!(session.timeout(), DEFAULT_TIMEOUT);

        // An explicit zero falls back to the environment
        let config = config_with("default", full_environment());
        let explicit = Session {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        let session = resolve(explicit, &config, None);
        assert_eq!(session.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let config = config_with(
            "default",
            Environment {
                address: Some(String::new()),
                log: Some(String::new()),
                protocol: Some(String::new()),
                ..Default::default()
            },
        );

        let session = resolve(Session::default(), &config, Some(""));
        assert_eq!(session.address, "");
        assert_eq!(session.log, None);
        assert_eq!(session.protocol, None);
    }
}

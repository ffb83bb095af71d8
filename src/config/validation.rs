use crate::config::types::{Config, MongoConfig};
use crate::{ConfigError, ConfigResult};

/// Characters MongoDB rejects in database names
const FORBIDDEN_DATABASE_CHARS: &[char] = &[
    '/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0',
];

/// Longest database name MongoDB accepts, in bytes
const MAX_DATABASE_NAME_LEN: usize = 63;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_mongo_config(&config.mongo)
}

/// Validates MongoDB connection settings
pub fn validate_mongo_config(config: &MongoConfig) -> ConfigResult<()> {
    validate_uri(&config.uri)?;

    if let Some(database) = &config.database {
        validate_database_name(database)?;
    }

    if let Some(name) = &config.cookie_collection {
        validate_collection_name(name)?;
    }

    if let Some(name) = &config.request_collection {
        validate_collection_name(name)?;
    }

    // Compare after defaults so an explicit name equal to the other default is caught too
    let resolved = config.resolve();
    if resolved.cookie_collection == resolved.request_collection {
        return Err(ConfigError::Validation(format!(
            "cookie-collection and request-collection must differ, both are '{}'",
            resolved.cookie_collection
        )));
    }

    for (field, value) in [
        ("timeout-ms", config.timeout_ms),
        ("init-timeout-ms", config.init_timeout_ms),
        ("find-timeout-ms", config.find_timeout_ms),
        ("insert-timeout-ms", config.insert_timeout_ms),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!(
                "{} must be greater than 0",
                field
            )));
        }
    }

    Ok(())
}

/// Validates a MongoDB connection string (scheme and host presence only)
fn validate_uri(uri: &str) -> ConfigResult<()> {
    if uri.is_empty() {
        return Err(ConfigError::Validation("uri cannot be empty".to_string()));
    }

    let rest = uri
        .strip_prefix("mongodb://")
        .or_else(|| uri.strip_prefix("mongodb+srv://"))
        .ok_or_else(|| {
            ConfigError::InvalidUri(format!(
                "'{}' must start with mongodb:// or mongodb+srv://",
                uri
            ))
        })?;

    let hosts = rest.split(['/', '?']).next().unwrap_or_default();
    let hosts = hosts.rsplit('@').next().unwrap_or_default();
    if hosts.is_empty() {
        return Err(ConfigError::InvalidUri(format!("'{}' has no host", uri)));
    }

    Ok(())
}

/// Validates a database name against MongoDB's naming rules
fn validate_database_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "database cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(ConfigError::Validation(format!(
            "database name '{}' is longer than {} bytes",
            name, MAX_DATABASE_NAME_LEN
        )));
    }

    if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(ConfigError::Validation(format!(
            "database name '{}' contains forbidden character {:?}",
            name, c
        )));
    }

    Ok(())
}

/// Validates a collection name against MongoDB's naming rules
fn validate_collection_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "collection name cannot be empty".to_string(),
        ));
    }

    if name.contains('$') || name.contains('\0') {
        return Err(ConfigError::Validation(format!(
            "collection name '{}' cannot contain '$' or NUL",
            name
        )));
    }

    if name.starts_with("system.") {
        return Err(ConfigError::Validation(format!(
            "collection name '{}' uses the reserved 'system.' prefix",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uri() {
        assert!(validate_uri("mongodb://localhost:27017").is_ok());
        assert!(validate_uri("mongodb://user:pw@a:1,b:2/?replicaSet=rs0").is_ok());
        assert!(validate_uri("mongodb+srv://cluster.example.com").is_ok());

        assert!(validate_uri("").is_err());
        assert!(validate_uri("http://localhost:27017").is_err());
        assert!(validate_uri("mongodb://").is_err());
        assert!(validate_uri("mongodb://user@/db").is_err());
    }

    #[test]
    fn test_validate_database_name() {
        assert!(validate_database_name("colly").is_ok());
        assert!(validate_database_name("crawl_2024-01").is_ok());

        assert!(validate_database_name("").is_err());
        assert!(validate_database_name("my.db").is_err());
        assert!(validate_database_name("has space").is_err());
        assert!(validate_database_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_collection_name() {
        assert!(validate_collection_name("cookie").is_ok());
        assert!(validate_collection_name("crawl.cookies").is_ok());

        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("price$").is_err());
        assert!(validate_collection_name("system.users").is_err());
    }

    #[test]
    fn test_collections_must_differ() {
        let config = MongoConfig::new("mongodb://localhost").with_cookie_collection("request");
        let result = validate_mongo_config(&config);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = MongoConfig {
            find_timeout_ms: Some(0),
            ..MongoConfig::new("mongodb://localhost")
        };
        assert!(validate_mongo_config(&config).is_err());
    }
}

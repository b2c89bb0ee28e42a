use super::ConfigError;

/// Resolves `${...}` placeholders found in string config values.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Default resolver: environment variables, or `file:` to read a mounted secret.
pub struct DefaultSecretResolver;

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        if let Some(path) = reference.strip_prefix("file:") {
            std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("secret file '{}': {}", path.trim(), e)))
        } else if let Some(var) = reference.strip_prefix("env:") {
            std::env::var(var.trim()).map_err(|_| ConfigError::NotFound(format!("env:{}", var.trim())))
        } else {
            std::env::var(reference.trim()).map_err(|_| ConfigError::NotFound(reference.trim().to_string()))
        }
    }
}

pub fn resolve_placeholders(value: &str, resolver: &dyn SecretResolver) -> Result<String, ConfigError> {
    let mut result = value.to_string();
    while let Some(start) = result.find("${") {
        let end = result[start..]
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("unclosed placeholder in: {value}")))?;
        let reference = &result[start + 2..start + end];
        let resolved = resolver.resolve(reference)?;
        result = format!("{}{}{}", &result[..start], resolved, &result[start + end + 1..]);
    }
    Ok(result)
}

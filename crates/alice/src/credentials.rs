use std::env;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("Missing credential: {0} is not set")]
    Missing(String),

    #[error("Missing credential: {0} is blank")]
    Blank(String),
}

/// Read access to the process environment, so credential lookups can be mocked in tests
#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, env::VarError>;
}

pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

/// Resolve the secret held in `var_name`. Absent and whitespace-only values are both errors.
pub fn resolve_credential(var_name: &str, env: &dyn Environment) -> Result<String, CredentialError> {
    match env.get_var(var_name) {
        Ok(value) if value.trim().is_empty() => Err(CredentialError::Blank(var_name.to_string())),
        Ok(value) => Ok(value),
        Err(_) => Err(CredentialError::Missing(var_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    const TEST_KEY: &str = "TEST_API_KEY";

    #[test]
    fn test_resolve_present() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq(TEST_KEY))
            .times(1)
            .return_once(|_| Ok("secret".to_string()));

        assert_eq!(resolve_credential(TEST_KEY, &mock_env).as_deref(), Ok("secret"));
    }

    #[test]
    fn test_resolve_missing() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq(TEST_KEY))
            .times(1)
            .return_once(|_| Err(env::VarError::NotPresent));

        assert_eq!(
            resolve_credential(TEST_KEY, &mock_env),
            Err(CredentialError::Missing(TEST_KEY.to_string()))
        );
    }

    #[test]
    fn test_resolve_blank() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq(TEST_KEY))
            .times(1)
            .return_once(|_| Ok("   ".to_string()));

        assert_eq!(
            resolve_credential(TEST_KEY, &mock_env),
            Err(CredentialError::Blank(TEST_KEY.to_string()))
        );
    }
}

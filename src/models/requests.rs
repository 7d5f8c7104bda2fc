//! Request DTOs for the math API
//!
//! Query parameters arrive as raw strings so malformed values produce the
//! service's own 400 message instead of the extractor's.

use serde::Deserialize;

use crate::math::Computation;

const POW_ERROR: &str = "Missing or invalid 'base' or 'exp'";
const N_ERROR: &str = "Missing or invalid 'n'";
pub(crate) const LOGIN_ERROR: &str = "Missing username or password";

/// Upper bounds on arguments accepted at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub max_exponent: u32,
    pub max_n: u64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_exponent: 10_000,
            max_n: 10_000,
        }
    }
}

/// Query for GET /api/math/pow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowQuery {
    pub base: Option<String>,
    pub exp: Option<String>,
}

impl PowQuery {
    /// Validates the query into a power computation.
    ///
    /// Returns the error message on failure.
    pub fn validate(&self, limits: &InputLimits) -> Result<Computation, String> {
        let base = parse_field::<i64>(self.base.as_deref()).ok_or(POW_ERROR)?;
        let exp = parse_field::<u32>(self.exp.as_deref()).ok_or(POW_ERROR)?;
        if exp > limits.max_exponent {
            return Err(format!(
                "'exp' exceeds maximum of {}",
                limits.max_exponent
            ));
        }
        Ok(Computation::Power { base, exp })
    }
}

/// Query for GET /api/math/fib and GET /api/math/factorial
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NQuery {
    pub n: Option<String>,
}

impl NQuery {
    fn validated_n(&self, limits: &InputLimits) -> Result<u64, String> {
        let n = parse_field::<u64>(self.n.as_deref()).ok_or(N_ERROR)?;
        if n > limits.max_n {
            return Err(format!("'n' exceeds maximum of {}", limits.max_n));
        }
        Ok(n)
    }

    pub fn fibonacci(&self, limits: &InputLimits) -> Result<Computation, String> {
        self.validated_n(limits).map(|n| Computation::Fibonacci { n })
    }

    pub fn factorial(&self, limits: &InputLimits) -> Result<Computation, String> {
        self.validated_n(limits).map(|n| Computation::Factorial { n })
    }
}

/// Body for POST /auth/login
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(username, password)` when both are present and non-empty.
    pub fn credentials(&self) -> Result<(&str, &str), String> {
        let username = self.username.as_deref().filter(|u| !u.trim().is_empty());
        let password = self.password.as_deref().filter(|p| !p.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok((username.trim(), password)),
            _ => Err(LOGIN_ERROR.to_string()),
        }
    }
}

fn parse_field<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pow(base: Option<&str>, exp: Option<&str>) -> PowQuery {
        PowQuery {
            base: base.map(String::from),
            exp: exp.map(String::from),
        }
    }

    fn n(value: &str) -> NQuery {
        NQuery {
            n: Some(value.to_string()),
        }
    }

    #[test]
    fn test_pow_query_deserialize() {
        let json = r#"{"base": "2", "exp": "8"}"#;
        let query: PowQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.base.as_deref(), Some("2"));
        assert_eq!(query.exp.as_deref(), Some("8"));
    }

    #[test]
    fn test_pow_valid() {
        let limits = InputLimits::default();
        assert_eq!(
            pow(Some("2"), Some("8")).validate(&limits),
            Ok(Computation::Power { base: 2, exp: 8 })
        );
        assert_eq!(
            pow(Some("-3"), Some("0")).validate(&limits),
            Ok(Computation::Power { base: -3, exp: 0 })
        );
    }

    #[test]
    fn test_pow_missing_or_invalid() {
        let limits = InputLimits::default();
        assert_eq!(pow(None, Some("8")).validate(&limits), Err(POW_ERROR.to_string()));
        assert_eq!(pow(Some("2"), None).validate(&limits), Err(POW_ERROR.to_string()));
        assert_eq!(pow(Some("x"), Some("8")).validate(&limits), Err(POW_ERROR.to_string()));
        assert_eq!(pow(Some("2"), Some("-1")).validate(&limits), Err(POW_ERROR.to_string()));
    }

    #[test]
    fn test_pow_exponent_limit() {
        let limits = InputLimits {
            max_exponent: 100,
            max_n: 100,
        };
        assert!(pow(Some("2"), Some("100")).validate(&limits).is_ok());
        assert!(pow(Some("2"), Some("101")).validate(&limits).is_err());
    }

    #[test]
    fn test_n_query() {
        let limits = InputLimits::default();
        assert_eq!(n("7").fibonacci(&limits), Ok(Computation::Fibonacci { n: 7 }));
        assert_eq!(n("0").factorial(&limits), Ok(Computation::Factorial { n: 0 }));
        assert_eq!(n("-1").fibonacci(&limits), Err(N_ERROR.to_string()));
        assert_eq!(n("1.5").factorial(&limits), Err(N_ERROR.to_string()));
        assert_eq!(NQuery::default().fibonacci(&limits), Err(N_ERROR.to_string()));
    }

    #[test]
    fn test_n_limit() {
        let limits = InputLimits {
            max_exponent: 10,
            max_n: 10,
        };
        assert!(n("11").factorial(&limits).is_err());
    }

    #[test]
    fn test_login_credentials() {
        let login = LoginRequest {
            username: Some(" testuser ".to_string()),
            password: Some("s3cret".to_string()),
        };
        assert_eq!(login.credentials(), Ok(("testuser", "s3cret")));

        let missing = LoginRequest {
            username: Some("testuser".to_string()),
            password: None,
        };
        assert_eq!(missing.credentials(), Err(LOGIN_ERROR.to_string()));
        assert!(LoginRequest::default().credentials().is_err());
    }
}

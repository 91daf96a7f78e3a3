use std::fmt;

/// Merchant credentials issued by SecurePay.
#[derive(Clone, PartialEq, Eq)]
pub struct Merchant {
    pub merchant_id: String,
    pub password: String,
}

impl Merchant {
    pub fn new(merchant_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Merchant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Merchant")
            .field("merchant_id", &self.merchant_id)
            .field("password", &"****")
            .finish()
    }
}

/// Which SecurePay host a merchant talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// `test.securepay.com.au`
    Test,
    /// `api.securepay.com.au`
    Live,
}

impl Environment {
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Environment::Test
        } else {
            Environment::Live
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Environment::Test)
    }

    pub fn host(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Live => "api",
        }
    }
}

/// Everything needed to talk to the gateway on behalf of one merchant.
/// Passed explicitly to each lifecycle call.
#[derive(Debug, Clone)]
pub struct GatewayProfile {
    pub merchant: Merchant,
    pub environment: Environment,
    /// Overrides `https://<host>.securepay.com.au`, e.g. for a local mock.
    pub base_url: Option<String>,
}

impl GatewayProfile {
    pub fn new(merchant: Merchant, environment: Environment) -> Self {
        Self {
            merchant,
            environment,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_password() {
        let merchant = Merchant::new("ABC0001", "abc123");
        let debug = format!("{:?}", merchant);
        assert!(debug.contains("ABC0001"));
        assert!(!debug.contains("abc123"));
    }

    #[test]
    fn test_environment_from_debug_flag() {
        assert_eq!(Environment::from_debug_flag(true).host(), "test");
        assert_eq!(Environment::from_debug_flag(false).host(), "api");
    }
}

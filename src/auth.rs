use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Gate checked before the front end may use the session.
pub trait Authenticator {
    fn authenticate(&self, credentials: &Credentials) -> bool;
}

/// Single configured username/password pair. Not a security boundary.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, credentials: &Credentials) -> bool {
        credentials.username.trim() == self.username && credentials.password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(u: &str, p: &str) -> Credentials {
        Credentials {
            username: u.to_string(),
            password: p.to_string(),
        }
    }

    #[test]
    fn static_credentials_match_exactly() {
        let auth = StaticCredentials::new("admin", "123");
        assert!(auth.authenticate(&creds("admin", "123")));
        assert!(auth.authenticate(&creds(" admin ", "123")));
        assert!(!auth.authenticate(&creds("admin", "1234")));
        assert!(!auth.authenticate(&creds("Admin", "123")));
        assert!(!auth.authenticate(&creds("", "")));
    }

    #[test]
    fn credentials_deserialize_from_params() {
        let c: Credentials =
            serde_json::from_value(serde_json::json!({ "username": "a", "password": "b" }))
                .expect("credentials");
        assert_eq!(c.username, "a");
        assert_eq!(c.password, "b");
    }
}

//! Credential settings for the TM1 client.
//!
//! Responsibilities:
//! - Hold every credential-shaped option (basic, CAM, integrated login,
//!   session reuse, service-to-service, API key, access token).
//! - Handle serialization of optional secret values.
//!
//! Does NOT handle:
//! - Deciding which authentication mode applies (see client crate `auth`).
//! - Building Authorization headers or token exchange.
//!
//! Invariants:
//! - Every secret is an `Option<SecretString>`; `Debug` never prints it.
//! - Serialization includes secrets so a caller can persist a config as JSON;
//!   `secrecy` guards runtime logging only.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Module for serializing `Option<SecretString>` as an optional string.
pub(crate) mod opt_secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret
            .as_ref()
            .map(|s| s.expose_secret())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|s| SecretString::new(s.into())))
    }
}

/// Credentials and authentication hints.
///
/// Which fields are consulted depends on the authentication mode the client
/// derives from the whole configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// User name for basic, CAM, PA proxy, and service-to-service logins.
    pub user: Option<String>,
    /// Password for basic, CAM, and PA proxy logins.
    #[serde(with = "opt_secret_string")]
    pub password: Option<SecretString>,
    /// Base64-decode `password` before use.
    pub decode_base64: bool,
    /// CAM namespace.
    pub namespace: Option<String>,
    /// CAM gateway URL (selects CAM SSO).
    pub gateway: Option<String>,
    /// Pre-obtained CAM passport for SSO.
    #[serde(with = "opt_secret_string")]
    pub cam_passport: Option<SecretString>,
    /// Use Windows integrated authentication.
    pub integrated_login: bool,
    pub integrated_login_domain: Option<String>,
    pub integrated_login_service: Option<String>,
    pub integrated_login_host: Option<String>,
    pub integrated_login_delegate: bool,
    /// Existing session id to resume instead of logging in.
    #[serde(with = "opt_secret_string")]
    pub session_id: Option<SecretString>,
    /// Planning Analytics 12 application client id.
    pub application_client_id: Option<String>,
    /// Planning Analytics 12 application client secret.
    #[serde(with = "opt_secret_string")]
    pub application_client_secret: Option<SecretString>,
    /// API key for IBM Cloud or PA 12 local deployments.
    #[serde(with = "opt_secret_string")]
    pub api_key: Option<SecretString>,
    /// Pre-obtained bearer token.
    #[serde(with = "opt_secret_string")]
    pub access_token: Option<SecretString>,
}

impl AuthConfig {
    /// Username/password credentials.
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(SecretString::new(password.into().into())),
            ..Self::default()
        }
    }

    /// CAM namespace credentials.
    pub fn cam(
        user: impl Into<String>,
        password: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::basic(user, password)
        }
    }

    /// Resume an existing session.
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(SecretString::new(session_id.into().into())),
            ..Self::default()
        }
    }

    /// IBM Cloud / PA 12 API key.
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::new(api_key.into().into())),
            ..Self::default()
        }
    }

    /// Pre-obtained bearer token.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(SecretString::new(token.into().into())),
            ..Self::default()
        }
    }

    /// PA 12 named-application credentials acting on behalf of `user`.
    pub fn service_to_service(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            application_client_id: Some(client_id.into()),
            application_client_secret: Some(SecretString::new(client_secret.into().into())),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_basic_constructor() {
        let auth = AuthConfig::basic("admin", "apple");
        assert_eq!(auth.user.as_deref(), Some("admin"));
        assert_eq!(auth.password.unwrap().expose_secret(), "apple");
        assert!(auth.namespace.is_none());
    }

    #[test]
    fn test_cam_constructor_keeps_credentials() {
        let auth = AuthConfig::cam("jane", "pw", "LDAP");
        assert_eq!(auth.namespace.as_deref(), Some("LDAP"));
        assert_eq!(auth.user.as_deref(), Some("jane"));
    }

    #[test]
    fn test_debug_does_not_expose_secrets() {
        let auth = AuthConfig {
            api_key: Some(SecretString::new("api-key-secret-1".to_string().into())),
            access_token: Some(SecretString::new("token-secret-2".to_string().into())),
            ..AuthConfig::basic("admin", "password-secret-3")
        };

        let debug_output = format!("{:?}", auth);
        assert!(!debug_output.contains("api-key-secret-1"));
        assert!(!debug_output.contains("token-secret-2"));
        assert!(!debug_output.contains("password-secret-3"));
        assert!(debug_output.contains("admin"));
    }

    #[test]
    fn test_secrets_serialize_as_plain_strings() {
        let auth = AuthConfig::session("abc123");
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["session_id"], "abc123");
        assert!(json["password"].is_null());

        let back: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.session_id.unwrap().expose_secret(), "abc123");
    }

    #[test]
    fn test_missing_fields_default() {
        let auth: AuthConfig = serde_json::from_str(r#"{"user": "admin"}"#).unwrap();
        assert_eq!(auth.user.as_deref(), Some("admin"));
        assert!(!auth.integrated_login);
        assert!(auth.password.is_none());
    }
}

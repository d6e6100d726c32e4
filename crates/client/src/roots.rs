//! Service root derivation.
//!
//! Turns a [`Config`] into the base URL every request path is appended to and
//! the URL the session is opened against. Deployment shapes are recognized in
//! a fixed order: IBM Cloud, Planning Analytics 12 instance, PA proxy behind
//! Cloud Pak for Data, explicit base URL, classic v11 address and port.

use tm1_config::Config;
use tm1_config::constants::DEFAULT_IAM_URL;

use crate::endpoints::url_encoding::escape_spaces;
use crate::error::{ClientError, Result};

const PRODUCT_VERSION_PATH: &str = "/Configuration/ProductVersion/$value";

/// Derived URLs for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoots {
    /// Root for every OData path, without a trailing slash.
    pub base_url: String,
    /// Login endpoint, or the token endpoint for PA proxy.
    pub auth_url: String,
    /// Where the PA proxy session is opened once a token was obtained.
    pub session_url: Option<String>,
    /// IAM root for IBM Cloud token exchange.
    pub iam_url: Option<String>,
}

impl ServiceRoots {
    /// Whether the login endpoint returns the product version as its body.
    pub fn auth_returns_version(&self) -> bool {
        self.auth_url.ends_with(PRODUCT_VERSION_PATH)
    }

    /// Whether the base addresses a v12 database (`/Databases('x')`).
    pub fn is_database_root(&self) -> bool {
        self.base_url.contains("/Databases(")
    }
}

fn scheme(ssl: bool) -> &'static str {
    if ssl { "https" } else { "http" }
}

fn required<'a>(value: &'a Option<String>, what: &str, deployment: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ClientError::Config(format!("{deployment} requires {what}")))
}

fn host_port(address: &str, port: Option<u16>) -> String {
    match port {
        Some(p) => format!("{address}:{p}"),
        None => address.to_string(),
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Derive the service roots for `config`.
pub fn resolve(config: &Config) -> Result<ServiceRoots> {
    let conn = &config.connection;
    let auth = &config.auth;
    let scheme = scheme(conn.ssl);

    let mut roots = if auth.api_key.is_some() && conn.tenant.is_some() {
        if !conn.ssl {
            return Err(ClientError::Config(
                "IBM Cloud connections require ssl=true".to_string(),
            ));
        }
        let address = required(&conn.address, "address", "IBM Cloud")?;
        let tenant = required(&conn.tenant, "tenant", "IBM Cloud")?;
        let database = required(&conn.database, "database", "IBM Cloud")?;
        let base = format!("https://{address}/api/{tenant}/v0/tm1/{database}");
        ServiceRoots {
            auth_url: format!("{base}{PRODUCT_VERSION_PATH}"),
            base_url: base,
            session_url: None,
            iam_url: Some(trim_slash(
                conn.iam_url.as_deref().unwrap_or(DEFAULT_IAM_URL),
            )),
        }
    } else if conn.instance.is_some() && conn.database.is_some() {
        let address = required(&conn.address, "address", "Planning Analytics 12")?;
        let instance = required(&conn.instance, "instance", "Planning Analytics 12")?;
        let database = required(&conn.database, "database", "Planning Analytics 12")?;
        let root = format!("{scheme}://{}/{instance}", host_port(address, conn.port));
        ServiceRoots {
            base_url: format!("{root}/api/v1/Databases('{database}')"),
            auth_url: format!("{root}/auth/v1/session"),
            session_url: None,
            iam_url: conn.iam_url.as_deref().map(trim_slash),
        }
    } else if let Some(cpd_url) = &conn.cpd_url {
        let database = required(&conn.database, "database", "PA proxy")?;
        let origin = match &conn.pa_url {
            Some(pa_url) => trim_slash(pa_url),
            None => format!(
                "{scheme}://{}",
                required(&conn.address, "address or pa_url", "PA proxy")?
            ),
        };
        ServiceRoots {
            base_url: format!("{origin}/tm1/{database}/api/v1"),
            auth_url: format!("{}/v1/preauth/signin", trim_slash(cpd_url)),
            session_url: Some(format!("{origin}/login")),
            iam_url: None,
        }
    } else if let Some(base_url) = &conn.base_url {
        let base = trim_slash(base_url);
        let base = if base.ends_with("/api/v1") || base.contains("/api/v1/Databases") {
            if base.contains("/api/v1/Databases") && conn.auth_url.is_none() {
                return Err(ClientError::Config(
                    "auth_url is required when base_url addresses a database".to_string(),
                ));
            }
            base
        } else {
            format!("{base}/api/v1")
        };
        ServiceRoots {
            auth_url: format!("{base}{PRODUCT_VERSION_PATH}"),
            base_url: base,
            session_url: None,
            iam_url: conn.iam_url.as_deref().map(trim_slash),
        }
    } else {
        let address = conn.address.as_deref().unwrap_or("localhost");
        let port = conn.port.ok_or_else(|| {
            ClientError::Config("port is required for a v11 address".to_string())
        })?;
        let base = format!("{scheme}://{address}:{port}/api/v1");
        ServiceRoots {
            auth_url: format!("{base}{PRODUCT_VERSION_PATH}"),
            base_url: base,
            session_url: None,
            iam_url: None,
        }
    };

    if let Some(explicit) = &conn.auth_url {
        roots.auth_url = trim_slash(explicit);
    }
    roots.base_url = escape_spaces(&roots.base_url);
    roots.auth_url = escape_spaces(&roots.auth_url);
    Ok(roots)
}

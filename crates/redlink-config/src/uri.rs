//! Connection URI generation.
//!
//! ```text
//! redis[s]://[username:password@|:password@]host:port/db[?ssl_params]
//! ```
//!
//! TLS query parameters are appended only when `ssl` is enabled, in the fixed
//! order `ssl_cert_reqs`, `ssl_ca_certs`, `ssl_keyfile`, `ssl_certfile`,
//! `ssl_ca_path`.

use crate::ConnectionSettings;
use url::form_urlencoded;

const MASK: &str = "***";

/// Builds the connection URI for `settings`.
///
/// Pure and deterministic: the same settings always give the same string.
pub fn generate_connection_uri(settings: &ConnectionSettings) -> String {
    build(settings, &urlencoding::encode(&settings.password))
}

/// Same as [`generate_connection_uri`], with any password replaced by `***`.
pub fn redacted_connection_uri(settings: &ConnectionSettings) -> String {
    let password = if settings.password.is_empty() { "" } else { MASK };
    build(settings, password)
}

fn build(settings: &ConnectionSettings, encoded_password: &str) -> String {
    let scheme = if settings.ssl { "rediss" } else { "redis" };

    let auth = match settings.username.as_deref() {
        Some(username) => format!("{}:{}@", urlencoding::encode(username), encoded_password),
        None if !settings.password.is_empty() => format!(":{}@", encoded_password),
        None => String::new(),
    };

    let mut uri = format!(
        "{}://{}{}:{}/{}",
        scheme, auth, settings.host, settings.port, settings.db
    );

    if settings.ssl {
        if let Some(query) = tls_query(settings) {
            uri.push('?');
            uri.push_str(&query);
        }
    }

    uri
}

fn tls_query(settings: &ConnectionSettings) -> Option<String> {
    let params = [
        ("ssl_cert_reqs", Some(settings.ssl_cert_reqs.as_str())),
        ("ssl_ca_certs", settings.ssl_ca_certs.as_deref()),
        ("ssl_keyfile", settings.ssl_keyfile.as_deref()),
        ("ssl_certfile", settings.ssl_certfile.as_deref()),
        ("ssl_ca_path", settings.ssl_ca_path.as_deref()),
    ];

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            serializer.append_pair(key, value);
            any = true;
        }
    }

    any.then(|| serializer.finish())
}

impl ConnectionSettings {
    /// Builds the connection URI. See [`generate_connection_uri`].
    pub fn connection_uri(&self) -> String {
        generate_connection_uri(self)
    }

    /// Builds the connection URI with the password masked.
    pub fn redacted_uri(&self) -> String {
        redacted_connection_uri(self)
    }
}

use crate::core::ConfigurationError;
use url::Url;

/// Turns database paths into request URLs.
///
/// Production databases are addressed as `https://<namespace>.<host>/<path>`;
/// an emulator as `http://<emulator host>/<path>?ns=<namespace>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base: Url,
    namespace: String,
    default_query: Vec<(String, String)>,
}

impl UrlBuilder {
    /// Accepts database URLs of the form `https://<namespace>.<host>`.
    pub fn new(database_url: &str) -> Result<Self, ConfigurationError> {
        let database_url = database_url.trim_end_matches('/');
        let invalid = || ConfigurationError::InvalidDatabaseUrl(database_url.to_string());

        let rest = database_url.strip_prefix("https://").ok_or_else(invalid)?;
        let (namespace, host) = rest.split_once('.').ok_or_else(invalid)?;

        if namespace.is_empty() || host.is_empty() {
            return Err(invalid());
        }

        let base = Url::parse(database_url).map_err(|_| invalid())?;

        Ok(Self {
            base,
            namespace: namespace.to_string(),
            default_query: Vec::new(),
        })
    }

    /// Sends every request to a local emulator instead, keeping the namespace.
    pub fn with_emulator_host(self, emulator_host: &str) -> Result<Self, ConfigurationError> {
        let base = Url::parse(&format!("http://{}", emulator_host))?;

        Ok(Self {
            base,
            default_query: vec![("ns".to_string(), self.namespace.clone())],
            namespace: self.namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The URL of `path`. Surrounding slashes are ignored; the root is `<base>/`.
    pub fn url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("/{}", path.trim_matches('/')));

        if !self.default_query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.default_query);
        }

        url
    }
}

//! Backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::backend::ContractBackend;
use crate::error::StoreError;
use crate::memory::MemoryBackend;

/// Where contract rows come from. A fixture wins over a URL.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub fixture: Option<PathBuf>,
}

impl BackendConfig {
    pub fn connect(&self) -> Result<Arc<dyn ContractBackend>, StoreError> {
        if let Some(path) = &self.fixture {
            info!(path = %path.display(), "using fixture backend");
            return Ok(Arc::new(MemoryBackend::from_path(path)?));
        }
        match (&self.url, &self.api_key) {
            (Some(url), Some(key)) => self.connect_rest(url, key),
            (Some(_), None) => Err(StoreError::Other("a backend URL needs an API key".into())),
            (None, _) => Err(StoreError::Other(
                "no backend configured: pass a fixture or a URL".into(),
            )),
        }
    }

    #[cfg(feature = "http")]
    fn connect_rest(&self, url: &str, key: &str) -> Result<Arc<dyn ContractBackend>, StoreError> {
        info!(url, "using REST backend");
        Ok(Arc::new(crate::rest::RestBackend::new(url, key)?))
    }

    #[cfg(not(feature = "http"))]
    fn connect_rest(&self, _url: &str, _key: &str) -> Result<Arc<dyn ContractBackend>, StoreError> {
        Err(StoreError::Other(
            "built without the `http` feature; only fixtures are available".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::FIXTURE;
    use std::io::Write;

    #[test]
    fn fixture_takes_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let config = BackendConfig {
            url: Some("https://abc.supabase.co".into()),
            api_key: None,
            fixture: Some(file.path().to_path_buf()),
        };
        let backend = config.connect().unwrap();
        assert_eq!(backend.backend_tag(), "memory");
    }

    #[test]
    fn url_without_key_is_rejected() {
        let config = BackendConfig {
            url: Some("https://abc.supabase.co".into()),
            ..BackendConfig::default()
        };
        assert!(matches!(config.connect(), Err(StoreError::Other(_))));
        assert!(BackendConfig::default().connect().is_err());
    }
}

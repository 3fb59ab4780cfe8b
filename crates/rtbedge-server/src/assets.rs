//! Static assets for the exchange simulator.

use rtbedge_common::{Result, RtbError};
use std::path::{Component, Path, PathBuf};

/// Location of the simulator page and its scripts.
#[derive(Debug, Clone)]
pub struct AssetServer {
    web_root: PathBuf,
    simulator_page: PathBuf,
}

impl Default for AssetServer {
    fn default() -> Self {
        Self::new("web")
    }
}

impl AssetServer {
    /// Serves files below `web_root`; the simulator page is
    /// `<web_root>/exchange.html`.
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        let web_root = web_root.into();
        let simulator_page = web_root.join("exchange.html");
        Self {
            web_root,
            simulator_page,
        }
    }

    pub async fn simulator_page(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.simulator_page).await?)
    }

    /// Reads `rel` below the web root.
    ///
    /// Only plain relative paths are served; `..`, absolute paths and empty
    /// paths are rejected as invalid requests.
    pub async fn web_file(&self, rel: &str) -> Result<Vec<u8>> {
        let rel_path = Path::new(rel);
        let plain = rel_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if rel.is_empty() || !plain {
            return Err(RtbError::InvalidRequest(format!("asset path not allowed: {}", rel)));
        }
        Ok(tokio::fs::read(self.web_root.join(rel_path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn web_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("exchange.html"), "<html>sim</html>").unwrap();
        fs::create_dir(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js").join("app.js"), "var x = 1;").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_simulator_page() {
        let dir = web_root();
        let assets = AssetServer::new(dir.path());
        assert_eq!(assets.simulator_page().await.unwrap(), b"<html>sim</html>");
    }

    #[tokio::test]
    async fn test_web_file() {
        let dir = web_root();
        let assets = AssetServer::new(dir.path());
        assert_eq!(assets.web_file("js/app.js").await.unwrap(), b"var x = 1;");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = web_root();
        let assets = AssetServer::new(dir.path());
        assert!(matches!(assets.web_file("js/none.js").await, Err(RtbError::Io(_))));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = web_root();
        let assets = AssetServer::new(dir.path().join("js"));
        assert!(matches!(
            assets.web_file("../exchange.html").await,
            Err(RtbError::InvalidRequest(_))
        ));
        assert!(assets.web_file("/etc/passwd").await.is_err());
        assert!(assets.web_file("").await.is_err());
    }
}

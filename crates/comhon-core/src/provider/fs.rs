use super::{ManifestProvider, ProviderError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Manifest provider reading a directory tree
///
/// Model `A\B\C` maps to `<root>/A/B/C/<manifest_file>`. Named patterns are
/// read from a single JSON object file under the root.
#[derive(Debug, Clone)]
pub struct FsManifestProvider {
    root: PathBuf,
    manifest_file: String,
    pattern_file: Option<String>,
}

impl FsManifestProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_file: "manifest.json".to_string(),
            pattern_file: None,
        }
    }

    pub fn with_manifest_file(mut self, file: impl Into<String>) -> Self {
        self.manifest_file = file.into();
        self
    }

    pub fn with_pattern_file(mut self, file: impl Into<String>) -> Self {
        self.pattern_file = Some(file.into());
        self
    }

    /// Location of the manifest of `model`
    pub fn manifest_path(&self, model: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in model.split('\\').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&self.manifest_file);
        path
    }

    async fn read(path: &Path) -> Result<String, ProviderError> {
        tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProviderError::not_found(path.display().to_string()),
            ErrorKind::PermissionDenied => ProviderError {
                status: super::ProviderStatus::Unauthorized,
                message: path.display().to_string(),
            },
            _ => ProviderError::other(500, format!("{}: {}", path.display(), e)),
        })
    }
}

#[async_trait]
impl ManifestProvider for FsManifestProvider {
    async fn fetch_manifest(&self, model: &str) -> Result<serde_json::Value, ProviderError> {
        let path = self.manifest_path(model);
        let text = Self::read(&path).await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::other(422, format!("{}: {}", path.display(), e)))
    }

    async fn fetch_pattern(&self, name: &str) -> Result<String, ProviderError> {
        let file = self
            .pattern_file
            .as_ref()
            .ok_or_else(|| ProviderError::not_found("no pattern file configured"))?;
        let path = self.root.join(file);
        let text = Self::read(&path).await?;
        let patterns: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| ProviderError::other(422, format!("{}: {}", path.display(), e)))?;
        patterns
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("no pattern named {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_path_follows_namespace() {
        let provider = FsManifestProvider::new("/manifests");
        assert_eq!(
            provider.manifest_path("Test\\Person\\Man"),
            PathBuf::from("/manifests/Test/Person/Man/manifest.json")
        );
    }

    #[tokio::test]
    async fn test_reads_manifest_and_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Test/Person")).unwrap();
        std::fs::write(
            dir.path().join("Test/Person/manifest.json"),
            r#"{"version": "3.0", "properties": []}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("patterns.json"), r#"{"email": "^.+@.+$"}"#).unwrap();

        let provider = FsManifestProvider::new(dir.path()).with_pattern_file("patterns.json");
        let manifest = provider.fetch_manifest("Test\\Person").await.unwrap();
        assert_eq!(manifest["version"], "3.0");
        assert_eq!(provider.fetch_pattern("email").await.unwrap(), "^.+@.+$");
        assert!(provider
            .fetch_manifest("Test\\Missing")
            .await
            .unwrap_err()
            .is_not_found());
    }
}

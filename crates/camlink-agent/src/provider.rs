use async_trait::async_trait;
use camlink_core::ConfigProvider;
use std::path::Path;

/// File-backed adapter options: a flat TOML table of key-value pairs,
/// re-read on every refresh so platform-pushed edits take effect without a
/// restart. A missing file means every option falls back to its default.
pub struct FileOptionsProvider {
    path: String,
}

impl FileOptionsProvider {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn load_table(&self) -> anyhow::Result<toml::Table> {
        if !Path::new(&self.path).exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content.parse::<toml::Table>()?)
    }
}

#[async_trait]
impl ConfigProvider for FileOptionsProvider {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let table = self.load_table()?;
        Ok(table.get(key).map(value_to_string))
    }
}

// Options are strings on the wire; bare TOML scalars are accepted too.
fn value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn provider_with(content: &str) -> (FileOptionsProvider, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let provider = FileOptionsProvider::new(file.path().to_str().unwrap());
        (provider, file)
    }

    #[tokio::test]
    async fn test_string_and_scalar_values() {
        let (provider, _file) = provider_with(
            r#"
device_host = "10.1.2.3"
device_port = 8080
pan_rate = 0.5
debug_mode = true
"#,
        );

        assert_eq!(
            provider.get("device_host").await.unwrap().as_deref(),
            Some("10.1.2.3")
        );
        assert_eq!(
            provider.get("device_port").await.unwrap().as_deref(),
            Some("8080")
        );
        assert_eq!(
            provider.get("pan_rate").await.unwrap().as_deref(),
            Some("0.5")
        );
        assert_eq!(
            provider.get("debug_mode").await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let (provider, _file) = provider_with(r#"device_host = "10.1.2.3""#);
        assert!(provider.get("zoom_rate").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let provider = FileOptionsProvider::new("/nonexistent/options.toml");
        assert!(provider.get("device_host").await.unwrap().is_none());
    }
}

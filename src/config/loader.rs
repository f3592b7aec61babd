use crate::api::DuplicatiClient;
use crate::config::schema::{MonitorConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::monitor::MonitorEngine;
use crate::output::{console::ConsoleOutput, json::JsonOutput, OutputHandler};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MonitorConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<MonitorConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path
                .parent()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    ))
                })?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited, true)?;
            Self::merge_configs(parent_config, config)
        } else {
            config
        };

        if !is_parent_load {
            final_config.validate().map_err(Error::Validation)?;
        }

        Ok(final_config)
    }

    fn load_file(path: &Path) -> Result<MonitorConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config: MonitorConfig = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some("yaml") | Some("yml") => {
                let config: MonitorConfig = serde_yaml::from_str(&content)?;
                Ok(config)
            }
            Some("toml") => {
                let config: MonitorConfig = toml::from_str(&content)?;
                Ok(config)
            }
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn merge_configs(mut parent: MonitorConfig, child: MonitorConfig) -> MonitorConfig {
        if !child.base_url.is_empty() {
            parent.base_url = child.base_url;
        }
        if !child.backup_id.is_empty() {
            parent.backup_id = child.backup_id;
        }
        if !child.verify_ssl {
            parent.verify_ssl = child.verify_ssl;
        }
        if child.poll_interval_secs != 300 {
            parent.poll_interval_secs = child.poll_interval_secs;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        parent.extends = None;
        parent
    }

    pub fn create_client(config: &MonitorConfig) -> Result<Arc<DuplicatiClient>> {
        Ok(Arc::new(DuplicatiClient::new(
            &config.base_url,
            config.verify_ssl,
        )?))
    }

    pub fn create_engine(
        config: &MonitorConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<MonitorEngine> {
        let handler: Box<dyn OutputHandler> = if let Some(out_config) = &config.output {
            match out_config {
                OutputConfig::Console => Box::new(ConsoleOutput::new(multi)),
                OutputConfig::Json { path } => Box::new(JsonOutput::new(PathBuf::from(path))?),
            }
        } else {
            Box::new(ConsoleOutput::new(multi))
        };

        Ok(MonitorEngine::new(
            Self::create_client(config)?,
            config.backup_id.clone(),
            Duration::from_secs(config.poll_interval_secs),
            handler,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "monitor.toml",
            "base_url = \"http://127.0.0.1:8200\"\nbackup_id = \"1\"\n",
        );
        let config = ConfigLoader::load(path).unwrap();
        assert_eq!(config.backup_id, "1");
        assert!(config.verify_ssl);
        assert_eq!(config.poll_interval_secs, 300);
        assert!(config.output.is_none());
    }

    #[test]
    fn loads_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = write_file(
            dir.path(),
            "monitor.json",
            r#"{"base_url": "http://localhost:8200", "backup_id": "2", "poll_interval_secs": 60}"#,
        );
        let config = ConfigLoader::load(json).unwrap();
        assert_eq!(config.poll_interval_secs, 60);

        let yaml = write_file(
            dir.path(),
            "monitor.yaml",
            "base_url: http://localhost:8200\nbackup_id: '3'\nverify_ssl: false\n",
        );
        let config = ConfigLoader::load(yaml).unwrap();
        assert_eq!(config.backup_id, "3");
        assert!(!config.verify_ssl);
    }

    #[test]
    fn child_config_inherits_from_parent() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "base.toml",
            "base_url = \"http://127.0.0.1:8200\"\nbackup_id = \"1\"\npoll_interval_secs = 120\n",
        );
        let child = write_file(
            dir.path(),
            "site.toml",
            "extends = \"base.toml\"\nbackup_id = \"7\"\n",
        );
        let config = ConfigLoader::load(child).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8200");
        assert_eq!(config.backup_id, "7");
        assert_eq!(config.poll_interval_secs, 120);
        assert!(config.extends.is_none());
    }

    #[test]
    fn circular_inheritance_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.toml", "extends = \"b.toml\"\n");
        let a = dir.path().join("a.toml");
        write_file(dir.path(), "b.toml", "extends = \"a.toml\"\n");
        let err = ConfigLoader::load(a).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_config_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bad.toml",
            "base_url = \"not a url\"\nbackup_id = \"1\"\n",
        );
        assert!(matches!(
            ConfigLoader::load(path),
            Err(Error::Validation(_))
        ));
    }
}

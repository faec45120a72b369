use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use psp_connectors::connectors::dummypay;

const FIXTURE_COUNT: usize = 40;

/// One connector the workbench builds and installs at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInstance {
    pub name: String,
    pub provider: String,
    /// Passed verbatim to the connector's install.
    pub config: serde_json::Value,
    /// Overrides the provider's default page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Base URL handed to `create_webhooks`; the task is skipped without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchConfig {
    pub connectors: Vec<ConnectorInstance>,
}

pub fn config_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("psp-workbench");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn log_path() -> PathBuf {
    config_dir().join("workbench.log")
}

pub fn load_config() -> Option<WorkbenchConfig> {
    load_from(&config_path())
}

pub fn save_config(config: &WorkbenchConfig) -> Result<()> {
    save_to(&config_path(), config)
}

fn load_from(path: &Path) -> Option<WorkbenchConfig> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

fn save_to(path: &Path, config: &WorkbenchConfig) -> Result<()> {
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// First-run config: a single dummypay connector over freshly seeded fixtures.
pub async fn seed_default(base: &Path) -> Result<WorkbenchConfig> {
    let directory = base.join("dummypay");
    let mut rng = StdRng::from_entropy();
    dummypay::fixtures::seed(&directory, FIXTURE_COUNT, &mut rng)
        .await
        .context("seeding dummypay fixtures")?;

    Ok(WorkbenchConfig {
        connectors: vec![ConnectorInstance {
            name: "local".to_string(),
            provider: dummypay::PROVIDER.to_string(),
            config: serde_json::json!({ "directory": directory.to_string_lossy() }),
            page_size: None,
            webhook_base_url: None,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(load_from(&path).is_none());

        let config = WorkbenchConfig {
            connectors: vec![ConnectorInstance {
                name: "sandbox".into(),
                provider: "modulr".into(),
                config: serde_json::json!({"apiKey": "k"}),
                page_size: Some(20),
                webhook_base_url: None,
            }],
        };
        save_to(&path, &config).unwrap();
        assert_eq!(load_from(&path), Some(config));
    }

    #[test]
    fn test_page_size_is_optional() {
        let config: WorkbenchConfig = serde_json::from_str(
            r#"{"connectors":[{"name":"a","provider":"wise","config":{}}]}"#,
        )
        .unwrap();
        assert_eq!(config.connectors[0].page_size, None);
    }

    #[tokio::test]
    async fn test_seed_default_writes_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let config = seed_default(dir.path()).await.unwrap();
        assert_eq!(config.connectors[0].provider, "dummypay");
        assert!(dir.path().join("dummypay").is_dir());
    }
}

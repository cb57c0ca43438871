use std::collections::HashMap;
use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;

use super::{Project, ProjectType, project_name};

/// Foundry configuration parsed from foundry.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoundryConfig {
    #[serde(default)]
    pub profile: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    pub out: Option<String>,
    pub deployments: Option<String>,
}

impl FoundryConfig {
    pub fn default_profile(&self) -> Option<&ProfileConfig> {
        self.profile.get("default")
    }

    pub fn out_dir(&self) -> &str {
        self.default_profile()
            .and_then(|p| p.out.as_deref())
            .unwrap_or("out")
    }

    pub fn deployments_dir(&self) -> &str {
        self.default_profile()
            .and_then(|p| p.deployments.as_deref())
            .unwrap_or("deployments")
    }
}

/// Load a Foundry project from the given path
pub fn load_project(path: &Path) -> Result<Project> {
    let config_path = path.join("foundry.toml");

    if !config_path.exists() {
        return Err(eyre!("foundry.toml not found at {:?}", path));
    }

    let config_content = fs::read_to_string(&config_path)
        .wrap_err_with(|| format!("Failed to read {:?}", config_path))?;

    let config: FoundryConfig =
        toml::from_str(&config_content).wrap_err("Failed to parse foundry.toml")?;

    Ok(Project {
        project_type: ProjectType::Foundry,
        root: path.to_path_buf(),
        name: project_name(path),
        out_dir: path.join(config.out_dir()),
        deployments_dir: path.join(config.deployments_dir()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_foundry_toml() {
        let content = r#"
[profile.default]
src = "src"
out = "build"
"#;
        let config: FoundryConfig = toml::from_str(content).unwrap();
        assert_eq!(config.out_dir(), "build");
        assert_eq!(config.deployments_dir(), "deployments");
    }

    #[test]
    fn test_custom_deployments_dir() {
        let content = r#"
[profile.default]
src = "contracts"
deployments = "broadcast/deployments"
"#;
        let config: FoundryConfig = toml::from_str(content).unwrap();
        assert_eq!(config.out_dir(), "out");
        assert_eq!(config.deployments_dir(), "broadcast/deployments");
    }

    #[test]
    fn test_defaults_without_profile() {
        let config: FoundryConfig = toml::from_str("").unwrap();
        assert_eq!(config.out_dir(), "out");
    }
}

mod detector;
mod foundry;
mod hardhat;

pub use detector::detect;

use std::path::{Path, PathBuf};

use eyre::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    Foundry,
    Hardhat,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Foundry => write!(f, "Foundry"),
            ProjectType::Hardhat => write!(f, "Hardhat"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub project_type: ProjectType,
    pub root: PathBuf,
    pub name: String,
    /// Compiled artifacts (`artifacts/` or `out/`)
    pub out_dir: PathBuf,
    /// Deployment records, one subdirectory per network
    pub deployments_dir: PathBuf,
}

impl Project {
    pub fn new_foundry(path: &Path) -> Result<Self> {
        foundry::load_project(path)
    }

    pub fn new_hardhat(path: &Path) -> Result<Self> {
        hardhat::load_project(path)
    }
}

fn project_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

use std::path::Path;

use eyre::{Result, eyre};

use super::{Project, ProjectType, project_name};

/// Load a Hardhat project from the given path
pub fn load_project(path: &Path) -> Result<Project> {
    let config_js = path.join("hardhat.config.js");
    let config_ts = path.join("hardhat.config.ts");

    if !config_js.exists() && !config_ts.exists() {
        return Err(eyre!(
            "hardhat.config.js or hardhat.config.ts not found at {:?}",
            path
        ));
    }

    // Hardhat uses conventional directories
    Ok(Project {
        project_type: ProjectType::Hardhat,
        root: path.to_path_buf(),
        name: project_name(path),
        out_dir: path.join("artifacts"),
        deployments_dir: path.join("deployments"),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_hardhat_project_layout() {
        let dir = std::env::temp_dir().join(format!("nftops-hardhat-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("hardhat.config.js"), "module.exports = {}").unwrap();

        let project = load_project(&dir).unwrap();
        assert_eq!(project.project_type, ProjectType::Hardhat);
        assert_eq!(project.out_dir, dir.join("artifacts"));
        assert_eq!(project.deployments_dir, dir.join("deployments"));

        fs::remove_dir_all(dir).unwrap();
    }
}

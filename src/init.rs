use std::path::Path;

use anyhow::{Context, Result};
use cairn::config::{CONFIG_FILE, CairnConfig};
use cairn_store::FsRepo;

/// Create `.cairn/` under `root` and write the default configuration.
pub fn run(root: &Path, branch: Option<&str>) -> Result<()> {
    let mut config = CairnConfig::default();
    if let Some(branch) = branch {
        branch.clone_into(&mut config.repo.default_branch);
    }

    let text = config.to_toml()?;
    let repo = FsRepo::init(root, &config.repo.default_branch)
        .with_context(|| format!("Failed to initialize repository in {}", root.display()))?;
    let config_path = repo.control_dir().join(CONFIG_FILE);
    std::fs::write(&config_path, text)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!(
        "Initialized empty cairn repository in {}",
        repo.control_dir().display()
    );
    Ok(())
}

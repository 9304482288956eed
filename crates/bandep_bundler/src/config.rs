use anyhow::{Result, anyhow};
use clap::Parser;
use log::{debug, info};
use std::{env, path::PathBuf};

/// CLI configuration for a banned-dependency check.
#[derive(Debug, Clone, Parser)]
#[command(name = "bandep")]
#[command(about = "Fail JavaScript/TypeScript builds that import banned dependencies")]
pub struct Config {
    /// Root directory of the project (defaults to the git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Path to the ban list (defaults to <root>/bandep.json)
    #[arg(long)]
    pub ban_list: Option<PathBuf>,

    /// Entry points to bundle from (default: source files under src/)
    #[arg(long = "entry")]
    pub entries: Vec<PathBuf>,

    /// Glob pattern to filter collected entry files
    #[arg(long)]
    pub entry_glob: Option<String>,
}

impl Config {
    /// Resolve the root directory and default the ban list path.
    pub fn initialize(&mut self) -> Result<()> {
        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            r.canonicalize().unwrap_or(r)
        } else {
            debug!("No root provided, searching for git root");
            find_git_root()?
        };
        info!("Using root directory: {}", root.display());

        if self.ban_list.is_none() {
            self.ban_list = Some(root.join("bandep.json"));
        }
        debug!("Using ban list: {:?}", self.ban_list);

        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    pub fn ban_list(&self) -> Result<&PathBuf> {
        self.ban_list
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }
}

fn find_git_root() -> Result<PathBuf> {
    debug!("Searching for git root");
    let mut current_dir = env::current_dir()?;

    loop {
        if current_dir.join(".git").exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }
        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                return Err(anyhow!("Could not find .git directory in any parent folder"));
            }
        }
    }
}

use crate::cli::Cli;
use anyhow::{Result, anyhow};
use std::path::PathBuf;
use std::sync::OnceLock;

static INSTANCE: OnceLock<VigilConfigs> = OnceLock::new();

#[derive(Debug)]
pub struct VigilConfigs {
    pub data_dir: PathBuf,
    pub assume_verified: bool,
}

impl VigilConfigs {
    pub fn init(cli: &Cli) -> Result<()> {
        let config = Self::from_cli(cli);

        INSTANCE
            .set(config)
            .map_err(|_| anyhow!("duplicate called"))?;

        Ok(())
    }

    pub fn instance() -> &'static Self {
        INSTANCE.get().expect("configs not initialized")
    }

    fn from_cli(cli: &Cli) -> Self {
        Self {
            data_dir: cli.data_dir.clone(),
            assume_verified: cli.assume_verified,
        }
    }
}

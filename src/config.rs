use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::blockchain::Target;
use crate::error::Result;
use crate::pow::{Cancellation, Deadline, Miner, NeverCancel, DEFAULT_PROGRESS_INTERVAL};
use crate::tx::{BLOCK_REWARD, DEFAULT_REWARD_ADDRESS};

pub const DEFAULT_CONFIG_FILE: &str = "miner.toml";
const ENV_PREFIX: &str = "MINER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory of pending transaction records.
    pub mempool_dir: PathBuf,
    /// Where the report is written.
    pub output_path: PathBuf,
    pub difficulty_target: Target,
    pub reward_address: String,
    pub reward: u64,
    /// Inclusive nonce bound; unbounded when unset.
    pub max_nonce: Option<u64>,
    /// Wall-clock limit on the nonce search; none when unset.
    pub timeout_secs: Option<u64>,
    pub progress_interval: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mempool_dir: PathBuf::from("mempool"),
            output_path: PathBuf::from("output.txt"),
            difficulty_target: Target::default(),
            reward_address: DEFAULT_REWARD_ADDRESS.to_string(),
            reward: BLOCK_REWARD,
            max_nonce: None,
            timeout_secs: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings. Later sources win: defaults, then the TOML file, then
    /// `MINER_*` environment variables. An explicit `path` must exist;
    /// without one, `miner.toml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };
        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn miner(&self) -> Miner {
        Miner {
            max_nonce: self.max_nonce.unwrap_or(u64::MAX),
            progress_interval: self.progress_interval,
        }
    }

    pub fn cancellation(&self) -> Box<dyn Cancellation> {
        match self.timeout_secs {
            Some(secs) => Box::new(Deadline::after(Duration::from_secs(secs))),
            None => Box::new(NeverCancel),
        }
    }
}

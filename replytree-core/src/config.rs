use std::env;
use std::path::PathBuf;

use dirs::{data_dir, home_dir};

use crate::error::{Result, ReplytreeError};

const STATE_DB_NAME: &str = "state.sqlite";
const EMOJI_MAP_NAME: &str = "emoji-map.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub state_root: PathBuf,
    pub checkpoint_db: PathBuf,
    pub emoji_map: PathBuf,
}

impl StatePaths {
    pub fn from_env_or_home() -> Result<Self> {
        // Precedence:
        // 1) REPLYTREE_HOME
        // 2) platform data dir / replytree
        // 3) ~/.local/share/replytree
        let state_root = match env::var_os("REPLYTREE_HOME").filter(|path| !path.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => data_dir()
                .or_else(|| home_dir().map(|home| home.join(".local/share")))
                .map(|path| path.join("replytree"))
                .ok_or(ReplytreeError::HomeDirectoryNotFound)?,
        };

        // Precedence:
        // 1) REPLYTREE_EMOJI_MAP
        // 2) <state_root>/emoji-map.json
        let emoji_map = env::var_os("REPLYTREE_EMOJI_MAP")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| state_root.join(EMOJI_MAP_NAME));

        Ok(Self::with_root(state_root, emoji_map))
    }

    pub fn with_root(state_root: PathBuf, emoji_map: PathBuf) -> Self {
        Self {
            checkpoint_db: state_root.join(STATE_DB_NAME),
            state_root,
            emoji_map,
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipientConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// The bulk-create YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkConfig {
    #[serde(default)]
    pub task_template: String,
    #[serde(default)]
    pub title_template: String,
    #[serde(default)]
    pub common_projects: Vec<String>,
    #[serde(default, rename = "commonCCUsers")]
    pub common_cc_users: Vec<String>,
    /// One task per entry, created in file order.
    #[serde(default)]
    pub emails: Vec<RecipientEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub owner: String,
    #[serde(default, rename = "ccUsers", alias = "ccusers")]
    pub cc_users: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    /// Free-form value handed to the templates untouched.
    #[serde(default, rename = "insertHere", alias = "inserthere")]
    pub insert_here: Option<serde_yaml::Value>,
}

pub fn parse_bulk_config(text: &str) -> Result<BulkConfig, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

pub fn load_bulk_config(path: &Path) -> Result<BulkConfig, RecipientConfigError> {
    let text = fs::read_to_string(path).map_err(|source| RecipientConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bulk_config(&text).map_err(|source| RecipientConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

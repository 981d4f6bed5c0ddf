use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{BlockinessError, Result};

#[derive(Deserialize)]
struct RawDatasetConfig {
    dataset_paths: Mapping,
}

/// Named score files, in the order the YAML lists them.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub dataset_paths: Vec<(String, PathBuf)>,
}

impl DatasetConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawDatasetConfig = serde_yaml::from_str(text)?;
        let mut dataset_paths = Vec::with_capacity(raw.dataset_paths.len());

        for (key, value) in raw.dataset_paths {
            let name = scalar_to_string(&key).ok_or_else(|| {
                BlockinessError::InvalidParameter(format!(
                    "dataset name must be a scalar, got {key:?}"
                ))
            })?;
            let path = match value {
                Value::String(s) => PathBuf::from(s),
                other => {
                    return Err(BlockinessError::InvalidParameter(format!(
                        "path of dataset {name} must be a string, got {other:?}"
                    )));
                }
            };
            dataset_paths.push((name, path));
        }

        Ok(Self { dataset_paths })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

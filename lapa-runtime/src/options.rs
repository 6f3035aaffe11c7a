// This file was originally taken from https://github.com/SnowflakePowered/librashader
// SnowflakePowered/librashader is licensed under MPL-2.0
// https://github.com/SnowflakePowered/librashader/blob/master/LICENSE.md

//! Scheduler options.

use serde::{Deserialize, Serialize};

pub fn default_max_texture_dimension() -> u32 {
    8192
}

pub fn default_history() -> bool {
    true
}

/// Options for pass scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    /// Whether or not to explicitly disable mipmap generation regardless of shader preset settings.
    #[serde(default = "bool::default", rename = "force-no-mipmaps")]
    pub force_no_mipmaps: bool,
    /// Largest width or height of an intermediate render target.
    #[serde(
        default = "default_max_texture_dimension",
        rename = "max-texture-dimension"
    )]
    pub max_texture_dimension: u32,
    /// Rotate the input history ring every frame.
    #[serde(default = "default_history")]
    pub history: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            force_no_mipmaps: false,
            max_texture_dimension: default_max_texture_dimension(),
            history: default_history(),
        }
    }
}

impl SchedulerOptions {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(
            SchedulerOptions::from_toml("").unwrap(),
            SchedulerOptions::default()
        );
    }

    #[test]
    fn test_options_from_toml() {
        let options = SchedulerOptions::from_toml(
            r#"
            force-no-mipmaps = true
            max-texture-dimension = 2048
            history = false
        "#,
        )
        .unwrap();

        assert!(options.force_no_mipmaps);
        assert_eq!(options.max_texture_dimension, 2048);
        assert!(!options.history);
    }
}

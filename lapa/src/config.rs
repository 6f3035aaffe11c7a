use serde::{Deserialize, Serialize};

/// Largest texture binding a pass may use, exclusive.
pub const MAX_SHADER_BINDINGS: u32 = 16;

pub fn default_parallel() -> bool {
    true
}

// Cross compilers can use degenerate stack sizes.
pub fn default_thread_stack_size() -> usize {
    10 * 1048576
}

pub fn default_max_bindings() -> u32 {
    MAX_SHADER_BINDINGS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Compile and reflect passes on a thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_thread_stack_size", rename = "thread-stack-size")]
    pub thread_stack_size: usize,
    #[serde(default = "default_max_bindings", rename = "max-bindings")]
    pub max_bindings: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            parallel: default_parallel(),
            thread_stack_size: default_thread_stack_size(),
            max_bindings: default_max_bindings(),
        }
    }
}

impl CompilerConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

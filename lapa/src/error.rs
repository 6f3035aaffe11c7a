//! Error taxonomy for preset compilation.
use crate::common::ShaderStage;
use crate::reflect::semantics::{TextureRef, UniformRole};
use std::path::PathBuf;
use thiserror::Error;

/// A required preset key is absent or malformed.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("preset is missing required key `{0}`")]
    MissingKey(String),
    #[error("preset key `shaders` has an invalid count `{0}`")]
    InvalidCount(String),
    #[error("parameter group `{0}` has no `{0}_group_desc`")]
    MissingGroupDescription(String),
}

/// A shader source file could not be loaded or carries a malformed directive.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SourceError {
    #[error("unable to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} does not start with a #version directive")]
    MissingVersion(PathBuf),
    #[error("#include without a quoted path in {path} at line {line}")]
    IncludeNotFound { path: PathBuf, line: usize },
    #[error("included file {0} could not be read")]
    IncludeFileNotFound(PathBuf),
    #[error("#pragma name declared more than once")]
    DuplicateNamePragma,
    #[error("#pragma format `{0}` is not a recognized format")]
    InvalidFormatPragma(String),
    #[error("#pragma format declared more than once")]
    DuplicateFormatPragma,
    #[error("#pragma parameter `{0}` redeclared with different values")]
    DuplicateParameterPragma(String),
    #[error("malformed #pragma parameter: {0}")]
    InvalidParameterPragma(String),
    #[error("#pragma stage `{0}` is neither vertex nor fragment")]
    InvalidStagePragma(String),
}

/// The per-pass annotations could not be merged into one graph.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GraphError {
    #[error("parameter `{0}` is declared with conflicting values")]
    ParameterConflict(String),
    #[error("expected {expected} pass annotations, got {actual}")]
    PassCountMismatch { expected: usize, actual: usize },
}

/// Kinds of shader resources that the pass model never allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisallowedResource {
    StorageBuffer,
    StorageImage,
    SubpassInput,
    AtomicCounter,
}

/// Which buffer a uniform member was packed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BufferKind {
    UniformBuffer,
    PushConstant,
}

/// Rejections raised while binding reflection data for one pass.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ReflectionError {
    #[error("{stage} stage declares a disallowed {kind:?} resource `{name}`")]
    DisallowedResource {
        stage: ShaderStage,
        kind: DisallowedResource,
        name: String,
    },
    #[error("vertex stage must declare exactly two inputs at locations 0 and 1")]
    InvalidVertexInputs,
    #[error("fragment stage must declare exactly one output at location 0")]
    InvalidFragmentOutputs,
    #[error("vertex stage samples texture `{0}`, textures are fragment-only")]
    VertexTexture(String),
    #[error("{stage} stage declares more than one {kind:?}")]
    DuplicateBuffer { stage: ShaderStage, kind: BufferKind },
    #[error("resource `{name}` uses descriptor set {set}, only set 0 is allowed")]
    InvalidDescriptorSet { name: String, set: u32 },
    #[error("uniform `{0}` does not name a known semantic or parameter")]
    UnknownUniform(String),
    #[error("uniform `{name}` has the wrong type for {role:?}")]
    MismatchedShape { name: String, role: UniformRole },
    #[error("uniform `{name}` is at offset {actual} in the {buffer:?}, but was already placed at {expected}")]
    MismatchedOffset {
        name: String,
        buffer: BufferKind,
        expected: usize,
        actual: usize,
    },
    #[error("`{name}` refers to pass {index}, which does not precede pass {pass}")]
    NonCausalReference {
        name: String,
        index: usize,
        pass: usize,
    },
    #[error("texture `{name}` binding {binding} exceeds the maximum of {max}")]
    BindingOutOfRange { name: String, binding: u32, max: u32 },
    #[error("texture `{name}` reuses binding {binding}")]
    DuplicateBinding { name: String, binding: u32 },
    #[error("texture `{0}` does not name a known texture semantic")]
    UnknownTexture(String),
    #[error("{reference:?} is out of range")]
    IndexOutOfRange { reference: TextureRef },
    #[error("pass {pass} is not part of a graph with {count} passes")]
    UnknownPass { pass: usize, count: usize },
}

/// Cumulative error type for compiling a preset.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompileError {
    #[error("preset configuration error")]
    Config(#[from] ConfigError),
    #[error("unable to read preset {path}")]
    PresetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader source error in pass {pass}")]
    Source {
        pass: usize,
        #[source]
        error: Box<SourceError>,
    },
    #[error("shader graph error")]
    Graph(#[from] GraphError),
    #[error("{stage} shader backend failed in pass {pass}")]
    Backend {
        pass: usize,
        stage: ShaderStage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("reflection error in pass {pass}")]
    Reflection {
        pass: usize,
        #[source]
        error: Box<ReflectionError>,
    },
    #[error("invalid compiled shader document")]
    Serialization(#[from] serde_json::Error),
}

impl CompileError {
    /// The pass a failure is attributed to, if any.
    pub fn pass(&self) -> Option<usize> {
        match self {
            CompileError::Source { pass, .. }
            | CompileError::Backend { pass, .. }
            | CompileError::Reflection { pass, .. } => Some(*pass),
            _ => None,
        }
    }
}

/// Result type for preset compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

//! Compiles multi-pass slang shader presets into a renderer-ready IR.
//!
//! A preset is scanned into a [`preset::PresetModel`], its pass sources are
//! expanded and annotated, merged into a [`graph::ShaderGraph`] and finally
//! every pass is bound against reflection data into a [`CompiledShader`].
//!
//! ```ignore
//! let compiler = PresetCompiler::new(FileLoader, glslang, spirv_cross);
//! let shader = compiler.compile_preset("crt/crt-royale.slangp")?;
//! std::fs::write("crt-royale.json", shader.to_json()?)?;
//! ```

pub mod common;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod ir;
pub mod loader;
pub mod preset;
pub mod reflect;
pub mod source;

pub use compiler::{BackendError, IrCompiler, IrReflector, PresetCompiler};
pub use config::CompilerConfig;
pub use error::{CompileError, Result};
pub use ir::CompiledShader;
pub use loader::{FileLoader, MemoryLoader, SourceLoader};

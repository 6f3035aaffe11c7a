//! Drives a preset from text to a [`CompiledShader`].
//!
//! Producing binary IR and reflecting it is delegated to an [`IrCompiler`]
//! and an [`IrReflector`]. Everything else happens here: the preset and its
//! sources are loaded through a [`SourceLoader`], merged into a
//! [`ShaderGraph`] and every pass is bound against it.

use crate::common::ShaderStage;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::graph::{assemble, GraphPass, ShaderGraph};
use crate::ir::{CompiledPass, CompiledShader};
use crate::loader::SourceLoader;
use crate::preset::PresetModel;
use crate::reflect::{aggregate, Binder, StageReflection};
use crate::source::{annotate, SourceAnnotation};
#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;
#[cfg(not(target_arch = "wasm32"))]
use rayon::ThreadPoolBuilder;
use std::path::Path;

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Compiles the text of one stage to binary IR.
pub trait IrCompiler: Sync {
    fn compile(&self, source: &str, stage: ShaderStage) -> std::result::Result<Vec<u32>, BackendError>;
}

/// Reflects binary IR and translates it to the renderer's shading language.
pub trait IrReflector: Sync {
    fn reflect(
        &self,
        ir: &[u32],
        stage: ShaderStage,
    ) -> std::result::Result<StageReflection, BackendError>;

    fn cross_compile(
        &self,
        ir: &[u32],
        stage: ShaderStage,
    ) -> std::result::Result<String, BackendError>;
}

pub struct PresetCompiler<L, C, R> {
    loader: L,
    compiler: C,
    reflector: R,
    config: CompilerConfig,
}

impl<L, C, R> PresetCompiler<L, C, R>
where
    L: SourceLoader,
    C: IrCompiler,
    R: IrReflector,
{
    pub fn new(loader: L, compiler: C, reflector: R) -> Self {
        Self::with_config(loader, compiler, reflector, CompilerConfig::default())
    }

    pub fn with_config(loader: L, compiler: C, reflector: R, config: CompilerConfig) -> Self {
        PresetCompiler {
            loader,
            compiler,
            reflector,
            config,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Load the preset at the given path and compile every pass of it.
    pub fn compile_preset(&self, path: impl AsRef<Path>) -> Result<CompiledShader> {
        let graph = self.load_graph(path)?;
        self.compile_graph(&graph)
    }

    /// Load the preset at the given path and merge its sources into a graph.
    ///
    /// Shader and lookup texture paths are resolved against the directory of
    /// the preset.
    pub fn load_graph(&self, path: impl AsRef<Path>) -> Result<ShaderGraph> {
        let path = path.as_ref();
        let text = self
            .loader
            .load(path)
            .map_err(|source| CompileError::PresetIo {
                path: path.to_path_buf(),
                source,
            })?;

        let mut model = PresetModel::parse(&text)?;
        if let Some(base) = path.parent() {
            for pass in &mut model.passes {
                pass.path = base.join(&pass.path);
            }
            for lut in &mut model.luts {
                lut.path = base.join(&lut.path);
            }
        }

        tracing::debug!(
            "loaded preset {} with {} passes and {} textures",
            path.display(),
            model.passes.len(),
            model.luts.len()
        );

        let annotations = self
            .for_each_pass(model.passes.len(), |index| {
                annotate(&model.passes[index].path, &self.loader).map_err(|error| {
                    CompileError::Source {
                        pass: index,
                        error: Box::new(error),
                    }
                })
            })
            .into_iter()
            .collect::<Result<Vec<SourceAnnotation>>>()?;

        Ok(assemble(model, annotations)?)
    }

    /// Compile, reflect and bind every pass of an assembled graph.
    pub fn compile_graph(&self, graph: &ShaderGraph) -> Result<CompiledShader> {
        let binder = Binder::new(graph, self.config.max_bindings);

        let mut passes = self
            .for_each_pass(graph.passes.len(), |index| {
                self.compile_pass(&binder, &graph.passes[index])
            })
            .into_iter()
            .collect::<Result<Vec<CompiledPass>>>()?;

        let history_count = aggregate(&mut passes);
        tracing::debug!(
            "compiled {} passes, history depth {history_count}",
            passes.len()
        );

        Ok(CompiledShader {
            passes,
            parameters: graph.parameters.clone(),
            parameter_groups: graph.groups.clone(),
            luts: graph.luts.clone(),
            history_count,
        })
    }

    fn compile_pass(&self, binder: &Binder<'_>, pass: &GraphPass) -> Result<CompiledPass> {
        let index = pass.index();
        let (vertex, vertex_source) = self.compile_stage(pass, ShaderStage::Vertex)?;
        let (fragment, fragment_source) = self.compile_stage(pass, ShaderStage::Fragment)?;

        let bindings = binder
            .bind(index, &vertex, &fragment)
            .map_err(|error| CompileError::Reflection {
                pass: index,
                error: Box::new(error),
            })?;

        Ok(CompiledPass {
            index,
            alias: pass.alias.clone(),
            vertex_source,
            fragment_source,
            scale: pass.preset.scale,
            format: pass.format,
            wrap_mode: pass.preset.wrap_mode,
            filter: pass.preset.filter,
            frame_count_mod: pass.preset.frame_count_mod,
            mipmap_input: pass.preset.mipmap_input,
            is_feedback: false,
            uniform_buffer: bindings.uniform_buffer,
            push_constant: bindings.push_constant,
            textures: bindings.textures,
            source_hash: pass.source.hash,
        })
    }

    fn compile_stage(
        &self,
        pass: &GraphPass,
        stage: ShaderStage,
    ) -> Result<(StageReflection, String)> {
        let backend = |source| CompileError::Backend {
            pass: pass.index(),
            stage,
            source,
        };

        let ir = self
            .compiler
            .compile(pass.source.stage(stage), stage)
            .map_err(backend)?;
        let reflection = self.reflector.reflect(&ir, stage).map_err(backend)?;
        let source = self.reflector.cross_compile(&ir, stage).map_err(backend)?;

        Ok((reflection, source))
    }

    /// Runs `job` for every pass index, in parallel when configured.
    ///
    /// Results are returned in pass order.
    fn for_each_pass<T, F>(&self, count: usize, job: F) -> Vec<Result<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync,
    {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if self.config.parallel && count > 1 {
                let run = || (0..count).into_par_iter().map(&job).collect::<Vec<_>>();
                return match ThreadPoolBuilder::new()
                    .stack_size(self.config.thread_stack_size)
                    .build()
                {
                    Ok(thread_pool) => thread_pool.install(run),
                    Err(error) => {
                        tracing::warn!("unable to build compile thread pool: {error}");
                        run()
                    }
                };
            }
        }

        (0..count).map(job).collect()
    }
}

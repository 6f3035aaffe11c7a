// This file was originally taken from https://github.com/SnowflakePowered/librashader
// The file has changed to plan frames for any renderer instead of recording wgpu commands
// SnowflakePowered/librashader is licensed under MPL-2.0
// https://github.com/SnowflakePowered/librashader/blob/master/LICENSE.md

use crate::framebuffer::{OwnedTarget, TargetFactory};
use crate::options::SchedulerOptions;
use crate::scaling::scale_pass;
use lapa::common::{PixelFormat, Size};
use lapa::ir::CompiledShader;
use lapa::reflect::{TextureRef, TextureSemantic};
use std::collections::VecDeque;

/// Where a pass renders to this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// The pass's own target, see [`PassScheduler::output`].
    Intermediate,
    /// The final output supplied by the renderer.
    Output,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    pub index: usize,
    pub size: Size<u32>,
    pub format: PixelFormat,
    /// The pass's `FrameCount` uniform.
    pub frame_count: u32,
    pub target: PassTarget,
    /// Whether mipmaps must be generated after rendering.
    pub mipmapped: bool,
}

/// What the renderer has to do for one frame, in pass order.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub frame_count: u64,
    /// Every history slot must be cleared before it is sampled.
    pub history_reset: bool,
    /// Some render target was (re)allocated.
    pub resized: bool,
    pub passes: Vec<PassPlan>,
}

/// Per-frame state of a compiled shader: render targets, feedback pairs,
/// the input history ring and frame counters.
pub struct PassScheduler<F: TargetFactory> {
    shader: CompiledShader,
    factory: F,
    options: SchedulerOptions,
    viewport: Size<u32>,
    source_size: Option<Size<u32>>,
    output_targets: Vec<Option<OwnedTarget<F::Texture>>>,
    feedback_targets: Vec<Option<OwnedTarget<F::Texture>>>,
    history_targets: VecDeque<OwnedTarget<F::Texture>>,
    frame_count: u64,
    dirty: bool,
    clear_history: bool,
}

impl<F: TargetFactory> PassScheduler<F> {
    pub fn new(
        shader: CompiledShader,
        factory: F,
        options: SchedulerOptions,
        viewport: Size<u32>,
    ) -> Self {
        PassScheduler {
            shader,
            factory,
            options,
            viewport,
            source_size: None,
            output_targets: Vec::new(),
            feedback_targets: Vec::new(),
            history_targets: VecDeque::new(),
            frame_count: 0,
            dirty: true,
            clear_history: false,
        }
    }

    pub fn shader(&self) -> &CompiledShader {
        &self.shader
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn viewport(&self) -> Size<u32> {
        self.viewport
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn resize(&mut self, viewport: Size<u32>) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.dirty = true;
        }
    }

    /// Replace the compiled shader, keeping the frame counter.
    pub fn reload(&mut self, shader: CompiledShader) {
        self.shader = shader;
        self.dirty = true;
    }

    /// Reset the input history on the next frame.
    pub fn clear_history(&mut self) {
        self.clear_history = true;
    }

    /// Advance to the next frame.
    ///
    /// Feedback pairs are swapped and the history rotated before any pass
    /// renders; targets are only reallocated when something changed. A failed
    /// frame leaves feedback pairs, history and counters as they were.
    pub fn begin_frame(
        &mut self,
        source_size: Size<u32>,
        output_format: PixelFormat,
    ) -> Result<FramePlan, F::Error> {
        let dirty = self.dirty || self.source_size != Some(source_size);

        self.swap_feedback();
        let passes = self.plan_passes(source_size, output_format);
        let staged = self
            .allocate(&passes, dirty)
            .and_then(|resized| {
                self.stage_history(source_size)
                    .map(|history| (resized, history))
            });
        let (resized, history) = match staged {
            Ok(staged) => staged,
            Err(err) => {
                self.swap_feedback();
                return Err(err);
            }
        };

        self.source_size = Some(source_size);
        self.dirty = false;
        let history_reset = self.apply_history(history);

        let frame_count = self.frame_count;
        self.frame_count = self.frame_count.wrapping_add(1);

        Ok(FramePlan {
            frame_count,
            history_reset,
            resized,
            passes,
        })
    }

    /// The intermediate target of a pass, `None` when it renders to the output.
    pub fn output(&self, pass: usize) -> Option<&OwnedTarget<F::Texture>> {
        self.output_targets.get(pass)?.as_ref()
    }

    /// Last frame's output of a feedback pass.
    pub fn feedback(&self, pass: usize) -> Option<&OwnedTarget<F::Texture>> {
        self.feedback_targets.get(pass)?.as_ref()
    }

    /// The input `frames` frames ago; `0` is the slot the current input is copied to.
    pub fn history(&self, frames: usize) -> Option<&OwnedTarget<F::Texture>> {
        self.history_targets.get(frames)
    }

    /// The scheduler owned texture a pass samples for `reference`.
    ///
    /// `Original`, lookup textures and the `Source` of the first pass belong
    /// to the renderer and resolve to `None`.
    pub fn input(&self, pass: usize, reference: TextureRef) -> Option<&OwnedTarget<F::Texture>> {
        match reference.semantic {
            TextureSemantic::Source => self.output(pass.checked_sub(1)?),
            TextureSemantic::PassOutput => self.output(reference.index),
            TextureSemantic::PassFeedback => self.feedback(reference.index),
            TextureSemantic::OriginalHistory => self.history(reference.index),
            TextureSemantic::Original | TextureSemantic::User => None,
        }
    }

    fn swap_feedback(&mut self) {
        for (pass, (output, feedback)) in self
            .shader
            .passes
            .iter()
            .zip(self.output_targets.iter_mut().zip(self.feedback_targets.iter_mut()))
        {
            if pass.is_feedback {
                std::mem::swap(output, feedback);
            }
        }
    }

    /// Works out how the history ring changes this frame, allocating a fresh
    /// ring when the current one no longer fits.
    fn stage_history(
        &mut self,
        source_size: Size<u32>,
    ) -> Result<HistoryUpdate<F::Texture>, F::Error> {
        let slots = if self.options.history && self.shader.history_count > 0 {
            self.shader.history_count + 1
        } else {
            0
        };
        if slots == 0 {
            return Ok(HistoryUpdate::Disabled);
        }

        let stale = self.history_targets.len() != slots
            || self
                .history_targets
                .front()
                .is_none_or(|slot| slot.size != source_size);

        if stale {
            tracing::debug!("reinitializing {slots} history slots at {source_size:?}");
            let mut ring = VecDeque::with_capacity(slots);
            for _ in 0..slots {
                ring.push_back(OwnedTarget::new(
                    &mut self.factory,
                    source_size,
                    PixelFormat::NATIVE,
                    false,
                )?);
            }
            return Ok(HistoryUpdate::Reinitialize(ring));
        }

        if self.clear_history {
            Ok(HistoryUpdate::Clear)
        } else {
            Ok(HistoryUpdate::Rotate)
        }
    }

    /// Returns whether every slot must be cleared before sampling.
    fn apply_history(&mut self, update: HistoryUpdate<F::Texture>) -> bool {
        self.clear_history = false;
        match update {
            HistoryUpdate::Disabled => {
                self.history_targets.clear();
                false
            }
            HistoryUpdate::Reinitialize(ring) => {
                self.history_targets = ring;
                true
            }
            HistoryUpdate::Clear => true,
            HistoryUpdate::Rotate => {
                if let Some(oldest) = self.history_targets.pop_back() {
                    self.history_targets.push_front(oldest);
                }
                false
            }
        }
    }

    fn plan_passes(&self, source_size: Size<u32>, output_format: PixelFormat) -> Vec<PassPlan> {
        let passes = &self.shader.passes;
        let mut source = source_size;

        passes
            .iter()
            .enumerate()
            .map(|(index, pass)| {
                let last = index + 1 == passes.len();
                let size = scale_pass(
                    &pass.scale,
                    source,
                    self.viewport,
                    last,
                    self.options.max_texture_dimension,
                );
                source = size;

                let direct = last
                    && !pass.scale.is_scaled()
                    && !pass.is_feedback
                    && pass.format == output_format
                    && size == self.viewport;
                let mipmapped = !self.options.force_no_mipmaps
                    && passes.get(index + 1).is_some_and(|next| next.mipmap_input);

                PassPlan {
                    index,
                    size,
                    format: pass.format,
                    frame_count: pass.frame_count(self.frame_count),
                    target: if direct {
                        PassTarget::Output
                    } else {
                        PassTarget::Intermediate
                    },
                    mipmapped,
                }
            })
            .collect()
    }

    fn allocate(&mut self, plans: &[PassPlan], dirty: bool) -> Result<bool, F::Error> {
        let count = self.shader.passes.len();
        self.output_targets.resize_with(count, || None);
        self.feedback_targets.resize_with(count, || None);

        let mut resized = false;
        for plan in plans {
            let index = plan.index;

            if plan.target == PassTarget::Intermediate {
                resized |= ensure_target(
                    &mut self.factory,
                    &mut self.output_targets[index],
                    plan,
                    dirty,
                )?;
            } else {
                self.output_targets[index] = None;
            }

            if self.shader.passes[index].is_feedback {
                resized |= ensure_target(
                    &mut self.factory,
                    &mut self.feedback_targets[index],
                    plan,
                    dirty,
                )?;
            } else {
                self.feedback_targets[index] = None;
            }
        }

        if resized {
            tracing::debug!("render targets resized for viewport {:?}", self.viewport);
        }
        Ok(resized)
    }
}

enum HistoryUpdate<T> {
    Disabled,
    Reinitialize(VecDeque<OwnedTarget<T>>),
    Clear,
    Rotate,
}

fn ensure_target<F: TargetFactory>(
    factory: &mut F,
    slot: &mut Option<OwnedTarget<F::Texture>>,
    plan: &PassPlan,
    dirty: bool,
) -> Result<bool, F::Error> {
    match slot {
        Some(target) if dirty => target.scale(factory, plan.size, plan.format, plan.mipmapped),
        Some(_) => Ok(false),
        None => {
            *slot = Some(OwnedTarget::new(factory, plan.size, plan.format, plan.mipmapped)?);
            Ok(true)
        }
    }
}

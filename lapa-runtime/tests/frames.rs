// Drives the scheduler the way a renderer would and checks what every pass
// ends up sampling.

use lapa::common::{FilterMode, PixelFormat, Size, WrapMode};
use lapa::error::BufferKind;
use lapa::ir::{BufferLayout, CompiledPass, CompiledShader};
use lapa::preset::{Scale2D, ScaleType};
use lapa::reflect::{TextureRef, TextureSemantic};
use lapa_runtime::{PassScheduler, PassTarget, SchedulerOptions, TargetFactory};
use pretty_assertions::assert_eq;
use std::convert::Infallible;

/// Textures are indices into `contents`, which records the frame last written.
#[derive(Default)]
struct Canvas {
    contents: Vec<Option<u64>>,
}

impl TargetFactory for Canvas {
    type Texture = usize;
    type Error = Infallible;

    fn create(
        &mut self,
        _size: Size<u32>,
        _format: PixelFormat,
        _mipmapped: bool,
    ) -> Result<usize, Infallible> {
        self.contents.push(None);
        Ok(self.contents.len() - 1)
    }
}

fn pass(index: usize) -> CompiledPass {
    CompiledPass {
        index,
        alias: String::new(),
        vertex_source: String::new(),
        fragment_source: String::new(),
        scale: Scale2D::default(),
        format: PixelFormat::NATIVE,
        wrap_mode: WrapMode::Border,
        filter: FilterMode::Linear,
        frame_count_mod: 0,
        mipmap_input: false,
        is_feedback: false,
        uniform_buffer: BufferLayout::new(BufferKind::UniformBuffer),
        push_constant: BufferLayout::new(BufferKind::PushConstant),
        textures: Vec::new(),
        source_hash: 0,
    }
}

fn chain() -> CompiledShader {
    let mut feedback = pass(0);
    feedback.is_feedback = true;
    feedback.scale = Scale2D {
        x: ScaleType::Source,
        y: ScaleType::Source,
        factor: Size::new(2.0, 2.0),
        absolute: Size::default(),
    };
    let mut counter = pass(1);
    counter.frame_count_mod = 2;

    CompiledShader {
        passes: vec![feedback, counter],
        parameters: Vec::new(),
        parameter_groups: Vec::new(),
        luts: Vec::new(),
        history_count: 1,
    }
}

/// Renders one frame: copies the input into history slot 0 and writes the
/// frame number into every intermediate target.
fn render(scheduler: &PassScheduler<Canvas>, canvas: &mut [Option<u64>], frame: u64) {
    if let Some(slot) = scheduler.history(0) {
        canvas[slot.texture] = Some(frame);
    }
    for index in 0..scheduler.shader().passes.len() {
        if let Some(target) = scheduler.output(index) {
            canvas[target.texture] = Some(frame);
        }
    }
}

#[test]
fn test_feedback_and_history_lag_one_frame() {
    let mut scheduler = PassScheduler::new(
        chain(),
        Canvas::default(),
        SchedulerOptions::default(),
        Size::new(1280, 720),
    );
    let mut canvas: Vec<Option<u64>> = Vec::new();

    for frame in 0..5u64 {
        let plan = scheduler
            .begin_frame(Size::new(256, 224), PixelFormat::NATIVE)
            .unwrap();
        canvas.resize(scheduler.factory().contents.len(), None);

        assert_eq!(plan.frame_count, frame);
        assert_eq!(plan.history_reset, frame == 0);
        assert_eq!(plan.passes[0].size, Size::new(512, 448));
        assert_eq!(plan.passes[0].target, PassTarget::Intermediate);
        assert_eq!(plan.passes[1].size, Size::new(1280, 720));
        assert_eq!(plan.passes[1].target, PassTarget::Output);
        assert_eq!(plan.passes[1].frame_count, (frame % 2) as u32);

        let previous = frame.checked_sub(1);
        let sampled = |semantic, index| {
            scheduler
                .input(1, TextureRef::new(semantic, index))
                .and_then(|target| canvas[target.texture])
        };
        assert_eq!(sampled(TextureSemantic::PassFeedback, 0), previous);
        assert_eq!(sampled(TextureSemantic::OriginalHistory, 1), previous);

        render(&scheduler, &mut canvas, frame);
        assert_eq!(sampled_after(&scheduler, &canvas), Some(frame));
    }

    // two feedback targets and two history slots, allocated once
    assert_eq!(scheduler.factory().contents.len(), 4);
}

fn sampled_after(scheduler: &PassScheduler<Canvas>, canvas: &[Option<u64>]) -> Option<u64> {
    scheduler
        .input(1, TextureRef::new(TextureSemantic::Source, 0))
        .and_then(|target| canvas[target.texture])
}

#[test]
fn test_resize_keeps_history_but_reallocates_targets() {
    let mut scheduler = PassScheduler::new(
        chain(),
        Canvas::default(),
        SchedulerOptions::default(),
        Size::new(1280, 720),
    );

    scheduler
        .begin_frame(Size::new(256, 224), PixelFormat::NATIVE)
        .unwrap();
    let allocated = scheduler.factory().contents.len();

    scheduler.resize(Size::new(640, 480));
    let plan = scheduler
        .begin_frame(Size::new(256, 224), PixelFormat::NATIVE)
        .unwrap();
    assert!(!plan.history_reset);
    assert!(!plan.resized);
    assert_eq!(plan.passes[1].size, Size::new(640, 480));
    assert_eq!(scheduler.factory().contents.len(), allocated);

    let plan = scheduler
        .begin_frame(Size::new(320, 240), PixelFormat::NATIVE)
        .unwrap();
    assert!(plan.history_reset);
    assert!(plan.resized);
    assert_eq!(plan.passes[0].size, Size::new(640, 480));
    assert_eq!(scheduler.factory().contents.len(), allocated + 4);
}

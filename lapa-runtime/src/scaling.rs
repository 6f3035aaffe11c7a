//! Render target sizing of a pass.

use lapa::common::Size;
use lapa::preset::{Scale2D, ScaleType};

/// Size of a pass's output for the given source and viewport.
///
/// `source` is the output size of the previous pass, or the input size for
/// the first pass. An axis that resolves to zero takes the viewport's extent.
/// Only scaled sizes are clamped to `max_dimension`.
pub fn scale_pass(
    scale: &Scale2D,
    source: Size<u32>,
    viewport: Size<u32>,
    last: bool,
    max_dimension: u32,
) -> Size<u32> {
    if !scale.is_scaled() {
        return if last { viewport } else { source };
    }

    let size = Size::new(
        scale_axis(
            scale.x,
            scale.factor.width,
            scale.absolute.width,
            source.width,
            viewport.width,
        ),
        scale_axis(
            scale.y,
            scale.factor.height,
            scale.absolute.height,
            source.height,
            viewport.height,
        ),
    );

    Size::new(
        size.width.min(max_dimension),
        size.height.min(max_dimension),
    )
}

fn scale_axis(
    scale_type: ScaleType,
    factor: f32,
    absolute: u32,
    source: u32,
    viewport: u32,
) -> u32 {
    let value = match scale_type {
        ScaleType::Source | ScaleType::Unset => (source as f32 * factor).round() as u32,
        ScaleType::Viewport => (viewport as f32 * factor).round() as u32,
        ScaleType::Absolute => absolute,
    };

    if value == 0 {
        viewport
    } else {
        value
    }
}

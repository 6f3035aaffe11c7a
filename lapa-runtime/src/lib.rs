//! Frame-by-frame scheduling of a [`lapa::CompiledShader`].
//!
//! The scheduler owns no GPU state of its own: render targets are created
//! through a [`TargetFactory`] and handed back to the renderer together with a
//! [`FramePlan`] describing the sizes, targets and frame counters of every
//! pass.

mod framebuffer;
mod options;
pub mod scaling;
mod scheduler;

pub use framebuffer::{OwnedTarget, TargetFactory};
pub use options::SchedulerOptions;
pub use scheduler::{FramePlan, PassPlan, PassScheduler, PassTarget};

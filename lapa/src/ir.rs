//! The compiled, renderer-facing form of a preset.
//!
//! A [`CompiledShader`] needs no further reflection queries: every uniform has
//! a byte offset and every sampled texture a binding slot. It serializes to a
//! stable JSON document.

use crate::common::{FilterMode, PixelFormat, WrapMode};
use crate::error::{BufferKind, CompileError};
use crate::graph::{Parameter, ParameterGroup};
use crate::preset::{Lut, Scale2D};
use crate::reflect::semantics::{TextureSemantic, UniformRole};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Stages that declare a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BindingStage: u8 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformSlot {
    pub role: UniformRole,
    pub offset: usize,
    pub size: usize,
    pub name: String,
}

/// Layout of one uniform buffer or push constant block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferLayout {
    pub kind: BufferKind,
    pub vertex_binding: Option<u32>,
    pub fragment_binding: Option<u32>,
    pub stages: BindingStage,
    /// Largest declared size of either stage, rounded up to 16 bytes.
    pub size: usize,
    pub slots: Vec<UniformSlot>,
}

impl BufferLayout {
    pub fn new(kind: BufferKind) -> Self {
        BufferLayout {
            kind,
            vertex_binding: None,
            fragment_binding: None,
            stages: BindingStage::empty(),
            size: 0,
            slots: Vec::new(),
        }
    }

    pub fn is_declared(&self) -> bool {
        !self.stages.is_empty()
    }

    pub fn offset(&self, role: UniformRole) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.role == role)
            .map(|slot| slot.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureSlot {
    pub semantic: TextureSemantic,
    pub index: usize,
    pub binding: u32,
    pub wrap_mode: WrapMode,
    pub filter: FilterMode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPass {
    pub index: usize,
    pub alias: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub scale: Scale2D,
    pub format: PixelFormat,
    pub wrap_mode: WrapMode,
    pub filter: FilterMode,
    pub frame_count_mod: u32,
    pub mipmap_input: bool,
    pub is_feedback: bool,
    pub uniform_buffer: BufferLayout,
    pub push_constant: BufferLayout,
    pub textures: Vec<TextureSlot>,
    /// Hash of the expanded pass source.
    pub source_hash: u64,
}

impl CompiledPass {
    /// `FrameCount` as seen by this pass.
    pub fn frame_count(&self, frame_count: u64) -> u32 {
        if self.frame_count_mod > 0 {
            (frame_count % u64::from(self.frame_count_mod)) as u32
        } else {
            frame_count as u32
        }
    }

    pub fn buffers(&self) -> [&BufferLayout; 2] {
        [&self.uniform_buffer, &self.push_constant]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledShader {
    pub passes: Vec<CompiledPass>,
    pub parameters: Vec<Parameter>,
    pub parameter_groups: Vec<ParameterGroup>,
    pub luts: Vec<Lut>,
    /// Highest `OriginalHistory` index any pass references.
    pub history_count: usize,
}

impl CompiledShader {
    pub fn to_json(&self) -> Result<String, CompileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(document: &str) -> Result<CompiledShader, CompileError> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn uses_feedback(&self) -> bool {
        self.passes.iter().any(|pass| pass.is_feedback)
    }
}

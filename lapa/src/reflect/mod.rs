//! Reflection data produced by the IR reflector and the binder that turns it
//! into buffer layouts and texture slots.

mod binder;
pub mod semantics;

pub use binder::{aggregate, Binder, PassBindings};
pub use semantics::{
    GlobalSemantic, SymbolTable, TextureRef, TextureSemantic, UniformRole,
};

use crate::error::DisallowedResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    Other,
}

/// Numeric shape of a buffer member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberType {
    pub scalar: ScalarKind,
    pub vec_size: u32,
    pub columns: u32,
}

impl MemberType {
    pub const FLOAT: MemberType = MemberType::new(ScalarKind::Float, 1, 1);
    pub const INT: MemberType = MemberType::new(ScalarKind::Int, 1, 1);
    pub const UINT: MemberType = MemberType::new(ScalarKind::Uint, 1, 1);
    pub const VEC4: MemberType = MemberType::new(ScalarKind::Float, 4, 1);
    pub const MAT4: MemberType = MemberType::new(ScalarKind::Float, 4, 4);

    pub const fn new(scalar: ScalarKind, vec_size: u32, columns: u32) -> Self {
        MemberType {
            scalar,
            vec_size,
            columns,
        }
    }

    /// Size in bytes of a member with 32-bit components.
    pub fn byte_size(&self) -> usize {
        4 * self.vec_size as usize * self.columns as usize
    }
}

/// An active member range of a buffer, as read by the compiled stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferMember {
    pub name: String,
    pub offset: usize,
    pub ty: MemberType,
}

impl BufferMember {
    pub fn new(name: impl Into<String>, offset: usize, ty: MemberType) -> Self {
        BufferMember {
            name: name.into(),
            offset,
            ty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    UniformBuffer,
    PushConstant,
    SampledImage,
    StorageBuffer,
    StorageImage,
    SubpassInput,
    AtomicCounter,
}

impl ResourceKind {
    pub fn disallowed(&self) -> Option<DisallowedResource> {
        match self {
            ResourceKind::StorageBuffer => Some(DisallowedResource::StorageBuffer),
            ResourceKind::StorageImage => Some(DisallowedResource::StorageImage),
            ResourceKind::SubpassInput => Some(DisallowedResource::SubpassInput),
            ResourceKind::AtomicCounter => Some(DisallowedResource::AtomicCounter),
            ResourceKind::UniformBuffer
            | ResourceKind::PushConstant
            | ResourceKind::SampledImage => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderResource {
    pub name: String,
    pub kind: ResourceKind,
    /// Descriptor set decoration.
    pub set: u32,
    /// `None` when the compiler optimized the binding out.
    pub binding: Option<u32>,
    /// Declared struct size of a buffer, zero for images.
    pub size: usize,
    pub members: Vec<BufferMember>,
}

impl ShaderResource {
    pub fn uniform_buffer(binding: u32, size: usize, members: Vec<BufferMember>) -> Self {
        ShaderResource {
            name: String::from("UBO"),
            kind: ResourceKind::UniformBuffer,
            set: 0,
            binding: Some(binding),
            size,
            members,
        }
    }

    pub fn push_constant(size: usize, members: Vec<BufferMember>) -> Self {
        ShaderResource {
            name: String::from("Push"),
            kind: ResourceKind::PushConstant,
            set: 0,
            binding: None,
            size,
            members,
        }
    }

    pub fn sampled_image(name: impl Into<String>, binding: u32) -> Self {
        ShaderResource {
            name: name.into(),
            kind: ResourceKind::SampledImage,
            set: 0,
            binding: Some(binding),
            size: 0,
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAttribute {
    pub name: String,
    pub location: u32,
}

impl StageAttribute {
    pub fn new(name: impl Into<String>, location: u32) -> Self {
        StageAttribute {
            name: name.into(),
            location,
        }
    }
}

/// Everything the binder needs to know about one compiled stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReflection {
    pub inputs: Vec<StageAttribute>,
    pub outputs: Vec<StageAttribute>,
    pub resources: Vec<ShaderResource>,
}

impl StageReflection {
    pub fn resources_of(
        &self,
        kind: ResourceKind,
    ) -> impl Iterator<Item = &ShaderResource> + '_ {
        self.resources
            .iter()
            .filter(move |resource| resource.kind == kind)
    }
}

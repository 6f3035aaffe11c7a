use super::semantics::{
    GlobalSemantic, SymbolTable, TextureRef, TextureSemantic, UniformRole,
};
use super::{BufferMember, MemberType, ResourceKind, ShaderResource, StageReflection};
use crate::common::ShaderStage;
use crate::error::{BufferKind, ReflectionError};
use crate::graph::ShaderGraph;
use crate::ir::{BindingStage, BufferLayout, CompiledPass, TextureSlot, UniformSlot};
use crate::preset::PresetPass;

const BUFFER_ALIGNMENT: usize = 16;

/// Buffer layouts and texture slots of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassBindings {
    pub uniform_buffer: BufferLayout,
    pub push_constant: BufferLayout,
    pub textures: Vec<TextureSlot>,
}

/// Validates the reflection of a pass and resolves it against the graph.
///
/// Binding one pass never mutates shared state, so passes may be bound
/// concurrently from one `Binder`.
pub struct Binder<'a> {
    graph: &'a ShaderGraph,
    symbols: SymbolTable,
    max_bindings: u32,
}

impl<'a> Binder<'a> {
    pub fn new(graph: &'a ShaderGraph, max_bindings: u32) -> Self {
        Binder {
            graph,
            symbols: SymbolTable::new(graph),
            max_bindings,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn bind(
        &self,
        pass: usize,
        vertex: &StageReflection,
        fragment: &StageReflection,
    ) -> Result<PassBindings, ReflectionError> {
        let settings = &self
            .graph
            .passes
            .get(pass)
            .ok_or(ReflectionError::UnknownPass {
                pass,
                count: self.graph.passes.len(),
            })?
            .preset;
        validate_shape(vertex, fragment)?;

        let uniform_buffer = self.merge_buffer(
            pass,
            BufferKind::UniformBuffer,
            single_buffer(ShaderStage::Vertex, vertex, BufferKind::UniformBuffer)?,
            single_buffer(ShaderStage::Fragment, fragment, BufferKind::UniformBuffer)?,
        )?;
        let push_constant = self.merge_buffer(
            pass,
            BufferKind::PushConstant,
            single_buffer(ShaderStage::Vertex, vertex, BufferKind::PushConstant)?,
            single_buffer(ShaderStage::Fragment, fragment, BufferKind::PushConstant)?,
        )?;
        let textures = self.bind_textures(pass, settings, fragment)?;

        tracing::debug!(
            "pass {pass}: ubo {} bytes, push constant {} bytes, {} textures",
            uniform_buffer.size,
            push_constant.size,
            textures.len()
        );

        Ok(PassBindings {
            uniform_buffer,
            push_constant,
            textures,
        })
    }

    fn merge_buffer(
        &self,
        pass: usize,
        kind: BufferKind,
        vertex: Option<&ShaderResource>,
        fragment: Option<&ShaderResource>,
    ) -> Result<BufferLayout, ReflectionError> {
        let mut layout = BufferLayout::new(kind);
        let mut size: usize = 0;

        if let Some(resource) = vertex {
            layout.vertex_binding = resource.binding;
            layout.stages |= BindingStage::VERTEX;
            size = size.max(resource.size);
        }
        if let Some(resource) = fragment {
            layout.fragment_binding = resource.binding;
            layout.stages |= BindingStage::FRAGMENT;
            size = size.max(resource.size);
        }
        layout.size = size.next_multiple_of(BUFFER_ALIGNMENT);

        layout.slots = vertex
            .into_iter()
            .chain(fragment)
            .flat_map(|resource| resource.members.iter())
            .try_fold(Vec::new(), |slots, member| {
                self.resolve_member(pass, kind, member, slots)
            })?;

        Ok(layout)
    }

    fn resolve_member(
        &self,
        pass: usize,
        buffer: BufferKind,
        member: &BufferMember,
        mut slots: Vec<UniformSlot>,
    ) -> Result<Vec<UniformSlot>, ReflectionError> {
        let role = self
            .symbols
            .uniform(&member.name)
            .ok_or_else(|| ReflectionError::UnknownUniform(member.name.clone()))?;

        if member.ty != expected_type(role) {
            return Err(ReflectionError::MismatchedShape {
                name: member.name.clone(),
                role,
            });
        }

        if let UniformRole::TextureSize(reference) = role {
            self.check_reference(pass, &member.name, reference)?;
        }

        match slots.iter().find(|slot| slot.role == role) {
            Some(slot) if slot.offset != member.offset => {
                Err(ReflectionError::MismatchedOffset {
                    name: member.name.clone(),
                    buffer,
                    expected: slot.offset,
                    actual: member.offset,
                })
            }
            Some(_) => Ok(slots),
            None => {
                slots.push(UniformSlot {
                    role,
                    offset: member.offset,
                    size: member.ty.byte_size(),
                    name: member.name.clone(),
                });
                Ok(slots)
            }
        }
    }

    fn bind_textures(
        &self,
        pass: usize,
        settings: &PresetPass,
        fragment: &StageReflection,
    ) -> Result<Vec<TextureSlot>, ReflectionError> {
        let mut textures: Vec<TextureSlot> = Vec::new();

        for resource in fragment.resources_of(ResourceKind::SampledImage) {
            let Some(binding) = resource.binding else {
                continue;
            };

            if resource.set != 0 {
                return Err(ReflectionError::InvalidDescriptorSet {
                    name: resource.name.clone(),
                    set: resource.set,
                });
            }
            if binding >= self.max_bindings {
                return Err(ReflectionError::BindingOutOfRange {
                    name: resource.name.clone(),
                    binding,
                    max: self.max_bindings,
                });
            }
            if textures.iter().any(|texture| texture.binding == binding) {
                return Err(ReflectionError::DuplicateBinding {
                    name: resource.name.clone(),
                    binding,
                });
            }

            let reference = self
                .symbols
                .texture(&resource.name)
                .ok_or_else(|| ReflectionError::UnknownTexture(resource.name.clone()))?;
            self.check_reference(pass, &resource.name, reference)?;

            let (wrap_mode, filter) = match reference.semantic {
                TextureSemantic::User => {
                    let lut = &self.graph.luts[reference.index];
                    (lut.wrap_mode, lut.filter)
                }
                _ => (settings.wrap_mode, settings.filter),
            };

            textures.push(TextureSlot {
                semantic: reference.semantic,
                index: reference.index,
                binding,
                wrap_mode,
                filter,
                name: resource.name.clone(),
            });
        }

        Ok(textures)
    }

    fn check_reference(
        &self,
        pass: usize,
        name: &str,
        reference: TextureRef,
    ) -> Result<(), ReflectionError> {
        match reference.semantic {
            TextureSemantic::PassOutput if reference.index >= pass => {
                Err(ReflectionError::NonCausalReference {
                    name: name.to_owned(),
                    index: reference.index,
                    pass,
                })
            }
            TextureSemantic::PassFeedback if reference.index >= self.graph.passes.len() => {
                Err(ReflectionError::IndexOutOfRange { reference })
            }
            TextureSemantic::User if reference.index >= self.graph.luts.len() => {
                Err(ReflectionError::IndexOutOfRange { reference })
            }
            _ => Ok(()),
        }
    }
}

fn validate_shape(
    vertex: &StageReflection,
    fragment: &StageReflection,
) -> Result<(), ReflectionError> {
    for (stage, reflection) in [
        (ShaderStage::Vertex, vertex),
        (ShaderStage::Fragment, fragment),
    ] {
        for resource in &reflection.resources {
            if let Some(kind) = resource.kind.disallowed() {
                return Err(ReflectionError::DisallowedResource {
                    stage,
                    kind,
                    name: resource.name.clone(),
                });
            }
        }
    }

    let mut locations: Vec<u32> = vertex.inputs.iter().map(|input| input.location).collect();
    locations.sort_unstable();
    if locations != [0, 1] {
        return Err(ReflectionError::InvalidVertexInputs);
    }

    if !matches!(fragment.outputs.as_slice(), [output] if output.location == 0) {
        return Err(ReflectionError::InvalidFragmentOutputs);
    }

    if let Some(texture) = vertex.resources_of(ResourceKind::SampledImage).next() {
        return Err(ReflectionError::VertexTexture(texture.name.clone()));
    }

    Ok(())
}

/// Returns the one buffer of `kind` a stage declares, checking its set.
fn single_buffer(
    stage: ShaderStage,
    reflection: &StageReflection,
    kind: BufferKind,
) -> Result<Option<&ShaderResource>, ReflectionError> {
    let resource_kind = match kind {
        BufferKind::UniformBuffer => ResourceKind::UniformBuffer,
        BufferKind::PushConstant => ResourceKind::PushConstant,
    };

    let mut buffers = reflection.resources_of(resource_kind);
    let Some(buffer) = buffers.next() else {
        return Ok(None);
    };
    if buffers.next().is_some() {
        return Err(ReflectionError::DuplicateBuffer { stage, kind });
    }
    if buffer.set != 0 {
        return Err(ReflectionError::InvalidDescriptorSet {
            name: buffer.name.clone(),
            set: buffer.set,
        });
    }

    Ok(Some(buffer))
}

fn expected_type(role: UniformRole) -> MemberType {
    match role {
        UniformRole::Global(GlobalSemantic::Mvp) => MemberType::MAT4,
        UniformRole::Global(GlobalSemantic::FrameCount) => MemberType::UINT,
        UniformRole::Global(GlobalSemantic::FrameDirection) => MemberType::INT,
        UniformRole::Global(
            GlobalSemantic::OutputSize | GlobalSemantic::FinalViewportSize,
        ) => MemberType::VEC4,
        UniformRole::Parameter(_) => MemberType::FLOAT,
        UniformRole::TextureSize(_) => MemberType::VEC4,
    }
}

/// Flags feedback passes and returns the history depth the chain needs.
pub fn aggregate(passes: &mut [CompiledPass]) -> usize {
    let mut history_count = 0;
    let mut feedback = vec![false; passes.len()];

    for pass in passes.iter() {
        let sizes = pass
            .buffers()
            .into_iter()
            .flat_map(|buffer| buffer.slots.iter())
            .filter_map(|slot| match slot.role {
                UniformRole::TextureSize(reference) => Some(reference),
                _ => None,
            });
        for reference in sizes {
            if reference.semantic == TextureSemantic::OriginalHistory {
                history_count = history_count.max(reference.index);
            }
        }

        for texture in &pass.textures {
            match texture.semantic {
                TextureSemantic::OriginalHistory => {
                    history_count = history_count.max(texture.index);
                }
                TextureSemantic::PassFeedback => {
                    if let Some(flag) = feedback.get_mut(texture.index) {
                        *flag = true;
                    }
                }
                _ => {}
            }
        }
    }

    for (pass, is_feedback) in passes.iter_mut().zip(feedback) {
        pass.is_feedback = is_feedback;
    }

    history_count
}

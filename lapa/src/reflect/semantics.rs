//! Names that reflection resolves uniforms and textures against.

use crate::graph::ShaderGraph;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Uniforms whose value the runtime supplies for every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalSemantic {
    Mvp,
    OutputSize,
    FinalViewportSize,
    FrameCount,
    FrameDirection,
}

/// Textures a pass may sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextureSemantic {
    /// The unprocessed input of the chain.
    Original,
    /// The output of the previous pass, or `Original` for the first pass.
    Source,
    /// Inputs of earlier frames; index 0 is the current frame.
    OriginalHistory,
    PassOutput,
    /// Last frame's output of a pass.
    PassFeedback,
    /// A lookup texture, by declaration order.
    User,
}

impl TextureSemantic {
    pub fn is_array(&self) -> bool {
        !matches!(self, TextureSemantic::Original | TextureSemantic::Source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureRef {
    pub semantic: TextureSemantic,
    pub index: usize,
}

impl TextureRef {
    pub const fn new(semantic: TextureSemantic, index: usize) -> Self {
        TextureRef { semantic, index }
    }
}

/// What a uniform buffer member stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UniformRole {
    Global(GlobalSemantic),
    /// Index into the global parameter list.
    Parameter(usize),
    /// The `vec4(width, height, 1/width, 1/height)` of a texture.
    TextureSize(TextureRef),
}

const GLOBAL_SEMANTICS: &[(&str, GlobalSemantic)] = &[
    ("MVP", GlobalSemantic::Mvp),
    ("OutputSize", GlobalSemantic::OutputSize),
    ("FinalViewportSize", GlobalSemantic::FinalViewportSize),
    ("FrameCount", GlobalSemantic::FrameCount),
    ("FrameDirection", GlobalSemantic::FrameDirection),
];

const TEXTURE_SEMANTICS: &[(&str, TextureSemantic)] = &[
    ("Original", TextureSemantic::Original),
    ("Source", TextureSemantic::Source),
    ("OriginalHistory", TextureSemantic::OriginalHistory),
    ("PassOutput", TextureSemantic::PassOutput),
    ("PassFeedback", TextureSemantic::PassFeedback),
    ("User", TextureSemantic::User),
];

const SIZE_SUFFIX: &str = "Size";

fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Maps uniform and texture names of a preset to their semantics.
///
/// Built once per graph: pass aliases, lookup texture names and parameter
/// names are the only preset-specific entries.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    parameters: FxHashMap<String, usize>,
    textures: FxHashMap<String, TextureRef>,
}

impl SymbolTable {
    pub fn new(graph: &ShaderGraph) -> Self {
        let mut table = SymbolTable::default();

        for parameter in &graph.parameters {
            table
                .parameters
                .insert(parameter.name.clone(), parameter.index);
        }

        for pass in &graph.passes {
            if pass.alias.is_empty() {
                continue;
            }
            table.insert_texture(
                pass.alias.clone(),
                TextureRef::new(TextureSemantic::PassOutput, pass.index()),
            );
            table.insert_texture(
                format!("{}Feedback", pass.alias),
                TextureRef::new(TextureSemantic::PassFeedback, pass.index()),
            );
        }

        for (index, lut) in graph.luts.iter().enumerate() {
            table.insert_texture(
                lut.name.clone(),
                TextureRef::new(TextureSemantic::User, index),
            );
        }

        table
    }

    fn insert_texture(&mut self, name: String, reference: TextureRef) {
        if let Some(previous) = self.textures.insert(name.clone(), reference) {
            tracing::warn!("texture name `{name}` now refers to {reference:?} instead of {previous:?}");
        }
    }

    /// Resolves a sampled texture name.
    pub fn texture(&self, name: &str) -> Option<TextureRef> {
        if let Some(reference) = self.textures.get(name) {
            return Some(*reference);
        }

        for (prefix, semantic) in TEXTURE_SEMANTICS {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            if !semantic.is_array() {
                if rest.is_empty() {
                    return Some(TextureRef::new(*semantic, 0));
                }
            } else if let Some(index) = parse_index(rest) {
                return Some(TextureRef::new(*semantic, index));
            }
        }

        None
    }

    /// Resolves the `*Size` uniform of a texture.
    fn texture_size(&self, name: &str) -> Option<TextureRef> {
        if let Some(base) = name.strip_suffix(SIZE_SUFFIX) {
            if let Some(reference) = self.textures.get(base) {
                return Some(*reference);
            }
        }

        for (prefix, semantic) in TEXTURE_SEMANTICS {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            let Some(rest) = rest.strip_prefix(SIZE_SUFFIX) else {
                continue;
            };
            if !semantic.is_array() {
                if rest.is_empty() {
                    return Some(TextureRef::new(*semantic, 0));
                }
            } else if let Some(index) = parse_index(rest) {
                return Some(TextureRef::new(*semantic, index));
            }
        }

        None
    }

    /// Resolves a buffer member name.
    pub fn uniform(&self, name: &str) -> Option<UniformRole> {
        if let Some((_, semantic)) = GLOBAL_SEMANTICS.iter().find(|(n, _)| *n == name) {
            return Some(UniformRole::Global(*semantic));
        }

        if let Some(index) = self.parameters.get(name) {
            return Some(UniformRole::Parameter(*index));
        }

        self.texture_size(name).map(UniformRole::TextureSize)
    }
}

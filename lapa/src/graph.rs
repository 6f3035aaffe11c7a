//! Merges a preset with its per-pass source annotations.

use crate::common::PixelFormat;
use crate::error::GraphError;
use crate::preset::{Lut, PresetModel, PresetPass};
use crate::source::{ShaderParameter, SourceAnnotation};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Key of the group collecting every parameter no explicit group claims.
pub const DEFAULT_GROUP: &str = "default";
const DEFAULT_GROUP_LABEL: &str = "Default";

/// A parameter with its global identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub initial: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub step: f32,
    pub group: String,
}

impl Parameter {
    fn declares(&self, declaration: &ShaderParameter) -> bool {
        self.name == declaration.name
            && self.description == declaration.description
            && self.initial == declaration.initial
            && self.minimum == declaration.minimum
            && self.maximum == declaration.maximum
            && self.step == declaration.step
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterGroup {
    pub key: String,
    pub label: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphPass {
    pub preset: PresetPass,
    pub source: SourceAnnotation,
    /// Preset alias, else `#pragma name`, else empty.
    pub alias: String,
    pub format: PixelFormat,
}

impl GraphPass {
    pub fn index(&self) -> usize {
        self.preset.index
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderGraph {
    pub passes: Vec<GraphPass>,
    pub luts: Vec<Lut>,
    pub parameters: Vec<Parameter>,
    pub groups: Vec<ParameterGroup>,
}

impl ShaderGraph {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}

/// Combine the preset with one annotation per pass, in pass order.
pub fn assemble(
    model: PresetModel,
    annotations: Vec<SourceAnnotation>,
) -> Result<ShaderGraph, GraphError> {
    if model.passes.len() != annotations.len() {
        return Err(GraphError::PassCountMismatch {
            expected: model.passes.len(),
            actual: annotations.len(),
        });
    }

    let mut parameters: Vec<Parameter> = Vec::new();
    for annotation in &annotations {
        for declaration in &annotation.parameters {
            match parameters.iter().find(|p| p.name == declaration.name) {
                Some(existing) if !existing.declares(declaration) => {
                    return Err(GraphError::ParameterConflict(declaration.name.clone()));
                }
                Some(_) => {}
                None => parameters.push(Parameter {
                    index: parameters.len(),
                    name: declaration.name.clone(),
                    description: declaration.description.clone(),
                    initial: declaration.initial,
                    minimum: declaration.minimum,
                    maximum: declaration.maximum,
                    step: declaration.step,
                    group: String::from(DEFAULT_GROUP),
                }),
            }
        }
    }

    for overridden in &model.overrides {
        match parameters.iter_mut().find(|p| p.name == overridden.name) {
            Some(parameter) => parameter.initial = overridden.value,
            None => tracing::warn!(
                "preset overrides unknown parameter `{}`",
                overridden.name
            ),
        }
    }

    let groups = partition(&model, &mut parameters);

    let passes = model
        .passes
        .into_iter()
        .zip(annotations)
        .map(|(preset, source)| {
            let alias = preset
                .alias
                .clone()
                .or_else(|| source.name.clone())
                .unwrap_or_default();
            let format = match source.format {
                Some(format) => format,
                None if preset.srgb_framebuffer => PixelFormat::NATIVE_SRGB,
                None if preset.float_framebuffer => PixelFormat::NATIVE_FLOAT,
                None => PixelFormat::NATIVE,
            };
            GraphPass {
                preset,
                source,
                alias,
                format,
            }
        })
        .collect();

    Ok(ShaderGraph {
        passes,
        luts: model.luts,
        parameters,
        groups,
    })
}

fn partition(model: &PresetModel, parameters: &mut [Parameter]) -> Vec<ParameterGroup> {
    let positions: FxHashMap<String, usize> = parameters
        .iter()
        .map(|parameter| (parameter.name.clone(), parameter.index))
        .collect();
    let mut claimed: Vec<Option<usize>> = vec![None; parameters.len()];
    let mut groups: Vec<ParameterGroup> = Vec::new();
    let mut default_group = None;

    for declaration in &model.groups {
        if groups.iter().any(|group| group.key == declaration.key) {
            tracing::warn!("parameter group `{}` declared twice", declaration.key);
            continue;
        }

        let slot = groups.len();
        if declaration.key == DEFAULT_GROUP {
            default_group = Some(slot);
        }

        let mut members = Vec::new();
        for name in &declaration.parameters {
            match positions.get(name) {
                Some(&index) if claimed[index].is_none() => {
                    claimed[index] = Some(slot);
                    members.push(name.clone());
                }
                Some(_) => tracing::warn!(
                    "parameter `{name}` already belongs to another group than `{}`",
                    declaration.key
                ),
                None => tracing::warn!(
                    "group `{}` lists unknown parameter `{name}`",
                    declaration.key
                ),
            }
        }

        groups.push(ParameterGroup {
            key: declaration.key.clone(),
            label: declaration.description.clone(),
            parameters: members,
        });
    }

    let default_slot = *default_group.get_or_insert_with(|| {
        groups.push(ParameterGroup {
            key: String::from(DEFAULT_GROUP),
            label: String::from(DEFAULT_GROUP_LABEL),
            parameters: Vec::new(),
        });
        groups.len() - 1
    });

    for (index, parameter) in parameters.iter().enumerate() {
        if claimed[index].is_none() {
            claimed[index] = Some(default_slot);
            groups[default_slot].parameters.push(parameter.name.clone());
        }
    }

    for (parameter, slot) in parameters.iter_mut().zip(&claimed) {
        if let Some(slot) = slot {
            parameter.group = groups[*slot].key.clone();
        }
    }

    groups.retain(|group| !group.parameters.is_empty());
    groups
}

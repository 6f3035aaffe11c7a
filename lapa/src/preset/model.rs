use crate::common::{FilterMode, Size, WrapMode};
use crate::error::ConfigError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// How one axis of a pass's render target is sized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaleType {
    #[default]
    Unset,
    Source,
    Viewport,
    Absolute,
}

impl ScaleType {
    fn from_preset(value: &str) -> Option<ScaleType> {
        match value {
            "source" => Some(ScaleType::Source),
            "viewport" => Some(ScaleType::Viewport),
            "absolute" => Some(ScaleType::Absolute),
            _ => None,
        }
    }
}

/// Per-axis scaling rules of a pass.
///
/// `factor` is meaningful for `source` and `viewport` axes, `absolute` for
/// `absolute` axes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale2D {
    pub x: ScaleType,
    pub y: ScaleType,
    pub factor: Size<f32>,
    pub absolute: Size<u32>,
}

impl Scale2D {
    /// Whether either axis carries an explicit rule.
    pub fn is_scaled(&self) -> bool {
        self.x != ScaleType::Unset || self.y != ScaleType::Unset
    }
}

/// One pass as declared by the preset.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetPass {
    pub index: usize,
    pub path: PathBuf,
    pub alias: Option<String>,
    pub scale: Scale2D,
    pub wrap_mode: WrapMode,
    pub filter: FilterMode,
    pub frame_count_mod: u32,
    pub srgb_framebuffer: bool,
    pub float_framebuffer: bool,
    pub mipmap_input: bool,
}

/// A lookup texture declared in `textures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lut {
    pub name: String,
    pub path: PathBuf,
    pub wrap_mode: WrapMode,
    pub filter: FilterMode,
    pub mipmap: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOverride {
    pub name: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDeclaration {
    pub key: String,
    pub description: String,
    pub parameters: Vec<String>,
}

/// The typed content of a preset, before any shader source is read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetModel {
    pub passes: Vec<PresetPass>,
    pub luts: Vec<Lut>,
    pub overrides: Vec<ParameterOverride>,
    pub groups: Vec<GroupDeclaration>,
}

impl PresetModel {
    /// Scan and build a preset in one step.
    pub fn parse(text: &str) -> Result<PresetModel, ConfigError> {
        let mut scanner = super::Scanner::new(text);
        let pairs: Vec<_> = scanner.by_ref().collect();
        if scanner.truncated() {
            tracing::warn!("preset scan ended early after {} keys", pairs.len());
        }
        build(pairs)
    }
}

struct Values<'a> {
    map: FxHashMap<&'a str, &'a str>,
}

impl<'a> Values<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).copied()
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!("ignoring unparseable value {value:?} for `{key}`");
                None
            }
        }
    }

    fn bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?;
        match value {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                tracing::warn!("ignoring unparseable boolean {value:?} for `{key}`");
                None
            }
        }
    }

    fn wrap_mode(&self, key: &str) -> WrapMode {
        match self.get(key) {
            None => WrapMode::default(),
            Some(value) => WrapMode::from_preset(value).unwrap_or_else(|| {
                tracing::warn!("ignoring unknown wrap mode {value:?} for `{key}`");
                WrapMode::default()
            }),
        }
    }

    fn scale_type(&self, key: &str) -> Option<ScaleType> {
        let value = self.get(key)?;
        let scale_type = ScaleType::from_preset(value);
        if scale_type.is_none() {
            tracing::warn!("ignoring unknown scale type {value:?} for `{key}`");
        }
        scale_type
    }

    fn list(&self, key: &str) -> Vec<&'a str> {
        self.get(key)
            .map(|value| {
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Turn scanned key/value pairs into a typed preset model.
///
/// Later assignments of a key replace earlier ones.
pub fn build<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<PresetModel, ConfigError> {
    let values = Values {
        map: pairs.into_iter().collect(),
    };

    let count = values
        .get("shaders")
        .ok_or_else(|| ConfigError::MissingKey(String::from("shaders")))?;
    let count: usize = match count.parse::<i64>() {
        Ok(count) if count >= 0 => count as usize,
        _ => return Err(ConfigError::InvalidCount(count.to_owned())),
    };

    let mut passes = Vec::new();
    for index in 0..count {
        passes.push(build_pass(&values, index)?);
    }

    let mut luts = Vec::new();
    for name in values.list("textures") {
        let Some(path) = values.get(name) else {
            tracing::warn!("dropping texture `{name}` without a path");
            continue;
        };
        luts.push(Lut {
            name: name.to_owned(),
            path: PathBuf::from(path),
            wrap_mode: values.wrap_mode(&format!("{name}_wrap_mode")),
            filter: FilterMode::from_linear(values.bool(&format!("{name}_linear"))),
            mipmap: values.bool(&format!("{name}_mipmap")).unwrap_or(false),
        });
    }

    let mut overrides = Vec::new();
    for name in values.list("parameters") {
        match values.parse::<f32>(name) {
            Some(value) => overrides.push(ParameterOverride {
                name: name.to_owned(),
                value,
            }),
            None => tracing::warn!("dropping override for `{name}` without a value"),
        }
    }

    let mut groups = Vec::new();
    for key in values.list("parameter_groups") {
        let description = values
            .get(&format!("{key}_group_desc"))
            .ok_or_else(|| ConfigError::MissingGroupDescription(key.to_owned()))?;
        groups.push(GroupDeclaration {
            key: key.to_owned(),
            description: description.to_owned(),
            parameters: values
                .list(&format!("{key}_group_parameters"))
                .into_iter()
                .map(str::to_owned)
                .collect(),
        });
    }

    Ok(PresetModel {
        passes,
        luts,
        overrides,
        groups,
    })
}

fn build_pass(values: &Values, index: usize) -> Result<PresetPass, ConfigError> {
    let shader_key = format!("shader{index}");
    let path = values
        .get(&shader_key)
        .ok_or(ConfigError::MissingKey(shader_key))?;

    Ok(PresetPass {
        index,
        path: PathBuf::from(path),
        alias: values
            .get(&format!("alias{index}"))
            .filter(|alias| !alias.is_empty())
            .map(str::to_owned),
        scale: build_scale(values, index),
        wrap_mode: values.wrap_mode(&format!("wrap_mode{index}")),
        filter: FilterMode::from_linear(values.bool(&format!("filter_linear{index}"))),
        frame_count_mod: values
            .parse(&format!("frame_count_mod{index}"))
            .unwrap_or(0),
        srgb_framebuffer: values
            .bool(&format!("srgb_framebuffer{index}"))
            .unwrap_or(false),
        float_framebuffer: values
            .bool(&format!("float_framebuffer{index}"))
            .unwrap_or(false),
        mipmap_input: values
            .bool(&format!("mipmap_input{index}"))
            .unwrap_or(false),
    })
}

fn build_scale(values: &Values, index: usize) -> Scale2D {
    let (x, y) = match values.scale_type(&format!("scale_type{index}")) {
        Some(shared) => (shared, shared),
        None => {
            let x = values.scale_type(&format!("scale_type_x{index}"));
            let y = values.scale_type(&format!("scale_type_y{index}"));
            match (x, y) {
                (None, None) => return Scale2D::default(),
                (x, y) => (
                    x.unwrap_or(ScaleType::Source),
                    y.unwrap_or(ScaleType::Source),
                ),
            }
        }
    };

    let shared = format!("scale{index}");
    let (factor_x, absolute_x) = axis_value(values, x, &format!("scale_x{index}"), &shared);
    let (factor_y, absolute_y) = axis_value(values, y, &format!("scale_y{index}"), &shared);

    Scale2D {
        x,
        y,
        factor: Size::new(factor_x, factor_y),
        absolute: Size::new(absolute_x, absolute_y),
    }
}

fn axis_value(values: &Values, axis: ScaleType, key: &str, shared: &str) -> (f32, u32) {
    match axis {
        ScaleType::Unset => (0.0, 0),
        ScaleType::Absolute => {
            let size = values
                .parse::<u32>(key)
                .or_else(|| values.parse::<u32>(shared))
                .unwrap_or(0);
            (1.0, size)
        }
        ScaleType::Source | ScaleType::Viewport => {
            let factor = values
                .parse::<f32>(key)
                .or_else(|| values.parse::<f32>(shared))
                .unwrap_or(1.0);
            (factor, 0)
        }
    }
}

// End to end compilation of in-memory presets.
//
// The IR here is the stage text itself and reflection reads the `layout`
// declarations back out of it, which is enough to drive the binder.

use lapa::common::{FilterMode, PixelFormat, ShaderStage, WrapMode};
use lapa::error::{CompileError, ReflectionError};
use lapa::ir::BindingStage;
use lapa::reflect::{
    BufferMember, GlobalSemantic, MemberType, ShaderResource,
    StageAttribute, StageReflection, TextureRef, TextureSemantic, UniformRole,
};
use lapa::{
    BackendError, CompiledShader, CompilerConfig, IrCompiler, IrReflector, MemoryLoader,
    PresetCompiler,
};
use pretty_assertions::assert_eq;

struct TextIr;

impl IrCompiler for TextIr {
    fn compile(&self, source: &str, _stage: ShaderStage) -> Result<Vec<u32>, BackendError> {
        Ok(source.chars().map(u32::from).collect())
    }
}

struct LayoutReflector;

fn text(ir: &[u32]) -> String {
    ir.iter().filter_map(|c| char::from_u32(*c)).collect()
}

fn member_type(name: &str) -> Option<MemberType> {
    match name {
        "mat4" => Some(MemberType::MAT4),
        "vec4" => Some(MemberType::VEC4),
        "float" => Some(MemberType::FLOAT),
        "uint" => Some(MemberType::UINT),
        "int" => Some(MemberType::INT),
        _ => None,
    }
}

/// Reads `layout(offset = N) uniform T name;`, `layout(push, offset = N) uniform T name;`
/// and `layout(binding = N) uniform sampler2D name;` lines.
fn resources(source: &str) -> Vec<ShaderResource> {
    let mut ubo = Vec::new();
    let mut push = Vec::new();
    let mut images = Vec::new();

    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix("layout(") else {
            continue;
        };
        let Some((layout, declaration)) = rest.split_once(')') else {
            continue;
        };
        let words: Vec<&str> = declaration
            .trim()
            .trim_end_matches(';')
            .split_whitespace()
            .collect();
        let [_, ty, name] = words.as_slice() else {
            continue;
        };
        let number = |key: &str| -> Option<usize> {
            layout
                .split(',')
                .filter_map(|part| part.trim().strip_prefix(key))
                .find_map(|value| value.trim().trim_start_matches('=').trim().parse().ok())
        };

        if *ty == "sampler2D" {
            if let Some(binding) = number("binding") {
                images.push(ShaderResource::sampled_image(*name, binding as u32));
            }
        } else if let (Some(offset), Some(ty)) = (number("offset"), member_type(ty)) {
            let member = BufferMember::new(*name, offset, ty);
            if layout.contains("push") {
                push.push(member);
            } else {
                ubo.push(member);
            }
        }
    }

    let size = |members: &[BufferMember]| {
        members
            .iter()
            .map(|member| member.offset + member.ty.byte_size())
            .max()
            .unwrap_or(0)
    };

    let mut resources = Vec::new();
    if !ubo.is_empty() {
        resources.push(ShaderResource::uniform_buffer(0, size(&ubo), ubo));
    }
    if !push.is_empty() {
        resources.push(ShaderResource::push_constant(size(&push), push));
    }
    resources.extend(images);
    resources
}

impl IrReflector for LayoutReflector {
    fn reflect(&self, ir: &[u32], stage: ShaderStage) -> Result<StageReflection, BackendError> {
        let source = text(ir);
        let (inputs, outputs) = match stage {
            ShaderStage::Vertex => (
                vec![StageAttribute::new("Position", 0), StageAttribute::new("TexCoord", 1)],
                vec![StageAttribute::new("vTexCoord", 0)],
            ),
            ShaderStage::Fragment => (
                vec![StageAttribute::new("vTexCoord", 0)],
                vec![StageAttribute::new("FragColor", 0)],
            ),
        };
        Ok(StageReflection {
            inputs,
            outputs,
            resources: resources(&source),
        })
    }

    fn cross_compile(&self, ir: &[u32], _stage: ShaderStage) -> Result<String, BackendError> {
        Ok(text(ir))
    }
}

const COMMON: &str = r#"#pragma parameter Strength "Effect Strength" 0.5 0.0 1.0 0.05
layout(offset = 0) uniform mat4 MVP;
"#;

const BLUR: &str = r#"#version 450
#pragma name Blur
#include "common.inc"
#pragma stage vertex
void main() {}
#pragma stage fragment
layout(offset = 64) uniform vec4 SourceSize;
layout(push, offset = 0) uniform float Strength;
layout(push, offset = 4) uniform uint FrameCount;
layout(binding = 1) uniform sampler2D Source;
layout(binding = 2) uniform sampler2D OriginalHistory2;
void main() {}
"#;

const GLOW: &str = r#"#version 450
#pragma format R16G16B16A16_SFLOAT
#pragma parameter Radius "Glow Radius" 2.0 1.0 8.0
#include "common.inc"
#pragma stage vertex
void main() {}
#pragma stage fragment
layout(offset = 64) uniform vec4 BlurSize;
layout(push, offset = 0) uniform float Radius;
layout(binding = 1) uniform sampler2D Blur;
layout(binding = 2) uniform sampler2D GlowFeedback;
void main() {}
"#;

const FINAL: &str = r#"#version 450
#include "common.inc"
#pragma stage vertex
void main() {}
#pragma stage fragment
layout(offset = 64) uniform vec4 FinalViewportSize;
layout(offset = 80) uniform vec4 PassOutputSize1;
layout(push, offset = 0) uniform int FrameDirection;
layout(binding = 0) uniform sampler2D Source;
layout(binding = 3) uniform sampler2D mask;
layout(binding = 4) uniform sampler2D PassOutput0;
void main() {}
"#;

const PRESET: &str = r#"
shaders = 3

shader0 = shaders/blur.slang
filter_linear0 = true
scale_type0 = source
scale0 = 2.0

shader1 = shaders/glow.slang
alias1 = Glow
wrap_mode1 = clamp_to_edge
frame_count_mod1 = 60
mipmap_input1 = true

shader2 = shaders/final.slang
srgb_framebuffer2 = true

textures = mask
mask = textures/mask.png
mask_linear = true
mask_wrap_mode = repeat

parameters = "Radius"
Radius = 4.0

parameter_groups = "look"
look_group_desc = "Look"
look_group_parameters = "Radius"
"#;

fn loader() -> MemoryLoader {
    MemoryLoader::new()
        .with("presets/glow.slangp", PRESET)
        .with("presets/shaders/common.inc", COMMON)
        .with("presets/shaders/blur.slang", BLUR)
        .with("presets/shaders/glow.slang", GLOW)
        .with("presets/shaders/final.slang", FINAL)
}

fn compile(loader: MemoryLoader, parallel: bool) -> Result<CompiledShader, CompileError> {
    let config = CompilerConfig {
        parallel,
        ..CompilerConfig::default()
    };
    PresetCompiler::with_config(loader, TextIr, LayoutReflector, config)
        .compile_preset("presets/glow.slangp")
}

#[test]
fn test_compiles_full_preset() {
    let shader = compile(loader(), true).unwrap();

    let indices: Vec<usize> = shader.passes.iter().map(|pass| pass.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    let aliases: Vec<&str> = shader.passes.iter().map(|pass| pass.alias.as_str()).collect();
    assert_eq!(aliases, vec!["Blur", "Glow", ""]);

    let formats: Vec<PixelFormat> = shader.passes.iter().map(|pass| pass.format).collect();
    assert_eq!(
        formats,
        vec![
            PixelFormat::NATIVE,
            PixelFormat::NATIVE_FLOAT,
            PixelFormat::NATIVE_SRGB
        ]
    );

    let feedback: Vec<bool> = shader.passes.iter().map(|pass| pass.is_feedback).collect();
    assert_eq!(feedback, vec![false, true, false]);
    assert_eq!(shader.history_count, 2);

    let blur = &shader.passes[0];
    assert_eq!(blur.filter, FilterMode::Linear);
    assert_eq!(blur.uniform_buffer.size, 80);
    assert_eq!(
        blur.uniform_buffer.stages,
        BindingStage::VERTEX | BindingStage::FRAGMENT
    );
    assert_eq!(
        blur.uniform_buffer.offset(UniformRole::Global(GlobalSemantic::Mvp)),
        Some(0)
    );
    assert_eq!(blur.push_constant.size, 16);
    assert_eq!(blur.push_constant.stages, BindingStage::FRAGMENT);
    assert_eq!(
        blur.push_constant
            .offset(UniformRole::Global(GlobalSemantic::FrameCount)),
        Some(4)
    );

    let glow = &shader.passes[1];
    assert_eq!(glow.frame_count_mod, 60);
    assert!(glow.mipmap_input);
    assert_eq!(glow.textures[0].semantic, TextureSemantic::PassOutput);
    assert_eq!(glow.textures[0].wrap_mode, WrapMode::Edge);
    assert_eq!(glow.textures[1].semantic, TextureSemantic::PassFeedback);
    assert_eq!(glow.textures[1].index, 1);

    let last = &shader.passes[2];
    assert_eq!(
        last.uniform_buffer.offset(UniformRole::TextureSize(TextureRef::new(
            TextureSemantic::PassOutput,
            1
        ))),
        Some(80)
    );
    let mask = last
        .textures
        .iter()
        .find(|texture| texture.semantic == TextureSemantic::User)
        .unwrap();
    assert_eq!((mask.binding, mask.wrap_mode, mask.filter), (3, WrapMode::Repeat, FilterMode::Linear));
    assert_eq!(shader.luts[0].path, std::path::Path::new("presets/textures/mask.png"));
}

#[test]
fn test_parameters_and_groups() {
    let shader = compile(loader(), false).unwrap();

    let names: Vec<&str> = shader
        .parameters
        .iter()
        .map(|parameter| parameter.name.as_str())
        .collect();
    assert_eq!(names, vec!["Strength", "Radius"]);

    let radius = &shader.parameters[1];
    assert_eq!(radius.initial, 4.0);
    assert_eq!((radius.minimum, radius.maximum), (1.0, 8.0));
    assert!((radius.step - 0.7).abs() < 1e-6);
    assert_eq!(radius.group, "look");

    let groups: Vec<(&str, &str, Vec<String>)> = shader
        .parameter_groups
        .iter()
        .map(|group| (group.key.as_str(), group.label.as_str(), group.parameters.clone()))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("look", "Look", vec![String::from("Radius")]),
            ("default", "Default", vec![String::from("Strength")]),
        ]
    );
}

#[test]
fn test_stage_sources_carry_line_markers() {
    let shader = compile(loader(), false).unwrap();
    let fragment = &shader.passes[0].fragment_source;

    assert!(fragment.starts_with(
        "#version 450\n#extension GL_GOOGLE_cpp_style_line_directive : require\n#line 2 \"presets/shaders/blur.slang\"\n"
    ));
    assert!(fragment.contains("#line 1 \"presets/shaders/common.inc\"\n"));
    assert!(fragment.contains("layout(binding = 1) uniform sampler2D Source;"));
    assert!(!fragment.contains("#pragma name"));
    assert!(!shader.passes[0].vertex_source.contains("sampler2D"));
}

#[test]
fn test_json_round_trip() {
    let shader = compile(loader(), true).unwrap();
    let document = shader.to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(value["historyCount"], 2);
    assert_eq!(value["passes"][1]["isFeedback"], true);
    assert_eq!(value["passes"][1]["format"], "R16G16B16A16_SFLOAT");
    assert_eq!(value["luts"][0]["wrapMode"], "repeat");

    assert_eq!(CompiledShader::from_json(&document).unwrap(), shader);
}

#[test]
fn test_rejects_malformed_document() {
    assert!(matches!(
        CompiledShader::from_json(r#"{"passes": []}"#),
        Err(CompileError::Serialization(_))
    ));
}

#[test]
fn test_pass_count_matches_preset() {
    for count in 1..=6 {
        let mut preset = format!("shaders = {count}\n");
        let mut loader = MemoryLoader::new();
        for index in 0..count {
            preset.push_str(&format!("shader{index} = pass{index}.slang\n"));
            let reads = if index == 0 {
                String::from("Source")
            } else {
                format!("PassOutput{}", index - 1)
            };
            loader.insert(
                format!("pass{index}.slang"),
                format!(
                    "#version 450\n#pragma stage vertex\nvoid main() {{}}\n#pragma stage fragment\nlayout(binding = 1) uniform sampler2D {reads};\nvoid main() {{}}\n"
                ),
            );
        }
        loader.insert("chain.slangp", preset);

        let sequential = PresetCompiler::with_config(
            loader.clone(),
            TextIr,
            LayoutReflector,
            CompilerConfig {
                parallel: false,
                ..CompilerConfig::default()
            },
        )
        .compile_preset("chain.slangp")
        .unwrap();
        let parallel = PresetCompiler::new(loader, TextIr, LayoutReflector)
            .compile_preset("chain.slangp")
            .unwrap();

        let indices: Vec<usize> = parallel.passes.iter().map(|pass| pass.index).collect();
        assert_eq!(indices, (0..count).collect::<Vec<_>>());
        assert_eq!(sequential, parallel);
    }
}

#[test]
fn test_forward_reference_names_pass() {
    let loader = loader().with(
        "presets/shaders/blur.slang",
        BLUR.replace("OriginalHistory2", "PassOutput2"),
    );

    match compile(loader, true) {
        Err(CompileError::Reflection { pass, error }) => {
            assert_eq!(pass, 0);
            assert_eq!(
                *error,
                ReflectionError::NonCausalReference {
                    name: String::from("PassOutput2"),
                    index: 2,
                    pass: 0,
                }
            );
        }
        other => panic!("expected a reflection error, got {other:?}"),
    }
}

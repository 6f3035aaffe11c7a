//! Preset (`.slangp`) parsing.
mod model;
mod scanner;

pub use model::{
    build, GroupDeclaration, Lut, ParameterOverride, PresetModel, PresetPass, Scale2D,
    ScaleType,
};
pub use scanner::Scanner;

//! Vocabulary types shared by the compiler and the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A two dimensional size, used for both pixel extents and scale factors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    #[inline]
    pub const fn new(width: T, height: T) -> Self {
        Size { width, height }
    }
}

/// Texture addressing outside of `[0, 1]`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapMode {
    #[default]
    Border,
    Edge,
    Repeat,
    MirroredRepeat,
}

impl WrapMode {
    /// Maps a preset `wrap_mode` value. Unknown values yield `None`.
    pub fn from_preset(value: &str) -> Option<WrapMode> {
        match value {
            "clamp_to_border" => Some(WrapMode::Border),
            "clamp_to_edge" => Some(WrapMode::Edge),
            "repeat" => Some(WrapMode::Repeat),
            "mirrored_repeat" => Some(WrapMode::MirroredRepeat),
            _ => None,
        }
    }
}

/// Texture filtering. `Unspecified` leaves the choice to the renderer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    #[default]
    Unspecified,
    Linear,
    Nearest,
}

impl FilterMode {
    pub fn from_linear(linear: Option<bool>) -> FilterMode {
        match linear {
            None => FilterMode::Unspecified,
            Some(true) => FilterMode::Linear,
            Some(false) => FilterMode::Nearest,
        }
    }
}

/// A programmable shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

macro_rules! pixel_formats {
    ($($variant:ident => $token:literal,)*) => {
        /// Render target pixel formats that a pass may request with `#pragma format`.
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "&'static str", try_from = "String")]
        pub enum PixelFormat {
            #[default]
            $($variant,)*
        }

        const PIXEL_FORMAT_TOKENS: &[(&str, PixelFormat)] = &[
            $(($token, PixelFormat::$variant),)*
        ];
    };
}

pixel_formats! {
    R8G8B8A8Unorm => "R8G8B8A8_UNORM",
    R8Unorm => "R8_UNORM",
    R8Uint => "R8_UINT",
    R8Sint => "R8_SINT",
    R8G8Unorm => "R8G8_UNORM",
    R8G8Uint => "R8G8_UINT",
    R8G8Sint => "R8G8_SINT",
    R8G8B8A8Uint => "R8G8B8A8_UINT",
    R8G8B8A8Sint => "R8G8B8A8_SINT",
    R8G8B8A8Srgb => "R8G8B8A8_SRGB",
    A2B10G10R10UnormPack32 => "A2B10G10R10_UNORM_PACK32",
    A2B10G10R10UintPack32 => "A2B10G10R10_UINT_PACK32",
    R16Uint => "R16_UINT",
    R16Sint => "R16_SINT",
    R16Sfloat => "R16_SFLOAT",
    R16G16Uint => "R16G16_UINT",
    R16G16Sint => "R16G16_SINT",
    R16G16Sfloat => "R16G16_SFLOAT",
    R16G16B16A16Uint => "R16G16B16A16_UINT",
    R16G16B16A16Sint => "R16G16B16A16_SINT",
    R16G16B16A16Sfloat => "R16G16B16A16_SFLOAT",
    R32Uint => "R32_UINT",
    R32Sint => "R32_SINT",
    R32Sfloat => "R32_SFLOAT",
    R32G32Uint => "R32G32_UINT",
    R32G32Sint => "R32G32_SINT",
    R32G32Sfloat => "R32G32_SFLOAT",
    R32G32B32A32Uint => "R32G32B32A32_UINT",
    R32G32B32A32Sint => "R32G32B32A32_SINT",
    R32G32B32A32Sfloat => "R32G32B32A32_SFLOAT",
}

impl PixelFormat {
    /// The unscaled 8-bit format every pass renders to unless told otherwise.
    pub const NATIVE: PixelFormat = PixelFormat::R8G8B8A8Unorm;
    pub const NATIVE_SRGB: PixelFormat = PixelFormat::R8G8B8A8Srgb;
    pub const NATIVE_FLOAT: PixelFormat = PixelFormat::R16G16B16A16Sfloat;

    pub fn as_str(&self) -> &'static str {
        PIXEL_FORMAT_TOKENS
            .iter()
            .find(|(_, format)| format == self)
            .map(|(token, _)| *token)
            .unwrap_or("R8G8B8A8_UNORM")
    }
}

impl FromStr for PixelFormat {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        PIXEL_FORMAT_TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, format)| *format)
            .ok_or(())
    }
}

impl From<PixelFormat> for &'static str {
    fn from(format: PixelFormat) -> Self {
        format.as_str()
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = String;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token
            .parse()
            .map_err(|_| format!("unknown pixel format {token}"))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_mode_mapping() {
        assert_eq!(WrapMode::from_preset("clamp_to_border"), Some(WrapMode::Border));
        assert_eq!(WrapMode::from_preset("clamp_to_edge"), Some(WrapMode::Edge));
        assert_eq!(
            WrapMode::from_preset("mirrored_repeat"),
            Some(WrapMode::MirroredRepeat)
        );
        assert_eq!(WrapMode::from_preset("repeat"), Some(WrapMode::Repeat));
        assert_eq!(WrapMode::from_preset("wrap"), None);
        assert_eq!(WrapMode::default(), WrapMode::Border);
    }

    #[test]
    fn test_pixel_format_tokens() {
        assert_eq!(PIXEL_FORMAT_TOKENS.len(), 30);
        for (token, format) in PIXEL_FORMAT_TOKENS {
            assert_eq!(token.parse::<PixelFormat>(), Ok(*format));
            assert_eq!(format.as_str(), *token);
        }
        assert!("r8g8b8a8_unorm".parse::<PixelFormat>().is_err());
        assert_eq!(PixelFormat::default(), PixelFormat::NATIVE);
    }
}

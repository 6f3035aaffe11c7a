// This file was originally taken from https://github.com/SnowflakePowered/librashader
// The file has changed to allocate through a renderer supplied factory instead of wgpu
// SnowflakePowered/librashader is licensed under MPL-2.0
// https://github.com/SnowflakePowered/librashader/blob/master/LICENSE.md

use lapa::common::{PixelFormat, Size};

/// Creates the renderer's textures on behalf of the scheduler.
pub trait TargetFactory {
    type Texture;
    type Error;

    fn create(
        &mut self,
        size: Size<u32>,
        format: PixelFormat,
        mipmapped: bool,
    ) -> Result<Self::Texture, Self::Error>;
}

/// A render target owned by the scheduler.
#[derive(Debug)]
pub struct OwnedTarget<T> {
    pub texture: T,
    pub size: Size<u32>,
    pub format: PixelFormat,
    pub mipmapped: bool,
}

impl<T> OwnedTarget<T> {
    pub fn new<F>(
        factory: &mut F,
        size: Size<u32>,
        format: PixelFormat,
        mipmapped: bool,
    ) -> Result<Self, F::Error>
    where
        F: TargetFactory<Texture = T>,
    {
        Ok(OwnedTarget {
            texture: factory.create(size, format, mipmapped)?,
            size,
            format,
            mipmapped,
        })
    }

    /// Reallocates the target when its size, format or mip chain differ.
    ///
    /// Returns whether a new texture was created.
    pub fn scale<F>(
        &mut self,
        factory: &mut F,
        size: Size<u32>,
        format: PixelFormat,
        mipmapped: bool,
    ) -> Result<bool, F::Error>
    where
        F: TargetFactory<Texture = T>,
    {
        if self.size == size && self.format == format && self.mipmapped == mipmapped {
            return Ok(false);
        }

        let mut new = OwnedTarget::new(factory, size, format, mipmapped)?;
        std::mem::swap(self, &mut new);
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Hands out sequential ids and remembers what it was asked for.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub created: Vec<(Size<u32>, PixelFormat, bool)>,
        /// Refuse the next request.
        pub fail_next: bool,
    }

    impl TargetFactory for Recorder {
        type Texture = usize;
        type Error = &'static str;

        fn create(
            &mut self,
            size: Size<u32>,
            format: PixelFormat,
            mipmapped: bool,
        ) -> Result<usize, Self::Error> {
            if std::mem::take(&mut self.fail_next) {
                return Err("out of memory");
            }
            self.created.push((size, format, mipmapped));
            Ok(self.created.len() - 1)
        }
    }

    #[test]
    fn test_scale_reuses_matching_target() {
        let mut factory = Recorder::default();
        let mut target =
            OwnedTarget::new(&mut factory, Size::new(4, 4), PixelFormat::NATIVE, false)
                .unwrap();

        assert!(!target
            .scale(&mut factory, Size::new(4, 4), PixelFormat::NATIVE, false)
            .unwrap());
        assert_eq!(target.texture, 0);

        assert!(target
            .scale(&mut factory, Size::new(4, 4), PixelFormat::NATIVE, true)
            .unwrap());
        assert_eq!(target.texture, 1);
        assert!(target.mipmapped);

        assert!(target
            .scale(&mut factory, Size::new(8, 4), PixelFormat::NATIVE_FLOAT, true)
            .unwrap());
        assert_eq!(target.size, Size::new(8, 4));
        assert_eq!(factory.created.len(), 3);

        factory.fail_next = true;
        assert_eq!(
            target.scale(&mut factory, Size::new(2, 2), PixelFormat::NATIVE, false),
            Err("out of memory")
        );
        assert_eq!(target.texture, 2);
        assert_eq!(target.size, Size::new(8, 4));
    }
}

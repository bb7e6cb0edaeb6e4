//! Texture loading and format selection
//!
//! Images are decoded with the `image` crate, optionally flipped and
//! downscaled, then uploaded with a storage format picked from the requested
//! compression and the extensions the device supports. Loaded 2D textures are
//! cached in [`Assets`] under the file stem.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::texture::{Filter, InternalFormat, PixelFormat, Texture, TextureDescriptor, TextureParameter, Wrap};
use crate::foundation::math::UVec2;
use crate::render::assets::Assets;
use crate::render::context::{Context, Extension, PixelStore, TextureTarget};

/// Errors raised while loading textures
#[derive(Error, Debug)]
pub enum TextureError {
    /// Channel count has no uncompressed format
    #[error("bad channel count: {0}")]
    BadChannels(u32),

    /// The requested compression cannot store this many channels
    #[error("{compression:?} compression does not support {channels} channels")]
    BadCompression {
        /// Requested compression
        compression: Compression,
        /// Channel count of the image
        channels: u32,
    },

    /// The requested compression needs an extension the device lacks
    #[error("{} is not supported", .0.name())]
    Unsupported(Extension),

    /// Decoding failed
    #[error("failed to load texture {path}: {source}")]
    Image {
        /// File that failed
        path: PathBuf,
        /// Decoder error
        source: image::ImageError,
    },

    /// Cube map faces differ in size or channel count
    #[error("cube map face {0} does not match the other faces")]
    FaceMismatch(PathBuf),
}

/// Requested block compression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// S3TC DXT1
    Dxt1,
    /// S3TC DXT5
    Dxt5,
    /// BPTC BC7
    Bc7,
    /// RGTC
    Rgtc,
    /// Best supported compression for the channel count
    Default,
}

/// Where the first row of image data lands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Rows kept in file order
    TopLeft,
    /// Rows flipped vertically on load
    #[default]
    BottomLeft,
}

/// Sampling filter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Linear (trilinear with mipmaps)
    #[default]
    Linear,
    /// Nearest
    Nearest,
}

/// Downscale factor applied after decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownScale {
    /// Full size
    #[default]
    None,
    /// Half size
    X2,
    /// Quarter size
    X4,
    /// Eighth size
    X8,
}

impl DownScale {
    fn divisor(self) -> u32 {
        match self {
            Self::None => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }
}

/// Options for [`TextureLoader`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureLoaderFlags {
    /// Block compression
    pub compression: Compression,
    /// Row order
    pub origin: Origin,
    /// Sampling filter
    pub filter: TextureFilter,
    /// Generate and sample mip levels
    pub mipmap: bool,
    /// Coordinate wrapping for 2D textures
    pub wrap: Wrap,
    /// Apply anisotropic filtering when the device supports it
    pub anisotropic_filter: bool,
    /// Anisotropy level; 0 selects the device maximum
    pub anisotropic_value: f32,
    /// Downscale factor
    pub downscale: DownScale,
}

impl Default for TextureLoaderFlags {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            origin: Origin::BottomLeft,
            filter: TextureFilter::Linear,
            mipmap: true,
            wrap: Wrap::Repeat,
            anisotropic_filter: true,
            anisotropic_value: 0.0,
            downscale: DownScale::None,
        }
    }
}

/// Device and client formats chosen for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSelection {
    /// Device storage format
    pub internal: InternalFormat,
    /// Client pixel layout
    pub format: PixelFormat,
}

// Preference order for `Compression::Default`.
const DEFAULT_COMPRESSION: [(Extension, Compression, &[u32]); 4] = [
    (Extension::TextureCompressionRgtc, Compression::Rgtc, &[1, 2]),
    (Extension::TextureCompressionBptc, Compression::Bc7, &[3, 4]),
    (Extension::TextureCompressionS3tc, Compression::Dxt1, &[3]),
    (Extension::TextureCompressionS3tc, Compression::Dxt5, &[4]),
];

/// Pick storage and pixel formats for an image with `channels` channels
pub fn select_format(
    compression: Compression,
    channels: u32,
    supports: impl Fn(Extension) -> bool,
) -> Result<FormatSelection, TextureError> {
    let compression = match compression {
        Compression::Default => DEFAULT_COMPRESSION
            .iter()
            .find(|(extension, _, counts)| counts.contains(&channels) && supports(*extension))
            .map_or(Compression::Default, |(_, compression, _)| *compression),
        other => other,
    };

    let require = |extension: Extension| {
        if supports(extension) {
            Ok(())
        } else {
            Err(TextureError::Unsupported(extension))
        }
    };
    let bad = || TextureError::BadCompression { compression, channels };

    let internal = match (compression, channels) {
        // Default only remains here when no preference applied
        (Compression::None | Compression::Default, 1) => InternalFormat::R8,
        (Compression::None | Compression::Default, 2) => InternalFormat::RG8,
        (Compression::None | Compression::Default, 3) => InternalFormat::RGB8,
        (Compression::None | Compression::Default, 4) => InternalFormat::RGBA8,
        (Compression::None | Compression::Default, _) => return Err(TextureError::BadChannels(channels)),

        (Compression::Dxt1, 3 | 4) => {
            require(Extension::TextureCompressionS3tc)?;
            if channels == 3 {
                InternalFormat::RgbDxt1
            } else {
                InternalFormat::RgbaDxt1
            }
        }
        (Compression::Dxt5, 4) => {
            require(Extension::TextureCompressionS3tc)?;
            InternalFormat::RgbaDxt5
        }
        (Compression::Bc7, 3 | 4) => {
            require(Extension::TextureCompressionBptc)?;
            InternalFormat::RgbaBc7
        }
        (Compression::Rgtc, 1 | 2) => {
            require(Extension::TextureCompressionRgtc)?;
            if channels == 1 {
                InternalFormat::RRgtc
            } else {
                InternalFormat::RgRgtc
            }
        }
        (Compression::Dxt1 | Compression::Dxt5 | Compression::Bc7 | Compression::Rgtc, _) => return Err(bad()),
    };

    let format = match channels {
        1 => PixelFormat::Red,
        2 => PixelFormat::RG,
        3 => PixelFormat::RGB,
        4 => PixelFormat::RGBA,
        _ => return Err(TextureError::BadChannels(channels)),
    };

    Ok(FormatSelection { internal, format })
}

/// Number of mip levels for a full chain: `floor(log2(max(w, h))) + 1`
pub fn mip_levels(size: UVec2) -> u32 {
    let largest = size.x.max(size.y);
    if largest == 0 {
        1
    } else {
        u32::BITS - largest.leading_zeros()
    }
}

const CUBE_FACES: [&str; 6] = ["_right", "_left", "_top", "_bottom", "_front", "_back"];

/// Decoded pixels ready for upload
struct Pixels {
    size: UVec2,
    channels: u32,
    data: Vec<u8>,
}

/// Loads textures into [`Assets`]
pub struct TextureLoader<'a> {
    assets: &'a mut Assets,
}

impl<'a> TextureLoader<'a> {
    /// Loader caching into `assets`
    pub fn new(assets: &'a mut Assets) -> Self {
        Self { assets }
    }

    /// Load a 2D texture, returning the cached one if the stem was loaded before
    pub fn load(
        &mut self,
        ctx: &mut Context,
        path: impl AsRef<Path>,
        flags: &TextureLoaderFlags,
    ) -> Result<Texture, TextureError> {
        let path = path.as_ref();
        let name = stem(path);
        if let Some(texture) = self.assets.textures.get(&name) {
            return Ok(texture.clone());
        }

        let image = image::open(path).map_err(|source| TextureError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading texture '{}' from {}", name, path.display());
        self.load_image(ctx, name, image, flags)
    }

    /// Upload an in-memory image as a 2D texture cached under `name`
    pub fn load_image(
        &mut self,
        ctx: &mut Context,
        name: impl Into<String>,
        image: DynamicImage,
        flags: &TextureLoaderFlags,
    ) -> Result<Texture, TextureError> {
        let name = name.into();
        let pixels = decode(image, flags);
        let selection = select_format(flags.compression, pixels.channels, |e| ctx.supports_extension(e))?;

        let texture = Texture::new(
            ctx,
            TextureDescriptor {
                target: TextureTarget::Tex2D,
                internal_format: selection.internal,
                format: selection.format,
                size: pixels.size,
                levels: mip_levels(pixels.size),
            },
        );
        ctx.set_pixel_store(PixelStore::UnpackAlignment, 1);
        texture.upload(ctx, 0, &pixels.data);

        apply_sampling(ctx, &texture, flags);
        texture.set_parameter(ctx, TextureParameter::WrapS(flags.wrap));
        texture.set_parameter(ctx, TextureParameter::WrapT(flags.wrap));

        self.assets.textures.insert(name, texture.clone());
        Ok(texture)
    }

    /// Load a cube map from `<stem>_right<ext>`, `<stem>_left<ext>`, ... next to `path`
    pub fn load_cubemap(
        &mut self,
        ctx: &mut Context,
        path: impl AsRef<Path>,
        flags: &TextureLoaderFlags,
    ) -> Result<Texture, TextureError> {
        let path = path.as_ref();
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let stem = stem(path);
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut faces: Vec<Pixels> = Vec::with_capacity(CUBE_FACES.len());
        for suffix in CUBE_FACES {
            let face_path = parent.join(format!("{}{}{}", stem, suffix, extension));
            let image = image::open(&face_path).map_err(|source| TextureError::Image {
                path: face_path.clone(),
                source,
            })?;
            let pixels = decode(image, flags);
            if let Some(first) = faces.first() {
                if first.size != pixels.size || first.channels != pixels.channels {
                    return Err(TextureError::FaceMismatch(face_path));
                }
            }
            faces.push(pixels);
        }

        let (size, channels) = (faces[0].size, faces[0].channels);
        let selection = select_format(flags.compression, channels, |e| ctx.supports_extension(e))?;
        let texture = Texture::new(
            ctx,
            TextureDescriptor {
                target: TextureTarget::CubeMap,
                internal_format: selection.internal,
                format: selection.format,
                size,
                levels: mip_levels(size),
            },
        );

        ctx.set_pixel_store(PixelStore::UnpackAlignment, 1);
        for (layer, face) in (0u32..).zip(&faces) {
            texture.upload(ctx, layer, &face.data);
        }

        apply_sampling(ctx, &texture, flags);
        texture.set_parameter(ctx, TextureParameter::WrapS(Wrap::ClampToEdge));
        texture.set_parameter(ctx, TextureParameter::WrapT(Wrap::ClampToEdge));
        texture.set_parameter(ctx, TextureParameter::WrapR(Wrap::ClampToEdge));

        log::debug!("Loaded cube map '{}' ({}x{})", stem, size.x, size.y);
        Ok(texture)
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn decode(image: DynamicImage, flags: &TextureLoaderFlags) -> Pixels {
    let mut image = match flags.origin {
        Origin::BottomLeft => image.flipv(),
        Origin::TopLeft => image,
    };

    let divisor = flags.downscale.divisor();
    if divisor > 1 {
        let width = (image.width() / divisor).max(1);
        let height = (image.height() / divisor).max(1);
        image = image.resize_exact(width, height, FilterType::Triangle);
    }

    let size = UVec2::new(image.width(), image.height());
    let channels = u32::from(image.color().channel_count());
    let data = match channels {
        1 => image.into_luma8().into_raw(),
        2 => image.into_luma_alpha8().into_raw(),
        3 => image.into_rgb8().into_raw(),
        _ => image.into_rgba8().into_raw(),
    };

    Pixels { size, channels: channels.min(4), data }
}

fn apply_sampling(ctx: &mut Context, texture: &Texture, flags: &TextureLoaderFlags) {
    let (min, mag) = match (flags.filter, flags.mipmap) {
        (TextureFilter::Linear, true) => (Filter::LinearMipmapLinear, Filter::Linear),
        (TextureFilter::Linear, false) => (Filter::Linear, Filter::Linear),
        (TextureFilter::Nearest, true) => (Filter::NearestMipmapNearest, Filter::Nearest),
        (TextureFilter::Nearest, false) => (Filter::Nearest, Filter::Nearest),
    };
    texture.set_parameter(ctx, TextureParameter::MinFilter(min));
    texture.set_parameter(ctx, TextureParameter::MagFilter(mag));

    if flags.mipmap {
        texture.generate_mipmap(ctx);
    }

    if flags.anisotropic_filter && ctx.supports_extension(Extension::TextureFilterAnisotropic) {
        let value = if flags.anisotropic_value == 0.0 {
            ctx.limits().max_anisotropy
        } else {
            flags.anisotropic_value
        };
        texture.set_parameter(ctx, TextureParameter::Anisotropy(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{DeviceCall, RecordingDevice};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn none(_: Extension) -> bool {
        false
    }

    fn all(_: Extension) -> bool {
        true
    }

    #[test]
    fn test_uncompressed_formats() {
        let expected = [
            (1, InternalFormat::R8, PixelFormat::Red),
            (2, InternalFormat::RG8, PixelFormat::RG),
            (3, InternalFormat::RGB8, PixelFormat::RGB),
            (4, InternalFormat::RGBA8, PixelFormat::RGBA),
        ];
        for (channels, internal, format) in expected {
            let selection = select_format(Compression::None, channels, none).unwrap();
            assert_eq!(selection, FormatSelection { internal, format });
        }
        assert!(matches!(select_format(Compression::None, 5, none), Err(TextureError::BadChannels(5))));
    }

    #[test]
    fn test_explicit_compression_checks_channels_and_extension() {
        assert!(matches!(
            select_format(Compression::Dxt5, 3, all),
            Err(TextureError::BadCompression { compression: Compression::Dxt5, channels: 3 })
        ));
        assert!(matches!(
            select_format(Compression::Rgtc, 4, all),
            Err(TextureError::BadCompression { .. })
        ));
        assert!(matches!(
            select_format(Compression::Bc7, 4, none),
            Err(TextureError::Unsupported(Extension::TextureCompressionBptc))
        ));
        assert_eq!(select_format(Compression::Dxt1, 3, all).unwrap().internal, InternalFormat::RgbDxt1);
        assert_eq!(select_format(Compression::Dxt1, 4, all).unwrap().internal, InternalFormat::RgbaDxt1);
        assert_eq!(select_format(Compression::Rgtc, 2, all).unwrap().internal, InternalFormat::RgRgtc);
    }

    #[test]
    fn test_default_compression_preference_order() {
        // everything supported: RGTC for 1-2 channels, BC7 for 3-4
        assert_eq!(select_format(Compression::Default, 1, all).unwrap().internal, InternalFormat::RRgtc);
        assert_eq!(select_format(Compression::Default, 3, all).unwrap().internal, InternalFormat::RgbaBc7);

        // only S3TC: DXT1 for RGB, DXT5 for RGBA, uncompressed otherwise
        let s3tc = |e: Extension| e == Extension::TextureCompressionS3tc;
        assert_eq!(select_format(Compression::Default, 3, s3tc).unwrap().internal, InternalFormat::RgbDxt1);
        assert_eq!(select_format(Compression::Default, 4, s3tc).unwrap().internal, InternalFormat::RgbaDxt5);
        assert_eq!(select_format(Compression::Default, 2, s3tc).unwrap().internal, InternalFormat::RG8);
    }

    #[test]
    fn test_default_compression_falls_back_to_bad_channels() {
        assert!(matches!(select_format(Compression::Default, 0, all), Err(TextureError::BadChannels(0))));
        assert!(matches!(select_format(Compression::Default, 6, none), Err(TextureError::BadChannels(6))));
    }

    #[test]
    fn test_mip_levels() {
        assert_eq!(mip_levels(UVec2::new(1, 1)), 1);
        assert_eq!(mip_levels(UVec2::new(256, 256)), 9);
        assert_eq!(mip_levels(UVec2::new(300, 20)), 9);
        assert_eq!(mip_levels(UVec2::new(1024, 512)), 11);
    }

    fn context() -> Context {
        let device = RecordingDevice::new().with_extensions(&[Extension::TextureFilterAnisotropic]);
        Context::new(Box::new(device), UVec2::new(8, 8))
    }

    #[test]
    fn test_load_image_downscales_and_caches() {
        let mut ctx = context();
        let mut assets = Assets::new();
        let flags = TextureLoaderFlags { downscale: DownScale::X4, ..TextureLoaderFlags::default() };

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([10, 20, 30])));
        let texture = TextureLoader::new(&mut assets).load_image(&mut ctx, "bricks", image, &flags).unwrap();

        assert_eq!(texture.size(), UVec2::new(16, 8));
        assert_eq!(texture.descriptor().levels, 5);
        assert_eq!(texture.descriptor().internal_format, InternalFormat::RGB8);
        assert!(assets.textures.contains_key("bricks"));

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert!(device
            .calls()
            .contains(&DeviceCall::TexParameter(TextureTarget::Tex2D, TextureParameter::Anisotropy(16.0))));
        assert_eq!(device.call_count("generate_mipmap"), 1);
    }

    #[test]
    fn test_load_from_file_uses_stem_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate_diffuse.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let mut ctx = context();
        let mut assets = Assets::new();
        let flags = TextureLoaderFlags::default();
        let first = TextureLoader::new(&mut assets).load(&mut ctx, &path, &flags).unwrap();
        let second = TextureLoader::new(&mut assets).load(&mut ctx, &path, &flags).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(first.descriptor().format, PixelFormat::RGBA);
        assert_eq!(ctx.device_as::<RecordingDevice>().unwrap().call_count("create_texture"), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut ctx = context();
        let mut assets = Assets::new();
        let result = TextureLoader::new(&mut assets).load(&mut ctx, "does/not/exist.png", &TextureLoaderFlags::default());
        assert!(matches!(result, Err(TextureError::Image { .. })));
    }

    #[test]
    fn test_cubemap_loads_six_faces() {
        let dir = tempfile::tempdir().unwrap();
        for suffix in CUBE_FACES {
            let face = dir.path().join(format!("sky{}.png", suffix));
            RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])).save(face).unwrap();
        }

        let mut ctx = context();
        let mut assets = Assets::new();
        let texture = TextureLoader::new(&mut assets)
            .load_cubemap(&mut ctx, dir.path().join("sky.png"), &TextureLoaderFlags::default())
            .unwrap();

        assert_eq!(texture.target(), TextureTarget::CubeMap);
        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert_eq!(device.call_count("tex_sub_image"), 6);
        assert!(device
            .calls()
            .contains(&DeviceCall::TexParameter(TextureTarget::CubeMap, TextureParameter::WrapR(Wrap::ClampToEdge))));
    }

    #[test]
    fn test_cubemap_missing_face_fails() {
        let dir = tempfile::tempdir().unwrap();
        for suffix in &CUBE_FACES[..5] {
            let face = dir.path().join(format!("sky{}.png", suffix));
            RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])).save(face).unwrap();
        }

        let mut ctx = context();
        let mut assets = Assets::new();
        let result = TextureLoader::new(&mut assets).load_cubemap(
            &mut ctx,
            dir.path().join("sky.png"),
            &TextureLoaderFlags::default(),
        );
        assert!(matches!(result, Err(TextureError::Image { ref path, .. }) if path.ends_with("sky_back.png")));
    }
}

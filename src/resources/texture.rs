use anyhow::{Context, bail, ensure};

use crate::resources::AssetSource;

/// The six decoded faces of a cube map, ready for upload.
///
/// All faces are square RGBA8 images of the same size, in the order
/// +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug, Clone)]
pub struct CubeFaces {
    faces: [image::RgbaImage; 6],
}

impl CubeFaces {
    /// Validate and wrap six decoded faces.
    pub fn new(faces: [image::RgbaImage; 6]) -> anyhow::Result<Self> {
        let (width, height) = faces[0].dimensions();
        ensure!(
            width == height,
            "cube map faces must be square, the first face is {width}x{height}"
        );
        for (idx, face) in faces.iter().enumerate().skip(1) {
            if face.dimensions() != (width, height) {
                bail!(
                    "cube map face {idx} is {}x{}, expected {width}x{height} like the first face",
                    face.width(),
                    face.height()
                );
            }
        }
        Ok(Self { faces })
    }

    /// Edge length of every face in pixels.
    pub fn size(&self) -> u32 {
        self.faces[0].width()
    }

    pub fn iter(&self) -> impl Iterator<Item = &image::RgbaImage> {
        self.faces.iter()
    }
}

/// Load and decode the six cube map faces `prefix + faces[i]`.
///
/// All faces are requested concurrently; the first failing face aborts the
/// load and its path is named in the error.
pub async fn load_cube_faces<S: AssetSource>(
    source: S,
    prefix: String,
    faces: [String; 6],
) -> anyhow::Result<CubeFaces> {
    let paths: Vec<String> = faces.iter().map(|face| format!("{prefix}{face}")).collect();
    log::debug!("loading cube map faces {:?}", paths);

    let source = &source;
    let loads = paths.iter().map(|path| async move {
        let bytes = source
            .load_binary(path)
            .await
            .with_context(|| format!("cannot load cube map face {path}"))?;
        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("cannot decode cube map face {path}"))?;
        anyhow::Ok(img.to_rgba8())
    });
    let decoded = futures::future::try_join_all(loads).await?;

    let faces: [image::RgbaImage; 6] = decoded
        .try_into()
        .map_err(|v: Vec<_>| anyhow::anyhow!("expected 6 cube map faces, got {}", v.len()))?;
    CubeFaces::new(faces)
}

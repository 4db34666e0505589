use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use image::RgbaImage;
use itertools::Itertools;
use rayon::prelude::*;

/// Six RGBA8 cube faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone)]
pub struct CubeMapData {
    pub face_size: u32,
    pub faces: [Vec<u8>; 6],
}

impl CubeMapData {
    pub fn from_faces(faces: [RgbaImage; 6]) -> anyhow::Result<Self> {
        let face_size = faces[0].width();

        for (index, face) in faces.iter().enumerate() {
            if face.width() != face.height() {
                bail!(
                    "Cube face {} is not square ({}x{})",
                    index,
                    face.width(),
                    face.height()
                );
            }

            if face.width() != face_size {
                bail!(
                    "Cube face {} is {}px but face 0 is {}px",
                    index,
                    face.width(),
                    face_size
                );
            }
        }

        Ok(Self {
            face_size,
            faces: faces.map(RgbaImage::into_raw),
        })
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.face_size * 4
    }
}

/// Loads a cube map. Each distinct path is decoded once, in parallel.
pub fn load_cube_map(paths: &[PathBuf; 6]) -> anyhow::Result<CubeMapData> {
    let unique_paths: Vec<&PathBuf> = paths.iter().unique().collect();

    let decoded: HashMap<&Path, RgbaImage> = unique_paths
        .par_iter()
        .map(|path| decode_face(path).map(|image| (path.as_path(), image)))
        .collect::<anyhow::Result<_>>()?;

    log::info!(
        "Decoded {} distinct cube map faces for {} slots",
        decoded.len(),
        paths.len()
    );

    let faces = paths.clone().map(|path| decoded[path.as_path()].clone());

    CubeMapData::from_faces(faces)
}

fn decode_face(path: &Path) -> anyhow::Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to decode cube map face {}", path.display()))?;

    Ok(image.to_rgba8())
}

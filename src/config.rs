use std::path::{Path, PathBuf};

use itertools::Itertools;

/// Overrides the directory that asset paths are resolved against.
pub const ASSET_ROOT_VAR: &str = "SCROLL_SCENE_ASSETS";

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub model_path: PathBuf,
    pub env_map_faces: [PathBuf; 6],
    /// Spacer length in viewport heights; bounds the reachable scroll offset.
    pub spacer_pages: f32,
    /// Draws the small static box at the origin.
    pub show_marker: bool,
    /// Page color behind the canvas, `0xRRGGBB` sRGB.
    pub background: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::with_asset_root(Path::new("assets"))
    }
}

impl SceneConfig {
    pub fn with_asset_root(root: &Path) -> Self {
        let face = root.join("cubeMap.jpg");

        Self {
            model_path: root.join("name.gltf"),
            env_map_faces: [0; 6].map(|_| face.clone()),
            spacer_pages: 10.0,
            show_marker: false,
            background: 0xcdd3da,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var_os(ASSET_ROOT_VAR) {
            Some(root) => {
                log::info!("Using asset root {:?} from {}", root, ASSET_ROOT_VAR);
                Self::with_asset_root(Path::new(&root))
            }
            None => Self::default(),
        }
    }

    /// Asset files that do not exist on disk, each listed once.
    pub fn missing_files(&self) -> Vec<&Path> {
        std::iter::once(self.model_path.as_path())
            .chain(self.env_map_faces.iter().map(PathBuf::as_path))
            .unique()
            .filter(|path| !path.is_file())
            .collect()
    }

    pub fn warn_missing_files(&self) {
        for path in self.missing_files() {
            log::warn!(
                "Asset {} not found; see assets/README.md or set {}",
                path.display(),
                ASSET_ROOT_VAR
            );
        }
    }
}

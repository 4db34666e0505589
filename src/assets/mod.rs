pub mod env_map;
pub mod load_state;
pub mod loader;

pub use env_map::{load_cube_map, CubeMapData};
pub use load_state::{AssetHandle, AssetLoadState};
pub use loader::spawn_load;

use anyhow::Result;

mod animation;
mod assets;
mod camera;
mod camera_rig;
mod config;
mod demo;
mod material_manager;
mod model;
mod render_loop;
mod rendering;
mod scene_graph;
mod scroll;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    config::SceneConfig,
    render_loop::RenderLoop,
    rendering::renderer::Renderer,
    scroll::{ScrollEventSource, ScrollPage},
};

/// Pixels scrolled per wheel notch or arrow key press.
pub const LINE_HEIGHT: f32 = 40.0;

struct App {
    config: SceneConfig,
    page: ScrollPage,
    scroll_events: ScrollEventSource,
    render_loop: RenderLoop,
    renderer: Option<Renderer>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SceneConfig) -> anyhow::Result<Self> {
        let scroll_events = ScrollEventSource::new();
        let render_loop = RenderLoop::mount(&config, &scroll_events)?;

        Ok(Self {
            page: ScrollPage::new(config.spacer_pages, 0.0),
            config,
            scroll_events,
            render_loop,
            renderer: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn publish(&self, change: Option<f32>) {
        if let Some(offset) = change {
            self.scroll_events.dispatch(offset);
        }
    }

    fn on_wheel(&mut self, delta: MouseScrollDelta) {
        // Positive y scrolls up, towards the top of the page.
        let pixels = match delta {
            MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
            MouseScrollDelta::PixelDelta(position) => -position.y as f32,
        };

        let change = self.page.scroll_by(pixels);
        self.publish(change);
    }

    fn on_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }

        let change = match &event.logical_key {
            Key::Named(NamedKey::ArrowDown) => self.page.scroll_by(LINE_HEIGHT),
            Key::Named(NamedKey::ArrowUp) => self.page.scroll_by(-LINE_HEIGHT),
            Key::Named(NamedKey::PageDown) => self.page.page_down(),
            Key::Named(NamedKey::PageUp) => self.page.page_up(),
            Key::Named(NamedKey::Home) => self.page.to_start(),
            Key::Named(NamedKey::End) => self.page.to_end(),
            _ => None,
        };
        self.publish(change);
    }

    fn on_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            log::debug!("Ignoring resize to {}x{}", new_size.width, new_size.height);
            return;
        }

        let change = self.page.resize(new_size.height as f32);
        self.publish(change);

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(new_size);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let output = match self.render_loop.tick() {
            Ok(output) => output,
            Err(error) => return self.fail(event_loop, error),
        };

        log::trace!(
            "Frame {} at scroll {}: {:?}",
            self.render_loop.frame_number(),
            self.render_loop.scroll_position(),
            self.render_loop.segments()
        );

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.window.request_redraw();

        match renderer.render(&self.render_loop, &output) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("Out of GPU memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }
    }

    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Renderer> {
        let window_attributes = Window::default_attributes().with_title("scroll-scene");
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        pollster::block_on(Renderer::new(Arc::new(window), &self.config))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        match self.create_renderer(event_loop) {
            Ok(renderer) => {
                let size = renderer.size;
                renderer.window.request_redraw();
                self.renderer = Some(renderer);
                self.on_resize(size);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.on_resize(new_size),
            WindowEvent::MouseWheel { delta, .. } => self.on_wheel(delta),
            WindowEvent::KeyboardInput { event, .. } => self.on_key(&event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.render_loop.unmount();
    }
}

pub async fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let config = SceneConfig::from_env();
    config.warn_missing_files();

    let mut app = App::new(config).context("Failed to mount scroll scene")?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

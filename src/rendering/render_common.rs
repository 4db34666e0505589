use wgpu::SurfaceConfiguration;
use winit::dpi::PhysicalSize;

/// Surface configuration shared by the renderer and its passes.
pub struct RenderCommon {
    pub output_surface_config: SurfaceConfiguration,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        surface: &wgpu::Surface,
        size: PhysicalSize<u32>,
    ) -> anyhow::Result<Self> {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let output_surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(device, &output_surface_config);

        log::info!(
            "Configured {}x{} surface with format {:?}",
            output_surface_config.width,
            output_surface_config.height,
            surface_format
        );

        Ok(Self {
            output_surface_config,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.output_surface_config.format
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.output_surface_config.width as f32 / self.output_surface_config.height as f32
    }
}

use crate::assets::CubeMapData;

pub struct Texture {
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
}

impl Texture {
    pub fn from_wgpu_texture(texture: wgpu::Texture, view: wgpu::TextureView) -> Self {
        Self {
            _texture: texture,
            view,
        }
    }
}

pub struct DepthTexture {
    texture: Texture,
    label: String,
}

impl DepthTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: impl Into<String>,
    ) -> Self {
        let label: String = label.into();

        DepthTexture {
            texture: Self::create_texture(device, config, &label),
            label,
        }
    }

    fn create_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Texture::from_wgpu_texture(texture, view)
    }

    pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.texture = Self::create_texture(device, config, &self.label);
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.texture.view
    }
}

/// Six-layer sRGB cube texture sampled for reflections.
pub struct CubeTexture {
    texture: Texture,
    pub face_size: u32,
}

impl CubeTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// 1x1 grey cube bound until the environment map has loaded.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let grey = vec![128, 128, 128, 255];
        let data = CubeMapData {
            face_size: 1,
            faces: [0; 6].map(|_| grey.clone()),
        };

        Self::from_data(device, queue, &data, "Placeholder environment map")
    }

    pub fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &CubeMapData,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: data.face_size,
            height: data.face_size,
            depth_or_array_layers: 6,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in data.faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(data.bytes_per_row()),
                    rows_per_image: Some(data.face_size),
                },
                wgpu::Extent3d {
                    width: data.face_size,
                    height: data.face_size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self {
            texture: Texture::from_wgpu_texture(texture, view),
            face_size: data.face_size,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.texture.view
    }
}

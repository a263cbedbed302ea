use bevy::{
    asset::{LoadState, RenderAssetUsages},
    prelude::*,
    render::render_resource::{
        Extent3d,
        TextureDimension,
        TextureFormat,
        TextureUsages,
    },
};

use crate::splat::{
    SplatBuffer,
    cloud::{SplatCloud, SplatCloudHandle, modified_clouds},
    f32::Covariance3d,
    settings::SplatMeshSettings,
};


pub const ELEMENTS_PER_TEXEL: usize = 2;

pub const COVARIANCE_ELEMENTS: usize = 6;
pub const COVARIANCE_TEXEL_STRIDE: u32 = 3;

pub const CENTER_COLOR_ELEMENTS: usize = 4;
pub const CENTER_COLOR_TEXEL_STRIDE: u32 = 2;


/// fixed-width grid, only the height grows (by doubling) to fit the splat count
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub struct TextureLayout {
    pub base_width: u32,
    pub base_height: u32,
}

impl Default for TextureLayout {
    fn default() -> Self {
        Self {
            base_width: 4096,
            base_height: 1024,
        }
    }
}

impl TextureLayout {
    pub fn grid_size(&self, element_count: usize) -> TextureSize {
        let width = self.base_width.max(1);
        let mut height = self.base_height.max(1);

        let capacity = |height: u32| {
            (width as u64)
                .saturating_mul(height as u64)
                .saturating_mul(ELEMENTS_PER_TEXEL as u64)
        };

        while capacity(height) < element_count as u64 {
            // saturates instead of wrapping for counts no texture could hold
            let Some(doubled) = height.checked_mul(2) else {
                height = u32::MAX;
                break;
            };
            height = doubled;
        }

        TextureSize { width, height }
    }
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn element_count(&self) -> usize {
        self.texel_count() * ELEMENTS_PER_TEXEL
    }

    pub fn extent(&self) -> Extent3d {
        Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// value of the `*_texture_size` shader uniform
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}


/// texel holding the `offset`-th texel of a splat with the given texel stride
pub fn texel_coord(
    splat_index: u32,
    stride: u32,
    offset: u32,
    size: TextureSize,
) -> UVec2 {
    let linear = splat_index as u64 * stride as u64 + offset as u64;
    let width = size.width as u64;

    UVec2::new(
        (linear % width) as u32,
        (linear / width) as u32,
    )
}

/// R in the low byte, A in the high byte
pub fn encode_rgba(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

pub fn decode_rgba(packed: u32) -> [u8; 4] {
    packed.to_le_bytes()
}

/// bit reinterpretation, sampled back with `bitcast<f32>` / `uintBitsToFloat`
pub fn encode_float(value: f32) -> u32 {
    bytemuck::cast(value)
}

pub fn decode_float(bits: u32) -> f32 {
    bytemuck::cast(bits)
}


#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodedSplatLayout {
    pub splat_count: usize,

    /// `Rg32Float` texels, 3 per splat
    pub covariances: Vec<f32>,
    pub covariance_size: TextureSize,

    /// `Rg32Uint` texels, 2 per splat: color, center.x | center.y, center.z
    pub center_colors: Vec<u32>,
    pub center_color_size: TextureSize,
}

pub fn build_encoded_layout<B: SplatBuffer + ?Sized>(
    buffer: &B,
    layout: &TextureLayout,
) -> EncodedSplatLayout {
    let splat_count = buffer.splat_count();

    let covariance_size = layout.grid_size(splat_count * COVARIANCE_ELEMENTS);
    let mut covariances = vec![0.0; covariance_size.element_count()];
    let source = buffer.precomputed_covariances();
    let copied = source.len().min(splat_count * COVARIANCE_ELEMENTS);
    covariances[..copied].copy_from_slice(&source[..copied]);

    let mut centers = vec![0.0; splat_count * 3];
    buffer.fill_positions(&mut centers);

    let mut colors = vec![0u8; splat_count * 4];
    buffer.fill_colors(&mut colors);

    let center_color_size = layout.grid_size(splat_count * CENTER_COLOR_ELEMENTS);
    let mut center_colors = vec![0u32; center_color_size.element_count()];

    center_colors
        .chunks_exact_mut(CENTER_COLOR_ELEMENTS)
        .zip(centers.chunks_exact(3).zip(colors.chunks_exact(4)))
        .for_each(|(texels, (center, color))| {
            texels[0] = encode_rgba([color[0], color[1], color[2], color[3]]);
            texels[1] = encode_float(center[0]);
            texels[2] = encode_float(center[1]);
            texels[3] = encode_float(center[2]);
        });

    EncodedSplatLayout {
        splat_count,
        covariances,
        covariance_size,
        center_colors,
        center_color_size,
    }
}

impl EncodedSplatLayout {
    pub fn from_buffer<B: SplatBuffer + ?Sized>(buffer: &B) -> Self {
        build_encoded_layout(buffer, &TextureLayout::default())
    }

    fn covariance_texel(&self, splat_index: u32, offset: u32) -> [f32; 2] {
        let coord = texel_coord(splat_index, COVARIANCE_TEXEL_STRIDE, offset, self.covariance_size);
        let texel = (coord.y as usize * self.covariance_size.width as usize + coord.x as usize) * ELEMENTS_PER_TEXEL;

        [self.covariances[texel], self.covariances[texel + 1]]
    }

    fn center_color_texel(&self, splat_index: u32, offset: u32) -> [u32; 2] {
        let coord = texel_coord(splat_index, CENTER_COLOR_TEXEL_STRIDE, offset, self.center_color_size);
        let texel = (coord.y as usize * self.center_color_size.width as usize + coord.x as usize) * ELEMENTS_PER_TEXEL;

        [self.center_colors[texel], self.center_colors[texel + 1]]
    }

    /// reads the covariance back the way the vertex stage samples it
    pub fn covariance(&self, splat_index: u32) -> Covariance3d {
        let a = self.covariance_texel(splat_index, 0);
        let b = self.covariance_texel(splat_index, 1);
        let c = self.covariance_texel(splat_index, 2);

        [a[0], a[1], b[0], b[1], c[0], c[1]].into()
    }

    pub fn center(&self, splat_index: u32) -> Vec3 {
        let a = self.center_color_texel(splat_index, 0);
        let b = self.center_color_texel(splat_index, 1);

        Vec3::new(
            decode_float(a[1]),
            decode_float(b[0]),
            decode_float(b[1]),
        )
    }

    pub fn color(&self, splat_index: u32) -> [u8; 4] {
        decode_rgba(self.center_color_texel(splat_index, 0)[0])
    }

    pub fn images(&self) -> (Image, Image) {
        let mut covariances = Image::new(
            self.covariance_size.extent(),
            TextureDimension::D2,
            bytemuck::cast_slice(self.covariances.as_slice()).to_vec(),
            TextureFormat::Rg32Float,
            RenderAssetUsages::default(),
        );
        covariances.texture_descriptor.usage =
            TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING;

        let mut center_colors = Image::new(
            self.center_color_size.extent(),
            TextureDimension::D2,
            bytemuck::cast_slice(self.center_colors.as_slice()).to_vec(),
            TextureFormat::Rg32Uint,
            RenderAssetUsages::default(),
        );
        center_colors.texture_descriptor.usage =
            TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING;

        (covariances, center_colors)
    }
}


#[derive(Component, Clone, Debug, Reflect)]
#[reflect(Component)]
pub struct SplatTextures {
    pub source: AssetId<SplatCloud>,
    pub splat_count: usize,
    pub covariances: Handle<Image>,
    pub covariance_size: TextureSize,
    pub center_colors: Handle<Image>,
    pub center_color_size: TextureSize,
}


#[derive(Default)]
pub struct SplatTexturePlugin;

impl Plugin for SplatTexturePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SplatTextures>();
        app.register_type::<TextureLayout>();
        app.register_type::<TextureSize>();

        app.add_systems(Update, queue_splat_textures);
    }
}

#[allow(clippy::type_complexity)]
pub fn queue_splat_textures(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    splat_clouds: Res<Assets<SplatCloud>>,
    mut images: ResMut<Assets<Image>>,
    mut cloud_events: EventReader<AssetEvent<SplatCloud>>,
    clouds: Query<(
        Entity,
        &SplatCloudHandle,
        &SplatMeshSettings,
        Option<&SplatTextures>,
    )>,
) {
    let modified = modified_clouds(&mut cloud_events);

    for (entity, cloud_handle, settings, textures) in clouds.iter() {
        if let Some(LoadState::Loading) = asset_server.get_load_state(cloud_handle.handle()) {
            continue;
        }

        let Some(cloud) = splat_clouds.get(cloud_handle.handle()) else {
            continue;
        };

        let source = cloud_handle.handle().id();
        let up_to_date = textures.is_some_and(|textures| {
            textures.source == source && textures.splat_count == cloud.splat_count()
        });

        if up_to_date && !modified.contains(&source) {
            continue;
        }

        let layout = build_encoded_layout(cloud, &settings.texture_layout);
        debug!(
            ?entity,
            splat_count = layout.splat_count,
            covariance_size = ?layout.covariance_size,
            center_color_size = ?layout.center_color_size,
            "rebuilding splat textures"
        );

        if let Some(previous) = textures {
            images.remove(&previous.covariances);
            images.remove(&previous.center_colors);
        }

        let (covariances, center_colors) = layout.images();

        commands.entity(entity).insert(SplatTextures {
            source,
            splat_count: layout.splat_count,
            covariances: images.add(covariances),
            covariance_size: layout.covariance_size,
            center_colors: images.add(center_colors),
            center_color_size: layout.center_color_size,
        });
    }
}

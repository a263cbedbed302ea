use bevy::prelude::*;

use crate::{
    render::texture::TextureLayout,
    sort::SortMode,
};


#[derive(Component, Reflect, Clone, Debug, PartialEq)]
#[reflect(Component)]
pub struct SplatMeshSettings {
    pub texture_layout: TextureLayout,
    pub sort_mode: SortMode,
    pub raycast: bool,
}

impl Default for SplatMeshSettings {
    fn default() -> Self {
        Self {
            texture_layout: TextureLayout::default(),
            sort_mode: SortMode::default(),
            raycast: true,
        }
    }
}

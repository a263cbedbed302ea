use bevy::prelude::*;

pub use splat::{
    SplatBuffer,
    cloud::{
        Splat,
        SplatCloud,
        SplatCloudHandle,
    },
    f32::{
        Covariance3d,
        Rgba,
        Rotation,
        Scale,
    },
    rand::random_splats,
    settings::SplatMeshSettings,
};

pub use render::{
    projection::SplatDrawParameters,
    texture::{
        EncodedSplatLayout,
        TextureLayout,
        build_encoded_layout,
    },
};

pub use sort::{
    SortMode,
    SplatInstances,
};

use query::QueryPlugin;
use render::RenderPipelinePlugin;
use sort::SortPlugin;

pub mod query;
pub mod render;
pub mod sort;
pub mod splat;


pub struct SplatMeshPlugin;

impl Plugin for SplatMeshPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<SplatCloud>();
        app.register_asset_reflect::<SplatCloud>();

        app.register_type::<SplatCloudHandle>();
        app.register_type::<SplatMeshSettings>();

        app.add_plugins((
            RenderPipelinePlugin,
            SortPlugin,
            QueryPlugin,
        ));
    }
}

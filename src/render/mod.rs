use bevy::{
    prelude::*,
    asset::LoadState,
};

use crate::splat::{
    cloud::{
        SplatCloud,
        SplatCloudHandle,
    },
};

pub mod projection;
pub mod texture;

use projection::{
    SplatDrawParameters,
    focal_length_from_fov,
};
use texture::SplatTexturePlugin;


#[derive(Default)]
pub struct RenderPipelinePlugin;

impl Plugin for RenderPipelinePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SplatDrawParameters>();

        app.add_plugins(SplatTexturePlugin);
        app.add_systems(Update, update_splat_draw_parameters);
    }
}


/// logical viewport size, or an explicit camera viewport taken at scale 1 while
/// the render target is still unresolved
pub fn camera_viewport_size(camera: &Camera) -> Option<Vec2> {
    camera.logical_viewport_size().or_else(|| {
        camera.viewport
            .as_ref()
            .map(|viewport| viewport.physical_size.as_vec2())
    })
}


pub fn update_splat_draw_parameters(
    asset_server: Res<AssetServer>,
    splat_clouds: Res<Assets<SplatCloud>>,
    mut clouds: Query<(
        &SplatCloudHandle,
        &mut SplatDrawParameters,
    )>,
    cameras: Query<(
        &Camera,
        &Projection,
    )>,
) {
    let Some((camera, projection)) = cameras.iter()
        .find(|(camera, _)| camera.is_active)
    else {
        return;
    };

    let Some(viewport) = camera_viewport_size(camera) else {
        return;
    };

    // orthographic cameras keep a unit focal
    let focal_length = match projection {
        Projection::Perspective(perspective) => focal_length_from_fov(perspective.fov, viewport.y),
        _ => 1.0,
    };

    for (cloud_handle, mut params) in clouds.iter_mut() {
        if let Some(LoadState::Loading) = asset_server.get_load_state(cloud_handle.handle()) {
            continue;
        }

        let Some(cloud) = splat_clouds.get(cloud_handle.handle()) else {
            continue;
        };

        if cloud.is_empty() {
            continue;
        }

        let focal = Vec2::splat(focal_length);
        if params.viewport != viewport || params.focal != focal {
            params.update_draw_parameters(viewport, focal_length);
        }
    }
}

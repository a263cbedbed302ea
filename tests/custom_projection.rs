use bevy::{
    math::Vec3A,
    prelude::*,
    render::camera::{
        CameraProjection,
        SubCameraView,
    },
};

use bevy_splat_mesh::query::raycast::{
    RaycastError,
    Raycaster,
};


#[derive(Clone, Debug, Default)]
struct FisheyeProjection {
    inner: PerspectiveProjection,
}

impl CameraProjection for FisheyeProjection {
    fn get_clip_from_view(&self) -> Mat4 {
        self.inner.get_clip_from_view()
    }

    fn get_clip_from_view_for_sub(&self, sub_view: &SubCameraView) -> Mat4 {
        self.inner.get_clip_from_view_for_sub(sub_view)
    }

    fn update(&mut self, width: f32, height: f32) {
        self.inner.update(width, height);
    }

    fn far(&self) -> f32 {
        self.inner.far()
    }

    fn get_frustum_corners(&self, z_near: f32, z_far: f32) -> [Vec3A; 8] {
        self.inner.get_frustum_corners(z_near, z_far)
    }
}


#[test]
fn custom_projection_is_unsupported() {
    let projection = Projection::custom(FisheyeProjection::default());
    let camera_transform = GlobalTransform::from(Transform::from_xyz(0.0, 0.0, 5.0));
    let viewport = Vec2::new(800.0, 600.0);

    let result = Raycaster::from_camera_and_screen_position(
        &projection,
        &camera_transform,
        viewport / 2.0,
        viewport,
    );

    assert!(matches!(result, Err(RaycastError::UnsupportedCamera)));
}

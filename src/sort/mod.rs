use bevy::{
    prelude::*,
    asset::LoadState,
    math::{
        Affine3A,
        Vec3A,
    },
};
use bytemuck::{
    Pod,
    Zeroable,
};
use static_assertions::assert_cfg;

use crate::splat::{
    cloud::{
        SplatCloud,
        SplatCloudHandle,
        modified_clouds,
    },
    f32::Position,
    settings::SplatMeshSettings,
};


#[cfg(feature = "sort_rayon")]
pub mod rayon;

#[cfg(feature = "sort_std")]
pub mod std_sort;


assert_cfg!(
    any(
        feature = "sort_rayon",
        feature = "sort_std",
    ),
    "no sort mode enabled",
);


#[derive(
    Component,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Reflect,
)]
pub enum SortMode {
    None,

    #[cfg(feature = "sort_rayon")]
    Rayon,

    #[cfg(feature = "sort_std")]
    Std,
}

impl Default for SortMode {
    #[allow(unreachable_code)]
    fn default() -> Self {
        #[cfg(feature = "sort_rayon")]
        return Self::Rayon;

        #[cfg(feature = "sort_std")]
        return Self::Std;

        Self::None
    }
}


/// `key` is the squared camera distance as raw bits, which orders like the float for non-negative values
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Reflect,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct SortEntry {
    pub key: u32,
    pub index: u32,
}

impl SortEntry {
    /// `world_from_cloud` places the cloud-local `position` next to the world-space camera
    pub fn new(
        index: usize,
        position: Position,
        world_from_cloud: &Affine3A,
        camera_position: Vec3A,
    ) -> Self {
        let position = world_from_cloud.transform_point3a(Vec3A::from(position));
        let delta = camera_position - position;

        Self {
            key: bytemuck::cast(delta.length_squared()),
            index: index as u32,
        }
    }
}


/// instanced draw order, one quad per entry of `indexes[..render_count]`
#[derive(Component, Clone, Debug, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SplatInstances {
    pub indexes: Vec<u32>,
    pub render_count: u32,

    /// cloud the order was computed for
    pub source: Option<AssetId<SplatCloud>>,

    /// world-space camera position of the last sort
    pub sort_origin: Option<Vec3>,
}

impl SplatInstances {
    pub fn update_indexes(&mut self, indexes: &[u32], render_count: u32) {
        self.indexes.clear();
        self.indexes.extend_from_slice(indexes);
        self.render_count = render_count.min(indexes.len() as u32);
    }
}


#[derive(Default)]
pub struct SortPlugin;

impl Plugin for SortPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SortMode>();
        app.register_type::<SplatInstances>();

        app.add_systems(Update, sort_splats);
    }
}


#[allow(clippy::type_complexity)]
pub fn sort_splats(
    asset_server: Res<AssetServer>,
    splat_clouds: Res<Assets<SplatCloud>>,
    mut cloud_events: EventReader<AssetEvent<SplatCloud>>,
    mut clouds: Query<(
        Entity,
        &SplatCloudHandle,
        &SplatMeshSettings,
        Ref<GlobalTransform>,
        &mut SplatInstances,
    )>,
    cameras: Query<(
        &Camera,
        &GlobalTransform,
    )>,
) {
    let modified = modified_clouds(&mut cloud_events);

    let Some(camera_position) = cameras.iter()
        .find(|(camera, _)| camera.is_active)
        .map(|(_, transform)| transform.translation())
    else {
        return;
    };

    for (
        entity,
        cloud_handle,
        settings,
        transform,
        mut instances,
    ) in clouds.iter_mut() {
        if let Some(LoadState::Loading) = asset_server.get_load_state(cloud_handle.handle()) {
            continue;
        }

        let Some(cloud) = splat_clouds.get(cloud_handle.handle()) else {
            continue;
        };

        let source = cloud_handle.handle().id();
        let stale = instances.source != Some(source)
            || instances.indexes.len() != cloud.len()
            || modified.contains(&source);

        let view_changed = settings.sort_mode != SortMode::None
            && (transform.is_changed() || instances.sort_origin != Some(camera_position));

        if !stale && !view_changed {
            continue;
        }

        let world_from_cloud = transform.affine();
        let sort_origin = Vec3A::from(camera_position);

        let indexes: Vec<u32> = match settings.sort_mode {
            SortMode::None => (0..cloud.len() as u32).collect(),

            #[cfg(feature = "sort_rayon")]
            SortMode::Rayon => rayon::par_sort_by_distance(cloud.positions(), &world_from_cloud, sort_origin),

            #[cfg(feature = "sort_std")]
            SortMode::Std => std_sort::sort_by_distance(cloud.positions(), &world_from_cloud, sort_origin),
        };

        instances.update_indexes(&indexes, cloud.len() as u32);
        instances.source = Some(source);
        instances.sort_origin = Some(camera_position);

        debug!(
            ?entity,
            splat_count = cloud.len(),
            sort_mode = ?settings.sort_mode,
            "sorted splat instances"
        );
    }
}

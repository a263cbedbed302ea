use bevy::math::{
    Affine3A,
    Vec3A,
};

use crate::{
    sort::SortEntry,
    splat::f32::Position,
};


/// splat indices ordered nearest-first to the world-space `camera_position`
pub fn sort_by_distance(
    positions: &[Position],
    world_from_cloud: &Affine3A,
    camera_position: Vec3A,
) -> Vec<u32> {
    let mut sorted: Vec<SortEntry> = positions.iter()
        .enumerate()
        .map(|(idx, position)| SortEntry::new(idx, *position, world_from_cloud, camera_position))
        .collect();

    sorted.sort_by_key(|entry| entry.key);

    sorted.into_iter()
        .map(|entry| entry.index)
        .collect()
}

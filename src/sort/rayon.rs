use bevy::math::{
    Affine3A,
    Vec3A,
};

use rayon::prelude::*;

use crate::{
    sort::SortEntry,
    splat::f32::Position,
};


pub fn par_sort_by_distance(
    positions: &[Position],
    world_from_cloud: &Affine3A,
    camera_position: Vec3A,
) -> Vec<u32> {
    let mut sorted: Vec<SortEntry> = positions.par_iter()
        .enumerate()
        .map(|(idx, position)| SortEntry::new(idx, *position, world_from_cloud, camera_position))
        .collect();

    sorted.par_sort_by_key(|entry| entry.key);

    sorted.into_par_iter()
        .map(|entry| entry.index)
        .collect()
}

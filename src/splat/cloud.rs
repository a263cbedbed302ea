use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    render::projection::SplatDrawParameters,
    sort::SplatInstances,
    splat::{
        SplatBuffer,
        covariance::compute_covariance_3d,
        settings::SplatMeshSettings,
        f32::{
            Position,
            Rgba,
            Rotation,
            Scale,
        },
    },
};


#[derive(
    Clone,
    Debug,
    Default,
    Copy,
    PartialEq,
    Reflect,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct Splat {
    pub position: Position,
    pub color: Rgba,
    pub rotation: Rotation,
    pub scale: Scale,
}


/// planar splat store, covariances are derived once on construction
#[derive(
    Asset,
    Clone,
    Debug,
    Default,
    PartialEq,
    Reflect,
)]
pub struct SplatCloud {
    positions: Vec<Position>,
    colors: Vec<Rgba>,
    rotations: Vec<Rotation>,
    scales: Vec<Scale>,
    covariances: Vec<f32>,
}

impl SplatCloud {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn splat(&self, index: usize) -> Splat {
        Splat {
            position: self.positions[index],
            color: self.colors[index],
            rotation: self.rotations[index],
            scale: self.scales[index],
        }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn test_model() -> Self {
        let mut splats = Vec::new();

        for x in -2..=2 {
            for y in -2..=2 {
                let hue = ((x + 2) * 5 + (y + 2)) as f32 / 25.0;

                splats.push(Splat {
                    position: [x as f32, y as f32, 0.0],
                    color: Color::hsl(hue * 360.0, 0.8, 0.5)
                        .to_srgba()
                        .to_u8_array()
                        .into(),
                    rotation: Quat::from_rotation_z(hue * std::f32::consts::PI).into(),
                    scale: [0.25, 0.1, 0.05].into(),
                });
            }
        }

        splats.into()
    }
}

impl From<Vec<Splat>> for SplatCloud {
    fn from(splats: Vec<Splat>) -> Self {
        let mut cloud = SplatCloud {
            positions: Vec::with_capacity(splats.len()),
            colors: Vec::with_capacity(splats.len()),
            rotations: Vec::with_capacity(splats.len()),
            scales: Vec::with_capacity(splats.len()),
            covariances: Vec::with_capacity(splats.len() * 6),
        };

        for splat in splats {
            let covariance = compute_covariance_3d(
                splat.rotation.quat(),
                Vec3::from(splat.scale.scale),
            );

            cloud.positions.push(splat.position);
            cloud.colors.push(splat.color);
            cloud.rotations.push(splat.rotation);
            cloud.scales.push(splat.scale);
            cloud.covariances.extend_from_slice(&covariance.upper);
        }

        cloud
    }
}

impl FromIterator<Splat> for SplatCloud {
    fn from_iter<I: IntoIterator<Item = Splat>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<Splat>>().into()
    }
}

impl SplatBuffer for SplatCloud {
    fn splat_count(&self) -> usize {
        self.len()
    }

    fn fill_positions(&self, out: &mut [f32]) {
        out.iter_mut()
            .zip(self.positions.iter().flatten())
            .for_each(|(out, position)| *out = *position);
    }

    fn fill_colors(&self, out: &mut [u8]) {
        out.iter_mut()
            .zip(self.colors.iter().flat_map(|color| color.rgba))
            .for_each(|(out, channel)| *out = channel);
    }

    fn precomputed_covariances(&self) -> &[f32] {
        &self.covariances
    }

    fn position(&self, index: usize) -> Vec3 {
        Vec3::from(self.positions[index])
    }

    fn rotation(&self, index: usize) -> Quat {
        self.rotations[index].quat()
    }

    fn scale(&self, index: usize) -> Vec3 {
        Vec3::from(self.scales[index].scale)
    }
}


#[derive(Component, Clone, Debug, Default, PartialEq, Reflect)]
#[reflect(Component)]
#[require(SplatMeshSettings, SplatDrawParameters, SplatInstances, Transform)]
pub struct SplatCloudHandle(pub Handle<SplatCloud>);

impl From<Handle<SplatCloud>> for SplatCloudHandle {
    fn from(handle: Handle<SplatCloud>) -> Self {
        Self(handle)
    }
}

impl SplatCloudHandle {
    pub fn handle(&self) -> &Handle<SplatCloud> {
        &self.0
    }
}


/// ids of clouds modified in place since the reader last ran
pub fn modified_clouds(
    events: &mut EventReader<AssetEvent<SplatCloud>>,
) -> Vec<AssetId<SplatCloud>> {
    events.read()
        .filter_map(|event| match event {
            AssetEvent::Modified { id } => Some(*id),
            _ => None,
        })
        .collect()
}

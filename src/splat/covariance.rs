use bevy::math::{Mat3, Quat, Vec3};

use crate::splat::f32::Covariance3d;


#[allow(non_snake_case)]
pub fn compute_covariance_3d(rotation: Quat, scale: Vec3) -> Covariance3d {
    let S = Mat3::from_diagonal(scale);
    let R = Mat3::from_quat(rotation.normalize());

    let M = R * S;
    let Sigma = M * M.transpose();

    [
        Sigma.row(0).x,
        Sigma.row(0).y,
        Sigma.row(0).z,
        Sigma.row(1).y,
        Sigma.row(1).z,
        Sigma.row(2).z,
    ]
    .into()
}

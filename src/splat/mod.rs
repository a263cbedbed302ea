use bevy::math::{Quat, Vec3};

pub mod cloud;
pub mod covariance;
pub mod f32;
pub mod rand;
pub mod settings;


/// per-splat attribute accessors consumed by the layout encoder and the raycaster
pub trait SplatBuffer {
    fn splat_count(&self) -> usize;

    /// writes 3 floats per splat
    fn fill_positions(&self, out: &mut [f32]);

    /// writes 4 bytes (RGBA) per splat
    fn fill_colors(&self, out: &mut [u8]);

    /// 6 floats per splat, see [`f32::Covariance3d`]
    fn precomputed_covariances(&self) -> &[f32];

    fn position(&self, index: usize) -> Vec3;
    fn rotation(&self, index: usize) -> Quat;
    fn scale(&self, index: usize) -> Vec3;

    fn is_empty(&self) -> bool {
        self.splat_count() == 0
    }
}

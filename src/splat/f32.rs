use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use serde::{
    Deserialize,
    Serialize,
};


pub type Position = [f32; 3];

#[derive(
    Clone,
    Debug,
    Default,
    Copy,
    PartialEq,
    Eq,
    Reflect,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct Rgba {
    pub rgba: [u8; 4],
}

impl From<[u8; 4]> for Rgba {
    fn from(rgba: [u8; 4]) -> Self {
        Self { rgba }
    }
}


/// quaternion stored as `x, y, z, w`
#[derive(
    Clone,
    Debug,
    Copy,
    PartialEq,
    Reflect,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct Rotation {
    pub rotation: [f32; 4],
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl From<[f32; 4]> for Rotation {
    fn from(rotation: [f32; 4]) -> Self {
        Self { rotation }
    }
}

impl From<Quat> for Rotation {
    fn from(rotation: Quat) -> Self {
        Self {
            rotation: rotation.to_array(),
        }
    }
}

impl Rotation {
    pub fn quat(&self) -> Quat {
        Quat::from_array(self.rotation)
    }
}


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
pub struct Scale {
    pub scale: [f32; 3],
}

impl From<[f32; 3]> for Scale {
    fn from(scale: [f32; 3]) -> Self {
        Self { scale }
    }
}

impl From<Vec3> for Scale {
    fn from(scale: Vec3) -> Self {
        Self {
            scale: scale.to_array(),
        }
    }
}


/// upper triangle of a symmetric 3x3 covariance: M11, M12, M13, M22, M23, M33
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
pub struct Covariance3d {
    pub upper: [f32; 6],
}

impl From<[f32; 6]> for Covariance3d {
    fn from(upper: [f32; 6]) -> Self {
        Self { upper }
    }
}

impl Covariance3d {
    pub fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            upper: [diagonal.x, 0.0, 0.0, diagonal.y, 0.0, diagonal.z],
        }
    }

    pub fn to_mat3(&self) -> Mat3 {
        let [m11, m12, m13, m22, m23, m33] = self.upper;

        Mat3::from_cols(
            Vec3::new(m11, m12, m13),
            Vec3::new(m12, m22, m23),
            Vec3::new(m13, m23, m33),
        )
    }
}

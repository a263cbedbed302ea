use bevy::{
    prelude::*,
    render::render_resource::{
        BlendComponent,
        BlendFactor,
        BlendOperation,
        BlendState,
    },
};

#[cfg(feature = "sort_rayon")]
use rayon::prelude::*;

use crate::splat::{
    SplatBuffer,
    f32::Covariance3d,
};


pub const CULL_BOUND_FACTOR: f32 = 1.2;
pub const COVARIANCE_2D_BIAS: f32 = 0.3;
pub const MAX_SPLAT_SIZE: f32 = 512.0;

/// squared local distance beyond which fragments are discarded
pub const FRAGMENT_CUTOFF: f32 = 4.0;

/// outside the clip volume, the rasterizer drops the whole quad
pub const CULLED_POSITION: Vec4 = Vec4::new(0.0, 0.0, 2.0, 1.0);

/// two triangles covering [-1, 1]², instanced once per splat
pub const QUAD_POSITIONS: [Vec3; 6] = [
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
];

/// front-to-back accumulation: `src * (1 - dst.a) + dst`
pub const SPLAT_BLEND_STATE: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::OneMinusDstAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::OneMinusDstAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};


#[derive(Component, Clone, Copy, Debug, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SplatDrawParameters {
    pub viewport: Vec2,
    pub focal: Vec2,
}

impl Default for SplatDrawParameters {
    fn default() -> Self {
        Self {
            viewport: Vec2::ONE,
            focal: Vec2::ONE,
        }
    }
}

impl SplatDrawParameters {
    pub fn update_draw_parameters(&mut self, viewport: Vec2, focal_length: f32) {
        self.viewport = viewport;
        self.focal = Vec2::splat(focal_length);
    }
}

pub fn focal_length_from_fov(fov_y: f32, viewport_height: f32) -> f32 {
    viewport_height / (2.0 * (fov_y * 0.5).tan())
}


/// closed-form eigen decomposition of a symmetric 2x2 matrix, major axis first
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Eigen2 {
    pub values: [f32; 2],
    pub vectors: [Vec2; 2],
}

pub fn eigen_decompose_2x2(a: f32, b: f32, d: f32) -> Eigen2 {
    let det = a * d - b * b;
    let trace = a + d;
    let trace_over_2 = 0.5 * trace;
    let term = (trace * trace / 4.0 - det).max(0.0).sqrt();

    let values = [
        trace_over_2 + term,
        trace_over_2 - term,
    ];

    let axis_aligned = if a >= d {
        [Vec2::X, Vec2::Y]
    } else {
        [Vec2::Y, Vec2::X]
    };

    let vectors = if b.abs() <= f32::EPSILON * (a.abs() + d.abs()) {
        axis_aligned
    } else {
        match (
            Vec2::new(b, values[0] - a).try_normalize(),
            Vec2::new(b, values[1] - a).try_normalize(),
        ) {
            (Some(major), Some(minor)) => [major, minor],
            _ => axis_aligned,
        }
    };

    Eigen2 { values, vectors }
}

/// ellipse axes scaled by `sqrt(2λ)`, capped at [`MAX_SPLAT_SIZE`]
pub fn basis_vectors(eigen: &Eigen2) -> [Vec2; 2] {
    let extent = |value: f32| (2.0 * value).max(0.0).sqrt().min(MAX_SPLAT_SIZE);

    [
        eigen.vectors[0] * extent(eigen.values[0]),
        eigen.vectors[1] * extent(eigen.values[1]),
    ]
}


/// biased screen-space covariance `(a, b, d)` of `[[a, b], [b, d]]`
#[allow(non_snake_case)]
pub fn project_covariance_2d(
    covariance: &Covariance3d,
    view_center: Vec3,
    view: &Mat4,
    focal: Vec2,
) -> Vec3 {
    let Vrk = covariance.to_mat3();

    let z = view_center.z;
    let z2 = z * z;
    let J = Mat3::from_cols(
        Vec3::new(focal.x / z, 0.0, -(focal.x * view_center.x) / z2),
        Vec3::new(0.0, focal.y / z, -(focal.y * view_center.y) / z2),
        Vec3::ZERO,
    );
    let W = Mat3::from_mat4(*view).transpose();

    let T = W * J;
    let cov2d = T.transpose() * Vrk * T;

    Vec3::new(
        cov2d.x_axis.x + COVARIANCE_2D_BIAS,
        cov2d.x_axis.y,
        cov2d.y_axis.y + COVARIANCE_2D_BIAS,
    )
}


pub fn is_culled(clip_center: Vec4) -> bool {
    let bounds = CULL_BOUND_FACTOR * clip_center.w;

    clip_center.z < -clip_center.w
        || clip_center.x.abs() >= bounds
        || clip_center.y.abs() >= bounds
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectedSplat {
    Culled,
    Visible {
        clip_center: Vec4,
        ndc_center: Vec3,
        basis: [Vec2; 2],
    },
}

impl ProjectedSplat {
    pub fn is_culled(&self) -> bool {
        matches!(self, ProjectedSplat::Culled)
    }
}

pub fn project_splat(
    center: Vec3,
    covariance: &Covariance3d,
    view: &Mat4,
    projection: &Mat4,
    params: &SplatDrawParameters,
) -> ProjectedSplat {
    let view_center = *view * center.extend(1.0);
    let clip_center = *projection * view_center;

    if is_culled(clip_center) {
        return ProjectedSplat::Culled;
    }

    let cov2d = project_covariance_2d(covariance, view_center.truncate(), view, params.focal);
    let eigen = eigen_decompose_2x2(cov2d.x, cov2d.y, cov2d.z);

    ProjectedSplat::Visible {
        clip_center,
        ndc_center: clip_center.truncate() / clip_center.w,
        basis: basis_vectors(&eigen),
    }
}

/// evaluates every splat of the buffer, one independent projection per splat
pub fn project_cloud<B: SplatBuffer + Sync + ?Sized>(
    buffer: &B,
    view: &Mat4,
    projection: &Mat4,
    params: &SplatDrawParameters,
) -> Vec<ProjectedSplat> {
    let covariances = buffer.precomputed_covariances();
    // buffers with missing covariances project those splats as points
    let project = |index: usize| {
        let covariance = covariances.get(index * 6..index * 6 + 6)
            .and_then(|upper| <[f32; 6]>::try_from(upper).ok())
            .map(Covariance3d::from)
            .unwrap_or_default();

        project_splat(buffer.position(index), &covariance, view, projection, params)
    };

    #[cfg(feature = "sort_rayon")]
    let projected: Vec<ProjectedSplat> = (0..buffer.splat_count())
        .into_par_iter()
        .map(project)
        .collect();

    #[cfg(not(feature = "sort_rayon"))]
    let projected: Vec<ProjectedSplat> = (0..buffer.splat_count())
        .map(project)
        .collect();

    projected
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatVertex {
    pub clip_position: Vec4,
    pub local_position: Vec2,
}

pub fn quad_vertex(
    projected: &ProjectedSplat,
    quad_position: Vec3,
    viewport: Vec2,
) -> SplatVertex {
    let local_position = quad_position.truncate() * 2.0;

    match projected {
        ProjectedSplat::Culled => SplatVertex {
            clip_position: CULLED_POSITION,
            local_position,
        },
        ProjectedSplat::Visible { ndc_center, basis, .. } => {
            let ndc_offset = (local_position.x * basis[0] + local_position.y * basis[1]) / viewport * 2.0;

            SplatVertex {
                clip_position: (ndc_center.truncate() + ndc_offset)
                    .extend(ndc_center.z)
                    .extend(1.0),
                local_position,
            }
        }
    }
}

pub fn fragment_alpha(local_position: Vec2, base_alpha: f32) -> Option<f32> {
    let power = -local_position.dot(local_position);
    if power < -FRAGMENT_CUTOFF {
        return None;
    }

    Some(power.exp() * base_alpha)
}

/// premultiplied output of the splat fragment stage
pub fn shade_fragment(local_position: Vec2, color: Vec4) -> Option<Vec4> {
    let alpha = fragment_alpha(local_position, color.w)?;

    Some((color.truncate() * alpha).extend(alpha))
}

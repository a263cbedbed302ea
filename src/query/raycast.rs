use bevy::{
    math::{
        Affine3A,
        InvalidDirectionError,
        Vec3A,
        bounding::{Aabb3d, RayCast3d},
    },
    prelude::*,
    render::camera::CameraProjection,
};
use thiserror::Error;

use crate::{
    render::camera_viewport_size,
    splat::{
        SplatBuffer,
        cloud::{SplatCloud, SplatCloudHandle},
        settings::SplatMeshSettings,
    },
};


#[derive(Debug, Error)]
pub enum RaycastError {
    #[error("unsupported camera projection, rays can only be cast from perspective or orthographic cameras")]
    UnsupportedCamera,

    #[error("invalid ray direction: {0}")]
    InvalidDirection(#[from] InvalidDirectionError),
}


/// read-only view of an externally built bounding-volume tree
pub trait SplatTreeNode: Sized {
    fn bounding_box(&self) -> Aabb3d;

    /// splat indices stored at this node, empty for pure branches
    fn indices(&self) -> &[u32];

    fn children(&self) -> &[Self];
}

#[derive(Clone, Debug)]
pub struct SplatNode {
    pub bounding_box: Aabb3d,
    pub indices: Vec<u32>,
    pub children: Vec<SplatNode>,
}

impl SplatNode {
    pub fn leaf(bounding_box: Aabb3d, indices: Vec<u32>) -> Self {
        Self {
            bounding_box,
            indices,
            children: Vec::new(),
        }
    }

    pub fn branch(bounding_box: Aabb3d, children: Vec<SplatNode>) -> Self {
        Self {
            bounding_box,
            indices: Vec::new(),
            children,
        }
    }
}

impl SplatTreeNode for SplatNode {
    fn bounding_box(&self) -> Aabb3d {
        self.bounding_box
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

#[derive(Component, Clone, Debug, Default)]
pub struct SplatTree {
    pub root: Option<SplatNode>,
}

impl SplatTree {
    pub fn new(root: SplatNode) -> Self {
        Self { root: Some(root) }
    }

    pub fn root(&self) -> Option<&SplatNode> {
        self.root.as_ref()
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct Hit {
    pub origin: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub splat_index: u32,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Raycaster {
    pub ray: Ray3d,
}

impl Raycaster {
    pub fn new(origin: Vec3, direction: Vec3) -> Result<Self, RaycastError> {
        Ok(Self {
            ray: Ray3d::new(origin, Dir3::new(direction)?),
        })
    }

    pub fn from_ray(ray: Ray3d) -> Self {
        Self { ray }
    }

    /// `screen_position` in pixels from the top-left corner of a `screen_dimensions` viewport
    pub fn from_camera_and_screen_position(
        projection: &Projection,
        camera_transform: &GlobalTransform,
        screen_position: Vec2,
        screen_dimensions: Vec2,
    ) -> Result<Self, RaycastError> {
        let ndc = Vec2::new(
            screen_position.x / screen_dimensions.x * 2.0 - 1.0,
            (screen_dimensions.y - screen_position.y) / screen_dimensions.y * 2.0 - 1.0,
        );
        let world_from_view = camera_transform.compute_matrix();

        match projection {
            Projection::Perspective(perspective) => {
                let world_from_clip = world_from_view * perspective.get_clip_from_view().inverse();

                let origin = camera_transform.translation();
                let target = world_from_clip.project_point3(ndc.extend(0.5));

                Self::new(origin, target - origin)
            }
            Projection::Orthographic(orthographic) => {
                let world_from_clip = world_from_view * orthographic.get_clip_from_view().inverse();

                // reversed depth, ndc z = 1 is the near plane
                let origin = world_from_clip.project_point3(ndc.extend(1.0));

                Ok(Self {
                    ray: Ray3d::new(origin, camera_transform.forward()),
                })
            }
            #[allow(unreachable_patterns)]
            _ => Err(RaycastError::UnsupportedCamera),
        }
    }

    pub fn intersect_box(&self, aabb: &Aabb3d) -> Option<f32> {
        RayCast3d::from_ray(self.ray, f32::MAX).aabb_intersection_at(aabb)
    }

    /// closed test: a tangent ray hits. Returns the entry distance, or the exit
    /// distance when the origin is inside the sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
        let to_center = center - self.ray.origin;
        let tca = to_center.dot(*self.ray.direction);
        let d2 = to_center.length_squared() - tca * tca;
        let radius2 = radius * radius;

        if d2 > radius2 {
            return None;
        }

        let thc = (radius2 - d2).sqrt();
        let t0 = tca - thc;
        let t1 = tca + thc;

        if t1 < 0.0 {
            return None;
        }

        let distance = if t0 < 0.0 { t1 } else { t0 };

        Some((distance, self.ray.get_point(distance)))
    }

    /// every splat whose bounding sphere the ray crosses, nearest first
    pub fn intersect_splat_tree<N, B>(
        &self,
        root: Option<&N>,
        splats: &B,
    ) -> Vec<Hit>
    where
        N: SplatTreeNode,
        B: SplatBuffer + ?Sized,
    {
        let mut hits = Vec::new();

        if let Some(root) = root {
            let ray_cast = RayCast3d::from_ray(self.ray, f32::MAX);
            self.cast_ray_at_node(&ray_cast, root, splats, &mut hits);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// the same ray in the local space of a cloud placed by `world_from_cloud`
    pub fn to_local(&self, world_from_cloud: &Affine3A) -> Result<Self, RaycastError> {
        let cloud_from_world = world_from_cloud.inverse();

        Self::new(
            cloud_from_world.transform_point3(self.ray.origin),
            cloud_from_world.transform_vector3(*self.ray.direction),
        )
    }

    /// [`Self::intersect_splat_tree`] against a transformed cloud, hits in world space
    pub fn intersect_transformed_tree<N, B>(
        &self,
        root: Option<&N>,
        splats: &B,
        world_from_cloud: &Affine3A,
    ) -> Result<Vec<Hit>, RaycastError>
    where
        N: SplatTreeNode,
        B: SplatBuffer + ?Sized,
    {
        let local = self.to_local(world_from_cloud)?;
        let world_from_normal = world_from_cloud.matrix3.inverse().transpose();

        // distances along an affinely mapped line keep their order
        Ok(local.intersect_splat_tree(root, splats)
            .into_iter()
            .map(|hit| {
                let origin = world_from_cloud.transform_point3(hit.origin);
                let normal = world_from_normal * Vec3A::from(hit.normal);

                Hit {
                    origin,
                    normal: normal.normalize_or_zero().into(),
                    distance: origin.distance(self.ray.origin),
                    splat_index: hit.splat_index,
                }
            })
            .collect())
    }

    fn cast_ray_at_node<N, B>(
        &self,
        ray_cast: &RayCast3d,
        node: &N,
        splats: &B,
        hits: &mut Vec<Hit>,
    ) where
        N: SplatTreeNode,
        B: SplatBuffer + ?Sized,
    {
        if ray_cast.aabb_intersection_at(&node.bounding_box()).is_none() {
            return;
        }

        let splat_count = splats.splat_count();
        for &splat_index in node.indices() {
            let index = splat_index as usize;
            if index >= splat_count {
                continue;
            }

            let center = splats.position(index);
            let radius = splats.scale(index).max_element();

            if let Some((distance, origin)) = self.intersect_sphere(center, radius) {
                hits.push(Hit {
                    origin,
                    normal: (origin - center).normalize_or_zero(),
                    distance,
                    splat_index,
                });
            }
        }

        for child in node.children() {
            self.cast_ray_at_node(ray_cast, child, splats, hits);
        }
    }
}

pub fn intersect<B: SplatBuffer + ?Sized>(
    tree: &SplatTree,
    splats: &B,
    raycaster: &Raycaster,
) -> Vec<Hit> {
    raycaster.intersect_splat_tree(tree.root(), splats)
}

pub fn ray_from_screen(
    projection: &Projection,
    camera_transform: &GlobalTransform,
    screen_position: Vec2,
    screen_dimensions: Vec2,
) -> Result<Raycaster, RaycastError> {
    Raycaster::from_camera_and_screen_position(
        projection,
        camera_transform,
        screen_position,
        screen_dimensions,
    )
}


/// pixel to cast from on the next update, consumed by [`raycast_splat_trees`]
#[derive(Resource, Clone, Debug, Default)]
pub struct SplatRaycastRequest {
    pub screen_position: Option<Vec2>,
}

#[derive(Component, Clone, Debug, Default)]
pub struct SplatHits {
    pub hits: Vec<Hit>,
}


#[derive(Default)]
pub struct RaycastSelectionPlugin;

impl Plugin for RaycastSelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SplatRaycastRequest>();
        app.register_type::<Hit>();

        app.add_systems(Update, raycast_splat_trees);
    }
}

#[allow(clippy::type_complexity)]
pub fn raycast_splat_trees(
    mut commands: Commands,
    mut request: ResMut<SplatRaycastRequest>,
    splat_clouds: Res<Assets<SplatCloud>>,
    trees: Query<(
        Entity,
        &SplatTree,
        &SplatCloudHandle,
        &SplatMeshSettings,
        &GlobalTransform,
    )>,
    cameras: Query<(
        &Camera,
        &Projection,
        &GlobalTransform,
    )>,
) {
    let Some(screen_position) = request.screen_position.take() else {
        return;
    };

    let Some((camera, projection, camera_transform)) = cameras.iter()
        .find(|(camera, ..)| camera.is_active)
    else {
        debug!("no active camera for splat raycast");
        return;
    };

    let Some(viewport) = camera_viewport_size(camera) else {
        debug!("camera viewport unknown, splat raycast dropped");
        return;
    };

    let raycaster = match Raycaster::from_camera_and_screen_position(
        projection,
        camera_transform,
        screen_position,
        viewport,
    ) {
        Ok(raycaster) => raycaster,
        Err(err) => {
            warn!(%err, "splat raycast skipped");
            return;
        }
    };

    for (
        entity,
        tree,
        cloud_handle,
        settings,
        transform,
    ) in trees.iter() {
        if !settings.raycast {
            continue;
        }

        let Some(cloud) = splat_clouds.get(cloud_handle.handle()) else {
            continue;
        };

        let hits = match raycaster.intersect_transformed_tree(tree.root(), cloud, &transform.affine()) {
            Ok(hits) => hits,
            Err(err) => {
                debug!(?entity, %err, "degenerate cloud transform, splat raycast skipped");
                continue;
            }
        };
        debug!(?entity, hit_count = hits.len(), "splat raycast");

        commands.entity(entity).insert(SplatHits { hits });
    }
}

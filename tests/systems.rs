use std::any::TypeId;

use bevy::{
    math::bounding::Aabb3d,
    prelude::*,
    render::camera::Viewport,
};

use bevy_splat_mesh::{
    Splat,
    SplatCloud,
    SplatCloudHandle,
    SplatDrawParameters,
    SplatInstances,
    SplatMeshSettings,
    SortMode,
    query::raycast::{
        SplatHits,
        SplatNode,
        SplatRaycastRequest,
        SplatTree,
    },
    render::{
        projection::focal_length_from_fov,
        texture::SplatTextures,
    },
};

use _harness::test_harness_app;



fn cloud_at(positions: &[Vec3]) -> SplatCloud {
    positions.iter()
        .map(|position| Splat {
            position: position.to_array(),
            scale: [1.0, 1.0, 1.0].into(),
            ..default()
        })
        .collect()
}

fn add_cloud(app: &mut App, cloud: SplatCloud) -> Handle<SplatCloud> {
    app.world_mut()
        .resource_mut::<Assets<SplatCloud>>()
        .add(cloud)
}

fn spawn_camera(app: &mut App, position: Vec3) -> Entity {
    app.world_mut()
        .spawn((
            Camera {
                viewport: Some(Viewport {
                    physical_size: UVec2::new(800, 600),
                    ..default()
                }),
                ..default()
            },
            Projection::Perspective(PerspectiveProjection::default()),
            GlobalTransform::from_translation(position),
        ))
        .id()
}

fn textures(app: &App, entity: Entity) -> SplatTextures {
    app.world()
        .get::<SplatTextures>(entity)
        .expect("textures should be queued")
        .clone()
}

fn instances(app: &App, entity: Entity) -> SplatInstances {
    app.world()
        .get::<SplatInstances>(entity)
        .expect("instances are required by the cloud handle")
        .clone()
}


#[test]
fn plugin_registers_resources_and_types() {
    let app = test_harness_app();

    assert!(app.world().contains_resource::<SplatRaycastRequest>());
    assert!(app.world().contains_resource::<Assets<SplatCloud>>());

    let registry = app.world().resource::<AppTypeRegistry>().read();
    assert!(registry.get(TypeId::of::<SplatMeshSettings>()).is_some());
    assert!(registry.get(TypeId::of::<SplatCloudHandle>()).is_some());
    assert!(registry.get(TypeId::of::<SplatInstances>()).is_some());
    assert!(registry.get(TypeId::of::<SplatDrawParameters>()).is_some());
}


#[test]
fn textures_are_built_once_for_an_unchanged_cloud() {
    let mut app = test_harness_app();
    let handle = add_cloud(&mut app, cloud_at(&[Vec3::X]));
    let entity = app.world_mut().spawn(SplatCloudHandle(handle.clone())).id();

    app.update();
    let first = textures(&app, entity);
    assert_eq!(first.source, handle.id());
    assert_eq!(first.splat_count, 1);

    app.update();
    app.update();
    assert_eq!(textures(&app, entity).covariances, first.covariances);
}

#[test]
fn textures_follow_a_swapped_cloud_of_equal_size() {
    let mut app = test_harness_app();
    let first_handle = add_cloud(&mut app, cloud_at(&[Vec3::X]));
    let second_handle = add_cloud(&mut app, cloud_at(&[Vec3::new(7.0, 0.0, 0.0)]));
    let entity = app.world_mut().spawn(SplatCloudHandle(first_handle)).id();

    app.update();
    let first = textures(&app, entity);

    app.world_mut().entity_mut(entity).insert(SplatCloudHandle(second_handle.clone()));
    app.update();

    let second = textures(&app, entity);
    assert_eq!(second.source, second_handle.id());
    assert_eq!(second.splat_count, 1);
    assert_ne!(second.center_colors, first.center_colors);

    let images = app.world().resource::<Assets<Image>>();
    assert!(images.get(&first.center_colors).is_none());
    assert!(images.get(&second.center_colors).is_some());
}

#[test]
fn textures_follow_in_place_edits() {
    let mut app = test_harness_app();
    let handle = add_cloud(&mut app, cloud_at(&[Vec3::X]));
    let entity = app.world_mut().spawn(SplatCloudHandle(handle.clone())).id();

    app.update();
    let first = textures(&app, entity);

    {
        let mut clouds = app.world_mut().resource_mut::<Assets<SplatCloud>>();
        let cloud = clouds.get_mut(&handle).expect("cloud was added");
        *cloud = cloud_at(&[Vec3::new(7.0, 0.0, 0.0)]);
    }
    app.update();
    app.update();

    let edited = textures(&app, entity);
    assert_ne!(edited.center_colors, first.center_colors);

    {
        let mut clouds = app.world_mut().resource_mut::<Assets<SplatCloud>>();
        let cloud = clouds.get_mut(&handle).expect("cloud was added");
        *cloud = cloud_at(&[Vec3::X, Vec3::Y, Vec3::Z]);
    }
    app.update();
    app.update();

    assert_eq!(textures(&app, entity).splat_count, 3);
}


#[test]
fn sort_follows_camera_and_cloud_transform() {
    let mut app = test_harness_app();
    let camera = spawn_camera(&mut app, Vec3::new(0.0, 0.0, 5.0));

    let handle = add_cloud(&mut app, cloud_at(&[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]));
    let entity = app.world_mut().spawn(SplatCloudHandle(handle.clone())).id();

    app.update();
    assert_ne!(
        app.world().get::<SplatMeshSettings>(entity).map(|settings| settings.sort_mode),
        Some(SortMode::None),
    );

    let sorted = instances(&app, entity);
    assert_eq!(sorted.indexes, vec![0, 1]);
    assert_eq!(sorted.render_count, 2);
    assert_eq!(sorted.source, Some(handle.id()));
    assert_eq!(sorted.sort_origin, Some(Vec3::new(0.0, 0.0, 5.0)));

    // shifting the cloud puts the second splat under the camera
    app.world_mut()
        .entity_mut(entity)
        .insert(GlobalTransform::from_translation(Vec3::new(-10.0, 0.0, 0.0)));
    app.update();
    assert_eq!(instances(&app, entity).indexes, vec![1, 0]);

    app.world_mut()
        .entity_mut(camera)
        .insert(GlobalTransform::from_translation(Vec3::new(-10.0, 0.0, 5.0)));
    app.update();
    assert_eq!(instances(&app, entity).indexes, vec![0, 1]);
}

#[test]
fn sort_is_kept_while_nothing_moves() {
    let mut app = test_harness_app();
    spawn_camera(&mut app, Vec3::new(0.0, 0.0, 5.0));

    let handle = add_cloud(&mut app, cloud_at(&[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]));
    let entity = app.world_mut().spawn(SplatCloudHandle(handle)).id();

    app.update();
    assert_eq!(instances(&app, entity).indexes, vec![0, 1]);

    // a stale-looking order survives as long as camera, cloud and transform are unchanged
    app.world_mut()
        .get_mut::<SplatInstances>(entity)
        .expect("instances are required by the cloud handle")
        .indexes = vec![1, 0];
    app.update();
    assert_eq!(instances(&app, entity).indexes, vec![1, 0]);

    let swapped = add_cloud(&mut app, cloud_at(&[Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO]));
    app.world_mut().entity_mut(entity).insert(SplatCloudHandle(swapped.clone()));
    app.update();

    let sorted = instances(&app, entity);
    assert_eq!(sorted.indexes, vec![1, 0]);
    assert_eq!(sorted.source, Some(swapped.id()));
}


fn spawn_tree(app: &mut App, raycast: bool) -> Entity {
    let handle = add_cloud(app, cloud_at(&[Vec3::ZERO]));

    app.world_mut()
        .spawn((
            SplatCloudHandle(handle),
            SplatMeshSettings {
                raycast,
                ..default()
            },
            SplatTree::new(SplatNode::leaf(
                Aabb3d::new(Vec3::new(0.5, 0.5, 0.0), Vec3::splat(2.0)),
                vec![0],
            )),
            GlobalTransform::from_translation(Vec3::new(100.0, 0.0, 0.0)),
        ))
        .id()
}

fn request_raycast(app: &mut App, screen_position: Vec2) {
    app.world_mut()
        .resource_mut::<SplatRaycastRequest>()
        .screen_position = Some(screen_position);
}

#[test]
fn raycast_request_hits_transformed_cloud() {
    let mut app = test_harness_app();
    spawn_camera(&mut app, Vec3::new(100.0, 0.0, 5.0));
    let entity = spawn_tree(&mut app, true);

    app.update();
    assert!(app.world().get::<SplatHits>(entity).is_none());

    request_raycast(&mut app, Vec2::new(400.0, 300.0));
    app.update();

    assert!(app.world().resource::<SplatRaycastRequest>().screen_position.is_none());

    let hits = &app.world()
        .get::<SplatHits>(entity)
        .expect("hits should be inserted")
        .hits;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].splat_index, 0);
    assert!((hits[0].distance - 4.0).abs() < 1e-3);
    assert!((hits[0].origin - Vec3::new(100.0, 0.0, 1.0)).length() < 1e-3);
}

#[test]
fn raycast_skips_disabled_clouds() {
    let mut app = test_harness_app();
    spawn_camera(&mut app, Vec3::new(100.0, 0.0, 5.0));
    let entity = spawn_tree(&mut app, false);

    request_raycast(&mut app, Vec2::new(400.0, 300.0));
    app.update();

    assert!(app.world().resource::<SplatRaycastRequest>().screen_position.is_none());
    assert!(app.world().get::<SplatHits>(entity).is_none());
}

#[test]
fn raycast_without_active_camera_is_dropped() {
    let mut app = test_harness_app();
    let camera = spawn_camera(&mut app, Vec3::new(100.0, 0.0, 5.0));
    app.world_mut()
        .get_mut::<Camera>(camera)
        .expect("camera was spawned")
        .is_active = false;
    let entity = spawn_tree(&mut app, true);

    request_raycast(&mut app, Vec2::new(400.0, 300.0));
    app.update();

    assert!(app.world().resource::<SplatRaycastRequest>().screen_position.is_none());
    assert!(app.world().get::<SplatHits>(entity).is_none());
}


#[test]
fn draw_parameters_skip_empty_clouds() {
    let mut app = test_harness_app();
    spawn_camera(&mut app, Vec3::new(0.0, 0.0, 5.0));

    let filled = add_cloud(&mut app, cloud_at(&[Vec3::ZERO]));
    let empty = add_cloud(&mut app, SplatCloud::default());

    let filled = app.world_mut().spawn(SplatCloudHandle(filled)).id();
    let empty = app.world_mut().spawn(SplatCloudHandle(empty)).id();

    app.update();

    let focal = focal_length_from_fov(PerspectiveProjection::default().fov, 600.0);

    let params = app.world().get::<SplatDrawParameters>(filled).expect("required component");
    assert_eq!(params.viewport, Vec2::new(800.0, 600.0));
    assert_eq!(params.focal, Vec2::splat(focal));

    let params = app.world().get::<SplatDrawParameters>(empty).expect("required component");
    assert_eq!(*params, SplatDrawParameters::default());
}

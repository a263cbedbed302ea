use bevy::prelude::*;

#[cfg(feature = "query_raycast")]
pub mod raycast;


#[derive(Default)]
pub struct QueryPlugin;

impl Plugin for QueryPlugin {
    #[allow(unused)]
    fn build(&self, app: &mut App) {
        #[cfg(feature = "query_raycast")]
        app.add_plugins(raycast::RaycastSelectionPlugin);
    }
}

/// Per-frame render context: the camera and the actors to draw.
///
/// Built by the application every frame and handed to `Graph::execute()`;
/// the borrow ends with the call, so no pass can hold on to it.

use std::sync::Arc;
use glam::{Mat4, Vec3};

/// Camera matrices for the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World → view
    pub view: Mat4,
    /// View → clip
    pub projection: Mat4,
    /// World-space eye position
    pub position: Vec3,
}

impl Camera {
    /// Right-handed perspective camera looking at `target`
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(position, target, up),
            projection: Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            position,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// Something in the world a pass may draw
pub trait Renderable: Send + Sync {
    fn name(&self) -> &str;

    fn world_matrix(&self) -> Mat4;

    fn is_visible(&self) -> bool {
        true
    }
}

pub struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub actors: &'a [Arc<dyn Renderable>],
}

impl<'a> RenderContext<'a> {
    pub fn new(camera: &'a Camera, actors: &'a [Arc<dyn Renderable>]) -> Self {
        Self { camera, actors }
    }

    /// Actors that want to be drawn this frame
    pub fn visible_actors(&self) -> impl Iterator<Item = &Arc<dyn Renderable>> {
        self.actors.iter().filter(|a| a.is_visible())
    }

    /// True when there is nothing to draw (passes early-out on this)
    pub fn is_empty(&self) -> bool {
        self.visible_actors().next().is_none()
    }
}

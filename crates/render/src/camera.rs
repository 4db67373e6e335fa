use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// How the camera maps view space to clip space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Clip space equals view space.
    Identity,
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half the visible height in world units.
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

/// Where the camera sits and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    /// World space equals view space.
    Identity,
    LookAt { eye: Vec3, target: Vec3, up: Vec3 },
}

/// Camera with a view placement and a projection.
/// Camera state lives outside the scene graph and is read-only to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub view: View,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(75.0, 16.0 / 9.0, 0.1, 1000.0).looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl Camera {
    /// Identity view and projection: NDC equals world coordinates.
    pub fn identity() -> Self {
        Self {
            view: View::Identity,
            projection: Projection::Identity,
        }
    }

    /// Perspective camera at the origin looking down -Z.
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: View::Identity,
            projection: Projection::Perspective {
                fov_y: fov_degrees.to_radians(),
                aspect,
                near,
                far,
            },
        }
    }

    pub fn orthographic(half_height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: View::Identity,
            projection: Projection::Orthographic {
                half_height,
                aspect,
                near,
                far,
            },
        }
    }

    /// Place the camera at `eye` looking at `target` with +Y up.
    pub fn looking_at(mut self, eye: Vec3, target: Vec3) -> Self {
        self.view = View::LookAt {
            eye,
            target,
            up: Vec3::Y,
        };
        self
    }

    /// Move the camera onto a horizontal circle around `center`.
    pub fn orbit(&mut self, center: Vec3, radius: f32, height: f32, angle: f32) {
        let eye = center + Vec3::new(radius * angle.sin(), height, radius * angle.cos());
        self.view = View::LookAt {
            eye,
            target: center,
            up: Vec3::Y,
        };
    }

    /// Keep the projection's aspect ratio in sync with a resized surface.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        match &mut self.projection {
            Projection::Identity => {}
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                *aspect = new_aspect;
            }
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self.view {
            View::Identity => Mat4::IDENTITY,
            View::LookAt { eye, target, up } => Mat4::look_at_rh(eye, target, up),
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Identity => Mat4::IDENTITY,
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            Projection::Orthographic {
                half_height,
                aspect,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh_gl(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world-space point to normalized device coordinates.
    pub fn project(&self, world: Vec3) -> Vec3 {
        self.view_projection().project_point3(world)
    }
}

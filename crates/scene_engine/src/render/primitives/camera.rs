//! # 3D Camera and Frustum
//!
//! Provides the camera the update pipeline culls against and the render
//! passes project with.
//!
//! ## Design Principles
//! - **Snapshot per frame**: [`Camera::snapshot`] extracts the view-projection
//!   and frustum planes once, so the cull phase can share them read-only
//!   across worker threads
//! - **Z-up world**: terrain lies in XY, heights along +Z

use crate::foundation::math::{utils, Mat4, Point3, Vec3};

/// Read-only camera state consumed by culling and rendering
pub trait CameraView: Send + Sync {
    /// Whether an axis-aligned box intersects the view frustum
    fn is_box_visible(&self, min: &Vec3, max: &Vec3) -> bool;

    /// Combined view-projection matrix
    fn view_projection(&self) -> Mat4;

    /// Transposed view-projection, as uploaded to row-major shader constants
    fn view_projection_transposed(&self) -> Mat4 {
        self.view_projection().transpose()
    }
}

/// A plane in 3D space (`a*x + b*y + c*z + d = 0`)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plane {
    /// Normal X component
    pub a: f32,
    /// Normal Y component
    pub b: f32,
    /// Normal Z component
    pub c: f32,
    /// Distance from origin
    pub d: f32,
}

impl Plane {
    /// Creates a new plane
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Normalizes the plane
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self::new(self.a / len, self.b / len, self.c / len, self.d / len)
        } else {
            self
        }
    }

    /// Signed distance from a point to the plane
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.a * point.x + self.b * point.y + self.c * point.z + self.d
    }
}

/// View frustum planes, normals pointing inward
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix with `[-w, w]` clip depth
    #[must_use]
    pub fn from_view_projection(m: &Mat4) -> Self {
        let row = |r: usize| [m[(r, 0)], m[(r, 1)], m[(r, 2)], m[(r, 3)]];
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let combine = |sign: f32, other: [f32; 4]| {
            Plane::new(
                r3[0] + sign * other[0],
                r3[1] + sign * other[1],
                r3[2] + sign * other[2],
                r3[3] + sign * other[3],
            )
            .normalized()
        };

        Self {
            planes: [
                combine(1.0, r0),
                combine(-1.0, r0),
                combine(1.0, r1),
                combine(-1.0, r1),
                combine(1.0, r2),
                combine(-1.0, r2),
            ],
        }
    }

    /// Box test against the corner furthest along each plane normal
    #[must_use]
    pub fn is_box_visible(&self, min: &Vec3, max: &Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let corner = Vec3::new(
                if plane.a >= 0.0 { max.x } else { min.x },
                if plane.b >= 0.0 { max.y } else { min.y },
                if plane.c >= 0.0 { max.z } else { min.z },
            );
            plane.distance_to_point(&corner) >= 0.0
        })
    }
}

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at in world space
    pub target: Vec3,
    /// Up vector (typically +Z)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Distance to near clipping plane
    pub near: f32,
    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera looking at the origin with +Z up
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::z(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// Perspective projection
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Freeze the current view into a shareable snapshot
    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot::from_view_projection(self.projection_matrix() * self.view_matrix())
    }
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self::perspective(Vec3::new(0.0, -1000.0, 1000.0), 45.0, 16.0 / 9.0, 10.0, 20000.0);
        camera.look_at(Vec3::zeros());
        camera
    }
}

/// Camera state captured for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    view_projection: Mat4,
    frustum: Frustum,
}

impl CameraSnapshot {
    /// Snapshot from an explicit view-projection matrix
    pub fn from_view_projection(view_projection: Mat4) -> Self {
        Self {
            view_projection,
            frustum: Frustum::from_view_projection(&view_projection),
        }
    }

    /// Extracted frustum planes
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

impl CameraView for CameraSnapshot {
    fn is_box_visible(&self, min: &Vec3, max: &Vec3) -> bool {
        self.frustum.is_box_visible(min, max)
    }

    fn view_projection(&self) -> Mat4 {
        self.view_projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn looking_down_y() -> CameraSnapshot {
        let mut camera = Camera::perspective(Vec3::new(0.0, -10.0, 0.0), 60.0, 1.0, 0.1, 100.0);
        camera.look_at(Vec3::zeros());
        camera.snapshot()
    }

    #[test]
    fn test_box_in_front_is_visible() {
        let view = looking_down_y();
        assert!(view.is_box_visible(&Vec3::new(-1.0, -1.0, -1.0), &Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_box_behind_camera_is_culled() {
        let view = looking_down_y();
        assert!(!view.is_box_visible(&Vec3::new(-1.0, -31.0, -1.0), &Vec3::new(1.0, -29.0, 1.0)));
    }

    #[test]
    fn test_box_beyond_far_plane_is_culled() {
        let view = looking_down_y();
        assert!(!view.is_box_visible(&Vec3::new(-1.0, 200.0, -1.0), &Vec3::new(1.0, 210.0, 1.0)));
    }

    #[test]
    fn test_box_off_to_the_side_is_culled() {
        let view = looking_down_y();
        assert!(!view.is_box_visible(&Vec3::new(50.0, -1.0, -1.0), &Vec3::new(52.0, 1.0, 1.0)));
    }

    #[test]
    fn test_box_straddling_plane_is_visible() {
        let view = looking_down_y();
        // Extends from behind the camera to well in front
        assert!(view.is_box_visible(&Vec3::new(-1.0, -20.0, -1.0), &Vec3::new(1.0, 20.0, 1.0)));
    }

    #[test]
    fn test_plane_normalization() {
        let plane = Plane::new(0.0, 3.0, 4.0, 10.0).normalized();
        assert_relative_eq!(plane.b, 0.6);
        assert_relative_eq!(plane.c, 0.8);
        assert_relative_eq!(plane.d, 2.0);
        assert_relative_eq!(plane.distance_to_point(&Vec3::new(0.0, 0.0, 0.0)), 2.0);
    }

    #[test]
    fn test_transposed_view_projection() {
        let view = looking_down_y();
        assert_relative_eq!(view.view_projection_transposed(), view.view_projection().transpose());
    }
}

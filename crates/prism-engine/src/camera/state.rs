use glam::{Mat4, Vec3};

/// Projection parameters. Angles are in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_deg: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y_deg,
            aspect,
            near,
            far,
        }
    }

    /// Symmetric orthographic volume spanning `[-aspect, aspect] x [-1, 1]`.
    pub fn orthographic(aspect: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic {
            left: -aspect,
            right: aspect,
            bottom: -1.0,
            top: 1.0,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_deg,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_deg.to_radians(), aspect.max(f32::EPSILON), near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }
}

/// A camera looking at the world origin.
///
/// The view matrix is always derived from `position` and `up`; call
/// [`update_view_matrix`](Self::update_view_matrix) after changing either.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub up: Vec3,

    distance: f32,
    projection: Projection,

    view: Mat4,
    view_inverse: Mat4,
    proj: Mat4,
    proj_inverse: Mat4,
}

impl Camera {
    /// `distance` is fixed to the length of `position`; orbiting keeps it.
    pub fn new(projection: Projection, position: Vec3) -> Self {
        let mut camera = Self {
            position,
            up: Vec3::Y,
            distance: position.length(),
            projection,
            view: Mat4::IDENTITY,
            view_inverse: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            proj_inverse: Mat4::IDENTITY,
        };
        camera.update_view_matrix();
        camera.update_projection_matrix();
        camera
    }

    pub fn perspective(fov_y_deg: f32, aspect: f32, near: f32, far: f32, position: Vec3) -> Self {
        Self::new(Projection::perspective(fov_y_deg, aspect, near, far), position)
    }

    pub fn update_view_matrix(&mut self) {
        self.view = Mat4::look_at_rh(self.position, Vec3::ZERO, self.up);
        self.view_inverse = self.view.inverse();
    }

    pub fn update_projection_matrix(&mut self) {
        self.proj = self.projection.matrix();
        self.proj_inverse = self.proj.inverse();
    }

    /// Follows a surface resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        match &mut self.projection {
            Projection::Perspective { aspect: a, .. } => *a = aspect,
            Projection::Orthographic { left, right, .. } => {
                *left = -aspect;
                *right = aspect;
            }
        }
        self.update_projection_matrix();
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update_projection_matrix();
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Distance from the origin at zoom 1.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn view_matrix_inverse(&self) -> Mat4 {
        self.view_inverse
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    pub fn projection_matrix_inverse(&self) -> Mat4 {
        self.proj_inverse
    }

    /// Transforms view-space normals: transpose of the inverse view matrix.
    pub fn normal_matrix(&self) -> Mat4 {
        self.view_inverse.transpose()
    }
}

use crate::error::ProgramError;

use super::mesh::Mesh;
use super::program::{DrawCall, Program, ProgramDesc};
use super::RenderCtx;

/// Plane dimensions in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneParams {
    pub width: f32,
    pub height: f32,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

const INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

/// A quad in the XY plane facing +Z, centered at the origin.
///
/// Vertex inputs: `position` (vec3), `normal` (vec3), `uv` (vec2).
pub struct Plane {
    program: Program,
}

impl Plane {
    pub fn new(
        ctx: &RenderCtx<'_>,
        vertex_source: &str,
        fragment_source: &str,
        params: PlaneParams,
    ) -> Result<Self, ProgramError> {
        let desc = Self::describe(vertex_source, fragment_source, params);
        Ok(Self {
            program: Program::new(ctx, desc)?,
        })
    }

    pub(crate) fn describe<'a>(
        vertex_source: &'a str,
        fragment_source: &'a str,
        params: PlaneParams,
    ) -> ProgramDesc<'a> {
        let (w, h) = (params.width / 2.0, params.height / 2.0);

        #[rustfmt::skip]
        let position: Vec<f32> = vec![
            -w,  h, 0.0,
             w,  h, 0.0,
            -w, -h, 0.0,
             w, -h, 0.0,
        ];
        #[rustfmt::skip]
        let normal: Vec<f32> = vec![
            0.0, 0.0, 1.0,
            0.0, 0.0, 1.0,
            0.0, 0.0, 1.0,
            0.0, 0.0, 1.0,
        ];
        #[rustfmt::skip]
        let uv: Vec<f32> = vec![
            0.0, 1.0,
            1.0, 1.0,
            0.0, 0.0,
            1.0, 0.0,
        ];

        ProgramDesc::new(vertex_source, fragment_source)
            .label("plane")
            .attribute("position", 3, position)
            .attribute("normal", 3, normal)
            .attribute("uv", 2, uv)
            .indices(INDICES)
    }

    pub fn dispose(self) {
        self.program.dispose();
    }
}

impl Mesh for Plane {
    fn program(&self) -> &Program {
        &self.program
    }

    fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    fn draw_call(&self) -> DrawCall {
        DrawCall::Indexed {
            count: INDICES.len() as u32,
        }
    }
}

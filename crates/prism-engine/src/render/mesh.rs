use crate::texture::TextureRegistry;

use super::program::{DrawCall, Program};
use super::{RenderCtx, RenderTarget};

/// A drawable built on a [`Program`]; implementors only choose the draw call.
pub trait Mesh {
    fn program(&self) -> &Program;

    fn program_mut(&mut self) -> &mut Program;

    /// Primitive count and kind issued on every render.
    fn draw_call(&self) -> DrawCall;

    fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        textures: &TextureRegistry,
    ) {
        let draw = self.draw_call();
        self.program_mut().render(ctx, target, textures, draw);
    }
}

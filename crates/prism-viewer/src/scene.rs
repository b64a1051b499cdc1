use anyhow::{Context, Result};
use glam::Vec3;

use prism_engine::camera::{Camera, ControlsConfig, Damping, OrbitControls};
use prism_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use prism_engine::device::{Gpu, SurfaceSize};
use prism_engine::render::{Mesh, Plane, PlaneParams, RenderCtx, UniformType, UniformValue};
use prism_engine::texture::{
    create_source, CubeTexture, DecodedImage, Texture2D, TextureOptions, TextureRegistry,
};

const VERTEX_SHADER: &str = include_str!("shaders/vertex.wgsl");
const FRAGMENT_SHADER: &str = include_str!("shaders/fragment.wgsl");

/// One matcap/environment-mapped plane under an orbit camera.
pub struct Scene {
    images: Vec<DecodedImage>,
    textures: TextureRegistry,
    camera: Camera,
    controls: OrbitControls,
    plane: Option<Plane>,
}

impl Scene {
    /// `images` must contain one image named `matcap`; the rest become cube faces.
    pub fn new(images: Vec<DecodedImage>) -> Self {
        let controls = OrbitControls::new(ControlsConfig {
            damping: Damping::Continuous(0.15),
            ..ControlsConfig::default()
        });

        Self {
            images,
            textures: TextureRegistry::new(),
            camera: Camera::perspective(45.0, 1.0, 0.01, 10.0, Vec3::new(0.0, 0.0, 2.0)),
            controls,
            plane: None,
        }
    }

    fn set_projection_uniforms(&mut self) {
        let Some(plane) = self.plane.as_mut() else {
            return;
        };
        let u = plane.program_mut().uniforms_mut();
        u.set("projectionMatrix", self.camera.projection_matrix());
        u.set("projectionMatrixInverse", self.camera.projection_matrix_inverse());
    }
}

impl App for Scene {
    fn init(&mut self, gpu: &mut Gpu<'_>, window: &WindowCtx<'_>) -> Result<()> {
        let rctx = RenderCtx::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            gpu.depth_format(),
            gpu.size(),
        );

        let images = std::mem::take(&mut self.images);
        let (matcap_images, env_images): (Vec<_>, Vec<_>) =
            images.into_iter().partition(|img| img.name().contains("matcap"));
        let matcap_image = matcap_images
            .first()
            .context("no matcap image among the loaded images")?;

        let matcap = Texture2D::new(&rctx, matcap_image, TextureOptions::default())
            .context("failed to create matcap texture")?;
        let matcap = self.textures.insert(matcap);

        let source = create_source(env_images);
        let env = CubeTexture::new(&rctx, &source, TextureOptions::default())
            .context("failed to create environment cube texture")?;
        let env = self.textures.insert(env);

        let mut plane = Plane::new(
            &rctx,
            VERTEX_SHADER,
            FRAGMENT_SHADER,
            PlaneParams {
                width: 2.0,
                height: 2.0,
            },
        )
        .context("failed to build plane program")?;

        self.camera.set_aspect(gpu.size().aspect());
        let (w, h) = window.logical_size();
        self.controls.set_surface_size(w, h);

        let model = plane.program().model_matrix();
        let camera = &self.camera;

        #[rustfmt::skip]
        let uniforms: [(&str, UniformType, Option<UniformValue>); 10] = [
            ("uTime",                   UniformType::Float,   Some(UniformValue::Float(0.0))),
            ("uMatcap",                 UniformType::Sampler, Some(matcap.into())),
            ("uEnvMap",                 UniformType::Sampler, Some(env.into())),
            ("cameraPosition",          UniformType::Vec3,    Some(camera.position.into())),
            ("modelMatrix",             UniformType::Mat4,    Some(model.into())),
            ("viewMatrix",              UniformType::Mat4,    Some(camera.view_matrix().into())),
            ("projectionMatrix",        UniformType::Mat4,    Some(camera.projection_matrix().into())),
            ("viewMatrixInverse",       UniformType::Mat4,    Some(camera.view_matrix_inverse().into())),
            ("projectionMatrixInverse", UniformType::Mat4,    Some(camera.projection_matrix_inverse().into())),
            ("normalMatrix",            UniformType::Mat4,    None),
        ];
        plane.program_mut().uniforms_mut().add_all(uniforms);

        log::info!(
            "scene ready: plane with {} vertices, {} textures",
            plane.program().vertex_count(),
            self.textures.len()
        );
        self.plane = Some(plane);
        Ok(())
    }

    fn on_resize(&mut self, size: SurfaceSize, window: &WindowCtx<'_>) {
        if !size.is_drawable() {
            return;
        }
        self.camera.set_aspect(size.aspect());
        self.set_projection_uniforms();

        let (w, h) = window.logical_size();
        self.controls.set_surface_size(w, h);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        for event in ctx.events {
            self.controls.handle_input(event);
        }
        self.controls.update(&mut self.camera);

        let Some(plane) = self.plane.as_mut() else {
            return AppControl::Continue;
        };

        let u = plane.program_mut().uniforms_mut();
        u.set("uTime", ctx.time.elapsed);
        u.set("viewMatrix", self.camera.view_matrix());
        u.set("viewMatrixInverse", self.camera.view_matrix_inverse());
        u.set("cameraPosition", self.camera.position);
        u.set("normalMatrix", self.camera.normal_matrix());

        let textures = &self.textures;
        ctx.render(|rctx, target| plane.render(rctx, target, textures))
    }

    fn dispose(&mut self) {
        if let Some(plane) = self.plane.take() {
            plane.dispose();
        }
        self.textures.dispose_all();
        self.controls.dispose();
        log::debug!("scene disposed");
    }
}

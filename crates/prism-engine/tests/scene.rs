//! Drives a full plane scene offscreen.
//!
//! The GPU half needs a wgpu adapter; machines without one only run the CPU checks.

use glam::{Vec3, Vec4};

use prism_engine::camera::{Camera, ControlsConfig, Damping, OrbitControls};
use prism_engine::device::{DepthTarget, SurfaceSize};
use prism_engine::error::{ImageLoadError, ProgramError, ShaderStage};
use prism_engine::events::ControlEvent;
use prism_engine::input::MouseButton;
use prism_engine::render::{Mesh, Plane, PlaneParams, RenderCtx, RenderTarget, UniformType, UniformValue};
use prism_engine::texture::{
    create_source, load_image, CubeFace, CubeTexture, DecodedImage, Texture2D, TextureOptions,
    TextureRegistry,
};

const SIZE: u32 = 64;
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VS: &str = r#"
struct Uniforms {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
    uTint: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = u.projectionMatrix * u.viewMatrix * u.modelMatrix * vec4<f32>(in.position, 1.0);
    out.uv = in.uv + in.normal.xy;
    return out;
}
"#;

const FS: &str = r#"
struct Uniforms {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
    uTint: vec3<f32>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var uMatcap: texture_2d<f32>;
@group(1) @binding(1) var uMatcapSampler: sampler;
@group(1) @binding(2) var uEnvMap: texture_cube<f32>;
@group(1) @binding(3) var uEnvMapSampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let m = textureSample(uMatcap, uMatcapSampler, uv);
    let e = textureSample(uEnvMap, uEnvMapSampler, vec3<f32>(0.0, 0.0, 1.0));
    return vec4<f32>(m.rgb * e.rgb * u.uTint, 1.0);
}
"#;

fn solid(name: &str, rgba: [u8; 4]) -> DecodedImage {
    DecodedImage::from_rgba(name, 1, 1, rgba.to_vec()).unwrap()
}

fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
}

struct Offscreen {
    color: wgpu::Texture,
    view: wgpu::TextureView,
    depth: DepthTarget,
}

impl Offscreen {
    fn new(device: &wgpu::Device) -> Self {
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen color"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = DepthTarget::new(device, DEPTH_FORMAT, SurfaceSize::new(SIZE, SIZE));
        Self { color, view, depth }
    }

    /// Clears to blue, draws the plane and reads the frame back as RGBA8.
    fn frame(
        &self,
        ctx: &RenderCtx<'_>,
        plane: &mut Plane,
        textures: &TextureRegistry,
    ) -> Vec<u8> {
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test frame"),
        });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("test clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLUE),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        {
            let mut target = RenderTarget::new(&mut encoder, &self.view, &self.depth.view);
            plane.render(ctx, &mut target, textures);
        }

        // 64 px * 4 bytes is already row-aligned.
        let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: (SIZE * SIZE * 4) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(SIZE * 4),
                    rows_per_image: Some(SIZE),
                },
            },
            wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
        rx.recv().unwrap().unwrap();

        let pixels = slice.get_mapped_range().to_vec();
        readback.unmap();
        pixels
    }
}

fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [frame[i], frame[i + 1], frame[i + 2], frame[i + 3]]
}

// ── CPU half ─────────────────────────────────────────────────────────────

#[test]
fn missing_image_rejects_the_load() {
    let err = pollster::block_on(load_image("does/not/exist/px.jpg")).unwrap_err();
    assert!(matches!(err, ImageLoadError::Decode { .. }));
}

#[test]
fn cube_source_keeps_only_face_names() {
    let source = create_source([
        solid("px", [255; 4]),
        solid("matcap", [255; 4]),
        solid("nz", [255; 4]),
    ]);
    let faces: Vec<_> = source.keys().copied().collect();
    assert_eq!(faces, vec![CubeFace::PX, CubeFace::NZ]);
}

#[test]
fn controls_drive_the_camera_around_the_origin() {
    let mut camera = Camera::perspective(45.0, 1.0, 0.01, 10.0, Vec3::new(0.0, 0.0, 2.0));
    let mut controls = OrbitControls::new(ControlsConfig {
        damping: Damping::Continuous(0.15),
        ..ControlsConfig::default()
    });
    controls.set_surface_size(400.0, 300.0);

    controls.handle(&ControlEvent::PointerDown {
        button: MouseButton::Left,
        position: glam::Vec2::new(0.0, 0.0),
    });
    controls.handle(&ControlEvent::PointerMove {
        position: glam::Vec2::new(75.0, 30.0),
    });
    controls.handle(&ControlEvent::PointerUp);

    for _ in 0..200 {
        controls.update(&mut camera);
        assert!((camera.position.length() - 2.0).abs() < 1e-4);
    }

    // the origin stays centred in view
    let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((clip.x / clip.w).abs() < 1e-4);
    assert!((clip.y / clip.w).abs() < 1e-4);
}

// ── GPU half ─────────────────────────────────────────────────────────────

#[test]
fn plane_renders_and_falls_back_after_texture_disposal() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no wgpu adapter available; skipping");
        return;
    };
    let ctx = RenderCtx::new(&device, &queue, COLOR_FORMAT, DEPTH_FORMAT, SurfaceSize::new(SIZE, SIZE));
    let offscreen = Offscreen::new(&device);

    let mut textures = TextureRegistry::new();
    let matcap = Texture2D::new(&ctx, &solid("matcap", [255, 0, 0, 255]), TextureOptions::default()).unwrap();
    let matcap = textures.insert(matcap);

    let faces = ["px", "nx", "py", "ny", "pz", "nz"].map(|n| solid(n, [255; 4]));
    let env = CubeTexture::new(&ctx, &create_source(faces), TextureOptions::default()).unwrap();
    assert_eq!(env.faces().len(), 6);
    let env = textures.insert(env);

    let mut camera = Camera::perspective(45.0, 1.0, 0.01, 10.0, Vec3::new(0.0, 0.0, 2.0));
    let mut controls = OrbitControls::new(ControlsConfig {
        damping: Damping::Continuous(0.15),
        ..ControlsConfig::default()
    });
    controls.set_surface_size(SIZE as f32, SIZE as f32);
    let start = camera.position;
    for _ in 0..100 {
        controls.update(&mut camera);
    }
    assert!(camera.position.abs_diff_eq(start, 1e-5));

    let mut plane = Plane::new(&ctx, VS, FS, PlaneParams::default()).unwrap();
    let model = plane.program().model_matrix();
    plane.program_mut().uniforms_mut().add_all([
        ("uMatcap", UniformType::Sampler, Some(UniformValue::from(matcap))),
        ("uEnvMap", UniformType::Sampler, Some(UniformValue::from(env))),
        ("modelMatrix", UniformType::Mat4, Some(UniformValue::from(model))),
        ("viewMatrix", UniformType::Mat4, Some(UniformValue::from(camera.view_matrix()))),
        ("projectionMatrix", UniformType::Mat4, Some(UniformValue::from(camera.projection_matrix()))),
        ("uTint", UniformType::Vec3, Some(UniformValue::from(Vec3::ONE))),
    ]);
    assert_eq!(plane.program().uniforms().unit("uEnvMap"), Some(1));

    let frame = offscreen.frame(&ctx, &mut plane, &textures);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [255, 0, 0, 255]);
    assert_eq!(pixel(&frame, 0, 0), [0, 0, 255, 255]);

    // stale handle samples the white placeholder
    textures.dispose(matcap);
    let frame = offscreen.frame(&ctx, &mut plane, &textures);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [255, 255, 255, 255]);

    plane.dispose();
    textures.dispose_all();
}

#[test]
fn handles_taken_before_dispose_all_stay_stale() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no wgpu adapter available; skipping");
        return;
    };
    let ctx = RenderCtx::new(&device, &queue, COLOR_FORMAT, DEPTH_FORMAT, SurfaceSize::new(SIZE, SIZE));
    let offscreen = Offscreen::new(&device);
    let cube = || ["px", "nx", "py", "ny", "pz", "nz"].map(|n| solid(n, [255; 4]));

    let mut textures = TextureRegistry::new();
    let matcap = Texture2D::new(&ctx, &solid("matcap", [255, 0, 0, 255]), TextureOptions::default()).unwrap();
    let matcap = textures.insert(matcap);
    let env = CubeTexture::new(&ctx, &create_source(cube()), TextureOptions::default()).unwrap();
    let env = textures.insert(env);

    let camera = Camera::perspective(45.0, 1.0, 0.01, 10.0, Vec3::new(0.0, 0.0, 2.0));
    let mut plane = Plane::new(&ctx, VS, FS, PlaneParams::default()).unwrap();
    let model = plane.program().model_matrix();
    plane.program_mut().uniforms_mut().add_all([
        ("uMatcap", UniformType::Sampler, Some(UniformValue::from(matcap))),
        ("uEnvMap", UniformType::Sampler, Some(UniformValue::from(env))),
        ("modelMatrix", UniformType::Mat4, Some(UniformValue::from(model))),
        ("viewMatrix", UniformType::Mat4, Some(UniformValue::from(camera.view_matrix()))),
        ("projectionMatrix", UniformType::Mat4, Some(UniformValue::from(camera.projection_matrix()))),
        ("uTint", UniformType::Vec3, Some(UniformValue::from(Vec3::ONE))),
    ]);

    let frame = offscreen.frame(&ctx, &mut plane, &textures);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [255, 0, 0, 255]);

    // rebuild the registry; the freed slots get reused
    textures.dispose_all();
    assert!(textures.is_empty());
    let green = Texture2D::new(&ctx, &solid("matcap", [0, 255, 0, 255]), TextureOptions::default()).unwrap();
    let green = textures.insert(green);
    let env2 = CubeTexture::new(&ctx, &create_source(cube()), TextureOptions::default()).unwrap();
    let env2 = textures.insert(env2);

    assert!(!textures.contains(matcap));
    assert!(!textures.contains(env));
    assert!(textures.contains(green));
    assert!(textures.contains(env2));
    assert_ne!(green, matcap);
    assert_ne!(env2, env);

    // the plane still points at the old handles and samples the placeholder
    let frame = offscreen.frame(&ctx, &mut plane, &textures);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [255, 255, 255, 255]);

    plane.program_mut().uniforms_mut().set("uMatcap", green);
    let frame = offscreen.frame(&ctx, &mut plane, &textures);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [0, 255, 0, 255]);

    plane.dispose();
    textures.dispose_all();
}

#[test]
fn broken_shaders_fail_construction() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no wgpu adapter available; skipping");
        return;
    };
    let ctx = RenderCtx::new(&device, &queue, COLOR_FORMAT, DEPTH_FORMAT, SurfaceSize::new(SIZE, SIZE));

    let bad_fs = FS.replace("fn fs_main", "fn fs_main(");
    match Plane::new(&ctx, VS, &bad_fs, PlaneParams::default()) {
        Err(ProgramError::Compile { stage, source_text, .. }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert_eq!(source_text, bad_fs);
        }
        other => panic!("expected a compile error, got {:?}", other.err()),
    }

    // a vertex input no attribute feeds
    let extra_input = VS.replace(
        "@location(2) uv: vec2<f32>,",
        "@location(2) uv: vec2<f32>,\n    @location(3) tangent: vec3<f32>,",
    );
    assert!(matches!(
        Plane::new(&ctx, &extra_input, FS, PlaneParams::default()),
        Err(ProgramError::Link(_))
    ));
}

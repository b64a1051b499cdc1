//! WGSL compilation and interface reflection.
//!
//! Each stage is parsed and validated on its own ("compile"), then the two modules
//! are checked against each other and against the binding model ("link"):
//!
//! - `@group(0) @binding(0)`: one `var<uniform>` struct holding every numeric uniform
//! - `@group(1)`: `texture_2d<f32>` / `texture_cube<f32>` globals, each optionally
//!   paired with a sampler global named `<texture>Sampler`
//!
//! Nothing else may be bound.

use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, ImageClass, ImageDimension, ScalarKind, TypeInner, VectorSize};

use crate::error::{ProgramError, ShaderStage};
use crate::texture::TextureKind;

pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const TEXTURE_GROUP: u32 = 1;

/// Numeric and sampler types a uniform slot can hold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Float,
    Int,
    Vec2,
    Vec3,
    Mat4,
    Sampler,
}

impl UniformType {
    /// Size in bytes inside the uniform block. Zero for samplers.
    pub const fn byte_size(self) -> usize {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Mat4 => 64,
            UniformType::Sampler => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockMember {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

/// Layout of the `@group(0) @binding(0)` uniform struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub size: u32,
    pub members: Vec<BlockMember>,
}

impl UniformBlock {
    pub fn member(&self, name: &str) -> Option<&BlockMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextureBinding {
    pub name: String,
    pub binding: u32,
    pub kind: TextureKind,
    pub sampler_binding: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VertexInput {
    pub name: String,
    pub location: u32,
}

/// Combined interface of a linked vertex + fragment pair.
#[derive(Debug, Clone, Default)]
pub(crate) struct Reflection {
    pub vertex_inputs: Vec<VertexInput>,
    pub block: Option<UniformBlock>,
    pub textures: Vec<TextureBinding>,
}

#[cfg(test)]
impl Reflection {
    pub fn texture(&self, name: &str) -> Option<&TextureBinding> {
        self.textures.iter().find(|t| t.name == name)
    }
}

/// A validated single-stage module.
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub module: naga::Module,
}

/// Parses and validates one stage.
pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, ProgramError> {
    let fail = |message: String| ProgramError::Compile {
        stage,
        message,
        source_text: source.to_string(),
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| fail(format!("{e:?}")))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.stage == wanted && ep.name == stage.entry_point());
    if !has_entry {
        return Err(fail(format!(
            "missing @{stage} entry point `{}`",
            stage.entry_point()
        )));
    }

    Ok(CompiledStage { stage, module })
}

/// Cross-checks both stages and produces the program interface.
pub(crate) fn link(vs: &CompiledStage, fs: &CompiledStage) -> Result<Reflection, ProgramError> {
    let vs_iface = stage_resources(vs)?;
    let fs_iface = stage_resources(fs)?;

    let block = match (vs_iface.block, fs_iface.block) {
        (Some(a), Some(b)) if a != b => {
            return Err(ProgramError::Link(
                "uniform block differs between vertex and fragment stages".to_string(),
            ));
        }
        (a, b) => a.or(b),
    };

    let mut by_binding: BTreeMap<u32, String> = BTreeMap::new();
    let mut textures: Vec<TextureBinding> = Vec::new();
    for tex in vs_iface.textures.into_iter().chain(fs_iface.textures) {
        if let Some(existing) = textures.iter().find(|t| t.name == tex.name) {
            if *existing != tex {
                return Err(ProgramError::Link(format!(
                    "texture `{}` is declared differently in each stage",
                    tex.name
                )));
            }
            continue;
        }
        for binding in std::iter::once(tex.binding).chain(tex.sampler_binding) {
            if let Some(other) = by_binding.insert(binding, tex.name.clone()) {
                return Err(ProgramError::Link(format!(
                    "@group({TEXTURE_GROUP}) @binding({binding}) is used by both `{other}` and `{}`",
                    tex.name
                )));
            }
        }
        textures.push(tex);
    }
    textures.sort_by_key(|t| t.binding);

    check_varyings(&vs.module, &fs.module)?;

    Ok(Reflection {
        vertex_inputs: vertex_inputs(&vs.module)?,
        block,
        textures,
    })
}

struct StageResources {
    block: Option<UniformBlock>,
    textures: Vec<TextureBinding>,
}

fn stage_resources(stage: &CompiledStage) -> Result<StageResources, ProgramError> {
    let module = &stage.module;
    let mut block = None;
    let mut images: Vec<(String, u32, TextureKind)> = Vec::new();
    let mut samplers: Vec<(String, u32)> = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_default();
        let inner = &module.types[var.ty].inner;

        match var.space {
            AddressSpace::Uniform => {
                let at_slot = matches!(&var.binding, Some(rb) if rb.group == UNIFORM_GROUP && rb.binding == 0);
                if !at_slot {
                    return Err(link_err(stage, format!(
                        "uniform `{name}` must be bound at @group({UNIFORM_GROUP}) @binding(0)"
                    )));
                }
                block = Some(uniform_block(module, inner).ok_or_else(|| {
                    link_err(stage, format!("uniform `{name}` must be a struct"))
                })?);
            }
            AddressSpace::Handle => {
                let Some(rb) = &var.binding else { continue };
                if rb.group != TEXTURE_GROUP {
                    return Err(link_err(stage, format!(
                        "`{name}` must be bound in @group({TEXTURE_GROUP})"
                    )));
                }
                match inner {
                    TypeInner::Image {
                        dim,
                        arrayed: false,
                        class: ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
                    } => {
                        let kind = match dim {
                            ImageDimension::D2 => TextureKind::D2,
                            ImageDimension::Cube => TextureKind::Cube,
                            other => {
                                return Err(link_err(stage, format!(
                                    "texture `{name}` has unsupported dimension {other:?}"
                                )));
                            }
                        };
                        images.push((name, rb.binding, kind));
                    }
                    TypeInner::Sampler { comparison: false } => samplers.push((name, rb.binding)),
                    _ => {
                        return Err(link_err(stage, format!(
                            "`{name}` is not a float texture or filtering sampler"
                        )));
                    }
                }
            }
            AddressSpace::Storage { .. } => {
                return Err(link_err(stage, format!("storage buffer `{name}` is not supported")));
            }
            _ => {}
        }
    }

    let mut textures = Vec::with_capacity(images.len());
    for (name, binding, kind) in images {
        let sampler_name = format!("{name}Sampler");
        let sampler_binding = samplers
            .iter()
            .position(|(s, _)| *s == sampler_name)
            .map(|i| samplers.remove(i).1);
        textures.push(TextureBinding {
            name,
            binding,
            kind,
            sampler_binding,
        });
    }

    if let Some((orphan, _)) = samplers.first() {
        return Err(link_err(stage, format!(
            "sampler `{orphan}` has no texture (expected a texture named `{}`)",
            orphan.strip_suffix("Sampler").unwrap_or(orphan)
        )));
    }

    Ok(StageResources { block, textures })
}

fn uniform_block(module: &naga::Module, inner: &TypeInner) -> Option<UniformBlock> {
    let TypeInner::Struct { members, span } = inner else {
        return None;
    };

    let members = members
        .iter()
        .filter_map(|m| {
            let name = m.name.clone()?;
            let ty = uniform_type(&module.types[m.ty].inner)?;
            Some(BlockMember {
                name,
                offset: m.offset,
                ty,
            })
        })
        .collect();

    Some(UniformBlock {
        size: *span,
        members,
    })
}

/// Maps a naga type to a slot type. Unsupported types yield `None` and stay unaddressable.
pub(crate) fn uniform_type(inner: &TypeInner) -> Option<UniformType> {
    use naga::Scalar;

    match *inner {
        TypeInner::Scalar(Scalar::F32) => Some(UniformType::Float),
        TypeInner::Scalar(Scalar::I32) => Some(UniformType::Int),
        TypeInner::Vector {
            size: VectorSize::Bi,
            scalar: Scalar::F32,
        } => Some(UniformType::Vec2),
        TypeInner::Vector {
            size: VectorSize::Tri,
            scalar: Scalar::F32,
        } => Some(UniformType::Vec3),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar: Scalar::F32,
        } => Some(UniformType::Mat4),
        _ => None,
    }
}

fn entry_point<'m>(module: &'m naga::Module, stage: ShaderStage) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point())
}

/// `(name, location)` of every `@location` binding in an argument list or struct result.
fn locations(
    module: &naga::Module,
    name: Option<&String>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<(String, u32, TypeInner)>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.push((
                name.cloned().unwrap_or_default(),
                *location,
                module.types[ty].inner.clone(),
            ));
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    locations(module, m.name.as_ref(), m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn vertex_inputs(module: &naga::Module) -> Result<Vec<VertexInput>, ProgramError> {
    let mut found = Vec::new();
    if let Some(ep) = entry_point(module, ShaderStage::Vertex) {
        for arg in &ep.function.arguments {
            locations(module, arg.name.as_ref(), arg.ty, arg.binding.as_ref(), &mut found);
        }
    }

    found
        .into_iter()
        .map(|(name, location, inner)| {
            let scalar = match inner {
                TypeInner::Scalar(s) | TypeInner::Vector { scalar: s, .. } => Some(s),
                _ => None,
            };
            if scalar != Some(naga::Scalar::F32) {
                return Err(ProgramError::Link(format!(
                    "vertex input `{name}` at @location({location}) must be f32-based"
                )));
            }
            Ok(VertexInput { name, location })
        })
        .collect()
}

/// Every fragment input location must be written by the vertex stage.
fn check_varyings(vs: &naga::Module, fs: &naga::Module) -> Result<(), ProgramError> {
    let mut outputs = Vec::new();
    if let Some(ep) = entry_point(vs, ShaderStage::Vertex) {
        if let Some(result) = &ep.function.result {
            locations(vs, None, result.ty, result.binding.as_ref(), &mut outputs);
        }
    }

    let mut inputs = Vec::new();
    if let Some(ep) = entry_point(fs, ShaderStage::Fragment) {
        for arg in &ep.function.arguments {
            locations(fs, arg.name.as_ref(), arg.ty, arg.binding.as_ref(), &mut inputs);
        }
    }

    for (name, location, _) in inputs {
        if !outputs.iter().any(|(_, l, _)| *l == location) {
            return Err(ProgramError::Link(format!(
                "fragment input `{name}` at @location({location}) is not written by the vertex stage"
            )));
        }
    }
    Ok(())
}

fn link_err(stage: &CompiledStage, message: String) -> ProgramError {
    ProgramError::Link(format!("{} stage: {message}", stage.stage))
}

/// Compiles and links a vertex/fragment pair.
#[cfg(test)]
pub(crate) fn reflect(vs_src: &str, fs_src: &str) -> Result<Reflection, ProgramError> {
    let vs = compile(ShaderStage::Vertex, vs_src)?;
    let fs = compile(ShaderStage::Fragment, fs_src)?;
    link(&vs, &fs)
}

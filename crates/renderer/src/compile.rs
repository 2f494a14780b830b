use std::borrow::Cow;

/// Compiles the textured-quad blit shader.
pub(crate) fn compile_blit_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("blit shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(BLIT_SHADER_WGSL)),
    })
}

/// Textured quad in pixel units.
///
/// Vertex positions are pixels from the top-left of the render target and are
/// mapped to clip space here. Texture coordinates are pixels as well; the
/// fragment stage truncates them to integer texel indices and reads with
/// `textureLoad`, so there is no normalisation, filtering, mipmapping or
/// wrapping, only a clamp to the texture bounds.
const BLIT_SHADER_WGSL: &str = r"
struct Viewport {
    size: vec4<f32>,
};

@group(0) @binding(0) var<uniform> viewport: Viewport;
@group(0) @binding(1) var source_texture: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) texel: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
) -> VertexOutput {
    var output: VertexOutput;
    let ndc = vec2<f32>(
        position.x / viewport.size.x * 2.0 - 1.0,
        1.0 - position.y / viewport.size.y * 2.0,
    );
    output.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    output.texel = tex_coord;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let bounds = vec2<i32>(textureDimensions(source_texture)) - vec2<i32>(1, 1);
    let coord = clamp(vec2<i32>(floor(input.texel)), vec2<i32>(0, 0), bounds);
    return textureLoad(source_texture, coord, 0);
}
";

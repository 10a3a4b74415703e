use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::SetupError;

/// Attribute names and the slots they are bound to in every program.
pub const ATTRIBUTE_BINDINGS: [(&str, u32); 2] = [("posAttr", 0), ("uvAttr", 1)];

/// Compiles one GLSL stage, turning validation failures into a setup error.
///
/// wgpu reports shader errors asynchronously through the device, so the
/// module is created inside a validation error scope which is popped before
/// returning.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    program: &str,
    source: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, SetupError> {
    let label = format!("{program} {}", stage_name(stage));
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(SetupError::ShaderCompile {
            program: program.to_string(),
            stage: stage_name(stage),
            message: error.to_string(),
        });
    }
    Ok(module)
}

fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "compute",
        _ => "shader",
    }
}

/// Checks that the vertex stage declares every attribute at its fixed slot.
///
/// This stands in for binding attribute locations before linking: a program
/// whose inputs sit at other locations cannot share the quad buffers.
pub(crate) fn check_attribute_bindings(
    program: &str,
    vertex_source: &str,
    bindings: &[(&str, u32)],
) -> Result<(), SetupError> {
    for (name, location) in bindings {
        let declared = vertex_source.lines().any(|line| {
            let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            compact.starts_with(&format!("layout(location={location})in"))
                && compact.contains(&format!("{name};"))
        });
        if !declared {
            return Err(SetupError::ProgramLink {
                program: program.to_string(),
                message: format!("attribute `{name}` is not declared at location {location}"),
            });
        }
    }
    Ok(())
}

/// Vertex stage shared by all three programs: passes position and uv through.
pub const QUAD_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 posAttr;
layout(location = 1) in vec2 uvAttr;

layout(location = 0) out vec2 uv;

void main() {
    gl_Position = vec4(posAttr, 0.0, 1.0);
    uv = uvAttr;
}
";

/// Animated value-noise clouds banded between the palette colours.
///
/// The uniform block layout must match [`crate::gpu::ProgramUniforms`]. The
/// hash, layer and octave functions are mirrored in [`crate::noise`].
pub const BACKDROP_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform ProgramParams {
    float time;
    float aspect;
    vec3 bg_col;
    vec3 fg_col;
} params;

float rand3D(vec3 co) {
    return fract(sin(dot(co, vec3(12.9898, 78.233, 144.7272))) * 43758.5453);
}

float perlin_layer(vec3 co) {
    vec3 quant_floor = floor(co);
    vec3 quant_frac = fract(co);

    float bot_left_back   = rand3D(quant_floor);
    float bot_right_back  = rand3D(quant_floor + vec3(1.0, 0.0, 0.0));
    float top_left_back   = rand3D(quant_floor + vec3(0.0, 1.0, 0.0));
    float top_right_back  = rand3D(quant_floor + vec3(1.0, 1.0, 0.0));

    float bot_left_front  = rand3D(quant_floor + vec3(0.0, 0.0, 1.0));
    float bot_right_front = rand3D(quant_floor + vec3(1.0, 0.0, 1.0));
    float top_left_front  = rand3D(quant_floor + vec3(0.0, 1.0, 1.0));
    float top_right_front = rand3D(quant_floor + vec3(1.0, 1.0, 1.0));

    float bot_back = mix(bot_left_back, bot_right_back, quant_frac.x);
    float top_back = mix(top_left_back, top_right_back, quant_frac.x);
    float bot_front = mix(bot_left_front, bot_right_front, quant_frac.x);
    float top_front = mix(top_left_front, top_right_front, quant_frac.x);

    float back = mix(bot_back, top_back, quant_frac.y);
    float front = mix(bot_front, top_front, quant_frac.y);

    return mix(back, front, quant_frac.z);
}

float perlin(vec3 co) {
    float out_val = 0.0;
    for (int i = 0; i < 8; i++) {
        out_val += perlin_layer(co * pow(2.0, float(i)));
    }
    return out_val / 8.0;
}

void main() {
    vec2 uv_s = vec2(uv.x * params.aspect, uv.y) * 5.0;
    float value = perlin(vec3(uv_s, params.time * 0.1));

    float band = 0.0;
    if (value > 0.58) {
        band = 1.0;
    } else if (value > 0.53) {
        band = 0.25;
    }
    outColor = vec4(mix(params.bg_col, params.fg_col, band), 1.0);
}
";

/// Samples the label decal. Image rows run top-down, so v is flipped.
pub const TEXT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 outColor;

layout(set = 1, binding = 0) uniform texture2D decal_texture;
layout(set = 1, binding = 1) uniform sampler decal_sampler;

void main() {
    outColor = texture(sampler2D(decal_texture, decal_sampler), vec2(uv.x, 1.0 - uv.y));
}
";

/// Warps the composited backdrop and folds out-of-range coordinates back
/// into the texture by mirroring.
pub const POST_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform ProgramParams {
    float time;
    float aspect;
    vec3 bg_col;
    vec3 fg_col;
} params;

layout(set = 1, binding = 0) uniform texture2D back_texture;
layout(set = 1, binding = 1) uniform sampler back_sampler;

const float PI = 3.141592653589793;

void main() {
    vec2 uv_s = vec2(
        uv.x + cos(params.time * 0.45 + 2.0 * PI * uv.y) * 0.05,
        uv.y + sin(params.time * 0.6 + 2.0 * PI * uv.x) * 0.06
    );
    vec2 uv_mod = abs(mod(uv_s + vec2(1.0), vec2(2.0)) - vec2(1.0));
    // Render targets store the top row first; flip back to uv space.
    outColor = texture(sampler2D(back_texture, back_sampler), vec2(uv_mod.x, 1.0 - uv_mod.y));
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_vertex_stage_declares_bound_attributes() {
        check_attribute_bindings("quad", QUAD_VERTEX_GLSL, &ATTRIBUTE_BINDINGS)
            .expect("attributes bound");
    }

    #[test]
    fn misplaced_attribute_fails_link_check() {
        let source =
            "layout(location = 1) in vec2 posAttr;\nlayout(location = 0) in vec2 uvAttr;\n";
        let err = check_attribute_bindings("swapped", source, &ATTRIBUTE_BINDINGS).unwrap_err();
        assert!(matches!(err, SetupError::ProgramLink { .. }));
        assert!(err.to_string().contains("posAttr"));
    }

    #[test]
    fn backdrop_thresholds_match_cpu_reference() {
        for threshold in [
            crate::noise::FOREGROUND_THRESHOLD,
            crate::noise::FRINGE_THRESHOLD,
        ] {
            assert!(BACKDROP_FRAGMENT_GLSL.contains(&format!("value > {threshold}")));
        }
        assert!(BACKDROP_FRAGMENT_GLSL.contains("i < 8"));
    }
}

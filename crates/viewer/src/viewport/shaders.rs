// ── Programs ─────────────────────────────────────────────────

/// Which program a draw uses. `label()` is what the GPU layer sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Lit, diffuse-colored triangles
    Fill,
    /// Flat id color for picking
    Pick,
    /// Unlit per-vertex colored lines and round points
    Overlay,
    /// 3x3 blur over the offscreen color texture
    Post,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Fill => "fill",
            ProgramKind::Pick => "pick",
            ProgramKind::Overlay => "overlay",
            ProgramKind::Post => "post",
        }
    }

    pub fn sources(self) -> (&'static str, &'static str) {
        match self {
            ProgramKind::Fill => (FILL_VERT, FILL_FRAG),
            ProgramKind::Pick => (PICK_VERT, PICK_FRAG),
            ProgramKind::Overlay => (OVERLAY_VERT, OVERLAY_FRAG),
            ProgramKind::Post => (POST_VERT, POST_FRAG),
        }
    }
}

// ── Shaders ──────────────────────────────────────────────────

const FILL_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;
uniform mat4 u_model;
uniform mat3 u_normal_matrix;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;

out vec3 v_normal;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
    v_normal = u_normal_matrix * a_normal;
}
"#;

const FILL_FRAG: &str = r#"#version 330 core
uniform vec3 u_color;
uniform vec3 u_light_dir;
uniform vec3 u_light_color;
uniform vec3 u_ambient;

in vec3 v_normal;

out vec4 frag_color;

void main() {
    vec3 n = normalize(v_normal);
    float diffuse = max(dot(n, normalize(u_light_dir)), 0.0);
    vec3 light = u_ambient + u_light_color * diffuse;
    frag_color = vec4(min(u_color * light, vec3(1.0)), 1.0);
}
"#;

const PICK_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;

layout(location = 0) in vec3 a_position;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

const PICK_FRAG: &str = r#"#version 330 core
uniform vec3 u_pick_color;

out vec4 frag_color;

void main() {
    frag_color = vec4(u_pick_color, 1.0);
}
"#;

const OVERLAY_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;
uniform float u_point_size;
uniform float u_depth_bias;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;

out vec4 v_color;

void main() {
    vec4 clip = u_mvp * vec4(a_position, 1.0);
    clip.z -= u_depth_bias * clip.w;
    gl_Position = clip;
    gl_PointSize = u_point_size;
    v_color = a_color;
}
"#;

const OVERLAY_FRAG: &str = r#"#version 330 core
uniform int u_round_points;

in vec4 v_color;
out vec4 frag_color;

void main() {
    if (u_round_points != 0) {
        vec2 d = gl_PointCoord - vec2(0.5);
        if (dot(d, d) > 0.25) {
            discard;
        }
    }
    frag_color = v_color;
}
"#;

const POST_VERT: &str = r#"#version 330 core
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;

out vec2 v_uv;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
    v_uv = a_uv;
}
"#;

const POST_FRAG: &str = r#"#version 330 core
uniform sampler2D u_texture;
uniform vec2 u_texel;

in vec2 v_uv;
out vec4 frag_color;

void main() {
    vec4 sum = vec4(0.0);
    sum += texture(u_texture, v_uv + vec2(-1.0, -1.0) * u_texel) * 1.0;
    sum += texture(u_texture, v_uv + vec2( 0.0, -1.0) * u_texel) * 2.0;
    sum += texture(u_texture, v_uv + vec2( 1.0, -1.0) * u_texel) * 1.0;
    sum += texture(u_texture, v_uv + vec2(-1.0,  0.0) * u_texel) * 2.0;
    sum += texture(u_texture, v_uv)                              * 4.0;
    sum += texture(u_texture, v_uv + vec2( 1.0,  0.0) * u_texel) * 2.0;
    sum += texture(u_texture, v_uv + vec2(-1.0,  1.0) * u_texel) * 1.0;
    sum += texture(u_texture, v_uv + vec2( 0.0,  1.0) * u_texel) * 2.0;
    sum += texture(u_texture, v_uv + vec2( 1.0,  1.0) * u_texel) * 1.0;
    frag_color = sum / 16.0;
}
"#;

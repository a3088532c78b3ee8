//! Setup errors raised by the render backend.

/// Hard failures during GPU setup. Nothing useful can be drawn after one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No GPU context has been installed
    ContextUnavailable,
    /// A shader stage failed to compile
    ShaderCompile {
        program: String,
        stage: &'static str,
        log: String,
    },
    /// A program failed to link
    ProgramLink { program: String, log: String },
    /// The driver refused to create an object
    ResourceCreation(String),
    /// Offscreen framebuffer is not complete (GL status code)
    IncompleteFramebuffer(u32),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::ContextUnavailable => write!(f, "GPU context unavailable"),
            RenderError::ShaderCompile { program, stage, log } => {
                write!(f, "{} shader of '{}' program failed to compile: {}", stage, program, log)
            }
            RenderError::ProgramLink { program, log } => {
                write!(f, "'{}' program failed to link: {}", program, log)
            }
            RenderError::ResourceCreation(msg) => write!(f, "GPU resource creation failed: {}", msg),
            RenderError::IncompleteFramebuffer(status) => {
                write!(f, "offscreen framebuffer incomplete (status 0x{:X})", status)
            }
        }
    }
}

impl std::error::Error for RenderError {}

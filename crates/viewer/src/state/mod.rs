pub mod scene;
pub mod settings;

pub use scene::Scene;
pub use settings::{FeatureFlags, LightSettings, OverlayStyle, ViewerSettings};

mod app;
mod ui;
mod viewport;

// Re-export library modules so that `crate::state` etc. resolve to the lib
// crate types everywhere in the binary.
pub use meshview_lib::state;

use std::path::PathBuf;

use app::MeshViewApp;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshview=info,meshview_lib=info".into()),
        )
        .init();

    // Parse --obj <path> argument
    let initial_obj = parse_obj_arg();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("meshview")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "meshview",
        native_options,
        Box::new(move |cc| Ok(Box::new(MeshViewApp::new(cc, initial_obj)))),
    ) {
        tracing::error!("Failed to start application: {e}");
    }
}

fn parse_obj_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--obj" {
            let path = args.next();
            if path.is_none() {
                tracing::error!("--obj needs a path");
            }
            return path.map(PathBuf::from);
        }
    }
    None
}

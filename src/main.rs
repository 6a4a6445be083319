use fanviz::app;
use fanviz::config::ViewerConfig;
use std::path::PathBuf;

const CONFIG_FILE: &str = "fanviz.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut config = match ViewerConfig::load_or_default(CONFIG_FILE) {
        Ok(config) => config,
        Err(err) => {
            log::error!("Bad config {}: {}", CONFIG_FILE, err);
            std::process::exit(1);
        }
    };

    // First CLI argument overrides the configured model path.
    if let Some(arg) = std::env::args().nth(1) {
        config.model_path = Some(PathBuf::from(arg));
    }
    if config.model_path.is_none() {
        config.model_path = rfd::FileDialog::new()
            .add_filter("glTF", &["gltf", "glb"])
            .pick_file();
    }
    let Some(model_path) = config.model_path.clone() else {
        log::error!("No model selected; pass a glTF path or pick one in the dialog");
        std::process::exit(1);
    };

    log::info!("Fanviz starting with model {}", model_path.display());
    log::info!("   Press ESC or close the window to exit");
    log::info!("   WASD/Space/Shift move, drag looks, wheel dollies, F/]/[ drive the fans");

    app::run(config, model_path);

    log::info!("Goodbye!");
}

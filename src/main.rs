mod ui;

use tracing_subscriber::EnvFilter;

use advisor_core::config::AdvisorConfig;
use ui::app::AdvisorApp;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,beauty_advisor=debug,advisor_core=debug")),
        )
        .init();

    tracing::info!("Beauty advisor starting...");

    match AdvisorConfig::ensure_config_file() {
        Ok(true) => tracing::info!(
            "Wrote starter config to {:?}; set relay_url to your relay's address",
            AdvisorConfig::config_path()
        ),
        Ok(false) => {}
        Err(error) => tracing::warn!("Could not write starter config: {:#}", error),
    }

    let config = AdvisorConfig::load();
    let app = match AdvisorApp::new(&config) {
        Ok(app) => app,
        Err(error) => {
            tracing::error!("Failed to initialize: {:#}", error);
            std::process::exit(1);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 760.0])
            .with_title("L'Oréal Beauty Advisor"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Beauty Advisor",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    ) {
        tracing::error!("UI error: {}", e);
        std::process::exit(1);
    }
}

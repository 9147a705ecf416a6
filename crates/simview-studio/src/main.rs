use simview_engine::logging::{LoggingConfig, init_logging};
use simview_viewport::Application;

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(e) = run() {
        eprintln!("simview: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    Application::new().title("simview").size(800.0, 600.0).run()?;
    log::info!("window closed; exiting");
    Ok(())
}

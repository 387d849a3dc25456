use std::sync::Arc;

use clap::Parser;

use devserve::app::AppRegistry;
use devserve::cli::Cli;
use devserve::config::{ServerOptions, Settings};
use devserve::handler::build_handler;
use devserve::logaction::{LogSink, TracingSink};
use devserve::server::Bootstrap;
use devserve::wsgi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let options = cli.server_options(&settings, devserve::cli::under_supervisor())?;

    // Project entry points would be registered here; the default
    // application covers the unconfigured case.
    let registry = AppRegistry::new();
    let handle = build_handler(&options, &settings, &registry, wsgi::default_legacy_factory)?;

    print_banner(&options, &settings);

    let root_path = settings.force_script_name.clone().unwrap_or_default();
    let sink: Arc<dyn LogSink> = Arc::new(TracingSink::new("http"));
    let mut bootstrap = Bootstrap::new(options, root_path, sink);
    bootstrap.run(handle).await
}

fn print_banner(options: &ServerOptions, settings: &Settings) {
    let quit_command = if cfg!(windows) {
        "CTRL-BREAK"
    } else {
        "CONTROL-C"
    };
    println!("{}", devserve::cli::startup_timestamp());
    println!(
        "devserve version {}, using settings {:?}",
        env!("CARGO_PKG_VERSION"),
        settings.source
    );
    println!(
        "Starting {} development server at http://{}:{}/",
        options.protocol.server_type(),
        options.display_addr(),
        options.port
    );
    println!("Quit the server with {quit_command}.");
}

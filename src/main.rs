use clap::Parser;
use log::{error, info};
use savview::configuration::{CliArgs, Config};
use savview::controller::Controller;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
███████╗ █████╗ ██╗   ██╗██╗   ██╗██╗███████╗██╗    ██╗
██╔════╝██╔══██╗██║   ██║██║   ██║██║██╔════╝██║    ██║
███████╗███████║██║   ██║██║   ██║██║█████╗  ██║ █╗ ██║
╚════██║██╔══██║╚██╗ ██╔╝╚██╗ ██╔╝██║██╔══╝  ██║███╗██║
███████║██║  ██║ ╚████╔╝  ╚████╔╝ ██║███████╗╚███╔███╔╝
╚══════╝╚═╝  ╚═╝  ╚═══╝    ╚═══╝  ╚═╝╚══════╝ ╚══╝╚══╝
=======================================================
         SAV IPFIX record dashboard v0.0.2
=======================================================
"
    );

    info!("Importing configuration");

    let args = CliArgs::parse();

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration imported successfully");

    let mut controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let result = tokio::select! {
        result = controller.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    controller.shutdown();

    if let Err(e) = result {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}

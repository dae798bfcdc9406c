use clap::Parser;
use unused_ports::config::LogFormat;
use unused_ports::utils::error::ErrorSeverity;
use unused_ports::utils::logger;
use unused_ports::{
    presenter_for, CliConfig, Inventory, RunOptions, UnusedPortsEngine, UnusedPortsPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting unused-ports");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let options = match RunOptions::resolve(&cli) {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            tracing::error!("Suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let inventory = Inventory::from_source(&options.inventory_source, options.auth_token.clone());
    let presenter = presenter_for(options.format, options.explain);
    let engine = UnusedPortsEngine::new(inventory, UnusedPortsPipeline::default(), presenter);

    let mut stdout = std::io::stdout().lock();
    match engine.run(&options.settings, &options.query, &mut stdout).await {
        Ok(summary) => {
            tracing::debug!("Run finished: {:?}", summary);
        }
        Err(e) => {
            tracing::error!(
                "Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

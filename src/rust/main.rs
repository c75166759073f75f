use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use menu_profit::config::timeout_from_millis;
use menu_profit::{AppConfig, MenuForm, MissingFrequencyPolicy, ProfitabilityService, ValidationMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the `MENU_PROFIT_*` environment settings
#[derive(Args)]
struct Settings {
    /// Directory holding preprocessor.onnx, xgb_model.onnx, label_encoder.json
    /// and optionally menu_item_freq.json
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    /// Whether empty fields block a submission
    #[arg(long, global = true, value_enum)]
    validation: Option<ValidationMode>,

    /// What to do when menu_item_freq.json is absent
    #[arg(long, global = true, value_enum)]
    missing_frequency: Option<MissingFrequencyPolicy>,

    /// Upper bound on one inference call in milliseconds, 0 for none
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the prediction form over HTTP
    Serve {
        /// Address to listen on
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Predict one menu item and print the result
    Predict {
        #[arg(long)]
        restaurant_id: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        ingredients: String,
    },
}

impl Settings {
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.artifacts_dir {
            config.artifacts_dir = dir;
        }
        if let Some(mode) = self.validation {
            config.validation = mode;
        }
        if let Some(policy) = self.missing_frequency {
            config.missing_frequency = policy;
        }
        if let Some(ms) = self.timeout_ms {
            config.inference_timeout = timeout_from_millis(ms);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    menu_profit::init_logger();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid environment configuration")?;
    cli.settings.apply(&mut config);

    info!("=== Menu Profitability Predictor ===");
    info!("Artifacts directory: {:?}", config.artifacts_dir);

    match cli.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
            }
            // Load failures are shown on the page rather than stopping the server
            let service = ProfitabilityService::from_config(&config);
            if let Err(e) = service.artifacts() {
                error!("{}", e);
            }
            menu_profit::web::bind_and_serve(config.addr, service)
                .await
                .with_context(|| format!("Server on {} stopped", config.addr))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Predict {
            restaurant_id,
            category,
            item,
            price,
            ingredients,
        } => {
            let service = ProfitabilityService::from_config(&config);
            let form = MenuForm {
                restaurant_id,
                menu_category: category,
                menu_item: item,
                price,
                ingredients,
            };

            match service.submit_async(&form).await {
                Ok(prediction) => {
                    println!("\nResults:");
                    println!("  Predicted profitability: {}", prediction.label);
                    println!("  {}", prediction.label.message());
                    if let Some(freq) = prediction.menu_item_freq {
                        println!("  Menu item frequency feature: {}", freq);
                    }
                    println!(
                        "  Illustrative adjusted price: ${:.2} (not a model output)",
                        prediction.metrics.adjusted_price
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("\n{}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

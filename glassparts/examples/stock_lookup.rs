//! Interroge le service de stock et affiche les résultats en JSON
//!
//! Les identifiants viennent de la configuration glassconfig ou des variables
//! GLASSPARTS_LOGIN, GLASSPARTS_PASSWORD et GLASSPARTS_USER_ID.
//!
//! Usage:
//!   cargo run --example stock_lookup -- hello
//!   cargo run --example stock_lookup -- models <make>
//!   cargo run --example stock_lookup -- vrn <registration>
//!   cargo run --example stock_lookup -- availability <argic> [qty] [depot]

use glassparts::GlassPartsClient;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("Usage: {} <hello|makes|models|depots|vrn|availability> [args...]", args[0]);
        std::process::exit(1);
    };

    let client = GlassPartsClient::from_config()?;
    tracing::info!("Using account {}", client.credentials());

    let arg = |index: usize| args.get(index).map(String::as_str).unwrap_or_default();

    let output = match command.as_str() {
        "hello" => serde_json::to_string_pretty(&client.hello_world().await?)?,
        "makes" => serde_json::to_string_pretty(&client.get_makes().await?)?,
        "models" => serde_json::to_string_pretty(&client.get_models(arg(2)).await?)?,
        "depots" => serde_json::to_string_pretty(&client.get_depots().await?)?,
        "vrn" => serde_json::to_string_pretty(&client.get_argic_from_vrn(arg(2)).await?)?,
        "availability" => {
            let qty: u32 = arg(3).parse().unwrap_or(1);
            let depot = args.get(4).map(String::as_str);
            serde_json::to_string_pretty(
                &client.aggregate_availability(arg(2), qty, depot).await?,
            )?
        }
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    };

    println!("{}", output);
    Ok(())
}

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use color_eyre::Result;
use engine::{ApiKey, BackendClient, SessionInput, Timeouts, backend::DEFAULT_BASE_URL};

#[derive(clap::Parser)]
struct Args {
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Generation timeout in seconds
    #[arg(long, default_value_t = Timeouts::default().generation.as_secs())]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the models the backend offers
    Models,
    /// Generate one image and print its url
    Generate {
        #[arg(long)]
        key: String,
        /// Defaults to the first model the backend lists
        #[arg(long)]
        model: Option<String>,
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Args {
        base_url,
        timeout,
        command,
    } = Args::parse();

    let backend = BackendClient::new(
        base_url,
        Timeouts {
            generation: Duration::from_secs(timeout),
            ..Timeouts::default()
        },
    );
    let catalog = backend.fetch_catalog().await;

    match command {
        Command::Models => {
            if catalog.is_empty() {
                eprintln!("Couldn't get the model list, check the backend connection.");
                return Ok(ExitCode::FAILURE);
            }
            for model in catalog.models() {
                println!("{model}");
            }
        }
        Command::Generate { key, model, prompt } => {
            let input = SessionInput {
                api_key: ApiKey::new(key),
                prompt,
                selected_model: model.or_else(|| catalog.first().cloned()),
            };
            let result = match input.validate(&catalog) {
                Ok(req) => backend.generate(&req).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(generated) => {
                    println!("{}", generated.caption());
                    println!("{}", generated.image_url);
                }
                Err(e) => {
                    eprintln!("{e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

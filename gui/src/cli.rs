use crate::context::Config;

#[derive(Debug, clap::Parser)]
pub struct Cli {
    /// Base url of the image generation backend, overrides the config file
    #[arg(short, long)]
    pub api_base_url: Option<String>,

    /// Generation timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Write the effective configuration to the config file and exit
    InitConfig,
}

impl Cli {
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(url) = &self.api_base_url {
            cfg.api_base_url = url.clone();
        }
        if let Some(secs) = self.timeout {
            cfg.generation_timeout_secs = secs;
        }
    }
}

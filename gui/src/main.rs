use clap::Parser;
use color_eyre::Result;
use flux_studio::{
    APP_NAME, Gui,
    cli::{Cli, Command},
    load_config, save_config,
};

pub fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let cli = Cli::parse();
    let mut cfg = load_config()?;
    cli.apply(&mut cfg);

    if let Some(Command::InitConfig) = cli.command {
        let path = save_config(&cfg)?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    iced::application(move || Gui::new(cfg.clone()), Gui::update, Gui::view)
        .title(APP_NAME)
        .run()?;
    Ok(())
}

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use iced::{
    Border, Color, Element, Font, Length, Task,
    font::{self},
    padding,
    widget::{container, scrollable, text},
};
use log::{info, warn};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    context::Config,
    message::Message,
    state::{Modal, State, StateExt, Studio},
};
use engine::Severity;

pub mod cli;
pub mod context;
pub mod message;
pub mod state;

pub use context::Context;

pub const APP_NAME: &str = "FLUX Studio";

pub struct Gui {
    state: Box<dyn State>,
    ctx: Context,
}

impl Gui {
    /// Builds the form and starts fetching the model catalog.
    pub fn new(config: Config) -> (Self, Task<Message>) {
        info!("{APP_NAME} talking to {}", config.api_base_url);
        let state = Studio::new(&config.default_prompt).boxed();
        let mut ctx = Context::from_config(config);
        let task = ctx.fetch_catalog();
        (Gui { state, ctx }, task)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match self.try_update(message) {
            Ok(task) => task,
            Err(e) => {
                warn!("Unexpected error: {e:?}");
                self.state = Modal::message(self.state.clone(), "Error", format!("{e:?}")).boxed();
                Task::none()
            }
        }
    }

    fn try_update(&mut self, message: Message) -> Result<Task<Message>> {
        match message {
            Message::Ui(ui_message) => {
                let cmd = self.state.update(ui_message, &mut self.ctx)?;
                if let Some(new_state) = cmd.transition {
                    self.state = new_state;
                }
                Ok(cmd.task.unwrap_or(Task::none()))
            }
            Message::Context(context_message) => self.ctx.update(context_message),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        self.state.view(&self.ctx).map(Message::from)
    }
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    ron::from_str(&src).with_context(|| format!("Couldn't parse {path:?}"))
}

pub fn save_ron_file<T: Serialize>(path: &Path, x: &T) -> Result<()> {
    let src = ron::ser::to_string_pretty(x, ron::ser::PrettyConfig::default())?;
    Ok(fs::write(path, src)?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join("flux_studio.ron"))
}

/// The stored config, or the defaults if there is none yet.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        Ok(Config::default())
    } else {
        load_ron_file(path)
    }
}

pub fn save_config(cfg: &Config) -> Result<PathBuf> {
    let path = config_path()?;
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    save_ron_file(path, cfg)
}

fn italic_text<'a>(t: impl text::IntoFragment<'a>) -> iced::widget::Text<'a> {
    iced::widget::text(t).font(Font {
        style: font::Style::Italic,
        ..Font::DEFAULT
    })
}

fn bold_text<'a>(t: impl text::IntoFragment<'a>) -> iced::widget::Text<'a> {
    iced::widget::text(t).font(bold_default_font())
}

fn bold_default_font() -> Font {
    Font {
        weight: font::Weight::Bold,
        ..Font::DEFAULT
    }
}

/// Colored box for warnings and errors shown inline.
fn banner<'a, T: 'a>(message: impl text::IntoFragment<'a>, severity: Severity) -> Element<'a, T> {
    let background = match severity {
        Severity::Warning => Color::from_rgb(1.0, 0.97, 0.85),
        Severity::Error => Color::from_rgb(1.0, 0.9, 0.9),
    };
    container(text(message))
        .padding(12)
        .width(Length::Fill)
        .style(move |_theme| {
            container::background(background).border(Border::default().rounded(5))
        })
        .into()
}

fn top_level_container<'a, T: Send + 'static>(
    elem: impl Into<Element<'a, T>>,
) -> container::Container<'a, T> {
    container(scrollable(
        container(elem).padding(padding::all(10).right(20)),
    ))
    .padding(20)
    .width(Length::Fill)
    .height(Length::Fill)
}

pub trait TryIntoExt<T> {
    fn try_into_ex(self) -> color_eyre::Result<T>;
}

impl<T, Target, E> TryIntoExt<Target> for T
where
    T: TryInto<Target, Error = E>,
    T: fmt::Debug,
    T: Clone,
    E: std::error::Error + Send + Sync + 'static,
{
    fn try_into_ex(self) -> color_eyre::Result<Target> {
        self.clone()
            .try_into()
            .with_context(|| format!("{self:#?}"))
    }
}

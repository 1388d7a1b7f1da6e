use color_eyre::Result;
use engine::{ApiKey, ModelCatalog, SessionInput, Severity};
use iced::{
    Element, Length,
    widget::{button, column, container, pick_list, row, space, text, text_editor, text_input},
};

use crate::{
    Context, TryIntoExt, banner, bold_text,
    context::{
        Generation,
        generation::{ImageState, Output},
    },
    italic_text,
    message::{UiMessage, ui_messages::Studio as MyMessage},
    state::{Modal, State, StateCommand, cmd},
    top_level_container,
};

const KEY_HELP: &str = indoc::indoc! {"
    Your key is only used for the image generation requests you send from this window.
    It is kept in memory while the window is open and is never written to disk.
"};

/// The generator form: key, model and prompt. The request in flight and its
/// output are kept in [`Context::generation`].
#[derive(Debug, Clone)]
pub struct Studio {
    api_key: ApiKey,
    prompt: text_editor::Content,
    selected_model: Option<String>,
}

impl Studio {
    pub fn new(prompt: &str) -> Self {
        Self {
            api_key: ApiKey::default(),
            prompt: text_editor::Content::with_text(prompt),
            selected_model: None,
        }
    }

    fn selected_model<'a>(&'a self, catalog: &'a ModelCatalog) -> Option<&'a String> {
        catalog.effective_selection(self.selected_model.as_deref())
    }

    /// Submitting needs a non-empty catalog and no request in flight.
    pub fn submit_enabled(&self, ctx: &Context) -> bool {
        !ctx.generation.pending && ctx.catalog().is_some_and(|c| !c.is_empty())
    }

    fn session_input(&self, catalog: &ModelCatalog) -> SessionInput {
        SessionInput {
            api_key: self.api_key.clone(),
            prompt: self.prompt.text(),
            selected_model: self.selected_model(catalog).cloned(),
        }
    }

    fn submit(&mut self, ctx: &mut Context) -> Result<StateCommand> {
        if !self.submit_enabled(ctx) {
            return cmd::none();
        }
        let Some(catalog) = ctx.catalog() else {
            return cmd::none();
        };

        let checked = self.session_input(catalog).validate(catalog);
        match checked {
            Err(e) => {
                ctx.generation.reject(e);
                cmd::none()
            }
            Ok(request) => cmd::task(ctx.generation.start(request, &ctx.backend)),
        }
    }

    fn sidebar(&self, pending: bool) -> Element<'_, UiMessage> {
        column![
            bold_text("API settings").size(18),
            text("Enter your API key"),
            text_input("API key", self.api_key.expose())
                .secure(true)
                .on_input(|s| MyMessage::ApiKeyChanged(s.into()).into()),
            button("How is my key used?")
                .on_press_maybe((!pending).then(|| UiMessage::from(MyMessage::ShowKeyHelp))),
        ]
        .spacing(10)
        .width(Length::Fixed(260.0))
        .into()
    }

    fn settings<'a>(&'a self, ctx: &'a Context) -> Element<'a, UiMessage> {
        let models: Element<'a, UiMessage> = match ctx.catalog() {
            None => italic_text("Loading models...").into(),
            Some(catalog) if catalog.is_empty() => column![
                banner(
                    "Couldn't fetch the model list, please check the backend connection.",
                    Severity::Warning,
                ),
                button("Reload models").on_press(MyMessage::ReloadModels.into()),
            ]
            .spacing(10)
            .into(),
            Some(catalog) => column![
                text("Choose an image generation model:"),
                pick_list(
                    catalog.models(),
                    self.selected_model(catalog),
                    |m| MyMessage::ModelSelected(m).into(),
                )
                .width(Length::Fill),
            ]
            .spacing(10)
            .into(),
        };

        column![
            bold_text("Options").size(18),
            models,
            text("Enter your image description (prompt):"),
            text_editor(&self.prompt)
                .on_action(|a| MyMessage::PromptAction(a).into())
                .height(Length::Fixed(150.0)),
            button(text("Generate image").center().width(Length::Fill))
                .on_press_maybe(
                    self.submit_enabled(ctx)
                        .then(|| UiMessage::from(MyMessage::Submit)),
                )
                .width(Length::Fill),
        ]
        .spacing(12)
        .width(Length::FillPortion(1))
        .into()
    }

    fn result(generation: &Generation) -> Element<'_, UiMessage> {
        let mut items: Vec<Element<'_, UiMessage>> = vec![bold_text("Result").size(18).into()];

        if generation.pending {
            items.push(italic_text("Talking to the AI, please wait...").into());
        }

        match &generation.output {
            Output::Empty => {}
            Output::Failed(e) => items.push(banner(e.to_string(), e.severity())),
            Output::Image { generated, image } => {
                items.push(match image {
                    ImageState::Loading => italic_text("Loading image...").into(),
                    ImageState::Ready(handle) => {
                        iced::widget::image(handle.clone()).width(Length::Fill).into()
                    }
                    ImageState::Failed(e) => banner(e.to_string(), Severity::Error),
                });
                items.push(text(generated.caption()).size(14).into());
            }
        }

        column(items)
            .spacing(12)
            .width(Length::FillPortion(2))
            .into()
    }
}

impl State for Studio {
    fn update(&mut self, event: UiMessage, ctx: &mut Context) -> Result<StateCommand> {
        let msg: MyMessage = event.try_into_ex()?;

        use MyMessage::*;
        match msg {
            ApiKeyChanged(key) => {
                self.api_key = key;
                cmd::none()
            }
            ModelSelected(model) => {
                self.selected_model = Some(model);
                cmd::none()
            }
            PromptAction(action) => {
                self.prompt.perform(action);
                cmd::none()
            }
            Submit => self.submit(ctx),
            ReloadModels => cmd::task(ctx.fetch_catalog()),
            ShowKeyHelp => cmd::transition(Modal::message(
                State::clone(self),
                "About your API key",
                KEY_HELP,
            )),
        }
    }

    fn view<'a>(&'a self, ctx: &'a Context) -> Element<'a, UiMessage> {
        let main = column![
            bold_text("FLUX multi-model AI image generator").size(26),
            text("Bring your own API key, pick a model and describe the image."),
            space().height(10),
            row![self.settings(ctx), Self::result(&ctx.generation)].spacing(30),
        ]
        .spacing(10)
        .width(Length::Fill);

        top_level_container(
            row![
                self.sidebar(ctx.generation.pending),
                container(main).width(Length::Fill)
            ]
            .spacing(40),
        )
        .into()
    }

    fn clone(&self) -> Box<dyn State> {
        Box::new(Clone::clone(self))
    }
}

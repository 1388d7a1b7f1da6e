use derive_more::{From, TryInto};
use engine::{Generated, GenerationError, ModelCatalog};
use iced::widget::image;

#[derive(Debug, Clone, From)]
pub enum Message {
    Ui(UiMessage),
    Context(ContextMessage),
}

/// Messages routed to the active screen.
#[derive(Debug, Clone, From, TryInto)]
pub enum UiMessage {
    Studio(ui_messages::Studio),
    MessageDialog(ui_messages::MessageDialog),
}

#[derive(Debug, Clone)]
pub enum ContextMessage {
    CatalogFetched(ModelCatalog),
    Generated(Result<Generated, GenerationError>),
    ImageFetched {
        url: String,
        result: Result<image::Handle, GenerationError>,
    },
}

impl From<ui_messages::Studio> for Message {
    fn from(m: ui_messages::Studio) -> Self {
        Message::Ui(m.into())
    }
}

impl From<ui_messages::MessageDialog> for Message {
    fn from(m: ui_messages::MessageDialog) -> Self {
        Message::Ui(m.into())
    }
}

pub mod ui_messages {
    use engine::ApiKey;
    use iced::widget::text_editor;

    #[derive(Debug, Clone)]
    pub enum Studio {
        ApiKeyChanged(ApiKey),
        ModelSelected(String),
        PromptAction(text_editor::Action),
        Submit,
        ReloadModels,
        ShowKeyHelp,
    }

    #[derive(Debug, Clone)]
    pub enum MessageDialog {
        Confirm,
        EditAction(text_editor::Action),
    }
}

use engine::{BackendClient, Generated, GenerationError, GenerationRequest};
use iced::{Task, widget::image};
use log::{info, warn};

use crate::message::{ContextMessage, Message};

/// The in-flight request and the output of the last one. Lives in the context
/// so results land even while a dialog covers the form.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub pending: bool,
    pub output: Output,
}

#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Empty,
    Failed(GenerationError),
    Image {
        generated: Generated,
        image: ImageState,
    },
}

#[derive(Debug, Clone)]
pub enum ImageState {
    Loading,
    Ready(image::Handle),
    Failed(GenerationError),
}

impl Generation {
    /// Shows a validation failure without sending anything.
    pub fn reject(&mut self, e: GenerationError) {
        info!("Not sending request: {e}");
        self.output = Output::Failed(e);
    }

    pub fn start(&mut self, request: GenerationRequest, backend: &BackendClient) -> Task<Message> {
        info!("Requesting an image from {}", request.model);
        self.pending = true;
        self.output = Output::Empty;
        let backend = backend.clone();
        Task::perform(async move { backend.generate(&request).await }, |res| {
            ContextMessage::Generated(res).into()
        })
    }

    pub fn finished(
        &mut self,
        res: Result<Generated, GenerationError>,
        backend: &BackendClient,
    ) -> Task<Message> {
        self.pending = false;
        match res {
            Ok(generated) => {
                let url = generated.image_url.clone();
                self.output = Output::Image {
                    generated,
                    image: ImageState::Loading,
                };
                let backend = backend.clone();
                Task::perform(
                    {
                        let url = url.clone();
                        async move {
                            backend
                                .fetch_image(&url)
                                .await
                                .map(image::Handle::from_bytes)
                        }
                    },
                    move |result| ContextMessage::ImageFetched { url, result }.into(),
                )
            }
            Err(e) => {
                warn!("Generation failed ({}): {e}", e.kind());
                self.output = Output::Failed(e);
                Task::none()
            }
        }
    }

    /// Downloads for anything but the current image are dropped.
    pub fn image_fetched(&mut self, url: String, result: Result<image::Handle, GenerationError>) {
        if let Output::Image { generated, image } = &mut self.output
            && generated.image_url == url
        {
            *image = match result {
                Ok(handle) => ImageState::Ready(handle),
                Err(e) => {
                    warn!("Couldn't load {url}: {e}");
                    ImageState::Failed(e)
                }
            };
        }
    }
}

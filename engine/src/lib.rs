pub mod backend;
pub mod session;

pub use backend::{
    BackendClient, Timeouts,
    error::{ErrorKind, GenerationError, Severity},
};
pub use session::{ApiKey, GenerationRequest, Generated, ModelCatalog, SessionInput};

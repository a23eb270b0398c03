//! Orchestration between the app's surfaces and the model: plant image
//! analysis, the chat session, and the state both surfaces render.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod analysis;
pub mod chat;
pub mod image;
mod model_client;
pub mod outcome;
pub mod prompts;
pub mod transcript;
pub mod workbench;

pub use analysis::PlantAnalyzer;
pub use chat::{ChatSession, SessionState};
pub use image::{ImageError, ImageInput};
pub use model_client::{ModelClient, ModelClientResponse};
pub use outcome::{Failure, Outcome};
pub use transcript::{Message, Role, Transcript, render_html};
pub use workbench::{Snapshot, SubmitError, Workbench, WorkbenchBuilder};

//! AI-generated commit messages: prompt, pipeline, and commit inputs.

pub mod generator;
pub mod gitmoji;
pub mod input;
pub mod prompt;

pub use generator::{
    CommitMessageGenerator, GenerateTrigger, NoProgress, Phase, ProgressSink,
    classify_provider_error, classify_status,
};
pub use input::{CommitInput, MessageFile, StdoutInput};
pub use prompt::{PromptSettings, build_prompt};

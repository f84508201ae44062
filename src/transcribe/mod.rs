pub mod audio;
pub mod azure_openai;
pub mod backend;
#[cfg(feature = "whisper-local")]
pub mod whisper_local;
pub mod worker;
pub mod writer;

pub use backend::{backend_unavailable, Segment, Transcription, TranscriptionBackend};
pub use worker::{
    run_transcription, ConfiguredModels, ModelProvider, TranscriptionReport, TranscriptionSettings,
};

pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod frames;
pub mod media;
pub mod ocr;
pub mod progress;
pub mod transcribe;
pub mod translate;

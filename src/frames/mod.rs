pub mod pipeline;
pub mod renamer;
pub mod sampler;
pub mod timestamps;

pub use pipeline::{run_frame_pipeline, FrameReport, FrameSettings};
pub use timestamps::FrameTimestamp;

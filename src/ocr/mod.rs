pub mod classifier;
pub mod engine;
pub mod legibility;
pub mod preprocess;

pub use classifier::{Classification, Classifier, ClassifySummary};
pub use engine::{OcrEngine, TesseractCli};
pub use legibility::{LegibilityRules, Verdict};

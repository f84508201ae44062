use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::engine::OcrEngine;
use super::legibility::{LegibilityRules, Verdict};
use super::preprocess::preprocess;
use crate::progress::panic_message;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifySummary {
    pub examined: usize,
    pub legible: usize,
    pub failed: usize,
}

/// Outcome for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub path: PathBuf,
    pub legible: bool,
    pub text: String,
}

/// Runs OCR over candidate frames on a fixed-size pool and keeps the ones
/// whose text passes the legibility rules.
pub struct Classifier {
    engine: Arc<dyn OcrEngine>,
    rules: Arc<LegibilityRules>,
    threshold: u8,
    pool: rayon::ThreadPool,
}

impl Classifier {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        rules: Arc<LegibilityRules>,
        threshold: u8,
        workers: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("ocr-{}", i))
            .build()
            .context("Failed to build OCR worker pool")?;
        Ok(Self {
            engine,
            rules,
            threshold,
            pool,
        })
    }

    /// Classify a single frame. Errors are returned, not swallowed.
    pub fn classify(&self, path: &Path) -> Result<Classification> {
        classify_frame(self.engine.as_ref(), &self.rules, self.threshold, path)
    }

    /// Classify every `.png` in `candidates`, copying legible frames and a
    /// `<stem>.txt` sidecar into `dest`. `on_progress(done, total)` is called
    /// after each frame completes, in completion order.
    pub fn classify_dir(
        &self,
        candidates: &Path,
        dest: &Path,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<ClassifySummary> {
        let frames = list_pngs(candidates)?;
        let total = frames.len();
        let mut summary = ClassifySummary::default();
        if total == 0 {
            on_progress(0, 0);
            return Ok(summary);
        }
        std::fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let (tx, rx) = mpsc::channel();
        for path in frames {
            let tx = tx.clone();
            let engine = Arc::clone(&self.engine);
            let rules = Arc::clone(&self.rules);
            let threshold = self.threshold;
            // A panic escaping a pool job aborts the process.
            self.pool.spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    classify_frame(engine.as_ref(), &rules, threshold, &path)
                }))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!("OCR panicked: {}", panic_message(&payload)))
                });
                let _ = tx.send((path, result));
            });
        }
        drop(tx);

        for (path, result) in rx {
            summary.examined += 1;
            match result.and_then(|c| keep_if_legible(&c, dest).map(|kept| kept as usize)) {
                Ok(kept) => summary.legible += kept,
                Err(e) => {
                    tracing::warn!("OCR failed for {}: {:#}", path.display(), e);
                    summary.failed += 1;
                }
            }
            on_progress(summary.examined, total);
        }
        Ok(summary)
    }
}

fn classify_frame(
    engine: &dyn OcrEngine,
    rules: &LegibilityRules,
    threshold: u8,
    path: &Path,
) -> Result<Classification> {
    let image = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let prepared = preprocess(&image, threshold);
    let text = engine.recognize(&prepared)?.trim().to_string();
    let verdict = rules.assess(&text);
    if verdict != Verdict::Legible {
        tracing::debug!("Rejected {}: {:?}", path.display(), verdict);
    }
    Ok(Classification {
        path: path.to_path_buf(),
        legible: verdict == Verdict::Legible,
        text,
    })
}

fn keep_if_legible(classification: &Classification, dest: &Path) -> Result<bool> {
    if !classification.legible {
        return Ok(false);
    }
    let path = &classification.path;
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("frame path has no file name: {}", path.display()))?;
    let stem = path.file_stem().unwrap_or(file_name).to_string_lossy();

    std::fs::copy(path, dest.join(file_name))
        .with_context(|| format!("Failed to copy {}", path.display()))?;
    std::fs::write(dest.join(format!("{}.txt", stem)), &classification.text)
        .with_context(|| format!("Failed to write sidecar for {}", path.display()))?;
    tracing::debug!("Kept {}", path.display());
    Ok(true)
}

fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pngs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if is_png && path.is_file() {
            pngs.push(path);
        }
    }
    pngs.sort();
    Ok(pngs)
}

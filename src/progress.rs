use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::Mutex;
use tracing::info;

/// Coarse phases of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WebsiteAnalysis,
    ContentProcessing,
    ExternalResearch,
    AiAnalysis,
    ReportGeneration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::WebsiteAnalysis => "Website Analysis",
            Stage::ContentProcessing => "Content Processing",
            Stage::ExternalResearch => "External Research",
            Stage::AiAnalysis => "AI Analysis",
            Stage::ReportGeneration => "Report Generation",
        };
        f.write_str(name)
    }
}

/// Emitted by the pipeline as each step actually completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub stage: Stage,
    pub message: String,
    pub percent: u8,
}

/// Receives progress updates from a running pipeline.
pub trait ProgressObserver: Send + Sync {
    fn update(&self, update: &ProgressUpdate);
}

/// Logs every update through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn update(&self, update: &ProgressUpdate) {
        info!("[{}] {} ({}%)", update.stage, update.message, update.percent);
    }
}

/// Draws updates on a terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn update(&self, update: &ProgressUpdate) {
        self.bar.set_position(update.percent.into());
        self.bar
            .set_message(format!("{}: {}", update.stage, update.message));
    }
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordedProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordedProgress {
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

impl ProgressObserver for RecordedProgress {
    fn update(&self, update: &ProgressUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update.clone());
        }
    }
}

// src/pipeline.rs
// =============================================================================
// The orchestrator: takes one ContentUnit at a time from "just fetched" to
// "painted on the page".
//
// Stages:
//   Idle -> Classifying -> Rendering                      (html, plain text)
//   Idle -> Classifying -> SizingPatch -> Rendering       (patch)
//   Idle -> Classifying -> Extracting -> SizingPatch
//        -> Rendering                                     (markup)
//   ... -> Done, or Failed from Extracting / Rendering
//
// Markdown extraction runs on the background worker when one could be
// started, inline otherwise. The choice is made once, when the orchestrator
// is built, and only ever moves from Background to Inline: a worker that
// times out or dies is dropped for the rest of the session.
//
// Pipeline failures never escape as errors. They are shown on the target as
// error notices and recorded in the returned RenderReport, so the caller can
// still write the page.
//
// Rust concepts:
// - enum with data (ExtractionStrategy): the owned channel lives inside
//   the variant, so "no channel" and "inline mode" are the same state
// - tokio::time::timeout: bound an await without touching the worker
// =============================================================================

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::ViewerConfig;
use crate::content::{
    classify_kind, classify_size, extract, ContentKind, ContentUnit, Extraction, SizeClass,
    SizeThresholds,
};
use crate::error::ViewerError;
use crate::render::{NoticeLevel, RenderConfig, RenderTarget, Renderer};
use crate::worker::{BackgroundChannel, ExtractReply, PendingExtraction};

pub const RENDER_FAILED_CONTENT: &str = "Failed to render content.";

// How markdown extraction is performed for this session
pub enum ExtractionStrategy {
    Background(BackgroundChannel),
    Inline,
}

impl ExtractionStrategy {
    // Starts the background worker when asked to, falling back to inline
    //
    // Must be called from inside a tokio runtime for the background
    // strategy to be available.
    pub fn start(use_background: bool) -> Self {
        if !use_background {
            log::info!("background worker disabled, extracting inline");
            return ExtractionStrategy::Inline;
        }
        match BackgroundChannel::start() {
            Ok(channel) => ExtractionStrategy::Background(channel),
            Err(e) => {
                log::warn!("background worker unavailable ({}), extracting inline", e);
                ExtractionStrategy::Inline
            }
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, ExtractionStrategy::Background(_))
    }
}

impl fmt::Debug for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::Background(channel) => f
                .debug_struct("Background")
                .field("in_flight", &channel.in_flight())
                .finish(),
            ExtractionStrategy::Inline => f.write_str("Inline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Classifying,
    SizingPatch,
    Extracting,
    Rendering,
    Done,
    Failed,
}

// What happened to one unit; printed with --json
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub file: String,
    pub kind: Option<ContentKind>,
    pub size: Option<SizeClass>,
    pub block_count: Option<usize>,
    pub render_config: Option<RenderConfig>,
    pub stage: Stage,
    pub error: Option<String>,
}

impl RenderReport {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            kind: None,
            size: None,
            block_count: None,
            render_config: None,
            stage: Stage::Idle,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.stage == Stage::Failed
    }

    fn advance(&mut self, next: Stage) {
        log::debug!("{}: {:?} -> {:?}", self.file, self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, error: &ViewerError) {
        log::warn!("{}: {}", self.file, error);
        self.error = Some(error.to_string());
        self.advance(Stage::Failed);
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    strategy: ExtractionStrategy,
    renderer: Renderer,
    thresholds: SizeThresholds,
    extract_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        strategy: ExtractionStrategy,
        renderer: Renderer,
        thresholds: SizeThresholds,
        extract_timeout: Option<Duration>,
    ) -> Self {
        Self {
            strategy,
            renderer,
            thresholds,
            extract_timeout,
        }
    }

    // Builds an orchestrator from user configuration
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            ExtractionStrategy::start(config.background_worker),
            Renderer::new(&config.highlight_theme),
            config.thresholds,
            config.extract_timeout(),
        )
    }

    pub fn strategy(&self) -> &ExtractionStrategy {
        &self.strategy
    }

    // Runs one unit through the pipeline and paints it onto `target`
    //
    // Parameters:
    //   unit: the selected file; must not be truncated
    //   target: page (or test recorder) receiving notices and content
    //
    // Returns:
    //   Ok(report) for every unit that was processed, including failed ones
    //   Err(Truncated) when the unit still needs its full body fetched
    pub async fn process<T: RenderTarget + ?Sized>(
        &mut self,
        unit: &ContentUnit,
        target: &mut T,
    ) -> Result<RenderReport, ViewerError> {
        let file = unit.file_name_hint();
        if unit.is_truncated_on_arrival() {
            return Err(ViewerError::Truncated(file.to_string()));
        }

        let mut report = RenderReport::new(file);
        report.advance(Stage::Classifying);
        let kind = classify_kind(file, unit.body());
        report.kind = Some(kind);
        log::info!("{} classified as {:?}", file, kind);

        match kind {
            ContentKind::Html => {
                report.advance(Stage::Rendering);
                self.renderer.render_html(unit.body(), target);
            }
            ContentKind::PlainText => {
                report.advance(Stage::Rendering);
                self.renderer.render_plain_text(unit.body(), target);
            }
            ContentKind::Patch => {
                self.render_patch(unit.body(), &mut report, target).await;
            }
            ContentKind::Markup => {
                report.advance(Stage::Extracting);
                match self.run_extraction(unit.body()).await {
                    Ok(extraction) => {
                        log::info!("{}: {} diff block(s) found", file, extraction.block_count);
                        report.block_count = Some(extraction.block_count);
                        self.render_patch(&extraction.combined_patch_text, &mut report, target)
                            .await;
                    }
                    Err(e) => {
                        target.show_notice(NoticeLevel::Danger, &e.to_string());
                        report.fail(&e);
                    }
                }
            }
        }

        if report.stage != Stage::Failed {
            report.advance(Stage::Done);
        }
        Ok(report)
    }

    async fn render_patch<T: RenderTarget + ?Sized>(
        &self,
        patch: &str,
        report: &mut RenderReport,
        target: &mut T,
    ) {
        report.advance(Stage::SizingPatch);
        let size = classify_size(patch, &self.thresholds);
        report.size = Some(size);

        report.advance(Stage::Rendering);
        match self.renderer.render_patch(patch, size, target).await {
            Ok(config) => report.render_config = config,
            Err(e) => {
                let error = ViewerError::from(e);
                target.show_notice(NoticeLevel::Danger, &error.to_string());
                target.replace_content(RENDER_FAILED_CONTENT.to_string());
                report.fail(&error);
            }
        }
    }

    async fn run_extraction(&mut self, markup: &str) -> Result<Extraction, ViewerError> {
        let dispatched = match &mut self.strategy {
            ExtractionStrategy::Inline => return Ok(extract(markup)?),
            ExtractionStrategy::Background(channel) => channel.dispatch(markup.to_string()),
        };

        let reply = match dispatched {
            Ok(pending) => wait_for_reply(pending, self.extract_timeout).await,
            Err(e) => Err(e.to_string()),
        };

        match reply {
            Ok(reply) => Ok(reply.into_result()?),
            Err(reason) => {
                log::warn!("dropping background worker: {}", reason);
                self.strategy = ExtractionStrategy::Inline;
                Err(ViewerError::ExtractionFault(reason))
            }
        }
    }
}

// Awaits the correlated reply, bounded by `limit` when one is set
async fn wait_for_reply(
    pending: PendingExtraction,
    limit: Option<Duration>,
) -> Result<ExtractReply, String> {
    let id = pending.id();
    let Some(limit) = limit else {
        return pending.wait().await.map_err(|e| e.to_string());
    };

    match tokio::time::timeout(limit, pending.wait()).await {
        Ok(reply) => reply.map_err(|e| e.to_string()),
        Err(_) => Err(format!("task {} got no reply within {:?}", id, limit)),
    }
}

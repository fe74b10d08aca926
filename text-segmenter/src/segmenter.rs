//! Segmentation orchestrator.
//!
//! Owns the detectors and processors, turns split points into an initial chunk sequence and
//! runs the processor chain over it. Chapter bodies and whole documents go through the same
//! chunk builder; only the scope and offset differ.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::config::SegmenterConfig;
use crate::detector::SplitPointDetector;
use crate::detectors::ChapterDetector;
use crate::detectors::chapter;
use crate::error::{Result, SegmentError};
use crate::processor::ChunkProcessor;
use crate::text::TextIndex;
use crate::types::{Chapter, Position, SplitPoint, TextChunk, keys};

/// Output of a segmentation call. On failure `chunks` is empty and `error` is set.
#[derive(Debug, Default)]
pub struct SegmentationResult {
    pub chunks: Vec<TextChunk>,
    /// Chapters located in the document, empty for whole-document processing
    pub chapters: Vec<Chapter>,
    pub error: Option<SegmentError>,
}

impl SegmentationResult {
    fn failed(error: SegmentError) -> Self {
        Self {
            chunks: Vec::new(),
            chapters: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<TextChunk>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.chunks),
        }
    }
}

/// Segmentation pipeline.
///
/// The chapter detector lives outside the detector list: when present it is evaluated before
/// every other detector, and it is never run inside a chapter body.
///
/// `configure*` methods take `&mut self`, so a segmenter cannot be reconfigured while a
/// `process` call borrows it.
pub struct Segmenter {
    config: SegmenterConfig,
    chapter_detector: Option<ChapterDetector>,
    detectors: Vec<Box<dyn SplitPointDetector>>,
    processors: Vec<Box<dyn ChunkProcessor>>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        warn_on_sizes(&config);
        Self {
            config,
            chapter_detector: None,
            detectors: Vec::new(),
            processors: Vec::new(),
        }
    }

    pub fn with_chapter_detector(mut self, detector: ChapterDetector) -> Self {
        self.chapter_detector = Some(detector);
        self
    }

    pub fn with_detector(mut self, detector: impl SplitPointDetector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn with_processor(mut self, processor: impl ChunkProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn configure(&mut self, config: SegmenterConfig) {
        warn_on_sizes(&config);
        self.config = config;
    }

    pub fn set_process_chapters_separately(&mut self, enabled: bool) {
        self.config.process_chapters_separately = enabled;
    }

    pub fn chapter_detector(&self) -> Option<&ChapterDetector> {
        self.chapter_detector.as_ref()
    }

    /// Replace the expected chapter titles, adding a default chapter detector if needed.
    pub fn set_chapter_titles(&mut self, titles: Vec<String>) -> Result<()> {
        match &mut self.chapter_detector {
            Some(detector) => detector.set_titles(titles),
            None => {
                self.chapter_detector = Some(ChapterDetector::with_titles(titles)?);
                Ok(())
            }
        }
    }

    /// Names of all registered plugins, chapter detector first.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.chapter_detector
            .iter()
            .map(|d| d.name())
            .chain(self.detectors.iter().map(|d| d.name()))
            .chain(self.processors.iter().map(|p| p.name()))
            .collect()
    }

    /// Merge a partial JSON config into the named detector or processor.
    pub fn configure_plugin(&mut self, name: &str, patch: &Value) -> Result<()> {
        if name == chapter::NAME {
            if let Some(detector) = &mut self.chapter_detector {
                return detector.configure(patch);
            }
        }
        if let Some(detector) = self.detectors.iter_mut().find(|d| d.name() == name) {
            return detector.configure(patch);
        }
        if let Some(processor) = self.processors.iter_mut().find(|p| p.name() == name) {
            return processor.configure(patch);
        }
        Err(SegmentError::UnknownPlugin(name.to_string()))
    }

    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.configure_plugin(name, &serde_json::json!({ "enabled": enabled }))
    }

    /// Segment a document. Errors and panics from plugins are captured in the result.
    pub async fn process(&self, text: &str) -> SegmentationResult {
        match AssertUnwindSafe(self.try_process(text)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!("Segmentation failed: {}", err);
                SegmentationResult::failed(err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Segmentation panicked: {}", message);
                SegmentationResult::failed(SegmentError::Panicked(message))
            }
        }
    }

    /// Segment a document, propagating the first plugin error.
    pub async fn try_process(&self, text: &str) -> Result<SegmentationResult> {
        let (mut chunks, chapters) = self.raw_chunks(text)?;
        let raw_count = chunks.len();

        for processor in self.processors.iter().filter(|p| p.is_enabled()) {
            chunks = processor.process(chunks, text).await?;
            debug!("Processor '{}' produced {} chunks", processor.name(), chunks.len());
        }
        renumber_chapter_chunks(&mut chunks);

        if self.config.debug {
            info!(
                "Segmented {} chars into {} raw / {} final chunks across {} chapters",
                text.chars().count(),
                raw_count,
                chunks.len(),
                chapters.len()
            );
        }

        Ok(SegmentationResult {
            chunks,
            chapters,
            error: None,
        })
    }

    /// Chunk a document without running processors.
    pub fn raw_chunks(&self, text: &str) -> Result<(Vec<TextChunk>, Vec<Chapter>)> {
        let index = TextIndex::new(text);

        if self.config.process_chapters_separately {
            if let Some(detector) = self.active_chapter_detector() {
                let chapters = locate_chapters(detector, &index)?;
                if !chapters.is_empty() {
                    let chunks = self.chunk_chapters(&index, &chapters)?;
                    return Ok((chunks, chapters));
                }
                debug!("No chapters located, processing whole document");
            }
        }

        let chunks = self.chunk_scope(&index, 0, index.char_len(), true)?;
        Ok((chunks, Vec::new()))
    }

    /// Locate chapters with the registered chapter detector.
    pub fn locate_chapters(&self, text: &str) -> Result<Vec<Chapter>> {
        match self.active_chapter_detector() {
            Some(detector) => locate_chapters(detector, &TextIndex::new(text)),
            None => Ok(Vec::new()),
        }
    }

    fn active_chapter_detector(&self) -> Option<&ChapterDetector> {
        self.chapter_detector
            .as_ref()
            .filter(|d| d.is_enabled() && d.has_titles())
    }

    fn chunk_chapters(&self, index: &TextIndex, chapters: &[Chapter]) -> Result<Vec<TextChunk>> {
        let mut chunks = Vec::new();

        if let Some(first) = chapters.first() {
            if first.position.start > 0 {
                chunks.extend(self.chunk_scope(index, 0, first.position.start, false)?);
            }
        }

        for (chapter_index, chapter) in chapters.iter().enumerate() {
            let body_start = chapter.position.start + title_prefix_len(&chapter.content);
            let body = self.chunk_scope(index, body_start, chapter.position.end, false)?;
            debug!(
                "Chapter {} '{}': {} chunks",
                chapter_index,
                chapter.title,
                body.len()
            );
            chunks.extend(
                body.into_iter()
                    .enumerate()
                    .map(|(i, chunk)| chunk.with_chapter(chapter.info(chapter_index, i))),
            );
        }

        Ok(chunks)
    }

    /// Chunk `[start, end)` of the document and return chunks in document coordinates.
    fn chunk_scope(
        &self,
        index: &TextIndex,
        start: usize,
        end: usize,
        include_chapters: bool,
    ) -> Result<Vec<TextChunk>> {
        let scope = index.slice(start, end);
        let points = self.collect_split_points(scope, include_chapters)?;
        let chunks = build_chunks(
            scope,
            &points,
            self.config.min_chunk_size,
            self.config.max_chunk_size,
        );

        Ok(chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.position = chunk.position.offset(start);
                chunk
            })
            .collect())
    }

    fn collect_split_points(&self, text: &str, include_chapters: bool) -> Result<Vec<SplitPoint>> {
        let mut points = Vec::new();

        if include_chapters {
            if let Some(detector) = self.active_chapter_detector() {
                points.extend(detector.detect(text)?);
            }
        }
        for detector in self.detectors.iter().filter(|d| d.is_enabled()) {
            let found = detector.detect(text)?;
            debug!("Detector '{}' found {} split points", detector.name(), found.len());
            points.extend(found);
        }

        // stable: equal (position, priority) keeps registration order
        points.sort_by_key(|p| (p.position, p.priority));
        Ok(points)
    }
}

fn warn_on_sizes(config: &SegmenterConfig) {
    if config.min_chunk_size > config.max_chunk_size {
        warn!(
            "min_chunk_size ({}) exceeds max_chunk_size ({}); every span will be force-split",
            config.min_chunk_size, config.max_chunk_size
        );
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Derive chapters from chapter split points. The last chapter runs to the end of the text.
fn locate_chapters(detector: &ChapterDetector, index: &TextIndex) -> Result<Vec<Chapter>> {
    let points = detector.detect(index.text())?;
    let len = index.char_len();

    Ok(points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let start = point.position;
            let end = points.get(i + 1).map_or(len, |next| next.position);
            Chapter {
                id: format!("ch{}", i),
                title: point.title().unwrap_or(&point.marker).to_string(),
                position: Position::new(start, end),
                content: index.slice(start, end).to_string(),
            }
        })
        .collect())
}

/// Characters taken by the title line and any blank lines right after it.
fn title_prefix_len(content: &str) -> usize {
    let Some(newline) = content.find('\n') else {
        return content.chars().count();
    };

    let mut consumed = content[..=newline].chars().count();
    let mut rest = &content[newline + 1..];
    while let Some(i) = rest.find('\n') {
        if !rest[..i].trim().is_empty() {
            break;
        }
        consumed += rest[..=i].chars().count();
        rest = &rest[i + 1..];
    }
    consumed
}

/// Keep `chapter.chunk_index` the ordinal within each chapter after processors ran.
fn renumber_chapter_chunks(chunks: &mut [TextChunk]) {
    let mut counters: HashMap<String, usize> = HashMap::new();
    for chunk in chunks.iter_mut() {
        if let Some(chapter) = &mut chunk.chapter {
            let counter = counters.entry(chapter.id.clone()).or_insert(0);
            chapter.chunk_index = *counter;
            *counter += 1;
        }
    }
}

/// Greedy chunk builder over sorted split points.
///
/// A point closes the current chunk when the span since the last cut is within
/// `[min_size, max_size]`. Shorter spans keep accumulating. Longer spans are force-split into
/// `max_size` slices. Whatever follows the last cut becomes an end-of-text chunk regardless of
/// its size. Chunks are trimmed and whitespace-only spans are dropped.
pub fn build_chunks(
    text: &str,
    points: &[SplitPoint],
    min_size: usize,
    max_size: usize,
) -> Vec<TextChunk> {
    let index = TextIndex::new(text);
    let len = index.char_len();
    let mut chunks = Vec::new();
    let mut current = 0;

    for point in points {
        if point.position <= current || point.position > len {
            continue;
        }
        let size = point.position - current;

        if size >= min_size && size <= max_size {
            if let Some(chunk) = make_chunk(&index, current, point.position) {
                chunks.push(
                    chunk
                        .with_metadata(keys::SPLIT_PRIORITY, point.priority.as_str())
                        .with_metadata(keys::MARKER, point.marker.as_str()),
                );
            }
            current = point.position;
        } else if size > max_size {
            debug!(
                "Force-splitting {} chars at [{}, {})",
                size, current, point.position
            );
            force_split(&index, &mut chunks, current, point.position, min_size, max_size);
            current = point.position;
        }
    }

    if current < len {
        if let Some(chunk) = make_chunk(&index, current, len) {
            chunks.push(chunk.with_metadata(keys::END_OF_TEXT, true));
        }
    }

    chunks
}

fn make_chunk(index: &TextIndex, start: usize, end: usize) -> Option<TextChunk> {
    let (start, end) = index.trimmed_span(start, end);
    if start == end {
        return None;
    }
    Some(TextChunk::new(index.slice(start, end), Position::new(start, end)))
}

/// Cut `[start, end)` into slices of at most `max_size`, moving each cut back to the nearest
/// whitespace that lies more than `min_size` into the slice.
fn force_split(
    index: &TextIndex,
    chunks: &mut Vec<TextChunk>,
    start: usize,
    end: usize,
    min_size: usize,
    max_size: usize,
) {
    let max_size = max_size.max(1);
    let mut cursor = start;

    while end - cursor > max_size {
        let limit = cursor + max_size;
        let boundary = if index.char_at(limit).is_some_and(char::is_whitespace) {
            limit
        } else {
            let floor = (cursor + min_size).max(cursor + 1);
            (floor..limit)
                .rev()
                .find(|&i| index.char_at(i).is_some_and(char::is_whitespace))
                .unwrap_or(limit)
        };

        if let Some(chunk) = make_chunk(index, cursor, boundary) {
            chunks.push(chunk.with_metadata(keys::FORCED, true));
        }
        cursor = boundary;
    }

    if let Some(chunk) = make_chunk(index, cursor, end) {
        chunks.push(chunk.with_metadata(keys::FORCED, true));
    }
}

//! Detection source backed by a recorded JSON file.
//!
//! The file holds an array of batches, each batch an array of detections:
//! `[[{"box": {...}, "landmarks": {...}}], []]`.

use crate::detector::{Detection, DetectionSource};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse replay file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<Vec<Detection>>,
    cursor: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<Detection>>, looping: bool) -> Self {
        Self {
            frames,
            cursor: 0,
            looping,
        }
    }

    pub fn from_json(contents: &str, looping: bool) -> Result<Self, ReplayError> {
        let frames: Vec<Vec<Detection>> = serde_json::from_str(contents)?;
        Ok(Self::new(frames, looping))
    }

    pub fn load(path: impl AsRef<Path>, looping: bool) -> Result<Self, ReplayError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents, looping)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl DetectionSource for ReplaySource {
    fn pull_detections(&mut self) -> Vec<Detection> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Vec::new();
            }
            debug!(frames = self.frames.len(), "Replay wrapped around");
            self.cursor = 0;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        frame
    }
}

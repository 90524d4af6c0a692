//! Sensor-side plumbing: the latest-anchor cells written by the tracking
//! stream and read once per tick, plus the recorded frame format.

use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::joints::Chirality;
use crate::skeleton::HandAnchor;

// ── Latest value cell ──────────────────────────────────────

/// Single-slot, most-recent-wins cell.
///
/// Writers overwrite, readers take a cheap `Arc` snapshot. The lock only
/// covers the pointer swap, never any work done with the value.
#[derive(Debug)]
pub struct LatestValue<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> LatestValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ── Anchor source ──────────────────────────────────────────

/// Anything that can report the most recent anchor for a hand.
pub trait HandAnchorSource {
    fn latest(&self, chirality: Chirality) -> Option<Arc<HandAnchor>>;
}

/// One latest-anchor cell per hand.
#[derive(Debug, Default)]
pub struct AnchorCells {
    left: LatestValue<HandAnchor>,
    right: LatestValue<HandAnchor>,
}

impl AnchorCells {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, chirality: Chirality) -> &LatestValue<HandAnchor> {
        match chirality {
            Chirality::Left => &self.left,
            Chirality::Right => &self.right,
        }
    }

    /// Store an anchor in the cell matching its chirality.
    pub fn publish(&self, anchor: HandAnchor) {
        self.cell(anchor.chirality).publish(anchor);
    }

    /// The provider stopped tracking this hand.
    pub fn lose(&self, chirality: Chirality) {
        self.cell(chirality).clear();
    }

    /// Mirror a recorded frame into the cells: present hands are published,
    /// absent ones cleared.
    pub fn apply(&self, frame: &SensorFrame) {
        for chirality in Chirality::BOTH {
            match frame.hand(chirality) {
                Some(anchor) => {
                    let mut anchor = anchor.clone();
                    anchor.chirality = chirality;
                    self.publish(anchor);
                }
                None => self.lose(chirality),
            }
        }
    }
}

impl HandAnchorSource for AnchorCells {
    fn latest(&self, chirality: Chirality) -> Option<Arc<HandAnchor>> {
        self.cell(chirality).snapshot()
    }
}

// ── Recorded frames ────────────────────────────────────────

/// Everything the provider reported at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Wall-clock seconds.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<HandAnchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<HandAnchor>,
}

impl SensorFrame {
    pub fn hand(&self, chirality: Chirality) -> Option<&HandAnchor> {
        match chirality {
            Chirality::Left => self.left.as_ref(),
            Chirality::Right => self.right.as_ref(),
        }
    }
}

/// Parse a JSON Lines recording. Blank lines and `#` comments are skipped.
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<SensorFrame>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let frame = serde_json::from_str(trimmed).map_err(|source| Error::Frame {
            line: i + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

//! Turns the best similarity score into a publish decision.
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use log::*;
use serde::Serialize;
use service::config::{Config, DEFAULT_BLOCK_THRESHOLD, DEFAULT_WARNING_THRESHOLD};

/// Similarity cut-offs. `warning < block`, both within [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    block: f64,
    warning: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            block: DEFAULT_BLOCK_THRESHOLD,
            warning: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(block: f64, warning: f64) -> Result<Self, Error> {
        let in_unit_interval = |value: f64| (0.0..=1.0).contains(&value);

        if !in_unit_interval(block) || !in_unit_interval(warning) || warning >= block {
            warn!("Rejecting similarity thresholds block={block}, warning={warning}");
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            });
        }

        Ok(Self { block, warning })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            config.similarity_block_threshold,
            config.similarity_warning_threshold,
        )
    }

    pub fn block(&self) -> f64 {
        self.block
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn in_warning_band(&self, best_score: f64) -> bool {
        best_score >= self.warning && best_score < self.block
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Warn,
    Block,
}

/// Decision for a new submission. Forcing only ever overrides a warning.
pub fn decide(best_score: f64, force_publish: bool, thresholds: &Thresholds) -> Decision {
    if best_score >= thresholds.block {
        Decision::Block
    } else if thresholds.in_warning_band(best_score) && !force_publish {
        Decision::Warn
    } else {
        Decision::Allow
    }
}

/// Decision for an edit of an existing idea. There is no warning tier.
pub fn decide_on_edit(best_score: f64, thresholds: &Thresholds) -> Decision {
    if best_score >= thresholds.block {
        Decision::Block
    } else {
        Decision::Allow
    }
}

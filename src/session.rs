//! Conversion session state
//!
//! All mutable state of one user session lives in [`Session`]. Transitions are
//! synchronous; the async work happens in [`crate::app::App`], which stamps
//! every attempt with the generation it started in so that outcomes arriving
//! after a reset or re-upload can be discarded.

use crate::error::{ErrorKind, ValidationError};
use crate::models::UploadedImage;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

/// How long the "copied" acknowledgement stays visible.
pub const COPY_ACK_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted(String),
    Failed { kind: ErrorKind, message: String },
}

impl ConversionOutcome {
    pub fn from_error(error: &Error) -> Self {
        ConversionOutcome::Failed {
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    Converting,
    Settled(ConversionOutcome),
}

/// Work handed out by [`Session::begin_conversion`].
#[derive(Debug, Clone)]
pub struct Attempt {
    pub generation: u64,
    pub image: UploadedImage,
    pub instructions: String,
}

#[derive(Debug, Default)]
pub struct Session {
    image: Option<UploadedImage>,
    preview: Option<String>,
    instructions: String,
    state: ConversionState,
    copied_at: Option<Instant>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn is_converting(&self) -> bool {
        matches!(self.state, ConversionState::Converting)
    }

    pub fn result(&self) -> Option<&str> {
        match &self.state {
            ConversionState::Settled(ConversionOutcome::Converted(latex)) => Some(latex),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ConversionState::Settled(ConversionOutcome::Failed { message, .. }) => Some(message),
            _ => None,
        }
    }

    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = instructions.into();
    }

    /// Starts a new upload: drops the previous image and any output, and
    /// invalidates work still in flight. Returns the new generation.
    pub fn begin_upload(&mut self) -> u64 {
        self.generation += 1;
        self.image = None;
        self.preview = None;
        self.state = ConversionState::Idle;
        self.copied_at = None;
        self.generation
    }

    /// Installs a validated image. Ignored if the session moved on since the
    /// upload began.
    pub fn accept_upload(&mut self, generation: u64, image: UploadedImage, preview: String) -> bool {
        if generation != self.generation {
            tracing::debug!("Discarding upload from stale generation {}", generation);
            return false;
        }
        self.image = Some(image);
        self.preview = Some(preview);
        self.state = ConversionState::Idle;
        true
    }

    pub fn reject_upload(&mut self, generation: u64, error: &Error) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = ConversionState::Settled(ConversionOutcome::from_error(error));
        true
    }

    /// Moves to `Converting`, clearing the previous result and error.
    ///
    /// Fails with [`Error::ConversionInProgress`] if an attempt is already
    /// running, leaving it untouched. Without an image the session settles
    /// with the missing-file validation error.
    pub fn begin_conversion(&mut self) -> Result<Attempt> {
        if self.is_converting() {
            return Err(Error::ConversionInProgress);
        }

        let Some(image) = self.image.clone() else {
            let error = Error::Validation(ValidationError::MissingFile);
            self.state = ConversionState::Settled(ConversionOutcome::from_error(&error));
            return Err(error);
        };

        self.state = ConversionState::Converting;
        self.copied_at = None;

        Ok(Attempt {
            generation: self.generation,
            image,
            instructions: self.instructions.clone(),
        })
    }

    /// Records the outcome of an attempt. Returns `false`, leaving the
    /// session untouched, when the attempt belongs to an older generation.
    pub fn settle(&mut self, generation: u64, outcome: &Result<String>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Discarding outcome of stale generation {} (current {})",
                generation,
                self.generation
            );
            return false;
        }

        self.state = ConversionState::Settled(match outcome {
            Ok(latex) => ConversionOutcome::Converted(latex.clone()),
            Err(e) => ConversionOutcome::from_error(e),
        });
        true
    }

    /// Shows the copy acknowledgement from `now`. Ignored when the copy was
    /// started before a reset or re-upload.
    pub fn mark_copied(&mut self, generation: u64, now: Instant) -> bool {
        if generation != self.generation {
            tracing::debug!("Discarding copy acknowledgement of stale generation {}", generation);
            return false;
        }
        self.copied_at = Some(now);
        true
    }

    /// Whether the copy acknowledgement is still showing at `now`.
    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_ACK_DURATION)
    }

    /// Returns to a blank session and invalidates in-flight work. Idempotent.
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.image = None;
        self.preview = None;
        self.instructions.clear();
        self.state = ConversionState::Idle;
        self.copied_at = None;
        self.generation
    }
}

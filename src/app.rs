//! Application controller tying uploads, conversion, and copying together.

use crate::ai::{ConversionMode, ConversionService, DemoClient, MessagesClient};
use crate::clipboard::ClipboardChain;
use crate::error::ValidationError;
use crate::image::{self, UploadCandidate};
use crate::models::{Config, UploadedImage};
use crate::session::{ConversionState, Session};
use crate::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

/// Point-in-time view of the session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub file_name: Option<String>,
    pub preview: Option<String>,
    pub instructions: String,
    pub state: ConversionState,
    pub copied: bool,
}

impl SessionSnapshot {
    pub fn is_converting(&self) -> bool {
        matches!(self.state, ConversionState::Converting)
    }
}

/// Owns the session and the services acting on it.
pub struct App {
    converter: Box<dyn ConversionService>,
    clipboard: ClipboardChain,
    session: Mutex<Session>,
    generation_tx: watch::Sender<u64>,
    max_upload_bytes: u64,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub converter: Box<dyn ConversionService>,
    pub clipboard: ClipboardChain,
}

impl App {
    pub fn with_services(services: AppServices, max_upload_bytes: u64) -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            converter: services.converter,
            clipboard: services.clipboard,
            session: Mutex::new(Session::new()),
            generation_tx,
            max_upload_bytes,
        }
    }

    /// Construct an app from configuration. Without a credential the demo
    /// client is used.
    pub fn new(config: &Config) -> Result<Self> {
        let converter: Box<dyn ConversionService> = if config.is_demo() {
            info!("No API key configured, running in demo mode");
            Box::new(DemoClient::new())
        } else {
            info!("Live mode (model: {})", config.model);
            Box::new(MessagesClient::from_config(config)?)
        };

        Ok(Self::with_services(
            AppServices {
                converter,
                clipboard: ClipboardChain::platform(),
            },
            config.max_upload_bytes(),
        ))
    }

    pub fn mode(&self) -> ConversionMode {
        self.converter.mode()
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_generation(&self, generation: u64) {
        self.generation_tx.send_replace(generation);
    }

    /// Resolves once the published generation differs from `generation`.
    async fn superseded(&self, generation: u64) {
        let mut rx = self.generation_tx.subscribe();
        loop {
            if *rx.borrow_and_update() != generation {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            file_name: session.image().map(|image| image.name.clone()),
            preview: session.preview().map(str::to_string),
            instructions: session.instructions().to_string(),
            state: session.state().clone(),
            copied: session.is_copied(Instant::now()),
        }
    }

    /// Replaces the active image. Prior output is cleared before validation
    /// runs; on failure the session holds the error and no image.
    pub async fn upload(&self, candidate: Option<UploadCandidate>) -> Result<()> {
        let generation = {
            let mut session = self.session();
            let generation = session.begin_upload();
            self.publish_generation(generation);
            generation
        };

        let outcome = self.load(candidate.as_ref()).await;

        let mut session = self.session();
        match outcome {
            Ok((image, preview)) => {
                info!("Accepted {} ({}, {} bytes)", image.name, image.format, image.size);
                session.accept_upload(generation, image, preview);
                Ok(())
            }
            Err(e) => {
                warn!("Upload rejected: {}", e);
                session.reject_upload(generation, &e);
                Err(e)
            }
        }
    }

    async fn load(&self, candidate: Option<&UploadCandidate>) -> Result<(UploadedImage, String)> {
        let Some(candidate) = candidate else {
            return Err(ValidationError::MissingFile.into());
        };
        let format = image::validate(Some(candidate), self.max_upload_bytes)?;

        let image = UploadedImage {
            name: candidate.name.clone(),
            format,
            size: candidate.size,
            handle: candidate.handle.clone(),
        };
        let preview = image::read_preview(&image).await?;
        Ok((image, preview))
    }

    pub fn set_instructions(&self, instructions: impl Into<String>) {
        self.session().set_instructions(instructions);
    }

    /// Runs one conversion attempt for the active image.
    ///
    /// The attempt is abandoned with [`Error::Cancelled`] as soon as a reset or
    /// new upload moves the session to another generation.
    pub async fn convert(&self) -> Result<String> {
        let attempt = self.session().begin_conversion()?;

        let outcome = tokio::select! {
            outcome = self.converter.convert(&attempt.image, &attempt.instructions) => outcome,
            _ = self.superseded(attempt.generation) => {
                info!("Conversion of {} cancelled", attempt.image.name);
                return Err(Error::Cancelled);
            }
        };

        let applied = self.session().settle(attempt.generation, &outcome);
        if !applied {
            return Err(Error::Cancelled);
        }

        match &outcome {
            Ok(latex) => info!("Conversion produced {} chars", latex.len()),
            Err(e) => warn!("Conversion failed: {}", e),
        }
        outcome
    }

    /// Copies the current result. Returns `true` if some clipboard accepted
    /// it and the session was not reset meanwhile; failures are only logged.
    pub async fn copy(&self) -> bool {
        let (generation, latex) = {
            let session = self.session();
            match session.result() {
                Some(latex) => (session.generation(), latex.to_string()),
                None => return false,
            }
        };

        match self.clipboard.copy(&latex).await {
            Some(via) => {
                info!("Copied result via {} clipboard", via);
                self.session().mark_copied(generation, Instant::now())
            }
            None => {
                warn!("Could not copy result to any clipboard");
                false
            }
        }
    }

    pub fn reset(&self) {
        let mut session = self.session();
        let generation = session.reset();
        self.publish_generation(generation);
        info!("Session reset");
    }
}

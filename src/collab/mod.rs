//! Clients for the two external collaborators: the content-retrieval service that
//! turns a URL into page text, and the extraction service that turns free text
//! into a candidate recipe.

mod extraction;
mod http;
mod retrieval;

use std::thread;
use std::time::Duration;

use thiserror::Error;

#[cfg(test)]
pub use extraction::ExtractedIngredient;
pub use extraction::{ExtractionRequest, ExtractionResponse, RecipeExtractor, accept_extraction};
pub use http::HttpCollaborator;
pub use retrieval::ContentRetriever;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service} endpoint is not configured")]
    NotConfigured { service: &'static str },
    #[error("{service} request timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },
    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{service} reported failure: {message}")]
    Unsuccessful {
        service: &'static str,
        message: String,
    },
}

impl CollaboratorError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Fixed pause after every collaborator call, applied whether or not the call succeeded.
pub fn pause_after_call(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

//! Remote answer feedback
//!
//! This module provides:
//! - An HTTP client for the feedback endpoint
//! - A worker pipeline running requests off the controller thread

pub mod client;
pub mod pipeline;

pub use client::FeedbackClient;
pub use pipeline::{FeedbackBackend, FeedbackCommand, FeedbackPipeline, PipelineSubmitter};

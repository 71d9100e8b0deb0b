//! Feedback pipeline
//!
//! A worker thread owning a tokio runtime and the HTTP client. Requests
//! arrive over a channel and each one runs as its own task; results go back
//! into the session as [`SessionEvent::FeedbackReady`] /
//! [`SessionEvent::FeedbackFailed`] in completion order. Requests still in
//! flight at shutdown are dropped with the runtime.

use crate::feedback::client::FeedbackClient;
use crate::integration::config::FeedbackConfig;
use crate::session::{EventSink, SessionEvent, Ticket};
use crate::{CoachError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// Commands that can be sent to the feedback pipeline
#[derive(Debug, Clone)]
pub enum FeedbackCommand {
    /// Critique one answer
    Request {
        request: Ticket,
        question: String,
        answer: String,
    },

    /// Shutdown the pipeline
    Shutdown,
}

/// Where the orchestrator sends feedback requests.
///
/// Implementations must eventually post exactly one of
/// `FeedbackReady`/`FeedbackFailed` for every accepted request.
pub trait FeedbackBackend: Send {
    fn submit(
        &mut self,
        request: Ticket,
        question: String,
        answer: String,
        sink: &EventSink,
    ) -> Result<()>;

    /// Release worker resources
    fn shutdown(&mut self) {}
}

/// Feedback pipeline with channel-based communication
pub struct FeedbackPipeline {
    config: FeedbackConfig,
    command_tx: Sender<FeedbackCommand>,
    command_rx: Receiver<FeedbackCommand>,
}

impl FeedbackPipeline {
    pub fn new(config: FeedbackConfig) -> Self {
        let (command_tx, command_rx) = bounded(16);
        Self {
            config,
            command_tx,
            command_rx,
        }
    }

    /// Backend handle that forwards requests to this pipeline
    pub fn submitter(&self) -> PipelineSubmitter {
        PipelineSubmitter {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Start the pipeline worker thread
    pub fn start_worker(self, sink: EventSink) -> Result<JoinHandle<()>> {
        let config = self.config;
        let command_rx = self.command_rx;

        let handle = thread::Builder::new()
            .name("feedback-pipeline".to_string())
            .spawn(move || {
                info!("Feedback pipeline worker starting");

                let setup = Runtime::new()
                    .map_err(|e| CoachError::ConfigError(format!("runtime creation failed: {}", e)))
                    .and_then(|runtime| Ok((runtime, FeedbackClient::new(&config)?)));

                let (runtime, client) = match setup {
                    Ok(parts) => parts,
                    Err(e) => {
                        error!("Failed to initialize feedback pipeline: {}", e);
                        // Fail every request instead of leaving the session waiting
                        drain_with_error(&command_rx, &sink, e);
                        return;
                    }
                };

                info!("Feedback pipeline worker ready ({})", client.endpoint());

                loop {
                    match command_rx.recv() {
                        Ok(FeedbackCommand::Request {
                            request,
                            question,
                            answer,
                        }) => {
                            debug!("Processing feedback request {}", request);
                            // Requests run concurrently; an abandoned slow one
                            // must not hold back the answer being waited on
                            let client = client.clone();
                            let sink = sink.clone();
                            runtime.spawn(async move {
                                let event = match client.get_feedback(&question, &answer).await {
                                    Ok(feedback) => SessionEvent::FeedbackReady { request, feedback },
                                    Err(error) => {
                                        warn!("Feedback request {} failed: {}", request, error);
                                        SessionEvent::FeedbackFailed { request, error }
                                    }
                                };
                                sink.emit(event);
                            });
                        }
                        Ok(FeedbackCommand::Shutdown) => {
                            info!("Feedback pipeline worker shutting down");
                            break;
                        }
                        Err(e) => {
                            debug!("Feedback command channel closed: {}", e);
                            break;
                        }
                    }
                }

                info!("Feedback pipeline worker stopped");
            })
            .map_err(|e| CoachError::ChannelError(format!("failed to spawn worker: {}", e)))?;

        Ok(handle)
    }
}

fn drain_with_error(command_rx: &Receiver<FeedbackCommand>, sink: &EventSink, error: CoachError) {
    while let Ok(command) = command_rx.recv() {
        match command {
            FeedbackCommand::Request { request, .. } => sink.emit(SessionEvent::FeedbackFailed {
                request,
                error: error.clone(),
            }),
            FeedbackCommand::Shutdown => break,
        }
    }
}

/// Sends requests to a running [`FeedbackPipeline`]
#[derive(Clone)]
pub struct PipelineSubmitter {
    command_tx: Sender<FeedbackCommand>,
}

impl FeedbackBackend for PipelineSubmitter {
    fn submit(
        &mut self,
        request: Ticket,
        question: String,
        answer: String,
        _sink: &EventSink,
    ) -> Result<()> {
        self.command_tx
            .send(FeedbackCommand::Request {
                request,
                question,
                answer,
            })
            .map_err(|e| CoachError::ChannelError(format!("feedback pipeline gone: {}", e)))
    }

    fn shutdown(&mut self) {
        let _ = self.command_tx.send(FeedbackCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_unreachable_service_reports_failure() {
        let config = FeedbackConfig {
            endpoint: "http://127.0.0.1:9/api/get-feedback".to_string(),
            timeout_secs: 2,
        };
        let pipeline = FeedbackPipeline::new(config);
        let mut submitter = pipeline.submitter();

        let (tx, rx) = unbounded();
        let sink = EventSink::new(tx);
        let handle = pipeline.start_worker(sink.clone()).unwrap();

        submitter
            .submit(3, "q".into(), "a".into(), &sink)
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            SessionEvent::FeedbackFailed { request, error } => {
                assert_eq!(request, 3);
                assert!(matches!(error, CoachError::NetworkError(_)));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        submitter.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pipeline = FeedbackPipeline::new(FeedbackConfig::default());
        let mut submitter = pipeline.submitter();
        drop(pipeline);

        let (tx, _rx) = unbounded();
        let err = submitter
            .submit(1, "q".into(), "a".into(), &EventSink::new(tx))
            .unwrap_err();
        assert!(matches!(err, CoachError::ChannelError(_)));
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use interview_coach::integration::{InterviewConfig, OrchestratorBuilder};
use interview_coach::speech::{
    AnswerKeyboard, RecognitionConfig, SpeechInput, SpeechOutput, TextSpeaker, TypedAnswerInput,
};
use interview_coach::ui::{InterviewApp, TerminalApp};
use parking_lot::Mutex;
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Spoken mock-interview practice with remote answer feedback
#[derive(Parser)]
#[command(name = "interview-coach", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Question bank JSON file (overrides the config file).
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Feedback endpoint URL (overrides the config file).
    #[arg(long)]
    endpoint: Option<String>,

    /// Answer time limit in seconds, 0 to disable.
    #[arg(long)]
    time_limit: Option<u32>,

    /// Language tag for speech, e.g. en-US.
    #[arg(long)]
    language: Option<String>,

    /// Playback rate for questions (1.0 = normal).
    #[arg(long)]
    rate: Option<f32>,

    /// Fixed shuffle seed, for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,

    /// Run in the terminal instead of opening a window.
    #[arg(long)]
    console: bool,
}

/// Speech engines picked for this run. `keyboard` is set when answers are
/// typed rather than spoken.
struct SpeechAdapters {
    output: Box<dyn SpeechOutput>,
    input: Box<dyn SpeechInput>,
    keyboard: Option<AnswerKeyboard>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_coach=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    info!("Starting interview coach");
    info!("Questions: {}", config.questions_path.display());
    info!("Feedback endpoint: {}", config.feedback.endpoint);

    let console = Arc::new(Mutex::new(std::io::stdout()));
    let adapters = speech_adapters(&config, &console);

    let mut builder = OrchestratorBuilder::new()
        .with_config(config)
        .with_speech_output(adapters.output)
        .with_speech_input(adapters.input);
    if let Some(seed) = cli.seed {
        builder = builder.with_seed(seed);
    }

    let (orchestrator, handle) = builder.build().context("invalid configuration")?;
    let workers = orchestrator.start().context("failed to start orchestrator")?;

    if cli.console {
        let mut app = TerminalApp::new(handle, console);
        if let Some(keyboard) = adapters.keyboard {
            app = app.with_keyboard(keyboard);
        }
        app.run(std::io::stdin().lock())?;
    } else {
        let keyboard = adapters.keyboard;
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([800.0, 600.0])
                .with_min_inner_size([400.0, 300.0])
                .with_title("Interview Coach"),
            ..Default::default()
        };
        eframe::run_native(
            "Interview Coach",
            options,
            Box::new(move |cc| Ok(Box::new(InterviewApp::new(cc, handle, keyboard)))),
        )
        .map_err(|e| anyhow::anyhow!("window failed: {}", e))?;
    }

    for worker in workers {
        if worker.join().is_err() {
            warn!("Worker thread panicked during shutdown");
        }
    }

    info!("Goodbye");
    Ok(())
}

fn text_adapters(config: &InterviewConfig, console: &Arc<Mutex<Stdout>>) -> SpeechAdapters {
    let (recognizer, keyboard) = TypedAnswerInput::new(RecognitionConfig::from(&config.speech));
    SpeechAdapters {
        output: Box::new(TextSpeaker::shared(
            Arc::clone(console),
            config.speech.reading_pace_ms_per_char,
        )),
        input: Box::new(recognizer),
        keyboard: Some(keyboard),
    }
}

#[cfg(feature = "audio-io")]
fn speech_adapters(config: &InterviewConfig, console: &Arc<Mutex<Stdout>>) -> SpeechAdapters {
    use interview_coach::speech::{VitsSpeaker, WhisperInput};

    let mut adapters = text_adapters(config, console);

    if config.audio.has_synthesis() {
        match VitsSpeaker::start(&config.audio) {
            Ok(speaker) => adapters.output = Box::new(speaker),
            Err(e) => warn!("Spoken questions unavailable, printing them instead: {}", e),
        }
    }
    if config.audio.has_recognition() {
        match WhisperInput::new(&config.audio, &config.speech) {
            Ok(recognizer) => {
                adapters.input = Box::new(recognizer);
                adapters.keyboard = None;
            }
            Err(e) => warn!("Spoken answers unavailable, typing them instead: {}", e),
        }
    }
    adapters
}

#[cfg(not(feature = "audio-io"))]
fn speech_adapters(config: &InterviewConfig, console: &Arc<Mutex<Stdout>>) -> SpeechAdapters {
    if config.audio.has_synthesis() || config.audio.has_recognition() {
        warn!("Audio models are configured but this build lacks the audio-io feature");
    }
    text_adapters(config, console)
}

fn build_config(cli: &Cli) -> Result<InterviewConfig> {
    let mut config = match &cli.config {
        Some(path) => InterviewConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => InterviewConfig::default(),
    };

    if let Some(path) = &cli.questions {
        config = config.with_questions(path);
    }
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(secs) = cli.time_limit {
        config = config.with_time_limit(secs);
    }
    if let Some(language) = &cli.language {
        config = config.with_language(language);
    }
    if let Some(rate) = cli.rate {
        config = config.with_rate(rate);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

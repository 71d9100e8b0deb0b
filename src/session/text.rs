//! User-facing status texts

pub const START_PROMPT: &str = "Press Start to begin the interview.";
pub const LOADING_QUESTIONS: &str = "Loading questions...";
pub const READING_QUESTION: &str = "Reading the question aloud...";
pub const READY_TO_ANSWER: &str = "Ready. Press the mic button and answer.";
pub const SYNTHESIS_FAILED: &str = "Could not read the question aloud.";
pub const WAITING_FOR_MIC: &str = "Starting the microphone...";
pub const SPEAK_NOW: &str = "Listening... please answer.";
pub const STOPPING_CAPTURE: &str = "Stopping the microphone...";
pub const CAPTURE_STOPPED: &str = "Stopped listening.";
pub const CAPTURE_ENDED: &str =
    "Speech recognition ended. Press the mic button to answer again.";
pub const TIME_UP: &str = "Time is up.";
pub const GENERATING_FEEDBACK: &str = "Answer recognized. Generating feedback...";
pub const FEEDBACK_READY: &str = "Feedback received. Answer again or go to the next question.";
pub const FEEDBACK_FAILED: &str = "Feedback could not be generated.";
pub const FEEDBACK_FALLBACK: &str = "Could not retrieve feedback.";
pub const INPUT_UNAVAILABLE: &str =
    "Speech input is not available. You can still go through the questions.";
pub const FINISHED_QUESTION: &str = "The interview is over. Well done!";
pub const FINISHED_FEEDBACK: &str = "You have answered every question.";
pub const FINISHED_STATUS: &str = "Interview complete.";

pub fn listening_with_remaining(secs: u32) -> String {
    format!("Listening... {}s left", secs)
}

pub fn recognition_failed(code: &str) -> String {
    format!("Speech recognition error: {}", code)
}

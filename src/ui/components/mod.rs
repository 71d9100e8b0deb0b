//! Widgets making up the interview window

pub mod answer_input;
pub mod control_bar;
pub mod session_regions;

pub use answer_input::AnswerInput;
pub use control_bar::ControlBar;
pub use session_regions::SessionRegions;

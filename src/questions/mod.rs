//! Question source
//!
//! Loads the category → questions document and produces the shuffled
//! sequence an interview session walks through.

pub mod bank;
pub mod shuffle;

pub use bank::{Category, QuestionBank, SelectError};
pub use shuffle::fisher_yates;

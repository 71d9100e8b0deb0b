use crate::questions::shuffle::fisher_yates;
use crate::{CoachError, Result};
use rand::Rng;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Reasons a session sequence cannot be drawn from the bank
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("the selected category has no questions: {0}")]
    EmptyCategory(String),
}

/// One named group of questions, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub questions: Vec<String>,
}

/// Category → question list mapping, immutable after load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    categories: Vec<Category>,
}

impl QuestionBank {
    /// Build a bank from already-parsed categories
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    /// Load the bank from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading question bank from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            CoachError::LoadError(format!("failed to read {}: {}", path.display(), e))
        })?;

        let bank = Self::from_json(&content)?;
        info!(
            "Loaded {} categories ({} questions)",
            bank.categories.len(),
            bank.total_questions()
        );
        Ok(bank)
    }

    /// Parse the bank from a JSON document of the form
    /// `{"category": ["question", ...], ...}`
    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| CoachError::LoadError(format!("invalid JSON: {}", e)))?;

        let Value::Object(map) = value else {
            return Err(CoachError::LoadError(
                "expected an object mapping categories to question lists".to_string(),
            ));
        };

        let mut categories = Vec::with_capacity(map.len());
        for (name, entry) in map {
            let Value::Array(items) = entry else {
                return Err(CoachError::LoadError(format!(
                    "category '{}' is not a list of questions",
                    name
                )));
            };

            let questions = items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text),
                    other => Err(CoachError::LoadError(format!(
                        "category '{}' contains a non-string entry: {}",
                        name, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;

            categories.push(Category { name, questions });
        }

        Ok(Self { categories })
    }

    /// Category names in document order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Questions of one category, if it exists
    pub fn questions(&self, category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.questions.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_questions(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    /// Draw a session sequence: a shuffled copy of one category
    pub fn select_sequence<R: Rng + ?Sized>(
        &self,
        category: &str,
        rng: &mut R,
    ) -> std::result::Result<Vec<String>, SelectError> {
        let questions = self
            .questions(category)
            .ok_or_else(|| SelectError::UnknownCategory(category.to_string()))?;

        if questions.is_empty() {
            return Err(SelectError::EmptyCategory(category.to_string()));
        }

        let mut sequence = questions.to_vec();
        fisher_yates(&mut sequence, rng);
        debug!("Selected {} questions from '{}'", sequence.len(), category);
        Ok(sequence)
    }
}

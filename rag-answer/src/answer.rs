//! The outcome of a single [`ask`](crate::AskPipeline::ask) run.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::document::SourceRef;

/// Why a question could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerError {
    /// The index returned no fragment for the question.
    NoRelevantContext,
    /// A fragment was found but has no owning document.
    NoSourceFound,
}

impl AnswerError {
    /// The wire code, e.g. `no_relevant_context`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoRelevantContext => "no_relevant_context",
            Self::NoSourceFound => "no_source_found",
        }
    }

    /// A message suitable for showing to the person who asked.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoRelevantContext => {
                "Sorry, I could not find relevant information to answer your question."
            }
            Self::NoSourceFound => {
                "I found relevant information, but could not trace the article it came from."
            }
        }
    }
}

impl std::fmt::Display for AnswerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The result of asking a question.
///
/// Serializes to the tagged shapes consumed by the web layer:
///
/// ```json
/// {"answer": "...", "source": {"identity": "...", "title": "...", "link": "..."}}
/// {"answer": "...", "source": {...}, "degraded": true}
/// {"answer": null, "error": "no_relevant_context"}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerResult {
    /// The model answered from the retrieved fragment.
    Answered {
        /// Generated text, returned unchanged.
        answer: String,
        /// The cited document.
        source: SourceRef,
    },
    /// Generation failed and the configured fallback message was used.
    Degraded {
        /// The fallback message.
        answer: String,
        /// The document that would have been cited.
        source: SourceRef,
        /// The generation failure, for logs.
        reason: String,
    },
    /// The pipeline stopped at an early exit.
    Unanswered(AnswerError),
}

impl AnswerResult {
    /// The answer text, if any.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answered { answer, .. } | Self::Degraded { answer, .. } => Some(answer),
            Self::Unanswered(_) => None,
        }
    }

    /// The cited document, if any.
    pub fn source(&self) -> Option<&SourceRef> {
        match self {
            Self::Answered { source, .. } | Self::Degraded { source, .. } => Some(source),
            Self::Unanswered(_) => None,
        }
    }

    /// The early-exit reason, if the question went unanswered.
    pub fn error(&self) -> Option<AnswerError> {
        match self {
            Self::Unanswered(error) => Some(*error),
            _ => None,
        }
    }

    /// Whether the model produced the answer.
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }

    /// Whether the answer is the generation fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl Serialize for AnswerResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Answered { answer, source } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("answer", answer)?;
                map.serialize_entry("source", source)?;
                map.end()
            }
            Self::Degraded { answer, source, .. } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("answer", answer)?;
                map.serialize_entry("source", source)?;
                map.serialize_entry("degraded", &true)?;
                map.end()
            }
            Self::Unanswered(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("answer", &None::<String>)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

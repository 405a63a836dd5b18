//! Interview Tool Contract
//!
//! The interview tool replaces free-text user input with bounded
//! multiple-choice/multi-select turns: the model calls the tool with 1-4
//! structured questions and the frontend renders them as a form.
//!
//! The bounds here are a hard contract, not a UI nicety — the model is the
//! producer of this structure, so the same limits appear both in the JSON
//! schema surfaced through tool calling and in [`validate_interview_input`]
//! which rejects out-of-range payloads at the boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::tools::ToolDefinition;

/// Tool name constant.
pub const INTERVIEW_TOOL_NAME: &str = "interview";

/// Bounds enforced on interview payloads.
pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 4;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;
pub const MAX_HEADER_CHARS: usize = 12;

/// One selectable option of an interview question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterviewOption {
    /// Short label the user self-identifies with, 1-5 words.
    pub label: String,
    pub description: String,
}

/// One structured question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    /// Full question text, ending with a question mark.
    pub question: String,
    /// Short label shown above the question.
    pub header: String,
    pub multi_select: bool,
    pub options: Vec<InterviewOption>,
}

/// Tool input: what the model sends to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterviewInput {
    pub questions: Vec<InterviewQuestion>,
}

/// One answer: a selected label, several labels, or freeform text typed into
/// the frontend's own "other" option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum InterviewAnswer {
    Single(String),
    Multi(Vec<String>),
}

/// Tool output: what the frontend sends back, keyed by question text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterviewOutput {
    pub answers: HashMap<String, InterviewAnswer>,
}

impl InterviewInput {
    /// Deserialize and validate tool arguments in one step.
    pub fn parse(value: &Value) -> CoreResult<Self> {
        let input: InterviewInput = serde_json::from_value(value.clone())?;
        validate_interview_input(&input)?;
        Ok(input)
    }
}

/// Validate interview input against the contract bounds.
pub fn validate_interview_input(input: &InterviewInput) -> CoreResult<()> {
    let count = input.questions.len();
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
        return Err(CoreError::validation(format!(
            "interview requires {}-{} questions, got {}",
            MIN_QUESTIONS, MAX_QUESTIONS, count
        )));
    }

    for question in &input.questions {
        let header_chars = question.header.chars().count();
        if header_chars > MAX_HEADER_CHARS {
            return Err(CoreError::validation(format!(
                "question header must be at most {} characters, got {} ({:?})",
                MAX_HEADER_CHARS, header_chars, question.header
            )));
        }

        let options = question.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options) {
            return Err(CoreError::validation(format!(
                "each question requires {}-{} options, got {}",
                MIN_OPTIONS, MAX_OPTIONS, options
            )));
        }
    }

    Ok(())
}

/// The interview tool definition surfaced to the model.
pub fn interview_tool() -> ToolDefinition {
    ToolDefinition::new(
        INTERVIEW_TOOL_NAME,
        "Present a structured choice interface to clarify ambiguous requirements. \
         Ask 1-4 questions per call, each with a header of at most 12 characters \
         and 2-4 options. Do not generate an \"other\" option; the frontend adds \
         one automatically. Prefer multiSelect=true while exploring and \
         multiSelect=false while converging. Labels should read like something \
         the user would say about themselves, not category names.",
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "minItems": MIN_QUESTIONS,
                    "maxItems": MAX_QUESTIONS,
                    "description": "List of questions to ask, 1-4 items",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {
                                "type": "string",
                                "description": "Full question text, ending with a question mark"
                            },
                            "header": {
                                "type": "string",
                                "maxLength": MAX_HEADER_CHARS,
                                "description": "Short label, at most 12 characters"
                            },
                            "multiSelect": {
                                "type": "boolean",
                                "description": "Whether multiple options may be selected"
                            },
                            "options": {
                                "type": "array",
                                "minItems": MIN_OPTIONS,
                                "maxItems": MAX_OPTIONS,
                                "description": "Selectable options, 2-4 items",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "label": {
                                            "type": "string",
                                            "description": "Option label, 1-5 words"
                                        },
                                        "description": {
                                            "type": "string",
                                            "description": "What picking this option means"
                                        }
                                    },
                                    "required": ["label", "description"]
                                }
                            }
                        },
                        "required": ["question", "header", "multiSelect", "options"]
                    }
                }
            },
            "required": ["questions"]
        }),
    )
}

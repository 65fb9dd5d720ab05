//! # Tools Module
//!
//! Tools the primary model may call mid-stream. Each tool exposes a
//! [`ToolDefinition`] sent with the request, a title shown while the call is
//! pending, and an executor whose result goes back into the prompt history.
//!
//! Tool failures never propagate as errors: they become a [`ToolOutcome::Failed`]
//! that is shown to the user and handed back to the model.

pub mod dice;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use dice::{DiceOutcome, DiceSpec};

/// Function schema advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of running one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Complete {
        /// Shown as the task title once the call finishes.
        summary: String,
        /// Serialized into the `function_call_output` turn.
        output: Value,
    },
    Failed {
        error: String,
        output: Value,
    },
}

impl ToolOutcome {
    fn failed(error: String) -> Self {
        let output = serde_json::json!({ "error": error });
        ToolOutcome::Failed { error, output }
    }

    pub fn output(&self) -> &Value {
        match self {
            ToolOutcome::Complete { output, .. } | ToolOutcome::Failed { output, .. } => output,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Failed { .. })
    }
}

impl From<DiceOutcome> for ToolOutcome {
    fn from(outcome: DiceOutcome) -> Self {
        let output = serde_json::to_value(&outcome).unwrap_or(Value::Null);
        match outcome {
            DiceOutcome::Rolled { description, .. } => ToolOutcome::Complete {
                summary: description,
                output,
            },
            DiceOutcome::Failed { error, .. } => ToolOutcome::Failed { error, output },
        }
    }
}

/// Every tool the primary provider may call.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![dice::definition()]
}

/// Title for the in-progress task shown as soon as the model finishes a call.
///
/// `None` for tools this crate does not know.
pub fn pending_title(name: &str, arguments: &str) -> Option<String> {
    match name {
        dice::TOOL_NAME => {
            let spec = serde_json::from_str::<DiceSpec>(arguments).unwrap_or_default();
            Some(format!("Rolling a {}...", spec.notation()))
        }
        _ => None,
    }
}

/// Execute a tool call with raw JSON arguments.
pub fn execute<R: Rng + ?Sized>(name: &str, arguments: &str, rng: &mut R) -> ToolOutcome {
    match name {
        dice::TOOL_NAME => match serde_json::from_str::<DiceSpec>(arguments) {
            Ok(spec) => dice::roll(spec, rng).into(),
            Err(e) => ToolOutcome::failed(format!("Invalid arguments for {name}: {e}")),
        },
        other => ToolOutcome::failed(format!("Unknown tool: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pending_title_mentions_notation() {
        assert_eq!(
            pending_title("roll_dice", r#"{"sides":20,"count":3}"#).as_deref(),
            Some("Rolling a 3d20...")
        );
        assert_eq!(
            pending_title("roll_dice", "not json").as_deref(),
            Some("Rolling a 1d6...")
        );
        assert!(pending_title("web_search", "{}").is_none());
    }

    #[test]
    fn test_execute_dice() {
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = execute("roll_dice", r#"{"sides":20,"count":3}"#, &mut rng);
        match &outcome {
            ToolOutcome::Complete { summary, output } => {
                assert!(summary.starts_with("Rolled a 3d20 to total"));
                assert_eq!(output["rolls"].as_array().unwrap().len(), 3);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_execute_reports_invalid_dice_inline() {
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = execute("roll_dice", r#"{"sides":1,"count":1}"#, &mut rng);
        assert!(outcome.is_error());
        assert_eq!(outcome.output()["error"], "A die must have at least 2 sides");
        assert_eq!(outcome.output()["total"], 0);
    }

    #[test]
    fn test_execute_rejects_malformed_arguments() {
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = execute("roll_dice", "{sides: twenty}", &mut rng);
        assert!(outcome.is_error());
        assert!(outcome.output()["error"]
            .as_str()
            .unwrap()
            .contains("Invalid arguments"));
    }

    #[test]
    fn test_execute_unknown_tool() {
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = execute("web_search", "{}", &mut rng);
        assert_eq!(
            outcome,
            ToolOutcome::Failed {
                error: "Unknown tool: web_search".to_string(),
                output: serde_json::json!({"error": "Unknown tool: web_search"}),
            }
        );
    }

    #[test]
    fn test_definitions_include_dice() {
        let names: Vec<String> = definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["roll_dice".to_string()]);
    }
}

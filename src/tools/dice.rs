//! Dice Tool - randomized dice outcomes
//!
//! Rolls `count` dice with `sides` faces each. Used as the model-invokable
//! `roll_dice` tool and, through [`roll_from_text`], as the manual parser the
//! fallback provider uses when the model cannot call tools.
//!
//! The random generator is always passed in, so callers can seed it.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ToolDefinition;

/// Tool name the model uses to request a roll.
pub const TOOL_NAME: &str = "roll_dice";

/// Upper bound on dice per roll.
pub const MAX_DICE: i64 = 1000;

/// Upper bound on faces per die.
pub const MAX_SIDES: i64 = 1_000_000;

const DEFAULT_SIDES: i64 = 6;
const DEFAULT_COUNT: i64 = 1;

/// What to roll. Also the tool's argument schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiceSpec {
    #[serde(default = "default_sides")]
    pub sides: i64,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_sides() -> i64 {
    DEFAULT_SIDES
}

fn default_count() -> i64 {
    DEFAULT_COUNT
}

impl Default for DiceSpec {
    fn default() -> Self {
        Self {
            sides: DEFAULT_SIDES,
            count: DEFAULT_COUNT,
        }
    }
}

impl DiceSpec {
    pub fn new(sides: i64, count: i64) -> Self {
        Self { sides, count }
    }

    /// Standard `NdM` notation, e.g. `3d20`.
    pub fn notation(&self) -> String {
        format!("{}d{}", self.count, self.sides)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sides < 2 {
            return Err("A die must have at least 2 sides".to_string());
        }
        if self.count < 1 {
            return Err("Must roll at least 1 die".to_string());
        }
        if self.count > MAX_DICE {
            return Err(format!("Cannot roll more than {MAX_DICE} dice at once"));
        }
        if self.sides > MAX_SIDES {
            return Err(format!("A die cannot have more than {MAX_SIDES} sides"));
        }
        Ok(())
    }
}

/// Result of a roll. Serialized as the tool output handed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DiceOutcome {
    Rolled {
        rolls: Vec<i64>,
        total: i64,
        description: String,
    },
    Failed {
        error: String,
        rolls: Vec<i64>,
        total: i64,
    },
}

impl DiceOutcome {
    fn failed(error: String) -> Self {
        DiceOutcome::Failed {
            error,
            rolls: Vec::new(),
            total: 0,
        }
    }

    pub fn rolls(&self) -> &[i64] {
        match self {
            DiceOutcome::Rolled { rolls, .. } | DiceOutcome::Failed { rolls, .. } => rolls,
        }
    }

    pub fn total(&self) -> i64 {
        match self {
            DiceOutcome::Rolled { total, .. } | DiceOutcome::Failed { total, .. } => *total,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DiceOutcome::Failed { error, .. } => Some(error),
            DiceOutcome::Rolled { .. } => None,
        }
    }

    /// One line for the user: the description, or `Error: ...`.
    pub fn summary(&self) -> String {
        match self {
            DiceOutcome::Rolled { description, .. } => description.clone(),
            DiceOutcome::Failed { error, .. } => format!("Error: {error}"),
        }
    }
}

/// Roll the dice described by `spec`.
///
/// Invalid specs produce [`DiceOutcome::Failed`] without touching `rng`.
pub fn roll<R: Rng + ?Sized>(spec: DiceSpec, rng: &mut R) -> DiceOutcome {
    if let Err(error) = spec.validate() {
        return DiceOutcome::failed(error);
    }

    let rolls: Vec<i64> = (0..spec.count)
        .map(|_| rng.gen_range(1..=spec.sides))
        .collect();
    let total = rolls.iter().sum();

    DiceOutcome::Rolled {
        rolls,
        total,
        description: format!(
            "Rolled a {}d{} to total {}",
            spec.count, spec.sides, total
        ),
    }
}

fn dice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+)d(\d+)").expect("dice pattern is valid"))
}

/// Roll every `NdM` expression found in `text`, in order of appearance.
///
/// Returns `None` when the text holds no dice expression. Numbers too large to
/// represent are reported as errors alongside the other results.
pub fn roll_from_text<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<Vec<DiceOutcome>> {
    let outcomes: Vec<DiceOutcome> = dice_pattern()
        .captures_iter(text)
        .map(|caps| {
            match (caps[1].parse::<i64>(), caps[2].parse::<i64>()) {
                (Ok(count), Ok(sides)) => roll(DiceSpec::new(sides, count), rng),
                _ => DiceOutcome::failed(format!("Cannot roll {}", &caps[0])),
            }
        })
        .collect();

    if outcomes.is_empty() {
        None
    } else {
        Some(outcomes)
    }
}

/// Join outcomes the way they are shown to the user.
pub fn describe_all(outcomes: &[DiceOutcome]) -> String {
    outcomes
        .iter()
        .map(DiceOutcome::summary)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Schema advertised to the primary provider.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Roll one or more dice with a specified number of sides. Use this when \
                      the user wants to roll dice or generate random numbers within a range."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "sides": {
                    "type": "integer",
                    "description": "The number of sides on the die (e.g., 6 for a standard die, 20 for a d20)",
                    "default": DEFAULT_SIDES
                },
                "count": {
                    "type": "integer",
                    "description": "The number of dice to roll",
                    "default": DEFAULT_COUNT
                }
            },
            "required": ["sides", "count"]
        }),
    }
}

use serde_json::{json, Value};

pub const FEEDBACK_ACTION_ID: &str = "feedback";

/// Thumbs up/down buttons attached to every finished answer.
pub fn feedback_block() -> Value {
    json!([
        {
            "type": "context_actions",
            "elements": [
                {
                    "type": "feedback_buttons",
                    "action_id": FEEDBACK_ACTION_ID,
                    "positive_button": {
                        "text": {"type": "plain_text", "text": "Good Response"},
                        "accessibility_label": "Submit positive feedback on this response",
                        "value": "good-feedback"
                    },
                    "negative_button": {
                        "text": {"type": "plain_text", "text": "Bad Response"},
                        "accessibility_label": "Submit negative feedback on this response",
                        "value": "bad-feedback"
                    }
                }
            ]
        }
    ])
}

//! Output contract for schema-constrained evaluations.

use serde_json::{Value, json};

/// Name under which the schema is registered with the completion API.
pub const VALIDATION_RESULT_SCHEMA_NAME: &str = "validation_result";

/// JSON schema of the verdict the strict mode asks the model for.
///
/// Every object lists all of its properties as required and forbids extra ones,
/// which is what strict structured outputs demand.
pub fn validation_result_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "accept": {
                "type": "boolean",
                "description": "Indicates whether the validation is accepted."
            },
            "score": {
                "type": "integer",
                "description": "Score ranging from 0 to 100 representing the quality of validation."
            },
            "issues": {
                "type": "array",
                "description": "List of issues found during validation.",
                "items": {
                    "type": "object",
                    "properties": {
                        "condition": {
                            "type": "string",
                            "description": "The condition that caused the failure."
                        },
                        "description": {
                            "type": "string",
                            "description": "Explanation of why it failed."
                        },
                        "location": {
                            "type": "string",
                            "description": "Specific section in the document where the issue occurred."
                        }
                    },
                    "required": ["condition", "description", "location"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["accept", "score", "issues"],
        "additionalProperties": false
    })
}

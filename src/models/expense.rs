//! Expense request and response types.

use serde::{Deserialize, Deserializer, Serialize};

/// An expense as submitted by a client.
///
/// Missing fields decode to their zero value and `"tags": null` decodes to an
/// empty list, so a partially filled body is still accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseRequest {
    /// Short description of the expense.
    pub title: String,
    /// Amount spent, stored without rounding.
    pub amount: f64,
    /// Free-form note.
    pub note: String,
    /// Ordered tags; order is preserved through storage.
    #[serde(deserialize_with = "nullable_tags")]
    pub tags: Vec<String>,
}

impl ExpenseRequest {
    /// Creates a request with the given title and amount.
    #[must_use]
    pub fn new(title: impl Into<String>, amount: f64) -> Self {
        Self {
            title: title.into(),
            amount,
            ..Default::default()
        }
    }

    /// Sets the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A persisted expense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseResponse {
    /// Identifier assigned by storage on insert. Never changes afterwards.
    pub id: i64,
    /// Short description of the expense.
    pub title: String,
    /// Amount spent.
    pub amount: f64,
    /// Free-form note.
    pub note: String,
    /// Ordered tags.
    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: Vec<String>,
}

impl ExpenseResponse {
    /// Builds the projection of `request` stored under `id`.
    #[must_use]
    pub fn from_request(id: i64, request: &ExpenseRequest) -> Self {
        Self {
            id,
            title: request.title.clone(),
            amount: request.amount,
            note: request.note.clone(),
            tags: request.tags.clone(),
        }
    }
}

fn nullable_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_decodes_all_fields() {
        let req: ExpenseRequest = serde_json::from_value(json!({
            "title": "lunch",
            "amount": 12.5,
            "note": "with team",
            "tags": ["food", "work"]
        }))
        .unwrap();

        assert_eq!(req.title, "lunch");
        assert_eq!(req.amount, 12.5);
        assert_eq!(req.note, "with team");
        assert_eq!(req.tags, vec!["food", "work"]);
    }

    #[test]
    fn test_request_missing_fields_take_zero_values() {
        let req: ExpenseRequest = serde_json::from_str(r#"{"title":"taxi"}"#).unwrap();

        assert_eq!(req, ExpenseRequest::new("taxi", 0.0));
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_request_null_tags_decode_as_empty() {
        let req: ExpenseRequest =
            serde_json::from_str(r#"{"title":"taxi","amount":3,"tags":null}"#).unwrap();
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_request_rejects_wrong_types() {
        assert!(serde_json::from_str::<ExpenseRequest>(r#"{"amount":"ten"}"#).is_err());
        assert!(serde_json::from_str::<ExpenseRequest>(r#"{"tags":"food"}"#).is_err());
        assert!(serde_json::from_str::<ExpenseRequest>("[1,2]").is_err());
    }

    #[test]
    fn test_response_serializes_with_wire_field_names() {
        let req = ExpenseRequest::new("lunch", 12.5)
            .with_tag("food")
            .with_tag("work");
        let resp = ExpenseResponse::from_request(7, &req);

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"id": 7, "title": "lunch", "amount": 12.5, "note": "", "tags": ["food", "work"]})
        );
    }
}

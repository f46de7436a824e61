use serde::{Deserialize, Deserializer, Serialize};

use super::model::{completion, Task};

/// Body of `POST /api/tasks` and `PUT /api/tasks/:id`. On create, title, priority and
/// dueDate are required; on update every field is optional and only present ones are
/// applied.
///
/// `description` distinguishes absent (`None`, leave unchanged) from `null` (`Some(None)`,
/// clear it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "completion::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<bool>,
}

/// Any value that is present, `null` included, becomes `Some`.
fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_accept_legacy_completion() {
        let f: TaskFields = serde_json::from_value(json!({ "completed": "yes" })).unwrap();
        assert_eq!(f.completed, Some(true));
        let f: TaskFields = serde_json::from_value(json!({ "completed": 0 })).unwrap();
        assert_eq!(f.completed, Some(false));
        let f: TaskFields = serde_json::from_value(json!({ "completed": null })).unwrap();
        assert_eq!(f.completed, None);
        let f: TaskFields = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(f.completed, None);
    }

    #[test]
    fn description_null_differs_from_absent() {
        let f: TaskFields = serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(f.description, Some(None));
        let f: TaskFields = serde_json::from_value(json!({ "description": "2 litres" })).unwrap();
        assert_eq!(f.description, Some(Some("2 litres".to_string())));
        let f: TaskFields = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(f.description, None);

        let clear = TaskFields {
            description: Some(None),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&clear).unwrap(), json!({ "description": null }));
    }

    #[test]
    fn fields_serialize_only_present_values() {
        let f = TaskFields {
            title: Some("Buy milk".into()),
            due_date: Some("2026-10-18".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            json!({ "title": "Buy milk", "dueDate": "2026-10-18" })
        );
    }
}

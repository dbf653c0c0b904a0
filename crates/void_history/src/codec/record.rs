//! Persisted form of a single command.

use serde::{Deserialize, Serialize};
use void_scene::ObjectId;

use crate::commands::{Command, CommandError, CommandState};

/// JSON record mirroring a history entry.
///
/// The target is a persistent id; kind-specific before/after fields sit
/// next to the common ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCommand {
    pub kind: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub updatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ObjectId>,
    #[serde(flatten)]
    pub state: CommandState,
}

impl SerializedCommand {
    pub fn from_command(id: u64, display_name: &str, command: &dyn Command) -> Result<Self, CommandError> {
        Ok(Self {
            kind: command.kind().to_string(),
            id,
            display_name: display_name.to_string(),
            updatable: command.updatable(),
            target_id: command.target(),
            state: command.encode()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_layout() {
        let target = ObjectId::new();
        let value = json!({
            "kind": "SetPropertyValue",
            "id": 4,
            "displayName": "Set intensity",
            "updatable": true,
            "targetId": target.to_string(),
            "attribute": "intensity",
            "oldValue": 1.0,
            "newValue": 2.5,
        });

        let record: SerializedCommand = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.target_id, Some(target));
        assert_eq!(record.state.len(), 3);
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_missing_kind_is_an_error() {
        let value = json!({ "displayName": "?" });
        assert!(serde_json::from_value::<SerializedCommand>(value).is_err());
    }
}

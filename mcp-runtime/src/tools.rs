use reqwest::Method;
use serde_json::{Map, Value, json};

use crate::ToolError;

/// Closed set of tools served over the protocol boundary. Adding a tool
/// means extending this enum and the match arms below; the compiler keeps
/// the catalog, validator, translator, and relay vocabulary in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ToolId {
    ListBoards,
    ListLists,
    ListCards,
    GetCard,
    CreateCard,
    UpdateCard,
    MoveCard,
    AddComment,
}

impl ToolId {
    pub(crate) const ALL: [ToolId; 8] = [
        ToolId::ListBoards,
        ToolId::ListLists,
        ToolId::ListCards,
        ToolId::GetCard,
        ToolId::CreateCard,
        ToolId::UpdateCard,
        ToolId::MoveCard,
        ToolId::AddComment,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            ToolId::ListBoards => "trello_list_boards",
            ToolId::ListLists => "trello_list_lists",
            ToolId::ListCards => "trello_list_cards",
            ToolId::GetCard => "trello_get_card",
            ToolId::CreateCard => "trello_create_card",
            ToolId::UpdateCard => "trello_update_card",
            ToolId::MoveCard => "trello_move_card",
            ToolId::AddComment => "trello_add_comment",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        ToolId::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Relay wire vocabulary. Deliberately distinct from the catalog names
    /// so renaming a tool cannot silently change the relay contract.
    pub(crate) fn action_name(self) -> &'static str {
        match self {
            ToolId::ListBoards => "list_boards",
            ToolId::ListLists => "list_lists",
            ToolId::ListCards => "list_cards",
            ToolId::GetCard => "get_card",
            ToolId::CreateCard => "create_card",
            ToolId::UpdateCard => "update_card",
            ToolId::MoveCard => "move_card",
            ToolId::AddComment => "add_comment",
        }
    }

    fn required(self) -> &'static [&'static str] {
        match self {
            ToolId::ListBoards => &[],
            ToolId::ListLists => &["boardId"],
            ToolId::ListCards => &["listId"],
            ToolId::GetCard => &["cardId"],
            ToolId::CreateCard => &["listId", "name"],
            ToolId::UpdateCard => &["cardId"],
            ToolId::MoveCard => &["cardId", "listId"],
            ToolId::AddComment => &["cardId", "text"],
        }
    }
}

#[derive(Debug)]
pub(crate) struct ToolDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) input_schema: Value,
}

pub(crate) fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "trello_list_boards",
            description: "List all Trello boards accessible to the authenticated user",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "trello_list_lists",
            description: "List all lists on a specific Trello board",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "boardId": { "type": "string", "description": "The ID of the Trello board" }
                },
                "required": ["boardId"]
            }),
        },
        ToolDefinition {
            name: "trello_list_cards",
            description: "List all cards in a specific Trello list",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "listId": { "type": "string", "description": "The ID of the Trello list" }
                },
                "required": ["listId"]
            }),
        },
        ToolDefinition {
            name: "trello_get_card",
            description: "Get detailed information about a specific Trello card",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cardId": { "type": "string", "description": "The ID of the Trello card" }
                },
                "required": ["cardId"]
            }),
        },
        ToolDefinition {
            name: "trello_create_card",
            description: "Create a new card in a Trello list",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "listId": { "type": "string", "description": "The ID of the list to create the card in" },
                    "name": { "type": "string", "description": "The name/title of the card" },
                    "description": { "type": "string", "description": "The description of the card" },
                    "due": { "type": "string", "description": "Due date in ISO 8601 format (e.g. 2025-12-31)" },
                    "pos": { "type": "string", "description": "Position: \"top\", \"bottom\", or a positive number" }
                },
                "required": ["listId", "name"]
            }),
        },
        ToolDefinition {
            name: "trello_update_card",
            description: "Update an existing Trello card (name, description, due date, archive status)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cardId": { "type": "string", "description": "The ID of the card to update" },
                    "name": { "type": "string", "description": "New name for the card" },
                    "description": { "type": "string", "description": "New description for the card" },
                    "due": { "type": "string", "description": "New due date in ISO 8601 format, or null to remove" },
                    "closed": { "type": "boolean", "description": "Set to true to archive the card" }
                },
                "required": ["cardId"]
            }),
        },
        ToolDefinition {
            name: "trello_move_card",
            description: "Move a Trello card to a different list",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cardId": { "type": "string", "description": "The ID of the card to move" },
                    "listId": { "type": "string", "description": "The ID of the destination list" },
                    "pos": { "type": "string", "description": "Position in the new list: \"top\", \"bottom\", or a number" }
                },
                "required": ["cardId", "listId"]
            }),
        },
        ToolDefinition {
            name: "trello_add_comment",
            description: "Add a comment to a Trello card",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cardId": { "type": "string", "description": "The ID of the card to comment on" },
                    "text": { "type": "string", "description": "The comment text" }
                },
                "required": ["cardId", "text"]
            }),
        },
    ]
}

/// Presence check only. Types are deliberately not coerced or verified
/// here; a wrongly typed value flows through and surfaces as a remote
/// error, matching the relay deployment's behavior.
pub(crate) fn validate_arguments(
    tool: ToolId,
    args: &Map<String, Value>,
) -> Result<(), ToolError> {
    for key in tool.required() {
        if !args.contains_key(*key) {
            return Err(ToolError::new(
                "missing_argument",
                format!("Missing required argument '{key}' for {}", tool.name()),
            )
            .with_field(*key));
        }
    }
    Ok(())
}

/// One remote REST operation: verb, interpolated path, and a body holding
/// only the fields the caller supplied.
#[derive(Debug, PartialEq)]
pub(crate) struct OperationIntent {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Option<Value>,
}

pub(crate) fn operation_intent(
    tool: ToolId,
    args: &Map<String, Value>,
) -> Result<OperationIntent, ToolError> {
    let intent = match tool {
        ToolId::ListBoards => OperationIntent {
            method: Method::GET,
            path: "/members/me/boards".to_string(),
            body: None,
        },
        ToolId::ListLists => OperationIntent {
            method: Method::GET,
            path: format!("/boards/{}/lists", path_segment(tool, args, "boardId")?),
            body: None,
        },
        ToolId::ListCards => OperationIntent {
            method: Method::GET,
            path: format!("/lists/{}/cards", path_segment(tool, args, "listId")?),
            body: None,
        },
        ToolId::GetCard => OperationIntent {
            method: Method::GET,
            path: format!("/cards/{}", path_segment(tool, args, "cardId")?),
            body: None,
        },
        ToolId::CreateCard => {
            let mut body = Map::new();
            body.insert("idList".to_string(), required_value(tool, args, "listId")?);
            body.insert("name".to_string(), required_value(tool, args, "name")?);
            copy_if_present(args, "description", "desc", &mut body);
            copy_if_present(args, "due", "due", &mut body);
            copy_if_present(args, "pos", "pos", &mut body);
            OperationIntent {
                method: Method::POST,
                path: "/cards".to_string(),
                body: Some(Value::Object(body)),
            }
        }
        ToolId::UpdateCard => {
            // Sparse patch: a field is sent iff the caller supplied the key.
            // An explicit `due: null` is included as null, which Trello
            // reads as "remove the due date".
            let mut body = Map::new();
            copy_if_present(args, "name", "name", &mut body);
            copy_if_present(args, "description", "desc", &mut body);
            copy_if_present(args, "due", "due", &mut body);
            copy_if_present(args, "closed", "closed", &mut body);
            OperationIntent {
                method: Method::PUT,
                path: format!("/cards/{}", path_segment(tool, args, "cardId")?),
                body: Some(Value::Object(body)),
            }
        }
        ToolId::MoveCard => {
            let mut body = Map::new();
            body.insert("idList".to_string(), required_value(tool, args, "listId")?);
            copy_if_present(args, "pos", "pos", &mut body);
            OperationIntent {
                method: Method::PUT,
                path: format!("/cards/{}", path_segment(tool, args, "cardId")?),
                body: Some(Value::Object(body)),
            }
        }
        ToolId::AddComment => {
            let mut body = Map::new();
            body.insert("text".to_string(), required_value(tool, args, "text")?);
            OperationIntent {
                method: Method::POST,
                path: format!(
                    "/cards/{}/actions/comments",
                    path_segment(tool, args, "cardId")?
                ),
                body: Some(Value::Object(body)),
            }
        }
    };
    Ok(intent)
}

fn required_value(
    tool: ToolId,
    args: &Map<String, Value>,
    key: &str,
) -> Result<Value, ToolError> {
    args.get(key).cloned().ok_or_else(|| {
        ToolError::new(
            "missing_argument",
            format!("Missing required argument '{key}' for {}", tool.name()),
        )
        .with_field(key)
    })
}

/// Identifiers must be scalars before they reach a URL path. Whether a
/// scalar actually names an existing board/list/card is left to the
/// remote service.
fn path_segment(tool: ToolId, args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = required_value(tool, args, key)?;
    scalar_to_string(&value, key)
}

fn scalar_to_string(value: &Value, field: &str) -> Result<String, ToolError> {
    match value {
        Value::String(v) => Ok(v.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ToolError::new(
            "invalid_argument",
            format!("'{field}' must be a scalar identifier"),
        )
        .with_field(field)),
    }
}

fn copy_if_present(
    args: &Map<String, Value>,
    source: &str,
    target: &str,
    body: &mut Map<String, Value>,
) {
    if let Some(value) = args.get(source) {
        body.insert(target.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn body_keys(intent: &OperationIntent) -> Vec<String> {
        intent
            .body
            .as_ref()
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn catalog_schemas_agree_with_the_dispatch_table() {
        let definitions = tool_definitions();
        assert_eq!(definitions.len(), ToolId::ALL.len());

        for (definition, tool) in definitions.iter().zip(ToolId::ALL) {
            assert_eq!(definition.name, tool.name());

            let schema_required: Vec<&str> = definition.input_schema["required"]
                .as_array()
                .expect("schema carries a required list")
                .iter()
                .map(|v| v.as_str().expect("required entries are strings"))
                .collect();
            assert_eq!(schema_required, tool.required(), "{}", tool.name());

            let properties = definition.input_schema["properties"]
                .as_object()
                .expect("schema carries properties");
            for key in tool.required() {
                assert!(
                    properties.contains_key(*key),
                    "{} schema is missing required property {key}",
                    tool.name()
                );
            }
        }
    }

    #[test]
    fn every_tool_has_a_relay_action_name() {
        for tool in ToolId::ALL {
            assert!(!tool.action_name().is_empty());
            assert_eq!(ToolId::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ToolId::from_name("trello_delete_board"), None);
    }

    #[test]
    fn validator_accepts_exact_required_fields_and_names_the_missing_one() {
        for tool in ToolId::ALL {
            let full = args(
                &tool
                    .required()
                    .iter()
                    .map(|key| (*key, json!("value")))
                    .collect::<Vec<_>>(),
            );
            assert!(validate_arguments(tool, &full).is_ok(), "{}", tool.name());

            for missing in tool.required() {
                let mut partial = full.clone();
                partial.remove(*missing);
                let err = validate_arguments(tool, &partial)
                    .expect_err("dropping a required field must fail");
                assert_eq!(err.code, "missing_argument");
                assert!(err.message.contains(missing), "{}", tool.name());
            }
        }
    }

    #[test]
    fn validator_checks_presence_not_types() {
        let numeric_id = args(&[("boardId", json!(42))]);
        assert!(validate_arguments(ToolId::ListLists, &numeric_id).is_ok());
    }

    #[test]
    fn read_only_tools_interpolate_the_identifier_once_and_build_no_body() {
        let cases = [
            (ToolId::ListLists, "boardId", "B1", "/boards/B1/lists"),
            (ToolId::ListCards, "listId", "L1", "/lists/L1/cards"),
            (ToolId::GetCard, "cardId", "C1", "/cards/C1"),
        ];
        for (tool, key, id, expected_path) in cases {
            let intent = operation_intent(tool, &args(&[(key, json!(id))])).unwrap();
            assert_eq!(intent.method, Method::GET);
            assert_eq!(intent.path, expected_path);
            assert_eq!(intent.path.matches(id).count(), 1);
            assert!(intent.body.is_none());
        }

        let intent = operation_intent(ToolId::ListBoards, &Map::new()).unwrap();
        assert_eq!(intent.method, Method::GET);
        assert_eq!(intent.path, "/members/me/boards");
        assert!(intent.body.is_none());
    }

    #[test]
    fn create_card_without_optionals_sends_only_id_list_and_name() {
        let intent = operation_intent(
            ToolId::CreateCard,
            &args(&[("listId", json!("L1")), ("name", json!("Task"))]),
        )
        .unwrap();

        assert_eq!(intent.method, Method::POST);
        assert_eq!(intent.path, "/cards");
        assert_eq!(body_keys(&intent), vec!["idList", "name"]);
        assert_eq!(intent.body.unwrap(), json!({ "idList": "L1", "name": "Task" }));
    }

    #[test]
    fn create_card_maps_supplied_optionals_to_rest_field_names() {
        let intent = operation_intent(
            ToolId::CreateCard,
            &args(&[
                ("listId", json!("L1")),
                ("name", json!("Task")),
                ("description", json!("Details")),
                ("due", json!("2025-12-31")),
                ("pos", json!("top")),
            ]),
        )
        .unwrap();

        assert_eq!(
            intent.body.unwrap(),
            json!({
                "idList": "L1",
                "name": "Task",
                "desc": "Details",
                "due": "2025-12-31",
                "pos": "top"
            })
        );
    }

    #[test]
    fn update_card_explicit_null_due_is_a_clear_not_an_omission() {
        let intent = operation_intent(
            ToolId::UpdateCard,
            &args(&[("cardId", json!("C1")), ("due", Value::Null)]),
        )
        .unwrap();

        assert_eq!(intent.method, Method::PUT);
        assert_eq!(intent.path, "/cards/C1");
        assert_eq!(intent.body.unwrap(), json!({ "due": null }));
    }

    #[test]
    fn update_card_omits_fields_the_caller_did_not_supply() {
        let intent = operation_intent(
            ToolId::UpdateCard,
            &args(&[("cardId", json!("C1")), ("closed", json!(true))]),
        )
        .unwrap();
        assert_eq!(intent.body.unwrap(), json!({ "closed": true }));

        let intent = operation_intent(ToolId::UpdateCard, &args(&[("cardId", json!("C1"))]))
            .unwrap();
        assert_eq!(intent.body.unwrap(), json!({}));
    }

    #[test]
    fn move_card_always_carries_the_destination_list() {
        let intent = operation_intent(
            ToolId::MoveCard,
            &args(&[("cardId", json!("C1")), ("listId", json!("L2"))]),
        )
        .unwrap();
        assert_eq!(intent.method, Method::PUT);
        assert_eq!(intent.path, "/cards/C1");
        assert_eq!(intent.body.unwrap(), json!({ "idList": "L2" }));

        let intent = operation_intent(
            ToolId::MoveCard,
            &args(&[
                ("cardId", json!("C1")),
                ("listId", json!("L2")),
                ("pos", json!("bottom")),
            ]),
        )
        .unwrap();
        assert_eq!(
            intent.body.unwrap(),
            json!({ "idList": "L2", "pos": "bottom" })
        );
    }

    #[test]
    fn add_comment_posts_exactly_the_text_to_the_nested_path() {
        let intent = operation_intent(
            ToolId::AddComment,
            &args(&[("cardId", json!("C1")), ("text", json!("Looks good"))]),
        )
        .unwrap();
        assert_eq!(intent.method, Method::POST);
        assert_eq!(intent.path, "/cards/C1/actions/comments");
        assert_eq!(intent.body.unwrap(), json!({ "text": "Looks good" }));
    }

    #[test]
    fn numeric_identifiers_are_interpolated_as_text() {
        let intent =
            operation_intent(ToolId::GetCard, &args(&[("cardId", json!(42))])).unwrap();
        assert_eq!(intent.path, "/cards/42");
    }

    #[test]
    fn composite_identifiers_are_rejected_before_a_path_is_built() {
        // A string member could smuggle path separators into the URL.
        let smuggled = args(&[("cardId", json!({ "x": "C1/actions/comments" }))]);
        let err = operation_intent(ToolId::GetCard, &smuggled)
            .expect_err("object identifier must not reach the path");
        assert_eq!(err.code, "invalid_argument");
        assert_eq!(err.message, "'cardId' must be a scalar identifier");

        let err = operation_intent(ToolId::ListLists, &args(&[("boardId", json!(["B1"]))]))
            .expect_err("array identifier must not reach the path");
        assert_eq!(err.code, "invalid_argument");

        let err = operation_intent(ToolId::GetCard, &args(&[("cardId", Value::Null)]))
            .expect_err("null identifier must not reach the path");
        assert_eq!(err.code, "invalid_argument");
    }
}

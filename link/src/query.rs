//! GraphQL subscription documents for each [`SubscriptionKind`].
//!
//! [`build_subscription_query`] is pure: the same kind, operation and filter
//! always produce byte-identical output. Every document is scoped to one
//! operation through the `$operation_id` variable and streams the newest
//! rows first.

use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::models::SubscriptionKind;

/// Variable bag sent alongside a subscription document.
pub type Variables = Map<String, Value>;

/// A ready-to-send subscription document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionQuery {
    /// GraphQL operation name, also sent as `operationName`.
    pub operation_name: &'static str,
    /// Root field the server keys `data` by.
    pub root_field: &'static str,
    /// Full document text.
    pub document: String,
}

/// Row shape selected for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryShape {
    TaskOutput,
    Callback,
    File,
    Alert,
    MinimalTaskOutput,
}

impl QueryShape {
    fn for_kind(kind: SubscriptionKind) -> Self {
        match kind {
            SubscriptionKind::TaskOutput => QueryShape::TaskOutput,
            SubscriptionKind::Callback => QueryShape::Callback,
            SubscriptionKind::File => QueryShape::File,
            SubscriptionKind::Alert => QueryShape::Alert,
            // No union of event streams exists server-side.
            SubscriptionKind::All => QueryShape::MinimalTaskOutput,
        }
    }

    fn operation_name(self) -> &'static str {
        match self {
            QueryShape::TaskOutput => "TaskOutputSubscription",
            QueryShape::Callback => "CallbackSubscription",
            QueryShape::File => "FileSubscription",
            QueryShape::Alert => "AlertSubscription",
            QueryShape::MinimalTaskOutput => "AllSubscription",
        }
    }

    fn root_field(self) -> &'static str {
        match self {
            QueryShape::TaskOutput | QueryShape::MinimalTaskOutput => "task_output",
            QueryShape::Callback => "callback",
            QueryShape::File => "filemeta",
            QueryShape::Alert => "operationalert",
        }
    }

    fn where_clause(self) -> &'static str {
        match self {
            QueryShape::TaskOutput | QueryShape::MinimalTaskOutput => {
                "{task: {callback: {operation_id: {_eq: $operation_id}}}}"
            },
            QueryShape::Callback | QueryShape::File | QueryShape::Alert => {
                "{operation_id: {_eq: $operation_id}}"
            },
        }
    }

    fn selection(self) -> &'static [&'static str] {
        match self {
            QueryShape::TaskOutput => &[
                "id",
                "output",
                "timestamp",
                "task_id",
                "task { id command params original_params display_params status timestamp completed_time callback_id operator_id comment_operator }",
            ],
            QueryShape::Callback => &[
                "id",
                "display_id",
                "agent_callback_id",
                "init_callback",
                "last_checkin",
                "user",
                "host",
                "pid",
                "ip",
                "external_ip",
                "process_name",
                "description",
                "operator_id",
                "active",
                "registered_payload_id",
                "integrity_level",
                "locked",
                "operation_id",
                "sleep_info",
                "architecture",
                "domain",
                "os",
            ],
            QueryShape::File => &[
                "id",
                "agent_file_id",
                "total_chunks",
                "chunks_received",
                "chunk_size",
                "full_remote_path",
                "host",
                "is_download_from_agent",
                "is_screenshot",
                "is_payload",
                "timestamp",
                "complete",
                "deleted",
                "operator_id",
                "operation_id",
                "task_id",
                "filename_text",
                "md5",
                "sha1",
            ],
            QueryShape::Alert => &[
                "id",
                "message",
                "alert",
                "source",
                "severity",
                "resolved",
                "operation_id",
                "callback_id",
                "timestamp",
            ],
            QueryShape::MinimalTaskOutput => &["id", "output", "timestamp", "task_id"],
        }
    }
}

/// GraphQL type declared for a variable, inferred from its JSON value.
fn variable_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "Boolean!",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int!",
        Value::Number(_) => "Float!",
        Value::String(_) => "String!",
        Value::Array(_) | Value::Object(_) => "jsonb!",
        Value::Null => "String",
    }
}

/// `operation_id` is compared against an integer column in every shape.
fn declared_type(name: &str, value: &Value) -> &'static str {
    if name == "operation_id" {
        "Int!"
    } else {
        variable_type(value)
    }
}

/// Build the document and variables for a subscription.
///
/// `variables` always contains `operation_id`; `filter` entries are merged
/// afterwards, so a filter key named `operation_id` replaces it. Unknown
/// filter variables are declared but not referenced by the document.
pub fn build_subscription_query(
    kind: SubscriptionKind,
    operation_id: i64,
    filter: &Map<String, Value>,
) -> (SubscriptionQuery, Variables) {
    let shape = QueryShape::for_kind(kind);

    let mut variables = Variables::new();
    variables.insert("operation_id".to_string(), Value::from(operation_id));
    for (key, value) in filter {
        variables.insert(key.clone(), value.clone());
    }

    let mut declared: Vec<_> = variables.iter().collect();
    declared.sort_by(|a, b| a.0.cmp(b.0));
    let declarations = declared
        .into_iter()
        .map(|(name, value)| format!("${}: {}", name, declared_type(name, value)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut document = String::new();
    let _ = writeln!(
        document,
        "subscription {}({}) {{",
        shape.operation_name(),
        declarations
    );
    let _ = writeln!(
        document,
        "  {}(where: {}, order_by: {{id: desc}}) {{",
        shape.root_field(),
        shape.where_clause()
    );
    for field in shape.selection() {
        let _ = writeln!(document, "    {}", field);
    }
    document.push_str("  }\n}\n");

    (
        SubscriptionQuery {
            operation_name: shape.operation_name(),
            root_field: shape.root_field(),
            document,
        },
        variables,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_output_includes_parent_task() {
        let (query, variables) =
            build_subscription_query(SubscriptionKind::TaskOutput, 1, &Map::new());
        assert_eq!(query.root_field, "task_output");
        assert!(query.document.starts_with("subscription TaskOutputSubscription($operation_id: Int!) {"));
        assert!(query.document.contains("task: {callback: {operation_id: {_eq: $operation_id}}}"));
        assert!(query.document.contains("comment_operator"));
        assert!(query.document.contains("order_by: {id: desc}"));
        assert_eq!(variables.get("operation_id"), Some(&json!(1)));
    }

    #[test]
    fn test_each_kind_selects_its_root_field() {
        let cases = [
            (SubscriptionKind::Callback, "callback", "integrity_level"),
            (SubscriptionKind::File, "filemeta", "chunks_received"),
            (SubscriptionKind::Alert, "operationalert", "severity"),
        ];
        for (kind, root, field) in cases {
            let (query, _) = build_subscription_query(kind, 5, &Map::new());
            assert_eq!(query.root_field, root);
            assert!(query.document.contains(&format!("  {}(where: {{operation_id", root)));
            assert!(query.document.contains(field), "{kind} should select {field}");
        }
    }

    #[test]
    fn test_all_falls_back_to_minimal_task_output() {
        let (query, _) = build_subscription_query(SubscriptionKind::All, 2, &Map::new());
        assert_eq!(query.root_field, "task_output");
        assert!(!query.document.contains("command"));
        assert!(query.document.contains("    task_id\n"));
    }

    #[test]
    fn test_filter_merged_and_declared() {
        let mut filter = Map::new();
        filter.insert("host".to_string(), json!("WS01"));
        filter.insert("active".to_string(), json!(true));
        filter.insert("ratio".to_string(), json!(0.5));
        let (query, variables) = build_subscription_query(SubscriptionKind::Callback, 3, &filter);

        assert_eq!(variables.len(), 4);
        assert_eq!(variables["host"], json!("WS01"));
        assert!(query.document.contains("$active: Boolean!"));
        assert!(query.document.contains("$host: String!"));
        assert!(query.document.contains("$ratio: Float!"));
    }

    #[test]
    fn test_filter_overrides_operation_id() {
        let mut filter = Map::new();
        filter.insert("operation_id".to_string(), json!(9));
        let (_, variables) = build_subscription_query(SubscriptionKind::Alert, 3, &filter);
        assert_eq!(variables["operation_id"], json!(9));
    }

    #[test]
    fn test_operation_id_always_declared_as_int() {
        let mut filter = Map::new();
        filter.insert("operation_id".to_string(), json!("9"));
        let (query, _) = build_subscription_query(SubscriptionKind::Callback, 3, &filter);
        assert!(query.document.contains("($operation_id: Int!)"));
        assert!(!query.document.contains("$operation_id: String!"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut filter = Map::new();
        filter.insert("zeta".to_string(), json!(1));
        filter.insert("alpha".to_string(), json!([1, 2]));
        let first = build_subscription_query(SubscriptionKind::File, 7, &filter);
        let second = build_subscription_query(SubscriptionKind::File, 7, &filter);
        assert_eq!(first, second);
        assert!(first.0.document.contains("$alpha: jsonb!, $operation_id: Int!, $zeta: Int!"));
    }
}

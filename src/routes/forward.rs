// ============================================================================
// Backend Forwarding
// ============================================================================
//
// Every business route maps to one Operation on the rule repository. Reads
// return the backend payload as is. Writes (staged operations) are followed
// by a staging commit on success or a staging cancel on failure.
//
// ============================================================================

use axum::http::Method;
use rulegate_error::AppResult;
use serde_json::Value;

use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::gateway::CallerContext;

// Longest request excerpt recorded in a commit audit message
const AUDIT_EXCERPT_CHARS: usize = 256;

/// One route's target on the rule repository
#[derive(Debug, Clone)]
pub struct Operation {
    /// Audit label, e.g. "rule delete"
    pub label: &'static str,
    pub method: Method,
    pub backend_path: &'static str,
    /// Changes backend state that must be committed or cancelled
    pub staged: bool,
}

impl Operation {
    const fn read(label: &'static str, method: Method, backend_path: &'static str) -> Self {
        Self {
            label,
            method,
            backend_path,
            staged: false,
        }
    }

    const fn write(label: &'static str, backend_path: &'static str) -> Self {
        Self {
            label,
            method: Method::POST,
            backend_path,
            staged: true,
        }
    }
}

// ===== Rules =====
pub const RULE_ADD_BATCH: Operation = Operation::write("rule add", "/v1/rule-repo/rule/batchadd");
pub const RULE_QUERY: Operation =
    Operation::read("rule query", Method::POST, "/v1/rule-repo/rule/query");
pub const RULE_ATTRIBUTE_QUERY: Operation =
    Operation::read("rule attribute query", Method::GET, "/v1/public/attribute/query");
pub const RULE_REGEX_QUERY: Operation = Operation::read(
    "rule regex query",
    Method::POST,
    "/v1/rule-repo/rule/regex/query",
);
pub const RULE_DELETE: Operation = Operation::write("rule delete", "/v1/rule-repo/rule/delete");

// ===== Tags =====
pub const TAG_QUERY: Operation = Operation::read("tag query", Method::POST, "/v1/tag/query");
pub const TAG_DELETE: Operation = Operation::write("tag delete", "/v1/tag/delete");

// ===== Parsers =====
pub const PARSER_DELETE: Operation =
    Operation::write("parser delete", "/v1/parser-repo/parser/delete");

// ===== Repositories =====
pub const REPO_QUERY: Operation = Operation::read("repo query", Method::POST, "/v1/rule-repo/query");
pub const REPO_ATTRIBUTE_QUERY: Operation =
    Operation::read("repo attribute query", Method::GET, "/v1/public/attribute/query");
pub const REPO_DIMENSION_QUERY: Operation = Operation::read(
    "repo dimension query",
    Method::POST,
    "/v1/rule-repo/dimension/query",
);

/// Run `operation` against the backend for `caller`
pub async fn forward(
    ctx: &AppContext,
    operation: &Operation,
    caller: &CallerContext,
    body: Value,
) -> AppResult<ApiResponse<Value>> {
    tracing::info!(
        operation = operation.label,
        request_id = caller.request_id.as_deref().unwrap_or_default(),
        "Forwarding to backend"
    );

    let result = ctx
        .repo
        .call(operation.method.clone(), operation.backend_path, &body, caller)
        .await;

    if operation.staged {
        match &result {
            Ok(_) => {
                ctx.repo
                    .commit_quietly(caller, &audit_message(operation, &body))
                    .await
            }
            Err(e) => {
                tracing::info!(operation = operation.label, error = %e, "Write failed, cancelling staged changes");
                ctx.repo.cancel_quietly(caller).await
            }
        }
    }

    result.map(ApiResponse::ok)
}

/// Audit text for a committed write: the label and an excerpt of the request
pub fn audit_message(operation: &Operation, body: &Value) -> String {
    let request = body.to_string();
    let mut excerpt: String = request.chars().take(AUDIT_EXCERPT_CHARS).collect();
    if excerpt.len() < request.len() {
        excerpt.push_str("...");
    }
    format!("{}: {}", operation.label, excerpt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_operations_are_staged_posts() {
        for op in [&RULE_ADD_BATCH, &RULE_DELETE, &TAG_DELETE, &PARSER_DELETE] {
            assert!(op.staged, "{} should be staged", op.label);
            assert_eq!(op.method, Method::POST);
        }
        for op in [&RULE_QUERY, &TAG_QUERY, &REPO_QUERY, &REPO_ATTRIBUTE_QUERY] {
            assert!(!op.staged, "{} should not be staged", op.label);
        }
    }

    #[test]
    fn test_audit_message_short_body() {
        let message = audit_message(&RULE_DELETE, &json!({"repo_id": 1, "rule_ids": [3, 4]}));
        assert_eq!(message, r#"rule delete: {"repo_id":1,"rule_ids":[3,4]}"#);
    }

    #[test]
    fn test_audit_message_truncates_long_body() {
        let ids: Vec<u32> = (0..500).collect();
        let message = audit_message(&RULE_ADD_BATCH, &json!({ "rule_ids": ids }));
        assert!(message.starts_with("rule add: {\"rule_ids\":[0,1,2"));
        assert!(message.ends_with("..."));
        assert!(message.chars().count() <= "rule add: ".len() + AUDIT_EXCERPT_CHARS + 3);
    }
}

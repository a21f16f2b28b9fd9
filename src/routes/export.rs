// ============================================================================
// Tag Export
// ============================================================================
//
// The one composed read: a repository's name, tag keys and rules are
// gathered from several backend queries and reshaped into one document.
//
// Repository kinds:
// - 1: rule repository (repo query + rule query)
// - 2: mapping repository (dictionary listing, no rules)
//
// ============================================================================

use axum::http::Method;
use rulegate_error::{AppError, AppResult, CODE_BACKEND_FAILURE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::gateway::{CallerContext, RepoServiceClient};

const REPO_QUERY_PATH: &str = "/v1/rule-repo/query";
const RULE_QUERY_PATH: &str = "/v1/rule-repo/rule/query";
const DICTIONARY_QUERY_PATH: &str = "/v1/dictionary/query";

// The dictionary listing is fetched in one page
const DICTIONARY_PAGE_SIZE: u32 = 10_000;

/// Body of `POST /v1/tags/export`
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub repo_type: i64,
    pub repo_id: i64,
}

impl ExportRequest {
    /// Both fields are mandatory and zero counts as absent
    pub fn parse(body: Value) -> AppResult<Self> {
        let request: Self =
            serde_json::from_value(body).map_err(|e| AppError::invalid_request(e.to_string()))?;
        if request.repo_type == 0 || request.repo_id == 0 {
            return Err(AppError::invalid_request("repo_type and repo_id are required"));
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepoKind {
    Rule,
    Mapping,
}

impl RepoKind {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RepoKind::Rule),
            2 => Some(RepoKind::Mapping),
            _ => None,
        }
    }
}

// ===== Export document =====

#[derive(Debug, Serialize, PartialEq)]
pub struct TagExport {
    pub repo_id: i64,
    pub repo_name: String,
    pub rules: Vec<ExportRule>,
    pub repo_attr: Vec<TagKey>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExportRule {
    pub rule_id: i64,
    pub tags: Vec<ExportTag>,
    pub attr: RuleAttr,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExportTag {
    pub tagkey_id: i64,
    pub tag_id: i64,
    pub tag_name: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TagKey {
    pub tagkey_id: i64,
    pub tagkey_name: String,
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct RuleAttr {
    pub desc: String,
    pub sample: String,
    pub status: i64,
    pub priority: i64,
}

// ===== Backend payloads =====

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default)]
    list: Vec<T>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RepoRecord {
    name: String,
    dimension_msg: Vec<DimensionRecord>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DimensionRecord {
    dimension_id: i64,
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RuleRecord {
    rule_id: i64,
    dimensions: Vec<RuleDimension>,
    attributes: AttributeRecord,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RuleDimension {
    dimension_id: i64,
    tag_id: i64,
    tag_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AttributeRecord {
    desc: String,
    sample: String,
    #[serde(deserialize_with = "lenient_int")]
    status: i64,
    #[serde(deserialize_with = "lenient_int")]
    priority: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MappingRecord {
    id: i64,
    name: String,
    fields: Vec<FieldRecord>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FieldRecord {
    id: i64,
    name: String,
}

/// The backend sends rule status and priority as decimal text; anything
/// unparsable reads as 0
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Build the export document for `request`
pub async fn export_tags(
    repo: &RepoServiceClient,
    caller: &CallerContext,
    request: &ExportRequest,
) -> AppResult<TagExport> {
    match RepoKind::from_code(request.repo_type) {
        Some(RepoKind::Rule) => export_rule_repo(repo, caller, request.repo_id).await,
        Some(RepoKind::Mapping) => export_mapping_repo(repo, caller, request.repo_id).await,
        None => Err(AppError::backend_rejected(
            CODE_BACKEND_FAILURE,
            format!("unsupported repository type {}", request.repo_type),
        )),
    }
}

async fn export_rule_repo(
    repo: &RepoServiceClient,
    caller: &CallerContext,
    repo_id: i64,
) -> AppResult<TagExport> {
    let repos: Listing<RepoRecord> = query(
        repo,
        caller,
        REPO_QUERY_PATH,
        json!({ "repo_ids": [repo_id], "type": 1 }),
    )
    .await?;
    let Some(record) = repos.list.into_iter().next() else {
        return Err(AppError::backend_rejected(
            CODE_BACKEND_FAILURE,
            format!("repository {} not found", repo_id),
        ));
    };

    let rules: Listing<RuleRecord> = query(
        repo,
        caller,
        RULE_QUERY_PATH,
        json!({ "repo_id": repo_id, "type": 1, "data_type": 2 }),
    )
    .await?;

    Ok(rule_repo_export(repo_id, record, rules.list))
}

async fn export_mapping_repo(
    repo: &RepoServiceClient,
    caller: &CallerContext,
    repo_id: i64,
) -> AppResult<TagExport> {
    let mappings: Listing<MappingRecord> = query(
        repo,
        caller,
        DICTIONARY_QUERY_PATH,
        json!({ "page_size": DICTIONARY_PAGE_SIZE, "page_index": 1 }),
    )
    .await?;

    Ok(mapping_repo_export(repo_id, mappings.list))
}

async fn query<R: DeserializeOwned>(
    repo: &RepoServiceClient,
    caller: &CallerContext,
    path: &str,
    body: Value,
) -> AppResult<R> {
    let data = repo.call(Method::POST, path, &body, caller).await?;
    serde_json::from_value(data).map_err(|e| {
        tracing::warn!(path = path, error = %e, "Unexpected backend payload for export");
        AppError::backend_decode(e.to_string())
    })
}

fn rule_repo_export(repo_id: i64, record: RepoRecord, rules: Vec<RuleRecord>) -> TagExport {
    TagExport {
        repo_id,
        repo_name: record.name,
        repo_attr: record
            .dimension_msg
            .into_iter()
            .map(|dim| TagKey {
                tagkey_id: dim.dimension_id,
                tagkey_name: dim.name,
            })
            .collect(),
        rules: rules
            .into_iter()
            .map(|rule| ExportRule {
                rule_id: rule.rule_id,
                tags: rule
                    .dimensions
                    .into_iter()
                    .map(|dim| ExportTag {
                        tagkey_id: dim.dimension_id,
                        tag_id: dim.tag_id,
                        tag_name: dim.tag_name,
                    })
                    .collect(),
                attr: RuleAttr {
                    desc: rule.attributes.desc,
                    sample: rule.attributes.sample,
                    status: rule.attributes.status,
                    priority: rule.attributes.priority,
                },
            })
            .collect(),
    }
}

/// A mapping repository exports its field list only; an unknown id yields
/// an empty document
fn mapping_repo_export(repo_id: i64, mappings: Vec<MappingRecord>) -> TagExport {
    let mut export = TagExport {
        repo_id,
        repo_name: String::new(),
        rules: Vec::new(),
        repo_attr: Vec::new(),
    };
    if let Some(mapping) = mappings.into_iter().find(|m| m.id == repo_id) {
        export.repo_name = mapping.name;
        export.repo_attr = mapping
            .fields
            .into_iter()
            .map(|field| TagKey {
                tagkey_id: field.id,
                tagkey_name: field.name,
            })
            .collect();
    }
    export
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_both_fields() {
        assert!(ExportRequest::parse(json!({"repo_type": 1, "repo_id": 7})).is_ok());

        for body in [
            json!({"repo_type": 1}),
            json!({"repo_type": 0, "repo_id": 7}),
            json!({"repo_type": "one", "repo_id": 7}),
        ] {
            let err = ExportRequest::parse(body).unwrap_err();
            assert_eq!(err.error_code(), rulegate_error::CODE_INVALID_REQUEST);
        }
    }

    #[test]
    fn test_rule_repo_export_reshapes_dimensions_and_rules() {
        let record: RepoRecord = serde_json::from_value(json!({
            "repo_id": 7,
            "name": "web rules",
            "dimension_msg": [{"dimension_id": 3, "name": "severity"}],
        }))
        .unwrap();
        let rules: Vec<RuleRecord> = serde_json::from_value(json!([
            {
                "rule_id": 11,
                "dimensions": [{"dimension_id": 3, "tag_id": 30, "tag_name": "high"}],
                "attributes": {"desc": "sqli", "sample": "' or 1=1", "status": "1", "priority": "5"},
            },
            {"rule_id": 12, "attributes": {"status": "n/a"}},
        ]))
        .unwrap();

        let export = rule_repo_export(7, record, rules);

        assert_eq!(export.repo_name, "web rules");
        assert_eq!(
            export.repo_attr,
            vec![TagKey {
                tagkey_id: 3,
                tagkey_name: "severity".to_string()
            }]
        );
        assert_eq!(export.rules.len(), 2);
        assert_eq!(export.rules[0].tags[0].tag_name, "high");
        assert_eq!(export.rules[0].attr.status, 1);
        assert_eq!(export.rules[0].attr.priority, 5);
        assert!(export.rules[1].tags.is_empty());
        assert_eq!(export.rules[1].attr, RuleAttr::default());
    }

    #[test]
    fn test_mapping_repo_export_picks_matching_entry() {
        let mappings: Vec<MappingRecord> = serde_json::from_value(json!([
            {"id": 1, "name": "other", "fields": [{"id": 9, "name": "x"}]},
            {"id": 4, "name": "ports", "fields": [{"id": 40, "name": "port"}, {"id": 41, "name": "proto"}]},
        ]))
        .unwrap();

        let export = mapping_repo_export(4, mappings);

        assert_eq!(export.repo_name, "ports");
        assert_eq!(export.repo_attr.len(), 2);
        assert_eq!(export.repo_attr[1].tagkey_name, "proto");
        assert!(export.rules.is_empty());

        let missing = mapping_repo_export(99, Vec::new());
        assert_eq!(missing.repo_name, "");
        assert!(missing.repo_attr.is_empty());
    }

    #[test]
    fn test_document_field_names() {
        let export = TagExport {
            repo_id: 7,
            repo_name: "r".to_string(),
            rules: vec![ExportRule {
                rule_id: 1,
                tags: Vec::new(),
                attr: RuleAttr::default(),
            }],
            repo_attr: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&export).unwrap(),
            json!({
                "repo_id": 7,
                "repo_name": "r",
                "rules": [{
                    "rule_id": 1,
                    "tags": [],
                    "attr": {"desc": "", "sample": "", "status": 0, "priority": 0},
                }],
                "repo_attr": [],
            })
        );
    }
}

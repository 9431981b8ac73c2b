//! OpensearchComponentTemplate Custom Resource Definition

use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpensearchComponentTemplate resource specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchComponentTemplate",
    plural = "opensearchcomponenttemplates",
    singular = "opensearchcomponenttemplate",
    shortname = "oscomponent",
    namespaced,
    status = "ComponentTemplateStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Template", "type": "string", "jsonPath": ".status.componentTemplateName"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTemplateSpec {
    /// OpenSearchCluster (same namespace) the template lives in
    pub opensearch_cluster: ClusterReference,

    /// Name of the template in OpenSearch (defaults to the resource name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Template body applied to matching indices
    #[serde(default)]
    pub template: TemplateSpec,

    /// Version number used by external tooling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// Allow auto-creation of indices covered by this template
    #[serde(default)]
    pub allow_auto_create: bool,

    /// Arbitrary metadata stored with the template
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub meta: Option<Value>,
}

/// Reference to an OpenSearchCluster
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ClusterReference {
    /// Cluster resource name
    pub name: String,
}

/// Settings, mappings and aliases of a component template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Index settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub settings: Option<Value>,

    /// Field mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub mappings: Option<Value>,

    /// Aliases keyed by alias name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, AliasSpec>,
}

/// Alias applied by the template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AliasSpec {
    /// Alias name (overrides the map key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Query used to limit documents visible through the alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub filter: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_routing: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_routing: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_write_index: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_exist: Option<bool>,
}

/// Lifecycle state reported in `.status.state`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentTemplateState {
    /// Waiting on the owning cluster
    Pending,
    /// Owned by this resource and in sync
    Created,
    /// Last reconciliation failed
    Error,
    /// Template pre-existed in OpenSearch and is left alone
    Ignored,
}

impl ComponentTemplateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Created => "CREATED",
            Self::Error => "ERROR",
            Self::Ignored => "IGNORED",
        }
    }
}

/// Whether the remote template existed before this resource first saw it.
///
/// Determined once and never recomputed. Serialised as an optional boolean
/// so `existingComponentTemplate` stays absent until the first check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TemplateExistence {
    /// Not checked yet
    #[default]
    Unknown,
    /// Existed before adoption; never created, updated or deleted here
    PreExisting,
    /// Created and owned by this resource
    Owned,
}

impl TemplateExistence {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<bool> for TemplateExistence {
    fn from(exists: bool) -> Self {
        if exists {
            Self::PreExisting
        } else {
            Self::Owned
        }
    }
}

impl From<Option<bool>> for TemplateExistence {
    fn from(value: Option<bool>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<TemplateExistence> for Option<bool> {
    fn from(value: TemplateExistence) -> Self {
        match value {
            TemplateExistence::Unknown => None,
            TemplateExistence::PreExisting => Some(true),
            TemplateExistence::Owned => Some(false),
        }
    }
}

/// OpensearchComponentTemplate status
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTemplateStatus {
    /// Current state (PENDING, CREATED, ERROR, IGNORED)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ComponentTemplateState>,

    /// Human-readable outcome of the last reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Whether the template pre-existed in OpenSearch
    #[serde(default, skip_serializing_if = "TemplateExistence::is_unknown")]
    #[schemars(with = "Option<bool>")]
    pub existing_component_template: TemplateExistence,

    /// UID of the cluster this template was first reconciled against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_cluster: Option<String>,

    /// Template name used against the OpenSearch API, pinned on first check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_template_name: Option<String>,
}

impl OpensearchComponentTemplate {
    /// Name the template has (or will have) inside OpenSearch
    pub fn template_name(&self) -> String {
        match self.spec.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.name_any(),
        }
    }

    /// Status, or an empty one when none has been written yet
    pub fn current_status(&self) -> ComponentTemplateStatus {
        self.status.clone().unwrap_or_default()
    }

    pub fn status_mut(&mut self) -> &mut ComponentTemplateStatus {
        self.status.get_or_insert_with(ComponentTemplateStatus::default)
    }
}

fn preserve_unknown_fields(_: &mut schemars::gen::SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema
        .extensions
        .insert("x-kubernetes-preserve-unknown-fields".to_string(), Value::Bool(true));
    Schema::Object(schema)
}

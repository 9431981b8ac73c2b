//! Wire types of the OpenSearch component template API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `PUT /_component_template/<name>`
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ComponentTemplateBody {
    #[serde(default)]
    pub template: TemplateBody,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_auto_create: Option<bool>,

    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TemplateBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, AliasBody>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AliasBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

/// Response of `GET /_component_template/<name>`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GetComponentTemplatesResponse {
    #[serde(default)]
    pub component_templates: Vec<NamedComponentTemplate>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NamedComponentTemplate {
    pub name: String,
    pub component_template: ComponentTemplateBody,
}

impl ComponentTemplateBody {
    /// Whether `existing` needs to be overwritten to match `self`
    pub fn differs_from(&self, existing: &ComponentTemplateBody) -> bool {
        self.normalized() != existing.normalized()
    }

    /// Canonical JSON form used for drift detection.
    ///
    /// OpenSearch echoes settings back flattened to `index.*` keys with
    /// string values and drops empty objects, so both sides are brought to
    /// that shape before comparing. Aliases get the same treatment: stored
    /// `routing` is split into index and search routing, and `must_exist`
    /// only applies to the request and is never returned.
    pub fn normalized(&self) -> Value {
        let mut body = self.clone();
        for alias in body.template.aliases.values_mut() {
            alias.normalize();
        }
        let mut value = serde_json::to_value(&body).unwrap_or(Value::Null);
        if let Some(settings) = value.pointer_mut("/template/settings") {
            let mut flat = Map::new();
            flatten_settings("", settings, &mut flat);
            *settings = Value::Object(flat);
        }
        prune_empty(&mut value);
        value
    }
}

impl AliasBody {
    fn normalize(&mut self) {
        if let Some(routing) = self.routing.take() {
            self.index_routing.get_or_insert_with(|| routing.clone());
            self.search_routing.get_or_insert(routing);
        }
        self.must_exist = None;
    }
}

fn flatten_settings(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_settings(&key, child, out);
            }
        }
        Value::Null => {}
        leaf => {
            let key = if prefix.starts_with("index.") {
                prefix.to_string()
            } else {
                format!("index.{}", prefix)
            };
            out.insert(key, stringify(leaf));
        }
    }
}

fn stringify(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Array(items) => Value::Array(items.iter().map(stringify).collect()),
        other => Value::String(other.to_string()),
    }
}

/// Drop nulls and empty objects, recursively
fn prune_empty(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune_empty(child);
        }
        map.retain(|_, child| match child {
            Value::Null => false,
            Value::Object(inner) => !inner.is_empty(),
            _ => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> ComponentTemplateBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn nested_settings_match_flattened_echo() {
        let desired = body(json!({
            "template": {"settings": {"number_of_shards": 1, "index": {"refresh_interval": "5s"}}}
        }));
        let existing = body(json!({
            "template": {"settings": {"index.number_of_shards": "1", "index.refresh_interval": "5s"}}
        }));
        assert!(!desired.differs_from(&existing));
    }

    #[test]
    fn changed_setting_is_drift() {
        let desired = body(json!({"template": {"settings": {"number_of_shards": 2}}}));
        let existing = body(json!({"template": {"settings": {"index": {"number_of_shards": "1"}}}}));
        assert!(desired.differs_from(&existing));
    }

    #[test]
    fn empty_sections_are_ignored() {
        let desired = body(json!({"template": {"mappings": {"properties": {"ts": {"type": "date"}}}}}));
        let existing = body(json!({
            "template": {
                "settings": {},
                "mappings": {"properties": {"ts": {"type": "date"}}},
                "aliases": {}
            }
        }));
        assert!(!desired.differs_from(&existing));
    }

    #[test]
    fn mapping_and_meta_changes_are_drift() {
        let desired = body(json!({
            "template": {"mappings": {"properties": {"ts": {"type": "date"}}}},
            "_meta": {"owner": "team-a"}
        }));
        let existing = body(json!({
            "template": {"mappings": {"properties": {"ts": {"type": "date"}}}},
            "_meta": {"owner": "team-b"}
        }));
        assert!(desired.differs_from(&existing));

        let existing = body(json!({
            "template": {"mappings": {"properties": {"ts": {"type": "keyword"}}}},
            "_meta": {"owner": "team-a"}
        }));
        assert!(desired.differs_from(&existing));
    }

    #[test]
    fn alias_routing_matches_stored_echo() {
        let desired = body(json!({
            "template": {"aliases": {"current": {"routing": "1", "must_exist": true}}}
        }));
        let existing = body(json!({
            "template": {"aliases": {"current": {"index_routing": "1", "search_routing": "1"}}}
        }));
        assert!(!desired.differs_from(&existing));
    }

    #[test]
    fn explicit_alias_routing_wins_over_shorthand() {
        let desired = body(json!({
            "template": {"aliases": {"current": {"routing": "1", "search_routing": "2"}}}
        }));
        let existing = body(json!({
            "template": {"aliases": {"current": {"index_routing": "1", "search_routing": "2"}}}
        }));
        assert!(!desired.differs_from(&existing));

        let existing = body(json!({
            "template": {"aliases": {"current": {"index_routing": "1", "search_routing": "1"}}}
        }));
        assert!(desired.differs_from(&existing));
    }

    #[test]
    fn response_parses_component_template_list() {
        let response: GetComponentTemplatesResponse = serde_json::from_value(json!({
            "component_templates": [{
                "name": "logs",
                "component_template": {
                    "template": {"aliases": {"current": {"is_write_index": true}}},
                    "version": 3
                }
            }]
        }))
        .unwrap();
        let template = &response.component_templates[0];
        assert_eq!(template.name, "logs");
        assert_eq!(template.component_template.version, Some(3));
        assert_eq!(
            template.component_template.template.aliases["current"].is_write_index,
            Some(true)
        );
    }
}

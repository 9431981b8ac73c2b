//! Translation of the CRD spec into the OpenSearch request body

use crate::crd::{AliasSpec, ComponentTemplateSpec};
use crate::opensearch::{AliasBody, ComponentTemplateBody, TemplateBody};

/// Build the `PUT /_component_template` body for a spec
pub fn to_component_template_body(spec: &ComponentTemplateSpec) -> ComponentTemplateBody {
    let aliases = spec
        .template
        .aliases
        .iter()
        .map(|(key, alias)| {
            let name = alias
                .alias
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| key.clone());
            (name, to_alias_body(alias))
        })
        .collect();

    ComponentTemplateBody {
        template: TemplateBody {
            settings: spec.template.settings.clone(),
            mappings: spec.template.mappings.clone(),
            aliases,
        },
        version: spec.version,
        allow_auto_create: spec.allow_auto_create.then_some(true),
        meta: spec.meta.clone(),
    }
}

fn to_alias_body(alias: &AliasSpec) -> AliasBody {
    AliasBody {
        filter: alias.filter.clone(),
        routing: alias.routing.clone(),
        index_routing: alias.index_routing.clone(),
        search_routing: alias.search_routing.clone(),
        is_hidden: alias.is_hidden,
        is_write_index: alias.is_write_index,
        must_exist: alias.must_exist,
    }
}

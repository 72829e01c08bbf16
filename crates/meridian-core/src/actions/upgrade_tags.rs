//! Deprecated-tag migration.
//!
//! Driven by pairs of old and replacement tag maps, the shape used by
//! tagging-preset deprecation lists. Old values may be `*` (match any
//! value, remembering it) and replacement values may be `*` (keep or
//! default to `yes`) or `$1` (carry the remembered value over). A value
//! inside a semicolon-delimited list is migrated in place, keeping its
//! position.

use crate::entity::{EntityId, Tags};
use crate::graph::Graph;

use super::Action;

/// Rewrite an entity's deprecated tags to their modern form.
#[derive(Debug, Clone)]
pub struct UpgradeTags {
    entity_id: EntityId,
    old_tags: Tags,
    replace_tags: Option<Tags>,
}

impl UpgradeTags {
    pub fn new(entity_id: impl Into<EntityId>, old_tags: Tags, replace_tags: Option<Tags>) -> Self {
        Self {
            entity_id: entity_id.into(),
            old_tags,
            replace_tags,
        }
    }
}

impl Action for UpgradeTags {
    fn apply(&self, graph: &Graph) -> Graph {
        let entity = graph.entity(&self.entity_id);
        let mut tags = entity.tags().clone();
        let mut transfer_value: Option<String> = None;
        let mut semi_index: Option<usize> = None;

        for (old_key, old_value) in &self.old_tags {
            let Some(current) = tags.get(old_key).cloned() else {
                continue;
            };

            if old_value == "*" {
                transfer_value = Some(current);
                tags.remove(old_key);
            } else if *old_value == current {
                tags.remove(old_key);
            } else {
                // The old value may sit inside a semicolon-delimited list.
                let mut vals: Vec<&str> =
                    current.split(';').filter(|s| !s.is_empty()).collect();
                let old_index = vals.iter().position(|v| v == old_value);
                match old_index {
                    Some(i) if vals.len() > 1 => {
                        if self
                            .replace_tags
                            .as_ref()
                            .is_some_and(|r| r.contains_key(old_key))
                        {
                            semi_index = Some(i);
                        }
                        vals.remove(i);
                        tags.insert(old_key.clone(), vals.join(";"));
                    }
                    _ => {
                        tags.remove(old_key);
                    }
                }
            }
        }

        if let Some(replace) = &self.replace_tags {
            for (key, value) in replace {
                match value.as_str() {
                    "*" => {
                        // Keep any honest pre-existing value; `no` is a
                        // troll tag and gets overwritten like absence.
                        let keep = tags.get(key).is_some_and(|v| v != "no");
                        if !keep {
                            tags.insert(key.clone(), "yes".to_owned());
                        }
                    }
                    "$1" => {
                        if let Some(v) = &transfer_value {
                            tags.insert(key.clone(), v.clone());
                        }
                    }
                    _ => {
                        let into_list = tags.contains_key(key)
                            && self.old_tags.contains_key(key)
                            && semi_index.is_some();
                        if into_list {
                            let existing = tags.get(key).cloned().unwrap_or_default();
                            let mut vals: Vec<&str> =
                                existing.split(';').filter(|s| !s.is_empty()).collect();
                            if !vals.contains(&value.as_str()) {
                                let at =
                                    semi_index.unwrap_or(vals.len()).min(vals.len());
                                vals.insert(at, value);
                                tags.insert(key.clone(), vals.join(";"));
                            }
                        } else {
                            tags.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        graph.replace(entity.with_tags(tags))
    }
}

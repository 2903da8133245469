//! Dependency analysis around a single table.
//!
//! The left side lists objects that reference the target (foreign keys of
//! other tables, views mentioning it, triggers on it). The right side lists
//! what the target references (its own foreign keys and indexes) plus the
//! seed-data files that populate it. Both sides are walked breadth-first up
//! to [`MAX_LEVEL`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use crate::datasource::DataSource;
use crate::error::{Error, Result};
use crate::model::{EntityInfo, Relation, SchemaManager, View};

pub const MAX_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Relation,
    View,
    Trigger,
    Index,
    Data,
}

/// One hop between the target and a reported item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub schema_name: String,
    pub table_name: String,
    pub relation_type: DependencyKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyItem {
    pub kind: DependencyKind,
    pub schema_name: String,
    pub table_name: Option<String>,
    pub object_name: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyReport {
    pub target_table: EntityInfo,
    pub left: BTreeMap<String, Vec<DependencyItem>>,
    pub right: BTreeMap<String, Vec<DependencyItem>>,
}

impl DependencyReport {
    pub fn left_level(&self, level: u8) -> &[DependencyItem] {
        self.left
            .get(&level_key(level))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn right_level(&self, level: u8) -> &[DependencyItem] {
        self.right
            .get(&level_key(level))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// A table on the current frontier and the hops that led to it.
#[derive(Debug, Clone)]
struct Frontier {
    entity: EntityInfo,
    path: Vec<PathStep>,
}

pub struct DependencyAnalyzer<'a> {
    schemas: &'a SchemaManager,
    project_dir: Option<&'a Path>,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(schemas: &'a SchemaManager) -> Self {
        Self {
            schemas,
            project_dir: None,
        }
    }

    /// Enable data-file discovery under `project_dir`.
    pub fn with_project_dir(mut self, project_dir: &'a Path) -> Self {
        self.project_dir = Some(project_dir);
        self
    }

    pub fn analyze(
        &self,
        schema_name: &str,
        table_name: &str,
        left_level: u8,
        right_level: u8,
    ) -> Result<DependencyReport> {
        for (side, level) in [("left_level", left_level), ("right_level", right_level)] {
            if level > MAX_LEVEL {
                return Err(Error::InvalidArgument(format!(
                    "{side} must be between 0 and {MAX_LEVEL}, got {level}"
                )));
            }
        }

        let schema = self.schemas.require(schema_name)?;
        let target = EntityInfo::new(schema_name, table_name);
        let view_target = if schema.tables.contains(table_name) {
            None
        } else if let Some(view) = schema.views.get(table_name) {
            Some(view)
        } else {
            return Err(Error::not_found("table", target.to_string()));
        };

        let left = match view_target {
            Some(_) => empty_levels(left_level),
            None => self.walk(&target, Side::Left, left_level),
        };
        let right = match view_target {
            Some(view) => self.walk_from_view(schema_name, view, right_level),
            None => self.walk(&target, Side::Right, right_level),
        };

        tracing::debug!(
            event = "dependencies_analyzed",
            target = %target,
            left = left.values().map(Vec::len).sum::<usize>(),
            right = right.values().map(Vec::len).sum::<usize>()
        );

        Ok(DependencyReport {
            target_table: target,
            left,
            right,
        })
    }

    fn walk(
        &self,
        target: &EntityInfo,
        side: Side,
        max_level: u8,
    ) -> BTreeMap<String, Vec<DependencyItem>> {
        let frontier = vec![Frontier {
            entity: target.clone(),
            path: Vec::new(),
        }];
        let mut visited = BTreeSet::from([target.clone()]);
        self.expand(frontier, side, 1, max_level, &mut visited)
    }

    /// A view has no foreign keys of its own; its right side starts from the
    /// tables named in its SELECT text.
    fn walk_from_view(
        &self,
        schema_name: &str,
        view: &View,
        max_level: u8,
    ) -> BTreeMap<String, Vec<DependencyItem>> {
        let mut levels = empty_levels(max_level);
        if max_level == 0 {
            return levels;
        }

        let mut visited = BTreeSet::new();
        let mut frontier = Vec::new();
        let mut first = Vec::new();
        for entity in self.tables_in_view(view) {
            first.push(DependencyItem {
                kind: DependencyKind::View,
                schema_name: entity.schema_name.clone(),
                table_name: Some(entity.table_name.clone()),
                object_name: view.view_name.clone(),
                details: json!({
                    "view_schema": schema_name,
                    "select_statement": view.select_statement,
                }),
                path: Vec::new(),
            });
            visited.insert(entity.clone());
            frontier.push(Frontier {
                path: vec![PathStep {
                    schema_name: entity.schema_name.clone(),
                    table_name: entity.table_name.clone(),
                    relation_type: DependencyKind::View,
                }],
                entity,
            });
        }
        levels.insert(level_key(1), first);
        levels.extend(self.expand(frontier, Side::Right, 2, max_level, &mut visited));
        levels
    }

    fn expand(
        &self,
        mut frontier: Vec<Frontier>,
        side: Side,
        start_level: u8,
        max_level: u8,
        visited: &mut BTreeSet<EntityInfo>,
    ) -> BTreeMap<String, Vec<DependencyItem>> {
        let mut levels = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for level in start_level..=max_level {
            let mut items = Vec::new();
            let mut next = Vec::new();

            for node in &frontier {
                let found = match side {
                    Side::Left => self.left_references(&node.entity),
                    Side::Right => self.right_references(&node.entity, level),
                };
                for mut item in found {
                    let identity = (
                        item.kind,
                        item.schema_name.clone(),
                        item.table_name.clone(),
                        item.object_name.clone(),
                    );
                    if !seen.insert(identity) {
                        continue;
                    }
                    item.path = node.path.clone();

                    if item.kind == DependencyKind::Relation {
                        if let Some(table_name) = &item.table_name {
                            let entity = EntityInfo::new(&item.schema_name, table_name);
                            if visited.insert(entity.clone()) {
                                let mut path = node.path.clone();
                                path.push(PathStep {
                                    schema_name: entity.schema_name.clone(),
                                    table_name: entity.table_name.clone(),
                                    relation_type: item.kind,
                                });
                                next.push(Frontier { entity, path });
                            }
                        }
                    }
                    items.push(item);
                }
            }

            levels.insert(level_key(level), items);
            frontier = next;
        }
        levels
    }

    /// Objects whose definition mentions `entity`.
    fn left_references(&self, entity: &EntityInfo) -> Vec<DependencyItem> {
        let mut items = Vec::new();
        if self.schemas.find_table(entity).is_none() {
            return items;
        }

        for schema in self.schemas.iter() {
            for table in schema.tables.iter() {
                for relation in table.relations.iter() {
                    if relation.target == *entity {
                        items.push(relation_item(
                            relation,
                            &schema.name,
                            &table.table_name,
                            &table.table_name,
                        ));
                    }
                }
            }
        }

        match word_pattern(&entity.table_name) {
            Ok(pattern) => {
                for schema in self.schemas.iter() {
                    for view in schema.views.iter() {
                        if pattern.is_match(&view.select_statement) {
                            items.push(DependencyItem {
                                kind: DependencyKind::View,
                                schema_name: schema.name.clone(),
                                table_name: None,
                                object_name: view.view_name.clone(),
                                details: json!({ "select_statement": view.select_statement }),
                                path: Vec::new(),
                            });
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    event = "view_scan_skipped",
                    table = %entity,
                    error = %err
                );
            }
        }

        if let Some(schema) = self.schemas.get(&entity.schema_name) {
            for trigger in schema.triggers.iter() {
                if trigger.table_name == entity.table_name {
                    items.push(DependencyItem {
                        kind: DependencyKind::Trigger,
                        schema_name: schema.name.clone(),
                        table_name: Some(trigger.table_name.clone()),
                        object_name: trigger.trigger_name.clone(),
                        details: json!({
                            "timing": trigger.timing.as_sql(),
                            "event": trigger.event.as_sql(),
                            "condition": trigger.condition,
                            "body": trigger.body,
                        }),
                        path: Vec::new(),
                    });
                }
            }
        }

        items
    }

    /// Objects `entity` depends on, plus the files seeding it.
    fn right_references(&self, entity: &EntityInfo, level: u8) -> Vec<DependencyItem> {
        let mut items = Vec::new();
        let Some(table) = self.schemas.find_table(entity) else {
            return items;
        };

        for relation in table.relations.iter() {
            items.push(relation_item(
                relation,
                &relation.target.schema_name,
                &relation.target.table_name,
                &table.table_name,
            ));
        }

        if level == 1 {
            for (position, index) in table.indexes.iter().enumerate() {
                let object_name = if index.index_name.is_empty() {
                    format!("{}_IX{}", table.table_name, position)
                } else {
                    index.index_name.clone()
                };
                items.push(DependencyItem {
                    kind: DependencyKind::Index,
                    schema_name: entity.schema_name.clone(),
                    table_name: Some(entity.table_name.clone()),
                    object_name,
                    details: json!({
                        "columns": index.columns,
                        "index_type": index.index_type.as_str(),
                        "unique": index.unique,
                        "partial_condition": index.partial_condition,
                        "include_columns": index.include_columns,
                    }),
                    path: Vec::new(),
                });
            }
        }

        items.extend(self.data_sources(entity));
        items
    }

    /// Every `.dat` file for `entity` across all environments and mappings.
    fn data_sources(&self, entity: &EntityInfo) -> Vec<DependencyItem> {
        let Some(project_dir) = self.project_dir else {
            return Vec::new();
        };

        let mut items = Vec::new();
        for environ_dir in subdirectories(project_dir) {
            for mapping_dir in subdirectories(&environ_dir) {
                let sources = match DataSource::discover(
                    &mapping_dir,
                    &entity.schema_name,
                    &entity.table_name,
                ) {
                    Ok(sources) => sources,
                    Err(err) => {
                        tracing::warn!(
                            event = "data_scan_failed",
                            dir = %mapping_dir.display(),
                            error = %err
                        );
                        continue;
                    }
                };

                for source in sources {
                    let record_count = match source.load() {
                        Ok(rows) => rows.len(),
                        Err(err) => {
                            tracing::warn!(
                                event = "data_file_unreadable",
                                path = %source.path.display(),
                                error = %err
                            );
                            0
                        }
                    };
                    let relative = source
                        .path
                        .strip_prefix(project_dir)
                        .unwrap_or(&source.path)
                        .display()
                        .to_string();
                    items.push(DependencyItem {
                        kind: DependencyKind::Data,
                        schema_name: entity.schema_name.clone(),
                        table_name: Some(entity.table_name.clone()),
                        object_name: source.file_name(),
                        details: json!({
                            "environ": dir_name(&environ_dir),
                            "mapping": dir_name(&mapping_dir),
                            "segment": source.segment,
                            "record_count": record_count,
                            "data_file_path": relative,
                        }),
                        path: Vec::new(),
                    });
                }
            }
        }
        items
    }

    fn tables_in_view(&self, view: &View) -> Vec<EntityInfo> {
        let mut found = Vec::new();
        for schema in self.schemas.iter() {
            for table in schema.tables.iter() {
                match word_pattern(&table.table_name) {
                    Ok(pattern) if pattern.is_match(&view.select_statement) => {
                        found.push(EntityInfo::new(&schema.name, &table.table_name));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            event = "view_scan_skipped",
                            view = %view.view_name,
                            error = %err
                        );
                    }
                }
            }
        }
        found
    }
}

fn relation_item(
    relation: &Relation,
    schema_name: &str,
    table_name: &str,
    source_table: &str,
) -> DependencyItem {
    let bind_columns: Vec<Value> = relation
        .bind_columns
        .iter()
        .map(|bind| {
            json!({
                "source_column": bind.source_column,
                "target_column": bind.target_column,
            })
        })
        .collect();
    DependencyItem {
        kind: DependencyKind::Relation,
        schema_name: schema_name.to_string(),
        table_name: Some(table_name.to_string()),
        object_name: relation.object_name(source_table),
        details: json!({
            "constraint_name": relation.constraint_name,
            "bind_columns": bind_columns,
            "on_delete": relation.on_delete.as_sql(),
            "on_update": relation.on_update.as_sql(),
            "cardinality_source": relation.cardinality_source,
            "cardinality_target": relation.cardinality_target,
        }),
        path: Vec::new(),
    }
}

/// Case-insensitive, word-bounded match on a table name.
fn word_pattern(name: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
}

fn level_key(level: u8) -> String {
    format!("level_{level}")
}

fn empty_levels(max_level: u8) -> BTreeMap<String, Vec<DependencyItem>> {
    (1..=max_level).map(|level| (level_key(level), Vec::new())).collect()
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

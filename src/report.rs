//! Chart report documents.
//!
//! A report accumulates DPS values under hierarchical names ("Trinket X/300"
//! inserts the leaf 300 under the branch "Trinket X"), computes rankings over
//! the first hierarchy level and serializes to a JSON document the chart
//! frontend consumes directly.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::build_info;
use crate::character::CharacterProfile;
use crate::config::Settings;
use crate::error::SimError;

/// One node of the hierarchical result tree: either a DPS leaf or a branch of
/// named children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataNode {
    Value(i64),
    Branch(BTreeMap<String, DataNode>),
}

impl DataNode {
    /// Largest leaf anywhere under this node. Used as the ranking key.
    pub fn max_value(&self) -> i64 {
        match self {
            DataNode::Value(value) => *value,
            DataNode::Branch(children) => {
                children.values().map(DataNode::max_value).max().unwrap_or(0)
            }
        }
    }
}

/// Insert `value` at the path `components` under `tree`, creating branches as
/// needed. An existing leaf on the path is upgraded to a branch.
fn insert_path(tree: &mut BTreeMap<String, DataNode>, components: &[&str], value: i64) {
    let (head, rest) = match components.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        tree.insert(head.to_string(), DataNode::Value(value));
        return;
    }
    let entry = tree
        .entry(head.to_string())
        .or_insert_with(|| DataNode::Branch(BTreeMap::new()));
    if let DataNode::Value(_) = entry {
        *entry = DataNode::Branch(BTreeMap::new());
    }
    if let DataNode::Branch(children) = entry {
        insert_path(children, rest, value);
    }
}

/// Echo of the combat settings the report was generated under.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsEcho {
    pub tier: String,
    pub fight_style: String,
    pub iterations: String,
    pub target_error: String,
    pub ptr: bool,
}

/// A complete chart document.
#[derive(Debug, Serialize)]
pub struct Report {
    pub title: String,
    pub subtitle: String,
    /// Generation time, minute precision.
    pub timestamp: String,
    /// Build hash of the simulator that produced the data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simc_hash: Option<String>,
    pub generated_by: String,
    pub simc_settings: SettingsEcho,
    /// The seed character profile, for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CharacterProfile>,
    pub data: BTreeMap<String, DataNode>,
    /// Display-name translations for data keys.
    pub translations: BTreeMap<String, String>,
    /// First-level keys in ranking order (best first).
    pub sorted_data_keys: Vec<String>,
    /// Second-level keys in numeric-aware order, when the tree is nested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted_data_keys_2: Option<Vec<String>>,
    /// Pipeline-specific extras, flattened into the document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        settings: &Settings,
        fight_style: &str,
        profile: Option<CharacterProfile>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            timestamp: Utc::now().format("%Y-%m-%d %H:%M").to_string(),
            simc_hash: None,
            generated_by: format!(
                "simbatch {} ({})",
                build_info::BUILD_COMMIT,
                build_info::BUILD_DATE
            ),
            simc_settings: SettingsEcho {
                tier: settings.tier.clone(),
                fight_style: fight_style.to_string(),
                iterations: settings.iterations.clone(),
                target_error: settings.target_error.clone(),
                ptr: settings.ptr,
            },
            profile,
            data: BTreeMap::new(),
            translations: BTreeMap::new(),
            sorted_data_keys: Vec::new(),
            sorted_data_keys_2: None,
            extra: Map::new(),
        }
    }

    /// Insert a DPS value under a hierarchical name.
    pub fn insert(&mut self, components: &[&str], value: i64) {
        insert_path(&mut self.data, components, value);
    }

    /// Rank the first-level keys by their best leaf, descending, skipping
    /// `ignored` keys. For nested trees the union of second-level keys is
    /// sorted numerically where possible.
    pub fn compute_rankings(&mut self, ignored: &[String]) {
        let mut keys: Vec<&String> = self
            .data
            .keys()
            .filter(|key| !ignored.contains(key))
            .collect();
        keys.sort_by_key(|key| Reverse(self.data[*key].max_value()));
        self.sorted_data_keys = keys.into_iter().cloned().collect();

        let mut second_level: Vec<String> = Vec::new();
        for node in self.data.values() {
            if let DataNode::Branch(children) = node {
                for key in children.keys() {
                    if !second_level.contains(key) {
                        second_level.push(key.clone());
                    }
                }
            }
        }
        if second_level.is_empty() {
            self.sorted_data_keys_2 = None;
        } else {
            second_level.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            });
            self.sorted_data_keys_2 = Some(second_level);
        }
    }

    /// Write the document as pretty-printed JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), SimError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report::new("Trinkets", "Elemental Shaman", &Settings::default(), "patchwerk", None)
    }

    #[test]
    fn test_insert_builds_nested_tree() {
        let mut r = report();
        r.insert(&["Trinket X", "300"], 1000);
        r.insert(&["Trinket X", "320"], 1100);
        r.insert(&["Trinket Y", "300"], 900);

        let DataNode::Branch(children) = &r.data["Trinket X"] else {
            panic!("expected branch");
        };
        assert_eq!(children["300"], DataNode::Value(1000));
        assert_eq!(children["320"], DataNode::Value(1100));
        assert_eq!(r.data["Trinket X"].max_value(), 1100);
        assert_eq!(r.data["Trinket Y"].max_value(), 900);
    }

    #[test]
    fn test_untagged_serialization() {
        let mut r = report();
        r.insert(&["baseline"], 100);
        r.insert(&["Trinket X", "300"], 150);

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["data"]["baseline"], 100);
        assert_eq!(json["data"]["Trinket X"]["300"], 150);
    }

    #[test]
    fn test_one_level_ranking_skips_ignored() {
        let mut r = report();
        r.insert(&["baseline"], 100);
        r.insert(&["A"], 150);
        r.insert(&["B"], 120);
        r.compute_rankings(&["baseline".to_string()]);

        assert_eq!(r.sorted_data_keys, vec!["A", "B"]);
        assert!(r.sorted_data_keys_2.is_none());
    }

    #[test]
    fn test_two_level_ranking_by_max_leaf() {
        let mut r = report();
        r.insert(&["X", "300"], 1000);
        r.insert(&["X", "320"], 1300);
        r.insert(&["Y", "300"], 1100);
        r.insert(&["Y", "320"], 1200);
        r.compute_rankings(&[]);

        // X's best leaf beats Y's best leaf.
        assert_eq!(r.sorted_data_keys, vec!["X", "Y"]);
        assert_eq!(
            r.sorted_data_keys_2,
            Some(vec!["300".to_string(), "320".to_string()])
        );
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        report().write_to(&path).unwrap();
        assert!(path.exists());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"title\": \"Trinkets\""));
    }
}

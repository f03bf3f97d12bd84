//! Known maps for rich presence images.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_DRP_INFO: &str = r#"{
    "maps": [
        { "map_names": ["ctf_2fort", "ctf_2fort_invasion"] },
        { "map_names": ["cp_badlands"] },
        { "map_names": ["cp_dustbowl"] },
        { "map_names": ["cp_granary"] },
        { "map_names": ["cp_gorge"] },
        { "map_names": ["cp_process_final"] },
        { "map_names": ["cp_sunshine"] },
        { "map_names": ["cp_steel"] },
        { "map_names": ["koth_harvest_final", "koth_harvest_event"] },
        { "map_names": ["koth_viaduct", "koth_viaduct_event"] },
        { "map_names": ["koth_lakeside_final", "koth_lakeside_event"] },
        { "map_names": ["pl_badwater"] },
        { "map_names": ["pl_borneo"] },
        { "map_names": ["pl_goldrush"] },
        { "map_names": ["pl_swiftwater_final1"] },
        { "map_names": ["pl_upward"] },
        { "map_names": ["plr_hightower", "plr_hightower_event"] },
        { "map_names": ["mvm_coaltown"] },
        { "map_names": ["mvm_decoy"] },
        { "map_names": ["mvm_mannworks"] },
        { "map_names": ["mvm_rottenburg"] }
    ]
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// First entry is the canonical name used for the image key
    pub map_names: Vec<String>,
}

impl MapInfo {
    pub fn image_key(&self) -> Option<String> {
        self.map_names.first().map(|name| format!("map_{}", name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrpInfo {
    #[serde(default)]
    pub maps: Vec<MapInfo>,
}

impl Default for DrpInfo {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_DRP_INFO).unwrap_or_else(|e| {
            tracing::error!("Built-in map list is invalid: {}", e);
            Self { maps: Vec::new() }
        })
    }
}

impl DrpInfo {
    /// Load a map list from disk, falling back to the built-in list
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Failed to read map list {}, using defaults: {}",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse map list {}, using defaults: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn find_map(&self, map_name: &str) -> Option<&MapInfo> {
        let bare_name = strip_workshop_name(map_name);

        self.maps.iter().find(|m| {
            m.map_names
                .iter()
                .any(|name| name == map_name || name == bare_name)
        })
    }
}

/// `workshop/cp_foo.ugc12345` -> `cp_foo`
fn strip_workshop_name(map_name: &str) -> &str {
    let Some(rest) = map_name.strip_prefix("workshop/") else {
        return map_name;
    };

    match rest.find(".ugc") {
        Some(end) => rest.get(..end).unwrap_or(rest),
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_list_parses() {
        let info = DrpInfo::default();
        assert!(!info.maps.is_empty());
    }

    #[test]
    fn test_find_map() {
        let info = DrpInfo::default();

        let map = info.find_map("koth_harvest_event").unwrap();
        assert_eq!(map.image_key().as_deref(), Some("map_koth_harvest_final"));

        let workshop = info.find_map("workshop/pl_upward.ugc1234567").unwrap();
        assert_eq!(workshop.image_key().as_deref(), Some("map_pl_upward"));

        assert!(info.find_map("cp_not_a_real_map").is_none());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drp.json");

        assert_eq!(DrpInfo::load(&path), DrpInfo::default());

        std::fs::write(&path, r#"{"maps":[{"map_names":["cp_custom"]}]}"#).unwrap();
        let info = DrpInfo::load(&path);
        assert_eq!(info.maps.len(), 1);
        assert!(info.find_map("cp_custom").is_some());
    }
}

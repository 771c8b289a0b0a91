//! Structured view of the simulator's JSON output.
//!
//! Only the slice of the document the engine consumes is modeled: the
//! baseline actor's mean DPS, the per-profileset means, and the tool's build
//! revision for provenance stamping.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SimcResult {
    /// Build hash of the simulator that produced this result.
    #[serde(default)]
    pub git_revision: Option<String>,
    pub sim: SimOutput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimOutput {
    #[serde(default)]
    pub players: Vec<PlayerResult>,
    #[serde(default)]
    pub profilesets: Option<ProfilesetResults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResult {
    pub name: String,
    pub collected_data: CollectedData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectedData {
    pub dps: MetricSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilesetResults {
    #[serde(default)]
    pub results: Vec<ProfilesetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilesetEntry {
    pub name: String,
    pub mean: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_profileset_result() {
        let raw = r#"{
            "git_revision": "abc1234",
            "sim": {
                "players": [
                    {"name": "A", "collected_data": {"dps": {"mean": 1000.5}}}
                ],
                "profilesets": {
                    "results": [
                        {"name": "B", "mean": 1200.2}
                    ]
                }
            }
        }"#;
        let result: SimcResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.git_revision.as_deref(), Some("abc1234"));
        assert_eq!(result.sim.players[0].name, "A");
        assert_eq!(result.sim.players[0].collected_data.dps.mean, 1000.5);
        let sets = result.sim.profilesets.unwrap();
        assert_eq!(sets.results[0].name, "B");
    }

    #[test]
    fn test_parses_single_profile_result() {
        let raw = r#"{
            "sim": {
                "players": [
                    {"name": "Solo", "collected_data": {"dps": {"mean": 4321.0}}}
                ]
            }
        }"#;
        let result: SimcResult = serde_json::from_str(raw).unwrap();
        assert!(result.git_revision.is_none());
        assert!(result.sim.profilesets.is_none());
    }
}

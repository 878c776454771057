use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const ROUTER_TRIGGERS_FILE_NAME: &str = "router-triggers.json";
const ROUTER_TRIGGERS_SCHEMA_VERSION: u32 = 1;

fn router_triggers_schema_version() -> u32 {
    ROUTER_TRIGGERS_SCHEMA_VERSION
}

fn default_knowledge_triggers() -> Vec<String> {
    ["最新研究", "研究摘要", "文獻"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_resume_triggers() -> Vec<String> {
    ["恢復ai", "resume ai", "回到機器人"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_handoff_triggers() -> Vec<String> {
    ["真人客服", "human agent", "轉真人"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Deterministic trigger keywords for the router, loaded from
/// `router-triggers.json`. Crisis triggers default to empty: deployments opt
/// in per market, and untriggered crisis detection stays with the classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouterTriggerFile {
    #[serde(default = "router_triggers_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_knowledge_triggers")]
    pub knowledge_triggers: Vec<String>,
    #[serde(default)]
    pub crisis_triggers: Vec<String>,
    #[serde(default = "default_resume_triggers")]
    pub resume_triggers: Vec<String>,
    #[serde(default = "default_handoff_triggers")]
    pub handoff_triggers: Vec<String>,
}

impl Default for RouterTriggerFile {
    fn default() -> Self {
        Self {
            schema_version: ROUTER_TRIGGERS_SCHEMA_VERSION,
            knowledge_triggers: default_knowledge_triggers(),
            crisis_triggers: Vec::new(),
            resume_triggers: default_resume_triggers(),
            handoff_triggers: default_handoff_triggers(),
        }
    }
}

impl RouterTriggerFile {
    /// Returns the configured knowledge triggers contained in `message`,
    /// case-insensitively for ASCII.
    pub fn matched_knowledge_triggers(&self, message: &str) -> Vec<String> {
        matched_triggers(message, &self.knowledge_triggers)
    }

    pub fn matched_crisis_triggers(&self, message: &str) -> Vec<String> {
        matched_triggers(message, &self.crisis_triggers)
    }

    pub fn is_resume_trigger(&self, message: &str) -> bool {
        !matched_triggers(message, &self.resume_triggers).is_empty()
    }

    pub fn is_handoff_trigger(&self, message: &str) -> bool {
        !matched_triggers(message, &self.handoff_triggers).is_empty()
    }
}

fn matched_triggers(message: &str, triggers: &[String]) -> Vec<String> {
    let haystack = message.to_lowercase();
    triggers
        .iter()
        .filter(|trigger| haystack.contains(&trigger.to_lowercase()))
        .cloned()
        .collect()
}

pub fn load_router_triggers(path: &Path) -> Result<RouterTriggerFile> {
    if !path.exists() {
        return Ok(RouterTriggerFile::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read router triggers {}", path.display()))?;
    parse_router_triggers(&raw)
        .with_context(|| format!("invalid router triggers {}", path.display()))
}

pub fn parse_router_triggers(raw: &str) -> Result<RouterTriggerFile> {
    let mut parsed = serde_json::from_str::<RouterTriggerFile>(raw)
        .context("failed to parse router triggers")?;
    if parsed.schema_version != ROUTER_TRIGGERS_SCHEMA_VERSION {
        bail!(
            "unsupported router triggers schema_version {} (expected {})",
            parsed.schema_version,
            ROUTER_TRIGGERS_SCHEMA_VERSION
        );
    }
    normalize_trigger_list(&mut parsed.knowledge_triggers, "knowledge_triggers")?;
    normalize_trigger_list(&mut parsed.crisis_triggers, "crisis_triggers")?;
    normalize_trigger_list(&mut parsed.resume_triggers, "resume_triggers")?;
    normalize_trigger_list(&mut parsed.handoff_triggers, "handoff_triggers")?;
    Ok(parsed)
}

fn normalize_trigger_list(triggers: &mut Vec<String>, field_name: &str) -> Result<()> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for raw in std::mem::take(triggers) {
        let trigger = raw.trim().to_string();
        if trigger.is_empty() {
            bail!("{} cannot contain empty entries", field_name);
        }
        if seen.insert(trigger.to_lowercase()) {
            normalized.push(trigger);
        }
    }
    *triggers = normalized;
    Ok(())
}

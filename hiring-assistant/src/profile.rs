//! Company profile: long-lived, cross-session hiring context
//!
//! The profile is loaded once per process and handed to the conversation
//! engine as an immutable snapshot. The engine never writes it; profile
//! facts surfaced during extraction come back as explicit updates that the
//! caller applies through [`ProfileStore`].

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Company facts used to personalize questions and generated documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub size: Option<String>,
    pub stage: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub remote_policy: Option<String>,
    pub description: Option<String>,
    pub values: Option<String>,
    pub mission: Option<String>,
    pub created_at: Option<DateTime<Local>>,
    pub updated_at: Option<DateTime<Local>>,
}

const REQUIRED_FIELDS: [&str; 4] = ["name", "size", "stage", "industry"];

impl CompanyProfile {
    pub fn is_complete(&self) -> bool {
        self.missing_required_fields().is_empty()
    }

    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for field in REQUIRED_FIELDS {
            let value = match field {
                "name" => &self.name,
                "size" => &self.size,
                "stage" => &self.stage,
                _ => &self.industry,
            };
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                missing.push(field);
            }
        }
        missing
    }

    /// Apply string updates by field name, ignoring unknown keys
    ///
    /// Returns true when at least one field changed.
    pub fn apply_updates(&mut self, updates: &BTreeMap<String, String>) -> bool {
        let mut changed = false;
        for (key, value) in updates {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "name" => &mut self.name,
                "size" => &mut self.size,
                "stage" => &mut self.stage,
                "industry" => &mut self.industry,
                "location" => &mut self.location,
                "remote_policy" => &mut self.remote_policy,
                "description" => &mut self.description,
                "values" => &mut self.values,
                "mission" => &mut self.mission,
                _ => continue,
            };
            if slot.as_deref() != Some(value) {
                *slot = Some(value.to_string());
                changed = true;
            }
        }
        if changed {
            self.updated_at = Some(Local::now());
        }
        changed
    }

    /// Prompt-ready summary block, with placeholders for unknown fields
    pub fn summary(&self) -> String {
        let get = |v: &Option<String>, default: &str| -> String {
            v.as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default)
                .to_string()
        };
        format!(
            "- Name: {}\n- Description: {}\n- Values: {}\n- Mission: {}\n- Size: {}\n- Stage: {}\n- Industry: {}\n- Location: {}\n- Remote Policy: {}",
            get(&self.name, "Our Company"),
            get(&self.description, "An early-stage company"),
            get(&self.values, "Not specified"),
            get(&self.mission, "Not specified"),
            get(&self.size, "Early-stage startup"),
            get(&self.stage, "Growing startup"),
            get(&self.industry, "Technology"),
            get(&self.location, "Remote-friendly"),
            get(&self.remote_policy, "Flexible"),
        )
    }
}

/// YAML-backed storage for the company profile
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the profile, returning an empty one when no file exists yet
    pub fn load(&self) -> Result<CompanyProfile> {
        if !self.path.exists() {
            return Ok(CompanyProfile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read profile file: {}", self.path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse profile YAML: {}", self.path.display()))
    }

    pub fn save(&self, profile: &mut CompanyProfile) -> Result<()> {
        let now = Local::now();
        if profile.created_at.is_none() {
            profile.created_at = Some(now);
        }
        profile.updated_at = Some(now);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let yaml = serde_yaml::to_string(profile)?;
        std::fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write profile file: {}", self.path.display()))?;
        Ok(())
    }

    /// Apply updates and persist when anything changed
    pub fn apply(&self, updates: &BTreeMap<String, String>) -> Result<CompanyProfile> {
        let mut profile = self.load()?;
        if profile.apply_updates(updates) {
            self.save(&mut profile)?;
        }
        Ok(profile)
    }
}

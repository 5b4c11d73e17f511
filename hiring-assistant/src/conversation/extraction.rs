//! Extraction engine: free text in, structured role updates out
//!
//! Calls the completion interface with a structured-extraction prompt and
//! maps the (possibly messy) response onto role updates. Malformed model
//! output never surfaces as an error - a deterministic fallback path keeps
//! the conversation moving. Only an unavailable completion service is
//! reported to the caller, so the same turn can be retried.

use crate::conversation::state::{BudgetRange, JobRole};
use crate::llm_utils::json;
use crate::profile::CompanyProfile;
use crate::prompts;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use hiring_assistant_sdk::{Completion, CompletionError, ResponseFormat};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Sanity cap on roles accepted from a single utterance
pub const MAX_ROLES_PER_TURN: usize = 20;

/// Fuzzy title match must reach 3/4 of the candidate's self-match score
const SIMILARITY_NUM: i64 = 3;
const SIMILARITY_DEN: i64 = 4;

/// Completion interface unavailable; the turn may be retried unchanged
#[derive(Debug, Error)]
#[error("extraction service unavailable: {0}")]
pub struct ExtractionServiceError(#[from] pub CompletionError);

/// How the extraction result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The model returned a parseable structured response
    Extracted,
    /// Parse failed; the deterministic fallback path was used
    Fallback,
}

/// Field-level changes for one role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolePatch {
    pub title: Option<String>,
    pub seniority: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    /// Skills mentioned this turn; unioned into the role unless replacing
    pub skills: Vec<String>,
    /// Explicit correction: replace the whole skill list
    pub replace_skills: bool,
    pub budget_range: Option<BudgetRange>,
    pub timeline: Option<String>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.seniority.is_none()
            && self.department.is_none()
            && self.employment_type.is_none()
            && self.skills.is_empty()
            && self.budget_range.is_none()
            && self.timeline.is_none()
    }
}

/// One extracted change: a brand-new role or a patch to an existing one
#[derive(Debug, Clone)]
pub enum RoleUpdate {
    New(RolePatch),
    Patch { role_id: Uuid, patch: RolePatch },
}

/// Outcome of one extraction call
#[derive(Debug, Clone)]
pub struct Extraction {
    pub updates: Vec<RoleUpdate>,
    /// Company facts surfaced in the utterance, applied by the caller
    pub profile_updates: BTreeMap<String, String>,
    pub confidence: Confidence,
    /// True when the per-turn role cap dropped excess entries
    pub truncated: bool,
}

/// Turns user text into structured role updates via the completion interface
pub struct ExtractionEngine {
    completion: Arc<dyn Completion>,
}

impl ExtractionEngine {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }

    /// Extract role updates from user text
    ///
    /// `existing` is the pre-turn role list; `active` the role currently in
    /// focus (patch target for unattributed details and the merge tie-break).
    pub async fn extract(
        &self,
        text: &str,
        existing: &[JobRole],
        profile: &CompanyProfile,
        pending_questions: &[String],
        active: Option<&JobRole>,
    ) -> Result<Extraction, ExtractionServiceError> {
        let prompt = if existing.is_empty() {
            prompts::initial_extraction(text, profile)
        } else {
            prompts::answer_extraction(
                text,
                existing,
                profile,
                pending_questions,
                active.map(|r| r.title.as_str()),
            )
        };

        let raw = self
            .completion
            .complete(&prompt, ResponseFormat::Json)
            .await?;

        let cleaned = json::extract_json(&raw);
        let value = match json::parse_json_value(&cleaned) {
            Ok(value) => value,
            Err(_) => return Ok(fallback(text, existing)),
        };

        Ok(map_extraction(&value, text, existing, active.map(|r| r.id)))
    }
}

/// Map a parsed extraction response onto role updates
fn map_extraction(
    value: &serde_json::Value,
    text: &str,
    existing: &[JobRole],
    active_id: Option<Uuid>,
) -> Extraction {
    // A parseable response without the agreed shape is still malformed
    let Some(entries) = value.get("roles").and_then(|v| v.as_array()) else {
        return fallback(text, existing);
    };

    let mut updates = Vec::new();
    let mut truncated = false;

    for entry in entries {
        if updates.len() >= MAX_ROLES_PER_TURN {
            truncated = true;
            break;
        }
        let Some(patch) = role_patch_from_value(entry) else {
            continue;
        };

        let target = match &patch.title {
            Some(title) => match_existing(title, existing, active_id),
            // No title: the details belong to the role in focus
            None => active_id,
        };

        match target {
            Some(role_id) => updates.push(RoleUpdate::Patch { role_id, patch }),
            None if patch.title.is_some() => updates.push(RoleUpdate::New(patch)),
            // Untitled patch with no active role - nothing to attach it to
            None => {}
        }
    }

    let mut profile_updates = BTreeMap::new();
    if let Some(company) = value.get("company").and_then(|v| v.as_object()) {
        for (key, val) in company {
            if let Some(s) = val.as_str() {
                let s = s.trim();
                if !s.is_empty() {
                    profile_updates.insert(key.clone(), s.to_string());
                }
            }
        }
    }

    Extraction {
        updates,
        profile_updates,
        confidence: Confidence::Extracted,
        truncated,
    }
}

/// Deterministic recovery when structured extraction cannot be parsed
fn fallback(text: &str, existing: &[JobRole]) -> Extraction {
    let updates = if existing.is_empty() {
        let title = noun_phrase_title(text).unwrap_or_else(|| "New Role".to_string());
        vec![RoleUpdate::New(RolePatch {
            title: Some(title),
            ..Default::default()
        })]
    } else {
        // Roles already exist: zero updates, the orchestrator re-asks gently
        Vec::new()
    };

    Extraction {
        updates,
        profile_updates: BTreeMap::new(),
        confidence: Confidence::Fallback,
        truncated: false,
    }
}

fn str_field(entry: &serde_json::Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn role_patch_from_value(entry: &serde_json::Value) -> Option<RolePatch> {
    let patch = RolePatch {
        title: str_field(entry, "title"),
        seniority: str_field(entry, "seniority"),
        department: str_field(entry, "department"),
        employment_type: str_field(entry, "employment_type"),
        skills: entry
            .get("skills")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| s.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        replace_skills: entry
            .get("replace_skills")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        budget_range: entry.get("budget").and_then(parse_budget_value),
        timeline: str_field(entry, "timeline"),
    };

    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

/// Apply a patch to a role, atomically: either every field lands or none
///
/// The only rejection is a budget violating min <= max; validation happens
/// before any mutation. Returns whether the patch was applied.
pub fn apply_patch(role: &mut JobRole, patch: &RolePatch) -> bool {
    if let Some(budget) = &patch.budget_range {
        if !budget.is_valid() {
            return false;
        }
    }

    if let Some(title) = patch.title.as_deref() {
        if !title.trim().is_empty() {
            role.title = title.trim().to_string();
        }
    }
    if let Some(seniority) = &patch.seniority {
        role.seniority = Some(seniority.clone());
    }
    if let Some(department) = &patch.department {
        role.department = Some(department.clone());
    }
    if let Some(employment_type) = &patch.employment_type {
        role.employment_type = Some(employment_type.clone());
    }

    if patch.replace_skills && !patch.skills.is_empty() {
        role.required_skills.clear();
    }
    for skill in &patch.skills {
        role.add_skill(skill);
    }

    if let Some(budget) = &patch.budget_range {
        role.budget_range = Some(budget.clone());
    }
    if let Some(timeline) = patch.timeline.as_deref() {
        if !timeline.trim().is_empty() {
            role.timeline = Some(timeline.trim().to_string());
        }
    }

    true
}

/// Normalize a title for comparison: lowercase, alphanumeric words only
pub(crate) fn normalize(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match an extracted title against known roles
///
/// Exact normalized equality wins outright; otherwise containment or a fuzzy
/// score above the similarity threshold qualifies. Among qualifying roles the
/// active one is preferred, then the most recently discovered.
pub(crate) fn match_existing(
    candidate: &str,
    existing: &[JobRole],
    active_id: Option<Uuid>,
) -> Option<Uuid> {
    let cand_norm = normalize(candidate);
    if cand_norm.is_empty() || existing.is_empty() {
        return None;
    }

    let exact: Vec<Uuid> = existing
        .iter()
        .filter(|r| normalize(&r.title) == cand_norm)
        .map(|r| r.id)
        .collect();
    if !exact.is_empty() {
        return Some(
            active_id
                .filter(|id| exact.contains(id))
                .unwrap_or(*exact.last().unwrap()),
        );
    }

    let matcher = SkimMatcherV2::default();
    let self_score = matcher.fuzzy_match(&cand_norm, &cand_norm).unwrap_or(0);
    if self_score == 0 {
        return None;
    }

    let mut qualifying: Vec<(Uuid, i64)> = Vec::new();
    for role in existing {
        let role_norm = normalize(&role.title);
        if role_norm.is_empty() {
            continue;
        }
        let score = if role_norm.contains(&cand_norm) || cand_norm.contains(&role_norm) {
            self_score
        } else {
            matcher.fuzzy_match(&role_norm, &cand_norm).unwrap_or(0)
        };
        if score > 0 && score * SIMILARITY_DEN >= self_score * SIMILARITY_NUM {
            qualifying.push((role.id, score));
        }
    }

    if let Some(active) = active_id {
        if qualifying.iter().any(|(id, _)| *id == active) {
            return Some(active);
        }
    }

    // max_by_key keeps the last maximum: ties go to the most recent role
    qualifying
        .iter()
        .max_by_key(|(_, score)| *score)
        .map(|(id, _)| *id)
}

const TITLE_INDICATORS: [&str; 12] = [
    "hire",
    "hiring",
    "recruit",
    "recruiting",
    "need",
    "needs",
    "want",
    "wants",
    "looking",
    "for",
    "onboard",
    "add",
];

const TITLE_SKIP: [&str; 14] = [
    "a", "an", "the", "to", "some", "new", "another", "hire", "hiring", "recruit", "find", "me",
    "us", "our",
];

const TITLE_STOP: [&str; 15] = [
    "for",
    "to",
    "with",
    "who",
    "that",
    "in",
    "on",
    "at",
    "by",
    "and",
    "or",
    "within",
    "asap",
    "soon",
    "please",
];

/// Naive noun-phrase heuristic for the fallback title
///
/// Looks for the last hiring indicator word, skips articles/filler, then
/// collects up to five words until a stopword.
pub(crate) fn noun_phrase_title(text: &str) -> Option<String> {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let anchor = tokens
        .iter()
        .rposition(|t| TITLE_INDICATORS.contains(&t.to_lowercase().as_str()))?;

    let mut idx = anchor + 1;
    while idx < tokens.len() && TITLE_SKIP.contains(&tokens[idx].to_lowercase().as_str()) {
        idx += 1;
    }

    let mut words = Vec::new();
    while idx < tokens.len() && words.len() < 5 {
        let token = &tokens[idx];
        if TITLE_STOP.contains(&token.to_lowercase().as_str()) {
            break;
        }
        words.push(title_case(token));
        idx += 1;
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Uppercase the first letter of all-lowercase words; leave mixed case alone
fn title_case(word: &str) -> String {
    if word.chars().any(|c| c.is_uppercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Parse a money amount: "$120k", "150,000", "1.2m"
pub(crate) fn parse_money(s: &str) -> Option<u64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '$' && *c != '€' && *c != '£')
        .collect();
    let lower = cleaned.to_lowercase();
    let lower = lower
        .trim_end_matches("usd")
        .trim_end_matches("eur")
        .trim_end_matches("gbp");

    let (digits, multiplier) = if let Some(prefix) = lower.strip_suffix('k') {
        (prefix, 1_000f64)
    } else if let Some(prefix) = lower.strip_suffix('m') {
        (prefix, 1_000_000f64)
    } else {
        (lower, 1f64)
    };

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Parse a budget string: "$120k-150k", "80k to 100k", "150k"
pub(crate) fn parse_budget_str(s: &str) -> Option<BudgetRange> {
    let currency = if s.contains('€') {
        "EUR"
    } else if s.contains('£') {
        "GBP"
    } else {
        "USD"
    };

    let lower = s.to_lowercase();
    let parts: Vec<&str> = if lower.contains(" to ") {
        lower.splitn(2, " to ").collect()
    } else if s.contains('-') {
        s.splitn(2, '-').collect()
    } else if s.contains('–') {
        s.splitn(2, '–').collect()
    } else {
        vec![s]
    };

    let mut min = parse_money(parts[0])?;
    let max = match parts.get(1) {
        Some(part) => parse_money(part)?,
        None => min,
    };

    // "120-150k": the shorthand multiplier applies to both bounds
    if max >= 1_000 && min < 1_000 {
        min *= 1_000;
    }

    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    Some(BudgetRange::new(min, max, currency))
}

/// Budget from a JSON value: `{min, max, currency}` object or a string
fn parse_budget_value(value: &serde_json::Value) -> Option<BudgetRange> {
    if let Some(s) = value.as_str() {
        return parse_budget_str(s);
    }
    let obj = value.as_object()?;

    let money = |v: Option<&serde_json::Value>| -> Option<u64> {
        let v = v?;
        if let Some(n) = v.as_u64() {
            return Some(n);
        }
        if let Some(f) = v.as_f64() {
            return (f.is_finite() && f >= 0.0).then(|| f.round() as u64);
        }
        v.as_str().and_then(parse_money)
    };

    let min = money(obj.get("min"));
    let max = money(obj.get("max"));
    let currency = obj
        .get("currency")
        .and_then(|v| v.as_str())
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| "USD".to_string());

    // Keep raw bounds; a min > max object is rejected at patch-apply time
    match (min, max) {
        (Some(min), Some(max)) => Some(BudgetRange::new(min, max, currency)),
        (Some(value), None) | (None, Some(value)) => {
            Some(BudgetRange::new(value, value, currency))
        }
        (None, None) => None,
    }
}

//! Prompt templates for completion-interface calls

use crate::conversation::completeness::MissingField;
use crate::conversation::state::JobRole;
use crate::profile::CompanyProfile;
use hiring_assistant_sdk::ContentKind;

/// Compact JSON view of roles for inclusion in prompts
pub fn roles_json(roles: &[JobRole]) -> String {
    let views: Vec<serde_json::Value> = roles
        .iter()
        .map(|role| {
            serde_json::json!({
                "title": role.title,
                "seniority": role.seniority,
                "department": role.department,
                "employment_type": role.employment_type,
                "skills": role.required_skills,
                "budget": role.budget_range.as_ref().map(|b| serde_json::json!({
                    "min": b.min,
                    "max": b.max,
                    "currency": b.currency,
                })),
                "timeline": role.timeline,
            })
        })
        .collect();
    serde_json::to_string_pretty(&views).unwrap_or_else(|_| "[]".to_string())
}

const EXTRACTION_SCHEMA: &str = r#"{
    "roles": [
        {
            "title": "role title",
            "seniority": "senior/junior/founding/etc or null",
            "department": "engineering/marketing/etc or null",
            "employment_type": "full-time/part-time/contract/intern or null",
            "skills": ["skill1", "skill2"],
            "budget": {"min": 120000, "max": 150000, "currency": "USD"},
            "timeline": "6-8 weeks or null",
            "replace_skills": false
        }
    ],
    "company": {
        "size": "company size or omit",
        "stage": "funding stage or omit",
        "industry": "industry or omit",
        "location": "location or omit",
        "remote_policy": "remote policy or omit"
    }
}"#;

/// Structured extraction over the opening hiring request
pub fn initial_extraction(request: &str, profile: &CompanyProfile) -> String {
    format!(
        r#"You are an HR assistant helping a startup plan its hiring. A user made this request:

"{request}"

Company profile (already stored, do not re-ask for it):
{profile}

Extract every distinct job role the user wants to hire for, together with any
role-specific details already provided (seniority, department, employment type,
skills, budget, timeline). Budgets must be numeric yearly amounts; convert
shorthand like "$120k-150k" to min 120000 / max 150000 with the currency.

Return ONLY valid JSON matching this shape. No extra text, no markdown fences.

{schema}

Omit the "company" object entirely unless the request states new company facts.
If the request mentions no hireable role at all, return {{"roles": []}}."#,
        request = request,
        profile = profile.summary(),
        schema = EXTRACTION_SCHEMA,
    )
}

/// Structured extraction over a follow-up answer
pub fn answer_extraction(
    answer: &str,
    roles: &[JobRole],
    profile: &CompanyProfile,
    pending_questions: &[String],
    active_title: Option<&str>,
) -> String {
    let questions = if pending_questions.is_empty() {
        "(none)".to_string()
    } else {
        pending_questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an HR assistant processing a user's answer to hiring questions.

Role currently in focus: {active}
Questions the user was asked:
{questions}

User's answer: "{answer}"

Known roles so far:
{roles}

Company profile:
{profile}

Extract every piece of new information from the answer. Return ONLY valid JSON
matching this shape. No extra text, no markdown fences.

{schema}

Rules:
1. To update an existing role, repeat its exact title from the known roles.
2. Information given without naming a role belongs to the role in focus.
3. If the answer applies one budget or timeline to several named roles, emit
   one entry per role.
4. A genuinely new position becomes a new entry with a title not in the list.
5. Convert budget shorthand ("120k-150k", "$80k") to numeric min/max; a single
   figure means min == max.
6. "skills" lists only skills mentioned in this answer; set "replace_skills"
   to true only when the user is correcting earlier skills ("actually, just
   React and Node").
7. Omit fields the user did not mention; omit "company" unless company facts
   were given."#,
        active = active_title.unwrap_or("(none)"),
        questions = questions,
        answer = answer,
        roles = roles_json(roles),
        profile = profile.summary(),
        schema = EXTRACTION_SCHEMA,
    )
}

/// Contextual clarifying questions for one incomplete role
pub fn question_planning(
    role: &JobRole,
    missing: &[MissingField],
    profile: &CompanyProfile,
) -> String {
    let missing_list = missing
        .iter()
        .map(|f| format!("- {}", f.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an HR assistant gathering the last details needed to prepare hiring
materials for the "{title}" role.

Company profile (already stored, never ask about it):
{profile}

What we know about the role:
{role}

Missing information, most blocking first:
{missing}

Write exactly {count} short, conversational questions, one per missing item,
in the order listed. Reference the role title; where natural, ground a
question in a company fact. Ask ONLY about the missing items.

Return ONLY a JSON array of {count} strings. No extra text, no markdown fences.

["Question 1?", "Question 2?"]"#,
        title = role.title,
        profile = profile.summary(),
        role = roles_json(std::slice::from_ref(role)),
        missing = missing_list,
        count = missing.len(),
    )
}

/// Document prompt for one (role, content kind) cell
pub fn content(kind: ContentKind, role: &JobRole, profile: &CompanyProfile) -> String {
    let skills = if role.required_skills.is_empty() {
        "To be discussed".to_string()
    } else {
        role.required_skills.join(", ")
    };
    let budget = role
        .budget_range
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "Competitive".to_string());
    let seniority = role.seniority.as_deref().unwrap_or("Mid-level");
    let department = role.department.as_deref().unwrap_or("General");
    let timeline = role.timeline.as_deref().unwrap_or("Flexible");

    let header = format!(
        "Company Information:\n{profile}\n\nRole Information:\n- Title: {title}\n- Seniority: {seniority}\n- Department: {department}\n- Required Skills: {skills}\n- Budget Range: {budget}\n- Timeline: {timeline}\n",
        profile = profile.summary(),
        title = role.title,
        seniority = seniority,
        department = department,
        skills = skills,
        budget = budget,
        timeline = timeline,
    );

    match kind {
        ContentKind::JobDescription => format!(
            r#"Create a comprehensive job description for a startup position.

{header}
Create a compelling job description that includes:
1. Role overview and impact
2. Key responsibilities
3. Required qualifications
4. Preferred qualifications
5. What we offer (equity, benefits, growth)
6. Company culture and mission

Naturally incorporate the company's description, values, and mission so
candidates understand the culture and what makes this opportunity unique.
Make it startup-appropriate - emphasize growth, impact, equity, and learning.
Format as clean markdown with proper headings."#,
        ),
        ContentKind::HiringChecklist => format!(
            r#"Create a comprehensive hiring checklist for a startup hiring this role.

{header}
Create a practical checklist covering:

## Pre-Hiring Preparation
- Legal and compliance items
- Budget approval and equity allocation
- Interview team assignment

## Sourcing and Outreach
- Sourcing strategies for this role
- Platform postings and networking

## Interview Process
- Interview stages and formats
- Assessment criteria and scorecards

## Decision and Offer
- Reference checks
- Offer construction (salary, equity, benefits)

## Onboarding Preparation
- Equipment and access setup
- First week planning

Make it startup-specific with practical, actionable checkbox items.
Format as clean markdown."#,
        ),
        ContentKind::HiringTimeline => format!(
            r#"Create a realistic hiring timeline for this startup role.

{header}
Consider:
- Startup constraints and speed needs
- Market competitiveness for this role
- Seniority level and availability
- Interview process complexity

Create a week-by-week timeline including:
1. Preparation phase
2. Active sourcing
3. Interview process
4. Decision and offer
5. Onboarding start

Be realistic for startup environments. Include buffer time for competitive
processes. Format as clean markdown with weekly milestones."#,
        ),
        ContentKind::SalaryRecommendation => format!(
            r#"Provide salary and compensation recommendations for this startup role.

{header}
Provide recommendations for:

## Base Salary Range
- Market rate analysis
- Startup adjustments (typically 10-20% below market)
- Geographic considerations

## Equity Package
- Typical equity range for this role and stage
- Vesting schedule recommendations

## Total Compensation
- Benefits and perks typical for startups
- Competitive positioning

## Negotiation Strategy
- Common negotiation points
- Flexibility areas

Make recommendations specific to startup constraints.
Format as clean markdown with clear ranges and rationale."#,
        ),
        ContentKind::InterviewQuestions => format!(
            r#"Create comprehensive interview questions for this startup role.

{header}
Create questions across multiple categories:

## Technical/Functional Skills
- Role-specific technical questions
- Problem-solving scenarios

## Startup Fit
- Ambiguity and adaptability
- Resource constraints experience

## Leadership/Collaboration
- Team work scenarios
- Communication style

## Company Culture
- Values alignment
- Motivation and goals

## Closing Questions
- Questions for them to ask
- Next steps clarity

Provide 3-5 questions per category with follow-up suggestions. Focus on
adaptability, growth, and impact. Format as clean markdown."#,
        ),
    }
}

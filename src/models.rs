use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A profile invariant was violated. Carries the offending field so callers
/// can surface it without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid profile field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisaType {
    #[serde(rename = "F-1")]
    F1,
    #[serde(rename = "OPT")]
    Opt,
    #[serde(rename = "H-1B")]
    H1b,
    #[serde(rename = "J-1")]
    J1,
    #[serde(rename = "H-4")]
    H4,
    #[serde(rename = "L-1")]
    L1,
}

impl VisaType {
    pub fn label(self) -> &'static str {
        match self {
            Self::F1 => "F-1",
            Self::Opt => "OPT",
            Self::H1b => "H-1B",
            Self::J1 => "J-1",
            Self::H4 => "H-4",
            Self::L1 => "L-1",
        }
    }

    /// Current work authorization implied by the visa alone.
    pub fn work_auth_label(self) -> &'static str {
        match self {
            Self::F1 => "Student (CPT/On-Campus)",
            Self::Opt => "OPT EAD",
            Self::H1b => "H-1B Employment",
            Self::J1 => "Academic Training",
            Self::H4 => "H-4 (limited)",
            Self::L1 => "L-1 Employment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegreeLevel {
    #[serde(rename = "Associate")]
    Associate,
    #[serde(rename = "Bachelor's")]
    Bachelors,
    #[serde(rename = "Master's")]
    Masters,
    #[serde(rename = "PhD")]
    Phd,
}

impl DegreeLevel {
    /// US advanced degrees get the extra master's-cap draw in the H-1B lottery.
    pub fn qualifies_for_masters_cap(self) -> bool {
        matches!(self, Self::Masters | Self::Phd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptStatus {
    #[default]
    None,
    Applied,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerGoal {
    #[default]
    StayUsLongterm,
    ReturnHome,
    Undecided,
}

/// Point-in-time snapshot of a student's immigration situation.
///
/// Immutable per computation; every derived date and risk finding is a pure
/// function of this struct plus a caller-supplied reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub visa_type: VisaType,
    #[serde(default = "default_degree_level")]
    pub degree_level: DegreeLevel,
    #[serde(default)]
    pub is_stem: bool,
    #[serde(default)]
    pub major_field: Option<String>,
    #[serde(default)]
    pub program_start: Option<NaiveDate>,
    #[serde(default)]
    pub expected_graduation: Option<NaiveDate>,
    #[serde(default)]
    pub original_graduation: Option<NaiveDate>,
    #[serde(default)]
    pub program_extended: bool,
    #[serde(default)]
    pub cpt_months_used: u32,
    #[serde(default)]
    pub currently_employed: bool,
    #[serde(default)]
    pub has_job_offer: bool,
    #[serde(default)]
    pub opt_status: OptStatus,
    #[serde(default)]
    pub unemployment_days: u32,
    #[serde(default)]
    pub h1b_attempts: u32,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub career_goal: CareerGoal,
}

fn default_degree_level() -> DegreeLevel {
    DegreeLevel::Masters
}

fn default_country() -> String {
    "Rest of World".to_string()
}

impl Profile {
    /// Checks the cross-field invariants. Runs before any date math so a
    /// contradictory profile never produces partial output.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(grad)) = (self.program_start, self.expected_graduation) {
            if grad <= start {
                return Err(ValidationError::new(
                    "expected_graduation",
                    format!("graduation {grad} must fall after program start {start}"),
                ));
            }
        }
        if self.program_extended {
            match self.original_graduation {
                None => {
                    return Err(ValidationError::new(
                        "original_graduation",
                        "required when program_extended is set",
                    ));
                }
                Some(orig) => {
                    if let Some(grad) = self.expected_graduation {
                        if orig > grad {
                            return Err(ValidationError::new(
                                "original_graduation",
                                format!(
                                    "original graduation {orig} cannot fall after extended graduation {grad}"
                                ),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn field_label(&self) -> String {
        match self.major_field.as_deref() {
            Some(field) if !field.is_empty() => format!(" ({field})"),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Deadline,
    Milestone,
    Risk,
}

impl EventCategory {
    /// Tie-break precedence for events sharing a date.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Deadline => 0,
            Self::Milestone => 1,
            Self::Risk => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
    None,
    Passed,
}

impl Urgency {
    /// Lower rank means more urgent. Past events rank below everything
    /// upcoming; `None` marks purely informational dates.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::None => 4,
            Self::Passed => 5,
        }
    }
}

/// One dated entry in the generated timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub category: EventCategory,
    pub urgency: Urgency,
    pub description: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub is_past: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    CptOveruse,
    CptApproachingLimit,
    CountryBacklog,
    OptDeadlineApproaching,
    GraduationApproaching,
    NonStemLimited,
    UnemploymentTracking,
    H1bLotteryRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Warning,
    Info,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Warning => 2,
            Self::Info => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Summary header derived from the sorted event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub visa: String,
    pub work_auth: String,
    pub days_until_next_deadline: Option<i64>,
    pub next_deadline: Option<String>,
}

/// Combined output of one `compute` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineResult {
    pub timeline_events: Vec<Event>,
    pub risk_alerts: Vec<RiskFinding>,
    pub current_status: CurrentStatus,
}

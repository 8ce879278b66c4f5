//! Personalized immigration-deadline timelines and risk flags for
//! international students in the US.
//!
//! The crate is a library-level computation: a [`Profile`] snapshot plus an
//! explicit reference date go in, an ordered event timeline, severity-ranked
//! risk findings, and a status summary come out. No I/O, no persistence, no
//! clock reads; calling [`compute`] twice with the same inputs returns
//! identical output, which is what makes what-if recomputation safe.

pub mod models;
pub mod report;
pub mod risk;
pub mod rules;
pub mod timeline;

use chrono::NaiveDate;

pub use models::{
    CareerGoal, CurrentStatus, DegreeLevel, Event, EventCategory, OptStatus, Profile, RiskFinding,
    RiskType, Severity, TimelineResult, Urgency, ValidationError, VisaType,
};
pub use timeline::Pathway;

/// Computes the full timeline, risk findings, and status for one profile.
///
/// The timeline generator runs first; its event list feeds the risk
/// analyzer alongside the original profile. Fails with [`ValidationError`]
/// when the profile violates its invariants, before any date math runs.
pub fn compute(
    profile: &Profile,
    reference_date: NaiveDate,
) -> Result<TimelineResult, ValidationError> {
    let (events, status) = timeline::generate(profile, reference_date)?;
    let risks = risk::analyze(profile, &events, reference_date);
    Ok(TimelineResult {
        timeline_events: events,
        risk_alerts: risks,
        current_status: status,
    })
}

//! Risk detection engine.
//!
//! Evaluates eight independent detection rules over a profile and its
//! generated timeline. Every applicable rule fires (none are mutually
//! exclusive) and each yields at most one finding of its type. Output is
//! sorted by severity, ties broken by fixed rule order.

use chrono::NaiveDate;

use crate::models::{Event, OptStatus, Profile, RiskFinding, RiskType, Severity, VisaType};
use crate::rules;
use crate::timeline::Pathway;

/// Runs all detection rules. Pure and total: unknown countries fall back
/// to the rest-of-world band, and no rule can fail.
pub fn analyze(profile: &Profile, events: &[Event], today: NaiveDate) -> Vec<RiskFinding> {
    let mut findings = Vec::new();

    cpt_rules(profile, &mut findings);
    country_backlog_rule(profile, &mut findings);
    deadline_rules(profile, events, today, &mut findings);
    non_stem_rule(profile, &mut findings);
    unemployment_rule(profile, &mut findings);
    h1b_lottery_rule(profile, &mut findings);

    // Rules already run in fixed order; a stable sort by severity keeps
    // that order as the tiebreak.
    findings.sort_by_key(|finding| finding.severity.rank());
    findings
}

fn finding(
    risk_type: RiskType,
    severity: Severity,
    message: String,
    recommendation: &str,
) -> RiskFinding {
    RiskFinding {
        risk_type,
        severity,
        message,
        recommendation: (!recommendation.is_empty()).then(|| recommendation.to_string()),
    }
}

/// Rules 1 and 2: full-time CPT overuse (hard disqualification) and the
/// approaching-limit band just below it.
fn cpt_rules(profile: &Profile, findings: &mut Vec<RiskFinding>) {
    if profile.cpt_months_used >= rules::CPT_FULL_TIME_KILL_MONTHS {
        findings.push(finding(
            RiskType::CptOveruse,
            Severity::Critical,
            format!(
                "You have used {} months of full-time CPT, which makes you ineligible for \
                 OPT. You will need H-1B sponsorship or another status directly.",
                profile.cpt_months_used,
            ),
            "Consult with your DSO and an immigration attorney immediately.",
        ));
    } else if profile.cpt_months_used >= rules::CPT_WARNING_MONTHS {
        findings.push(finding(
            RiskType::CptApproachingLimit,
            Severity::Warning,
            format!(
                "You have used {} months of full-time CPT. Reaching {} months makes you \
                 ineligible for OPT.",
                profile.cpt_months_used,
                rules::CPT_FULL_TIME_KILL_MONTHS,
            ),
            "Plan remaining CPT usage carefully and discuss with your DSO.",
        ));
    }
}

/// Rule 3: table-driven green-card backlog check on the EB-2/EB-3 bands.
fn country_backlog_rule(profile: &Profile, findings: &mut Vec<RiskFinding>) {
    let backlog = rules::country_backlog(&profile.country);
    if backlog.employment_backlogged() {
        findings.push(finding(
            RiskType::CountryBacklog,
            Severity::Warning,
            format!(
                "As a national of {}, EB-2/EB-3 green card wait times currently range from \
                 {}-{} years. This means maintaining non-immigrant status for an extended \
                 period.",
                backlog.name, backlog.eb2.wait_years_min, backlog.eb2.wait_years_max,
            ),
            "Consider EB-1 eligibility, explore O-1 options, and start the green card \
             process as early as possible.",
        ));
    }
}

/// Rules 4 and 5: the nearest unresolved OPT-application-window event and
/// the graduation date, each inside a 30-day horizon.
fn deadline_rules(
    profile: &Profile,
    events: &[Event],
    today: NaiveDate,
    findings: &mut Vec<RiskFinding>,
) {
    let nearest_opt_window = events
        .iter()
        .filter(|event| event.id.starts_with("opt_apply") && !event.is_past)
        .min_by_key(|event| event.date);
    if let Some(event) = nearest_opt_window {
        let days = event.date.signed_duration_since(today).num_days();
        if days < 30 {
            findings.push(finding(
                RiskType::OptDeadlineApproaching,
                Severity::Critical,
                format!(
                    "Your OPT application window milestone \"{}\" is only {days} days away \
                     ({}). Missing the window means losing OPT eligibility entirely.",
                    event.title, event.date,
                ),
                "Apply for OPT immediately if you haven't already.",
            ));
        }
    }

    if let Some(grad) = profile.expected_graduation {
        let days = grad.signed_duration_since(today).num_days();
        if (0..30).contains(&days) {
            findings.push(finding(
                RiskType::GraduationApproaching,
                Severity::High,
                format!("Graduation is {days} days away. Ensure your OPT application is filed."),
                "Contact your DSO to confirm OPT application status.",
            ));
        }
    }
}

/// Rule 6: non-STEM degrees get no extension, so the H-1B runway is short.
fn non_stem_rule(profile: &Profile, findings: &mut Vec<RiskFinding>) {
    if !profile.is_stem {
        findings.push(finding(
            RiskType::NonStemLimited,
            Severity::Info,
            format!(
                "As a non-STEM student, you are only eligible for {} months of OPT with no \
                 STEM extension. Your window to transition to H-1B is shorter.",
                rules::OPT_RULES.duration_months,
            ),
            "Begin employer discussions about H-1B sponsorship early; the lottery happens \
             once per year in March.",
        ));
    }
}

/// Rule 7: unemployment days at or past 80% of the applicable limit while
/// on post-completion work authorization.
fn unemployment_rule(profile: &Profile, findings: &mut Vec<RiskFinding>) {
    if !matches!(profile.opt_status, OptStatus::Active | OptStatus::Expired) {
        return;
    }
    let limit = rules::unemployment_limit_days(profile.is_stem);
    let threshold = limit * 4 / 5;
    if profile.unemployment_days >= threshold {
        findings.push(finding(
            RiskType::UnemploymentTracking,
            Severity::High,
            format!(
                "You have used {} of {limit} allowed unemployment days on OPT. Exceeding \
                 the limit terminates your OPT and F-1 status.",
                profile.unemployment_days,
            ),
            "Track your unemployment days carefully and pursue employment actively.",
        ));
    }
}

/// Rule 8: static advisory for any pathway that runs through the H-1B
/// lottery, independent of attempt count.
fn h1b_lottery_rule(profile: &Profile, findings: &mut Vec<RiskFinding>) {
    if Pathway::resolve(profile).includes_h1b_step() && profile.visa_type != VisaType::H1b {
        findings.push(finding(
            RiskType::H1bLotteryRisk,
            Severity::Info,
            "The H-1B lottery selection rate is approximately 25-30%. Not being selected \
             is common, and you may need to try multiple years."
                .to_string(),
            "Have a backup plan: STEM OPT extension, a cap-exempt employer, an O-1 visa, \
             or further study.",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareerGoal, DegreeLevel};
    use crate::timeline;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> Profile {
        Profile {
            visa_type: VisaType::F1,
            degree_level: DegreeLevel::Masters,
            is_stem: true,
            major_field: None,
            program_start: Some(date(2024, 8, 20)),
            expected_graduation: Some(date(2026, 5, 15)),
            original_graduation: None,
            program_extended: false,
            cpt_months_used: 0,
            currently_employed: false,
            has_job_offer: false,
            opt_status: OptStatus::None,
            unemployment_days: 0,
            h1b_attempts: 0,
            country: "Rest of World".to_string(),
            career_goal: CareerGoal::StayUsLongterm,
        }
    }

    fn analyze_with_timeline(profile: &Profile, today: NaiveDate) -> Vec<RiskFinding> {
        let (events, _) = timeline::generate(profile, today).unwrap();
        analyze(profile, &events, today)
    }

    fn has(findings: &[RiskFinding], risk_type: RiskType) -> bool {
        findings.iter().any(|f| f.risk_type == risk_type)
    }

    #[test]
    fn cpt_boundary_at_twelve_months() {
        let today = date(2026, 1, 1);

        let mut p = profile();
        p.cpt_months_used = 8;
        let findings = analyze_with_timeline(&p, today);
        assert!(!has(&findings, RiskType::CptOveruse));
        assert!(!has(&findings, RiskType::CptApproachingLimit));

        p.cpt_months_used = 9;
        let findings = analyze_with_timeline(&p, today);
        assert!(has(&findings, RiskType::CptApproachingLimit));

        p.cpt_months_used = 11;
        let findings = analyze_with_timeline(&p, today);
        assert!(!has(&findings, RiskType::CptOveruse));
        assert!(has(&findings, RiskType::CptApproachingLimit));

        p.cpt_months_used = 12;
        let findings = analyze_with_timeline(&p, today);
        let overuse = findings
            .iter()
            .find(|f| f.risk_type == RiskType::CptOveruse)
            .unwrap();
        assert_eq!(overuse.severity, Severity::Critical);
        assert!(!has(&findings, RiskType::CptApproachingLimit));
    }

    #[test]
    fn backlogged_country_flagged_from_table() {
        let today = date(2026, 1, 1);

        let mut p = profile();
        p.country = "India".to_string();
        let findings = analyze_with_timeline(&p, today);
        let backlog = findings
            .iter()
            .find(|f| f.risk_type == RiskType::CountryBacklog)
            .unwrap();
        assert_eq!(backlog.severity, Severity::Warning);
        assert!(backlog.message.contains("India"));

        // Unknown countries resolve to the rest-of-world band and stay quiet.
        p.country = "Atlantis".to_string();
        let findings = analyze_with_timeline(&p, today);
        assert!(!has(&findings, RiskType::CountryBacklog));
    }

    #[test]
    fn opt_window_deadline_within_thirty_days() {
        // Window opens 2026-02-14; 25 days out from 2026-01-20.
        let today = date(2026, 1, 20);
        let findings = analyze_with_timeline(&profile(), today);
        let deadline = findings
            .iter()
            .find(|f| f.risk_type == RiskType::OptDeadlineApproaching)
            .unwrap();
        assert_eq!(deadline.severity, Severity::Critical);

        // 44 days out: no finding.
        let findings = analyze_with_timeline(&profile(), date(2026, 1, 1));
        assert!(!has(&findings, RiskType::OptDeadlineApproaching));
    }

    #[test]
    fn graduation_within_thirty_days() {
        let findings = analyze_with_timeline(&profile(), date(2026, 5, 1));
        let grad = findings
            .iter()
            .find(|f| f.risk_type == RiskType::GraduationApproaching)
            .unwrap();
        assert_eq!(grad.severity, Severity::High);

        // Graduation already past: nothing fires.
        let findings = analyze_with_timeline(&profile(), date(2026, 6, 1));
        assert!(!has(&findings, RiskType::GraduationApproaching));
    }

    #[test]
    fn non_stem_advisory() {
        let today = date(2026, 1, 1);
        let mut p = profile();
        p.is_stem = false;
        let findings = analyze_with_timeline(&p, today);
        let info = findings
            .iter()
            .find(|f| f.risk_type == RiskType::NonStemLimited)
            .unwrap();
        assert_eq!(info.severity, Severity::Info);

        let findings = analyze_with_timeline(&profile(), today);
        assert!(!has(&findings, RiskType::NonStemLimited));
    }

    #[test]
    fn unemployment_at_eighty_percent_of_limit() {
        let today = date(2026, 1, 1);
        let mut p = profile();
        p.visa_type = VisaType::Opt;
        p.opt_status = OptStatus::Active;

        // STEM limit 150, threshold 120.
        p.unemployment_days = 119;
        assert!(!has(
            &analyze_with_timeline(&p, today),
            RiskType::UnemploymentTracking
        ));
        p.unemployment_days = 120;
        assert!(has(
            &analyze_with_timeline(&p, today),
            RiskType::UnemploymentTracking
        ));

        // Non-STEM limit 90, threshold 72.
        p.is_stem = false;
        p.unemployment_days = 72;
        assert!(has(
            &analyze_with_timeline(&p, today),
            RiskType::UnemploymentTracking
        ));

        // Not on OPT yet: rule never fires.
        p.opt_status = OptStatus::None;
        p.visa_type = VisaType::F1;
        p.unemployment_days = 200;
        assert!(!has(
            &analyze_with_timeline(&p, today),
            RiskType::UnemploymentTracking
        ));
    }

    #[test]
    fn h1b_advisory_for_student_pathways() {
        let today = date(2026, 1, 1);
        assert!(has(
            &analyze_with_timeline(&profile(), today),
            RiskType::H1bLotteryRisk
        ));

        let mut p = profile();
        p.visa_type = VisaType::H4;
        assert!(!has(
            &analyze_with_timeline(&p, today),
            RiskType::H1bLotteryRisk
        ));
    }

    #[test]
    fn findings_sorted_by_severity_then_rule_order() {
        let mut p = profile();
        p.is_stem = false;
        p.cpt_months_used = 12;
        p.country = "India".to_string();
        let findings = analyze_with_timeline(&p, date(2026, 1, 1));

        for pair in findings.windows(2) {
            assert!(pair[0].severity.rank() <= pair[1].severity.rank());
        }
        // Two info findings hold rule order: non-STEM (rule 6) before
        // lottery advisory (rule 8).
        let infos: Vec<RiskType> = findings
            .iter()
            .filter(|f| f.severity == Severity::Info)
            .map(|f| f.risk_type)
            .collect();
        assert_eq!(
            infos,
            vec![RiskType::NonStemLimited, RiskType::H1bLotteryRisk]
        );
    }

    #[test]
    fn analysis_is_idempotent() {
        let p = profile();
        let today = date(2026, 1, 1);
        assert_eq!(
            analyze_with_timeline(&p, today),
            analyze_with_timeline(&p, today)
        );
    }
}

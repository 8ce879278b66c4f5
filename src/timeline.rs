//! Timeline generation engine.
//!
//! Maps a validated [`Profile`] plus a reference date into an ordered list
//! of dated events with urgency classification, and derives the
//! [`CurrentStatus`] header from the sorted list. Pure function of its
//! inputs; the reference date is threaded explicitly and never read from
//! the system clock here.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::{
    CareerGoal, CurrentStatus, Event, EventCategory, OptStatus, Profile, Urgency, ValidationError,
    VisaType,
};
use crate::rules::{self, CAP_GAP_RULES, H1B_RULES, OPT_RULES, STEM_OPT_RULES};

/// Immigration track resolved once from the profile. Each variant owns its
/// own anchor computation; branch conditions are never re-derived per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pathway {
    /// F-1 student who has not yet started OPT. `opt_lost` is set when
    /// cumulative full-time CPT has permanently disqualified OPT.
    F1PreOpt { opt_lost: bool },
    /// Already on post-completion OPT (or its aftermath): OPT → STEM OPT → H-1B.
    OptActive,
    /// Already on H-1B: green-card track.
    H1bHolder,
    /// J-1 / H-4 / L-1: status milestones only, no OPT anchors.
    DependentOrExchange,
}

impl Pathway {
    pub fn resolve(profile: &Profile) -> Self {
        match profile.visa_type {
            VisaType::F1 => match profile.opt_status {
                OptStatus::Active | OptStatus::Expired => Self::OptActive,
                OptStatus::None | OptStatus::Applied => Self::F1PreOpt {
                    opt_lost: profile.cpt_months_used >= rules::CPT_FULL_TIME_KILL_MONTHS,
                },
            },
            VisaType::Opt => Self::OptActive,
            VisaType::H1b => Self::H1bHolder,
            VisaType::J1 | VisaType::H4 | VisaType::L1 => Self::DependentOrExchange,
        }
    }

    /// Whether this track leads through an H-1B petition.
    pub fn includes_h1b_step(self) -> bool {
        matches!(
            self,
            Self::F1PreOpt { .. } | Self::OptActive | Self::H1bHolder
        )
    }
}

/// Urgency tiers against the reference date. Applied uniformly to every
/// event so classification stays monotonic in days-until.
pub fn classify_urgency(today: NaiveDate, date: NaiveDate) -> Urgency {
    let days = date.signed_duration_since(today).num_days();
    if days < 0 {
        Urgency::Passed
    } else if days <= 7 {
        Urgency::Critical
    } else if days <= 30 {
        Urgency::High
    } else if days <= 90 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Calendar-month arithmetic with month-end clamping: Jan 31 + 1 month is
/// Feb 28/29, never an overflow into March.
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Month/day pairs come from the static rule table and are always valid.
fn rule_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

struct EventBuilder {
    today: NaiveDate,
    events: Vec<Event>,
}

impl EventBuilder {
    fn new(today: NaiveDate) -> Self {
        Self {
            today,
            events: Vec::new(),
        }
    }

    fn push(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        category: EventCategory,
        description: impl Into<String>,
        action_items: &[&str],
    ) {
        self.events.push(Event {
            id: id.into(),
            title: title.into(),
            date,
            category,
            urgency: classify_urgency(self.today, date),
            description: description.into(),
            action_items: action_items.iter().map(|s| (*s).to_string()).collect(),
            is_past: date < self.today,
        });
    }
}

/// Generates the ordered event list and status summary for one profile.
///
/// Fails only on profile invariant violations, before any date math runs.
pub fn generate(
    profile: &Profile,
    today: NaiveDate,
) -> Result<(Vec<Event>, CurrentStatus), ValidationError> {
    profile.validate()?;

    let pathway = Pathway::resolve(profile);
    let mut builder = EventBuilder::new(today);

    if profile.program_extended {
        program_extension_events(&mut builder, profile, today);
    }

    match pathway {
        Pathway::F1PreOpt { opt_lost } => {
            if opt_lost {
                opt_eligibility_lost_event(&mut builder, profile, today);
            } else {
                f1_pre_opt_events(&mut builder, profile, today);
            }
        }
        Pathway::OptActive => opt_active_events(&mut builder, profile, today),
        Pathway::H1bHolder => h1b_holder_events(&mut builder, profile, today),
        Pathway::DependentOrExchange => {}
    }

    shared_milestones(&mut builder, profile, today, pathway);

    let mut events = builder.events;
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.category.precedence().cmp(&b.category.precedence()))
    });

    let status = derive_status(profile, &events, today);
    Ok((events, status))
}

fn derive_status(profile: &Profile, events: &[Event], today: NaiveDate) -> CurrentStatus {
    let next = events.iter().find(|event| !event.is_past);
    CurrentStatus {
        visa: profile.visa_type.label().to_string(),
        work_auth: profile.visa_type.work_auth_label().to_string(),
        days_until_next_deadline: next
            .map(|event| event.date.signed_duration_since(today).num_days()),
        next_deadline: next.map(|event| event.title.clone()),
    }
}

fn program_extension_events(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    let field = profile.field_label();
    let grad_note = profile
        .expected_graduation
        .map(|grad| format!(" New graduation date: {grad}."))
        .unwrap_or_default();
    builder.push(
        "program_extension_notice",
        format!("Program Extended{field} — Update Required"),
        today,
        EventCategory::Deadline,
        format!(
            "Your program has been extended. You need an updated I-20 reflecting the new \
             program end date, and your SEVIS record must be updated by your DSO. Your OPT \
             eligibility and duration are not reduced by the extension; all OPT deadlines \
             are calculated from your new graduation date.{grad_note}"
        ),
        &[
            "Request updated I-20 from DSO with new program end date",
            "Confirm SEVIS record has been updated",
            "Keep copies of both original and updated I-20",
        ],
    );

    if let (Some(original), Some(grad)) = (profile.original_graduation, profile.expected_graduation)
    {
        builder.push(
            "original_graduation",
            "Original Graduation Date (Before Extension)",
            original,
            EventCategory::Milestone,
            format!(
                "Your original program end date before the extension. This date is no longer \
                 used for OPT or deadline calculations; all deadlines now use your new \
                 graduation date: {grad}."
            ),
            &[],
        );
    }
}

fn opt_eligibility_lost_event(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    builder.push(
        "opt_eligibility_lost",
        "CPT Full-Time Limit Reached — OPT Eligibility Lost",
        today,
        EventCategory::Risk,
        format!(
            "You have used {} months of full-time CPT. Using {} or more months permanently \
             disqualifies you from post-completion OPT. Alternative paths (direct H-1B \
             sponsorship, a change of status) need to be planned with your DSO.",
            profile.cpt_months_used,
            rules::CPT_FULL_TIME_KILL_MONTHS,
        ),
        &[
            "Contact DSO to discuss options",
            "Consider H-1B sponsorship directly",
        ],
    );
}

fn f1_pre_opt_events(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    let Some(grad) = profile.expected_graduation else {
        return;
    };
    let field = profile.field_label();

    if profile.opt_status == OptStatus::Applied {
        builder.push(
            "opt_pending",
            "OPT Application Pending",
            today,
            EventCategory::Milestone,
            format!(
                "Your OPT application has been submitted. Processing typically takes {}-{} \
                 months. Track your case at uscis.gov/casestatus.",
                OPT_RULES.ead_processing_months_min, OPT_RULES.ead_processing_months_max,
            ),
            &[
                "Check case status regularly at uscis.gov",
                "Keep receipt notice (I-797C) safe",
                "Do not travel outside the US without valid EAD",
            ],
        );
    } else {
        let window_open = grad - Duration::days(OPT_RULES.apply_before_graduation_days);
        builder.push(
            "opt_apply_window_open",
            format!("OPT Application Window Opens{field}"),
            window_open,
            EventCategory::Deadline,
            format!(
                "You can start applying for post-completion OPT. Apply as early as possible; \
                 processing takes {}-{} months.",
                OPT_RULES.ead_processing_months_min, OPT_RULES.ead_processing_months_max,
            ),
            &[
                "Request OPT recommendation from DSO",
                "Prepare Form I-765",
                "Get passport-style photos taken (2x2 inches)",
                "Download I-94 from i94.cbp.dhs.gov",
                "Make copies of passport, visa, and all previous I-20s",
            ],
        );

        let window_close = grad + Duration::days(OPT_RULES.apply_after_graduation_days);
        builder.push(
            "opt_apply_deadline",
            "OPT Application Deadline",
            window_close,
            EventCategory::Deadline,
            format!(
                "Last day to apply for OPT ({} days post-graduation). Missing this means \
                 losing OPT eligibility entirely.",
                OPT_RULES.apply_after_graduation_days,
            ),
            &["Submit I-765 if not already done"],
        );
    }

    builder.push(
        "opt_start",
        "OPT Period Begins (Estimated)",
        grad + Duration::days(1),
        EventCategory::Milestone,
        format!(
            "Your {}-month OPT period starts. Track unemployment days carefully; the limit \
             is {} days.",
            OPT_RULES.duration_months, OPT_RULES.unemployment_limit_days,
        ),
        &[
            "Begin job search if not already employed",
            "Report employment to DSO within 10 days of starting",
        ],
    );

    let opt_end = opt_end_date(grad);
    opt_expiration_events(builder, profile, opt_end);
    h1b_lottery_events(builder, profile, today, Some(work_auth_end(profile, opt_end)));
}

fn opt_active_events(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    if matches!(profile.opt_status, OptStatus::Active | OptStatus::Expired)
        && !profile.currently_employed
    {
        unemployment_limit_event(builder, profile, today);
    }

    let auth_end = profile.expected_graduation.map(|grad| {
        let opt_end = opt_end_date(grad);
        opt_expiration_events(builder, profile, opt_end);
        work_auth_end(profile, opt_end)
    });

    h1b_lottery_events(builder, profile, today, auth_end);
}

fn h1b_holder_events(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    let field = profile.field_label();
    builder.push(
        "i140_filing",
        format!("Consider Filing I-140 (Green Card){field}"),
        today + Duration::days(30),
        EventCategory::Milestone,
        "Ask your employer to begin the green card process by filing PERM labor \
         certification, followed by the I-140 petition.",
        &[
            "Discuss green card sponsorship with employer",
            "Start PERM labor certification process",
            "Gather education evaluations and experience letters",
        ],
    );
}

fn opt_end_date(grad: NaiveDate) -> NaiveDate {
    add_months(grad, OPT_RULES.duration_months)
}

fn work_auth_end(profile: &Profile, opt_end: NaiveDate) -> NaiveDate {
    if profile.is_stem {
        add_months(opt_end, STEM_OPT_RULES.extension_months)
    } else {
        opt_end
    }
}

/// OPT expiration and, for STEM degrees, the extension filing deadline and
/// extension expiration. The STEM filing deadline is the OPT end date
/// itself: the I-765 must be received before the current EAD expires.
fn opt_expiration_events(builder: &mut EventBuilder, profile: &Profile, opt_end: NaiveDate) {
    let field = profile.field_label();

    builder.push(
        "opt_expiration",
        "OPT Expires",
        opt_end,
        EventCategory::Deadline,
        format!(
            "Your {}-month OPT period ends.",
            OPT_RULES.duration_months
        ),
        &[if profile.is_stem {
            "Apply for STEM OPT extension before this date"
        } else {
            "Secure H-1B sponsorship or other status"
        }],
    );

    if profile.is_stem {
        builder.push(
            "stem_opt_apply",
            format!("STEM OPT Extension — File Before EAD Expires{field}"),
            opt_end,
            EventCategory::Deadline,
            format!(
                "File for the {}-month STEM OPT extension before your current EAD expires. \
                 Your employer must be E-Verify registered.",
                STEM_OPT_RULES.extension_months,
            ),
            &[
                "Confirm employer is E-Verify registered",
                "Complete Form I-983 (Training Plan) with employer",
                "Request updated I-20 from DSO with STEM OPT recommendation",
                "File I-765 for STEM OPT extension",
            ],
        );

        builder.push(
            "stem_opt_expiration",
            "STEM OPT Extension Expires",
            add_months(opt_end, STEM_OPT_RULES.extension_months),
            EventCategory::Deadline,
            format!(
                "Your STEM OPT extension ends ({} months of work authorization total). You \
                 must transition to another status.",
                STEM_OPT_RULES.total_duration_months,
            ),
            &["Ensure H-1B or other visa status is secured"],
        );
    }
}

fn unemployment_limit_event(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    let limit = rules::unemployment_limit_days(profile.is_stem);
    let remaining = i64::from(limit) - i64::from(profile.unemployment_days);
    let date = today + Duration::days(remaining.max(0));

    let (title, description) = if remaining <= 0 {
        (
            "Unemployment Limit Exceeded".to_string(),
            format!(
                "You have used {} of {limit} unemployment days. Your OPT status may be \
                 terminated; contact your DSO immediately.",
                profile.unemployment_days,
            ),
        )
    } else {
        (
            "Unemployment Limit Reached (Projected)".to_string(),
            format!(
                "You have used {} of {limit} unemployment days. At the current pace the \
                 limit is reached on this date, terminating your OPT and F-1 status.",
                profile.unemployment_days,
            ),
        )
    };

    builder.push(
        "unemployment_limit",
        title,
        date,
        EventCategory::Risk,
        description,
        &[
            "Secure employment as soon as possible",
            "Contact DSO about options",
            "Consider volunteer work in your field of study (reportable on OPT)",
        ],
    );
}

/// The next H-1B lottery cycle: registration window, results, cap-gap
/// bridge when applicable, and the October start date. Scans forward from
/// the reference year; bounded lookahead guarantees termination.
fn h1b_lottery_events(
    builder: &mut EventBuilder,
    profile: &Profile,
    today: NaiveDate,
    work_auth_end: Option<NaiveDate>,
) {
    // Too early to plan lottery logistics while graduation is far off.
    if let Some(grad) = profile.expected_graduation {
        if grad.signed_duration_since(today).num_days() > 180 {
            return;
        }
    }

    let attempt_note = match profile.h1b_attempts {
        0 => String::new(),
        n if n >= 3 => format!(
            " You have had {n} prior attempts. Each lottery is independent (~25-30% chance); \
             consider alternative pathways such as EB-1, O-1, or L-1."
        ),
        n => format!(
            " This will be attempt #{}. Each lottery is independent with a ~25-30% \
             selection rate.",
            n + 1
        ),
    };

    let intent_note = if profile.career_goal == CareerGoal::ReturnHome {
        " Included for completeness; relevant only if you pursue US employment."
    } else {
        ""
    };

    for year in today.year()..today.year() + H1B_RULES.max_lookahead_years {
        let reg_open = rule_date(year, H1B_RULES.registration_month, H1B_RULES.registration_start_day);
        if reg_open < today {
            continue;
        }
        let reg_close = rule_date(year, H1B_RULES.registration_month, H1B_RULES.registration_end_day);
        let results = rule_date(year, H1B_RULES.results_month, 1);
        let start = rule_date(year, H1B_RULES.start_month, H1B_RULES.start_day);
        let year_label = format!("FY{}", year + 1);

        let cap_note = if profile.degree_level.qualifies_for_masters_cap() {
            "US master's cap gives you two chances in the lottery."
        } else {
            "Regular cap: 65,000 slots."
        };

        let pre_grad_note = match profile.expected_graduation {
            Some(grad) if reg_open < grad => format!(
                " Registration occurs before your graduation ({grad}). Your employer can \
                 register you now; if selected, you would transition to H-1B on October 1 \
                 via the cap-gap extension."
            ),
            _ => String::new(),
        };

        builder.push(
            format!("h1b_registration_{year}"),
            format!("H-1B Registration Opens ({year_label})"),
            reg_open,
            EventCategory::Deadline,
            format!(
                "H-1B electronic registration runs through {reg_close}. Your employer must \
                 register you. {cap_note}{attempt_note}{pre_grad_note}{intent_note}"
            ),
            &[
                "Confirm employer will sponsor H-1B",
                "Provide passport and immigration documents to employer/attorney",
                "Employer completes electronic registration on USCIS portal",
            ],
        );

        builder.push(
            format!("h1b_results_{year}"),
            format!("H-1B Lottery Results ({year_label})"),
            results,
            EventCategory::Milestone,
            "Lottery selection results are typically announced. If selected, your employer \
             has 90 days to file the full petition.",
            &[],
        );

        if let Some(auth_end) = work_auth_end {
            let gap_start = rule_date(year, CAP_GAP_RULES.start_month, CAP_GAP_RULES.start_day);
            let gap_end = rule_date(year, CAP_GAP_RULES.end_month, CAP_GAP_RULES.end_day);
            if auth_end >= gap_start && auth_end < gap_end {
                builder.push(
                    format!("h1b_capgap_{year}"),
                    format!("Cap-Gap Extension Period ({year_label})"),
                    gap_start,
                    EventCategory::Milestone,
                    format!(
                        "Your work authorization ends {auth_end}, before the H-1B start date. \
                         If selected in the lottery, your status and EAD are automatically \
                         extended from {gap_start} to {gap_end} (cap-gap)."
                    ),
                    &["Request cap-gap I-20 from DSO once selection is confirmed"],
                );
            }
        }

        builder.push(
            format!("h1b_start_{year}"),
            format!("H-1B Start Date ({year_label})"),
            start,
            EventCategory::Milestone,
            format!("H-1B employment begins for {year_label} if selected and the petition is approved."),
            &[],
        );

        break;
    }

    if profile.h1b_attempts >= 3 {
        builder.push(
            "h1b_alternatives",
            "Consider Alternative Visa Pathways",
            today + Duration::days(7),
            EventCategory::Milestone,
            format!(
                "After {} H-1B lottery attempts, diversify your strategy beyond the lottery.",
                profile.h1b_attempts,
            ),
            &[
                "Evaluate EB-1A eligibility (extraordinary ability)",
                "Explore the O-1 visa for extraordinary achievement",
                "Check employer offices abroad for an L-1 intracompany transfer",
                "Consider EB-2 NIW (National Interest Waiver)",
                "Consult an immigration attorney about all options",
            ],
        );
    }
}

fn shared_milestones(
    builder: &mut EventBuilder,
    profile: &Profile,
    today: NaiveDate,
    pathway: Pathway,
) {
    let field = profile.field_label();

    if let Some(start) = profile.program_start {
        if start > today {
            builder.push(
                "program_start",
                format!("Program Start Date{field}"),
                start,
                EventCategory::Milestone,
                "Your academic program begins.",
                &[],
            );
        }
    }

    if let Some(grad) = profile.expected_graduation {
        let (title, description) = if profile.program_extended {
            (
                format!("New Expected Graduation (Extended){field}"),
                "Your updated program completion date after the extension. All OPT deadlines \
                 and work authorization dates are calculated from this date."
                    .to_string(),
            )
        } else {
            (
                format!("Expected Graduation{field}"),
                "Your program completion date. Key deadlines are calculated from this date."
                    .to_string(),
            )
        };
        builder.push("graduation", title, grad, EventCategory::Milestone, description, &[]);
    }

    let student_visa = matches!(profile.visa_type, VisaType::F1 | VisaType::Opt);

    if student_visa && profile.has_job_offer {
        builder.push(
            "employer_h1b_prep",
            "Employer H-1B Preparation",
            today + Duration::days(14),
            EventCategory::Milestone,
            "Begin coordinating with your employer on H-1B sponsorship. The employer's \
             immigration attorney should start LCA filing preparation.",
            &[
                "Confirm employer will sponsor H-1B",
                "Connect with employer's immigration attorney",
                "Prepare documents for LCA (Labor Condition Application) filing",
                "Verify job title and wage level meet H-1B requirements",
            ],
        );
    }

    if student_visa && !profile.has_job_offer {
        job_search_events(builder, profile, today);
    }

    if pathway.includes_h1b_step() {
        green_card_event(builder, profile, today);
    }
}

fn job_search_events(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    match profile.opt_status {
        OptStatus::Applied | OptStatus::Active => {
            builder.push(
                "job_search_milestone",
                "Job Search Milestone Check",
                today + Duration::days(30),
                EventCategory::Milestone,
                "You don't have a job offer yet. Set concrete weekly targets for \
                 applications and networking before unemployment limits approach.",
                &[
                    "Apply to at least 10 positions per week",
                    "Attend 2+ networking events or career fairs per month",
                    "Update LinkedIn and resume for target roles",
                ],
            );
        }
        OptStatus::None | OptStatus::Expired => {
            if let Some(grad) = profile.expected_graduation {
                let search_start = grad - Duration::days(180);
                if grad > today && search_start > today {
                    builder.push(
                        "begin_job_search",
                        "Begin Job Search (6 Months Before Graduation)",
                        search_start,
                        EventCategory::Milestone,
                        "Start your job search early. Many employers have long hiring \
                         cycles, especially for roles requiring H-1B sponsorship.",
                        &[
                            "Research employers known to sponsor H-1B visas",
                            "Attend career fairs and networking events",
                            "Update resume and LinkedIn profile",
                        ],
                    );
                }
            }
        }
    }
}

/// Green-card planning milestone. Emitted for every pathway that can lead
/// to permanent residency regardless of the stated career goal; intent
/// only changes the wording.
fn green_card_event(builder: &mut EventBuilder, profile: &Profile, today: NaiveDate) {
    let gc_start = match profile.expected_graduation {
        Some(grad) => add_months(grad, 24),
        None => add_months(today, 12),
    };
    if gc_start <= today {
        return;
    }

    let backlog = rules::country_backlog(&profile.country);
    let wait_text = format!(
        "Estimated EB-2 wait time for {}: {}-{} years.",
        backlog.name, backlog.eb2.wait_years_min, backlog.eb2.wait_years_max,
    );
    let intent_text = match profile.career_goal {
        CareerGoal::ReturnHome => {
            " Shown for completeness given your stated plan to return home."
        }
        CareerGoal::StayUsLongterm | CareerGoal::Undecided => {
            " Discuss sponsorship with your employer early."
        }
    };

    builder.push(
        "green_card_info",
        "Green Card Process (Estimated Start)",
        gc_start,
        EventCategory::Milestone,
        format!(
            "Typical point to begin employer-sponsored green card processing. \
             {wait_text}{intent_text}"
        ),
        &[
            "Discuss green card sponsorship with employer early",
            "Start gathering education and experience documentation",
            "Consider EB-1 eligibility if you have extraordinary ability or publications",
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DegreeLevel;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stem_f1_profile() -> Profile {
        Profile {
            visa_type: VisaType::F1,
            degree_level: DegreeLevel::Masters,
            is_stem: true,
            major_field: None,
            program_start: Some(date(2024, 8, 20)),
            expected_graduation: Some(date(2026, 5, 15)),
            original_graduation: None,
            program_extended: false,
            cpt_months_used: 6,
            currently_employed: false,
            has_job_offer: false,
            opt_status: OptStatus::None,
            unemployment_days: 0,
            h1b_attempts: 0,
            country: "India".to_string(),
            career_goal: CareerGoal::StayUsLongterm,
        }
    }

    fn find<'a>(events: &'a [Event], id: &str) -> Option<&'a Event> {
        events.iter().find(|event| event.id == id)
    }

    #[test]
    fn pathway_resolution() {
        let mut profile = stem_f1_profile();
        assert_eq!(
            Pathway::resolve(&profile),
            Pathway::F1PreOpt { opt_lost: false }
        );

        profile.cpt_months_used = 12;
        assert_eq!(
            Pathway::resolve(&profile),
            Pathway::F1PreOpt { opt_lost: true }
        );

        profile.cpt_months_used = 0;
        profile.opt_status = OptStatus::Active;
        assert_eq!(Pathway::resolve(&profile), Pathway::OptActive);

        profile.visa_type = VisaType::H1b;
        assert_eq!(Pathway::resolve(&profile), Pathway::H1bHolder);

        profile.visa_type = VisaType::J1;
        assert_eq!(Pathway::resolve(&profile), Pathway::DependentOrExchange);
    }

    #[test]
    fn urgency_tier_boundaries() {
        let today = date(2026, 1, 1);
        assert_eq!(classify_urgency(today, date(2025, 12, 31)), Urgency::Passed);
        assert_eq!(classify_urgency(today, today), Urgency::Critical);
        assert_eq!(classify_urgency(today, date(2026, 1, 8)), Urgency::Critical);
        assert_eq!(classify_urgency(today, date(2026, 1, 9)), Urgency::High);
        assert_eq!(classify_urgency(today, date(2026, 1, 31)), Urgency::High);
        assert_eq!(classify_urgency(today, date(2026, 2, 1)), Urgency::Medium);
        assert_eq!(classify_urgency(today, date(2026, 4, 1)), Urgency::Medium);
        assert_eq!(classify_urgency(today, date(2026, 4, 2)), Urgency::Low);
    }

    #[test]
    fn opt_window_anchor_and_urgency() {
        let today = date(2026, 1, 1);
        let (events, _) = generate(&stem_f1_profile(), today).unwrap();

        let window_open = find(&events, "opt_apply_window_open").unwrap();
        assert_eq!(window_open.date, date(2026, 2, 14));
        assert_eq!(window_open.urgency, Urgency::Medium);
        assert!(!window_open.is_past);

        let deadline = find(&events, "opt_apply_deadline").unwrap();
        assert_eq!(deadline.date, date(2026, 7, 14));
    }

    #[test]
    fn opt_end_uses_calendar_months_with_clamping() {
        let mut profile = stem_f1_profile();
        profile.expected_graduation = Some(date(2026, 1, 31));
        let today = date(2025, 6, 1);
        let (events, _) = generate(&profile, today).unwrap();

        let opt_end = find(&events, "opt_expiration").unwrap();
        assert_eq!(opt_end.date, date(2027, 1, 31));

        // Month-end clamp: Jan 31 + 1 month lands on Feb 28.
        assert_eq!(add_months(date(2026, 1, 31), 1), date(2026, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
    }

    #[test]
    fn stem_extension_gated_on_stem_flag() {
        let today = date(2026, 1, 1);

        let (events, _) = generate(&stem_f1_profile(), today).unwrap();
        let apply = find(&events, "stem_opt_apply").unwrap();
        let opt_end = find(&events, "opt_expiration").unwrap();
        assert_eq!(apply.date, opt_end.date);
        let stem_end = find(&events, "stem_opt_expiration").unwrap();
        assert_eq!(stem_end.date, add_months(opt_end.date, 24));

        let mut non_stem = stem_f1_profile();
        non_stem.is_stem = false;
        let (events, _) = generate(&non_stem, today).unwrap();
        assert!(find(&events, "stem_opt_apply").is_none());
        assert!(find(&events, "stem_opt_expiration").is_none());
        assert!(find(&events, "opt_expiration").is_some());
    }

    #[test]
    fn cpt_at_twelve_months_replaces_opt_events() {
        let today = date(2026, 1, 1);

        let mut profile = stem_f1_profile();
        profile.cpt_months_used = 11;
        let (events, _) = generate(&profile, today).unwrap();
        assert!(find(&events, "opt_eligibility_lost").is_none());
        assert!(find(&events, "opt_apply_window_open").is_some());

        profile.cpt_months_used = 12;
        let (events, _) = generate(&profile, today).unwrap();
        let lost = find(&events, "opt_eligibility_lost").unwrap();
        assert_eq!(lost.category, EventCategory::Risk);
        assert_eq!(lost.urgency, Urgency::Critical);
        assert!(find(&events, "opt_apply_window_open").is_none());
        assert!(find(&events, "opt_expiration").is_none());
    }

    #[test]
    fn extension_shifts_opt_anchors_to_new_graduation() {
        let mut profile = stem_f1_profile();
        profile.program_extended = true;
        profile.original_graduation = Some(date(2025, 12, 1));
        profile.expected_graduation = Some(date(2026, 5, 15));
        let today = date(2026, 1, 1);

        let (events, _) = generate(&profile, today).unwrap();
        let window_open = find(&events, "opt_apply_window_open").unwrap();
        assert_eq!(window_open.date, date(2026, 2, 14));
        let opt_end = find(&events, "opt_expiration").unwrap();
        assert_eq!(opt_end.date, date(2027, 5, 15));

        let original = find(&events, "original_graduation").unwrap();
        assert_eq!(original.date, date(2025, 12, 1));
        assert!(original.is_past);
    }

    #[test]
    fn return_home_goal_does_not_suppress_h1b_events() {
        let mut profile = stem_f1_profile();
        profile.career_goal = CareerGoal::ReturnHome;
        // Within 180 days of graduation so the lottery cycle is planned.
        let today = date(2026, 3, 1);

        let (events, _) = generate(&profile, today).unwrap();
        assert!(events.iter().any(|e| e.id.starts_with("h1b_registration_")));
        assert!(find(&events, "green_card_info").is_some());
    }

    #[test]
    fn lottery_cycle_picks_next_open_window() {
        let mut profile = stem_f1_profile();
        profile.expected_graduation = Some(date(2026, 5, 15));
        // March 1 of the reference year is already gone, so FY2028 is next.
        let today = date(2026, 3, 15);

        let (events, _) = generate(&profile, today).unwrap();
        let registration = find(&events, "h1b_registration_2027").unwrap();
        assert_eq!(registration.date, date(2027, 3, 1));
        assert!(find(&events, "h1b_registration_2026").is_none());
        let start = find(&events, "h1b_start_2027").unwrap();
        assert_eq!(start.date, date(2027, 10, 1));
    }

    #[test]
    fn cap_gap_emitted_only_when_authorization_lapses_in_window() {
        // Non-STEM, graduation 2026-06-30: OPT ends 2027-06-30, inside
        // [Apr 1, Oct 1) of the 2027 registration year.
        let mut profile = stem_f1_profile();
        profile.is_stem = false;
        profile.expected_graduation = Some(date(2026, 6, 30));
        let today = date(2026, 5, 1);

        let (events, _) = generate(&profile, today).unwrap();
        let cap_gap = find(&events, "h1b_capgap_2027").unwrap();
        assert_eq!(cap_gap.date, date(2027, 4, 1));

        // OPT ending in November misses the cap-gap window.
        profile.expected_graduation = Some(date(2026, 11, 10));
        let today = date(2026, 9, 1);
        let (events, _) = generate(&profile, today).unwrap();
        assert!(events.iter().all(|e| !e.id.starts_with("h1b_capgap_")));
    }

    #[test]
    fn unemployment_event_projects_exhaustion_date() {
        let mut profile = stem_f1_profile();
        profile.visa_type = VisaType::Opt;
        profile.opt_status = OptStatus::Active;
        profile.unemployment_days = 120;
        profile.currently_employed = false;
        let today = date(2026, 1, 1);

        // STEM limit is 150, so 30 days remain.
        let (events, _) = generate(&profile, today).unwrap();
        let limit = find(&events, "unemployment_limit").unwrap();
        assert_eq!(limit.date, date(2026, 1, 31));
        assert_eq!(limit.category, EventCategory::Risk);

        // Already over the limit: event lands on today, critical.
        profile.unemployment_days = 160;
        let (events, _) = generate(&profile, today).unwrap();
        let limit = find(&events, "unemployment_limit").unwrap();
        assert_eq!(limit.date, today);
        assert_eq!(limit.urgency, Urgency::Critical);

        // Employed students get no unemployment projection.
        profile.currently_employed = true;
        let (events, _) = generate(&profile, today).unwrap();
        assert!(find(&events, "unemployment_limit").is_none());
    }

    #[test]
    fn events_sorted_by_date_then_category() {
        let today = date(2026, 1, 1);
        let (events, _) = generate(&stem_f1_profile(), today).unwrap();

        for pair in events.windows(2) {
            assert!(pair[0].date <= pair[1].date);
            if pair[0].date == pair[1].date {
                assert!(pair[0].category.precedence() <= pair[1].category.precedence());
            }
        }
    }

    #[test]
    fn urgency_monotonic_in_days_until() {
        let today = date(2026, 1, 1);
        let (events, _) = generate(&stem_f1_profile(), today).unwrap();

        let future: Vec<&Event> = events.iter().filter(|e| !e.is_past).collect();
        for a in &future {
            for b in &future {
                if a.date < b.date {
                    assert!(
                        a.urgency.rank() <= b.urgency.rank(),
                        "{} ({:?}) vs {} ({:?})",
                        a.id,
                        a.urgency,
                        b.id,
                        b.urgency
                    );
                }
            }
        }
    }

    #[test]
    fn status_derived_from_first_upcoming_event() {
        let today = date(2026, 1, 1);
        let (events, status) = generate(&stem_f1_profile(), today).unwrap();

        let next = events.iter().find(|e| !e.is_past).unwrap();
        assert_eq!(status.next_deadline.as_deref(), Some(next.title.as_str()));
        assert_eq!(
            status.days_until_next_deadline,
            Some(next.date.signed_duration_since(today).num_days())
        );
        assert_eq!(status.visa, "F-1");
        assert_eq!(status.work_auth, "Student (CPT/On-Campus)");
    }

    #[test]
    fn status_null_when_everything_is_past() {
        let profile = Profile {
            visa_type: VisaType::J1,
            degree_level: DegreeLevel::Masters,
            is_stem: false,
            major_field: None,
            program_start: Some(date(2020, 8, 1)),
            expected_graduation: Some(date(2022, 5, 15)),
            original_graduation: None,
            program_extended: false,
            cpt_months_used: 0,
            currently_employed: false,
            has_job_offer: false,
            opt_status: OptStatus::None,
            unemployment_days: 0,
            h1b_attempts: 0,
            country: "Rest of World".to_string(),
            career_goal: CareerGoal::ReturnHome,
        };
        let (events, status) = generate(&profile, date(2026, 1, 1)).unwrap();

        assert!(events.iter().all(|e| e.is_past));
        assert_eq!(status.days_until_next_deadline, None);
        assert_eq!(status.next_deadline, None);
    }

    #[test]
    fn generation_is_idempotent() {
        let profile = stem_f1_profile();
        let today = date(2026, 1, 1);
        let first = generate(&profile, today).unwrap();
        let second = generate(&profile, today).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_profile_rejected_before_date_math() {
        let mut profile = stem_f1_profile();
        profile.expected_graduation = Some(date(2023, 1, 1));
        let err = generate(&profile, date(2026, 1, 1)).unwrap_err();
        assert_eq!(err.field, "expected_graduation");
    }
}

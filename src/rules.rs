//! Static rule dataset: work-authorization durations and windows, the
//! country backlog table, and the STEM CIP code set.
//!
//! Pure data, loaded into the binary at compile time and never mutated.
//! Figures track USCIS rules and Visa Bulletin bands; wait times are
//! approximate by nature.

pub struct OptRules {
    pub apply_before_graduation_days: i64,
    pub apply_after_graduation_days: i64,
    pub duration_months: u32,
    pub unemployment_limit_days: u32,
    pub ead_processing_months_min: u32,
    pub ead_processing_months_max: u32,
}

pub const OPT_RULES: OptRules = OptRules {
    apply_before_graduation_days: 90,
    apply_after_graduation_days: 60,
    duration_months: 12,
    unemployment_limit_days: 90,
    ead_processing_months_min: 3,
    ead_processing_months_max: 5,
};

pub struct StemOptRules {
    pub extension_months: u32,
    pub total_duration_months: u32,
    pub unemployment_limit_days: u32,
    pub requires_e_verify: bool,
}

pub const STEM_OPT_RULES: StemOptRules = StemOptRules {
    extension_months: 24,
    total_duration_months: 36,
    unemployment_limit_days: 150,
    requires_e_verify: true,
};

/// Cumulative full-time CPT months that permanently disqualify OPT.
pub const CPT_FULL_TIME_KILL_MONTHS: u32 = 12;

/// Full-time CPT months at which the approaching-limit warning starts.
pub const CPT_WARNING_MONTHS: u32 = 9;

pub struct H1bRules {
    pub registration_month: u32,
    pub registration_start_day: u32,
    pub registration_end_day: u32,
    pub results_month: u32,
    pub start_month: u32,
    pub start_day: u32,
    /// Registration windows scanned before the generator gives up.
    pub max_lookahead_years: i32,
}

pub const H1B_RULES: H1bRules = H1bRules {
    registration_month: 3,
    registration_start_day: 1,
    registration_end_day: 31,
    results_month: 4,
    start_month: 10,
    start_day: 1,
    max_lookahead_years: 6,
};

pub struct CapGapRules {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

/// Status bridge from April 1 to October 1 for selected registrants whose
/// OPT lapses in between.
pub const CAP_GAP_RULES: CapGapRules = CapGapRules {
    start_month: 4,
    start_day: 1,
    end_month: 10,
    end_day: 1,
};

/// Unemployment-day ceiling while on post-completion work authorization.
pub fn unemployment_limit_days(is_stem: bool) -> u32 {
    if is_stem {
        STEM_OPT_RULES.unemployment_limit_days
    } else {
        OPT_RULES.unemployment_limit_days
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogStatus {
    Current,
    Backlogged,
    SeverelyBacklogged,
}

impl BacklogStatus {
    pub fn is_long(self) -> bool {
        !matches!(self, Self::Current)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaitBand {
    pub wait_years_min: u32,
    pub wait_years_max: u32,
    pub status: BacklogStatus,
}

/// Green-card wait bands for one chargeability area, by EB category.
#[derive(Debug, Clone, Copy)]
pub struct CountryBacklog {
    pub name: &'static str,
    pub eb1: WaitBand,
    pub eb2: WaitBand,
    pub eb3: WaitBand,
}

impl CountryBacklog {
    /// True when either employment-based band most students use is long.
    pub fn employment_backlogged(&self) -> bool {
        self.eb2.status.is_long() || self.eb3.status.is_long()
    }
}

const BACKLOG_TABLE: &[CountryBacklog] = &[
    CountryBacklog {
        name: "India",
        eb1: WaitBand {
            wait_years_min: 2,
            wait_years_max: 4,
            status: BacklogStatus::Backlogged,
        },
        eb2: WaitBand {
            wait_years_min: 10,
            wait_years_max: 30,
            status: BacklogStatus::SeverelyBacklogged,
        },
        eb3: WaitBand {
            wait_years_min: 10,
            wait_years_max: 25,
            status: BacklogStatus::SeverelyBacklogged,
        },
    },
    CountryBacklog {
        name: "China",
        eb1: WaitBand {
            wait_years_min: 1,
            wait_years_max: 3,
            status: BacklogStatus::Backlogged,
        },
        eb2: WaitBand {
            wait_years_min: 4,
            wait_years_max: 8,
            status: BacklogStatus::Backlogged,
        },
        eb3: WaitBand {
            wait_years_min: 4,
            wait_years_max: 8,
            status: BacklogStatus::Backlogged,
        },
    },
];

const REST_OF_WORLD: CountryBacklog = CountryBacklog {
    name: "Rest of World",
    eb1: WaitBand {
        wait_years_min: 0,
        wait_years_max: 1,
        status: BacklogStatus::Current,
    },
    eb2: WaitBand {
        wait_years_min: 0,
        wait_years_max: 2,
        status: BacklogStatus::Current,
    },
    eb3: WaitBand {
        wait_years_min: 0,
        wait_years_max: 2,
        status: BacklogStatus::Current,
    },
};

/// Resolves a citizenship country to its backlog row. Unknown countries
/// fall back to the rest-of-world band; this lookup never fails.
pub fn country_backlog(country: &str) -> &'static CountryBacklog {
    let normalized = country.trim().to_lowercase();
    let alias = match normalized.as_str() {
        "mainland china" | "prc" => "china",
        other => other,
    };
    BACKLOG_TABLE
        .iter()
        .find(|entry| entry.name.to_lowercase() == alias)
        .unwrap_or(&REST_OF_WORLD)
}

/// STEM-designated CIP code prefixes (two-digit series) plus the specific
/// business-analytics series that qualify. Used to sanity-check a
/// caller-supplied `is_stem` flag against a known CIP code; the timeline
/// math itself trusts the flag.
const STEM_CIP_SERIES: &[&str] = &["11.", "14.", "15.", "26.", "27.", "40."];

const STEM_CIP_CODES: &[&str] = &[
    "30.0601", "30.3001", "30.3101", "30.3801", "30.7001", "52.1301", "52.1302", "52.1304",
    "52.1399",
];

pub fn is_stem_cip(cip_code: &str) -> bool {
    STEM_CIP_SERIES
        .iter()
        .any(|series| cip_code.starts_with(series))
        || STEM_CIP_CODES.contains(&cip_code)
}

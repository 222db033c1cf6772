//! Clinical extraction: deterministic regex pass first, LLM fallback
//! only when the message yields nothing deterministically, and range
//! re-validation over whatever the model returns.

use regex::Regex;

use crate::clinical::validator::{
    map_respiratory_mode, normalize_pa, validate_hr, validate_rr, validate_sat, validate_temp,
    PaOutcome, WARN_HR_RANGE, WARN_PA_AMBIGUOUS, WARN_PA_RANGE, WARN_RR_RANGE, WARN_SAT_RANGE,
    WARN_TEMP_RANGE,
};
use crate::llm::gateway::LlmGateway;
use crate::llm::types::RawClinicalExtract;
use crate::models::session::{RespiratoryMode, SessionState, Vitals};
use crate::{AppError, Result};

/// Default note applied after the first complete measurement when the
/// caregiver sends vitals without an explicit note.
pub const DEFAULT_NOTE: &str = "sem alterações";

/// Validated extraction result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicalExtraction {
    /// Vitals that passed validation.
    pub vitals: Vitals,
    /// Respiratory mode, when stated.
    pub respiratory_mode: Option<RespiratoryMode>,
    /// Free-text clinical note, when present.
    pub clinical_note: Option<String>,
    /// Warning codes for rejected or ambiguous values.
    pub warnings: Vec<String>,
}

impl ClinicalExtraction {
    /// Whether the extraction carries any clinical signal at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vitals == Vitals::default()
            && self.respiratory_mode.is_none()
            && self.clinical_note.is_none()
    }
}

/// What the clinical buffer is ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitReadiness {
    /// Full measurement ready: vitals 5-tuple + mode (+ note, defaulted
    /// after the first complete measurement).
    Full,
    /// Only a note is buffered and the first measurement is done:
    /// commit directly, no staging.
    NoteOnly,
    /// Fields still missing; caregiver-facing labels listed.
    Missing(Vec<String>),
}

/// Compute what the session's clinical buffer can commit right now.
///
/// Until the first complete measurement, the full tuple AND the
/// respiratory mode AND a note are required.
#[must_use]
pub fn commit_readiness(state: &SessionState) -> CommitReadiness {
    let mut missing: Vec<String> =
        state.vitals.missing().into_iter().map(String::from).collect();
    if state.respiratory_mode.is_none() {
        missing.push("modo respiratório".to_string());
    }

    if state.first_complete_measurement_done {
        let has_any_vital = state.vitals != Vitals::default();
        if !has_any_vital && state.respiratory_mode.is_none() {
            if state.clinical_note.is_some() {
                return CommitReadiness::NoteOnly;
            }
            return CommitReadiness::Missing(missing);
        }
        if missing.is_empty() {
            return CommitReadiness::Full;
        }
        return CommitReadiness::Missing(missing);
    }

    if state.clinical_note.is_none() {
        missing.push("evolução do paciente".to_string());
    }
    if missing.is_empty() {
        CommitReadiness::Full
    } else {
        CommitReadiness::Missing(missing)
    }
}

/// Clinical extractor: regex pass, LLM fallback, validation.
#[derive(Clone)]
pub struct ClinicalExtractor {
    pa: Regex,
    hr: Regex,
    rr: Regex,
    sat: Regex,
    temp: Regex,
    respiratory: Regex,
}

impl ClinicalExtractor {
    /// Compile the extraction patterns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a pattern fails to compile; the
    /// patterns are constants, so this only fires on a build defect.
    pub fn new() -> Result<Self> {
        Ok(Self {
            pa: compile(r"(?i)\b(?:pa|press[ãa]o(?:\s+arterial)?)?\s*:?\s*(\d{1,3})\s*[x/]\s*(\d{1,3})")?,
            hr: compile(r"(?i)\b(?:fc|pulso|batimentos?|freq(?:u[êe]ncia)?\s*card[íi]aca)\s*:?\D{0,3}(\d{1,3})")?,
            rr: compile(r"(?i)\b(?:fr|freq(?:u[êe]ncia)?\s*resp(?:irat[óo]ria)?)\s*:?\D{0,3}(\d{1,3})")?,
            sat: compile(r"(?i)\b(?:sat(?:ura[çc][ãa]o)?(?:\s*(?:de\s*)?o2)?|spo2|sato2)\s*:?\D{0,3}(\d{1,3})")?,
            temp: compile(r"(?i)\b(?:temp(?:eratura)?|tax)\s*:?\D{0,3}(\d{2}(?:[.,]\d)?)")?,
            respiratory: compile(
                r"(?i)(ar\s+ambiente|em\s+aa|ventila[çc][ãa]o\s+mec[âa]nica|ventilador|tqt|traqueo\w*|oxig[êe]nio|cateter\s+de\s+o2|cateter|concentrador|o2\s+suplementar|m[áa]scara\s+de\s+o2|[óo]culos\s+nasal)",
            )?,
        })
    }

    /// Extract and validate clinical fields from a caregiver message.
    ///
    /// The deterministic pass wins; the LLM is consulted only when the
    /// message yields nothing deterministically. With the provider
    /// unavailable the whole text degrades to a clinical note.
    ///
    /// # Errors
    ///
    /// Never fails today; LLM unavailability is absorbed into the
    /// note-only degradation. The `Result` keeps the seam uniform with
    /// the other extraction paths.
    pub async fn extract(&self, llm: &LlmGateway, text: &str) -> Result<ClinicalExtraction> {
        let deterministic = self.deterministic_pass(text);
        if !deterministic.is_empty() || !deterministic.warnings.is_empty() {
            return Ok(deterministic);
        }

        match llm.extract_clinical(text).await {
            Ok(raw) => Ok(validate_raw(&raw)),
            Err(AppError::LlmUnavailable(_)) => Ok(ClinicalExtraction {
                clinical_note: non_empty(text),
                ..ClinicalExtraction::default()
            }),
            Err(err) => Err(err),
        }
    }

    /// Regex-only pass over the message.
    #[must_use]
    pub fn deterministic_pass(&self, text: &str) -> ClinicalExtraction {
        let mut out = ClinicalExtraction::default();
        let mut consumed: Vec<(usize, usize)> = Vec::new();

        // Saturation first so its "o2" token cannot read as a
        // respiratory descriptor later.
        if let Some(caps) = self.sat.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(value) = m.as_str().parse::<i64>() {
                    match validate_sat(value) {
                        Some(sat) => out.vitals.sat_o2 = Some(sat),
                        None => out.warnings.push(WARN_SAT_RANGE.to_string()),
                    }
                }
                record_span(&mut consumed, &caps);
            }
        }

        if let Some(caps) = self.pa.captures(text) {
            if let (Some(sys), Some(dia)) = (caps.get(1), caps.get(2)) {
                let raw = format!("{}x{}", sys.as_str(), dia.as_str());
                match normalize_pa(&raw) {
                    PaOutcome::Normalized(pa) => out.vitals.pa = Some(pa),
                    PaOutcome::Ambiguous => out.warnings.push(WARN_PA_AMBIGUOUS.to_string()),
                    PaOutcome::OutOfRange => out.warnings.push(WARN_PA_RANGE.to_string()),
                    PaOutcome::Unrecognized => {}
                }
                record_span(&mut consumed, &caps);
            }
        }

        if let Some(caps) = self.hr.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(value) = m.as_str().parse::<i64>() {
                    match validate_hr(value) {
                        Some(hr) => out.vitals.hr = Some(hr),
                        None => out.warnings.push(WARN_HR_RANGE.to_string()),
                    }
                }
                record_span(&mut consumed, &caps);
            }
        }

        if let Some(caps) = self.rr.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(value) = m.as_str().parse::<i64>() {
                    match validate_rr(value) {
                        Some(rr) => out.vitals.rr = Some(rr),
                        None => out.warnings.push(WARN_RR_RANGE.to_string()),
                    }
                }
                record_span(&mut consumed, &caps);
            }
        }

        if let Some(caps) = self.temp.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(value) = m.as_str().replace(',', ".").parse::<f64>() {
                    match validate_temp(value) {
                        Some(temp) => out.vitals.temp = Some(temp),
                        None => out.warnings.push(WARN_TEMP_RANGE.to_string()),
                    }
                }
                record_span(&mut consumed, &caps);
            }
        }

        if let Some(m) = self.respiratory.find(text) {
            out.respiratory_mode = map_respiratory_mode(m.as_str());
            consumed.push((m.start(), m.end()));
        }

        if !out.is_empty() || !out.warnings.is_empty() {
            out.clinical_note = leftover_note(text, &consumed);
        }
        out
    }
}

/// Re-validate a raw LLM extraction, never trusting model-side ranges.
#[must_use]
pub fn validate_raw(raw: &RawClinicalExtract) -> ClinicalExtraction {
    let mut out = ClinicalExtraction {
        warnings: raw.warnings.clone(),
        ..ClinicalExtraction::default()
    };

    if let Some(pa) = raw.pa.as_deref() {
        match normalize_pa(pa) {
            PaOutcome::Normalized(normalized) => out.vitals.pa = Some(normalized),
            PaOutcome::Ambiguous => push_unique(&mut out.warnings, WARN_PA_AMBIGUOUS),
            PaOutcome::OutOfRange => push_unique(&mut out.warnings, WARN_PA_RANGE),
            PaOutcome::Unrecognized => {}
        }
    }
    if let Some(hr) = raw.hr {
        match validate_hr(hr) {
            Some(v) => out.vitals.hr = Some(v),
            None => push_unique(&mut out.warnings, WARN_HR_RANGE),
        }
    }
    if let Some(rr) = raw.rr {
        match validate_rr(rr) {
            Some(v) => out.vitals.rr = Some(v),
            None => push_unique(&mut out.warnings, WARN_RR_RANGE),
        }
    }
    if let Some(sat) = raw.sat_o2 {
        match validate_sat(sat) {
            Some(v) => out.vitals.sat_o2 = Some(v),
            None => push_unique(&mut out.warnings, WARN_SAT_RANGE),
        }
    }
    if let Some(temp) = raw.temp {
        match validate_temp(temp) {
            Some(v) => out.vitals.temp = Some(v),
            None => push_unique(&mut out.warnings, WARN_TEMP_RANGE),
        }
    }
    if let Some(mode) = raw.respiratory_mode.as_deref() {
        out.respiratory_mode = parse_mode(mode).or_else(|| map_respiratory_mode(mode));
    }
    out.clinical_note = raw.clinical_note.as_deref().and_then(non_empty);
    out
}

fn parse_mode(s: &str) -> Option<RespiratoryMode> {
    match s {
        "ambient" => Some(RespiratoryMode::Ambient),
        "supplemental_o2" => Some(RespiratoryMode::SupplementalO2),
        "mechanical_ventilation" => Some(RespiratoryMode::MechanicalVentilation),
        _ => None,
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| AppError::Config(format!("invalid clinical regex: {err}")))
}

fn record_span(consumed: &mut Vec<(usize, usize)>, caps: &regex::Captures<'_>) {
    if let Some(whole) = caps.get(0) {
        consumed.push((whole.start(), whole.end()));
    }
}

/// Text left after removing matched spans; becomes the clinical note
/// when it still says something.
fn leftover_note(text: &str, consumed: &[(usize, usize)]) -> Option<String> {
    let mut keep = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        let inside = consumed.iter().any(|&(start, end)| idx >= start && idx < end);
        if !inside {
            keep.push(ch);
        }
    }

    let cleaned: String = keep
        .split([',', ';', '.', '\n'])
        .map(str::trim)
        .filter(|segment| {
            segment.chars().filter(|c| c.is_alphabetic()).count() >= 3
        })
        .collect::<Vec<_>>()
        .join(", ");

    non_empty(&cleaned)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn push_unique(warnings: &mut Vec<String>, code: &str) {
    if !warnings.iter().any(|w| w == code) {
        warnings.push(code.to_string());
    }
}

//! Safety-range validation and normalization for vital signs.
//!
//! Ranges are inclusive. A value one unit outside is rejected with a
//! warning code; the field stays null and is asked for again.

use crate::models::session::RespiratoryMode;

/// Heart rate range, bpm.
pub const HR_RANGE: (i64, i64) = (20, 220);
/// Respiratory rate range, rpm.
pub const RR_RANGE: (i64, i64) = (5, 50);
/// Oxygen saturation range, percent.
pub const SAT_RANGE: (i64, i64) = (50, 100);
/// Temperature range, Celsius.
pub const TEMP_RANGE: (f64, f64) = (30.0, 43.0);
/// Systolic pressure range, mmHg.
pub const PA_SYS_RANGE: (i64, i64) = (70, 260);
/// Diastolic pressure range, mmHg.
pub const PA_DIA_RANGE: (i64, i64) = (40, 160);

/// Warning code for an ambiguous shorthand blood pressure.
pub const WARN_PA_AMBIGUOUS: &str = "PA_ambigua";
/// Warning code for an out-of-range blood pressure.
pub const WARN_PA_RANGE: &str = "PA_fora_da_faixa";
/// Warning code for an out-of-range heart rate.
pub const WARN_HR_RANGE: &str = "FC_fora_da_faixa";
/// Warning code for an out-of-range respiratory rate.
pub const WARN_RR_RANGE: &str = "FR_fora_da_faixa";
/// Warning code for an out-of-range saturation.
pub const WARN_SAT_RANGE: &str = "SatO2_fora_da_faixa";
/// Warning code for an out-of-range temperature.
pub const WARN_TEMP_RANGE: &str = "Temp_fora_da_faixa";

/// Outcome of blood pressure normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaOutcome {
    /// In range; normalized to `SSSxDDD`.
    Normalized(String),
    /// Shorthand like `12/8` that could mean `120x80`; rejected.
    Ambiguous,
    /// Parsed but outside the safety ranges.
    OutOfRange,
    /// Not a recognizable pressure at all.
    Unrecognized,
}

/// Normalize a blood pressure written as `SSSxDDD` or `SSS/DDD`.
#[must_use]
pub fn normalize_pa(raw: &str) -> PaOutcome {
    let cleaned = raw.trim();
    let mut parts = cleaned.splitn(2, ['x', 'X', '/']);
    let (Some(sys_raw), Some(dia_raw)) = (parts.next(), parts.next()) else {
        return PaOutcome::Unrecognized;
    };

    let (Ok(sys), Ok(dia)) = (
        sys_raw.trim().parse::<i64>(),
        dia_raw.trim().parse::<i64>(),
    ) else {
        return PaOutcome::Unrecognized;
    };

    if in_range(sys, PA_SYS_RANGE) && in_range(dia, PA_DIA_RANGE) {
        return PaOutcome::Normalized(format!("{sys}x{dia}"));
    }

    // Shorthand: "12/8" plausibly means 120x80. Refuse to guess.
    if in_range(sys * 10, PA_SYS_RANGE) && in_range(dia * 10, PA_DIA_RANGE) {
        return PaOutcome::Ambiguous;
    }

    PaOutcome::OutOfRange
}

/// Validate a heart rate; `None` when out of range.
#[must_use]
pub fn validate_hr(value: i64) -> Option<u16> {
    in_range(value, HR_RANGE).then(|| clamp_u16(value))
}

/// Validate a respiratory rate; `None` when out of range.
#[must_use]
pub fn validate_rr(value: i64) -> Option<u16> {
    in_range(value, RR_RANGE).then(|| clamp_u16(value))
}

/// Validate an oxygen saturation; `None` when out of range.
#[must_use]
pub fn validate_sat(value: i64) -> Option<u8> {
    in_range(value, SAT_RANGE).then(|| u8::try_from(value).unwrap_or(u8::MAX))
}

/// Validate a temperature; `None` when out of range.
#[must_use]
pub fn validate_temp(value: f64) -> Option<f64> {
    (value >= TEMP_RANGE.0 && value <= TEMP_RANGE.1).then_some(value)
}

/// Map a free-text respiratory descriptor to the enum.
///
/// Matching is keyword-based over lowercase text; saturation mentions
/// must be stripped by the caller first so `sat de O2` does not read as
/// supplemental oxygen.
#[must_use]
pub fn map_respiratory_mode(text: &str) -> Option<RespiratoryMode> {
    let lower = text.to_lowercase();

    if lower.contains("ar ambiente") || lower.contains("em aa") {
        return Some(RespiratoryMode::Ambient);
    }
    if lower.contains("ventila")
        || lower.contains("tqt")
        || lower.contains("traqueo")
        || lower.contains(" vm")
        || lower.starts_with("vm")
    {
        return Some(RespiratoryMode::MechanicalVentilation);
    }
    if lower.contains("oxig")
        || lower.contains("cateter")
        || lower.contains("catéter")
        || lower.contains("concentrador")
        || lower.contains("suplementar")
        || lower.contains("óculos nasal")
        || lower.contains("oculos nasal")
        || lower.contains("máscara")
        || lower.contains("mascara")
        || lower.contains("o2")
    {
        return Some(RespiratoryMode::SupplementalO2);
    }
    None
}

fn in_range(value: i64, range: (i64, i64)) -> bool {
    value >= range.0 && value <= range.1
}

fn clamp_u16(value: i64) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

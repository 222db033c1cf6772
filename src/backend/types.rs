//! Contract shapes for the backend endpoints and the workflow webhook.
//!
//! Field names mirror the backend's JSON exactly; serde renames keep the
//! Rust side snake_case.

use serde::{Deserialize, Serialize};

/// Shift context returned by `getScheduleStarted`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleContext {
    /// Schedule identifier.
    pub schedule_id: Option<String>,
    /// Patient identifier.
    pub patient_id: Option<String>,
    /// Patient display name.
    pub patient_name: Option<String>,
    /// Open report identifier.
    pub report_id: Option<String>,
    /// Open report date.
    pub report_date: Option<String>,
    /// Shift day.
    pub shift_day: Option<String>,
    /// Shift start time.
    pub shift_start: Option<String>,
    /// Shift end time.
    pub shift_end: Option<String>,
    /// Whether an attendance answer is allowed/expected.
    pub shift_allow: bool,
    /// Attendance response already recorded.
    pub response: Option<String>,
    /// Whether the shift has started.
    pub schedule_started: bool,
    /// Backend flagged the shift ready to close.
    pub finish_reminder_sent: bool,
    /// Caregiver identifier.
    pub caregiver_id: Option<String>,
    /// Caregiver display name.
    pub caregiver_name: Option<String>,
    /// Employing company.
    pub company: Option<String>,
    /// Cooperative, when applicable.
    pub cooperative: Option<String>,
}

/// Request body for `updateWorkScheduleResponse`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    /// Schedule identifier.
    pub schedule_identifier: String,
    /// `confirmado` or `cancelado`.
    pub response_value: String,
    /// Staged action identifier, for backend-side idempotency.
    pub action_id: String,
}

/// The seven clinical payload scenarios the backend accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClinicalScenario {
    /// Vitals + note + symptom report.
    #[serde(rename = "VITAL_SIGNS_NOTE_SYMPTOMS")]
    VitalSignsNoteSymptoms,
    /// Vitals + symptom report.
    #[serde(rename = "VITAL_SIGNS_SYMPTOMS")]
    VitalSignsSymptoms,
    /// Vitals + note.
    #[serde(rename = "VITAL_SIGNS_NOTE")]
    VitalSignsNote,
    /// Vitals only.
    #[serde(rename = "VITAL_SIGNS_ONLY")]
    VitalSignsOnly,
    /// Note + symptom report.
    #[serde(rename = "NOTE_SYMPTOMS")]
    NoteSymptoms,
    /// Symptom report only.
    #[serde(rename = "SYMPTOMS_ONLY")]
    SymptomsOnly,
    /// Note only.
    #[serde(rename = "NOTE_ONLY")]
    NoteOnly,
}

impl ClinicalScenario {
    /// Select the scenario from payload contents.
    #[must_use]
    pub fn from_parts(has_vitals: bool, has_note: bool, has_symptoms: bool) -> Self {
        match (has_vitals, has_note, has_symptoms) {
            (true, true, true) => Self::VitalSignsNoteSymptoms,
            (true, false, true) => Self::VitalSignsSymptoms,
            (true, true, false) => Self::VitalSignsNote,
            (true, false, false) => Self::VitalSignsOnly,
            (false, true, true) => Self::NoteSymptoms,
            (false, false, true) => Self::SymptomsOnly,
            (false, true | false, false) => Self::NoteOnly,
        }
    }
}

/// Request body for `updateClinicalData`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalDataRequest {
    /// Report identifier.
    #[serde(rename = "reportID")]
    pub report_id: String,
    /// Report date.
    pub report_date: String,
    /// Payload scenario.
    pub scenario: Option<ClinicalScenario>,
    /// Caregiver identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver_identifier: Option<String>,
    /// Patient identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_identifier: Option<String>,
    /// Heart rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u16>,
    /// Respiratory rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_rate: Option<u16>,
    /// Oxygen saturation.
    #[serde(rename = "saturationO2", skip_serializing_if = "Option::is_none")]
    pub saturation_o2: Option<u8>,
    /// Blood pressure, `SSSxDDD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Whether supplemental oxygen or ventilation is in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplementary_oxygen: Option<bool>,
    /// Oxygen flow, when informed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_volume: Option<String>,
    /// Whether a concentrator is in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_concentrator: Option<bool>,
    /// Clinical note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_note: Option<String>,
    /// Symptom report entries; always empty here (symptom search is an
    /// external collaborator).
    #[serde(rename = "SymptomReport", skip_serializing_if = "Vec::is_empty", default)]
    pub symptom_report: Vec<serde_json::Value>,
    /// Staged action identifier, for backend-side idempotency.
    pub action_id: String,
}

/// Request body for `updatereportsummaryad`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Report identifier.
    #[serde(rename = "reportID")]
    pub report_id: String,
    /// Report date.
    pub report_date: String,
    /// Schedule identifier.
    #[serde(rename = "scheduleID")]
    pub schedule_id: String,
    /// Patient first name.
    pub patient_first_name: String,
    /// Shift day.
    pub shift_day: String,
    /// Shift start time.
    pub shift_start: String,
    /// Shift end time.
    pub shift_end: String,
    /// Caregiver first name.
    pub caregiver_first_name: String,
    /// Caregiver identifier.
    #[serde(rename = "caregiverID")]
    pub caregiver_id: String,
    /// Food and hydration topic.
    pub food_hydration_specification: String,
    /// Stool and urine topic.
    pub stool_urine_specification: String,
    /// Sleep topic.
    pub sleep_specification: String,
    /// Mood topic.
    pub mood_specification: String,
    /// Medications topic.
    pub medications_specification: String,
    /// Activities topic.
    pub activities_specification: String,
    /// Additional clinical topic.
    pub additional_information_specification: String,
    /// Additional administrative topic.
    pub administrative_info: String,
    /// Staged action identifier, for backend-side idempotency.
    pub action_id: String,
}

/// One note returned by `getNoteReport`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NoteEntry {
    /// Note text.
    #[serde(rename = "noteDescAI")]
    pub note_desc: String,
    /// Note timestamp.
    pub timestamp: Option<String>,
}

/// Response body for `getNoteReport`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct NoteReport {
    /// Notes recorded during the shift.
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
}

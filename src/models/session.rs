//! Session state model and lifecycle helpers.
//!
//! One session per caregiver phone number, long-lived across messages.
//! The whole document is persisted as a JSON column with an optimistic
//! concurrency version held next to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendance response recorded on the shift schedule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShiftResponse {
    /// No response recorded yet.
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Caregiver confirmed attendance.
    #[serde(rename = "confirmado")]
    Confirmado,
    /// Backend is waiting for the caregiver's answer.
    #[serde(rename = "aguardando resposta")]
    AguardandoResposta,
    /// Caregiver cancelled attendance.
    #[serde(rename = "cancelado")]
    Cancelado,
}

/// Respiratory support mode reported with a measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RespiratoryMode {
    /// Breathing room air.
    Ambient,
    /// Supplemental oxygen (catheter, mask, concentrator).
    SupplementalO2,
    /// Invasive or non-invasive mechanical ventilation.
    MechanicalVentilation,
}

/// Vital signs buffer; every field optional until collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    /// Blood pressure, normalized to `SSSxDDD`.
    pub pa: Option<String>,
    /// Heart rate in bpm.
    pub hr: Option<u16>,
    /// Respiratory rate in rpm.
    pub rr: Option<u16>,
    /// Oxygen saturation in percent.
    pub sat_o2: Option<u8>,
    /// Axillary temperature in Celsius.
    pub temp: Option<f64>,
}

impl Vitals {
    /// Whether the full 5-tuple has been collected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pa.is_some()
            && self.hr.is_some()
            && self.rr.is_some()
            && self.sat_o2.is_some()
            && self.temp.is_some()
    }

    /// Caregiver-facing labels of the fields still missing.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.pa.is_none() {
            out.push("PA");
        }
        if self.hr.is_none() {
            out.push("FC");
        }
        if self.rr.is_none() {
            out.push("FR");
        }
        if self.sat_o2.is_none() {
            out.push("SatO2");
        }
        if self.temp.is_none() {
            out.push("Temp");
        }
        out
    }

    /// Fill null fields from `other`, never overwriting collected values.
    pub fn merge_missing(&mut self, other: &Self) {
        if self.pa.is_none() {
            self.pa.clone_from(&other.pa);
        }
        if self.hr.is_none() {
            self.hr = other.hr;
        }
        if self.rr.is_none() {
            self.rr = other.rr;
        }
        if self.sat_o2.is_none() {
            self.sat_o2 = other.sat_o2;
        }
        if self.temp.is_none() {
            self.temp = other.temp;
        }
    }
}

/// Finalization report topics; each filled incrementally from caregiver text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalizationTopics {
    /// Food and hydration.
    pub alimentacao: Option<String>,
    /// Stool and urine.
    pub evacuacoes: Option<String>,
    /// Sleep.
    pub sono: Option<String>,
    /// Mood.
    pub humor: Option<String>,
    /// Medications given.
    pub medicacoes: Option<String>,
    /// Activities performed.
    pub atividades: Option<String>,
    /// Additional clinical remarks.
    pub adicional_clinico: Option<String>,
    /// Additional administrative remarks.
    pub adicional_administrativo: Option<String>,
}

impl FinalizationTopics {
    /// Topic labels in collection order.
    pub const LABELS: [&'static str; 8] = [
        "alimentacao",
        "evacuacoes",
        "sono",
        "humor",
        "medicacoes",
        "atividades",
        "adicional_clinico",
        "adicional_administrativo",
    ];

    /// Whether all 8 topics are filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Labels of topics still unfilled, in collection order.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        self.as_pairs()
            .into_iter()
            .filter_map(|(label, value)| value.is_none().then_some(label))
            .collect()
    }

    /// Fill null topics from `other`; returns the labels newly filled.
    pub fn merge_missing(&mut self, other: &Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        let sources = other.as_pairs();
        for (idx, slot) in self.as_slots().into_iter().enumerate() {
            if slot.is_none() {
                if let (label, Some(value)) = sources[idx] {
                    *slot = Some(value.clone());
                    filled.push(label);
                }
            }
        }
        filled
    }

    /// Topic value by label, if filled.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.as_pairs()
            .into_iter()
            .find(|(l, _)| *l == label)
            .and_then(|(_, v)| v.map(String::as_str))
    }

    fn as_pairs(&self) -> [(&'static str, Option<&String>); 8] {
        [
            ("alimentacao", self.alimentacao.as_ref()),
            ("evacuacoes", self.evacuacoes.as_ref()),
            ("sono", self.sono.as_ref()),
            ("humor", self.humor.as_ref()),
            ("medicacoes", self.medicacoes.as_ref()),
            ("atividades", self.atividades.as_ref()),
            ("adicional_clinico", self.adicional_clinico.as_ref()),
            ("adicional_administrativo", self.adicional_administrativo.as_ref()),
        ]
    }

    fn as_slots(&mut self) -> [&mut Option<String>; 8] {
        [
            &mut self.alimentacao,
            &mut self.evacuacoes,
            &mut self.sono,
            &mut self.humor,
            &mut self.medicacoes,
            &mut self.atividades,
            &mut self.adicional_clinico,
            &mut self.adicional_administrativo,
        ]
    }
}

/// Flow to resume after an interrupting diversion, with the reason recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ResumeAfter {
    /// Flow name to return to (`escala`, `clinico`, `finalizar`).
    pub flow: String,
    /// Why the flow was interrupted.
    pub reason: String,
}

/// Canonical session state document, versioned under optimistic concurrency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SessionState {
    /// Canonical phone number; primary key.
    pub session_id: String,
    /// Phone number as received from the gateway.
    pub phone_number: String,
    /// Caregiver identifier from the backend.
    pub caregiver_id: Option<String>,
    /// Caregiver display name.
    pub caregiver_name: Option<String>,
    /// Employing company.
    pub company: Option<String>,
    /// Cooperative, when applicable.
    pub cooperative: Option<String>,

    /// Current shift schedule identifier.
    pub schedule_id: Option<String>,
    /// Patient identifier.
    pub patient_id: Option<String>,
    /// Patient display name.
    pub patient_name: Option<String>,
    /// Shift day (backend-formatted date).
    pub shift_day: Option<String>,
    /// Shift start time.
    pub shift_start: Option<String>,
    /// Shift end time.
    pub shift_end: Option<String>,
    /// Open report identifier.
    pub report_id: Option<String>,
    /// Open report date.
    pub report_date: Option<String>,
    /// Whether an attendance answer is allowed/expected.
    pub shift_allow: bool,
    /// Attendance response recorded on the schedule.
    pub response: ShiftResponse,
    /// Whether the shift has started on the backend side.
    pub schedule_started: bool,
    /// Backend flagged the shift ready to close.
    pub finish_reminder_sent: bool,

    /// Vitals collected for the in-flight measurement.
    pub vitals: Vitals,
    /// Respiratory mode for the in-flight measurement.
    pub respiratory_mode: Option<RespiratoryMode>,
    /// Clinical note for the in-flight measurement.
    pub clinical_note: Option<String>,
    /// Whether the first complete measurement has been committed.
    pub first_complete_measurement_done: bool,

    /// Finalization topics collected so far.
    pub finalization_topics: FinalizationTopics,

    /// Flow to resume after an interruption.
    pub resume_after: Option<ResumeAfter>,
    /// Last inbound user text.
    pub last_user_text: Option<String>,
    /// Outcome code of the last rendered reply.
    pub last_reply_code: Option<String>,
    /// Last successful write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Construct the default state for a session seen for the first time.
    #[must_use]
    pub fn new(phone_number: &str) -> Self {
        Self {
            session_id: canonical_phone(phone_number),
            phone_number: phone_number.to_string(),
            caregiver_id: None,
            caregiver_name: None,
            company: None,
            cooperative: None,
            schedule_id: None,
            patient_id: None,
            patient_name: None,
            shift_day: None,
            shift_start: None,
            shift_end: None,
            report_id: None,
            report_date: None,
            shift_allow: false,
            response: ShiftResponse::Empty,
            schedule_started: false,
            finish_reminder_sent: false,
            vitals: Vitals::default(),
            respiratory_mode: None,
            clinical_note: None,
            first_complete_measurement_done: false,
            finalization_topics: FinalizationTopics::default(),
            resume_after: None,
            last_user_text: None,
            last_reply_code: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the attendance gate applies: an answer is expected and the
    /// caregiver has not confirmed presence yet.
    #[must_use]
    pub fn attendance_pending(&self) -> bool {
        self.shift_allow && self.response != ShiftResponse::Confirmado
    }

    /// Clear the clinical buffer after a successful clinical commit.
    pub fn clear_clinical_buffer(&mut self) {
        self.vitals = Vitals::default();
        self.respiratory_mode = None;
        self.clinical_note = None;
    }

    /// Reset buffers and flags after a successful finalize commit.
    ///
    /// Identity and shift context remain; hydration re-seeds them when the
    /// next shift opens.
    pub fn clear_after_finalize(&mut self) {
        self.clear_clinical_buffer();
        self.first_complete_measurement_done = false;
        self.finalization_topics = FinalizationTopics::default();
        self.resume_after = None;
        self.finish_reminder_sent = false;
    }

    /// Compact single-line summary handed to the LLM classifiers.
    #[must_use]
    pub fn compact(&self) -> String {
        format!(
            "shift_allow={} response={:?} schedule_started={} finish_reminder_sent={} \
             first_complete_measurement_done={} vitals_missing={:?} topics_missing={:?}",
            self.shift_allow,
            self.response,
            self.schedule_started,
            self.finish_reminder_sent,
            self.first_complete_measurement_done,
            self.vitals.missing(),
            self.finalization_topics.missing(),
        )
    }
}

/// Canonicalize a phone number: digits only, leading `+` and separators
/// stripped.
#[must_use]
pub fn canonical_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

//! Wire types for the chat-completions API and the typed outputs of the
//! six gateway calls. Every output is schema-validated after the
//! response; a mismatch counts as a malformed reply and is retried.

use serde::{Deserialize, Serialize};

// ── chat-completions wire types ─────────────────────────

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name.
    pub model: String,
    /// Conversation messages, system first.
    pub messages: Vec<ChatMessage>,
    /// Always 0 — classification and extraction must be deterministic.
    pub temperature: f64,
    /// Forces a JSON object reply.
    pub response_format: ResponseFormat,
}

/// One chat message.
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    /// `system` or `user`.
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

/// Response format selector.
#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    /// Always `json_object`.
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; only the first is used.
    pub choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: ChatChoiceMessage,
}

/// Assistant message inside a choice.
#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    /// JSON text content.
    pub content: Option<String>,
}

// ── typed gateway outputs ───────────────────────────────

/// Business flow selected by intent classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Attendance flow.
    Escala,
    /// Clinical measurement flow.
    Clinico,
    /// Operational note flow.
    Operacional,
    /// Shift finalization flow.
    Finalizar,
    /// Help flow.
    Auxiliar,
    /// Classifier could not decide.
    Indefinido,
}

/// Intent classification output.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentResult {
    /// Selected intent.
    pub intent: Intent,
    /// Classifier confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// Confirmation classification output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationVerdict {
    /// Affirmative answer.
    Yes,
    /// Negative answer.
    No,
    /// Explicit cancellation request.
    Cancel,
    /// Neither; the text is not a confirmation answer.
    Unclear,
}

/// Wrapper object the confirmation classifier returns.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationResult {
    /// The verdict.
    pub verdict: ConfirmationVerdict,
}

/// Urgency attached to an operational note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Can wait for the coordination team's routine.
    Low,
    /// Should be seen today.
    Normal,
    /// Needs immediate attention.
    High,
}

/// Operational note detection output.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationalDetect {
    /// Whether the text is operational (supplies, infrastructure,
    /// visitors) rather than clinical.
    pub is_operational: bool,
    /// Urgency when operational.
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
}

fn default_urgency() -> Urgency {
    Urgency::Normal
}

/// Raw clinical extraction output, unvalidated.
///
/// The clinical validator re-enforces ranges and normalization; the
/// model is instructed to null out-of-range values itself and to attach
/// warning codes, but the wrapper never trusts that.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawClinicalExtract {
    /// Blood pressure as written.
    pub pa: Option<String>,
    /// Heart rate.
    pub hr: Option<i64>,
    /// Respiratory rate.
    pub rr: Option<i64>,
    /// Oxygen saturation.
    pub sat_o2: Option<i64>,
    /// Temperature.
    pub temp: Option<f64>,
    /// Respiratory mode descriptor as written.
    pub respiratory_mode: Option<String>,
    /// Free-text clinical note.
    pub clinical_note: Option<String>,
    /// Warning codes attached by the model.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Finalization topic extraction output; absent topics stay null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicExtract {
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

/// Generated reply wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedReply {
    /// Caregiver-facing reply text.
    pub reply: String,
}

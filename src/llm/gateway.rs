//! The six strictly typed LLM calls.
//!
//! Each call pins its model, system prompt and output schema. Prompt
//! wording lives here so the engine only ever sees typed values.

use crate::config::LlmConfig;
use crate::llm::client::ChatClient;
use crate::llm::types::{
    ConfirmationResult, ConfirmationVerdict, GeneratedReply, IntentResult, OperationalDetect,
    RawClinicalExtract, TopicExtract,
};
use crate::models::outcome::OutcomeCode;
use crate::models::session::SessionState;
use crate::Result;

/// Upper bound on a generated reply, in characters.
const MAX_REPLY_CHARS: usize = 600;

const INTENT_SYSTEM: &str = "Você classifica mensagens de cuidadores de um plantão domiciliar. \
Responda APENAS um objeto JSON: {\"intent\": \"escala\"|\"clinico\"|\"operacional\"|\"finalizar\"|\"auxiliar\"|\"indefinido\", \"confidence\": 0.0-1.0}. \
escala = presença/ausência no plantão; clinico = sinais vitais ou evolução do paciente; \
operacional = suprimentos, infraestrutura, visitas; finalizar = encerramento do plantão; \
auxiliar = pedido de ajuda; indefinido = nenhum dos anteriores.";

const CONFIRMATION_SYSTEM: &str = "Você interpreta se a resposta do cuidador confirma ou nega \
uma ação pendente. Responda APENAS um objeto JSON: \
{\"verdict\": \"yes\"|\"no\"|\"cancel\"|\"unclear\"}. \
yes = confirma; no = nega; cancel = pede para cancelar a ação; unclear = não é uma resposta \
de confirmação.";

const OPERATIONAL_SYSTEM: &str = "Você detecta notas operacionais de um plantão domiciliar: \
falta de suprimentos (fralda, luva, medicação acabando), problemas de infraestrutura, visitas \
e ocorrências administrativas. Conteúdo clínico (sinais vitais, sintomas, evolução) NÃO é \
operacional. Responda APENAS um objeto JSON: \
{\"is_operational\": true|false, \"urgency\": \"low\"|\"normal\"|\"high\"}.";

const CLINICAL_SYSTEM: &str = "Você extrai sinais vitais de mensagens em português. Responda \
APENAS um objeto JSON com os campos: pa (\"SSSxDDD\"), hr, rr, sat_o2, temp, \
respiratory_mode (\"ambient\"|\"supplemental_o2\"|\"mechanical_ventilation\"), clinical_note, \
warnings (lista de códigos). Campos ausentes ficam null. Valores fora das faixas de segurança \
(FC 20-220, FR 5-50, SatO2 50-100, Temp 30.0-43.0, PA sistólica 70-260 e diastólica 40-160) \
devem ser null com um código de aviso. PA ambígua no estilo \"12/8\" deve ser null com o \
aviso \"PA_ambigua\". Nunca invente valores.";

const TOPICS_SYSTEM: &str = "Você extrai tópicos do relatório de fim de plantão a partir da \
mensagem do cuidador. Responda APENAS um objeto JSON com os campos: alimentacao, evacuacoes, \
sono, humor, medicacoes, atividades, adicional_clinico, adicional_administrativo. Preencha \
somente o que a mensagem realmente informa; o restante fica null. Nunca invente valores.";

const REPLY_SYSTEM: &str = "Você é o assistente fiscal de plantões domiciliares. Escreva UMA \
resposta curta ao cuidador em português do Brasil, cordial e objetiva, com base no estado da \
sessão e no código de resultado. Nunca peça dados que o estado já possui. Nunca invente \
dados. Se finish_reminder_sent=false, NÃO mencione finalização ou encerramento do plantão. \
Responda APENAS um objeto JSON: {\"reply\": \"...\"}.";

/// Typed facade over the chat-completions client.
#[derive(Clone)]
pub struct LlmGateway {
    client: ChatClient,
    intent_model: String,
    extractor_model: String,
}

impl LlmGateway {
    /// Build the gateway from LLM configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
            intent_model: config.intent_model.clone(),
            extractor_model: config.extractor_model.clone(),
        })
    }

    /// Whether the provider circuit is currently open.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.client.is_open()
    }

    /// Classify the business intent of a caregiver message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn classify_intent(&self, text: &str, compact_state: &str) -> Result<IntentResult> {
        let user = format!("Estado da sessão: {compact_state}\nMensagem: {text}");
        self.client
            .call(&self.intent_model, INTENT_SYSTEM, &user)
            .await
    }

    /// Classify a confirmation answer to a staged action.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn classify_confirmation(&self, text: &str) -> Result<ConfirmationVerdict> {
        let result: ConfirmationResult = self
            .client
            .call(&self.intent_model, CONFIRMATION_SYSTEM, text)
            .await?;
        Ok(result.verdict)
    }

    /// Detect whether a message is an operational note.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn detect_operational_note(&self, text: &str) -> Result<OperationalDetect> {
        self.client
            .call(&self.intent_model, OPERATIONAL_SYSTEM, text)
            .await
    }

    /// Extract clinical fields from free text. The clinical validator
    /// re-enforces every range on the way out.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn extract_clinical(&self, text: &str) -> Result<RawClinicalExtract> {
        self.client
            .call(&self.extractor_model, CLINICAL_SYSTEM, text)
            .await
    }

    /// Extract finalization topics not yet collected.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn extract_finalization_topics(
        &self,
        text: &str,
        already_collected: &[&str],
    ) -> Result<TopicExtract> {
        let user = format!(
            "Tópicos já coletados (ignore-os): {already_collected:?}\nMensagem: {text}"
        );
        self.client
            .call(&self.extractor_model, TOPICS_SYSTEM, &user)
            .await
    }

    /// Generate the single caregiver-facing reply for a turn.
    ///
    /// The reply is length-bounded; the consolidator still applies the
    /// finalization-lexicon guard on top of the prompt instruction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LlmUnavailable` when the provider cannot answer.
    pub async fn generate_reply(
        &self,
        state: &SessionState,
        outcome: OutcomeCode,
        language_hint: &str,
    ) -> Result<String> {
        let user = format!(
            "Idioma: {language_hint}\nEstado: {}\nCódigo de resultado: {}\n\
             Última mensagem do cuidador: {}",
            state.compact(),
            outcome.as_str(),
            state.last_user_text.as_deref().unwrap_or(""),
        );
        let generated: GeneratedReply = self
            .client
            .call(&self.intent_model, REPLY_SYSTEM, &user)
            .await?;

        let mut reply = generated.reply;
        if reply.chars().count() > MAX_REPLY_CHARS {
            reply = reply.chars().take(MAX_REPLY_CHARS).collect();
        }
        Ok(reply)
    }
}

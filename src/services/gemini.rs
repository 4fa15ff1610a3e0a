use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::models::{parse_model_output, GameDescriptor, GenerationError, GenerationResult, PickFormat};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One request to the model, validated against the game's format. Never retried.
    pub async fn generate(
        &self,
        game: &GameDescriptor,
        pick_count: u32,
    ) -> Result<GenerationResult, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(game, pick_count)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        info!("Requesting {} picks for {} from {}", pick_count, game.name, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("Gemini API returned status {}: {}", status, detail);
            return Err(GenerationError::Unreachable(format!("status {}", status)));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;

        let text = first_candidate_text(payload)
            .ok_or_else(|| GenerationError::Unreachable("no response from model".to_string()))?;

        parse_model_output(game, pick_count, &text)
    }
}

fn first_candidate_text(payload: GenerateContentResponse) -> Option<String> {
    payload
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
}

fn response_schema() -> Value {
    let string_array = |description: &str| {
        json!({
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": description
        })
    };

    json!({
        "type": "OBJECT",
        "properties": {
            "generatedNumbers": string_array("Os números gerados ou palpites"),
            "reasoning": { "type": "STRING", "description": "Explicação estatística breve" },
            "hotNumbers": string_array("Números com alta frequência histórica"),
            "coldNumbers": string_array("Números atrasados ou com baixa frequência recente")
        },
        "required": ["generatedNumbers", "reasoning", "hotNumbers", "coldNumbers"]
    })
}

/// Prompt for one suggestion, carrying the formatting rule of `game`.
pub fn build_prompt(game: &GameDescriptor, pick_count: u32) -> String {
    let rule = match game.format {
        PickFormat::LuckyMonth => format!(
            "Gere {} números entre {} e {} e inclua o Mês de Sorte (nome do mês em português) como o último item do array.",
            pick_count, game.min_number, game.max_number
        ),
        PickFormat::Loteca => {
            "Gere uma sequência de 14 palpites, cada um exatamente \"Coluna 1\", \"Empate\" ou \"Coluna 2\".".to_string()
        }
        PickFormat::SuperSete => {
            "Gere 7 números, um para cada coluna, cada um um único dígito de 0 a 9.".to_string()
        }
        PickFormat::Numeric => format!(
            "Gere {} números inteiros distintos entre {} e {}, como strings com {} dígitos (zeros à esquerda).",
            pick_count,
            game.min_number,
            game.max_number,
            game.token_width()
        ),
    };

    format!(
        r#"Atue como um estatístico especialista em loterias brasileiras (Caixa Econômica Federal).

Tarefa: Gerar um palpite para o jogo "{name}" com exatamente {count} escolhas.

Contexto: Analise (simule) os dados históricos dos últimos 10 anos deste jogo específico. Identifique padrões de "números quentes" (que saem muito) e "números frios" (atrasados).

Regra do jogo: {rule}

Saída JSON Obrigatória:
- generatedNumbers: Array de strings com os números ou palpites gerados.
- reasoning: Uma explicação breve (max 2 frases) sobre por que essa combinação foi escolhida.
- hotNumbers: Lista de 3-5 números que estatisticamente têm saído muito neste jogo.
- coldNumbers: Lista de 3-5 números que estão "atrasados"."#,
        name = game.name,
        count = pick_count,
        rule = rule
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_game;

    fn client(key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            key.map(str::to_string),
            DEFAULT_GEMINI_MODEL.to_string(),
            // Nothing listens here; only reached if the key check is skipped
            "http://127.0.0.1:9".to_string(),
        )
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let game = find_game("mega-sena").unwrap();
        for key in [None, Some(""), Some("   ")] {
            let result = client(key).generate(game, 6).await;
            assert!(matches!(result, Err(GenerationError::MissingApiKey)));
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_reported_as_such() {
        let game = find_game("mega-sena").unwrap();
        let result = client(Some("key")).generate(game, 6).await;
        assert!(matches!(result, Err(GenerationError::Unreachable(_))));
    }

    #[test]
    fn prompt_carries_game_rules() {
        let dia = build_prompt(find_game("dia-de-sorte").unwrap(), 7);
        assert!(dia.contains("\"Dia de Sorte\""));
        assert!(dia.contains("Mês de Sorte"));

        let loteca = build_prompt(find_game("loteca").unwrap(), 14);
        assert!(loteca.contains("Empate"));

        let mega = build_prompt(find_game("mega-sena").unwrap(), 9);
        assert!(mega.contains("exatamente 9 escolhas"));
        assert!(mega.contains("entre 1 e 60"));

        let lotomania = build_prompt(find_game("lotomania").unwrap(), 50);
        assert!(lotomania.contains("entre 0 e 99"));
    }

    #[test]
    fn candidate_text_is_extracted() {
        let payload: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(payload).as_deref(), Some("{\"a\":1}"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(first_candidate_text(empty).is_none());
    }
}

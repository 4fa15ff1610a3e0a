use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use super::common::deserialize_u32_from_number_or_string;
use super::games::{GameDescriptor, PickFormat, LOTECA_OUTCOMES, LUCKY_MONTHS};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[validate(length(min = 1, message = "Informe o jogo"))]
    pub game_name: String,
    #[validate(range(min = 1, message = "A quantidade de números deve ser positiva"))]
    #[serde(deserialize_with = "deserialize_u32_from_number_or_string")]
    pub pick_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub generated_numbers: Vec<String>,
    pub reasoning: String,
    pub hot_numbers: Vec<String>,
    pub cold_numbers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key is missing")]
    MissingApiKey,

    #[error("could not reach the analysis service: {0}")]
    Unreachable(String),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Raw shape the model is asked for. Every field is required; anything else
/// in the payload is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeneration {
    generated_numbers: Vec<String>,
    reasoning: String,
    hot_numbers: Vec<String>,
    cold_numbers: Vec<String>,
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => strip_info_string(rest),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Single-line fences keep the info string next to the payload: ```json {...}```
fn strip_info_string(rest: &str) -> &str {
    match rest.get(..4) {
        Some(info) if info.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    }
}

/// Decodes and validates the model's text for `game`/`pick_count`. Fails
/// closed: any deviation from the expected shape is an error.
pub fn parse_model_output(
    game: &GameDescriptor,
    pick_count: u32,
    text: &str,
) -> Result<GenerationResult, GenerationError> {
    let raw: RawGeneration = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {}", e)))?;

    let reasoning = raw.reasoning.trim().to_string();
    if reasoning.is_empty() {
        return Err(GenerationError::Malformed("empty reasoning".to_string()));
    }

    let expected = game.expected_result_len(pick_count);
    if raw.generated_numbers.len() != expected {
        return Err(GenerationError::Malformed(format!(
            "{} expects {} entries, got {}",
            game.name,
            expected,
            raw.generated_numbers.len()
        )));
    }

    let generated_numbers = match game.format {
        PickFormat::Numeric => raw
            .generated_numbers
            .iter()
            .map(|token| normalize_number(game, token))
            .collect::<Result<Vec<_>, _>>()?,
        PickFormat::LuckyMonth => {
            let (month, numbers) = raw
                .generated_numbers
                .split_last()
                .ok_or_else(|| GenerationError::Malformed("missing lucky month".to_string()))?;
            let mut tokens = numbers
                .iter()
                .map(|token| normalize_number(game, token))
                .collect::<Result<Vec<_>, _>>()?;
            tokens.push(normalize_month(month)?);
            tokens
        }
        PickFormat::Loteca => raw
            .generated_numbers
            .iter()
            .map(|token| normalize_outcome(token))
            .collect::<Result<Vec<_>, _>>()?,
        PickFormat::SuperSete => raw
            .generated_numbers
            .iter()
            .map(|token| normalize_digit(token))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(GenerationResult {
        generated_numbers,
        reasoning,
        hot_numbers: trim_all(raw.hot_numbers),
        cold_numbers: trim_all(raw.cold_numbers),
    })
}

fn trim_all(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn normalize_number(game: &GameDescriptor, token: &str) -> Result<String, GenerationError> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(GenerationError::Malformed(format!(
            "'{}' is not a number",
            token
        )));
    }

    let value: u32 = token
        .parse()
        .map_err(|_| GenerationError::Malformed(format!("'{}' is out of range", token)))?;
    if !game.number_range().contains(&value) {
        return Err(GenerationError::Malformed(format!(
            "{} is outside the {} pool ({}..={})",
            value, game.name, game.min_number, game.max_number
        )));
    }

    Ok(format!("{:0width$}", value, width = game.token_width()))
}

fn normalize_digit(token: &str) -> Result<String, GenerationError> {
    let token = token.trim();
    match token.chars().collect::<Vec<_>>().as_slice() {
        [c] if c.is_ascii_digit() => Ok(c.to_string()),
        _ => Err(GenerationError::Malformed(format!(
            "'{}' is not a single digit",
            token
        ))),
    }
}

fn normalize_outcome(token: &str) -> Result<String, GenerationError> {
    let token = token.trim();
    LOTECA_OUTCOMES
        .iter()
        .find(|outcome| outcome.eq_ignore_ascii_case(token))
        .map(|outcome| outcome.to_string())
        .ok_or_else(|| GenerationError::Malformed(format!("'{}' is not a Loteca outcome", token)))
}

fn normalize_month(token: &str) -> Result<String, GenerationError> {
    let token = token.trim();

    if let Ok(n) = token.parse::<usize>() {
        if (1..=12).contains(&n) {
            return Ok(LUCKY_MONTHS[n - 1].to_string());
        }
    }

    let folded = fold_accents(token);
    LUCKY_MONTHS
        .iter()
        .find(|month| fold_accents(month) == folded)
        .map(|month| month.to_string())
        .ok_or_else(|| GenerationError::Malformed(format!("'{}' is not a month", token)))
}

fn fold_accents(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_game;

    const MEGA_RESPONSE: &str = r#"{"generatedNumbers":["01","02","03","04","05","06"],"reasoning":"x","hotNumbers":["10"],"coldNumbers":["20"]}"#;

    #[test]
    fn parses_the_mega_sena_example() {
        let game = find_game("Mega-Sena").unwrap();
        let result = parse_model_output(game, 6, MEGA_RESPONSE).unwrap();
        assert_eq!(result.generated_numbers, vec!["01", "02", "03", "04", "05", "06"]);
        assert_eq!(result.reasoning, "x");
        assert_eq!(result.hot_numbers, vec!["10"]);
        assert_eq!(result.cold_numbers, vec!["20"]);
    }

    #[test]
    fn strips_code_fences_before_parsing() {
        let game = find_game("mega-sena").unwrap();
        let fenced = format!("```json\n{}\n```", MEGA_RESPONSE);
        assert!(parse_model_output(game, 6, &fenced).is_ok());
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn single_line_fences_drop_the_info_string() {
        let game = find_game("mega-sena").unwrap();
        for fenced in [
            format!("```json {}```", MEGA_RESPONSE),
            format!("```JSON{}```", MEGA_RESPONSE),
            format!("```{}```", MEGA_RESPONSE),
        ] {
            let result = parse_model_output(game, 6, &fenced);
            assert!(result.is_ok(), "{} -> {:?}", fenced, result);
        }
    }

    #[test]
    fn pads_numbers_and_rejects_out_of_range() {
        let game = find_game("mega-sena").unwrap();
        let text = r#"{"generatedNumbers":["1","2","3","4","5","60"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        let result = parse_model_output(game, 6, text).unwrap();
        assert_eq!(result.generated_numbers[0], "01");
        assert_eq!(result.generated_numbers[5], "60");

        let text = r#"{"generatedNumbers":["1","2","3","4","5","61"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        assert!(matches!(
            parse_model_output(game, 6, text),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn numbers_must_fall_inside_the_draw() {
        let mega = find_game("mega-sena").unwrap();
        let zero = r#"{"generatedNumbers":["00","02","03","04","05","06"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        assert!(matches!(
            parse_model_output(mega, 6, zero),
            Err(GenerationError::Malformed(_))
        ));

        let lotomania = find_game("lotomania").unwrap();
        let draw = |last: &str| {
            let mut picks: Vec<String> = (0..49).map(|n| n.to_string()).collect();
            picks.push(last.to_string());
            serde_json::json!({
                "generatedNumbers": picks,
                "reasoning": "r",
                "hotNumbers": [],
                "coldNumbers": []
            })
            .to_string()
        };
        let result = parse_model_output(lotomania, 50, &draw("99")).unwrap();
        assert_eq!(result.generated_numbers[0], "00");
        assert_eq!(result.generated_numbers[49], "99");
        assert!(parse_model_output(lotomania, 50, &draw("100")).is_err());

        let federal = find_game("loteria-federal").unwrap();
        let tickets = r#"{"generatedNumbers":["0","12345","99999","00042","5"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        let result = parse_model_output(federal, 5, tickets).unwrap();
        assert_eq!(result.generated_numbers[0], "00000");
        assert_eq!(result.generated_numbers[3], "00042");
    }

    #[test]
    fn wrong_count_is_rejected() {
        let game = find_game("mega-sena").unwrap();
        assert!(parse_model_output(game, 7, MEGA_RESPONSE).is_err());
    }

    #[test]
    fn missing_fields_and_wrong_types_fail_closed() {
        let game = find_game("mega-sena").unwrap();
        let missing = r#"{"generatedNumbers":["01","02","03","04","05","06"],"reasoning":"x","hotNumbers":[]}"#;
        let wrong_type = r#"{"generatedNumbers":[1,2,3,4,5,6],"reasoning":"x","hotNumbers":[],"coldNumbers":[]}"#;
        let empty_reason = r#"{"generatedNumbers":["01","02","03","04","05","06"],"reasoning":"  ","hotNumbers":[],"coldNumbers":[]}"#;
        assert!(parse_model_output(game, 6, missing).is_err());
        assert!(parse_model_output(game, 6, wrong_type).is_err());
        assert!(parse_model_output(game, 6, empty_reason).is_err());
        assert!(parse_model_output(game, 6, "not json at all").is_err());
    }

    #[test]
    fn dia_de_sorte_ends_with_the_lucky_month() {
        let game = find_game("dia-de-sorte").unwrap();
        let text = r#"{"generatedNumbers":["3","7","11","15","19","23","31","marco"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        let result = parse_model_output(game, 7, text).unwrap();
        assert_eq!(result.generated_numbers.len(), 8);
        assert_eq!(result.generated_numbers.last().map(String::as_str), Some("Março"));

        let numeric_month = r#"{"generatedNumbers":["3","7","11","15","19","23","31","12"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        let result = parse_model_output(game, 7, numeric_month).unwrap();
        assert_eq!(result.generated_numbers[7], "Dezembro");

        let no_month = r#"{"generatedNumbers":["3","7","11","15","19","23","31"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        assert!(parse_model_output(game, 7, no_month).is_err());
    }

    #[test]
    fn loteca_returns_fourteen_outcomes() {
        let game = find_game("loteca").unwrap();
        let picks = vec!["coluna 1"; 7]
            .into_iter()
            .chain(vec!["Empate"; 4])
            .chain(vec!["COLUNA 2"; 3])
            .collect::<Vec<_>>();
        let text = serde_json::json!({
            "generatedNumbers": picks,
            "reasoning": "r",
            "hotNumbers": ["Coluna 1"],
            "coldNumbers": ["Empate"]
        })
        .to_string();
        let result = parse_model_output(game, 14, &text).unwrap();
        assert_eq!(result.generated_numbers.len(), 14);
        assert_eq!(result.generated_numbers[0], "Coluna 1");
        assert_eq!(result.generated_numbers[13], "Coluna 2");

        let bad = text.replace("Empate", "Vitória");
        assert!(parse_model_output(game, 14, &bad).is_err());
    }

    #[test]
    fn super_sete_takes_single_digits() {
        let game = find_game("super-sete").unwrap();
        let ok = r#"{"generatedNumbers":["0","1","2","3","4","5","9"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        assert_eq!(parse_model_output(game, 7, ok).unwrap().generated_numbers.len(), 7);

        let two_digits = r#"{"generatedNumbers":["0","1","2","3","4","5","10"],"reasoning":"r","hotNumbers":[],"coldNumbers":[]}"#;
        assert!(parse_model_output(game, 7, two_digits).is_err());
    }

    #[test]
    fn request_accepts_string_pick_counts() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"gameName":"Quina","pickCount":"5"}"#).unwrap();
        assert_eq!(request.pick_count, 5);
        assert!(request.validate().is_ok());

        let zero: GenerationRequest =
            serde_json::from_str(r#"{"gameName":"Quina","pickCount":0}"#).unwrap();
        assert!(zero.validate().is_err());
    }
}

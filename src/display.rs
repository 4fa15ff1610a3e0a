use std::fmt::Write;

use crate::models::{GameDescriptor, GenerationResult, PickFormat};

/// Text rendering of one suggestion: a token per pick, then the rationale
/// and the advisory hot/cold lists.
pub fn render_result(game: &GameDescriptor, result: &GenerationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - Números sugeridos (baseado em 10 anos de histórico)", game.name);

    let tokens: Vec<String> = result
        .generated_numbers
        .iter()
        .map(|token| format!("[{}]", token))
        .collect();
    // Outcome names and tickets do not fit on one row
    let per_row = match game.format {
        PickFormat::Loteca => 1,
        _ if game.token_width() > 3 => 1,
        _ => 10,
    };
    for row in tokens.chunks(per_row) {
        let _ = writeln!(out, "  {}", row.join(" "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Análise: {}", result.reasoning);
    if !result.hot_numbers.is_empty() {
        let _ = writeln!(out, "Quentes: {}", result.hot_numbers.join(", "));
    }
    if !result.cold_numbers.is_empty() {
        let _ = writeln!(out, "Frios: {}", result.cold_numbers.join(", "));
    }
    out
}

pub fn render_catalog(games: &[GameDescriptor]) -> String {
    let mut out = String::new();
    for game in games {
        let picks = if game.is_fixed {
            format!("{} fixos", game.min_picks)
        } else {
            format!("{}-{}", game.min_picks, game.max_picks)
        };
        let _ = writeln!(out, "{:<16} {:<16} {:>8}  {}", game.id, game.name, picks, game.description);
    }
    out
}

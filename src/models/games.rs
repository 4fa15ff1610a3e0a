use std::ops::RangeInclusive;

use serde::Serialize;

/// How the model is expected to format the picks of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickFormat {
    /// Zero-padded numbers inside the game's pool.
    Numeric,
    /// Numbers followed by one "Mês de Sorte" token (Dia de Sorte).
    LuckyMonth,
    /// 14 football outcomes (Loteca).
    Loteca,
    /// One digit per column (Super Sete).
    SuperSete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
    pub contrast_color: &'static str,
    pub min_picks: u32,
    pub max_picks: u32,
    pub total_numbers: u32,
    /// Lowest and highest number the draw can produce.
    pub min_number: u32,
    pub max_number: u32,
    pub is_fixed: bool,
    pub description: &'static str,
    pub format: PickFormat,
}

pub const LOTECA_OUTCOMES: [&str; 3] = ["Coluna 1", "Empate", "Coluna 2"];

pub const LUCKY_MONTHS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

pub static LOTTERY_GAMES: &[GameDescriptor] = &[
    GameDescriptor {
        id: "mega-sena",
        name: "Mega-Sena",
        color: "bg-emerald-600",
        contrast_color: "text-white",
        min_picks: 6,
        max_picks: 15,
        total_numbers: 60,
        min_number: 1,
        max_number: 60,
        is_fixed: false,
        description: "A maior loteria do Brasil. Escolha de 6 a 15 números.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "lotofacil",
        name: "Lotofácil",
        color: "bg-fuchsia-600",
        contrast_color: "text-white",
        min_picks: 15,
        max_picks: 20,
        total_numbers: 25,
        min_number: 1,
        max_number: 25,
        is_fixed: false,
        description: "Mais fácil de ganhar. Escolha entre 15 e 20 números.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "quina",
        name: "Quina",
        color: "bg-blue-700",
        contrast_color: "text-white",
        min_picks: 5,
        max_picks: 15,
        total_numbers: 80,
        min_number: 1,
        max_number: 80,
        is_fixed: false,
        description: "Sorteios diários. Marque de 5 a 15 números.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "lotomania",
        name: "Lotomania",
        color: "bg-orange-500",
        contrast_color: "text-white",
        min_picks: 50,
        max_picks: 50,
        total_numbers: 100,
        min_number: 0,
        max_number: 99,
        is_fixed: true,
        description: "Escolha 50 números para tentar a sorte.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "timemania",
        name: "Timemania",
        color: "bg-yellow-400",
        contrast_color: "text-yellow-900",
        min_picks: 10,
        max_picks: 10,
        total_numbers: 80,
        min_number: 1,
        max_number: 80,
        is_fixed: true,
        description: "Escolha 10 números e um Time do Coração.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "dupla-sena",
        name: "Dupla Sena",
        color: "bg-red-700",
        contrast_color: "text-white",
        min_picks: 6,
        max_picks: 15,
        total_numbers: 50,
        min_number: 1,
        max_number: 50,
        is_fixed: false,
        description: "Duas chances de ganhar com o mesmo jogo.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "dia-de-sorte",
        name: "Dia de Sorte",
        color: "bg-amber-600",
        contrast_color: "text-white",
        min_picks: 7,
        max_picks: 15,
        total_numbers: 31,
        min_number: 1,
        max_number: 31,
        is_fixed: false,
        description: "Seus dias de sorte + 1 Mês de Sorte.",
        format: PickFormat::LuckyMonth,
    },
    GameDescriptor {
        id: "super-sete",
        name: "Super Sete",
        color: "bg-lime-300",
        contrast_color: "text-lime-900",
        min_picks: 7,
        max_picks: 7,
        total_numbers: 9,
        min_number: 0,
        max_number: 9,
        is_fixed: true,
        description: "7 colunas com números de 0 a 9.",
        format: PickFormat::SuperSete,
    },
    GameDescriptor {
        id: "loteria-federal",
        name: "Loteria Federal",
        color: "bg-blue-500",
        contrast_color: "text-white",
        min_picks: 5,
        max_picks: 5,
        total_numbers: 99999,
        min_number: 0,
        max_number: 99999,
        is_fixed: true,
        description: "Bilhetes com 5 algarismos.",
        format: PickFormat::Numeric,
    },
    GameDescriptor {
        id: "loteca",
        name: "Loteca",
        color: "bg-red-500",
        contrast_color: "text-white",
        min_picks: 14,
        max_picks: 14,
        total_numbers: 3,
        min_number: 1,
        max_number: 3,
        is_fixed: true,
        description: "Palpites para 14 jogos de futebol.",
        format: PickFormat::Loteca,
    },
];

/// Look a game up by id ("mega-sena") or display name ("Mega-Sena").
pub fn find_game(key: &str) -> Option<&'static GameDescriptor> {
    let key = key.trim();
    LOTTERY_GAMES
        .iter()
        .find(|g| g.id.eq_ignore_ascii_case(key) || g.name.to_lowercase() == key.to_lowercase())
}

impl GameDescriptor {
    /// Checks a requested pick count against the game bounds.
    pub fn validate_pick_count(&self, pick_count: u32) -> Result<(), String> {
        if self.is_fixed {
            if pick_count != self.min_picks {
                return Err(format!(
                    "{} uses a fixed amount of {} picks",
                    self.name, self.min_picks
                ));
            }
            return Ok(());
        }

        if pick_count < self.min_picks || pick_count > self.max_picks {
            return Err(format!(
                "{} accepts between {} and {} picks, got {}",
                self.name, self.min_picks, self.max_picks, pick_count
            ));
        }

        Ok(())
    }

    /// What the pick-count control would settle on for a requested value.
    pub fn clamp_pick_count(&self, requested: u32) -> u32 {
        if self.is_fixed {
            return self.min_picks;
        }
        requested.clamp(self.min_picks, self.max_picks)
    }

    /// Number of tokens a well-formed result carries for `pick_count`.
    pub fn expected_result_len(&self, pick_count: u32) -> usize {
        match self.format {
            PickFormat::Loteca => 14,
            PickFormat::SuperSete => 7,
            PickFormat::LuckyMonth => pick_count as usize + 1,
            PickFormat::Numeric => pick_count as usize,
        }
    }

    /// Zero-padding width for numeric tokens: two digits at least, more for
    /// pools like Loteria Federal's five-digit tickets.
    pub fn token_width(&self) -> usize {
        match self.format {
            PickFormat::SuperSete => 1,
            _ => self.max_number.to_string().len().max(2),
        }
    }

    pub fn number_range(&self) -> RangeInclusive<u32> {
        self.min_number..=self.max_number
    }
}

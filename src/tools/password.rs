use super::{random_index, shuffle, ToolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 128;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
/// Glyphs that are easy to misread for one another.
const SIMILAR: &str = "il1Lo0O";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordOptions {
    pub length: usize,
    pub include_uppercase: bool,
    pub include_lowercase: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
    pub exclude_similar: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            length: 16,
            include_uppercase: true,
            include_lowercase: true,
            include_numbers: true,
            include_symbols: true,
            exclude_similar: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strength {
    Weak,
    Fair,
    Good,
    Strong,
    #[serde(rename = "Very Strong")]
    VeryStrong,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPassword {
    pub password: String,
    pub length: usize,
    pub strength: Strength,
    pub created_at: DateTime<Utc>,
}

impl PasswordOptions {
    /// Enabled character classes, each already filtered for similar glyphs.
    fn classes(&self) -> Vec<Vec<char>> {
        [
            (self.include_uppercase, UPPERCASE),
            (self.include_lowercase, LOWERCASE),
            (self.include_numbers, NUMBERS),
            (self.include_symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, set)| {
            set.chars()
                .filter(|c| !(self.exclude_similar && SIMILAR.contains(*c)))
                .collect()
        })
        .collect()
    }
}

/// Score 0..=8: one point per length threshold (8, 12, 16, 20) and one per
/// enabled class that actually appears.
pub fn strength(password: &str, options: &PasswordOptions) -> Strength {
    let len = password.chars().count();
    let mut score = [8, 12, 16, 20].iter().filter(|t| len >= **t).count();

    let present = |set: &str| password.chars().any(|c| set.contains(c));
    for (enabled, set) in [
        (options.include_uppercase, UPPERCASE),
        (options.include_lowercase, LOWERCASE),
        (options.include_numbers, NUMBERS),
        (options.include_symbols, SYMBOLS),
    ] {
        if enabled && present(set) {
            score += 1;
        }
    }

    match score {
        0..=2 => Strength::Weak,
        3 => Strength::Fair,
        4 | 5 => Strength::Good,
        6 => Strength::Strong,
        _ => Strength::VeryStrong,
    }
}

/// Generate a password with at least one character from every enabled class.
pub fn generate(options: &PasswordOptions) -> Result<GeneratedPassword, ToolError> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&options.length) {
        return Err(ToolError::invalid(format!(
            "Password length must be between {MIN_LENGTH} and {MAX_LENGTH}"
        )));
    }
    let classes = options.classes();
    if classes.is_empty() {
        return Err(ToolError::invalid(
            "Please select at least one character type",
        ));
    }

    let pool: Vec<char> = classes.iter().flatten().copied().collect();
    let mut chars: Vec<char> = classes
        .iter()
        .map(|class| class[random_index(class.len())])
        .collect();
    while chars.len() < options.length {
        chars.push(pool[random_index(pool.len())]);
    }
    shuffle(&mut chars);

    let password: String = chars.into_iter().collect();
    Ok(GeneratedPassword {
        strength: strength(&password, options),
        length: options.length,
        password,
        created_at: Utc::now(),
    })
}

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use dotwalk_core::seed::WORD_LIST;
use dotwalk_core::{EdgePolicy, encode_code, parse_replay_code};

pub const DEFAULT_SEED: u64 = 1337;

/// Seed metadata resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub code: Option<String>,
    /// Edge policy carried by a replay code.
    pub policy: Option<EdgePolicy>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self {
            seed,
            code: None,
            policy: None,
        }
    }

    #[must_use]
    pub const fn from_replay_code(seed: u64, policy: EdgePolicy, code: String) -> Self {
        Self {
            seed,
            code: Some(code),
            policy: Some(policy),
        }
    }

    /// Replay code for reports; numeric seeds render under the redirect prefix.
    #[must_use]
    pub fn display_code(&self) -> String {
        self.code.clone().unwrap_or_else(|| {
            encode_code(self.policy.unwrap_or_default(), self.seed)
        })
    }

    /// Code for the run offset by `iteration`, e.g. `RW-ORBIT42+2`.
    #[must_use]
    pub fn iteration_code(&self, iteration: usize) -> String {
        match iteration {
            0 => self.display_code(),
            n => format!("{}+{n}", self.display_code()),
        }
    }
}

/// Resolve CLI seed tokens into deduplicated seed metadata.
///
/// Accepts integers (negative values use their magnitude), replay codes such
/// as `RW-ORBIT42`, and `all`, which expands to every replay code. A numeric
/// seed and a code for the same seed and policy collapse into the code.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut resolved = Vec::new();
    let mut expand_all = false;
    for token in tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case("all") {
            expand_all = true;
        } else {
            resolved.push(parse_seed_token(token)?);
        }
    }
    if expand_all {
        resolved.extend(every_replay_seed());
    }

    let mut seen: HashMap<(u64, Option<EdgePolicy>), usize> = HashMap::new();
    let mut unique: Vec<SeedInfo> = Vec::with_capacity(resolved.len());
    for info in resolved {
        match seen.entry((info.seed, info.policy)) {
            Entry::Occupied(slot) => {
                let kept = &mut unique[*slot.get()];
                if kept.code.is_none() && info.code.is_some() {
                    *kept = info;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(unique.len());
                unique.push(info);
            }
        }
    }

    if unique.is_empty() {
        unique.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }
    Ok(unique)
}

fn parse_seed_token(token: &str) -> Result<SeedInfo> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(SeedInfo::from_numeric(value.unsigned_abs()));
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(SeedInfo::from_numeric(value));
    }
    let Some((policy, seed)) = parse_replay_code(token) else {
        bail!("Unrecognized seed token: {token}");
    };
    Ok(SeedInfo::from_replay_code(seed, policy, token.to_uppercase()))
}

/// Every `RW-`/`HT-` code over the word list and two-digit suffixes.
fn every_replay_seed() -> impl Iterator<Item = SeedInfo> {
    WORD_LIST.into_iter().flat_map(|word| {
        (0..100_u8).flat_map(move |nn| {
            ["RW", "HT"].into_iter().filter_map(move |prefix| {
                let code = format!("{prefix}-{word}{nn:02}");
                let (policy, seed) = parse_replay_code(&code)?;
                Some(SeedInfo::from_replay_code(seed, policy, code))
            })
        })
    })
}

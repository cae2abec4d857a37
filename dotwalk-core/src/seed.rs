//! Replay codes: short, typeable stand-ins for walker seeds.
//! Code format: <POLICY>-<WORD><NN>, e.g., RW-ORBIT42, HT-COMET07

use crate::config::EdgePolicy;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

pub const WORD_LIST: [&str; 64] = [
    "ORBIT", "COMET", "DRIFT", "PULSE", "GLIDE", "SWIRL", "EMBER", "PIXEL", "NOVA", "QUARK",
    "RIPPLE", "ECHO", "TIDE", "FLARE", "SPARK", "PRISM", "HALO", "VORTEX", "BEACON", "CINDER",
    "DUNE", "FROST", "GROVE", "HAVEN", "INDIGO", "JADE", "KITE", "LUMEN", "MOTH", "NEBULA",
    "ONYX", "PEBBLE", "QUILL", "RAVEN", "SABLE", "THISTLE", "UMBRA", "VELVET", "WISP", "ZEPHYR",
    "AMBER", "BRISK", "CORAL", "DAPPLE", "EDDY", "FERN", "GLINT", "HUSH", "IVORY", "JOLT",
    "KELP", "LARK", "MIST", "NIMBUS", "OPAL", "PLUME", "QUASAR", "ROVER", "SPIRAL", "TWIRL",
    "UNDINE", "VAPOR", "WANDER", "YONDER",
];

const fn policy_prefix(policy: EdgePolicy) -> &'static str {
    match policy {
        EdgePolicy::Redirect => "RW",
        EdgePolicy::Halt => "HT",
    }
}

fn policy_from_prefix(prefix: &str) -> Option<EdgePolicy> {
    match prefix.to_ascii_uppercase().as_str() {
        "RW" => Some(EdgePolicy::Redirect),
        "HT" => Some(EdgePolicy::Halt),
        _ => None,
    }
}

#[inline]
fn pack(word_index: u16, nn: u8) -> u16 {
    (word_index & 0x01FF) | ((u16::from(nn) & 0x7F) << 9)
}

#[inline]
fn unpack(packed: u16) -> (u16, u8) {
    let nn = u8::try_from((packed >> 9) & 0x7F).unwrap_or(0);
    (packed & 0x01FF, nn)
}

fn compose_seed(policy: EdgePolicy, word_index: u16, nn: u8) -> u64 {
    let packed = pack(word_index, nn);
    let mut buf = Vec::with_capacity(12);
    buf.extend_from_slice(b"DOTWALK-");
    buf.extend_from_slice(policy_prefix(policy).as_bytes());
    buf.extend_from_slice(&packed.to_le_bytes());
    (fnv1a64(&buf) & 0xFFFF_FFFF_FFFF_0000) | u64::from(packed)
}

fn sanitize_word(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Render the low 16 bits of `seed` as a replay code.
#[must_use]
pub fn encode_code(policy: EdgePolicy, seed: u64) -> String {
    let packed = u16::try_from(seed & 0xFFFF).unwrap_or(0);
    let (wi, nn) = unpack(packed);
    let word = WORD_LIST[usize::from(wi) % WORD_LIST.len()];
    format!("{}-{word}{:02}", policy_prefix(policy), nn % 100)
}

/// Parse a replay code back into its edge policy and seed.
#[must_use]
pub fn decode_code(code: &str) -> Option<(EdgePolicy, u64)> {
    let (prefix, rest) = code.trim().split_once('-')?;
    let policy = policy_from_prefix(prefix)?;
    if rest.len() < 3 || !rest.is_char_boundary(rest.len() - 2) {
        return None;
    }
    let (word_part, nn_part) = rest.split_at(rest.len() - 2);
    let nn: u8 = nn_part.parse().ok()?;
    let word = sanitize_word(word_part);
    let idx = WORD_LIST.iter().position(|w| *w == word)?;
    let wi = u16::try_from(idx).ok()?;
    Some((policy, compose_seed(policy, wi, nn)))
}

/// Build a replay code from arbitrary entropy (e.g. a clock reading).
#[must_use]
pub fn code_from_entropy(policy: EdgePolicy, entropy: u64) -> String {
    let wi = u16::try_from(entropy % WORD_LIST.len() as u64).unwrap_or(0);
    let nn = u8::try_from((entropy >> 17) % 100).unwrap_or(0);
    encode_code(policy, compose_seed(policy, wi, nn))
}

/// Parse user input (CLI flag, settings field) as a replay code.
#[must_use]
pub fn parse_replay_code(code: &str) -> Option<(EdgePolicy, u64)> {
    decode_code(code)
}

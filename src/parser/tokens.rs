use crate::models::events::{PlayerIdentity, PlayerToken};

pub const BOT_SENTINEL: &str = "INVALID";
const PLATFORM_PREFIXES: [&str; 3] = ["SteamNWI:", "Steam:", "EOS:"];

/// `SteamNWI:76561198000000001` -> `76561198000000001`.
/// Ids without a known platform prefix, and the bot sentinel, are rejected.
pub fn parse_prefixed_platform_id(net_id: &str) -> Option<&str> {
    let net_id = net_id.trim();
    let id = PLATFORM_PREFIXES
        .iter()
        .find_map(|prefix| net_id.strip_prefix(prefix))?;
    valid_id(id)
}

/// Accepts both prefixed and bare ids, as chat and kill lines print bare ones.
pub fn parse_platform_id(raw: &str) -> Option<&str> {
    parse_prefixed_platform_id(raw).or_else(|| valid_id(raw.trim()))
}

fn valid_id(id: &str) -> Option<&str> {
    let valid = !id.is_empty()
        && id != BOT_SENTINEL
        && id.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(id)
}

/// `Foo Bar (SteamNWI:76561198000000001)`
pub fn parse_identity(s: &str) -> Option<PlayerIdentity> {
    let (name, id) = s.trim().rsplit_once(" (")?;
    let id = id.strip_suffix(')')?;
    let platform_id = parse_prefixed_platform_id(id)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(PlayerIdentity {
        platform_id: platform_id.to_owned(),
        name: name.to_owned(),
    })
}

/// `Name[76561198000000001, team 0]`, `Name[INVALID, team 1]` or `Name[76561198000000001]`.
/// Returns `None` when the token is malformed.
pub fn parse_player_token(s: &str) -> Option<PlayerToken> {
    let s = s.trim();
    let inner_start = s.rfind('[')?;
    let inner = s[inner_start + 1..].strip_suffix(']')?;
    let name = s[..inner_start].trim();

    let (id, team) = match inner.split_once(',') {
        Some((id, team)) => {
            let team = team.trim().strip_prefix("team")?.trim().parse().ok()?;
            (id.trim(), Some(team))
        }
        None => (inner.trim(), None),
    };

    let platform_id = match id {
        BOT_SENTINEL => None,
        id => Some(parse_platform_id(id)?.to_owned()),
    };
    Some(PlayerToken {
        name: name.to_owned(),
        platform_id,
        team,
    })
}

/// Splits on `sep` outside of square brackets.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

//! Boundary to the RCON collaborator. The wire protocol lives outside this crate;
//! here we only send text commands and decode the `listplayers` table.

use crate::parser::tokens::parse_prefixed_platform_id;
use async_trait::async_trait;

pub const LIST_PLAYERS_COMMAND: &str = "listplayers";

#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Sends `command` to the server identified by `server_id` and returns the raw response.
    async fn send_command(&self, server_id: &str, command: &str) -> anyhow::Result<String>;
}

pub fn say_command(message: &str) -> String {
    // the console reads one command per line
    let message = message.replace(['\r', '\n'], " ");
    format!("say {message}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconPlayer {
    pub slot: i32,
    pub name: String,
    pub platform_id: String,
    pub ip: Option<String>,
    pub score: i64,
}

/// Decodes a `listplayers` response:
///
/// ```text
/// ID | Name | NetID | IP | Score |
/// ===========================================
/// 0 | Foo | SteamNWI:76561198000000001 | 10.0.0.2 | 120 |
/// ```
///
/// The header, separator lines and rows without a numeric id, a known platform
/// prefix (bots, role rows) or a numeric score are dropped.
pub fn decode_player_list(response: &str) -> Vec<RconPlayer> {
    response.lines().filter_map(decode_row).collect()
}

fn decode_row(line: &str) -> Option<RconPlayer> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("==") {
        return None;
    }

    let columns: Vec<&str> = line.split('|').map(str::trim).collect();
    if columns.len() < 5 {
        return None;
    }
    let slot = columns[0].parse().ok()?;
    let platform_id = parse_prefixed_platform_id(columns[2])?;
    let ip = Some(columns[3])
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned);
    let score = columns[4].parse().ok()?;
    Some(RconPlayer {
        slot,
        name: columns[1].to_owned(),
        platform_id: platform_id.to_owned(),
        ip,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "ID\t | Name\t\t | NetID\t\t\t | IP\t\t | Score\t\t |\n\
===============================================================================\n\
0\t | Foo Bar\t | SteamNWI:76561198000000001\t | 10.0.0.2\t | 120\t |\n\
1\t | Rifleman\t | INVALID\t |  \t | 0\t |\n\
2\t | Baz\t | EOS:0002a1b2c3d4\t | 10.0.0.3\t | 45\t |\n\
\n";

    #[test]
    fn keeps_only_identified_players() {
        let players = decode_player_list(RESPONSE);
        assert_eq!(
            players,
            vec![
                RconPlayer {
                    slot: 0,
                    name: "Foo Bar".to_owned(),
                    platform_id: "76561198000000001".to_owned(),
                    ip: Some("10.0.0.2".to_owned()),
                    score: 120,
                },
                RconPlayer {
                    slot: 2,
                    name: "Baz".to_owned(),
                    platform_id: "0002a1b2c3d4".to_owned(),
                    ip: Some("10.0.0.3".to_owned()),
                    score: 45,
                },
            ]
        );
    }

    #[test]
    fn rejects_rows_without_numeric_id() {
        let response = "Admin | Foo | SteamNWI:76561198000000001 | 10.0.0.2 | 10 |";
        assert!(decode_player_list(response).is_empty());
        assert!(decode_player_list("").is_empty());
        assert!(decode_player_list("garbage").is_empty());
    }

    #[test]
    fn row_with_unparsable_score_is_dropped() {
        let players = decode_player_list(
            "3 | Foo | Steam:76561198000000001 | 10.0.0.2 | n/a |\n\
             4 | Bar | Steam:76561198000000002 | | 7 |",
        );
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].platform_id, "76561198000000002");
        assert_eq!(players[0].score, 7);
        assert_eq!(players[0].ip, None);
    }

    #[test]
    fn say_is_single_line() {
        assert_eq!(say_command("a\nb"), "say a b");
    }
}

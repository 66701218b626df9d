//! In-process [`StatStore`] with the same upsert semantics as the MySQL repositories.

use crate::common::store::StatStore;
use crate::entities::friendly_fire_incidents::{CreateIncidentArgs, FriendlyFireIncident};
use crate::entities::match_player_stats::{MatchPlayerStat, PlayerTotals, StatDelta};
use crate::entities::match_weapon_stats::MatchWeaponStat;
use crate::entities::matches::{CreateMatchArgs, Match};
use crate::entities::players::Player;
use crate::entities::servers::{Server, UpsertServerArgs};
use crate::models::matches::{MatchStatus, StatStatus};
use crate::models::weapons::WeaponType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type WeaponKey = (i64, i64, String, WeaponType);

#[derive(Default)]
struct Tables {
    next_id: i64,
    servers: HashMap<i64, Server>,
    matches: HashMap<i64, Match>,
    players: HashMap<i64, Player>,
    stats: HashMap<(i64, i64), MatchPlayerStat>,
    weapons: HashMap<WeaponKey, MatchWeaponStat>,
    incidents: Vec<FriendlyFireIncident>,
    failing_writes: usize,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_write(&mut self) -> anyhow::Result<()> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            anyhow::bail!("injected store failure");
        }
        Ok(())
    }

    fn player_id(&self, platform_id: &str) -> Option<i64> {
        self.players
            .values()
            .find(|p| p.platform_id == platform_id)
            .map(|p| p.id)
    }
}

fn accrue_play_time(stat: &mut MatchPlayerStat, at: DateTime<Utc>) {
    if let Some(anchor) = stat.play_time_anchor {
        stat.total_play_time += (at - anchor).num_seconds().max(0);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `count` mutations fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.tables().failing_writes = count;
    }

    pub fn server(&self, external_id: &str) -> Option<Server> {
        self.tables()
            .servers
            .values()
            .find(|s| s.external_id == external_id)
            .cloned()
    }

    /// Every match, in creation order.
    pub fn matches(&self) -> Vec<Match> {
        let mut matches: Vec<Match> = self.tables().matches.values().cloned().collect();
        matches.sort_by_key(|m| m.id);
        matches
    }

    pub fn player(&self, platform_id: &str) -> Option<Player> {
        let tables = self.tables();
        let id = tables.player_id(platform_id)?;
        tables.players.get(&id).cloned()
    }

    pub fn player_count(&self) -> usize {
        self.tables().players.len()
    }

    pub fn player_stat(&self, match_id: i64, platform_id: &str) -> Option<MatchPlayerStat> {
        let tables = self.tables();
        let player_id = tables.player_id(platform_id)?;
        tables.stats.get(&(match_id, player_id)).cloned()
    }

    pub fn weapon_kills(&self, match_id: i64, platform_id: &str, weapon: &str) -> i32 {
        let tables = self.tables();
        let Some(player_id) = tables.player_id(platform_id) else {
            return 0;
        };
        tables
            .weapons
            .values()
            .filter(|w| w.match_id == match_id && w.player_id == player_id && w.weapon == weapon)
            .map(|w| w.kills)
            .sum()
    }

    pub fn weapon_stats(&self) -> Vec<MatchWeaponStat> {
        self.tables().weapons.values().cloned().collect()
    }

    pub fn incidents(&self) -> Vec<FriendlyFireIncident> {
        self.tables().incidents.clone()
    }

    pub fn stat_rows(&self) -> Vec<MatchPlayerStat> {
        let mut rows: Vec<MatchPlayerStat> = self.tables().stats.values().cloned().collect();
        rows.sort_by_key(|s| (s.match_id, s.player_id));
        rows
    }
}

#[async_trait]
impl StatStore for MemoryStore {
    async fn upsert_server(&self, args: &UpsertServerArgs<'_>) -> anyhow::Result<Server> {
        let mut tables = self.tables();
        tables.check_write()?;
        if let Some(server) = tables
            .servers
            .values_mut()
            .find(|s| s.external_id == args.external_id)
        {
            server.name = args.name.to_owned();
            server.log_path = args.log_path.to_owned();
            return Ok(server.clone());
        }
        let server = Server {
            id: tables.next_id(),
            external_id: args.external_id.to_owned(),
            name: args.name.to_owned(),
            log_path: args.log_path.to_owned(),
            log_offset: None,
            log_base: 0,
            log_opened_at: None,
        };
        tables.servers.insert(server.id, server.clone());
        Ok(server)
    }

    async fn save_log_position(
        &self,
        server_id: i64,
        log_base: u64,
        offset: u64,
        opened_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        if let Some(server) = tables.servers.get_mut(&server_id) {
            server.log_base = log_base;
            server.log_offset = Some(offset);
            server.log_opened_at = opened_at;
        }
        Ok(())
    }

    async fn fetch_applied_offset(&self, server_id: i64) -> anyhow::Result<u64> {
        let applied_offset = self
            .tables()
            .matches
            .values()
            .filter(|m| m.server_id == server_id)
            .map(|m| m.applied_offset)
            .max()
            .unwrap_or(0);
        Ok(applied_offset)
    }

    async fn fetch_ongoing_matches(&self, server_id: i64) -> anyhow::Result<Vec<Match>> {
        let mut ongoing: Vec<Match> = self
            .tables()
            .matches
            .values()
            .filter(|m| m.server_id == server_id && m.status == MatchStatus::Ongoing.as_str())
            .cloned()
            .collect();
        ongoing.sort_by_key(|m| (m.started_at, m.id));
        Ok(ongoing)
    }

    async fn create_match(&self, args: &CreateMatchArgs<'_>) -> anyhow::Result<Match> {
        let mut tables = self.tables();
        tables.check_write()?;
        let new_match = Match {
            id: tables.next_id(),
            server_id: args.server_id,
            map: args.map.to_owned(),
            mode: args.mode.to_owned(),
            side: args.side.map(str::to_owned),
            max_players: args.max_players,
            round: 0,
            round_objective: 0,
            winner_team: None,
            status: MatchStatus::Ongoing.as_str().to_owned(),
            started_at: args.started_at,
            ended_at: None,
            applied_offset: args.applied_offset,
        };
        tables.matches.insert(new_match.id, new_match.clone());
        Ok(new_match)
    }

    async fn update_match(&self, m: &Match) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        if let Some(existing) = tables.matches.get_mut(&m.id) {
            existing.round = m.round;
            existing.round_objective = m.round_objective;
            existing.winner_team = m.winner_team;
            existing.status = m.status.clone();
            existing.ended_at = m.ended_at;
            existing.applied_offset = existing.applied_offset.max(m.applied_offset);
        }
        Ok(())
    }

    async fn fetch_player(&self, platform_id: &str) -> anyhow::Result<Option<Player>> {
        Ok(self.player(platform_id))
    }

    async fn fetch_player_by_id(&self, player_id: i64) -> anyhow::Result<Option<Player>> {
        Ok(self.tables().players.get(&player_id).cloned())
    }

    async fn upsert_player(&self, platform_id: &str, name: &str) -> anyhow::Result<Player> {
        let mut tables = self.tables();
        tables.check_write()?;
        let id = match tables.player_id(platform_id) {
            Some(id) => id,
            None => tables.next_id(),
        };
        let player = Player {
            id,
            platform_id: platform_id.to_owned(),
            name: name.to_owned(),
        };
        tables.players.insert(id, player.clone());
        Ok(player)
    }

    async fn fetch_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
    ) -> anyhow::Result<Option<MatchPlayerStat>> {
        Ok(self.tables().stats.get(&(match_id, player_id)).cloned())
    }

    async fn fetch_match_stats(&self, match_id: i64) -> anyhow::Result<Vec<MatchPlayerStat>> {
        let mut stats: Vec<MatchPlayerStat> = self
            .tables()
            .stats
            .values()
            .filter(|s| s.match_id == match_id)
            .cloned()
            .collect();
        stats.sort_by(|a, b| b.score.cmp(&a.score).then(b.kills.cmp(&a.kills)));
        Ok(stats)
    }

    async fn add_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
        delta: &StatDelta,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        let stat = tables
            .stats
            .entry((match_id, player_id))
            .or_insert_with(|| MatchPlayerStat::empty(match_id, player_id));
        if applied_offset <= stat.applied_offset {
            return Ok(());
        }
        stat.applied_offset = applied_offset;
        stat.kills += delta.kills;
        stat.assists += delta.assists;
        stat.deaths += delta.deaths;
        stat.friendly_fire_kills += delta.friendly_fire_kills;
        stat.objectives_captured += delta.objectives_captured;
        stat.objectives_destroyed += delta.objectives_destroyed;
        Ok(())
    }

    async fn mark_connected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        let stat = tables
            .stats
            .entry((match_id, player_id))
            .or_insert_with(|| MatchPlayerStat::empty(match_id, player_id));
        if applied_offset <= stat.applied_offset {
            return Ok(());
        }
        stat.applied_offset = applied_offset;
        stat.session_count += 1;
        stat.is_currently_connected = true;
        stat.status = StatStatus::Ongoing.as_str().to_owned();
        stat.first_joined_at.get_or_insert(at);
        stat.play_time_anchor.get_or_insert(at);
        Ok(())
    }

    async fn mark_disconnected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        if let Some(stat) = tables
            .stats
            .get_mut(&(match_id, player_id))
            .filter(|stat| stat.applied_offset < applied_offset)
        {
            stat.applied_offset = applied_offset;
            accrue_play_time(stat, at);
            stat.play_time_anchor = None;
            stat.is_currently_connected = false;
            stat.status = StatStatus::Disconnected.as_str().to_owned();
            stat.last_left_at = Some(at);
        }
        Ok(())
    }

    async fn close_player_stats(
        &self,
        match_id: i64,
        at: DateTime<Utc>,
        status: StatStatus,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        for stat in tables.stats.values_mut().filter(|s| s.match_id == match_id) {
            accrue_play_time(stat, at);
            if stat.is_currently_connected {
                stat.last_left_at = Some(at);
            }
            stat.is_currently_connected = false;
            stat.play_time_anchor = None;
            stat.status = status.as_str().to_owned();
        }
        Ok(())
    }

    async fn reconcile_score(
        &self,
        match_id: i64,
        player_id: i64,
        score: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut tables = self.tables();
        tables.check_write()?;
        let Some(stat) = tables.stats.get_mut(&(match_id, player_id)) else {
            return Ok(false);
        };
        stat.score = score;
        accrue_play_time(stat, at);
        if let Some(anchor) = stat.play_time_anchor.as_mut() {
            if *anchor <= at {
                *anchor = at;
            }
        }
        Ok(true)
    }

    async fn add_weapon_kill(
        &self,
        match_id: i64,
        player_id: i64,
        weapon: &str,
        weapon_type: WeaponType,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        let key = (match_id, player_id, weapon.to_owned(), weapon_type);
        let stat = tables.weapons.entry(key).or_insert_with(|| MatchWeaponStat {
            match_id,
            player_id,
            weapon: weapon.to_owned(),
            weapon_type: weapon_type.as_str().to_owned(),
            kills: 0,
            applied_offset: 0,
        });
        if applied_offset > stat.applied_offset {
            stat.applied_offset = applied_offset;
            stat.kills += 1;
        }
        Ok(())
    }

    async fn create_friendly_fire_incident(
        &self,
        args: &CreateIncidentArgs<'_>,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables();
        tables.check_write()?;
        if tables
            .incidents
            .iter()
            .any(|i| i.match_id == args.match_id && i.applied_offset == args.applied_offset)
        {
            return Ok(());
        }
        let incident = FriendlyFireIncident {
            id: tables.next_id(),
            match_id: args.match_id,
            server_id: args.server_id,
            attacker_player_id: args.attacker_player_id,
            victim_player_id: args.victim_player_id,
            attacker_team: args.attacker_team,
            victim_team: args.victim_team,
            weapon: args.weapon.to_owned(),
            seconds_into_match: args.seconds_into_match,
            seconds_since_previous: args.seconds_since_previous,
            is_explosive: args.is_explosive,
            is_vehicle: args.is_vehicle,
            map: args.map.to_owned(),
            mode: args.mode.to_owned(),
            occurred_at: args.occurred_at,
            applied_offset: args.applied_offset,
        };
        tables.incidents.push(incident);
        Ok(())
    }

    async fn fetch_player_totals(&self, player_id: i64) -> anyhow::Result<PlayerTotals> {
        let tables = self.tables();
        let totals = tables
            .stats
            .values()
            .filter(|s| s.player_id == player_id)
            .fold(PlayerTotals::default(), |mut totals, s| {
                totals.kills += s.kills as i64;
                totals.deaths += s.deaths as i64;
                totals.assists += s.assists as i64;
                totals.matches += 1;
                totals
            });
        Ok(totals)
    }
}

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use rand::{Rng, seq::IndexedRandom};
use uuid::Uuid;

use crate::state::game::{ConnectionId, Door, Millis, PlayerId, Position, RoomId};

/// Fallback avatar handed out when the configured pool is empty.
const FALLBACK_AVATAR: &str = "Traveller";

/// Connected participant and their per-game progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Stable player identifier.
    pub id: PlayerId,
    /// Connection currently carrying this player.
    pub connection_id: ConnectionId,
    /// Generated display name.
    pub username: String,
    /// Avatar drawn from the configured pool.
    pub character: String,
    /// Room the player was assigned to on connection.
    pub room_id: RoomId,
    /// Accumulated score, never decreases.
    pub score: u32,
    /// Number of rounds answered correctly.
    pub correct_answers: u32,
    /// Last reported map position.
    pub position: Position,
    /// Door currently selected, if any.
    pub current_door: Option<Door>,
    /// When the door selection was last recorded during an answer window.
    pub last_answer_at: Option<Millis>,
    /// Cleared on disconnect; the record itself is retained.
    pub is_connected: bool,
    /// Rounds in which the player crossed a door.
    pub doors_crossed: u32,
    /// Round the player's avatar has reached (`doors_crossed + 1`).
    pub current_round: u32,
    arrival: u64,
}

/// Distribution of a room's players over the rounds their avatars reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
    /// Player count keyed by reached round.
    pub players_per_round: BTreeMap<u32, usize>,
    /// Players in the room.
    pub total_players: usize,
}

/// In-memory repository of every player known to the process.
pub struct PlayerRegistry {
    players: DashMap<PlayerId, Player>,
    by_connection: DashMap<ConnectionId, PlayerId>,
    avatars: Mutex<AvatarPool>,
    arrivals: AtomicU64,
}

impl PlayerRegistry {
    /// Build an empty registry handing out avatars from `avatars`.
    pub fn new(avatars: &[String]) -> Self {
        Self {
            players: DashMap::new(),
            by_connection: DashMap::new(),
            avatars: Mutex::new(AvatarPool::new(avatars.to_vec())),
            arrivals: AtomicU64::new(0),
        }
    }

    /// Create a player for `connection_id` inside `room_id`, with a generated name and avatar.
    pub fn create_player(&self, connection_id: ConnectionId, room_id: RoomId) -> Player {
        let character = self
            .avatars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .assign();

        let player = Player {
            id: Uuid::new_v4(),
            connection_id,
            username: generate_username(),
            character,
            room_id,
            score: 0,
            correct_answers: 0,
            position: Position::default(),
            current_door: None,
            last_answer_at: None,
            is_connected: true,
            doors_crossed: 0,
            current_round: 1,
            arrival: self.arrivals.fetch_add(1, Ordering::Relaxed),
        };

        self.players.insert(player.id, player.clone());
        self.by_connection.insert(connection_id, player.id);
        player
    }

    /// Lookup a player by identifier.
    pub fn get(&self, player_id: &PlayerId) -> Option<Player> {
        self.players.get(player_id).map(|entry| entry.clone())
    }

    /// Lookup the player carried by a connection.
    pub fn get_by_connection(&self, connection_id: &ConnectionId) -> Option<Player> {
        let player_id = *self.by_connection.get(connection_id)?;
        self.get(&player_id)
    }

    /// Store the latest position and door selection.
    pub fn update_player_position(&self, player_id: &PlayerId, position: Position, door: Option<Door>) {
        if let Some(mut player) = self.players.get_mut(player_id) {
            player.position = position;
            player.current_door = door;
        }
    }

    /// Remember when the player's door selection was recorded.
    pub fn record_answer_time(&self, player_id: &PlayerId, at: Millis) {
        if let Some(mut player) = self.players.get_mut(player_id) {
            player.last_answer_at = Some(at);
        }
    }

    /// Forget the door selection and answer time, ahead of a new answer window.
    pub fn reset_round_answer(&self, player_id: &PlayerId) {
        if let Some(mut player) = self.players.get_mut(player_id) {
            player.current_door = None;
            player.last_answer_at = None;
        }
    }

    /// Add `delta` to the score, counting a correct answer when `is_correct`.
    pub fn update_player_score(&self, player_id: &PlayerId, delta: u32, is_correct: bool) {
        if let Some(mut player) = self.players.get_mut(player_id) {
            player.score = player.score.saturating_add(delta);
            if is_correct {
                player.correct_answers += 1;
            }
        }
    }

    /// Count a door crossing and move the avatar to the next round. Returns the updated player.
    pub fn record_door_crossing(&self, player_id: &PlayerId) -> Option<Player> {
        let mut player = self.players.get_mut(player_id)?;
        player.doors_crossed += 1;
        player.current_round = player.doors_crossed + 1;
        Some(player.clone())
    }

    /// Mark the player carried by `connection_id` as disconnected, keeping the record.
    pub fn disconnect_player(&self, connection_id: &ConnectionId) -> Option<Player> {
        let player_id = *self.by_connection.get(connection_id)?;
        let mut player = self.players.get_mut(&player_id)?;
        player.is_connected = false;
        Some(player.clone())
    }

    /// Delete a player and release its avatar.
    pub fn remove_player(&self, player_id: &PlayerId) -> Option<Player> {
        let (_, player) = self.players.remove(player_id)?;
        self.by_connection
            .remove_if(&player.connection_id, |_, id| id == player_id);
        self.avatars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(&player.character);
        Some(player)
    }

    /// Players assigned to `room_id`, in arrival order.
    pub fn players_in_room(&self, room_id: &RoomId) -> Vec<Player> {
        let mut players = self
            .players
            .iter()
            .filter(|entry| entry.room_id == *room_id)
            .map(|entry| entry.clone())
            .collect::<Vec<_>>();
        players.sort_by_key(|player| player.arrival);
        players
    }

    /// Connected players assigned to `room_id`, in arrival order.
    pub fn connected_players_in_room(&self, room_id: &RoomId) -> Vec<Player> {
        self.players_in_room(room_id)
            .into_iter()
            .filter(|player| player.is_connected)
            .collect()
    }

    /// Known players among `ids`, preserving the order of `ids`.
    pub fn players_by_ids(&self, ids: &[PlayerId]) -> Vec<Player> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// How far each player of the room has progressed.
    pub fn round_stats(&self, room_id: &RoomId) -> RoundStats {
        let players = self.players_in_room(room_id);
        let mut players_per_round = BTreeMap::new();
        for player in &players {
            *players_per_round.entry(player.current_round).or_insert(0) += 1;
        }
        RoundStats {
            players_per_round,
            total_players: players.len(),
        }
    }

    /// Number of players known to the registry, connected or not.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when no player is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

fn generate_username() -> String {
    let suffix = rand::rng().random_range(0..10_000);
    format!("Player_{suffix}")
}

/// Rotating pool of named characters.
///
/// Picks randomly among names not in use; once every name is taken the in-use set is
/// reset, so avatars are only unique until the pool wraps.
struct AvatarPool {
    names: Vec<String>,
    in_use: HashSet<String>,
}

impl AvatarPool {
    fn new(names: Vec<String>) -> Self {
        Self {
            names,
            in_use: HashSet::new(),
        }
    }

    fn assign(&mut self) -> String {
        if self.names.is_empty() {
            return FALLBACK_AVATAR.to_string();
        }
        if self.in_use.len() >= self.names.len() {
            self.in_use.clear();
        }

        let available = self
            .names
            .iter()
            .filter(|name| !self.in_use.contains(*name))
            .collect::<Vec<_>>();
        let picked = available
            .choose(&mut rand::rng())
            .map(|name| (*name).clone())
            .unwrap_or_else(|| FALLBACK_AVATAR.to_string());

        self.in_use.insert(picked.clone());
        picked
    }

    fn release(&mut self, name: &str) {
        self.in_use.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(pool: &[&str]) -> PlayerRegistry {
        let names = pool.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        PlayerRegistry::new(&names)
    }

    #[test]
    fn created_player_is_reachable_by_connection() {
        let players = registry(&["Genie"]);
        let connection = Uuid::new_v4();
        let room = Uuid::new_v4();

        let player = players.create_player(connection, room);

        assert!(player.username.starts_with("Player_"));
        assert_eq!(player.character, "Genie");
        assert_eq!(players.get_by_connection(&connection), Some(player.clone()));
        assert_eq!(players.players_in_room(&room), vec![player]);
    }

    #[test]
    fn avatars_are_unique_until_pool_wraps() {
        let players = registry(&["Aladdin", "Sinbad", "Genie"]);
        let room = Uuid::new_v4();

        let first_three = (0..3)
            .map(|_| players.create_player(Uuid::new_v4(), room).character)
            .collect::<HashSet<_>>();
        assert_eq!(first_three.len(), 3);

        let fourth = players.create_player(Uuid::new_v4(), room).character;
        assert!(first_three.contains(&fourth));
    }

    #[test]
    fn removing_a_player_releases_its_avatar() {
        let players = registry(&["Aladdin", "Sinbad"]);
        let room = Uuid::new_v4();
        let first = players.create_player(Uuid::new_v4(), room);
        players.remove_player(&first.id);

        let second = players.create_player(Uuid::new_v4(), room);
        let third = players.create_player(Uuid::new_v4(), room);
        assert_ne!(second.character, third.character);
        assert!(players.get(&first.id).is_none());
        assert!(players.get_by_connection(&first.connection_id).is_none());
    }

    #[test]
    fn disconnect_keeps_the_record() {
        let players = registry(&["Genie"]);
        let connection = Uuid::new_v4();
        let room = Uuid::new_v4();
        let player = players.create_player(connection, room);

        let disconnected = players.disconnect_player(&connection).unwrap();

        assert!(!disconnected.is_connected);
        assert_eq!(players.get(&player.id).map(|p| p.is_connected), Some(false));
        assert_eq!(players.players_in_room(&room).len(), 1);
        assert!(players.connected_players_in_room(&room).is_empty());
        assert!(players.disconnect_player(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn score_only_counts_correct_answers() {
        let players = registry(&["Genie"]);
        let player = players.create_player(Uuid::new_v4(), Uuid::new_v4());

        players.update_player_score(&player.id, 140, true);
        players.update_player_score(&player.id, 0, false);

        let player = players.get(&player.id).unwrap();
        assert_eq!(player.score, 140);
        assert_eq!(player.correct_answers, 1);
    }

    #[test]
    fn unknown_players_are_ignored() {
        let players = registry(&["Genie"]);
        let ghost = Uuid::new_v4();

        players.update_player_score(&ghost, 100, true);
        players.record_answer_time(&ghost, 10);
        players.update_player_position(&ghost, Position::default(), Some(Door::A));

        assert!(players.record_door_crossing(&ghost).is_none());
        assert!(players.remove_player(&ghost).is_none());
        assert!(players.is_empty());
    }

    #[test]
    fn round_stats_group_players_by_reached_round() {
        let players = registry(&["Genie"]);
        let room = Uuid::new_v4();
        let fast = players.create_player(Uuid::new_v4(), room);
        players.create_player(Uuid::new_v4(), room);
        players.create_player(Uuid::new_v4(), Uuid::new_v4());

        players.record_door_crossing(&fast.id);
        let stats = players.round_stats(&room);

        assert_eq!(stats.total_players, 2);
        assert_eq!(stats.players_per_round.get(&1), Some(&1));
        assert_eq!(stats.players_per_round.get(&2), Some(&1));
    }

    #[test]
    fn players_by_ids_preserves_order() {
        let players = registry(&["Genie"]);
        let room = Uuid::new_v4();
        let a = players.create_player(Uuid::new_v4(), room);
        let b = players.create_player(Uuid::new_v4(), room);

        let ordered = players.players_by_ids(&[b.id, Uuid::new_v4(), a.id]);
        assert_eq!(
            ordered.into_iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );
    }
}

use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::RoomSettings,
    state::game::{GameId, PlayerId, RoomId},
};

/// Lobby container grouping players; hosts at most one game.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Members in arrival order.
    pub player_ids: Vec<PlayerId>,
    /// Members required to start.
    pub min_players: usize,
    /// Membership cap.
    pub max_players: usize,
    /// Set exactly once when the game starts.
    pub is_game_started: bool,
    /// Game hosted by this room once started.
    pub game_id: Option<GameId>,
    /// Creation instant, used to age empty rooms.
    pub created_at: Instant,
}

impl Room {
    /// Whether the room accepts new members.
    pub fn is_open(&self) -> bool {
        !self.is_game_started && self.player_ids.len() < self.max_players
    }

    /// Whether the room reached its membership cap.
    pub fn is_full(&self) -> bool {
        self.player_ids.len() >= self.max_players
    }
}

/// In-memory repository of rooms, with auto-assignment of arriving players.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    auto_assign: Mutex<Option<RoomId>>,
    settings: RoomSettings,
}

impl RoomRegistry {
    /// Build an empty registry creating rooms with the given capacity bounds.
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            rooms: DashMap::new(),
            auto_assign: Mutex::new(None),
            settings,
        }
    }

    /// Allocate an empty room with the configured capacity bounds.
    pub fn create_room(&self) -> Room {
        let room = Room {
            id: Uuid::new_v4(),
            player_ids: Vec::new(),
            min_players: self.settings.min_players,
            max_players: self.settings.max_players,
            is_game_started: false,
            game_id: None,
            created_at: Instant::now(),
        };
        self.rooms.insert(room.id, room.clone());
        info!(room_id = %room.id, "room created");
        room
    }

    /// Return the room new players should join, creating one when none is open.
    ///
    /// The cached auto-assign target is preferred while it stays open; otherwise any open
    /// room is picked, and the choice becomes the new target.
    pub fn find_or_create_available_room(&self) -> Room {
        let mut target = self
            .auto_assign
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(room) = target
            .and_then(|room_id| self.get(&room_id))
            .filter(Room::is_open)
        {
            return room;
        }

        let open = self
            .rooms
            .iter()
            .find(|entry| entry.is_open())
            .map(|entry| entry.clone());
        let room = open.unwrap_or_else(|| self.create_room());
        *target = Some(room.id);
        room
    }

    /// Append `player_id` to the room. Idempotent; false when the room is unknown or full.
    pub fn add_player_to_room(&self, room_id: &RoomId, player_id: PlayerId) -> bool {
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if room.player_ids.contains(&player_id) {
            return true;
        }
        if room.is_full() {
            debug!(room_id = %room_id, "room full; rejecting player");
            return false;
        }
        room.player_ids.push(player_id);
        true
    }

    /// True when the room has enough members and has not started yet.
    pub fn can_start_game(&self, room_id: &RoomId) -> bool {
        self.rooms.get(room_id).is_some_and(|room| {
            room.player_ids.len() >= room.min_players && !room.is_game_started
        })
    }

    /// Flag the room as started. Returns false when unknown or already started.
    ///
    /// When the room was the auto-assign target the cache is cleared so new arrivals are
    /// routed elsewhere.
    pub fn start_game(&self, room_id: &RoomId) -> bool {
        let mut target = self
            .auto_assign
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if room.is_game_started {
            return false;
        }
        room.is_game_started = true;

        if *target == Some(*room_id) {
            target.take();
        }
        true
    }

    /// Record the game hosted by a started room.
    pub fn attach_game(&self, room_id: &RoomId, game_id: GameId) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.game_id = Some(game_id);
        }
    }

    /// Reclaim empty rooms older than the configured TTL. Returns how many were removed.
    pub fn cleanup_empty_rooms(&self) -> usize {
        self.cleanup_empty_rooms_older_than(self.settings.empty_room_ttl())
    }

    /// Reclaim empty rooms older than `ttl`. Returns how many were removed.
    pub fn cleanup_empty_rooms_older_than(&self, ttl: Duration) -> usize {
        let stale = self
            .rooms
            .iter()
            .filter(|entry| entry.player_ids.is_empty() && entry.created_at.elapsed() > ttl)
            .map(|entry| entry.id)
            .collect::<Vec<_>>();

        for room_id in &stale {
            self.delete_room(room_id);
        }
        stale.len()
    }

    /// Lookup a room by identifier.
    pub fn get(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.get(room_id).map(|entry| entry.clone())
    }

    /// Rooms that have at least one member.
    pub fn active_rooms(&self) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|entry| !entry.player_ids.is_empty())
            .map(|entry| entry.clone())
            .collect()
    }

    /// Number of rooms tracked.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// True when no room is tracked.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn delete_room(&self, room_id: &RoomId) {
        let mut target = self
            .auto_assign
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.rooms.remove(room_id).is_some() {
            info!(room_id = %room_id, "room reclaimed");
        }
        if *target == Some(*room_id) {
            target.take();
        }
    }
}

//! In-memory room store with phase-deadline scheduling.
//!
//! Rooms live in a `DashMap`; the per-entry shard lock is the room's
//! exclusive/shared lock, so every mutation through `get_mut` is serialized
//! per room while distinct rooms proceed in parallel.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::{Ref, RefMut};
use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use parlor_core::{Player, Room, RoomStatus};

/// Room codes avoid glyphs that read ambiguously on a phone screen
/// (0/O, 1/I/L).
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 32;

/// Finished rooms linger for an hour so players can review the reveal.
const FINISHED_TTL: Duration = Duration::hours(1);
/// Rooms with nobody connected survive for a day before cleanup.
const ABANDONED_TTL: Duration = Duration::hours(24);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room not found")]
    RoomNotFound,

    #[error("could not allocate an unused room code")]
    CodeSpaceExhausted,
}

/// Generate a random room code from the unambiguous charset.
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Single-process room store.
pub struct MemoryStore {
    rooms: DashMap<String, Room>,
    timers: Mutex<TimerQueue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            timers: Mutex::new(TimerQueue::default()),
        }
    }

    fn timers(&self) -> MutexGuard<'_, TimerQueue> {
        // The queue tolerates a poisoned lock: lazy deletion skips any
        // entry whose generation no longer matches.
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a room under a freshly generated code, retrying on the
    /// (unlikely) collision with an existing room.
    pub fn create_room(
        &self,
        game_type: &str,
        host: Player,
        max_players: usize,
    ) -> Result<String, StoreError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_room_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(Room::new(&code, game_type, host.clone(), max_players));
                    return Ok(code);
                }
            }
        }
        Err(StoreError::CodeSpaceExhausted)
    }

    /// Shared access to a room.
    pub fn get(&self, room_code: &str) -> Result<Ref<'_, String, Room>, StoreError> {
        self.rooms.get(room_code).ok_or(StoreError::RoomNotFound)
    }

    /// Exclusive access to a room. Holding the guard blocks every other
    /// access to this room; drop it before broadcasting.
    pub fn get_mut(&self, room_code: &str) -> Result<RefMut<'_, String, Room>, StoreError> {
        self.rooms.get_mut(room_code).ok_or(StoreError::RoomNotFound)
    }

    pub fn delete_room(&self, room_code: &str) -> Result<(), StoreError> {
        self.rooms
            .remove(room_code)
            .ok_or(StoreError::RoomNotFound)?;
        self.timers().disarm(room_code);
        Ok(())
    }

    pub fn list_codes(&self) -> Vec<String> {
        self.rooms.iter().map(|room| room.key().clone()).collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Delete rooms that are finished or abandoned. Returns how many were
    /// removed.
    pub fn cleanup_stale_rooms(&self, now: OffsetDateTime) -> usize {
        let mut to_delete = Vec::new();

        for room in self.rooms.iter() {
            let (status, created_at, any_connected) = room.cleanup_info();

            if status == RoomStatus::Finished && now - created_at > FINISHED_TTL {
                to_delete.push(room.key().clone());
            } else if !any_connected && now - created_at > ABANDONED_TTL {
                to_delete.push(room.key().clone());
            }
        }

        let mut removed = 0;
        for code in to_delete {
            if self.delete_room(&code).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Schedule (or cancel, with `None`) the room's next phase deadline.
    pub fn update_room_timer(
        &self,
        room_code: &str,
        deadline: Option<OffsetDateTime>,
    ) -> Result<(), StoreError> {
        if !self.rooms.contains_key(room_code) {
            return Err(StoreError::RoomNotFound);
        }

        let mut timers = self.timers();
        match deadline {
            Some(deadline) => timers.arm(room_code, deadline),
            None => timers.disarm(room_code),
        }
        Ok(())
    }

    /// Room codes whose phase deadline has elapsed, soonest first. Popped
    /// rooms are unscheduled; the caller re-arms after the timeout check.
    pub fn pop_expired_rooms(&self, now: OffsetDateTime) -> Vec<String> {
        self.timers().pop_expired(now)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadline queue with lazy deletion. `BinaryHeap` has no random removal,
/// so re-arming pushes a fresh entry under a new generation and stale
/// entries are discarded when they surface.
#[derive(Default)]
struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    generations: HashMap<String, u64>,
    next_generation: u64,
}

#[derive(PartialEq, Eq)]
struct TimerEntry {
    deadline: OffsetDateTime,
    generation: u64,
    room_code: String,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.generation.cmp(&other.generation))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TimerQueue {
    fn arm(&mut self, room_code: &str, deadline: OffsetDateTime) {
        self.next_generation += 1;
        self.generations
            .insert(room_code.to_string(), self.next_generation);
        self.heap.push(Reverse(TimerEntry {
            deadline,
            generation: self.next_generation,
            room_code: room_code.to_string(),
        }));
    }

    fn disarm(&mut self, room_code: &str) {
        self.generations.remove(room_code);
    }

    fn pop_expired(&mut self, now: OffsetDateTime) -> Vec<String> {
        let mut expired = Vec::new();

        while let Some(Reverse(entry)) = self.heap.pop() {
            let live = self.generations.get(&entry.room_code) == Some(&entry.generation);
            if !live {
                continue;
            }
            if entry.deadline > now {
                // Not due yet; put it back and stop.
                self.heap.push(Reverse(entry));
                break;
            }
            self.generations.remove(&entry.room_code);
            expired.push(entry.room_code);
        }

        expired
    }
}

//! The authoritative world: rooms, exits, characters and items.
//!
//! `World` is plain data plus mutators. Every mutator checks all of its
//! preconditions before touching anything, so a call either applies fully or
//! returns an error with the world unchanged. The server keeps exactly one
//! `World` behind a lock; nothing here does I/O apart from loading data.

use crate::error::{EntityKind, GameError, LoginError, WorldError};
use crate::ids::{CharacterId, ItemId, RoomId, SessionId};
use log::{debug, info};
use serde::Deserialize;
use shared::{validate_name, MAX_HEALTH};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

const DEFAULT_WORLD: &str = include_str!("../data/world.json");

/// On-disk world description.
#[derive(Debug, Deserialize)]
pub struct WorldData {
    pub start: RoomId,
    pub rooms: Vec<RoomData>,
}

#[derive(Debug, Deserialize)]
pub struct RoomData {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: BTreeMap<String, RoomId>,
    #[serde(default)]
    pub items: Vec<ItemData>,
}

#[derive(Debug, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Scenery that can be looked at but not picked up.
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    description: String,
    exits: BTreeMap<String, RoomId>,
    occupants: BTreeSet<CharacterId>,
    items: BTreeSet<ItemId>,
}

impl Room {
    /// Key used by exits and the data file to refer to this room
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Display name shown as the first line of a description
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// All exits, keyed by lowercase exit name
    pub fn exits(&self) -> &BTreeMap<String, RoomId> {
        &self.exits
    }

    /// Looks up an exit by its lowercase name
    pub fn exit(&self, name: &str) -> Option<&RoomId> {
        self.exits.get(name)
    }

    /// Characters standing in this room, in id order
    ///
    /// Sleeping characters are included; filter on
    /// [`Character::is_connected`] when only awake players matter.
    pub fn occupants(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.occupants.iter().copied()
    }

    /// Items lying on the floor, in id order
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }
}

#[derive(Debug)]
pub struct Character {
    id: CharacterId,
    name: String,
    room: RoomId,
    inventory: BTreeSet<ItemId>,
    health: u32,
    max_health: u32,
    session: Option<SessionId>,
}

impl Character {
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// Capitalised display name, unique ignoring case
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The room this character is listed in
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Carried items, in id order
    pub fn inventory(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.inventory.iter().copied()
    }

    /// Current health, between 0 and [`Character::max_health`]
    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    /// The session playing this character
    ///
    /// None for a lingering character whose player has disconnected.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// True while a session is attached to this character.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLocation {
    Room(RoomId),
    Carried(CharacterId),
}

#[derive(Debug)]
pub struct Item {
    id: ItemId,
    name: String,
    description: String,
    fixed: bool,
    location: ItemLocation,
}

impl Item {
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Name players use to refer to the item, matched ignoring case
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text shown by `look <item>`
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scenery such as the fireplace: visible but never carried
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Where the item is: exactly one room floor or one inventory
    pub fn location(&self) -> &ItemLocation {
        &self.location
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub from: RoomId,
    pub to: RoomId,
}

/// Result of binding a session to a character by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Login {
    pub character: CharacterId,
    /// True when an existing, detached character was picked back up.
    pub resumed: bool,
}

#[derive(Debug)]
pub struct World {
    rooms: HashMap<RoomId, Room>,
    characters: HashMap<CharacterId, Character>,
    items: HashMap<ItemId, Item>,
    start_room: RoomId,
    next_character_id: u32,
    next_item_id: u32,
}

impl World {
    /// Builds a world from parsed data, rejecting dangling exits.
    pub fn from_data(data: WorldData) -> Result<Self, WorldError> {
        if data.rooms.is_empty() {
            return Err(WorldError::Empty);
        }

        let mut world = World {
            rooms: HashMap::new(),
            characters: HashMap::new(),
            items: HashMap::new(),
            start_room: data.start,
            next_character_id: 1,
            next_item_id: 1,
        };

        let mut item_data = Vec::new();
        for room in data.rooms {
            if world.rooms.contains_key(&room.id) {
                return Err(WorldError::DuplicateRoom(room.id));
            }
            item_data.push((room.id.clone(), room.items));
            // Players type exits in any case; the parser hands us lowercase
            let exits = room
                .exits
                .into_iter()
                .map(|(exit, target)| (exit.to_lowercase(), target))
                .collect();
            world.rooms.insert(
                room.id.clone(),
                Room {
                    id: room.id,
                    name: room.name,
                    description: room.description,
                    exits,
                    occupants: BTreeSet::new(),
                    items: BTreeSet::new(),
                },
            );
        }

        if !world.rooms.contains_key(&world.start_room) {
            return Err(WorldError::MissingStartRoom(world.start_room));
        }

        for room in world.rooms.values() {
            for (exit, target) in &room.exits {
                if !world.rooms.contains_key(target) {
                    return Err(WorldError::DanglingExit {
                        room: room.id.clone(),
                        exit: exit.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        for (room_id, items) in item_data {
            for data in items {
                let id = ItemId(world.next_item_id);
                world.next_item_id += 1;
                world.items.insert(
                    id,
                    Item {
                        id,
                        description: data
                            .description
                            .unwrap_or_else(|| format!("It's just a {}.", data.name)),
                        name: data.name,
                        fixed: data.fixed,
                        location: ItemLocation::Room(room_id.clone()),
                    },
                );
                if let Some(room) = world.rooms.get_mut(&room_id) {
                    room.items.insert(id);
                }
            }
        }

        info!(
            "World loaded: {} rooms, {} items, start room '{}'",
            world.rooms.len(),
            world.items.len(),
            world.start_room
        );
        Ok(world)
    }

    /// Parses and validates a world from JSON text.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let data: WorldData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    /// Reads a JSON world file from disk.
    ///
    /// A missing or unreadable file is reported as [`WorldError::Io`] with
    /// the offending path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The world compiled into the binary.
    pub fn default_world() -> Result<Self, WorldError> {
        Self::from_json(DEFAULT_WORLD)
    }

    /// Where new and knocked-out characters appear
    pub fn start_room(&self) -> &RoomId {
        &self.start_room
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    fn get_room(&self, id: &RoomId) -> Result<&Room, GameError> {
        self.rooms
            .get(id)
            .ok_or_else(|| GameError::not_found(EntityKind::Room, id))
    }

    fn get_character(&self, id: CharacterId) -> Result<&Character, GameError> {
        self.characters
            .get(&id)
            .ok_or_else(|| GameError::not_found(EntityKind::Player, id))
    }

    fn get_character_mut(&mut self, id: CharacterId) -> Result<&mut Character, GameError> {
        self.characters
            .get_mut(&id)
            .ok_or_else(|| GameError::not_found(EntityKind::Player, id))
    }

    /// Characters in `room`, or `NotFound` for an unknown room.
    pub fn occupants(&self, room: &RoomId) -> Result<Vec<CharacterId>, GameError> {
        Ok(self.get_room(room)?.occupants().collect())
    }

    /// Items on the floor of `room`.
    pub fn room_items(&self, room: &RoomId) -> Result<Vec<ItemId>, GameError> {
        Ok(self.get_room(room)?.items().collect())
    }

    pub fn inventory(&self, who: CharacterId) -> Result<Vec<ItemId>, GameError> {
        Ok(self.get_character(who)?.inventory().collect())
    }

    /// Case-insensitive lookup of any character, connected or not.
    pub fn find_character(&self, name: &str) -> Option<CharacterId> {
        self.characters
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
    }

    /// Characters with an attached session, ordered by id.
    pub fn connected_characters(&self) -> Vec<CharacterId> {
        let mut ids: Vec<CharacterId> = self
            .characters
            .values()
            .filter(|c| c.is_connected())
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    /// Case-insensitive item lookup on a room's floor.
    pub fn find_item_in_room(&self, room: &RoomId, name: &str) -> Option<ItemId> {
        let room = self.rooms.get(room)?;
        self.find_item(room.items(), name)
    }

    pub fn find_item_carried(&self, who: CharacterId, name: &str) -> Option<ItemId> {
        let character = self.characters.get(&who)?;
        self.find_item(character.inventory(), name)
    }

    fn find_item(&self, mut ids: impl Iterator<Item = ItemId>, name: &str) -> Option<ItemId> {
        ids.find(|id| {
            self.items
                .get(id)
                .is_some_and(|item| item.name.eq_ignore_ascii_case(name))
        })
    }

    /// Creates a character in the start room bound to `session`.
    pub fn spawn_character(
        &mut self,
        name: &str,
        session: SessionId,
    ) -> Result<CharacterId, LoginError> {
        if self.find_character(name).is_some() {
            return Err(LoginError::NameTaken);
        }

        let id = CharacterId(self.next_character_id);
        self.next_character_id += 1;

        let start = self.start_room.clone();
        if let Some(room) = self.rooms.get_mut(&start) {
            room.occupants.insert(id);
        }
        self.characters.insert(
            id,
            Character {
                id,
                name: name.to_string(),
                room: start,
                inventory: BTreeSet::new(),
                health: MAX_HEALTH,
                max_health: MAX_HEALTH,
                session: Some(session),
            },
        );

        info!("Spawned {} '{}' for {}", id, name, session);
        Ok(id)
    }

    /// Binds `session` to the character called `name`, creating it if needed.
    ///
    /// The raw name is validated and capitalised first. A detached character
    /// with that name is resumed; one that still has a session attached
    /// refuses the login.
    pub fn login(&mut self, raw: &str, session: SessionId) -> Result<Login, LoginError> {
        let name = validate_name(raw)?;
        match self.find_character(&name) {
            Some(id) => {
                let character = self
                    .characters
                    .get_mut(&id)
                    .ok_or(LoginError::NameTaken)?;
                if character.session.is_some() {
                    return Err(LoginError::NameTaken);
                }
                character.session = Some(session);
                info!("{} '{}' resumed by {}", id, character.name, session);
                Ok(Login {
                    character: id,
                    resumed: true,
                })
            }
            None => Ok(Login {
                character: self.spawn_character(&name, session)?,
                resumed: false,
            }),
        }
    }

    /// Unbinds the character's session, leaving it in the world.
    pub fn detach_session(&mut self, who: CharacterId) -> Result<Option<SessionId>, GameError> {
        Ok(self.get_character_mut(who)?.session.take())
    }

    /// Removes a character. Whatever it carried is left in its room.
    pub fn remove_character(&mut self, who: CharacterId) -> Result<(), GameError> {
        let character = self
            .characters
            .remove(&who)
            .ok_or_else(|| GameError::not_found(EntityKind::Player, who))?;

        if let Some(room) = self.rooms.get_mut(&character.room) {
            room.occupants.remove(&who);
            for item_id in &character.inventory {
                room.items.insert(*item_id);
                if let Some(item) = self.items.get_mut(item_id) {
                    item.location = ItemLocation::Room(character.room.clone());
                }
            }
        }

        info!("Removed {} '{}'", who, character.name);
        Ok(())
    }

    /// Follows the exit called `exit` out of the character's current room.
    pub fn move_character(&mut self, who: CharacterId, exit: &str) -> Result<Movement, GameError> {
        let exit = exit.to_lowercase();
        let current = self.get_character(who)?.room.clone();
        let target = self
            .get_room(&current)?
            .exit(&exit)
            .cloned()
            .ok_or_else(|| GameError::InvalidDirection(exit.clone()))?;

        let from = self.relocate(who, &target)?;
        debug!("{} moved {} -> {} via '{}'", who, from, target, exit);
        Ok(Movement { from, to: target })
    }

    /// Moves a character to `to`, keeping both occupant sets and the
    /// character's room field in step. Returns the room it left.
    fn relocate(&mut self, who: CharacterId, to: &RoomId) -> Result<RoomId, GameError> {
        let from = self.get_character(who)?.room.clone();
        self.get_room(to)?;

        if from == *to {
            return Ok(from);
        }

        if let Some(room) = self.rooms.get_mut(&from) {
            room.occupants.remove(&who);
        }
        if let Some(room) = self.rooms.get_mut(to) {
            room.occupants.insert(who);
        }
        if let Some(character) = self.characters.get_mut(&who) {
            character.room = to.clone();
        }
        Ok(from)
    }

    /// Moves an item from the character's room into its inventory.
    pub fn take_item(&mut self, who: CharacterId, name: &str) -> Result<ItemId, GameError> {
        let room_id = self.get_character(who)?.room.clone();
        let item_id = self
            .find_item_in_room(&room_id, name)
            .ok_or_else(|| GameError::not_found(EntityKind::Item, name))?;

        if let Some(item) = self.items.get(&item_id).filter(|item| item.fixed) {
            return Err(GameError::Refused(format!("The {} won't budge.", item.name)));
        }

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.items.remove(&item_id);
        }
        if let Some(character) = self.characters.get_mut(&who) {
            character.inventory.insert(item_id);
        }
        if let Some(item) = self.items.get_mut(&item_id) {
            item.location = ItemLocation::Carried(who);
        }
        Ok(item_id)
    }

    /// Moves an item from the character's inventory into its room.
    pub fn drop_item(&mut self, who: CharacterId, name: &str) -> Result<ItemId, GameError> {
        let room_id = self.get_character(who)?.room.clone();
        let item_id = self
            .find_item_carried(who, name)
            .ok_or_else(|| GameError::not_found(EntityKind::Item, name))?;

        if let Some(character) = self.characters.get_mut(&who) {
            character.inventory.remove(&item_id);
        }
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.items.insert(item_id);
        }
        if let Some(item) = self.items.get_mut(&item_id) {
            item.location = ItemLocation::Room(room_id);
        }
        Ok(item_id)
    }

    /// Applies damage and returns the remaining health.
    pub fn damage(&mut self, who: CharacterId, amount: u32) -> Result<u32, GameError> {
        let character = self.get_character_mut(who)?;
        character.health = character.health.saturating_sub(amount);
        Ok(character.health)
    }

    /// Restores the character to full health in the start room.
    pub fn knock_out(&mut self, who: CharacterId) -> Result<Movement, GameError> {
        let start = self.start_room.clone();
        let from = self.relocate(who, &start)?;
        let character = self.get_character_mut(who)?;
        character.health = character.max_health;
        Ok(Movement { from, to: start })
    }

    /// Describes every broken cross-reference in the world. Empty when the
    /// occupancy and item-location invariants hold.
    pub fn consistency_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for room in self.rooms.values() {
            for exit in room.exits.values() {
                if !self.rooms.contains_key(exit) {
                    violations.push(format!("{} has exit to missing room {}", room.id, exit));
                }
            }
            for occupant in &room.occupants {
                match self.characters.get(occupant) {
                    Some(c) if c.room == room.id => {}
                    Some(c) => violations.push(format!(
                        "{} listed in {} but located in {}",
                        occupant, room.id, c.room
                    )),
                    None => violations.push(format!("{} lists missing {}", room.id, occupant)),
                }
            }
            for item in &room.items {
                if self.items.get(item).map(|i| &i.location)
                    != Some(&ItemLocation::Room(room.id.clone()))
                {
                    violations.push(format!("{} listed in {} but located elsewhere", item, room.id));
                }
            }
        }

        for character in self.characters.values() {
            match self.rooms.get(&character.room) {
                Some(room) if room.occupants.contains(&character.id) => {}
                Some(_) => violations.push(format!(
                    "{} thinks it is in {} but is not listed there",
                    character.id, character.room
                )),
                None => violations.push(format!(
                    "{} is in missing room {}",
                    character.id, character.room
                )),
            }
            for item in &character.inventory {
                if self.items.get(item).map(|i| &i.location)
                    != Some(&ItemLocation::Carried(character.id))
                {
                    violations.push(format!("{} carried by {} but located elsewhere", item, character.id));
                }
            }
        }

        for item in self.items.values() {
            let listed = match &item.location {
                ItemLocation::Room(room) => self
                    .rooms
                    .get(room)
                    .is_some_and(|r| r.items.contains(&item.id)),
                ItemLocation::Carried(who) => self
                    .characters
                    .get(who)
                    .is_some_and(|c| c.inventory.contains(&item.id)),
            };
            if !listed {
                violations.push(format!("{} has a dangling location {:?}", item.id, item.location));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::NameError;

    fn test_world() -> World {
        World::from_json(
            r#"{
                "start": "a",
                "rooms": [
                    { "id": "a", "name": "Room A", "description": "First.",
                      "exits": { "east": "b" },
                      "items": [ { "name": "coin" }, { "name": "statue", "fixed": true } ] },
                    { "id": "b", "name": "Room B", "description": "Second.",
                      "exits": { "west": "a" } }
                ]
            }"#,
        )
        .unwrap()
    }

    fn spawn(world: &mut World, name: &str, session: u32) -> CharacterId {
        world.spawn_character(name, SessionId(session)).unwrap()
    }

    #[test]
    fn test_default_world_loads_and_is_consistent() {
        let world = World::default_world().unwrap();
        assert_eq!(world.start_room().as_str(), "tavern");
        assert!(world.room(&RoomId::new("square")).is_some());
        assert!(world.consistency_violations().is_empty());
    }

    #[test]
    fn test_load_rejects_dangling_exit() {
        let result = World::from_json(
            r#"{ "start": "a", "rooms": [
                { "id": "a", "name": "A", "description": "", "exits": { "north": "zzz" } }
            ] }"#,
        );
        assert!(matches!(result, Err(WorldError::DanglingExit { .. })));
    }

    #[test]
    fn test_load_rejects_missing_start_and_duplicates() {
        let missing = World::from_json(
            r#"{ "start": "x", "rooms": [ { "id": "a", "name": "A", "description": "" } ] }"#,
        );
        assert!(matches!(missing, Err(WorldError::MissingStartRoom(_))));

        let duplicate = World::from_json(
            r#"{ "start": "a", "rooms": [
                { "id": "a", "name": "A", "description": "" },
                { "id": "a", "name": "A again", "description": "" }
            ] }"#,
        );
        assert!(matches!(duplicate, Err(WorldError::DuplicateRoom(_))));

        let empty = World::from_json(r#"{ "start": "a", "rooms": [] }"#);
        assert!(matches!(empty, Err(WorldError::Empty)));

        assert!(matches!(World::from_json("{"), Err(WorldError::Parse(_))));
    }

    #[test]
    fn test_exit_names_are_case_insensitive() {
        let mut world = World::from_json(
            r#"{ "start": "a", "rooms": [
                { "id": "a", "name": "A", "description": "", "exits": { "Outside": "b" } },
                { "id": "b", "name": "B", "description": "", "exits": { "IN": "a" } }
            ] }"#,
        )
        .unwrap();
        let a = world.room(&RoomId::new("a")).unwrap();
        assert_eq!(a.exits().keys().collect::<Vec<_>>(), vec!["outside"]);

        let anna = spawn(&mut world, "Anna", 1);
        let movement = world.move_character(anna, "outside").unwrap();
        assert_eq!(movement.to, RoomId::new("b"));
        let movement = world.move_character(anna, "In").unwrap();
        assert_eq!(movement.to, RoomId::new("a"));
    }

    #[test]
    fn test_load_reads_world_file() {
        let path = std::env::temp_dir().join(format!("simplemud-world-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "start": "cell", "rooms": [ { "id": "cell", "name": "Cell", "description": "Bare." } ] }"#,
        )
        .unwrap();

        let loaded = World::load(&path);
        fs::remove_file(&path).unwrap();

        let world = loaded.unwrap();
        assert_eq!(world.start_room().as_str(), "cell");
        assert_eq!(world.rooms().count(), 1);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let path = std::env::temp_dir().join("simplemud-no-such-world.json");
        match World::load(&path) {
            Err(WorldError::Io { path: reported, source }) => {
                assert_eq!(reported, path.display().to_string());
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected an I/O error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_spawn_places_character_in_start_room() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);

        let start = world.start_room().clone();
        assert_eq!(world.occupants(&start).unwrap(), vec![anna]);
        assert_eq!(world.character(anna).unwrap().room(), &start);
        assert_eq!(world.character(anna).unwrap().health(), MAX_HEALTH);
        assert_eq!(
            world.spawn_character("anna", SessionId(2)),
            Err(LoginError::NameTaken)
        );
    }

    #[test]
    fn test_move_updates_both_rooms() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);

        let movement = world.move_character(anna, "east").unwrap();
        assert_eq!(movement.from, RoomId::new("a"));
        assert_eq!(movement.to, RoomId::new("b"));
        assert!(world.occupants(&RoomId::new("a")).unwrap().is_empty());
        assert_eq!(world.occupants(&RoomId::new("b")).unwrap(), vec![anna]);
        assert!(world.consistency_violations().is_empty());
    }

    #[test]
    fn test_move_through_missing_exit_changes_nothing() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);

        let result = world.move_character(anna, "north");
        assert_eq!(result, Err(GameError::InvalidDirection("north".into())));
        assert_eq!(world.occupants(&RoomId::new("a")).unwrap(), vec![anna]);
        assert_eq!(world.character(anna).unwrap().room(), &RoomId::new("a"));
    }

    #[test]
    fn test_unknown_character_is_not_found() {
        let mut world = test_world();
        assert!(matches!(
            world.move_character(CharacterId(99), "east"),
            Err(GameError::NotFound { kind: EntityKind::Player, .. })
        ));
        assert!(matches!(
            world.inventory(CharacterId(99)),
            Err(GameError::NotFound { .. })
        ));
        assert!(matches!(
            world.occupants(&RoomId::new("nowhere")),
            Err(GameError::NotFound { kind: EntityKind::Room, .. })
        ));
    }

    #[test]
    fn test_take_and_drop_transfer_item() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);
        let room = RoomId::new("a");

        let coin = world.take_item(anna, "COIN").unwrap();
        assert_eq!(world.inventory(anna).unwrap(), vec![coin]);
        assert!(!world.room_items(&room).unwrap().contains(&coin));
        assert_eq!(world.item(coin).unwrap().location(), &ItemLocation::Carried(anna));

        world.move_character(anna, "east").unwrap();
        world.drop_item(anna, "coin").unwrap();
        assert!(world.inventory(anna).unwrap().is_empty());
        assert_eq!(world.room_items(&RoomId::new("b")).unwrap(), vec![coin]);
        assert!(world.consistency_violations().is_empty());
    }

    #[test]
    fn test_take_missing_or_fixed_item_fails() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);

        assert!(matches!(
            world.take_item(anna, "sword"),
            Err(GameError::NotFound { kind: EntityKind::Item, .. })
        ));
        assert_eq!(
            world.take_item(anna, "STATUE"),
            Err(GameError::Refused("The statue won't budge.".into()))
        );
        assert_eq!(
            world.drop_item(anna, "coin"),
            Err(GameError::not_found(EntityKind::Item, "coin"))
        );
        assert_eq!(
            world.drop_item(anna, "unicorn"),
            Err(GameError::not_found(EntityKind::Item, "unicorn"))
        );
        assert_eq!(world.room_items(&RoomId::new("a")).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_character_drops_inventory() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);
        let coin = world.take_item(anna, "coin").unwrap();
        world.move_character(anna, "east").unwrap();

        world.remove_character(anna).unwrap();

        assert!(world.character(anna).is_none());
        assert!(world.occupants(&RoomId::new("b")).unwrap().is_empty());
        assert_eq!(
            world.item(coin).unwrap().location(),
            &ItemLocation::Room(RoomId::new("b"))
        );
        assert!(world.consistency_violations().is_empty());
    }

    #[test]
    fn test_login_resumes_detached_character() {
        let mut world = test_world();
        let login = world.login("Anna", SessionId(1)).unwrap();
        assert!(!login.resumed);

        assert_eq!(world.login("ANNA", SessionId(2)), Err(LoginError::NameTaken));
        assert_eq!(
            world.login("r2d2", SessionId(2)),
            Err(LoginError::InvalidName(NameError::InvalidCharacters))
        );
        assert_eq!(world.characters().count(), 1);

        world.detach_session(login.character).unwrap();
        assert!(world.connected_characters().is_empty());

        let again = world.login("anna", SessionId(3)).unwrap();
        assert!(again.resumed);
        assert_eq!(again.character, login.character);
        assert_eq!(
            world.character(login.character).unwrap().session(),
            Some(SessionId(3))
        );
    }

    #[test]
    fn test_damage_and_knock_out() {
        let mut world = test_world();
        let anna = spawn(&mut world, "Anna", 1);
        world.move_character(anna, "east").unwrap();

        assert_eq!(world.damage(anna, 30).unwrap(), MAX_HEALTH - 30);
        assert_eq!(world.damage(anna, 1000).unwrap(), 0);

        let movement = world.knock_out(anna).unwrap();
        assert_eq!(movement.from, RoomId::new("b"));
        assert_eq!(movement.to, RoomId::new("a"));
        assert_eq!(world.character(anna).unwrap().health(), MAX_HEALTH);
        assert!(world.consistency_violations().is_empty());
    }

    #[test]
    fn test_item_without_description_gets_default() {
        let world = test_world();
        let coin = world.find_item_in_room(&RoomId::new("a"), "coin").unwrap();
        assert_eq!(world.item(coin).unwrap().description(), "It's just a coin.");
    }
}

//! Turns a parsed [`Command`] into a world mutation plus notifications.
//!
//! Each handler validates against the current world, applies at most one
//! world operation and describes who should hear about it. Nothing here
//! knows about sessions or sockets; audiences are expressed relative to the
//! world and resolved later by the broadcast router.

use crate::config::DisconnectPolicy;
use crate::error::{EntityKind, GameError};
use crate::ids::{CharacterId, RoomId};
use crate::world::World;
use rand::Rng;
use shared::{join_or, Command, ATTACK_DAMAGE_MAX, ATTACK_DAMAGE_MIN};

/// Who a notification is for, relative to the acting character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Actor,
    Room { room: RoomId, except: Vec<CharacterId> },
    Global { except: Vec<CharacterId> },
    Character(CharacterId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub audience: Audience,
    pub text: String,
}

/// Everything a command produced, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub notifications: Vec<Notification>,
    /// Set by `quit`: the issuing session should disconnect.
    pub disconnect: bool,
}

impl Outcome {
    fn push(&mut self, audience: Audience, text: impl Into<String>) {
        self.notifications.push(Notification {
            audience,
            text: text.into(),
        });
    }

    fn tell_actor(&mut self, text: impl Into<String>) {
        self.push(Audience::Actor, text);
    }

    fn tell_room(&mut self, room: &RoomId, except: &[CharacterId], text: impl Into<String>) {
        self.push(
            Audience::Room {
                room: room.clone(),
                except: except.to_vec(),
            },
            text,
        );
    }

    fn tell_character(&mut self, who: CharacterId, text: impl Into<String>) {
        self.push(Audience::Character(who), text);
    }

    fn tell_everyone_but(&mut self, who: CharacterId, text: impl Into<String>) {
        self.push(Audience::Global { except: vec![who] }, text);
    }

    /// Texts addressed to the actor, in order.
    pub fn actor_texts(&self) -> Vec<&str> {
        self.notifications
            .iter()
            .filter(|n| n.audience == Audience::Actor)
            .map(|n| n.text.as_str())
            .collect()
    }
}

const HELP: &str = "Commands:
  look [thing]          - Examines the surroundings or something in them, e.g. 'look mug'
  go <exit>             - Moves through the exit specified, e.g. 'go outside'
  north, south, ... / n, s, e, w, u, d
                        - Moves in a direction
  say <message>         - Says something out loud, e.g. 'say Hello'
  emote <action>        - Acts something out, e.g. 'emote laughs out loud'
  shout <message>       - Yells to players in all rooms
  whisper <who> <msg>   - Talks quietly to one player in the room
  take <item>           - Picks up an item
  drop <item>           - Drops an item you carry
  inventory             - Lists what you carry
  who                   - Lists everyone online
  attack <player>       - Starts a fight
  quit                  - Leaves the game";

fn actor_name(world: &World, actor: CharacterId) -> Result<(String, RoomId), GameError> {
    world
        .character(actor)
        .map(|c| (c.name().to_string(), c.room().clone()))
        .ok_or_else(|| GameError::not_found(EntityKind::Player, actor))
}

/// Full room description: name, text, occupants, items and exits.
pub fn describe_room(world: &World, room_id: &RoomId) -> Result<String, GameError> {
    let room = world
        .room(room_id)
        .ok_or_else(|| GameError::not_found(EntityKind::Room, room_id))?;

    let players: Vec<String> = room
        .occupants()
        .filter_map(|id| world.character(id))
        .map(|c| {
            if c.is_connected() {
                c.name().to_string()
            } else {
                format!("{} (asleep)", c.name())
            }
        })
        .collect();
    let items: Vec<&str> = room
        .items()
        .filter_map(|id| world.item(id))
        .map(|item| item.name())
        .collect();
    let exits: Vec<&str> = room.exits().keys().map(String::as_str).collect();

    let mut lines = vec![
        room.name().to_string(),
        room.description().trim().to_string(),
        format!("Players here: {}", join_or(&players, "nobody")),
    ];
    if !items.is_empty() {
        lines.push(format!("Items here: {}", join_or(&items, "")));
    }
    lines.push(format!("Exits are: {}", join_or(&exits, "none")));
    Ok(lines.join("\n"))
}

/// Applies `command` for `actor` using the thread-local RNG for combat.
pub fn execute(world: &mut World, actor: CharacterId, command: Command) -> Result<Outcome, GameError> {
    execute_with_rng(world, actor, command, &mut rand::thread_rng())
}

pub fn execute_with_rng<R: Rng>(
    world: &mut World,
    actor: CharacterId,
    command: Command,
    rng: &mut R,
) -> Result<Outcome, GameError> {
    let (name, room) = actor_name(world, actor)?;
    let mut outcome = Outcome::default();

    match command {
        Command::Go(exit) => {
            let movement = world.move_character(actor, &exit)?;
            outcome.tell_room(
                &movement.from,
                &[actor],
                format!("{} left via exit '{}'", name, exit),
            );
            outcome.tell_room(
                &movement.to,
                &[actor],
                format!("{} arrived via exit '{}'", name, exit),
            );
            outcome.tell_actor(describe_room(world, &movement.to)?);
        }

        Command::Look(None) => outcome.tell_actor(describe_room(world, &room)?),

        Command::Look(Some(target)) => outcome.tell_actor(look_at(world, actor, &room, &target)?),

        Command::Say(text) => {
            outcome.tell_actor(format!("You say: {}", text));
            outcome.tell_room(&room, &[actor], format!("{} says: {}", name, text));
        }

        Command::Emote(text) => outcome.tell_room(&room, &[], format!("{} {}", name, text)),

        Command::Shout(text) => {
            outcome.tell_actor(format!("You shout: {}", text));
            outcome.tell_everyone_but(actor, format!("{} shouts: {}", name, text));
        }

        Command::Whisper { target, message } => {
            let (target_id, target_name) = awake_player_in_room(world, actor, &room, &target)?;
            if target_id == actor {
                return Err(GameError::Refused("You mutter quietly to yourself.".into()));
            }
            outcome.tell_character(target_id, format!("{} whispers: {}", name, message));
            outcome.tell_actor(format!("You whisper to {}: {}", target_name, message));
        }

        Command::Take(item) => {
            let item_id = world.take_item(actor, &item)?;
            let item_name = world.item(item_id).map(|i| i.name()).unwrap_or(item.as_str());
            outcome.tell_actor(format!("You pick up the {}.", item_name));
            outcome.tell_room(&room, &[actor], format!("{} picks up the {}.", name, item_name));
        }

        Command::Drop(item) => {
            let item_id = world.drop_item(actor, &item)?;
            let item_name = world.item(item_id).map(|i| i.name()).unwrap_or(item.as_str());
            outcome.tell_actor(format!("You drop the {}.", item_name));
            outcome.tell_room(&room, &[actor], format!("{} drops the {}.", name, item_name));
        }

        Command::Inventory => {
            let items: Vec<&str> = world
                .inventory(actor)?
                .into_iter()
                .filter_map(|id| world.item(id))
                .map(|item| item.name())
                .collect();
            if items.is_empty() {
                outcome.tell_actor("You are carrying nothing.");
            } else {
                outcome.tell_actor(format!("You are carrying: {}", join_or(&items, "")));
            }
            if let Some(me) = world.character(actor) {
                outcome.tell_actor(format!("Health: {}/{}", me.health(), me.max_health()));
            }
        }

        Command::Who => {
            let online: Vec<String> = world
                .connected_characters()
                .into_iter()
                .filter_map(|id| world.character(id))
                .map(|c| {
                    let room = world.room(c.room()).map(|r| r.name()).unwrap_or("?");
                    format!("{} [{}]", c.name(), room)
                })
                .collect();
            outcome.tell_actor(format!(
                "Players online ({}): {}",
                online.len(),
                join_or(&online, "nobody")
            ));
        }

        Command::Attack(target) => attack(world, actor, &name, &room, &target, rng, &mut outcome)?,

        Command::Help => outcome.tell_actor(HELP),

        Command::Quit => {
            outcome.tell_actor("Goodbye!");
            outcome.disconnect = true;
        }
    }

    Ok(outcome)
}

fn look_at(
    world: &World,
    actor: CharacterId,
    room: &RoomId,
    target: &str,
) -> Result<String, GameError> {
    let item = world
        .find_item_in_room(room, target)
        .or_else(|| world.find_item_carried(actor, target));
    if let Some(item) = item.and_then(|id| world.item(id)) {
        return Ok(item.description().to_string());
    }

    let person = world
        .find_character(target)
        .and_then(|id| world.character(id))
        .filter(|c| c.room() == room);
    match person {
        Some(c) if c.id() == actor => Ok(format!(
            "You look yourself over. Health: {}/{}.",
            c.health(),
            c.max_health()
        )),
        Some(c) => Ok(format!(
            "{} is here{}. Health: {}/{}.",
            c.name(),
            if c.is_connected() { "" } else { ", fast asleep" },
            c.health(),
            c.max_health()
        )),
        // A known player who is elsewhere is reported as a player, not an item
        None if world.find_character(target).is_some() => {
            Err(GameError::not_found(EntityKind::Player, target))
        }
        None => Err(GameError::not_found(EntityKind::Item, target)),
    }
}

/// Finds a connected character called `target` in `room`.
fn awake_player_in_room(
    world: &World,
    actor: CharacterId,
    room: &RoomId,
    target: &str,
) -> Result<(CharacterId, String), GameError> {
    let character = world
        .find_character(target)
        .and_then(|id| world.character(id))
        .filter(|c| c.room() == room)
        .ok_or_else(|| GameError::not_found(EntityKind::Player, target))?;

    if character.id() != actor && !character.is_connected() {
        return Err(GameError::Refused(format!(
            "{} is asleep. Leave them be.",
            character.name()
        )));
    }
    Ok((character.id(), character.name().to_string()))
}

fn attack<R: Rng>(
    world: &mut World,
    actor: CharacterId,
    name: &str,
    room: &RoomId,
    target: &str,
    rng: &mut R,
    outcome: &mut Outcome,
) -> Result<(), GameError> {
    let (target_id, target_name) = awake_player_in_room(world, actor, room, target)?;
    if target_id == actor {
        return Err(GameError::Refused("You can't attack yourself.".into()));
    }

    let damage = rng.gen_range(ATTACK_DAMAGE_MIN..=ATTACK_DAMAGE_MAX);
    let remaining = world.damage(target_id, damage)?;

    outcome.tell_actor(format!("You hit {} for {} damage.", target_name, damage));
    outcome.tell_character(target_id, format!("{} hits you for {} damage.", name, damage));
    outcome.tell_room(
        room,
        &[actor, target_id],
        format!("{} hits {}.", name, target_name),
    );

    if remaining == 0 {
        let movement = world.knock_out(target_id)?;
        outcome.tell_room(
            &movement.from,
            &[target_id],
            format!("{} collapses and is dragged away.", target_name),
        );
        outcome.tell_character(
            target_id,
            "Everything goes black... You wake up somewhere familiar.",
        );
        outcome.tell_character(target_id, describe_room(world, &movement.to)?);
        if movement.to != movement.from {
            outcome.tell_room(
                &movement.to,
                &[target_id],
                format!("{} is carried in, battered and bruised.", target_name),
            );
        }
    }
    Ok(())
}

/// Announces a freshly bound character and shows it where it is.
pub fn enter_game(world: &World, who: CharacterId, resumed: bool) -> Result<Outcome, GameError> {
    let (name, room) = actor_name(world, who)?;
    let mut outcome = Outcome::default();

    outcome.tell_everyone_but(who, format!("{} entered the game", name));
    if resumed {
        outcome.tell_actor(format!("Welcome back, {}.", name));
    } else {
        outcome.tell_actor(format!(
            "Welcome to the game, {}. Type 'help' for a list of commands. Have fun!",
            name
        ));
    }
    outcome.tell_actor(describe_room(world, &room)?);
    Ok(outcome)
}

/// Detaches or removes a character whose session is going away.
pub fn leave_game(
    world: &mut World,
    who: CharacterId,
    policy: DisconnectPolicy,
) -> Result<Outcome, GameError> {
    let (name, _) = actor_name(world, who)?;

    match policy {
        DisconnectPolicy::Remove => world.remove_character(who)?,
        DisconnectPolicy::Linger => {
            world.detach_session(who)?;
        }
    }

    let mut outcome = Outcome::default();
    outcome.tell_everyone_but(who, format!("{} quit the game", name));
    Ok(outcome)
}

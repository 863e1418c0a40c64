//! # Console Commands
//!
//! The command task turns console lines into session requests. Requests
//! that take the request lock (move, walk, walk-to, pickup) wait for the
//! server's answer with a bounded, cancellable poll and force-release the
//! lock if none comes.
//!
//! | command            | effect                                         |
//! |--------------------|------------------------------------------------|
//! | `servers`          | list the received game servers                 |
//! | `server <id>`      | request the address of a game server           |
//! | `chars`            | list the characters on the account             |
//! | `select <name>`    | enter the world with a character               |
//! | `move <x> <y>`     | instant move                                   |
//! | `walk <dir>`       | one step in compass direction 0-7              |
//! | `walkto <x> <y>`   | greedy walk, up to 15 steps per request        |
//! | `pickup [id]`      | pick up an object, or the nearest one          |
//! | `scope`            | list visible objects                           |
//! | `status`           | one-line character summary                     |
//! | `quit`             | log out and end the session                    |

use crate::config::SessionConfig;
use muclient_core::{Direction, DirectionMap, TilePosition};
use muclient_game::{GameState, RequestState};
use muclient_protocol::packet_builder::MAX_WALK_STEPS;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

/// Logout type for leaving the game entirely
const LOGOUT_CLOSE_GAME: u8 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Request refused: {0}")]
    Rejected(&'static str),

    #[error("No answer to {0} in time")]
    Timeout(&'static str),

    #[error("Nothing to pick up")]
    NothingToPickUp,

    #[error("Cancelled")]
    Cancelled,
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Lines to show on the console
    Report(Vec<String>),
    /// The session should end
    Quit,
}

impl CommandOutcome {
    fn line(text: impl Into<String>) -> Self {
        CommandOutcome::Report(vec![text.into()])
    }
}

/// Walk directions from `from` towards `to`, at most `max_steps` of them
///
/// Each step takes the direction that closes both axis distances at once;
/// no obstacle is considered.
pub fn greedy_path(from: TilePosition, to: TilePosition, max_steps: usize) -> Vec<Direction> {
    let mut path = Vec::new();
    let mut current = from;
    while path.len() < max_steps {
        let Some(direction) = Direction::towards(current, to) else {
            break;
        };
        current = current.step(direction);
        path.push(direction);
    }
    path
}

/// Executes console commands against the shared state
pub struct CommandHandler {
    state: Arc<GameState>,
    direction_map: DirectionMap,
    request_attempts: u32,
    request_delay: Duration,
    cancel: CancellationToken,
}

impl CommandHandler {
    pub fn new(state: Arc<GameState>, config: &SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            state,
            direction_map: config.direction_map,
            request_attempts: config.request_attempts,
            request_delay: config.request_delay,
            cancel,
        }
    }

    /// Parse and run one console line
    pub async fn execute(&self, line: &str) -> Result<CommandOutcome, CommandError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(CommandOutcome::Report(Vec::new()));
        };
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "servers" => Ok(self.list_servers()),
            "server" => {
                let id = parse_arg(&args, 0, "server id", "server <id>")?;
                self.require(self.state.select_server(id), "server is not selectable")?;
                Ok(CommandOutcome::line(format!("Requested game server {}", id)))
            }
            "chars" => Ok(self.list_characters()),
            "select" => {
                let name = args.first().ok_or(CommandError::Usage("select <name>"))?;
                self.require(self.state.select_character(name), "character is not selectable")?;
                Ok(CommandOutcome::line(format!("Selected {}", name)))
            }
            "move" => {
                let x = parse_arg(&args, 0, "x", "move <x> <y>")?;
                let y = parse_arg(&args, 1, "y", "move <x> <y>")?;
                self.instant_move(TilePosition::new(x, y)).await
            }
            "walk" => {
                let value: u8 = parse_arg(&args, 0, "direction", "walk <0-7>")?;
                let direction = Direction::from_u8(value).ok_or(CommandError::InvalidArgument {
                    name: "direction",
                    value: value.to_string(),
                })?;
                self.walk(&[direction]).await?;
                Ok(CommandOutcome::line(format!("Walked to {}", self.state.client().position())))
            }
            "walkto" => {
                let x = parse_arg(&args, 0, "x", "walkto <x> <y>")?;
                let y = parse_arg(&args, 1, "y", "walkto <x> <y>")?;
                self.walk_to(TilePosition::new(x, y)).await
            }
            "pickup" => {
                let target = match args.first() {
                    Some(value) => Some(parse_id(value)?),
                    None => None,
                };
                self.pickup(target).await
            }
            "scope" => Ok(self.list_scope()),
            "status" => Ok(CommandOutcome::line(self.state.summary())),
            "quit" | "exit" => {
                if self.state.client().is_in_game() {
                    self.state.request_logout(LOGOUT_CLOSE_GAME);
                }
                self.cancel.cancel();
                Ok(CommandOutcome::Quit)
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    fn require(&self, accepted: bool, reason: &'static str) -> Result<(), CommandError> {
        if accepted {
            Ok(())
        } else {
            Err(CommandError::Rejected(reason))
        }
    }

    fn list_servers(&self) -> CommandOutcome {
        let servers = self.state.servers();
        if servers.is_empty() {
            return CommandOutcome::line("No server list received");
        }
        CommandOutcome::Report(
            servers
                .iter()
                .map(|server| format!("server {:>3}  load {:>3}%", server.server_id, server.load))
                .collect(),
        )
    }

    fn list_characters(&self) -> CommandOutcome {
        let characters = self.state.characters();
        if characters.is_empty() {
            return CommandOutcome::line("No character list received");
        }
        let version = self.state.version();
        CommandOutcome::Report(
            characters
                .iter()
                .map(|character| {
                    format!(
                        "slot {}  {:<10}  level {:>3}  {}",
                        character.slot,
                        character.name,
                        character.level,
                        self.state.names().class_name(character.class, version).unwrap_or("?")
                    )
                })
                .collect(),
        )
    }

    fn list_scope(&self) -> CommandOutcome {
        let me = self.state.client().position();
        CommandOutcome::Report(
            self.state
                .scope()
                .snapshot()
                .iter()
                .map(|entity| {
                    format!(
                        "{:#06x}  {:<6} {:<24} at {} (distance {})",
                        entity.masked_id(),
                        entity.kind.label(),
                        describe(&entity.kind),
                        entity.position,
                        me.distance_to(entity.position)
                    )
                })
                .collect(),
        )
    }

    async fn instant_move(&self, target: TilePosition) -> Result<CommandOutcome, CommandError> {
        self.require(self.state.request_instant_move(target), "cannot move now")?;
        self.wait_for_answer("move").await?;
        Ok(CommandOutcome::line(format!("Now at {}", self.state.client().position())))
    }

    async fn walk(&self, directions: &[Direction]) -> Result<(), CommandError> {
        let codes: Vec<u8> = directions.iter().map(|d| self.direction_map.to_server(*d)).collect();
        self.require(self.state.request_walk(&codes), "cannot walk now")?;
        self.wait_for_answer("walk").await
    }

    async fn walk_to(&self, target: TilePosition) -> Result<CommandOutcome, CommandError> {
        loop {
            let start = self.state.client().position();
            let path = greedy_path(start, target, MAX_WALK_STEPS);
            if path.is_empty() {
                return Ok(CommandOutcome::line(format!("Arrived at {}", target)));
            }
            self.walk(&path).await?;
            if self.state.client().position() == start {
                return Err(CommandError::Rejected("walk made no progress"));
            }
        }
    }

    async fn pickup(&self, masked_id: Option<u16>) -> Result<CommandOutcome, CommandError> {
        let target = match masked_id {
            Some(id) => self
                .state
                .scope()
                .get(id)
                .map(|object| object.snapshot())
                .filter(|entity| entity.kind.is_ground_object()),
            None => self.state.scope().nearest_ground_item(self.state.client().position()),
        };
        let target = target.ok_or(CommandError::NothingToPickUp)?;

        self.require(self.state.request_pickup(target.raw_id()), "cannot pick up now")?;
        self.wait_for_answer("pickup").await?;

        let description = describe(&target.kind);
        if self.state.client().requests().last_pickup_succeeded() {
            Ok(CommandOutcome::line(format!("Picked up {}", description)))
        } else {
            Ok(CommandOutcome::line(format!("Could not pick up {}", description)))
        }
    }

    /// Poll until the request lock is idle again
    async fn wait_for_answer(&self, what: &'static str) -> Result<(), CommandError> {
        for _ in 0..self.request_attempts {
            if self.state.client().requests().state() == RequestState::Idle {
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.state.force_release_requests();
                    return Err(CommandError::Cancelled);
                }
                _ = tokio::time::sleep(self.request_delay) => {}
            }
        }
        if self.state.client().requests().state() == RequestState::Idle {
            return Ok(());
        }
        tracing::warn!("No answer to {} request, releasing the request lock", what);
        self.state.force_release_requests();
        Err(CommandError::Timeout(what))
    }
}

fn describe(kind: &muclient_game::ScopeKind) -> String {
    use muclient_game::ScopeKind;
    match kind {
        ScopeKind::Player { name } => name.clone(),
        ScopeKind::Npc { type_number, name } => name.clone().unwrap_or_else(|| format!("#{}", type_number)),
        ScopeKind::Item { description, .. } => description.clone(),
        ScopeKind::Money { amount } => format!("{} zen", amount),
    }
}

fn parse_arg<T: std::str::FromStr>(
    args: &[&str],
    index: usize,
    name: &'static str,
    usage: &'static str,
) -> Result<T, CommandError> {
    let value = args.get(index).ok_or(CommandError::Usage(usage))?;
    value.parse().map_err(|_| CommandError::InvalidArgument {
        name,
        value: value.to_string(),
    })
}

/// Object ids are accepted in decimal or `0x` hex
fn parse_id(value: &str) -> Result<u16, CommandError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| CommandError::InvalidArgument {
        name: "object id",
        value: value.to_string(),
    })
}

/// Read console lines until input ends or the session is cancelled
pub async fn run_console<R>(handler: CommandHandler, input: R)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = handler.cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("Console input closed");
                break;
            }
            Err(e) => {
                tracing::warn!("Console read error: {}", e);
                break;
            }
        };

        match handler.execute(&line).await {
            Ok(CommandOutcome::Report(lines)) => {
                for line in lines {
                    tracing::info!("{}", line);
                }
            }
            Ok(CommandOutcome::Quit) => {
                tracing::info!("Quitting");
                break;
            }
            Err(CommandError::Cancelled) => break,
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

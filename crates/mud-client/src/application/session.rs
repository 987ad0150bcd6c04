//! The player's session: one command at a time against the current place.
//!
//! # Flow (for beginners)
//!
//! ```text
//! enter():  world.entrance() ──► place.join(me, name, "<name> has arrived.")
//!
//! run():    loop {
//!             read line ──► Command ──► call on current place / world / person
//!                                      │
//!                                      ├─ Ok      → print result
//!                                      └─ Err(e)  → print explain(command, e)
//!           } until `quit` or end of input
//! ```
//!
//! Errors never end the session.  A domain error (`NoSuchExit`, ...) gets a
//! one-line explanation specific to the command; a transport error reports
//! that the server could not be reached.  Only `quit`, end of input, or a
//! failure to enter the world in the first place end it.

use std::sync::Arc;

use async_trait::async_trait;
use mud_core::{MudError, PersonRef, PlaceAddress};
use mud_rpc::{PersonStub, PlaceStub, RpcError, WorldStub};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::commands::{Command, ParseError, HELP};

// ── Seams ─────────────────────────────────────────────────────────────────────

/// The player's terminal.
#[async_trait]
pub trait Console: Send {
    /// Shows `prompt` and reads one line.  `None` at end of input.
    async fn read_line(&mut self, prompt: &str) -> Option<String>;

    fn print(&mut self, line: &str);
}

/// Connections to world servers and other players.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn world(&self, host: &str, world: &str) -> Result<WorldStub, RpcError>;

    async fn place(&self, address: &PlaceAddress) -> Result<PlaceStub, RpcError> {
        let world = self.world(&address.host, &address.world).await?;
        Ok(world.place(&address.place))
    }

    async fn person(&self, person: &PersonRef) -> Result<PersonStub, RpcError>;
}

/// What this player's endpoint answers to `Name` and `Description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub description: String,
}

pub type SharedProfile = Arc<RwLock<Profile>>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot reach world '{world}' at {host}: {source}")]
    Unreachable {
        host: String,
        world: String,
        #[source]
        source: RpcError,
    },

    #[error("someone called '{0}' is already at the entrance; pick another name")]
    NameTaken(String),
}

// ── Session ───────────────────────────────────────────────────────────────────

enum Flow {
    Continue,
    Quit,
}

pub struct MudSession<C: Console> {
    console: C,
    gateway: Arc<dyn Gateway>,
    me: PersonRef,
    profile: SharedProfile,
    world_name: String,
    place: PlaceStub,
    // Set when the server has moved us but no stub for the new place could
    // be opened yet.
    moved_to: Option<PlaceAddress>,
}

impl<C: Console> MudSession<C> {
    /// Joins the entrance of `world` on `host`.
    pub async fn enter(
        console: C,
        gateway: Arc<dyn Gateway>,
        me: PersonRef,
        profile: SharedProfile,
        host: &str,
        world: &str,
    ) -> Result<Self, SessionError> {
        let unreachable = |source| SessionError::Unreachable {
            host: host.to_string(),
            world: world.to_string(),
            source,
        };
        let stub = gateway.world(host, world).await.map_err(unreachable)?;
        let entrance = stub.entrance().await.map_err(unreachable)?;
        let world_name = stub.world_name().await.map_err(unreachable)?;
        let place = gateway.place(&entrance).await.map_err(unreachable)?;

        let name = profile.read().await.name.clone();
        let greeting = format!("{name} has arrived.");
        match place.join(&me, &name, Some(&greeting)).await {
            Ok(()) => {}
            Err(RpcError::Remote(MudError::AlreadyThere)) => {
                return Err(SessionError::NameTaken(name))
            }
            Err(e) => return Err(unreachable(e)),
        }
        debug!(place = %entrance, "entered");

        Ok(Self {
            console,
            gateway,
            me,
            profile,
            world_name,
            place,
            moved_to: None,
        })
    }

    /// Where the server last put this player.
    pub fn place(&self) -> &PlaceAddress {
        self.moved_to.as_ref().unwrap_or_else(|| self.place.address())
    }

    /// Reads and runs commands until `quit` or end of input.
    pub async fn run(mut self) -> C {
        self.look().await;
        loop {
            if self.place().world != self.world_name {
                if let Ok(name) = self.world_name().await {
                    self.world_name = name;
                }
            }
            let prompt = format!("{}:{}> ", self.world_name, self.place().place);
            let Some(line) = self.console.read_line(&prompt).await else {
                self.quit().await;
                break;
            };
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(ParseError::Empty) => continue,
                Err(e) => {
                    self.console.print(&e.to_string());
                    continue;
                }
            };
            match self.execute(&command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => {
                    let message = explain(&command, &e);
                    self.console.print(&message);
                }
            }
        }
        self.console
    }

    async fn execute(&mut self, command: &Command) -> Result<Flow, RpcError> {
        if !matches!(command, Command::Quit | Command::Help) {
            self.reconnect().await?;
        }
        match command {
            Command::Look => self.look().await,
            Command::Examine(thing) => {
                let Some(thing) = self.argument(thing, "Examine what?").await else {
                    return Ok(Flow::Continue);
                };
                let text = self.place.inspect_item(&thing).await?;
                self.console.print(&text);
            }
            Command::Describe(who) => {
                let Some(who) = self.argument(who, "Describe whom?").await else {
                    return Ok(Flow::Continue);
                };
                let person = self.place.lookup_occupant(&who).await?;
                let stub = self.gateway.person(&person).await?;
                let description = stub.description().await?;
                self.console.print(&format!("{who}: {description}"));
            }
            Command::Go(exit) => {
                let Some(exit) = self.argument(exit, "Go where?").await else {
                    return Ok(Flow::Continue);
                };
                let next = self.place.go(&self.me, &exit).await?;
                self.moved_to = Some(next);
                self.reconnect().await?;
                self.look().await;
            }
            Command::Say(text) => {
                let Some(text) = self.argument(text, "Say what?").await else {
                    return Ok(Flow::Continue);
                };
                self.place.say(&self.me, &text).await?;
            }
            Command::Do(action) => {
                let Some(action) = self.argument(action, "Do what?").await else {
                    return Ok(Flow::Continue);
                };
                self.place.act(&self.me, &action).await?;
            }
            Command::Talk(who) => {
                let Some(who) = self.argument(who, "Talk to whom?").await else {
                    return Ok(Flow::Continue);
                };
                let person = self.place.lookup_occupant(&who).await?;
                let Some(text) = self.prompt("What do you want to say?").await else {
                    return Ok(Flow::Continue);
                };
                let name = self.profile.read().await.name.clone();
                let stub = self.gateway.person(&person).await?;
                stub.tell(&format!("{name} tells you: {text}")).await?;
            }
            Command::Change => {
                let Some(description) = self.prompt("Describe yourself for others:").await else {
                    return Ok(Flow::Continue);
                };
                self.profile.write().await.description = description;
                self.console.print("Your description has been changed.");
            }
            Command::Create(thing) => {
                let Some(thing) = self.argument(thing, "Create what?").await else {
                    return Ok(Flow::Continue);
                };
                let Some(description) = self.prompt(&format!("Please describe the {thing}:")).await
                else {
                    return Ok(Flow::Continue);
                };
                self.place.create_item(&self.me, &thing, &description).await?;
            }
            Command::Destroy(thing) => {
                let Some(thing) = self.argument(thing, "Destroy what?").await else {
                    return Ok(Flow::Continue);
                };
                self.place.destroy_item(&self.me, &thing).await?;
            }
            Command::Open(exit) => {
                let Some(exit) = self.argument(exit, "Open an exit in which direction?").await
                else {
                    return Ok(Flow::Continue);
                };
                let question = format!("What is the name of the place {exit}?");
                let Some(place) = self.prompt(&question).await else {
                    return Ok(Flow::Continue);
                };
                let Some(description) = self.prompt("Describe it:").await else {
                    return Ok(Flow::Continue);
                };
                let Some(back) = self.prompt("What is the exit back to here called?").await else {
                    return Ok(Flow::Continue);
                };
                self.place
                    .create_exit(&self.me, &exit, &back, &place, &description)
                    .await?;
            }
            Command::Close(exit) => {
                let Some(exit) = self.argument(exit, "Close which exit?").await else {
                    return Ok(Flow::Continue);
                };
                self.place.close_exit(&self.me, &exit).await?;
            }
            Command::Link(exit) => {
                let Some(exit) = self.argument(exit, "Link which exit?").await else {
                    return Ok(Flow::Continue);
                };
                let current = self.place.address().clone();
                let host = self
                    .prompt_or(&format!("What host? [{}]", current.host), &current.host)
                    .await;
                let world = self
                    .prompt_or(&format!("What world? [{}]", current.world), &current.world)
                    .await;
                let Some(place) = self.prompt("What place?").await else {
                    return Ok(Flow::Continue);
                };
                let target = PlaceAddress::new(host, world, place);
                self.place.link_exit(&self.me, &exit, target).await?;
            }
            Command::Dump(file) => {
                let Some(file) = self.argument(file, "Save to which file on the server?").await
                else {
                    return Ok(Flow::Continue);
                };
                let password = self.console.read_line("Password: ").await.unwrap_or_default();
                let address = self.place.address().clone();
                let world = self.gateway.world(&address.host, &address.world).await?;
                world.dump(password.trim(), &file).await?;
                self.console.print(&format!("World saved to {file}."));
            }
            Command::Quit => {
                self.quit().await;
                return Ok(Flow::Quit);
            }
            Command::Help => self.console.print(HELP),
        }
        Ok(Flow::Continue)
    }

    /// Opens a stub for the place the server moved us to, if still pending.
    async fn reconnect(&mut self) -> Result<(), RpcError> {
        if let Some(address) = &self.moved_to {
            self.place = self.gateway.place(address).await?;
            self.moved_to = None;
        }
        Ok(())
    }

    async fn world_name(&self) -> Result<String, RpcError> {
        let address = self.place();
        let world = self.gateway.world(&address.host, &address.world).await?;
        world.world_name().await
    }

    async fn look(&mut self) {
        let place = self.place.clone();
        let result: Result<Vec<String>, RpcError> = async {
            let address = place.address();
            Ok(vec![
                format!("You are in: {} of the world: {}", address.place, address.world),
                place.describe().await?,
                format!("Things here: {}", listing(place.list_items().await?)),
                format!("People here: {}", listing(place.list_occupants().await?)),
                format!("Exits are: {}", listing(place.list_exits().await?)),
            ])
        }
        .await;
        match result {
            Ok(lines) => lines.iter().for_each(|l| self.console.print(l)),
            Err(e) => {
                let message = explain(&Command::Look, &e);
                self.console.print(&message);
            }
        }
    }

    async fn quit(&mut self) {
        if let Err(e) = self.reconnect().await {
            debug!("no stub for current place on quit: {e}");
        }
        let name = self.profile.read().await.name.clone();
        if let Err(e) = self.place.leave(&self.me, Some(&format!("{name} has quit."))).await {
            debug!("leave on quit failed: {e}");
        }
        self.console.print("Bye.");
    }

    async fn prompt(&mut self, question: &str) -> Option<String> {
        let answer = self.console.read_line(&format!("{question} ")).await?;
        let answer = answer.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }

    async fn prompt_or(&mut self, question: &str, default: &str) -> String {
        self.prompt(question)
            .await
            .unwrap_or_else(|| default.to_string())
    }

    /// `given`, or else the answer to `question`.
    async fn argument(&mut self, given: &str, question: &str) -> Option<String> {
        if given.is_empty() {
            self.prompt(question).await
        } else {
            Some(given.to_string())
        }
    }
}

fn listing(names: Vec<String>) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// One line telling the player what went wrong with `command`.
pub fn explain(command: &Command, error: &RpcError) -> String {
    let Some(domain) = error.as_domain() else {
        return match command {
            Command::Describe(who) | Command::Talk(who)
                if !matches!(error, RpcError::UnexpectedReply(_)) =>
            {
                format!("{who} cannot be reached right now ({error}).")
            }
            _ => format!("Could not reach the server: {error}. Try again."),
        };
    };

    match (domain, command) {
        (MudError::NotThere, _) => {
            "You are not in that place any more; you may have been disconnected.".to_string()
        }
        (MudError::AlreadyThere, Command::Create(thing)) => {
            format!("There is already a {thing} here.")
        }
        (MudError::AlreadyThere, Command::Go(_)) => {
            "You are already listed in that place.".to_string()
        }
        (MudError::AlreadyThere, _) => "That is already here.".to_string(),
        (MudError::NoSuchThing(thing), _) => format!("There is no {thing} here."),
        (MudError::NoSuchPerson(who), _) => format!("There is nobody called {who} here."),
        (MudError::NoSuchExit(exit), _) => format!("There is no exit {exit}."),
        (MudError::NoSuchPlace(place), _) => format!("There is no place called {place}."),
        (MudError::ExitAlreadyExists(exit), _) => format!("There is already an exit {exit}."),
        (MudError::PlaceAlreadyExists(place), _) => {
            format!("There is already a place called {place}.")
        }
        (MudError::LinkFailed(target), Command::Go(exit)) => {
            format!("The exit {exit} leads to {target}, which cannot be reached right now.")
        }
        (MudError::LinkFailed(target), _) => format!("Cannot reach {target}."),
        (MudError::BadPassword, _) => "Wrong password.".to_string(),
        (MudError::Persistence(reason), _) => format!("The world could not be saved: {reason}"),
        (MudError::BadRequest(reason), _) => format!("The server refused: {reason}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

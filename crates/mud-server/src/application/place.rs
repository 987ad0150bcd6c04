//! One node of the world graph.
//!
//! A [`Place`] owns its description, items, occupants, and exits behind a
//! single `Mutex`.  Every operation that reads and then writes those
//! collections does so under that one lock, which is what keeps item names,
//! occupant names, and exit names unique even when many players act at once.
//! Different places have different locks, so they never wait on each other.
//!
//! # Notices (for beginners)
//!
//! After a visible change a place tells everyone present about it ("Alice
//! has created a lamp.").  The list of recipients is copied while the lock is
//! held, then a separate task delivers the text to each of them in turn.  The
//! operation that caused the notice returns immediately.  A recipient that
//! cannot be reached is dropped from the occupant list, as if they had left.
//!
//! # Exits
//!
//! An exit leads either to a place in this world (held as a `Weak` pointer,
//! since exits routinely form cycles) or to a place on another server (held
//! as a [`PlaceAddress`] and resolved through [`WorldLink`] each time someone
//! walks through it).

use std::sync::{Arc, Weak};
use std::time::Duration;

use mud_core::{MudError, PersonRef, PlaceAddress};
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

use crate::application::link::{LinkError, WorldLink};
use crate::application::person::{DeliveryError, PersonConnector, PersonHandle};
use crate::application::registry::PlaceRegistry;
use crate::application::snapshot::{
    ExitRecord, ExitTargetRecord, ItemRecord, PlaceRecord, SnapshotError,
};

/// Services and identity shared by every place of one world.
pub struct WorldContext {
    pub world: String,
    /// `host:port` other servers and clients use to reach this world.
    pub host: String,
    pub persons: Arc<dyn PersonConnector>,
    pub link: Arc<dyn WorldLink>,
    /// Upper bound on one notice delivery before the recipient is dropped.
    pub delivery_timeout: Duration,
}

impl WorldContext {
    pub fn address_of(&self, place: &str) -> PlaceAddress {
        PlaceAddress::new(self.host.clone(), self.world.clone(), place)
    }

    fn is_this_world(&self, address: &PlaceAddress) -> bool {
        self.address_of(&address.place).same_world(address)
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

struct Item {
    name: String,
    description: String,
}

struct Occupant {
    display_name: String,
    handle: Arc<dyn PersonHandle>,
}

impl Occupant {
    fn is(&self, person: &PersonRef) -> bool {
        self.handle.person() == person
    }
}

#[derive(Clone)]
enum Destination {
    Local(Weak<Place>),
    Remote(PlaceAddress),
}

struct Exit {
    name: String,
    destination: Destination,
}

#[derive(Default)]
struct PlaceState {
    description: String,
    items: Vec<Item>,
    occupants: Vec<Occupant>,
    exits: Vec<Exit>,
}

impl PlaceState {
    /// Display name of `person`, or `NotThere`.
    fn presence(&self, person: &PersonRef) -> Result<String, MudError> {
        self.occupants
            .iter()
            .find(|o| o.is(person))
            .map(|o| o.display_name.clone())
            .ok_or(MudError::NotThere)
    }

    fn has_exit(&self, name: &str) -> bool {
        self.exits.iter().any(|e| e.name == name)
    }

    fn recipients(&self) -> Vec<Arc<dyn PersonHandle>> {
        self.occupants.iter().map(|o| Arc::clone(&o.handle)).collect()
    }
}

// ── Place ─────────────────────────────────────────────────────────────────────

pub struct Place {
    name: String,
    me: Weak<Place>,
    ctx: Arc<WorldContext>,
    registry: Weak<PlaceRegistry>,
    state: Mutex<PlaceState>,
}

impl Place {
    /// Builds a place and registers it with the world in one step.
    ///
    /// # Errors
    ///
    /// [`MudError::PlaceAlreadyExists`] if the world already has a place
    /// called `name`; nothing is changed in that case.
    pub async fn create(
        name: &str,
        description: &str,
        ctx: &Arc<WorldContext>,
        registry: &Arc<PlaceRegistry>,
    ) -> Result<Arc<Place>, MudError> {
        let place = Arc::new_cyclic(|me| Place {
            name: name.to_string(),
            me: me.clone(),
            ctx: Arc::clone(ctx),
            registry: Arc::downgrade(registry),
            state: Mutex::new(PlaceState {
                description: description.to_string(),
                ..PlaceState::default()
            }),
        });
        registry.register(Arc::clone(&place)).await?;
        debug!(world = %ctx.world, place = %name, "place created");
        Ok(place)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> PlaceAddress {
        self.ctx.address_of(&self.name)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub async fn describe(&self) -> String {
        self.state.lock().await.description.clone()
    }

    pub async fn list_items(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.items.iter().map(|i| i.name.clone()).collect()
    }

    pub async fn list_occupants(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.occupants.iter().map(|o| o.display_name.clone()).collect()
    }

    pub async fn list_exits(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.exits.iter().map(|e| e.name.clone()).collect()
    }

    pub async fn lookup_occupant(&self, name: &str) -> Result<PersonRef, MudError> {
        let state = self.state.lock().await;
        state
            .occupants
            .iter()
            .find(|o| o.display_name == name)
            .map(|o| o.handle.person().clone())
            .ok_or_else(|| MudError::NoSuchPerson(name.to_string()))
    }

    pub async fn inspect_item(&self, name: &str) -> Result<String, MudError> {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.description.clone())
            .ok_or_else(|| MudError::NoSuchThing(name.to_string()))
    }

    /// `true` if `person` is currently an occupant.
    pub async fn contains(&self, person: &PersonRef) -> bool {
        self.state.lock().await.occupants.iter().any(|o| o.is(person))
    }

    // ── Movement ──────────────────────────────────────────────────────────────

    /// Moves `person` through `exit` and returns the destination.
    ///
    /// Leaving here and arriving there are two separate steps.  If the second
    /// step fails the person is in neither place and the error is returned.
    ///
    /// # Errors
    ///
    /// - [`MudError::NotThere`] / [`MudError::NoSuchExit`] on the way in.
    /// - [`MudError::AlreadyThere`] if the destination already lists `person`.
    /// - [`MudError::LinkFailed`] if a cross-server destination cannot be
    ///   resolved or refuses the arrival.
    pub async fn go(&self, person: &PersonRef, exit: &str) -> Result<PlaceAddress, MudError> {
        let destination = {
            let state = self.state.lock().await;
            state.presence(person)?;
            state
                .exits
                .iter()
                .find(|e| e.name == exit)
                .map(|e| e.destination.clone())
                .ok_or_else(|| MudError::NoSuchExit(exit.to_string()))?
        };

        match destination {
            Destination::Local(weak) => {
                let dest = weak
                    .upgrade()
                    .ok_or_else(|| MudError::LinkFailed(exit.to_string()))?;
                self.go_local(person, exit, dest).await
            }
            Destination::Remote(target) => self.go_remote(person, exit, target).await,
        }
    }

    async fn go_local(
        &self,
        person: &PersonRef,
        exit: &str,
        dest: Arc<Place>,
    ) -> Result<PlaceAddress, MudError> {
        // An exit may lead back here; then the person is expected to be present.
        let loops_back = std::ptr::eq(Arc::as_ptr(&dest), self);
        if !loops_back && dest.contains(person).await {
            return Err(MudError::AlreadyThere);
        }

        let occupant = self
            .take_occupant(person, |name| Some(format!("{name} has gone {exit}.")))
            .await
            .ok_or(MudError::NotThere)?;
        let greeting = format!("{} has arrived.", occupant.display_name);
        if let Err(e) = dest.admit(occupant, Some(greeting)).await {
            warn!(
                %person, from = %self.name, to = %dest.name,
                "arrival refused after departure: {e}"
            );
            return Err(e);
        }
        Ok(dest.address())
    }

    async fn go_remote(
        &self,
        person: &PersonRef,
        exit: &str,
        target: PlaceAddress,
    ) -> Result<PlaceAddress, MudError> {
        let remote = self.ctx.link.open(&target).await.map_err(|e| {
            info!(%target, "cross-server exit '{exit}' failed: {e}");
            MudError::LinkFailed(target.to_string())
        })?;

        let occupant = self
            .take_occupant(person, |name| Some(format!("{name} has gone {exit}.")))
            .await
            .ok_or(MudError::NotThere)?;
        let greeting = format!("{} has arrived.", occupant.display_name);

        match remote.join(person, &occupant.display_name, Some(greeting)).await {
            Ok(()) => Ok(remote.address()),
            Err(LinkError::Refused(MudError::AlreadyThere)) => {
                warn!(%person, %target, "remote place already lists person");
                Err(MudError::AlreadyThere)
            }
            Err(e) => {
                warn!(%person, %target, "person lost between servers: {e}");
                Err(MudError::LinkFailed(target.to_string()))
            }
        }
    }

    /// Removes `person` if present (a no-op otherwise) and tells the others
    /// `farewell` if given.
    pub async fn leave(&self, person: &PersonRef, farewell: Option<String>) {
        self.take_occupant(person, |_| farewell).await;
    }

    /// Adds `person` under `display_name`, telling those already here
    /// `greeting` first.
    ///
    /// # Errors
    ///
    /// [`MudError::AlreadyThere`] if the person is already an occupant or
    /// another occupant uses `display_name`.
    pub async fn join(
        &self,
        person: &PersonRef,
        display_name: &str,
        greeting: Option<String>,
    ) -> Result<(), MudError> {
        let occupant = Occupant {
            display_name: display_name.to_string(),
            handle: self.ctx.persons.connect(person),
        };
        self.admit(occupant, greeting).await
    }

    async fn take_occupant<F>(&self, person: &PersonRef, farewell: F) -> Option<Occupant>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let mut state = self.state.lock().await;
        let index = state.occupants.iter().position(|o| o.is(person))?;
        let occupant = state.occupants.remove(index);
        if let Some(text) = farewell(&occupant.display_name) {
            self.broadcast(state.recipients(), text);
        }
        debug!(place = %self.name, who = %occupant.display_name, "left");
        Some(occupant)
    }

    async fn admit(&self, occupant: Occupant, greeting: Option<String>) -> Result<(), MudError> {
        let mut state = self.state.lock().await;
        let person = occupant.handle.person();
        if state
            .occupants
            .iter()
            .any(|o| o.is(person) || o.display_name == occupant.display_name)
        {
            return Err(MudError::AlreadyThere);
        }
        if let Some(text) = greeting {
            self.broadcast(state.recipients(), text);
        }
        debug!(place = %self.name, who = %occupant.display_name, "joined");
        state.occupants.push(occupant);
        Ok(())
    }

    // ── Talk ──────────────────────────────────────────────────────────────────

    pub async fn say(&self, person: &PersonRef, text: &str) -> Result<(), MudError> {
        let state = self.state.lock().await;
        let name = state.presence(person)?;
        self.broadcast(state.recipients(), format!("{name}: {text}"));
        Ok(())
    }

    pub async fn act(&self, person: &PersonRef, text: &str) -> Result<(), MudError> {
        let state = self.state.lock().await;
        let name = state.presence(person)?;
        self.broadcast(state.recipients(), format!("{name} {text}"));
        Ok(())
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    pub async fn create_item(
        &self,
        person: &PersonRef,
        name: &str,
        description: &str,
    ) -> Result<(), MudError> {
        let mut state = self.state.lock().await;
        let actor = state.presence(person)?;
        if state.items.iter().any(|i| i.name == name) {
            return Err(MudError::AlreadyThere);
        }
        state.items.push(Item {
            name: name.to_string(),
            description: description.to_string(),
        });
        self.broadcast(state.recipients(), format!("{actor} has created a {name}."));
        Ok(())
    }

    pub async fn destroy_item(&self, person: &PersonRef, name: &str) -> Result<(), MudError> {
        let mut state = self.state.lock().await;
        let actor = state.presence(person)?;
        let index = state
            .items
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| MudError::NoSuchThing(name.to_string()))?;
        state.items.remove(index);
        self.broadcast(state.recipients(), format!("{actor} has destroyed the {name}."));
        Ok(())
    }

    // ── Exits ─────────────────────────────────────────────────────────────────

    /// Creates a new place and joins it to this one with a pair of exits.
    ///
    /// # Errors
    ///
    /// [`MudError::ExitAlreadyExists`] if `exit` is taken here,
    /// [`MudError::PlaceAlreadyExists`] if `place` is taken in the world.
    /// Nothing changes in either case.
    pub async fn create_exit(
        &self,
        person: &PersonRef,
        exit: &str,
        return_exit: &str,
        place: &str,
        description: &str,
    ) -> Result<(), MudError> {
        let registry = self.registry()?;
        let mut state = self.state.lock().await;
        let actor = state.presence(person)?;
        if state.has_exit(exit) {
            return Err(MudError::ExitAlreadyExists(exit.to_string()));
        }

        let new_place = Place::create(place, description, &self.ctx, &registry).await?;
        new_place
            .push_exit(return_exit, Destination::Local(self.me.clone()))
            .await;
        state.exits.push(Exit {
            name: exit.to_string(),
            destination: Destination::Local(Arc::downgrade(&new_place)),
        });

        info!(world = %self.ctx.world, from = %self.name, to = %place, "new place");
        self.broadcast(
            state.recipients(),
            format!("{actor} has created a new place: {exit}."),
        );
        Ok(())
    }

    /// Adds a one-way exit to `target`, which may be on another server.
    ///
    /// The target is checked once, now; it may still be gone by the time
    /// someone uses the exit.  No exit is created in the other direction.
    ///
    /// # Errors
    ///
    /// - [`MudError::ExitAlreadyExists`] if `exit` is taken here.
    /// - [`MudError::NoSuchPlace`] if the target is in this world and has
    ///   no such place.
    /// - [`MudError::LinkFailed`] if a target on another world cannot be
    ///   resolved, whether the host, the world or the place is missing.
    pub async fn link_exit(
        &self,
        person: &PersonRef,
        exit: &str,
        target: PlaceAddress,
    ) -> Result<(), MudError> {
        {
            let state = self.state.lock().await;
            state.presence(person)?;
            if state.has_exit(exit) {
                return Err(MudError::ExitAlreadyExists(exit.to_string()));
            }
        }

        // Resolved without holding the lock: the remote lookup may be slow.
        let destination = if self.ctx.is_this_world(&target) {
            let dest = self.registry()?.resolve(&target.place).await?;
            Destination::Local(Arc::downgrade(&dest))
        } else {
            match self.ctx.link.open(&target).await {
                Ok(remote) => Destination::Remote(remote.address()),
                Err(e) => {
                    info!(%target, "link check failed: {e}");
                    return Err(MudError::LinkFailed(target.to_string()));
                }
            }
        };

        let mut state = self.state.lock().await;
        let actor = state.presence(person)?;
        if state.has_exit(exit) {
            return Err(MudError::ExitAlreadyExists(exit.to_string()));
        }
        state.exits.push(Exit {
            name: exit.to_string(),
            destination,
        });
        self.broadcast(
            state.recipients(),
            format!("{actor} has linked {exit} to {}.", target.place),
        );
        Ok(())
    }

    /// Removes the outgoing exit only; any exit leading back is untouched.
    pub async fn close_exit(&self, person: &PersonRef, exit: &str) -> Result<(), MudError> {
        let mut state = self.state.lock().await;
        let actor = state.presence(person)?;
        let index = state
            .exits
            .iter()
            .position(|e| e.name == exit)
            .ok_or_else(|| MudError::NoSuchExit(exit.to_string()))?;
        state.exits.remove(index);
        self.broadcast(state.recipients(), format!("{actor} has closed exit {exit}."));
        Ok(())
    }

    async fn push_exit(&self, name: &str, destination: Destination) {
        self.state.lock().await.exits.push(Exit {
            name: name.to_string(),
            destination,
        });
    }

    fn registry(&self) -> Result<Arc<PlaceRegistry>, MudError> {
        self.registry
            .upgrade()
            .ok_or_else(|| MudError::BadRequest("world is shutting down".to_string()))
    }

    // ── Broadcast ─────────────────────────────────────────────────────────────

    /// Delivers `text` to `recipients` on a separate task, one after another.
    /// Anyone who cannot be reached is removed from this place.
    fn broadcast(&self, recipients: Vec<Arc<dyn PersonHandle>>, text: String) {
        if recipients.is_empty() {
            return;
        }
        let place = self.me.clone();
        let timeout = self.ctx.delivery_timeout;
        tokio::spawn(async move {
            for handle in recipients {
                let outcome = match time::timeout(timeout, handle.tell(&text)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DeliveryError::TimedOut {
                        person: handle.person().to_string(),
                        after: timeout,
                    }),
                };
                if let Err(e) = outcome {
                    if let Some(place) = place.upgrade() {
                        warn!(place = %place.name, "{e}; dropping occupant");
                        place.evict(&handle).await;
                    }
                }
            }
        });
    }

    async fn evict(&self, handle: &Arc<dyn PersonHandle>) {
        let mut state = self.state.lock().await;
        state.occupants.retain(|o| !Arc::ptr_eq(&o.handle, handle));
    }

    // ── Snapshot support ──────────────────────────────────────────────────────

    /// Everything but the occupants, with local exits reduced to names.
    pub async fn export(&self) -> PlaceRecord {
        let state = self.state.lock().await;
        PlaceRecord {
            name: self.name.clone(),
            description: state.description.clone(),
            items: state
                .items
                .iter()
                .map(|i| ItemRecord {
                    name: i.name.clone(),
                    description: i.description.clone(),
                })
                .collect(),
            exits: state
                .exits
                .iter()
                .filter_map(|e| {
                    let target = match &e.destination {
                        Destination::Local(weak) => ExitTargetRecord::Local {
                            place: weak.upgrade()?.name.clone(),
                        },
                        Destination::Remote(address) => ExitTargetRecord::Remote(address.clone()),
                    };
                    Some(ExitRecord {
                        name: e.name.clone(),
                        target,
                    })
                })
                .collect(),
        }
    }

    /// Fills in items and exits from `record`.  Every place the record's
    /// local exits name must already be registered.
    pub(crate) async fn restore_contents(
        &self,
        record: &PlaceRecord,
        registry: &PlaceRegistry,
    ) -> Result<(), SnapshotError> {
        let mut exits = Vec::with_capacity(record.exits.len());
        for exit in &record.exits {
            let destination = match &exit.target {
                ExitTargetRecord::Local { place } => {
                    let dest = registry.resolve(place).await.map_err(|_| {
                        SnapshotError::Inconsistent(format!(
                            "exit '{}' of '{}' leads to unknown place '{place}'",
                            exit.name, record.name
                        ))
                    })?;
                    Destination::Local(Arc::downgrade(&dest))
                }
                ExitTargetRecord::Remote(address) => Destination::Remote(address.clone()),
            };
            exits.push(Exit {
                name: exit.name.clone(),
                destination,
            });
        }

        let mut state = self.state.lock().await;
        state.items = record
            .items
            .iter()
            .map(|i| Item {
                name: i.name.clone(),
                description: i.description.clone(),
            })
            .collect();
        state.exits = exits;
        Ok(())
    }
}

impl std::fmt::Debug for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Place")
            .field("world", &self.ctx.world)
            .field("name", &self.name)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

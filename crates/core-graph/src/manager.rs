use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use core_properties::{Properties, PropertyNode};

use crate::component::{Component, ComponentMeta};
use crate::error::{Error, StartupErrors};
use crate::input::Input;
use crate::output::Output;
use crate::process::HelperProcess;
use crate::registry::ComponentFactory;
use crate::transition::Transition;
use crate::{PollEvent, ReadyEvent};

const DEFAULT_UPDATE_INTERVAL_MS: u64 = 40;

/// Owner of the component graph and the reactor.
///
/// Construction materializes every component of the configuration document
/// through the factory; `run` fires `ready` once, launches declared helper
/// processes, and drives the tick loop until a termination signal stops
/// the reactor.
pub struct Manager {
    update_interval: Duration,
    factory: ComponentFactory,
    components: HashMap<String, Rc<dyn Component>>,
    ready_event: ReadyEvent,
    poll_event: PollEvent,
    errors: StartupErrors,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Manager {
    pub fn new(factory: ComponentFactory, properties: &Properties) -> Result<Manager, Error> {
        let root = properties.node();

        let interval_node = root.child_or("updateInterval", DEFAULT_UPDATE_INTERVAL_MS)?;
        let update_interval = if interval_node.is::<u64>() {
            Duration::from_millis(interval_node.value()?)
        } else {
            interval_node.value()?
        };

        let mut manager = Manager {
            update_interval,
            factory,
            components: HashMap::new(),
            ready_event: ReadyEvent::new(),
            poll_event: PollEvent::new(),
            errors: StartupErrors::new(),
        };

        let components_node = root.child("components")?;
        for node in components_node.iter()? {
            manager.create_component(&node, false)?;
        }

        Ok(manager)
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn ready_event(&self) -> &ReadyEvent {
        &self.ready_event
    }

    pub fn poll_event(&self) -> &PollEvent {
        &self.poll_event
    }

    pub fn startup_errors(&self) -> StartupErrors {
        self.errors.clone()
    }

    pub fn find(&self, id: &str) -> Option<Rc<dyn Component>> {
        self.components.get(id).cloned()
    }

    fn create_component(
        &mut self,
        node: &PropertyNode<'_>,
        anonymous: bool,
    ) -> Result<Rc<dyn Component>, Error> {
        let type_name: String = node.get("type")?;
        let id: String = if !anonymous || node.has("id") {
            node.get("id")?
        } else {
            self.factory.generate_id(&type_name)
        };

        let (category, name, constructor) = self.factory.resolve(&type_name, &id)?;
        let meta = ComponentMeta::new(category, name, id);
        let component = constructor(self, meta, node)?;

        let id = component.meta().id.clone();
        if self.components.contains_key(&id) {
            return Err(Error::DuplicateId { id });
        }
        self.components.insert(id.clone(), component.clone());
        info!(
            target: "graph.manager",
            id = %id,
            r#type = %type_name,
            "component created"
        );
        Ok(component)
    }

    /// Resolves a dependency node for `requester`: a string is an id
    /// reference, anything else an inline definition created recursively.
    pub fn component(
        &mut self,
        requester: &ComponentMeta,
        node: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        if node.is::<String>() {
            let id: String = node.value()?;
            self.components
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::UnknownDependency {
                    requester: requester.id.clone(),
                    id,
                })
        } else {
            self.create_component(node, true)
        }
    }

    pub fn input(
        &mut self,
        requester: &ComponentMeta,
        node: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Input>, Error> {
        let component = self.component(requester, node)?;
        let id = component.meta().id.clone();
        component
            .as_input()
            .ok_or_else(|| Error::WrongDependencyType {
                requester: requester.id.clone(),
                id,
                expected: "input",
            })
    }

    pub fn output(
        &mut self,
        requester: &ComponentMeta,
        node: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Output>, Error> {
        let component = self.component(requester, node)?;
        let id = component.meta().id.clone();
        component
            .as_output()
            .ok_or_else(|| Error::WrongDependencyType {
                requester: requester.id.clone(),
                id,
                expected: "output",
            })
    }

    pub fn transition(
        &mut self,
        requester: &ComponentMeta,
        node: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Transition>, Error> {
        let component = self.component(requester, node)?;
        let id = component.meta().id.clone();
        component
            .as_transition()
            .ok_or_else(|| Error::WrongDependencyType {
                requester: requester.id.clone(),
                id,
                expected: "transition",
            })
    }

    /// Resolves a dependency to a concrete standalone type (broker client,
    /// hardware bus). `expected` names the capability in the error.
    pub fn standalone<C: Component>(
        &mut self,
        requester: &ComponentMeta,
        node: &PropertyNode<'_>,
        expected: &'static str,
    ) -> Result<Rc<C>, Error> {
        let component = self.component(requester, node)?;
        let id = component.meta().id.clone();
        component
            .as_any()
            .downcast()
            .map_err(|_| Error::WrongDependencyType {
                requester: requester.id.clone(),
                id,
                expected,
            })
    }

    /// Builds the single-threaded reactor and drives it to completion.
    pub fn run(self) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let local = tokio::task::LocalSet::new();
        runtime.block_on(local.run_until(self.run_inner()))
    }

    async fn run_inner(self) -> Result<(), Error> {
        let mut helpers = self.spawn_helpers()?;

        let result = async {
            self.ready_event.fire(&());
            if let Some(error) = self.errors.take_first() {
                return Err(error);
            }
            info!(target: "graph.manager", "setup finished, running");
            self.tick_loop().await
        }
        .await;

        for helper in &mut helpers {
            helper.shutdown().await;
        }
        result
    }

    fn spawn_helpers(&self) -> Result<Vec<HelperProcess>, Error> {
        let mut helpers = Vec::new();
        for component in self.components.values() {
            if let Some(command) = component.helper_process() {
                helpers.push(HelperProcess::spawn(command)?);
            }
        }
        Ok(helpers)
    }

    #[cfg(unix)]
    async fn tick_loop(&self) -> Result<(), Error> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        let mut ticker = tokio::time::interval(self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut last = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now - last;
                    last = now;
                    self.poll_event.fire(&elapsed);
                }
                _ = interrupt.recv() => {
                    info!(target: "graph.manager", "received SIGINT, shutting down");
                    break;
                }
                _ = terminate.recv() => {
                    info!(target: "graph.manager", "received SIGTERM, shutting down");
                    break;
                }
            }
        }
        debug!(target: "graph.manager", "tick loop stopped");
        Ok(())
    }

    #[cfg(not(unix))]
    async fn tick_loop(&self) -> Result<(), Error> {
        let mut ticker = tokio::time::interval(self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut last = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now - last;
                    last = now;
                    self.poll_event.fire(&elapsed);
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!(target: "graph.manager", "received interrupt, shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

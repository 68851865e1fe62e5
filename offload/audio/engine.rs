// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration engine
//!
//! Drives the lifecycle of the operations of a chip:
//!
//! ```text
//!             start                  done
//!   Idle  ------------>  Starting  --------->  Running
//!    ^                      |  ^                 |  |
//!    |      chip failure    |  | change resource |  | stop
//!    |<---------------------'  '-----------------'  |
//!    |                   or configuration           v
//!    '---------------------------------------  Stopping
//!                        done
//! ```
//!
//! Each transition configures (or stops) the resources of the operation one
//! after the other in the chip. A step may complete asynchronously; the
//! sequence then resumes from the chip completion callback, and the end of the
//! sequence is reported to the callbacks registered on the operation.

use crate::allocation::AllocationEngine;
use crate::chip::{ChipLayer, ChipStatus, CompletionCallback};
use crate::config::VacConfig;
use crate::error::{Result, UnavailableResource, VacError};
use crate::mapping::MappingEngine;
use crate::snapshot::{OperationSnapshot, ResourceSnapshot, Snapshot};
use crate::types::{
    ChipId, Completion, DigitalConfig, Event, Operation, OperationState, Resource,
    ResourceProperties,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Maximum number of callbacks registered on an operation
pub const MAX_CALLBACKS_PER_OPERATION: usize = 2;

/// Completion of requests answered with `Completion::Pending`
pub trait OperationCallbacks: Send + Sync {
    fn on_operation_complete(&self, operation: Operation, event: Event, result: Result<()>);
}

impl<F> OperationCallbacks for F
where
    F: Fn(Operation, Event, Result<()>) + Send + Sync,
{
    fn on_operation_complete(&self, operation: Operation, event: Event, result: Result<()>) {
        self(operation, event, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Configure,
    Stop,
}

/// Sequence of chip steps in flight
struct Transition {
    /// Tells apart completions of an older sequence
    id: u64,
    event: Event,
    direction: Direction,
    steps: Vec<Resource>,
    cursor: usize,
    config: DigitalConfig,
}

#[derive(Default)]
struct OperationEntry {
    supported: bool,
    state: OperationState,
    /// Resources allocated to the operation
    resources: Vec<Resource>,
    /// Digital configuration applied in the chip
    config: DigitalConfig,
    transition: Option<Transition>,
    callbacks: Vec<(u32, Arc<dyn OperationCallbacks>)>,
}

struct State {
    mapping: MappingEngine,
    allocation: AllocationEngine,
    operations: Vec<OperationEntry>,
    next_callback_id: u32,
}

struct Inner {
    chip_id: ChipId,
    chip: Arc<dyn ChipLayer>,
    state: Mutex<State>,
    next_transition_id: AtomicU64,
}

struct Step {
    resource: Resource,
    cursor: usize,
    direction: Direction,
    config: DigitalConfig,
    properties: ResourceProperties,
}

/// Where a sequence stands after driving it
enum Progress {
    Complete(Event),
    /// Waiting on the chip, or nothing left to report
    Pending,
    Failed(Event, Resource),
}

/// Audio resource manager of a chip instance.
/// Handles are cheap to clone and share the same instance.
#[derive(Clone)]
pub struct ConfigurationEngine {
    inner: Arc<Inner>,
}

fn supported(
    operations: &mut [OperationEntry],
    operation: Operation,
) -> Result<&mut OperationEntry> {
    let entry = &mut operations[operation as usize];
    if !entry.supported {
        log::warn!("Request on unsupported operation {}", operation);
        return Err(VacError::OperationNotSupported(operation));
    }
    Ok(entry)
}

/// Resources of `operation`, each one appearing once
fn resource_list(mapping: &MappingEngine, operation: Operation) -> Vec<Resource> {
    let mut resources = Vec::new();
    for resource in mapping.operation_to_resource_list(operation) {
        if !resources.contains(&resource) {
            resources.push(resource);
        }
    }
    resources
}

/// Allocates all `resources` to `operation`, or none of them.
/// On failure, every resource that could not be granted is reported.
fn allocate(
    allocation: &mut AllocationEngine,
    operation: Operation,
    resources: &[Resource],
) -> Result<()> {
    let mut granted = Vec::with_capacity(resources.len());
    let mut unavailable = Vec::new();
    for &resource in resources {
        match allocation.try_allocate(resource, operation) {
            Ok(()) => granted.push(resource),
            Err(denial) => {
                unavailable.push(UnavailableResource { resource, owner: denial.owner() })
            }
        }
    }

    if unavailable.is_empty() {
        return Ok(());
    }

    release(allocation, operation, &granted);
    log::info!("{}: unavailable resources {:?}", operation, unavailable);
    Err(VacError::UnavailableResources(unavailable))
}

fn release(allocation: &mut AllocationEngine, operation: Operation, resources: &[Resource]) {
    for &resource in resources {
        allocation.release(resource, operation);
    }
}

/// Ends the sequence of `entry`, once every step succeeded
fn complete(
    allocation: &mut AllocationEngine,
    operation: Operation,
    entry: &mut OperationEntry,
) -> Progress {
    let Some(transition) = entry.transition.take() else {
        return Progress::Pending;
    };

    match transition.direction {
        Direction::Configure => {
            entry.state = OperationState::Running;
            entry.config = transition.config;
        }
        Direction::Stop => {
            release(allocation, operation, &entry.resources);
            entry.resources.clear();
            entry.state = OperationState::Idle;
        }
    }

    log::info!("{}: {:?} done, now {:?}", operation, transition.event, entry.state);
    Progress::Complete(transition.event)
}

fn current(entry: &mut OperationEntry, id: u64, cursor: usize) -> Option<&mut Transition> {
    entry.transition.as_mut().filter(|t| t.id == id && t.cursor == cursor)
}

impl ConfigurationEngine {
    /// Engine of the chip `chip_id`. No operation is supported before `configure()`.
    pub fn new(chip_id: ChipId, chip: Arc<dyn ChipLayer>) -> Self {
        let state = State {
            mapping: MappingEngine::new(),
            allocation: AllocationEngine::new(),
            operations: Operation::all().map(|_| OperationEntry::default()).collect(),
            next_callback_id: 0,
        };

        Self {
            inner: Arc::new(Inner {
                chip_id,
                chip,
                state: Mutex::new(state),
                next_transition_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn chip_id(&self) -> ChipId {
        self.inner.chip_id
    }

    /// Checks the configuration against the chip capabilities and loads it.
    /// The previous configuration is left untouched on error.
    pub fn configure(&self, config: &VacConfig) -> Result<()> {
        let capabilities = self.inner.chip.capabilities();

        if config.operations.is_empty() {
            return Err(VacError::InvalidConfiguration("no operation enabled".to_string()));
        }

        let mut operations = Vec::with_capacity(config.operations.len());
        for name in &config.operations {
            let operation: Operation =
                name.parse().map_err(|e| VacError::InvalidConfiguration(format!("{}", e)))?;
            if !capabilities.supports_operation(operation) {
                return Err(VacError::InvalidConfiguration(format!(
                    "operation {} is not supported by chip {}",
                    operation, self.inner.chip_id
                )));
            }
            operations.push(operation);
        }

        let mut mapping = MappingEngine::new();
        mapping.configure(&capabilities, config)?;

        let mut allocation = AllocationEngine::new();
        allocation.configure(&capabilities, config)?;

        let mut state = self.inner.state.lock().unwrap();
        if let Some(busy) =
            Operation::all().find(|&op| state.operations[op as usize].state != OperationState::Idle)
        {
            return Err(VacError::Busy(busy));
        }

        state.mapping = mapping;
        state.allocation = allocation;
        for operation in Operation::all() {
            let entry = &mut state.operations[operation as usize];
            entry.supported = operations.contains(&operation);
            entry.resources.clear();
        }

        log::info!("Chip {} configured with operations {:?}", self.inner.chip_id, operations);
        Ok(())
    }

    /// Registers a completion callback on `operation`, returning its id
    pub fn register_callback(
        &self,
        operation: Operation,
        callback: Arc<dyn OperationCallbacks>,
    ) -> Result<u32> {
        let mut guard = self.inner.state.lock().unwrap();
        let state = &mut *guard;
        let entry = &mut state.operations[operation as usize];
        if entry.callbacks.len() >= MAX_CALLBACKS_PER_OPERATION {
            log::error!("{}: {} callbacks already registered", operation, entry.callbacks.len());
            return Err(VacError::TooManyCallbacks(operation));
        }

        state.next_callback_id += 1;
        let id = state.next_callback_id;
        entry.callbacks.push((id, callback));
        log::debug!("{}: callback {} registered", operation, id);
        Ok(id)
    }

    pub fn unregister_callback(&self, operation: Operation, id: u32) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        let callbacks = &mut state.operations[operation as usize].callbacks;
        let Some(index) = callbacks.iter().position(|(cb_id, _)| *cb_id == id) else {
            return Err(VacError::UnknownCallback { operation, id });
        };
        callbacks.remove(index);
        Ok(())
    }

    /// Allocates and configures the resources of `operation`
    pub fn start_operation(
        &self,
        operation: Operation,
        config: DigitalConfig,
    ) -> Result<Completion> {
        let id = {
            let mut guard = self.inner.state.lock().unwrap();
            let state = &mut *guard;
            let entry = supported(&mut state.operations, operation)?;

            match entry.state {
                OperationState::Running => return Ok(Completion::Done),
                OperationState::Starting => {
                    return match &entry.transition {
                        Some(t) if t.event == Event::Started => Ok(Completion::Pending),
                        _ => Err(VacError::Busy(operation)),
                    };
                }
                OperationState::Stopping => return Err(VacError::Busy(operation)),
                OperationState::Idle => (),
            }

            let resources = resource_list(&state.mapping, operation);
            allocate(&mut state.allocation, operation, &resources)?;

            log::info!("{}: starting with {:?}", operation, resources);
            entry.resources = resources.clone();
            entry.state = OperationState::Starting;
            self.inner.begin(entry, Event::Started, Direction::Configure, resources, config)
        };

        self.inner.run(operation, id)
    }

    /// Stops the resources of `operation` in the chip, and releases them
    pub fn stop_operation(&self, operation: Operation) -> Result<Completion> {
        let id = {
            let mut guard = self.inner.state.lock().unwrap();
            let state = &mut *guard;
            let entry = supported(&mut state.operations, operation)?;

            match entry.state {
                OperationState::Idle => return Ok(Completion::Done),
                OperationState::Stopping => return Ok(Completion::Pending),
                OperationState::Starting => return Err(VacError::Busy(operation)),
                OperationState::Running => (),
            }

            log::info!("{}: stopping {:?}", operation, entry.resources);
            entry.state = OperationState::Stopping;
            let steps = entry.resources.clone();
            let config = entry.config.clone();
            self.inner.begin(entry, Event::Stopped, Direction::Stop, steps, config)
        };

        self.inner.run(operation, id)
    }

    /// Selects the optional resources of `operation`.
    ///
    /// A running operation swaps its resources, and configures the new ones in
    /// the chip. When the new resources cannot be allocated, the operation keeps
    /// its previous resources and selection.
    pub fn change_resource(
        &self,
        operation: Operation,
        selection: &[Resource],
        config: DigitalConfig,
    ) -> Result<Completion> {
        let id = {
            let mut guard = self.inner.state.lock().unwrap();
            let state = &mut *guard;
            let entry = supported(&mut state.operations, operation)?;

            match entry.state {
                OperationState::Starting | OperationState::Stopping => {
                    return Err(VacError::Busy(operation))
                }
                OperationState::Idle => {
                    state.mapping.set_optional_resources(operation, selection)?;
                    return Ok(Completion::Done);
                }
                OperationState::Running => (),
            }

            let previous_selection = state.mapping.optional_resources(operation);
            state.mapping.set_optional_resources(operation, selection)?;

            // Kept resources stay allocated, so that their owners keep their order
            let resources = resource_list(&state.mapping, operation);
            let added: Vec<Resource> =
                resources.iter().filter(|&r| !entry.resources.contains(r)).copied().collect();
            let removed: Vec<Resource> =
                entry.resources.iter().filter(|&r| !resources.contains(r)).copied().collect();

            if let Err(e) = allocate(&mut state.allocation, operation, &added) {
                if let Err(restore) =
                    state.mapping.set_optional_resources(operation, &previous_selection)
                {
                    log::error!("{}: cannot restore selection: {}", operation, restore);
                }
                return Err(e);
            }
            release(&mut state.allocation, operation, &removed);

            log::info!("{}: resources {:?} -> {:?}", operation, entry.resources, resources);
            entry.resources = resources;
            entry.state = OperationState::Starting;
            self.inner.begin(entry, Event::ResourceChanged, Direction::Configure, added, config)
        };

        self.inner.run(operation, id)
    }

    /// Pushes new digital parameters to the resources of a running operation
    pub fn change_configuration(
        &self,
        operation: Operation,
        config: DigitalConfig,
    ) -> Result<Completion> {
        let id = {
            let mut guard = self.inner.state.lock().unwrap();
            let state = &mut *guard;
            let entry = supported(&mut state.operations, operation)?;

            if entry.state != OperationState::Running {
                log::warn!("{}: configuration change while {:?}", operation, entry.state);
                return Err(VacError::Busy(operation));
            }

            entry.state = OperationState::Starting;
            let steps = entry.resources.clone();
            let event = Event::ConfigurationChanged;
            self.inner.begin(entry, event, Direction::Configure, steps, config)
        };

        self.inner.run(operation, id)
    }

    pub fn set_resource_properties(&self, resource: Resource, properties: ResourceProperties) {
        let mut state = self.inner.state.lock().unwrap();
        state.allocation.set_resource_properties(resource, properties);
    }

    pub fn resource_properties(&self, resource: Resource) -> ResourceProperties {
        self.inner.state.lock().unwrap().allocation.resource_properties(resource).clone()
    }

    pub fn is_supported(&self, operation: Operation) -> bool {
        self.inner.state.lock().unwrap().operations[operation as usize].supported
    }

    pub fn operation_state(&self, operation: Operation) -> OperationState {
        self.inner.state.lock().unwrap().operations[operation as usize].state
    }

    /// Resources currently allocated to `operation`
    pub fn resources(&self, operation: Operation) -> Vec<Resource> {
        self.inner.state.lock().unwrap().operations[operation as usize].resources.clone()
    }

    pub fn optional_resources(&self, operation: Operation) -> Vec<Resource> {
        self.inner.state.lock().unwrap().mapping.optional_resources(operation)
    }

    /// Resources `operation` would use if started now
    pub fn operation_to_resource_list(&self, operation: Operation) -> Vec<Resource> {
        resource_list(&self.inner.state.lock().unwrap().mapping, operation)
    }

    pub fn owners(&self, resource: Resource) -> Vec<Operation> {
        self.inner.state.lock().unwrap().allocation.owners(resource).to_vec()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock().unwrap();
        Snapshot {
            chip_id: self.inner.chip_id,
            operations: Operation::all()
                .map(|operation| {
                    let entry = &state.operations[operation as usize];
                    OperationSnapshot {
                        operation,
                        supported: entry.supported,
                        state: entry.state,
                        resources: entry.resources.clone(),
                        optional: state.mapping.optional_resources(operation),
                    }
                })
                .collect(),
            resources: Resource::all()
                .map(|resource| ResourceSnapshot {
                    resource,
                    available: state.allocation.is_available(resource),
                    owners: state.allocation.owners(resource).to_vec(),
                })
                .collect(),
        }
    }
}

impl Inner {
    fn begin(
        &self,
        entry: &mut OperationEntry,
        event: Event,
        direction: Direction,
        steps: Vec<Resource>,
        config: DigitalConfig,
    ) -> u64 {
        let id = self.next_transition_id.fetch_add(1, Ordering::Relaxed);
        entry.transition = Some(Transition { id, event, direction, steps, cursor: 0, config });
        id
    }

    /// Drives the sequence from the requesting thread
    fn run(self: &Arc<Self>, operation: Operation, id: u64) -> Result<Completion> {
        match self.drive(operation, id) {
            Progress::Complete(_) => Ok(Completion::Done),
            Progress::Pending => Ok(Completion::Pending),
            Progress::Failed(_, resource) => Err(VacError::ChipFailure { operation, resource }),
        }
    }

    /// Runs the steps of the sequence until one is pending in the chip,
    /// or the sequence ends. The chip is called with the lock released.
    fn drive(self: &Arc<Self>, operation: Operation, id: u64) -> Progress {
        loop {
            let step = {
                let mut guard = self.state.lock().unwrap();
                let state = &mut *guard;
                let entry = &mut state.operations[operation as usize];

                let Some(transition) = entry.transition.as_ref().filter(|t| t.id == id) else {
                    log::error!("{}: sequence {} is gone", operation, id);
                    return Progress::Pending;
                };
                let Some(resource) = transition.steps.get(transition.cursor).copied() else {
                    return complete(&mut state.allocation, operation, entry);
                };

                Step {
                    resource,
                    cursor: transition.cursor,
                    direction: transition.direction,
                    config: transition.config.clone(),
                    properties: state.allocation.resource_properties(resource).clone(),
                }
            };

            let done = self.completion(operation, id, step.cursor, step.resource);
            let status = match step.direction {
                Direction::Configure => self.chip.configure_resource(
                    operation,
                    step.resource,
                    &step.config,
                    &step.properties,
                    done,
                ),
                Direction::Stop => self.chip.stop_resource_configuration(
                    operation,
                    step.resource,
                    &step.properties,
                    done,
                ),
            };

            log::debug!("{}: {:?} {} -> {:?}", operation, step.direction, step.resource, status);
            match status {
                ChipStatus::Success => {
                    if !self.advance(operation, id, step.cursor) {
                        return Progress::Pending;
                    }
                }
                ChipStatus::Pending => return Progress::Pending,
                ChipStatus::Failure => return self.fail(operation, id, step.cursor, step.resource),
            }
        }
    }

    fn completion(
        self: &Arc<Self>,
        operation: Operation,
        id: u64,
        cursor: usize,
        resource: Resource,
    ) -> CompletionCallback {
        let inner = Arc::downgrade(self);
        Box::new(move |status| match inner.upgrade() {
            Some(inner) => inner.on_step_complete(operation, id, cursor, resource, status),
            None => log::warn!("{}: completion of {} after engine release", operation, resource),
        })
    }

    fn on_step_complete(
        self: &Arc<Self>,
        operation: Operation,
        id: u64,
        cursor: usize,
        resource: Resource,
        status: ChipStatus,
    ) {
        let progress = match status {
            ChipStatus::Success => {
                if !self.advance(operation, id, cursor) {
                    return;
                }
                self.drive(operation, id)
            }
            ChipStatus::Failure => self.fail(operation, id, cursor, resource),
            ChipStatus::Pending => {
                log::error!("{}: {} completed as pending, taken as a failure", operation, resource);
                self.fail(operation, id, cursor, resource)
            }
        };

        match progress {
            Progress::Pending => (),
            Progress::Complete(event) => self.notify(operation, event, Ok(())),
            Progress::Failed(event, resource) => {
                self.notify(operation, event, Err(VacError::ChipFailure { operation, resource }))
            }
        }
    }

    /// Moves past the step `cursor`, when it is still the one in flight
    fn advance(&self, operation: Operation, id: u64, cursor: usize) -> bool {
        let mut state = self.state.lock().unwrap();
        match current(&mut state.operations[operation as usize], id, cursor) {
            Some(transition) => {
                transition.cursor += 1;
                true
            }
            None => {
                log::warn!("{}: ignoring stale completion of step {}", operation, cursor);
                false
            }
        }
    }

    /// Abandons the sequence after a chip failure. The operation gets back to
    /// idle, and its resources are released.
    fn fail(&self, operation: Operation, id: u64, cursor: usize, resource: Resource) -> Progress {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let entry = &mut state.operations[operation as usize];

        let Some(event) = current(entry, id, cursor).map(|t| t.event) else {
            log::warn!("{}: ignoring stale failure of step {}", operation, cursor);
            return Progress::Pending;
        };

        log::error!("{}: chip failure on {}, releasing {:?}", operation, resource, entry.resources);
        entry.transition = None;
        release(&mut state.allocation, operation, &entry.resources);
        entry.resources.clear();
        entry.state = OperationState::Idle;
        Progress::Failed(event, resource)
    }

    /// Reports the end of a sequence, the lock is not held while calling back
    fn notify(&self, operation: Operation, event: Event, result: Result<()>) {
        let callbacks: Vec<_> = {
            let state = self.state.lock().unwrap();
            let entry = &state.operations[operation as usize];
            entry.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };

        if callbacks.is_empty() {
            log::warn!("{}: {:?} completed without registered callback", operation, event);
        }
        for callback in callbacks {
            callback.on_operation_complete(operation, event, result.clone());
        }
    }
}

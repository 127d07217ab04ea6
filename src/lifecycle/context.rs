//! Lifecycle context shared by every module.
//!
//! Owns the instance table, the per-instance initialization state and the
//! global options. Modules receive an [`InitContext`] in `init` and may use
//! it to look up and eagerly initialize the instances they depend on.
//!
//! An instance counts as initialized from the moment its init call is
//! claimed. A failed init stays marked and is never retried.
//!
//! Lazy requests made from inside an init are recorded as edges
//! `requester → requested` until they complete. A request that would wait
//! on an instance which (transitively) waits on the requester is a
//! dependency cycle, whichever threads the inits run on.

use std::any::Any;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::config::GlobalOptions;
use crate::error::Error;
use crate::lifecycle::shutdown::Shutdown;
use crate::module::registry::Entry;
use crate::module::{Instance, ModuleConfig, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Pending,
    /// Init is running on the given thread.
    Initializing(ThreadId),
    Ready,
    Failed,
}

#[derive(Debug)]
struct InitSlot {
    state: Mutex<InitState>,
    done: Condvar,
}

impl InitSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(InitState::Pending),
            done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-flight lazy requests between instances, by registration index.
#[derive(Debug, Default)]
struct WaitGraph {
    edges: Vec<(usize, usize)>,
}

impl WaitGraph {
    /// True if `to` can be reached from `from` following request edges.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(self.edges.iter().filter(|(a, _)| *a == node).map(|(_, b)| *b));
        }
        false
    }

    fn remove(&mut self, edge: (usize, usize)) {
        if let Some(pos) = self.edges.iter().position(|e| *e == edge) {
            self.edges.swap_remove(pos);
        }
    }
}

/// Removes its edge from the graph when the request completes.
struct EdgeGuard<'a> {
    graph: &'a Mutex<WaitGraph>,
    edge: (usize, usize),
}

impl Drop for EdgeGuard<'_> {
    fn drop(&mut self) {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.edge);
    }
}

/// Result of an initialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call ran the instance's init.
    Initialized,
    /// Someone else had already initialized it.
    AlreadyInitialized,
}

/// Instance table, initialization state and global options.
#[derive(Debug)]
pub struct LifecycleContext {
    globals: GlobalOptions,
    registry: Registry,
    slots: Vec<InitSlot>,
    waits: Mutex<WaitGraph>,
    shutdown: Shutdown,
}

impl LifecycleContext {
    pub fn new(globals: GlobalOptions, registry: Registry) -> Self {
        let slots = registry.entries().iter().map(|_| InitSlot::new()).collect();
        Self {
            globals,
            registry,
            slots,
            waits: Mutex::new(WaitGraph::default()),
            shutdown: Shutdown::new(),
        }
    }

    pub fn globals(&self) -> &GlobalOptions {
        &self.globals
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Notifier fired when shutdown begins. Background work should subscribe.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Look up an instance by name or alias without initializing it.
    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.registry.get(name)
    }

    /// True once the instance's init has been claimed.
    pub fn is_initialized(&self, name: &str) -> bool {
        self.registry
            .index_of(name)
            .map(|i| *self.slots[i].lock() != InitState::Pending)
            .unwrap_or(false)
    }

    /// Look up an instance and initialize it first if nobody has yet.
    ///
    /// For requests that do not come from a module's init. Modules use
    /// [`InitContext::ensure_initialized`] so the request is attributed.
    pub fn ensure_initialized(&self, name: &str) -> Result<&Instance, Error> {
        self.request(None, name)
    }

    /// Like [`ensure_initialized`](Self::ensure_initialized), returning the
    /// concrete module type.
    pub fn ensure_initialized_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        downcast(self.ensure_initialized(name)?, name)
    }

    /// Initialize the instance at `index` unless it already was.
    pub(crate) fn initialize_at(&self, index: usize) -> Result<InitOutcome, Error> {
        self.run_init(None, index)
    }

    fn request(&self, requester: Option<usize>, name: &str) -> Result<&Instance, Error> {
        let index = self
            .registry
            .index_of(name)
            .ok_or_else(|| Error::UnknownInstance(name.to_string()))?;

        let outcome = self.run_init(requester, index)?;
        let instance = self.slot_entry(index).instance();
        if outcome == InitOutcome::Initialized {
            tracing::debug!(
                module = instance.kind(),
                instance = instance.name(),
                requested_as = name,
                "Module lazily initialized"
            );
        }
        Ok(instance)
    }

    fn run_init(&self, requester: Option<usize>, index: usize) -> Result<InitOutcome, Error> {
        let slot = &self.slots[index];
        let entry = self.slot_entry(index);
        let instance = entry.instance();
        let me = thread::current().id();
        let cycle = || Error::DependencyCycle(instance.name().to_string());

        let mut edge = None;
        {
            let mut state = slot.lock();
            loop {
                let current = *state;
                match current {
                    InitState::Pending => {
                        *state = InitState::Initializing(me);
                        if let Some(from) = requester {
                            edge = Some(self.add_edge(from, index));
                        }
                        break;
                    }
                    InitState::Ready => return Ok(InitOutcome::AlreadyInitialized),
                    InitState::Failed => {
                        return Err(Error::Initialization {
                            kind: instance.kind().to_string(),
                            instance: instance.name().to_string(),
                            source: "an earlier initialization attempt failed".into(),
                        });
                    }
                    InitState::Initializing(owner) if owner == me => return Err(cycle()),
                    InitState::Initializing(_) => {
                        if let Some(from) = requester.filter(|_| edge.is_none()) {
                            let mut graph = self.waits.lock().unwrap_or_else(PoisonError::into_inner);
                            if graph.reaches(index, from) {
                                return Err(cycle());
                            }
                            graph.edges.push((from, index));
                            drop(graph);
                            edge = Some(EdgeGuard {
                                graph: &self.waits,
                                edge: (from, index),
                            });
                        }
                        state = slot.done.wait(state).unwrap_or_else(PoisonError::into_inner);
                    }
                }
            }
        }

        tracing::debug!(module = instance.kind(), instance = instance.name(), "module init");
        let scope = InitContext {
            ctx: self,
            requester: index,
        };
        let result = instance
            .module()
            .init(ModuleConfig::new(&self.globals, entry.block()), &scope);

        *slot.lock() = if result.is_ok() { InitState::Ready } else { InitState::Failed };
        slot.done.notify_all();
        drop(edge);

        result
            .map(|()| InitOutcome::Initialized)
            .map_err(|source| Error::Initialization {
                kind: instance.kind().to_string(),
                instance: instance.name().to_string(),
                source,
            })
    }

    fn add_edge(&self, from: usize, to: usize) -> EdgeGuard<'_> {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .edges
            .push((from, to));
        EdgeGuard {
            graph: &self.waits,
            edge: (from, to),
        }
    }

    fn slot_entry(&self, index: usize) -> &Entry {
        &self.registry.entries()[index]
    }
}

fn downcast<T: Any + Send + Sync>(instance: &Instance, name: &str) -> Result<Arc<T>, Error> {
    instance
        .downcast::<T>()
        .ok_or_else(|| Error::TypeMismatch(name.to_string()))
}

/// The context as seen from one instance's `init`.
///
/// Lookups through it are attributed to that instance, also when made from
/// threads the init spawns. Everything else derefs to [`LifecycleContext`].
#[derive(Debug, Clone, Copy)]
pub struct InitContext<'a> {
    ctx: &'a LifecycleContext,
    requester: usize,
}

impl<'a> InitContext<'a> {
    /// The instance being initialized.
    pub fn instance(&self) -> &'a Instance {
        self.ctx.slot_entry(self.requester).instance()
    }

    /// Look up a dependency and initialize it first if nobody has yet.
    ///
    /// Fails with [`Error::DependencyCycle`] if the dependency is itself
    /// waiting, directly or through others, on the instance being initialized.
    pub fn ensure_initialized(&self, name: &str) -> Result<&'a Instance, Error> {
        self.ctx.request(Some(self.requester), name)
    }

    pub fn ensure_initialized_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        downcast(self.ensure_initialized(name)?, name)
    }
}

impl Deref for InitContext<'_> {
    type Target = LifecycleContext;

    fn deref(&self) -> &LifecycleContext {
        self.ctx
    }
}

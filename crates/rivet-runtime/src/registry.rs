//! Identity registry.
//!
//! One [`Supervisor`] per identity. The registry is owned by whoever runs
//! the process; there is no global instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rivet_core::SessionConnector;
use rivet_framework::{DEFAULT_MODULES, ModuleDescriptor};
use tracing::{debug, info};

use crate::config::SupervisorConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::supervisor::{SessionState, Supervisor};

/// Registry of supervisors keyed by identity.
pub struct SupervisorRegistry {
    connector: Arc<dyn SessionConnector>,
    extra_modules: Vec<&'static ModuleDescriptor>,
    supervisors: Mutex<HashMap<String, Arc<Supervisor>>>,
}

impl SupervisorRegistry {
    /// Creates an empty registry whose supervisors open sessions through
    /// `connector`.
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            extra_modules: Vec::new(),
            supervisors: Mutex::new(HashMap::new()),
        }
    }

    /// Installs `descriptor` on every supervisor created after this call,
    /// after the default modules.
    pub fn with_module(mut self, descriptor: &'static ModuleDescriptor) -> Self {
        self.extra_modules.push(descriptor);
        self
    }

    /// Returns the supervisor for `config.identity`, creating it if needed.
    ///
    /// An existing supervisor gets `config` in place of its old one and is
    /// returned as is. A new one has no session until `login` is called.
    pub fn get_or_create(&self, config: SupervisorConfig) -> Arc<Supervisor> {
        let mut supervisors = self.supervisors.lock();
        if let Some(existing) = supervisors.get(&config.identity) {
            debug!(identity = %config.identity, "Replacing supervisor config");
            existing.set_config(config);
            return existing.clone();
        }

        let identity = config.identity.clone();
        let descriptors = DEFAULT_MODULES
            .iter()
            .copied()
            .chain(self.extra_modules.iter().copied());
        let supervisor = Supervisor::new(config, self.connector.clone(), descriptors);
        supervisors.insert(identity.clone(), supervisor.clone());
        info!(identity = %identity, "Registered supervisor");
        supervisor
    }

    pub fn get(&self, identity: &str) -> Option<Arc<Supervisor>> {
        self.supervisors.lock().get(identity).cloned()
    }

    /// Like [`get`](Self::get), but a missing identity is an error.
    pub fn require(&self, identity: &str) -> RuntimeResult<Arc<Supervisor>> {
        self.get(identity)
            .ok_or_else(|| RuntimeError::UnknownIdentity(identity.to_string()))
    }

    /// Removes a supervisor, ending its session and any pending reconnect.
    pub fn remove(&self, identity: &str) -> Option<Arc<Supervisor>> {
        let removed = self.supervisors.lock().remove(identity)?;
        removed.end();
        info!(identity = %identity, "Removed supervisor");
        Some(removed)
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self.supervisors.lock().keys().cloned().collect();
        identities.sort();
        identities
    }

    pub fn len(&self) -> usize {
        self.supervisors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.supervisors.lock().is_empty()
    }

    /// Ends every session. Supervisors stay registered.
    pub fn end_all(&self) {
        let supervisors: Vec<Arc<Supervisor>> =
            self.supervisors.lock().values().cloned().collect();
        info!("Ending {} session(s)", supervisors.len());
        for supervisor in supervisors {
            supervisor.end();
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let supervisors = self.supervisors.lock();
        let mut stats = RegistryStats {
            total: supervisors.len(),
            ..Default::default()
        };
        for supervisor in supervisors.values() {
            match supervisor.state() {
                SessionState::Absent => stats.absent += 1,
                SessionState::Connecting => stats.connecting += 1,
                SessionState::Live => stats.live += 1,
                SessionState::Ended => stats.ended += 1,
            }
        }
        stats
    }
}

/// Supervisor counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub absent: usize,
    pub connecting: usize,
    pub live: usize,
    pub ended: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Supervisors: {} total ({} live, {} connecting, {} ended, {} absent)",
            self.total, self.live, self.connecting, self.ended, self.absent
        )
    }
}

//! A `Host` over the simulated world with switchable capabilities.

use std::sync::{Arc, Mutex, PoisonError};

use tether_contracts::{dataset::DatasetBundle, error::HostFault};
use tether_core::traits::{BufferPrimitive, BufferUtility, Host, NodeId, WorldTree};
use tether_policy::datasets;

use crate::world::SimWorld;

/// Native buffers in the simulation are plain byte copies.
struct SimBuffer;

impl BufferUtility for SimBuffer {
    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault> {
        Ok(bytes.to_vec())
    }

    fn create_and_write(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault> {
        Ok(bytes.to_vec())
    }
}

struct SimPrimitive;

impl BufferPrimitive for SimPrimitive {
    fn wrap(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault> {
        Ok(bytes.to_vec())
    }
}

/// Which encoders the simulated environment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCapabilities {
    pub native_buffer: bool,
    pub buffer_primitive: bool,
}

impl Default for SimCapabilities {
    fn default() -> Self {
        Self { native_buffer: true, buffer_primitive: true }
    }
}

pub struct SimHost {
    world: Arc<SimWorld>,
    region: Option<NodeId>,
    capabilities: SimCapabilities,
    datasets: Mutex<Option<String>>,
}

impl SimHost {
    pub fn new(world: Arc<SimWorld>, region: Option<NodeId>) -> Self {
        Self { world, region, capabilities: SimCapabilities::default(), datasets: Mutex::new(None) }
    }

    pub fn with_capabilities(mut self, capabilities: SimCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Serve `toml` from `load_datasets`.
    pub fn with_datasets(self, toml: &str) -> Self {
        self.set_datasets(Some(toml));
        self
    }

    pub fn set_datasets(&self, toml: Option<&str>) {
        *self.datasets.lock().unwrap_or_else(PoisonError::into_inner) = toml.map(str::to_string);
    }

    pub fn sim_world(&self) -> &Arc<SimWorld> {
        &self.world
    }
}

impl Host for SimHost {
    fn native_buffer(&self) -> Result<Option<Arc<dyn BufferUtility>>, HostFault> {
        Ok(self.capabilities.native_buffer.then(|| Arc::new(SimBuffer) as Arc<dyn BufferUtility>))
    }

    fn buffer_primitive(&self) -> Result<Option<Arc<dyn BufferPrimitive>>, HostFault> {
        Ok(self
            .capabilities
            .buffer_primitive
            .then(|| Arc::new(SimPrimitive) as Arc<dyn BufferPrimitive>))
    }

    fn world(&self) -> Arc<dyn WorldTree> {
        self.world.clone()
    }

    fn owned_region(&self) -> Result<Option<NodeId>, HostFault> {
        Ok(self.region)
    }

    fn load_datasets(&self) -> Result<DatasetBundle, HostFault> {
        let source = self.datasets.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let toml = source.ok_or_else(|| HostFault::new("no dataset source configured"))?;
        datasets::from_toml_str(&toml).map_err(|e| HostFault::new(e.to_string()))
    }
}

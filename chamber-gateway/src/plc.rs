//! PLC connection handle ownership
//!
//! The S7 wire protocol lives in the external driver crate; the gateway
//! only manages the lifetime of the single connection handle. The handle
//! sits in a [`PlcSlot`] owned by the lifecycle manager, and request
//! handlers see nothing but a read-only connectivity probe.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Transport boundary implemented by the external PLC driver
#[async_trait]
pub trait PlcTransport: Send + Sync {
    /// Current connectivity of the underlying transport
    fn is_connected(&self) -> bool;

    /// Tear down the transport; invoked exactly once, during shutdown
    async fn disconnect(&mut self) -> Result<()>;
}

/// The process's PLC connection handle
///
/// At most one live handle exists per process. It is created by the
/// external driver, installed through the lifecycle manager, and released
/// exactly once during shutdown.
pub struct PlcHandle {
    transport: Box<dyn PlcTransport>,
}

impl PlcHandle {
    pub fn new(transport: Box<dyn PlcTransport>) -> Self {
        Self { transport }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Consume the handle and disconnect the transport
    pub(crate) async fn release(mut self) -> Result<()> {
        self.transport.disconnect().await
    }
}

impl fmt::Debug for PlcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlcHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Shared slot holding the process's single PLC handle
#[derive(Clone, Default)]
pub struct PlcSlot {
    inner: Arc<RwLock<Option<PlcHandle>>>,
}

impl PlcSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handle produced by the external driver
    ///
    /// A second handle is rejected; the existing one must first be
    /// released through the lifecycle manager.
    pub async fn install(&self, handle: PlcHandle) -> Result<()> {
        let mut slot = self.inner.write().await;
        if slot.is_some() {
            return Err(Error::Plc(
                "a PLC connection handle is already installed".to_string(),
            ));
        }
        *slot = Some(handle);
        Ok(())
    }

    /// Read-only probe handed to request handlers
    pub fn probe(&self) -> PlcProbe {
        PlcProbe {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) async fn take(&self) -> Option<PlcHandle> {
        self.inner.write().await.take()
    }
}

/// Narrow connectivity accessor for request handlers
///
/// Handlers can ask whether the PLC is reachable but can never close or
/// replace the handle.
#[derive(Clone)]
pub struct PlcProbe {
    inner: Arc<RwLock<Option<PlcHandle>>>,
}

impl PlcProbe {
    /// Whether an installed handle currently reports connectivity
    pub async fn is_connected(&self) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .map(PlcHandle::is_connected)
            .unwrap_or(false)
    }

    /// Whether a handle has been installed at all
    pub async fn is_installed(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

// Copyright 2026 Launcher Link Team
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

//! In-memory platform for tests and radio-less development.
//!
//! The transport is a [`tokio::io::duplex`] pair; the far end plays the
//! launcher and is handed to the test via [`MockPlatform::take_host`].

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::{LinkError, LinkResult};
use super::platform::{BondState, BondTransition, BoxedStream, DeviceHandle, LinkPlatform};

#[derive(Default)]
struct Inner {
    bond_state: Option<BondState>,
    bond_tx: Option<mpsc::Sender<BondTransition>>,
    services: Vec<Uuid>,
    refuse_connect: bool,
    host: Option<DuplexStream>,
    opened: Vec<Uuid>,
    bond_requests: usize,
    discovery_cancelled: bool,
}

/// Scripted [`LinkPlatform`].
pub struct MockPlatform {
    inner: Mutex<Inner>,
}

impl MockPlatform {
    /// Platform reporting the device as already bonded.
    pub fn bonded() -> Self {
        Self::with_bond_state(BondState::Bonded)
    }

    /// Platform reporting the device as not yet bonded; the test drives
    /// bonding via [`emit_bond`](Self::emit_bond).
    pub fn unbonded() -> Self {
        Self::with_bond_state(BondState::NotBonded)
    }

    fn with_bond_state(state: BondState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                bond_state: Some(state),
                ..Inner::default()
            }),
        }
    }

    /// Script the advertised service UUIDs.
    pub fn set_services(&self, services: Vec<Uuid>) {
        self.inner.lock().services = services;
    }

    /// Make every stream open attempt fail.
    pub fn refuse_connect(&self) {
        self.inner.lock().refuse_connect = true;
    }

    /// Deliver a bond transition to the subscribed session, if any.
    pub async fn emit_bond(&self, from: BondState, to: BondState) {
        let tx = self.inner.lock().bond_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(BondTransition { from, to }).await;
        }
    }

    /// The launcher end of the opened transport.
    pub fn take_host(&self) -> Option<DuplexStream> {
        self.inner.lock().host.take()
    }

    /// Services a stream was opened for, in open order.
    pub fn opened(&self) -> Vec<Uuid> {
        self.inner.lock().opened.clone()
    }

    pub fn bond_requests(&self) -> usize {
        self.inner.lock().bond_requests
    }

    pub fn discovery_cancelled(&self) -> bool {
        self.inner.lock().discovery_cancelled
    }
}

impl LinkPlatform for MockPlatform {
    fn cancel_discovery(&self) -> BoxFuture<'_, LinkResult<()>> {
        Box::pin(async move {
            self.inner.lock().discovery_cancelled = true;
            Ok(())
        })
    }

    fn bond_state<'a>(&'a self, _device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<BondState>> {
        Box::pin(async move { Ok(self.inner.lock().bond_state.unwrap_or(BondState::NotBonded)) })
    }

    fn request_bond<'a>(&'a self, _device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<()>> {
        Box::pin(async move {
            self.inner.lock().bond_requests += 1;
            Ok(())
        })
    }

    fn bond_events<'a>(
        &'a self,
        _device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<mpsc::Receiver<BondTransition>>> {
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(8);
            self.inner.lock().bond_tx = Some(tx);
            Ok(rx)
        })
    }

    fn advertised_services<'a>(
        &'a self,
        _device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<Vec<Uuid>>> {
        Box::pin(async move { Ok(self.inner.lock().services.clone()) })
    }

    fn open_stream<'a>(
        &'a self,
        _device: &'a DeviceHandle,
        service: Uuid,
    ) -> BoxFuture<'a, LinkResult<BoxedStream>> {
        Box::pin(async move {
            let mut inner = self.inner.lock();
            if inner.refuse_connect {
                return Err(LinkError::ConnectFailed("connection refused".into()));
            }
            let (host, device) = tokio::io::duplex(256);
            inner.host = Some(host);
            inner.opened.push(service);
            Ok(Box::new(device) as BoxedStream)
        })
    }
}

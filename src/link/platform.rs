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

//! Platform capability consumed by the session.
//!
//! The session never talks to the OS Bluetooth stack directly; it is
//! handed a [`LinkPlatform`] that covers discovery cancellation, bonding
//! and socket establishment. Production uses the BlueZ implementation,
//! tests an in-memory one.

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::LinkResult;

/// Standard serial port profile UUID; launcher firmware registers its
/// RFCOMM service under it.
pub const SERIAL_PORT_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// A remote device as handed over by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Bluetooth address in colon notation.
    pub address: String,
    /// Human-readable name; falls back to the address when the device
    /// never sent one.
    pub name: String,
}

/// OS-level pairing state of a remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    NotBonded,
    Bonding,
    Bonded,
    Failed,
}

/// One observed bond state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondTransition {
    pub from: BondState,
    pub to: BondState,
}

/// A connected bidirectional byte stream.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkStream for T {}

/// Boxed stream handed from the platform to the session.
pub type BoxedStream = Box<dyn LinkStream>;

/// Injected Bluetooth capability.
///
/// All methods return boxed futures so the trait stays object-safe; the
/// session holds an `Arc<dyn LinkPlatform>`.
pub trait LinkPlatform: Send + Sync + 'static {
    /// Abort any discovery this platform is running. A no-op when idle.
    fn cancel_discovery(&self) -> BoxFuture<'_, LinkResult<()>>;

    /// Current bond state of `device`.
    fn bond_state<'a>(&'a self, device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<BondState>>;

    /// Ask the OS to bond with `device`. Completion is reported through
    /// the event subscription, not the returned future.
    fn request_bond<'a>(&'a self, device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<()>>;

    /// Subscribe to bond transitions of `device`. Dropping the receiver
    /// unsubscribes; dropping it twice is naturally a no-op.
    fn bond_events<'a>(
        &'a self,
        device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<mpsc::Receiver<BondTransition>>>;

    /// Service UUIDs the device advertises, in stable order.
    fn advertised_services<'a>(
        &'a self,
        device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<Vec<Uuid>>>;

    /// Open the byte stream for `service` on `device`.
    fn open_stream<'a>(
        &'a self,
        device: &'a DeviceHandle,
        service: Uuid,
    ) -> BoxFuture<'a, LinkResult<BoxedStream>>;
}

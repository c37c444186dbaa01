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

//! BlueZ-backed platform implementation.

use futures::future::BoxFuture;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bluer::rfcomm::{Profile, ReqError, Role};
use bluer::{Address, AdapterEvent, DeviceEvent, DeviceProperty};

use super::error::{LinkError, LinkResult};
use super::platform::{BondState, BondTransition, BoxedStream, DeviceHandle, LinkPlatform};

/// [`LinkPlatform`] over the system BlueZ daemon.
pub struct BluezPlatform {
    session: bluer::Session,
    adapter: bluer::Adapter,
    discovery: Mutex<Option<JoinHandle<()>>>,
}

impl BluezPlatform {
    /// Connect to BlueZ and power up the default adapter.
    pub async fn new() -> LinkResult<Self> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("using bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("powering on bluetooth adapter");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            session,
            adapter,
            discovery: Mutex::new(None),
        })
    }

    /// Start device discovery. Discovered devices are delivered on the
    /// returned channel until [`cancel_discovery`](LinkPlatform::cancel_discovery)
    /// or a new `start_discovery` call ends the scan.
    pub async fn start_discovery(&self) -> LinkResult<mpsc::UnboundedReceiver<DeviceHandle>> {
        let adapter = self.adapter.clone();
        let mut events = adapter.discover_devices().await?;
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let AdapterEvent::DeviceAdded(addr) = event {
                    let name = match adapter.device(addr) {
                        Ok(device) => device.alias().await.unwrap_or_else(|_| addr.to_string()),
                        Err(_) => addr.to_string(),
                    };
                    let handle = DeviceHandle {
                        address: addr.to_string(),
                        name,
                    };
                    if tx.send(handle).is_err() {
                        break;
                    }
                }
            }
        });

        if let Some(previous) = self.discovery.lock().replace(task) {
            previous.abort();
        }
        Ok(rx)
    }

    fn device(&self, handle: &DeviceHandle) -> LinkResult<bluer::Device> {
        let addr: Address = handle
            .address
            .parse()
            .map_err(|_| LinkError::InvalidAddress(handle.address.clone()))?;
        Ok(self.adapter.device(addr)?)
    }
}

impl LinkPlatform for BluezPlatform {
    fn cancel_discovery(&self) -> BoxFuture<'_, LinkResult<()>> {
        Box::pin(async move {
            if let Some(task) = self.discovery.lock().take() {
                task.abort();
                debug!("discovery cancelled");
            }
            Ok(())
        })
    }

    fn bond_state<'a>(&'a self, device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<BondState>> {
        Box::pin(async move {
            let device = self.device(device)?;
            let state = if device.is_paired().await? {
                BondState::Bonded
            } else {
                BondState::NotBonded
            };
            Ok(state)
        })
    }

    fn request_bond<'a>(&'a self, device: &'a DeviceHandle) -> BoxFuture<'a, LinkResult<()>> {
        Box::pin(async move {
            let device = self.device(device)?;
            device.pair().await.map_err(|err| {
                warn!("pairing failed: {err}");
                LinkError::BondFailed
            })
        })
    }

    fn bond_events<'a>(
        &'a self,
        device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<mpsc::Receiver<BondTransition>>> {
        Box::pin(async move {
            let device = self.device(device)?;
            let paired = device.is_paired().await?;
            let mut events = device.events().await?;
            let (tx, rx) = mpsc::channel(8);

            tokio::spawn(async move {
                // BlueZ only exposes the paired flag; transitions are
                // reconstructed from its edges.
                let mut previous = if paired {
                    BondState::Bonded
                } else {
                    BondState::Bonding
                };
                while let Some(event) = events.next().await {
                    if let DeviceEvent::PropertyChanged(DeviceProperty::Paired(paired)) = event {
                        let next = if paired {
                            BondState::Bonded
                        } else {
                            BondState::NotBonded
                        };
                        if tx
                            .send(BondTransition {
                                from: previous,
                                to: next,
                            })
                            .await
                            .is_err()
                        {
                            // Receiver dropped: subscription released.
                            break;
                        }
                        previous = next;
                    }
                }
            });

            Ok(rx)
        })
    }

    fn advertised_services<'a>(
        &'a self,
        device: &'a DeviceHandle,
    ) -> BoxFuture<'a, LinkResult<Vec<Uuid>>> {
        Box::pin(async move {
            let device = self.device(device)?;
            let mut uuids: Vec<Uuid> = device
                .uuids()
                .await?
                .unwrap_or_default()
                .into_iter()
                .collect();
            // The set BlueZ hands out is unordered.
            uuids.sort();
            Ok(uuids)
        })
    }

    fn open_stream<'a>(
        &'a self,
        device: &'a DeviceHandle,
        service: Uuid,
    ) -> BoxFuture<'a, LinkResult<BoxedStream>> {
        Box::pin(async move {
            let target = self.device(device)?;
            let addr = target.address();

            let profile = Profile {
                uuid: service,
                role: Some(Role::Client),
                require_authentication: Some(false),
                require_authorization: Some(false),
                auto_connect: Some(true),
                ..Default::default()
            };
            let mut handle = self
                .session
                .register_profile(profile)
                .await
                .map_err(|err| LinkError::ConnectFailed(err.to_string()))?;

            let connect = target.connect_profile(&service);
            tokio::pin!(connect);
            let mut connect_done = false;

            loop {
                tokio::select! {
                    result = &mut connect, if !connect_done => {
                        connect_done = true;
                        if let Err(err) = result {
                            return Err(LinkError::ConnectFailed(err.to_string()));
                        }
                    }
                    request = handle.next() => {
                        let Some(request) = request else {
                            return Err(LinkError::ConnectFailed("profile handle closed".into()));
                        };
                        if request.device() == addr {
                            let stream = request
                                .accept()
                                .map_err(|err| LinkError::ConnectFailed(err.to_string()))?;
                            debug!(device = %addr, "rfcomm stream open");
                            return Ok(Box::new(stream) as BoxedStream);
                        }
                        let _ = request.reject(ReqError::Rejected);
                    }
                }
            }
        })
    }
}

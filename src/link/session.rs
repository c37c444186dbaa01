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

//! Launcher session lifecycle.
//!
//! A session walks bonding -> connecting -> running -> terminated, with
//! failure absorbing from any non-terminal phase. A driver task owns the
//! sequence; once the transport is open it lends the two stream halves to
//! a reader and a writer task and supervises them until a fault or an
//! explicit close. Teardown runs exactly once: it wakes both workers,
//! reclaims the write half, shuts the transport down and releases the
//! bond subscription.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::accumulator::ResponseAccumulator;
use super::error::LinkError;
use super::frame::{CommandFrame, CommandState, FrameLayout, Telemetry};
use super::platform::{BondState, BoxedStream, DeviceHandle, LinkPlatform};
use super::queue::{self, CommandDrain, CommandQueue};
use super::variant::{ProtocolVariant, ServiceSource, WriterErrorPolicy};

/// Callback receiving each decoded telemetry frame, in arrival order.
pub type ResponseHandler = Box<dyn Fn(Telemetry) + Send>;

/// Callback receiving the session outcome: `true` means failed.
pub type CompletionHandler = Box<dyn FnOnce(bool) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bonding,
    Connecting,
    Running,
    Terminated,
}

/// Handle to a live (or terminating) session.
///
/// Cloneable; dropping the last handle closes the session the same way an
/// explicit [`close`](Session::close) would.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    device: DeviceHandle,
    layout: FrameLayout,
    queue: CommandQueue,
    close_tx: watch::Sender<bool>,
    phase_rx: watch::Receiver<Phase>,
    failed: Arc<AtomicBool>,
}

impl Session {
    /// Start a session against `device`.
    ///
    /// Returns immediately; bonding and connecting proceed on a spawned
    /// task. `on_complete` fires exactly once with `false` after the
    /// worker tasks are running, or with `true` when establishment fails.
    /// It does not fire at all when the session is closed before either
    /// outcome. Must be called within a tokio runtime.
    pub fn connect(
        platform: Arc<dyn LinkPlatform>,
        device: DeviceHandle,
        variant: ProtocolVariant,
        on_response: impl Fn(Telemetry) + Send + 'static,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) -> Session {
        let (queue, drain) = queue::channel();
        let (close_tx, close_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(Phase::Bonding);
        let failed = Arc::new(AtomicBool::new(false));

        let driver = Driver {
            platform,
            device: device.clone(),
            variant: variant.clone(),
            close_rx,
            phase_tx,
            failed: failed.clone(),
        };
        tokio::spawn(driver.run(
            drain,
            Box::new(on_response),
            Completion(Some(Box::new(on_complete))),
        ));

        Session {
            shared: Arc::new(Shared {
                device,
                layout: variant.layout,
                queue,
                close_tx,
                phase_rx,
                failed,
            }),
        }
    }

    /// The device this session targets.
    pub fn device(&self) -> &DeviceHandle {
        &self.shared.device
    }

    /// Queue an encoded frame for transmission. Never blocks; bytes go
    /// out in submission order. Silently dropped once the session ended.
    pub fn send(&self, frame: &CommandFrame) {
        self.shared.queue.push_frame(frame);
    }

    /// Encode a state snapshot with this session's layout and queue it.
    pub fn send_state(&self, state: &CommandState) {
        self.send(&self.shared.layout.encode(state));
    }

    /// Close the session and wait for teardown to finish. Safe to call
    /// any number of times, from any phase.
    pub async fn close(&self) {
        let _ = self.shared.close_tx.send(true);
        self.closed().await;
    }

    /// Wait until the session has terminated. Returns `true` when it
    /// ended because of a bonding or transport fault.
    pub async fn closed(&self) -> bool {
        let mut rx = self.shared.phase_rx.clone();
        loop {
            if *rx.borrow_and_update() == Phase::Terminated {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.shared.failed.load(Ordering::SeqCst)
    }

    /// Whether the session has already terminated.
    pub fn is_closed(&self) -> bool {
        *self.shared.phase_rx.borrow() == Phase::Terminated
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.shared.device)
            .field("phase", &*self.shared.phase_rx.borrow())
            .finish()
    }
}

/// One-shot completion slot; a second fire is silently suppressed.
struct Completion(Option<CompletionHandler>);

impl Completion {
    fn fire(&mut self, failed: bool) {
        if let Some(callback) = self.0.take() {
            callback(failed);
        }
    }
}

#[derive(Debug)]
enum Fault {
    Read(std::io::Error),
    Write(std::io::Error),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Read(err) => write!(f, "read failed: {err}"),
            Fault::Write(err) => write!(f, "write failed: {err}"),
        }
    }
}

/// Everything alive while the session is RUNNING.
struct Established {
    reader: JoinHandle<()>,
    writer: JoinHandle<WriteHalf<BoxedStream>>,
    shutdown_tx: watch::Sender<bool>,
    fault_rx: mpsc::Receiver<Fault>,
    // Held so the bond subscription stays live until teardown.
    _bond_rx: mpsc::Receiver<super::platform::BondTransition>,
}

struct Driver {
    platform: Arc<dyn LinkPlatform>,
    device: DeviceHandle,
    variant: ProtocolVariant,
    close_rx: watch::Receiver<bool>,
    phase_tx: watch::Sender<Phase>,
    failed: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self, drain: CommandDrain, on_response: ResponseHandler, mut completion: Completion) {
        info!(device = %self.device.address, "session starting");

        match self.establish(drain, on_response).await {
            Ok(Some(established)) => {
                completion.fire(false);
                let _ = self.phase_tx.send(Phase::Running);
                info!(device = %self.device.address, "session running");

                // The success signal above consumed the one-shot slot; a
                // later fault is reported through `closed()` instead.
                if self.supervise(established).await {
                    self.failed.store(true, Ordering::SeqCst);
                }
            }
            Ok(None) => {
                debug!(device = %self.device.address, "session closed before transport opened");
            }
            Err(err) => {
                warn!(device = %self.device.address, "session setup failed: {err}");
                self.failed.store(true, Ordering::SeqCst);
                completion.fire(true);
            }
        }

        let _ = self.phase_tx.send(Phase::Terminated);
        debug!(device = %self.device.address, "session terminated");
    }

    /// Bond and connect. `Ok(None)` means the session was closed while
    /// still establishing; no completion is owed in that case.
    async fn establish(
        &mut self,
        drain: CommandDrain,
        on_response: ResponseHandler,
    ) -> Result<Option<Established>, LinkError> {
        // Subscribe before the first state check so a transition landing
        // between check and wait is not lost.
        let mut bond_rx = self.platform.bond_events(&self.device).await?;

        if let Err(err) = self.platform.cancel_discovery().await {
            warn!("could not cancel discovery: {err}");
        }

        let state = self.platform.bond_state(&self.device).await?;
        if state != BondState::Bonded {
            info!(device = %self.device.address, "requesting bond");
            self.platform.request_bond(&self.device).await.map_err(|err| {
                warn!("bond request failed: {err}");
                LinkError::BondFailed
            })?;

            loop {
                tokio::select! {
                    biased;
                    _ = wait_close(&mut self.close_rx) => return Ok(None),
                    event = bond_rx.recv() => match event {
                        Some(transition) if transition.to == BondState::Bonded => break,
                        Some(transition)
                            if transition.from == BondState::Bonding
                                && transition.to == BondState::NotBonded =>
                        {
                            return Err(LinkError::BondFailed);
                        }
                        Some(transition) => {
                            debug!(?transition, "bond transition");
                        }
                        // Event source gone; the wait can never end.
                        None => return Err(LinkError::BondFailed),
                    },
                }
            }
        }

        let _ = self.phase_tx.send(Phase::Connecting);

        let service = match self.variant.service {
            ServiceSource::Fixed(uuid) => uuid,
            ServiceSource::Advertised => {
                let uuids = self.platform.advertised_services(&self.device).await?;
                *uuids.first().ok_or(LinkError::ServiceNotAdvertised)?
            }
        };

        info!(device = %self.device.address, %service, "opening transport");
        let stream = tokio::select! {
            biased;
            _ = wait_close(&mut self.close_rx) => return Ok(None),
            result = self.platform.open_stream(&self.device, service) => result?,
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (fault_tx, fault_rx) = mpsc::channel(4);

        let accumulator = ResponseAccumulator::new(self.variant.response);
        let reader = tokio::spawn(reader_loop(
            read_half,
            accumulator,
            on_response,
            fault_tx.clone(),
            shutdown_rx.clone(),
        ));
        let writer = tokio::spawn(writer_loop(
            write_half,
            drain,
            self.variant.writer_errors,
            fault_tx,
            shutdown_rx,
        ));

        Ok(Some(Established {
            reader,
            writer,
            shutdown_tx,
            fault_rx,
            _bond_rx: bond_rx,
        }))
    }

    /// Wait for a fault or a close request, then tear down. Returns
    /// whether the session ended because of a fault.
    async fn supervise(&mut self, mut established: Established) -> bool {
        let fault = tokio::select! {
            biased;
            _ = wait_close(&mut self.close_rx) => None,
            fault = established.fault_rx.recv() => fault,
        };

        let failed = match &fault {
            Some(fault) => {
                warn!(device = %self.device.address, "transport fault: {fault}");
                true
            }
            None => false,
        };

        self.teardown(established).await;
        failed
    }

    async fn teardown(&mut self, established: Established) {
        let Established {
            reader,
            writer,
            shutdown_tx,
            fault_rx,
            _bond_rx,
        } = established;

        let _ = shutdown_tx.send(true);
        drop(fault_rx);

        // The writer hands its half back; this is the single place the
        // transport is shut down.
        match writer.await {
            Ok(mut write_half) => {
                if let Err(err) = write_half.shutdown().await {
                    debug!("transport shutdown: {err}");
                }
            }
            Err(err) => warn!("writer task failed: {err}"),
        }
        if let Err(err) = reader.await {
            warn!("reader task failed: {err}");
        }

        // _bond_rx drops here, releasing the subscription.
    }
}

/// Resolve once the session is asked to close, either explicitly or by
/// every handle being dropped.
async fn wait_close(close_rx: &mut watch::Receiver<bool>) {
    loop {
        if *close_rx.borrow_and_update() {
            return;
        }
        if close_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn reader_loop(
    mut read_half: ReadHalf<BoxedStream>,
    mut accumulator: ResponseAccumulator,
    on_response: ResponseHandler,
    fault_tx: mpsc::Sender<Fault>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let byte = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return,
            result = read_half.read_u8() => match result {
                Ok(byte) => byte,
                Err(err) => {
                    let _ = fault_tx.try_send(Fault::Read(err));
                    return;
                }
            },
        };

        if let Some(raw) = accumulator.push(byte) {
            on_response(Telemetry::decode(&raw));
        }
    }
}

async fn writer_loop(
    mut write_half: WriteHalf<BoxedStream>,
    mut drain: CommandDrain,
    policy: WriterErrorPolicy,
    fault_tx: mpsc::Sender<Fault>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> WriteHalf<BoxedStream> {
    loop {
        let byte = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return write_half,
            byte = drain.next() => match byte {
                Some(byte) => byte,
                // Every producer handle is gone; nothing left to write.
                None => return write_half,
            },
        };

        if let Err(err) = write_half.write_u8(byte).await {
            let _ = fault_tx.try_send(Fault::Write(err));
            // ReportAndContinue keeps draining after a failed write;
            // teardown stops the loop through `shutdown_rx`.
            if policy == WriterErrorPolicy::Abort {
                return write_half;
            }
        }
    }
}

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

//! Command line probe for the launcher link.
//!
//! Connects to the configured device, logs decoded telemetry and keeps a
//! neutral state on the wire until Ctrl-C.

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launcher_link::config::Config;
use launcher_link::link::{BluezPlatform, CommandState, DeviceHandle, Session, Telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("launcher_link=info".parse().unwrap()),
        )
        .init();

    let config = Config::load()?;

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.device.address.clone());
    if address.is_empty() {
        bail!("no device address: pass one as an argument or set it in the config file");
    }
    let device = DeviceHandle {
        address,
        name: config.device.name.clone(),
    };

    info!("connecting to {} ({})", device.name, device.address);
    let platform = Arc::new(BluezPlatform::new().await?);

    let (done_tx, mut done_rx) = mpsc::channel(1);
    let session = Session::connect(
        platform,
        device,
        config.protocol.resolve(),
        |telemetry| match telemetry {
            Telemetry::Speed(millis) => info!("speed gate: {millis} ms"),
            Telemetry::StepperPosition(steps) => info!("stepper at {steps}"),
            Telemetry::Ignored { kind, value } => warn!("unknown telemetry {kind} ({value})"),
        },
        move |failed| {
            let _ = done_tx.try_send(failed);
        },
    );

    match done_rx.recv().await {
        Some(false) => info!("connected"),
        Some(true) => bail!("connection failed"),
        None => bail!("session ended before completing"),
    }

    // Neutral state keeps the launcher parked while we watch telemetry.
    session.send_state(&CommandState::default());

    tokio::signal::ctrl_c().await?;
    info!("closing session");
    session.close().await;

    Ok(())
}

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

//! Connection core for the ball launcher remote control.
//!
//! The launcher is driven over a classic Bluetooth RFCOMM serial link:
//! the remote pushes fixed-size command frames describing the full device
//! state and receives fixed-size telemetry frames back. This crate holds
//! everything below the UI: bonding orchestration, socket establishment,
//! the frame protocol and the reader/writer tasks with their teardown
//! discipline.
//!
//! - [`link`]: session state machine, framing, queue, platform seam
//! - [`config`]: configuration file handling for the probe binary
//!
//! The UI layer supplies a [`link::DeviceHandle`] picked by the user,
//! submits state snapshots to send and receives decoded telemetry plus a
//! single completion signal per session.

pub mod config;
pub mod link;

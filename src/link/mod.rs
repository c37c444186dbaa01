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

//! Device link module.
//!
//! Bonding, RFCOMM transport establishment and the fixed-frame command/
//! telemetry protocol for the launcher.

mod accumulator;
mod bluez;
mod error;
mod frame;
mod mock;
mod platform;
mod queue;
mod session;
mod variant;

pub use accumulator::{ResponseAccumulator, ResponsePolicy};
pub use bluez::BluezPlatform;
pub use error::{LinkError, LinkResult};
pub use frame::{
    CommandFrame, CommandState, Field, FieldSpec, FrameLayout, Telemetry, Width, MSG_SPEED,
    MSG_STEPPER,
};
pub use mock::MockPlatform;
pub use platform::{
    BondState, BondTransition, BoxedStream, DeviceHandle, LinkPlatform, LinkStream,
    SERIAL_PORT_UUID,
};
pub use queue::{channel as command_channel, CommandDrain, CommandQueue};
pub use session::{CompletionHandler, ResponseHandler, Session};
pub use variant::{ProtocolVariant, ServiceSource, WriterErrorPolicy};

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

//! Protocol variant configuration.
//!
//! Two firmware generations are in the field with incompatible wire
//! behavior. One session state machine serves both; everything that
//! differs lives in this record, chosen when the session is constructed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accumulator::ResponsePolicy;
use super::frame::FrameLayout;
use super::platform::SERIAL_PORT_UUID;

/// Where the RFCOMM service UUID comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceSource {
    /// Connect to a well-known UUID.
    Fixed(Uuid),
    /// Use the first UUID the device advertises; a device advertising
    /// nothing fails the session.
    Advertised,
}

/// What the writer task does after a failed write.
///
/// `ReportAndContinue` matches deployed remotes: the writer reports the
/// fault and keeps draining until teardown stops it, while a reader fault
/// ends the reader immediately. Whether that asymmetry is intentional in
/// the firmware protocol is unconfirmed, so it is a policy here instead of
/// being unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterErrorPolicy {
    ReportAndContinue,
    Abort,
}

/// Everything variant-specific about a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVariant {
    pub layout: FrameLayout,
    pub response: ResponsePolicy,
    pub service: ServiceSource,
    pub writer_errors: WriterErrorPolicy,
}

impl ProtocolVariant {
    /// Wire protocol of current launcher firmware: eight-byte command
    /// frame, three-byte telemetry frames, fixed serial port UUID.
    pub fn current() -> Self {
        Self {
            layout: FrameLayout::standard(),
            response: ResponsePolicy::Fixed { size: 3 },
            service: ServiceSource::Fixed(SERIAL_PORT_UUID),
            writer_errors: WriterErrorPolicy::ReportAndContinue,
        }
    }

    /// First-generation firmware: five-byte command frame without the
    /// vertical servo, loose status bytes instead of telemetry frames,
    /// service UUID taken from the device's advertisements.
    pub fn legacy() -> Self {
        Self {
            layout: FrameLayout::legacy(),
            response: ResponsePolicy::PerByte,
            service: ServiceSource::Advertised,
            writer_errors: WriterErrorPolicy::ReportAndContinue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_variant_shape() {
        let variant = ProtocolVariant::current();
        assert_eq!(variant.layout.encoded_len(), 8);
        assert_eq!(variant.response, ResponsePolicy::Fixed { size: 3 });
        assert_eq!(variant.service, ServiceSource::Fixed(SERIAL_PORT_UUID));
    }

    #[test]
    fn test_legacy_variant_shape() {
        let variant = ProtocolVariant::legacy();
        assert_eq!(variant.layout.encoded_len(), 5);
        assert_eq!(variant.response, ResponsePolicy::PerByte);
        assert_eq!(variant.service, ServiceSource::Advertised);
    }

    #[test]
    fn test_variant_roundtrips_through_toml() {
        let variant = ProtocolVariant::current();
        let text = toml::to_string(&variant).unwrap();
        let back: ProtocolVariant = toml::from_str(&text).unwrap();
        assert_eq!(back, variant);
    }
}

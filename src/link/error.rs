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

//! Error types for the device link.

use thiserror::Error;

/// Errors raised while establishing or running a launcher session.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The peer rejected or abandoned pairing.
    #[error("bonding with the device failed")]
    BondFailed,

    /// The peer advertises no service record to connect to.
    #[error("device advertises no usable service")]
    ServiceNotAdvertised,

    /// Opening the RFCOMM socket failed.
    #[error("could not open transport: {0}")]
    ConnectFailed(String),

    /// Read or write failure on an established transport.
    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The device identifier is not a valid Bluetooth address.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// Failure inside the Bluetooth backend.
    #[error("bluetooth backend error: {0}")]
    Backend(#[from] bluer::Error),
}

/// Result type alias using [`LinkError`].
pub type LinkResult<T> = std::result::Result<T, LinkError>;

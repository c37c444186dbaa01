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

//! Inbound response frame accumulation.

use serde::{Deserialize, Serialize};

/// How raw inbound bytes group into response frames.
///
/// First-generation firmware sends loose status bytes with no frame
/// structure; later firmware sends fixed-size telemetry frames. Per-byte
/// delivery is not the one-byte case of accumulation; the two stay
/// separate configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    /// Every raw byte is its own one-byte message.
    PerByte,
    /// Collect exactly `size` bytes per frame.
    Fixed { size: usize },
}

/// Collects raw transport bytes into complete response frames.
#[derive(Debug)]
pub struct ResponseAccumulator {
    policy: ResponsePolicy,
    buffer: Vec<u8>,
}

impl ResponseAccumulator {
    pub fn new(policy: ResponsePolicy) -> Self {
        Self {
            policy,
            buffer: Vec::new(),
        }
    }

    /// Append one byte read from the transport.
    ///
    /// Returns `Some(frame)` when the byte completes a frame; any surplus
    /// stays buffered for the next one. No byte is ever dropped,
    /// duplicated or reordered.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        match self.policy {
            ResponsePolicy::PerByte => Some(vec![byte]),
            ResponsePolicy::Fixed { size } => {
                self.buffer.push(byte);
                if self.buffer.len() >= size {
                    let frame = self.buffer.drain(..size).collect();
                    Some(frame)
                } else {
                    None
                }
            }
        }
    }

    /// Bytes waiting for their frame to complete.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

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

//! Command and telemetry frame encoding.
//!
//! Frames carry no delimiters or checksums; message boundaries rely
//! entirely on the fixed frame length. A single byte lost or inserted on
//! the wire desynchronizes every following frame with no recovery. That is
//! a limitation of the launcher firmware protocol, not something this
//! module may paper over.

use serde::{Deserialize, Serialize};

/// Telemetry discriminant for a ball speed measurement.
pub const MSG_SPEED: u8 = 0;

/// Telemetry discriminant for a stepper position report.
pub const MSG_STEPPER: u8 = 1;

/// Full device state pushed to the launcher on every change.
///
/// Values are slider-range integers; only the low 8 bits of each encoded
/// byte are significant. The stepper position is fractional on the remote
/// side and rounded to the nearest step before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandState {
    pub left_motor: i32,
    pub right_motor: i32,
    pub servo_horizontal: i32,
    pub servo_vertical: i32,
    pub stepper_delay: i32,
    pub stepper_position: f64,
}

impl CommandState {
    fn field_value(&self, field: Field) -> i32 {
        match field {
            Field::LeftMotor => self.left_motor,
            Field::RightMotor => self.right_motor,
            Field::ServoHorizontal => self.servo_horizontal,
            Field::ServoVertical => self.servo_vertical,
            Field::StepperDelay => self.stepper_delay,
            Field::StepperPosition => self.stepper_position.round() as i32,
        }
    }
}

/// A state field addressed by the frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    LeftMotor,
    RightMotor,
    ServoHorizontal,
    ServoVertical,
    StepperDelay,
    StepperPosition,
}

/// Encoded width of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Width {
    /// Low 8 bits, one byte.
    Byte,
    /// Low 16 bits, low byte then high byte.
    Word,
}

/// One field of a frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: Field,
    pub width: Width,
}

impl FieldSpec {
    pub const fn byte(field: Field) -> Self {
        Self {
            field,
            width: Width::Byte,
        }
    }

    pub const fn word(field: Field) -> Self {
        Self {
            field,
            width: Width::Word,
        }
    }
}

/// Ordered field layout of the outbound command frame.
///
/// The layout is fixed per firmware generation; see
/// [`ProtocolVariant`](super::ProtocolVariant) for the presets in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    fields: Vec<FieldSpec>,
}

impl FrameLayout {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Layout spoken by current firmware: both motors, both servos,
    /// stepper delay and stepper position as words. Eight bytes.
    pub fn standard() -> Self {
        Self::new(vec![
            FieldSpec::byte(Field::LeftMotor),
            FieldSpec::byte(Field::RightMotor),
            FieldSpec::byte(Field::ServoHorizontal),
            FieldSpec::byte(Field::ServoVertical),
            FieldSpec::word(Field::StepperDelay),
            FieldSpec::word(Field::StepperPosition),
        ])
    }

    /// [`standard`](Self::standard) with the stepper position truncated to
    /// its low byte. Seven bytes.
    pub fn short_position() -> Self {
        Self::new(vec![
            FieldSpec::byte(Field::LeftMotor),
            FieldSpec::byte(Field::RightMotor),
            FieldSpec::byte(Field::ServoHorizontal),
            FieldSpec::byte(Field::ServoVertical),
            FieldSpec::word(Field::StepperDelay),
            FieldSpec::byte(Field::StepperPosition),
        ])
    }

    /// First-generation layout: no vertical servo, no stepper position.
    /// Five bytes.
    pub fn legacy() -> Self {
        Self::new(vec![
            FieldSpec::byte(Field::LeftMotor),
            FieldSpec::byte(Field::RightMotor),
            FieldSpec::byte(Field::ServoHorizontal),
            FieldSpec::word(Field::StepperDelay),
        ])
    }

    /// Legacy layout extended with the stepper position word. Seven bytes.
    pub fn legacy_with_position() -> Self {
        Self::new(vec![
            FieldSpec::byte(Field::LeftMotor),
            FieldSpec::byte(Field::RightMotor),
            FieldSpec::byte(Field::ServoHorizontal),
            FieldSpec::word(Field::StepperDelay),
            FieldSpec::word(Field::StepperPosition),
        ])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of bytes one encoded frame occupies.
    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|spec| match spec.width {
                Width::Byte => 1,
                Width::Word => 2,
            })
            .sum()
    }

    /// Encode a state snapshot into its wire bytes.
    pub fn encode(&self, state: &CommandState) -> CommandFrame {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        for spec in &self.fields {
            let value = state.field_value(spec.field);
            match spec.width {
                Width::Byte => bytes.push((value & 0xff) as u8),
                Width::Word => {
                    bytes.push((value & 0xff) as u8);
                    bytes.push(((value >> 8) & 0xff) as u8);
                }
            }
        }
        CommandFrame(bytes)
    }
}

/// An encoded outbound command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame(Vec<u8>);

impl CommandFrame {
    /// Wrap already-encoded bytes as a frame.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One decoded telemetry message from the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    /// Light-barrier timing in milliseconds.
    Speed(u16),
    /// Current stepper position in steps.
    StepperPosition(u16),
    /// Unknown discriminant; delivered but carries no meaning.
    Ignored { kind: u8, value: u16 },
}

impl Telemetry {
    /// Decode one raw response frame.
    ///
    /// The first byte selects the message type, the remaining bytes form a
    /// little-endian payload. Unknown discriminants are kept rather than
    /// rejected so newer firmware does not break older remotes.
    pub fn decode(raw: &[u8]) -> Telemetry {
        let kind = raw.first().copied().unwrap_or(0);
        let value = match raw.len() {
            0 | 1 => 0,
            2 => u16::from(raw[1]),
            _ => u16::from(raw[1]) | u16::from(raw[2]) << 8,
        };
        match kind {
            MSG_SPEED => Telemetry::Speed(value),
            MSG_STEPPER => Telemetry::StepperPosition(value),
            kind => Telemetry::Ignored { kind, value },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_encoding() {
        let state = CommandState {
            left_motor: 10,
            right_motor: 20,
            servo_horizontal: 5,
            servo_vertical: 6,
            stepper_delay: 300,
            stepper_position: 300.4,
        };

        let frame = FrameLayout::standard().encode(&state);
        assert_eq!(frame.bytes(), &[10, 20, 5, 6, 44, 1, 44, 1]);
    }

    #[test]
    fn test_values_masked_to_low_byte() {
        let state = CommandState {
            left_motor: 0x1ff,
            right_motor: -1,
            ..Default::default()
        };

        let frame = FrameLayout::standard().encode(&state);
        assert_eq!(frame.bytes()[0], 0xff);
        assert_eq!(frame.bytes()[1], 0xff);
    }

    #[test]
    fn test_position_rounded_before_split() {
        let state = CommandState {
            stepper_position: 299.5,
            ..Default::default()
        };

        let frame = FrameLayout::standard().encode(&state);
        // round(299.5) = 300 -> low 44, high 1
        assert_eq!(&frame.bytes()[6..], &[44, 1]);
    }

    #[test]
    fn test_layout_widths() {
        assert_eq!(FrameLayout::standard().encoded_len(), 8);
        assert_eq!(FrameLayout::short_position().encoded_len(), 7);
        assert_eq!(FrameLayout::legacy().encoded_len(), 5);
        assert_eq!(FrameLayout::legacy_with_position().encoded_len(), 7);
    }

    #[test]
    fn test_legacy_has_no_vertical_servo() {
        let state = CommandState {
            left_motor: 1,
            right_motor: 2,
            servo_horizontal: 3,
            servo_vertical: 99,
            stepper_delay: 4,
            ..Default::default()
        };

        let frame = FrameLayout::legacy().encode(&state);
        assert_eq!(frame.bytes(), &[1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_decode_speed() {
        assert_eq!(Telemetry::decode(&[0, 100, 0]), Telemetry::Speed(100));
    }

    #[test]
    fn test_decode_stepper() {
        // 44 + 1 * 256 = 300
        assert_eq!(
            Telemetry::decode(&[1, 44, 1]),
            Telemetry::StepperPosition(300)
        );
    }

    #[test]
    fn test_decode_unknown_is_ignored() {
        assert_eq!(
            Telemetry::decode(&[7, 2, 1]),
            Telemetry::Ignored { kind: 7, value: 258 }
        );
    }

    #[test]
    fn test_decode_short_frames() {
        assert_eq!(Telemetry::decode(&[1, 44]), Telemetry::StepperPosition(44));
        assert_eq!(Telemetry::decode(&[0]), Telemetry::Speed(0));
    }
}

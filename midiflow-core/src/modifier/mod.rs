//! Modifiers: pure transforms from one or more patterns to one pattern
//!
//! Built-in transforms are variants of [`Modifier`] with typed parameters, so
//! matching on them is exhaustive. Anything else plugs in through
//! [`CustomModifier`] and travels as [`Modifier::Custom`].

mod custom;
mod merge;

pub use custom::{CustomModifier, CustomRef};
pub use merge::OverlapPolicy;

use crate::error::{Result, ValidationError};
use crate::types::time::{is_negative, try_div, try_mul, try_sub, Time};
use crate::types::{Note, Pattern};
use num_rational::Ratio;
use num_traits::Zero;
use std::fmt;

/// How many input patterns a modifier takes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// A pure pattern transform with its parameters.
///
/// Two modifiers are equal when they are the same kind with the same
/// parameters; flows rely on this for cache identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Modifier {
    /// Move every pitch by a number of semitones (clamped to 0-127)
    Transpose { semitones: i8 },
    /// Mirror every pitch around `center` (clamped to 0-127)
    Invert { center: u8 },
    /// Play the pattern backwards: each note ends where it used to start
    Reverse,
    /// Snap start times to the nearest multiple of `grid`
    Quantize { grid: Time },
    /// Scale start times, note lengths and pattern length by `factor`
    Stretch { factor: Time },
    /// Move the whole pattern later (or earlier) in time
    Shift { delta: Time },
    /// Cut out `[from, to)`; `to` defaults to the input's duration
    Slice { from: Time, to: Option<Time> },
    /// Multiply velocities by `factor`, rounding down, capped at 127
    ScaleVelocity { factor: Time },
    SetVelocity { velocity: u8 },
    /// Multiply note lengths by `factor`
    ScaleDuration { factor: Time },
    SetDuration { duration: Time },
    /// Play the inputs one after another
    Concatenate,
    /// Play the inputs on top of each other
    Merge {
        #[cfg_attr(feature = "serde", serde(default))]
        policy: OverlapPolicy,
    },
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomRef),
}

impl Modifier {
    pub fn transpose(semitones: i8) -> Self {
        Modifier::Transpose { semitones }
    }

    pub fn invert(center: u8) -> Result<Self> {
        Modifier::Invert { center }.validated()
    }

    pub fn quantize(grid: Time) -> Result<Self> {
        Modifier::Quantize { grid }.validated()
    }

    pub fn stretch(factor: Time) -> Result<Self> {
        Modifier::Stretch { factor }.validated()
    }

    pub fn shift(delta: Time) -> Self {
        Modifier::Shift { delta }
    }

    pub fn slice(from: Time, to: Option<Time>) -> Result<Self> {
        Modifier::Slice { from, to }.validated()
    }

    pub fn scale_velocity(factor: Time) -> Result<Self> {
        Modifier::ScaleVelocity { factor }.validated()
    }

    pub fn set_velocity(velocity: u8) -> Result<Self> {
        Modifier::SetVelocity { velocity }.validated()
    }

    pub fn scale_duration(factor: Time) -> Result<Self> {
        Modifier::ScaleDuration { factor }.validated()
    }

    pub fn set_duration(duration: Time) -> Result<Self> {
        Modifier::SetDuration { duration }.validated()
    }

    pub fn merge(policy: OverlapPolicy) -> Self {
        Modifier::Merge { policy }
    }

    pub fn custom<M: CustomModifier + 'static>(modifier: M) -> Self {
        Modifier::Custom(CustomRef::new(modifier))
    }

    /// Kind name, e.g. "transpose"
    pub fn name(&self) -> &str {
        match self {
            Modifier::Transpose { .. } => "transpose",
            Modifier::Invert { .. } => "invert",
            Modifier::Reverse => "reverse",
            Modifier::Quantize { .. } => "quantize",
            Modifier::Stretch { .. } => "stretch",
            Modifier::Shift { .. } => "shift",
            Modifier::Slice { .. } => "slice",
            Modifier::ScaleVelocity { .. } => "scale_velocity",
            Modifier::SetVelocity { .. } => "set_velocity",
            Modifier::ScaleDuration { .. } => "scale_duration",
            Modifier::SetDuration { .. } => "set_duration",
            Modifier::Concatenate => "concatenate",
            Modifier::Merge { .. } => "merge",
            Modifier::Custom(custom) => custom.name(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Modifier::Concatenate | Modifier::Merge { .. } => Arity::AtLeast(2),
            Modifier::Custom(custom) => custom.arity(),
            _ => Arity::Exactly(1),
        }
    }

    /// Check parameters without running the transform
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        match self {
            Modifier::Invert { center } if *center > 127 => Err(ValidationError::parameter(
                name,
                format!("center pitch {} out of range 0-127", center),
            )),
            Modifier::Quantize { grid } if *grid <= Time::zero() => Err(
                ValidationError::parameter(name, format!("grid must be positive, got {}", grid)),
            ),
            Modifier::Stretch { factor } | Modifier::ScaleDuration { factor }
                if *factor <= Time::zero() =>
            {
                Err(ValidationError::parameter(
                    name,
                    format!("factor must be positive, got {}", factor),
                ))
            }
            Modifier::ScaleVelocity { factor } if is_negative(*factor) => Err(
                ValidationError::parameter(name, format!("factor cannot be negative, got {}", factor)),
            ),
            Modifier::SetVelocity { velocity } if *velocity > 127 => Err(
                ValidationError::parameter(name, format!("velocity {} out of range 0-127", velocity)),
            ),
            Modifier::SetDuration { duration } if *duration <= Time::zero() => Err(
                ValidationError::parameter(name, format!("duration must be positive, got {}", duration)),
            ),
            Modifier::Slice { from, to } => {
                if is_negative(*from) {
                    return Err(ValidationError::parameter(
                        name,
                        format!("start {} cannot be negative", from),
                    ));
                }
                match to {
                    Some(to) if to < from => Err(ValidationError::parameter(
                        name,
                        format!("end {} is before start {}", to, from),
                    )),
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Run the transform.
    ///
    /// The input count is checked against [`Modifier::arity`] before anything
    /// else happens. Inputs are only read.
    pub fn forward(&self, inputs: &[Pattern]) -> Result<Pattern> {
        let arity = self.arity();
        if !arity.accepts(inputs.len()) {
            return Err(ValidationError::Arity {
                modifier: self.name().to_string(),
                expected: arity,
                actual: inputs.len(),
            });
        }
        self.validate()?;

        match self {
            Modifier::Transpose { semitones } => {
                inputs[0].map_notes(|note| Ok(note.transposed(*semitones as i16)))
            }
            Modifier::Invert { center } => {
                let axis = 2 * *center as i16;
                inputs[0].map_notes(|note| Ok(note.with_clamped_pitch(axis - note.pitch() as i16)))
            }
            Modifier::Reverse => reverse(&inputs[0]),
            Modifier::Quantize { grid } => quantize(&inputs[0], *grid),
            Modifier::Stretch { factor } => stretch(&inputs[0], *factor),
            Modifier::Shift { delta } => inputs[0].shift(*delta),
            Modifier::Slice { from, to } => {
                let input = &inputs[0];
                input
                    .slice(*from, to.unwrap_or_else(|| input.duration()))
                    .map_err(|err| match err {
                        ValidationError::NegativeTime { .. }
                        | ValidationError::InvalidDuration { .. } => {
                            ValidationError::parameter(self.name(), err.to_string())
                        }
                        other => other,
                    })
            }
            Modifier::ScaleVelocity { factor } => inputs[0].map_notes(|note| {
                let scaled = try_mul(Ratio::from_integer(note.velocity() as i64), *factor)?;
                Ok(note.with_clamped_velocity(scaled.floor().to_integer()))
            }),
            Modifier::SetVelocity { velocity } => {
                inputs[0].map_notes(|note| Ok(note.with_clamped_velocity(*velocity as i64)))
            }
            Modifier::ScaleDuration { factor } => inputs[0]
                .map_notes(|note| note.with_duration(try_mul(note.duration(), *factor)?)),
            Modifier::SetDuration { duration } => {
                inputs[0].map_notes(|note| note.with_duration(*duration))
            }
            Modifier::Concatenate => inputs[1..]
                .iter()
                .try_fold(inputs[0].clone(), |acc, next| acc.concat(next)),
            Modifier::Merge { policy } => inputs[1..]
                .iter()
                .try_fold(inputs[0].clone(), |acc, next| acc.merge(next, *policy)),
            Modifier::Custom(custom) => custom.forward(inputs),
        }
    }

    /// Shorthand for single-input modifiers
    pub fn apply(&self, input: &Pattern) -> Result<Pattern> {
        self.forward(std::slice::from_ref(input))
    }
}

fn reverse(input: &Pattern) -> Result<Pattern> {
    let duration = input.duration();
    let notes = input
        .iter()
        .map(|(start, note)| Ok((try_sub(try_sub(duration, start)?, note.duration())?, *note)))
        .collect::<Result<Vec<(Time, Note)>>>()?;
    Pattern::collect(notes, duration)
}

fn quantize(input: &Pattern, grid: Time) -> Result<Pattern> {
    let notes = input
        .iter()
        .map(|(start, note)| Ok((try_mul(try_div(start, grid)?.round(), grid)?, *note)))
        .collect::<Result<Vec<(Time, Note)>>>()?;
    Pattern::collect(notes, input.duration())
}

fn stretch(input: &Pattern, factor: Time) -> Result<Pattern> {
    let notes = input
        .iter()
        .map(|(start, note)| {
            let length = try_mul(note.duration(), factor)?;
            Ok((try_mul(start, factor)?, note.with_duration(length)?))
        })
        .collect::<Result<Vec<(Time, Note)>>>()?;
    Pattern::collect(notes, try_mul(input.duration(), factor)?)
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Transpose { semitones } => write!(f, "transpose({:+})", semitones),
            Modifier::Invert { center } => write!(f, "invert({})", center),
            Modifier::Quantize { grid } => write!(f, "quantize({})", grid),
            Modifier::Stretch { factor } => write!(f, "stretch({})", factor),
            Modifier::Shift { delta } => write!(f, "shift({})", delta),
            Modifier::Slice { from, to: Some(to) } => write!(f, "slice({}, {})", from, to),
            Modifier::Slice { from, to: None } => write!(f, "slice({}, end)", from),
            Modifier::ScaleVelocity { factor } => write!(f, "scale_velocity({})", factor),
            Modifier::SetVelocity { velocity } => write!(f, "set_velocity({})", velocity),
            Modifier::ScaleDuration { factor } => write!(f, "scale_duration({})", factor),
            Modifier::SetDuration { duration } => write!(f, "set_duration({})", duration),
            Modifier::Merge { policy } => write!(f, "merge({})", policy),
            Modifier::Custom(custom) => write!(f, "{}({})", custom.name(), custom.fingerprint()),
            Modifier::Reverse | Modifier::Concatenate => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests;

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::float_cmp, clippy::as_conversions)]

use core::cmp::Ordering;
use core::fmt::{self, Debug, Display, Formatter};
use core::hash::{Hash, Hasher};
use core::str::FromStr;

use anyhow::{bail, Result};
use serde::ser::Serializer;
use serde::Serialize;

const F64_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

/// A numeric value. Integers that fit in `i64` are kept exact; everything
/// else is a float.
#[derive(Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn is_integer(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(_) => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= F64_SAFE_INTEGER => {
                Some(*f as i64)
            }
            Number::Float(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => *i == 0,
            Number::Float(f) => *f == 0.0,
        }
    }

    /// Whether `self` is an exact multiple of `divisor`.
    pub fn is_multiple_of(&self, divisor: &Number) -> bool {
        match (self, divisor) {
            (_, d) if d.is_zero() => false,
            (Number::Int(a), Number::Int(b)) => a.checked_rem(*b).map_or(true, |r| r == 0),
            _ => {
                let q = self.as_f64() / divisor.as_f64();
                q.is_finite() && (q - q.round()).abs() <= f64::EPSILON * q.abs().max(1.0)
            }
        }
    }

    /// Truncates toward zero. Fails for NaN, infinities and values outside `i64`.
    pub fn truncate(&self) -> Result<Number> {
        match self {
            Number::Int(_) => Ok(*self),
            Number::Float(f) if f.is_finite() && f.trunc().abs() <= i64::MAX as f64 => {
                Ok(Number::Int(f.trunc() as i64))
            }
            Number::Float(f) => bail!("{f} cannot be represented as an integer"),
        }
    }

    pub fn floor(&self) -> Number {
        match self {
            Number::Int(_) => *self,
            Number::Float(f) if f.is_finite() && f.abs() <= F64_SAFE_INTEGER => {
                Number::Int(f.floor() as i64)
            }
            Number::Float(f) => Number::Float(f.floor()),
        }
    }

    pub fn ceil(&self) -> Number {
        match self {
            Number::Int(_) => *self,
            Number::Float(f) if f.is_finite() && f.abs() <= F64_SAFE_INTEGER => {
                Number::Int(f.ceil() as i64)
            }
            Number::Float(f) => Number::Float(f.ceil()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Integral floats hash like the equal integer.
        match self.as_i64() {
            Some(i) => i.hash(state),
            None => self.as_f64().to_bits().hash(state),
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Number::Int(i) => serializer.serialize_i64(*i),
            Number::Float(f) => serializer.serialize_f64(*f),
        }
    }
}

impl FromStr for Number {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Number::Int(i));
        }
        match s.parse::<f64>() {
            Ok(f) => Ok(Number::Float(f)),
            Err(e) => bail!("`{s}` is not a number: {e}"),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::Int(i64::from(n))
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => Number::Int(i),
            Err(_) => Number::Float(n as f64),
        }
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(i) => Number::Int(i),
            Err(_) => Number::Float(n as f64),
        }
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::Float(n)
    }
}

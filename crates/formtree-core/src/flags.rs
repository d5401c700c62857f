//! Binding and extraction flags.
//!
//! Each flag is a closed enum in Rust, but flags also arrive as integer
//! codes or names from configuration and from callers porting existing
//! form definitions. Those conversions are fallible and report
//! [`FormError::InvalidArgument`] for anything outside the permitted set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormError;

/// Which representation of validated values is hydrated into a bound object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindAs {
    /// Filtered values.
    #[default]
    Normalized,
    /// Values exactly as submitted.
    Raw,
}

impl BindAs {
    /// The integer code for this flag.
    pub const fn code(self) -> u8 {
        match self {
            Self::Normalized => 0x11,
            Self::Raw => 0x12,
        }
    }
}

impl TryFrom<u8> for BindAs {
    type Error = FormError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x11 => Ok(Self::Normalized),
            0x12 => Ok(Self::Raw),
            other => Err(FormError::InvalidArgument(format!(
                "binding flag {other:#04x} is not one of NORMALIZED (0x11) or RAW (0x12)"
            ))),
        }
    }
}

impl FromStr for BindAs {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normalized" => Ok(Self::Normalized),
            "raw" => Ok(Self::Raw),
            other => Err(FormError::InvalidArgument(format!(
                "unknown binding flag '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BindAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalized => write!(f, "normalized"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// Whether a successful validation immediately hydrates the bound object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindOnValidate {
    /// Bind values as soon as validation succeeds.
    #[default]
    OnValidate,
    /// Values are bound only by an explicit `bind_values` call.
    Manual,
}

impl BindOnValidate {
    /// The integer code for this flag.
    pub const fn code(self) -> u8 {
        match self {
            Self::OnValidate => 0x00,
            Self::Manual => 0x01,
        }
    }
}

impl TryFrom<u8> for BindOnValidate {
    type Error = FormError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x00 => Ok(Self::OnValidate),
            0x01 => Ok(Self::Manual),
            other => Err(FormError::InvalidArgument(format!(
                "validate-on-bind flag {other:#04x} is not one of ON_VALIDATE (0x00) or MANUAL (0x01)"
            ))),
        }
    }
}

impl FromStr for BindOnValidate {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on_validate" => Ok(Self::OnValidate),
            "manual" => Ok(Self::Manual),
            other => Err(FormError::InvalidArgument(format!(
                "unknown validate-on-bind flag '{other}'"
            ))),
        }
    }
}

/// The shape requested from `Form::get_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFlag {
    /// The bound object if there is one, otherwise the filtered values.
    #[default]
    Normalized,
    /// The bound object if there is one, otherwise the raw values.
    Raw,
    /// Always the filtered values as a plain map, even when an object is bound.
    AsMap,
}

impl TryFrom<u8> for DataFlag {
    type Error = FormError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x11 => Ok(Self::Normalized),
            0x12 => Ok(Self::Raw),
            0x13 => Ok(Self::AsMap),
            other => Err(FormError::InvalidArgument(format!(
                "data flag {other:#04x} is not one of NORMALIZED, RAW or AS_MAP"
            ))),
        }
    }
}

impl From<BindAs> for DataFlag {
    fn from(flag: BindAs) -> Self {
        match flag {
            BindAs::Normalized => Self::Normalized,
            BindAs::Raw => Self::Raw,
        }
    }
}

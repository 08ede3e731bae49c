//! Parameter sets handed to the worker program.
//!
//! A [`ParameterSet`] is an ordered mapping from option name to an optional
//! value. The order entries were inserted in is the order their tokens appear
//! in the worker's argument list.

use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed exponents for `ngrain`, which is always a power of two.
pub const NGRAIN_EXPONENTS: RangeInclusive<u32> = 6..=18;

/// `grain_size` used by the hexagonal grain shape, which cannot be changed.
pub const HEX_GRAIN_SIZE: i64 = 443;

const DEFAULT_NGRAIN_EXPONENT: u32 = 10;
const DEFAULT_GRAIN_SIZE: i64 = 512;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Parses a textual override such as the value half of `-p key=value`.
    ///
    /// Returns `None` for an empty string, which marks the option as absent.
    pub fn parse_override(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        match text {
            "true" => return Some(Self::Bool(true)),
            "false" => return Some(Self::Bool(false)),
            _ => {}
        }

        if let Ok(integer) = text.parse::<i64>() {
            return Some(Self::Integer(integer));
        }

        if let Ok(float) = text.parse::<f64>() {
            if float.is_finite() {
                return Some(Self::Float(float));
            }
        }

        Some(Self::String(text.to_string()))
    }

    /// True for values that contribute no token at all.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }
}

impl Display for ParameterValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(formatter, "{b}"),
            Self::Integer(i) => write!(formatter, "{i}"),
            Self::Float(f) => write!(formatter, "{f}"),
            Self::String(s) => formatter.write_str(s),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: IndexMap<String, Option<ParameterValue>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The option set the PRIMME `run_script.py` worker starts from.
    pub fn primme_defaults() -> Self {
        let mut parameters = Self::new();
        parameters
            .set(
                "trainset",
                "./data/trainset_spparks_sz(257x257)_ng(256-256)_nsets(200)_future(4)_max(100)_kt(0.66)_cut(0).h5",
            )
            .unset("modelname")
            .set("dims", 2_i64)
            .set("if_plot", false)
            .set("num_eps", 1000_i64)
            .set("obs_dim", 17_i64)
            .set("act_dim", 17_i64)
            .set("lr", 5e-5_f64)
            .set("reg", 1_i64)
            .set("nsteps", 1000_i64)
            .set("n_samples", 200_i64)
            .set("mode", "Single_Step")
            .set("grain_shape", "grain")
            .set("grain_size", DEFAULT_GRAIN_SIZE)
            .set("voroni_loaded", false)
            .set("ic", "./data/ic.npy")
            .set("ea", "./data/ea.npy")
            .set("ma", "./data/ma.npy")
            .set("ic_shape", "grain(512_512_512)")
            .set("size", 93_i64)
            .set("dimension", 2_i64)
            .set("ngrain", 1_i64 << DEFAULT_NGRAIN_EXPONENT)
            .unset("primme")
            .set("pad_mode", "circular")
            .set("if_output_plot", false);
        parameters
    }

    /// Sets `name` to `value`. An existing entry keeps its position.
    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) -> &mut Self {
        self.insert(name, Some(value.into()))
    }

    /// Marks `name` as present in the set but without a value.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.insert(name, None)
    }

    pub fn insert(&mut self, name: &str, value: Option<ParameterValue>) -> &mut Self {
        self.entries.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Applies every entry of `overrides` on top of this set.
    pub fn merge(&mut self, overrides: &ParameterSet) {
        for (name, value) in overrides.iter() {
            self.insert(name, value.cloned());
        }
    }

    /// Sets `ngrain` to `2^exponent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterRange`] if `exponent` is outside [`NGRAIN_EXPONENTS`].
    pub fn set_ngrain_exponent(&mut self, exponent: u32) -> Result<&mut Self> {
        if !NGRAIN_EXPONENTS.contains(&exponent) {
            return Err(Error::ParameterRange {
                name: "ngrain exponent".to_string(),
                value: i64::from(exponent),
                min: i64::from(*NGRAIN_EXPONENTS.start()),
                max: i64::from(*NGRAIN_EXPONENTS.end()),
            });
        }

        Ok(self.set("ngrain", 1_i64 << exponent))
    }

    /// Applies the settings tied to the current `grain_shape`.
    ///
    /// Choosing `grain` resets `ngrain` and `grain_size` to their defaults;
    /// `hex` pins `grain_size` to [`HEX_GRAIN_SIZE`]. Other shapes change nothing.
    pub fn apply_grain_shape(&mut self) -> &mut Self {
        let shape = match self.get("grain_shape") {
            Some(ParameterValue::String(shape)) => Some(shape.clone()),
            _ => None,
        };

        match shape.as_deref() {
            Some("grain") => self
                .set("ngrain", 1_i64 << DEFAULT_NGRAIN_EXPONENT)
                .set("grain_size", DEFAULT_GRAIN_SIZE),
            Some("hex") => self.set("grain_size", HEX_GRAIN_SIZE),
            _ => self,
        }
    }

    fn is_hex(&self) -> bool {
        matches!(self.get("grain_shape"), Some(ParameterValue::String(shape)) if shape == "hex")
    }

    /// Applies `key=value` overrides as given on the command line.
    ///
    /// Overrides are applied in order. Setting `grain_shape` applies its
    /// [grain shape settings](Self::apply_grain_shape) at that point, so later
    /// overrides can adjust them, except the hexagonal `grain_size`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterFormat`] if an override has no `=` or an empty key.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        for raw in overrides {
            let Some((key, value)) = raw.split_once('=') else {
                return Err(Error::ParameterFormat(raw.clone()));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(Error::ParameterFormat(raw.clone()));
            }

            self.insert(key, ParameterValue::parse_override(value));
            if key == "grain_shape" {
                self.apply_grain_shape();
            }
        }

        if self.is_hex() {
            self.set("grain_size", HEX_GRAIN_SIZE);
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParameterValue>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

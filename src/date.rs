//! Build Date Word
//!
//! The gateware exposes the build date as one 32-bit register:
//! `day << 24 | month << 16 | (year % 100) << 8`, low byte zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid build date word: {0}")]
    InvalidHex(String),

    #[error("Build date word {0:#010x} does not hold a valid date")]
    OutOfRange(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildDate {
    pub day: u8,
    pub month: u8,
    /// Two-digit year, `year % 100`
    pub year: u8,
}

impl BuildDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day: date.day() as u8,
            month: date.month() as u8,
            year: date.year().rem_euclid(100) as u8,
        }
    }

    pub fn pack(&self) -> u32 {
        (self.day as u32) << 24 | (self.month as u32) << 16 | (self.year as u32) << 8
    }

    /// Decode a packed word. Rejects words whose day or month could not
    /// have come from a calendar date.
    pub fn unpack(word: u32) -> Result<Self, DateError> {
        let date = Self {
            day: (word >> 24) as u8,
            month: (word >> 16) as u8,
            year: (word >> 8) as u8,
        };
        if word & 0xff != 0
            || !(1..=31).contains(&date.day)
            || !(1..=12).contains(&date.month)
            || date.year > 99
        {
            return Err(DateError::OutOfRange(word));
        }
        Ok(date)
    }

    pub fn to_hex(&self) -> String {
        format!("{:08x}", self.pack())
    }

    pub fn from_hex(text: &str) -> Result<Self, DateError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DateError::InvalidHex(text.to_string()));
        }
        let word = u32::from_str_radix(digits, 16)
            .map_err(|_| DateError::InvalidHex(text.to_string()))?;
        Self::unpack(word)
    }
}

impl std::fmt::Display for BuildDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.day, self.month, self.year)
    }
}

impl Serialize for BuildDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BuildDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

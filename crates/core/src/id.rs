// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type and control-plane id validation.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::error::Error;

/// Length of a generated session id: 8 random bytes as lowercase hex.
pub const SESSION_ID_LEN: usize = 16;

const HEX_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Unique identifier for a supervised session.
///
/// Generated ids are always 16 lowercase-hex characters. Ids read back
/// from persisted state are validated on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session id.
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(SESSION_ID_LEN, &HEX_ALPHABET))
    }

    /// Parse an id from persisted state or a trusted source.
    ///
    /// Accepts exactly 16 lowercase-hex characters.
    pub fn parse(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        let ok = s.len() == SESSION_ID_LEN
            && s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if ok {
            Ok(Self(s))
        } else {
            Err(Error::Invalid(format!("malformed session id: {:?}", s)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        Self::parse(s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Validate an id arriving over the control plane.
///
/// Inbound ids are used in lookups and error messages only, but they must
/// never contain path separators, percent escapes, or whitespace. The
/// accepted set is `[A-Za-z0-9]{1,64}`.
pub fn validate_client_id(id: &str) -> Result<(), Error> {
    let ok = !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(Error::Invalid(format!("malformed session id: {:?}", id)))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

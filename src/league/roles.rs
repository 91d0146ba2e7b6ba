//! Normalization of raw EA position labels into coarse roles.
//!
//! Display enrichment only: roles never feed into standings math.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Goalkeeper,
    Defence,
    Midfield,
    Attack,
    Unknown,
}

impl Role {
    /// Maps a raw position code or free-text label to a role. Unknown or
    /// unparseable input yields [`Role::Unknown`].
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Role::Unknown;
        };
        let pos = raw.to_lowercase();

        if pos.contains("attack") || pos.contains("forward") {
            Role::Attack
        } else if pos.contains("mid") {
            Role::Midfield
        } else if pos.contains("def") {
            Role::Defence
        } else if pos.contains("keeper") || pos.contains("gk") {
            Role::Goalkeeper
        } else {
            Role::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Goalkeeper => "Goalkeeper",
            Role::Defence => "Defence",
            Role::Midfield => "Midfield",
            Role::Attack => "Attack",
            Role::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

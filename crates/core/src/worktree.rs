// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree descriptors and isolation-branch naming.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::SessionId;

/// Branch namespace for isolation worktrees.
pub const BRANCH_PREFIX: &str = "orbital/";

/// A tracked isolation worktree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeDescriptor {
    /// Unique human name, `<adjective>-<animal>`.
    pub name: String,
    /// Absolute checkout path under `.orbital/worktrees/`.
    pub path: PathBuf,
    /// Isolation branch, `orbital/<name>`.
    pub branch: String,
    /// Branch the worktree was created from; merge target.
    pub original_branch: String,
    pub created_at: DateTime<Utc>,
    pub spec_files: Vec<PathBuf>,
    pub session_id: SessionId,
}

const ADJECTIVES: [&str; 50] = [
    "amber", "ancient", "autumn", "billowing", "bitter", "black", "blue", "bold", "brave",
    "bright", "broken", "calm", "cold", "cool", "crimson", "curly", "damp", "dark", "dawn",
    "delicate", "divine", "dry", "empty", "falling", "fancy", "floral", "fragrant", "frosty",
    "gentle", "green", "hidden", "holy", "icy", "jolly", "late", "lingering", "little", "lively",
    "misty", "morning", "muddy", "nameless", "patient", "polished", "proud", "quiet", "restless",
    "silent", "twilight", "wandering",
];

const ANIMALS: [&str; 50] = [
    "badger", "bat", "bear", "beaver", "bison", "camel", "cheetah", "cobra", "condor", "crane",
    "deer", "dolphin", "eagle", "falcon", "ferret", "finch", "fox", "gazelle", "gecko", "heron",
    "hedgehog", "ibex", "jackal", "jaguar", "koala", "lemur", "leopard", "lynx", "marmot",
    "meerkat", "mole", "moose", "narwhal", "ocelot", "osprey", "otter", "owl", "panther",
    "pelican", "puffin", "raccoon", "raven", "salmon", "seal", "sparrow", "stork", "tapir",
    "toucan", "walrus", "wolf",
];

/// Generate a worktree name not present in `taken`.
///
/// Names are `<adjective>-<animal>` drawn from the fixed vocabularies;
/// when random draws keep colliding a numeric suffix is appended until
/// the name is free.
pub fn generate_worktree_name(taken: &[String]) -> String {
    let mut rng = rand::thread_rng();
    for _ in 0..64 {
        let name = base_name(&mut rng);
        if !taken.iter().any(|t| t == &name) {
            return name;
        }
    }
    // Vocabulary nearly exhausted: fall back to a numeric suffix.
    let base = base_name(&mut rng);
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.iter().any(|t| t == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn base_name(rng: &mut impl rand::Rng) -> String {
    let adjective = ADJECTIVES.choose(rng).unwrap_or(&ADJECTIVES[0]);
    let animal = ANIMALS.choose(rng).unwrap_or(&ANIMALS[0]);
    format!("{}-{}", adjective, animal)
}

/// Branch name for a worktree name.
pub fn branch_for(name: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, name)
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;

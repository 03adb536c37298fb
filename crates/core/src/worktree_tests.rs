// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_name_is_adjective_animal() {
    let name = generate_worktree_name(&[]);
    let parts: Vec<_> = name.split('-').collect();
    assert_eq!(parts.len(), 2);
    assert!(ADJECTIVES.contains(&parts[0]));
    assert!(ANIMALS.contains(&parts[1]));
}

#[test]
fn generated_name_avoids_taken() {
    let taken: Vec<String> = vec![generate_worktree_name(&[])];
    for _ in 0..50 {
        let name = generate_worktree_name(&taken);
        assert_ne!(name, taken[0]);
    }
}

#[test]
fn exhausted_vocabulary_gets_numeric_suffix() {
    // Mark every combination as taken; the generator must still produce
    // a unique name via the suffix path.
    let mut taken = Vec::with_capacity(ADJECTIVES.len() * ANIMALS.len());
    for adj in ADJECTIVES {
        for animal in ANIMALS {
            taken.push(format!("{}-{}", adj, animal));
        }
    }
    let name = generate_worktree_name(&taken);
    assert!(!taken.contains(&name));
    assert_eq!(name.split('-').count(), 3);
    assert!(name.split('-').nth(2).unwrap().parse::<u32>().is_ok());
}

#[test]
fn branch_carries_prefix() {
    assert_eq!(branch_for("quiet-otter"), "orbital/quiet-otter");
}

#[test]
fn descriptor_round_trips() {
    let descriptor = WorktreeDescriptor {
        name: "quiet-otter".into(),
        path: "/p/.orbital/worktrees/quiet-otter".into(),
        branch: branch_for("quiet-otter"),
        original_branch: "main".into(),
        created_at: chrono::Utc::now(),
        spec_files: vec!["/p/spec.md".into()],
        session_id: SessionId::generate(),
    };
    let json = serde_json::to_string(&descriptor).unwrap();
    let back: WorktreeDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(descriptor, back);
}

#[test]
fn vocabularies_are_fixed_size() {
    assert_eq!(ADJECTIVES.len(), 50);
    assert_eq!(ANIMALS.len(), 50);
}

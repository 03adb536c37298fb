// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue specs under cross-handle contention.

use super::prelude::*;
use orbital_storage::SpecQueue;
use std::path::PathBuf;

fn open_queue(dir: &std::path::Path) -> SpecQueue {
    let paths = ProjectPaths::new(dir);
    paths.ensure_dirs().unwrap();
    SpecQueue::open(&paths).unwrap()
}

#[test]
fn pop_all_under_concurrent_adds_yields_the_union() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().to_path_buf();

    let writers: Vec<_> = (0..6)
        .map(|w| {
            let dir = dir.clone();
            std::thread::spawn(move || {
                let mut queue = open_queue(&dir);
                for i in 0..20 {
                    queue.add(format!("/specs/w{}-{}.md", w, i)).unwrap();
                }
            })
        })
        .collect();

    // A competing drainer keeps popping while adds are in flight.
    let drainer = {
        let dir = dir.clone();
        std::thread::spawn(move || {
            let mut queue = open_queue(&dir);
            let mut drained: Vec<PathBuf> = Vec::new();
            for _ in 0..40 {
                drained.extend(queue.pop_all().unwrap());
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            drained
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    let mut drained = drainer.join().unwrap();
    let mut final_queue = open_queue(&dir);
    drained.extend(final_queue.pop_all().unwrap());

    // Every add is drained exactly once, and the queue ends empty.
    assert_eq!(drained.len(), 120);
    let unique: std::collections::HashSet<_> = drained.iter().collect();
    assert_eq!(unique.len(), 120);
    assert!(open_queue(&dir).is_empty());
}

#[test]
fn idempotent_add_across_handles() {
    let temp = tempfile::tempdir().unwrap();
    let mut first = open_queue(temp.path());
    let mut second = open_queue(temp.path());

    assert!(first.add("/specs/a.md").unwrap());
    assert!(!second.add("/specs/a.md").unwrap());
    assert_eq!(second.len(), 1);
}

#[test]
fn remove_twice_fails_the_second_time() {
    let temp = tempfile::tempdir().unwrap();
    let mut queue = open_queue(temp.path());
    queue.add("/specs/a.md").unwrap();

    queue.remove(std::path::Path::new("/specs/a.md")).unwrap();
    let err = queue.remove(std::path::Path::new("/specs/a.md")).unwrap_err();
    assert!(matches!(err, orbital_core::Error::NotFound(_)));
}

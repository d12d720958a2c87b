//! # Modification Tracker Integration Test

mod common;

use std::fs;
use std::sync::Arc;
use std::thread;

use cartograph_render::ModificationTracker;
use cartograph_world::RegionPos;
use common::temp_dir;

#[test]
fn test_round_trip_empty() {
    let dir = temp_dir("tracker_empty");
    let path = dir.join("nested").join("world.tracker");

    let tracker = ModificationTracker::new(&path);
    tracker.save().unwrap();
    assert!(path.exists());

    let loaded = ModificationTracker::load(&path).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.entries(), Vec::new());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_round_trip_entries() {
    let dir = temp_dir("tracker_entries");
    let path = dir.join("world.tracker");

    let tracker = ModificationTracker::new(&path);
    let positions = [
        (RegionPos::new(0, 0), 1_700_000_000_000),
        (RegionPos::new(-1, -1), 1),
        (RegionPos::new(i32::MIN, i32::MAX), -5),
        (RegionPos::new(31, -200), i64::MAX),
    ];
    for &(pos, millis) in &positions {
        tracker.set(pos, millis);
    }
    tracker.set(RegionPos::new(0, 0), 1_700_000_000_001);
    tracker.save().unwrap();

    let loaded = ModificationTracker::load(&path).unwrap();
    assert_eq!(loaded.entries(), tracker.entries());
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.get(RegionPos::new(0, 0)), Some(1_700_000_000_001));
    assert_eq!(loaded.get(RegionPos::new(i32::MIN, i32::MAX)), Some(-5));
    assert_eq!(loaded.get(RegionPos::new(5, 5)), None);

    fs::remove_dir_all(&dir).ok();
}

/// Workers record regions concurrently and out of order.
#[test]
fn test_concurrent_updates() {
    let dir = temp_dir("tracker_concurrent");
    let tracker = Arc::new(ModificationTracker::new(dir.join("w.tracker")));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for i in 0..100 {
                    tracker.set(RegionPos::new(t, i), i64::from(t * 1000 + i));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    tracker.save().unwrap();

    let loaded = ModificationTracker::load(tracker.path()).unwrap();
    assert_eq!(loaded.len(), 800);
    assert_eq!(loaded.get(RegionPos::new(7, 99)), Some(7099));

    fs::remove_dir_all(&dir).ok();
}

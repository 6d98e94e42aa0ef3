use dedupe::duplicates::{AttributeKey, Duplicate, MatchIndex, PriorityOrder};
use dedupe::scanner::{CompareModes, FileDescriptor, Hasher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

fn descriptor(path: &Path) -> FileDescriptor {
    let metadata = fs::metadata(path).unwrap();
    FileDescriptor::from_metadata(
        path.to_path_buf(),
        metadata.len(),
        SystemTime::UNIX_EPOCH,
        &CompareModes::default(),
    )
}

fn index(roots: &[&Path]) -> MatchIndex {
    let roots: Vec<PathBuf> = roots.iter().map(|r| r.to_path_buf()).collect();
    MatchIndex::new(Hasher::new(true, true), PriorityOrder::new(roots))
}

#[test]
fn test_lone_file_is_never_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lonely");
    fs::write(&path, b"nobody else has this size").unwrap();
    let file = descriptor(&path);

    // Removing the file proves classification did not need its bytes.
    fs::remove_file(&path).unwrap();
    let index = index(&[dir.path()]);

    assert_eq!(index.classify(&file), None);
    let stats = index.stats();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.hash_errors, 0);

    let bucket = index.bucket(&AttributeKey::from(&file)).unwrap();
    assert!(!bucket.is_promoted());
    assert_eq!(bucket.pending_path(), Some(path));
}

#[test]
fn test_pending_file_deleted_before_second_arrival() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let third = dir.path().join("third");
    for p in [&first, &second, &third] {
        fs::write(p, b"same same").unwrap();
    }
    let index = index(&[dir.path()]);

    let first_file = descriptor(&first);
    assert_eq!(index.classify(&first_file), None);
    fs::remove_file(&first).unwrap();

    // The vanished pending path is dropped; the arrival takes its place.
    assert_eq!(index.classify(&descriptor(&second)), None);
    assert_eq!(index.stats().hash_errors, 1);

    assert_eq!(
        index.classify(&descriptor(&third)),
        Some(Duplicate {
            retained: second.clone(),
            relocate: third,
        })
    );
}

#[test]
fn test_same_prefix_different_tail() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let mut content = vec![b'x'; 4096];
    fs::write(&a, &content).unwrap();
    content[4000] = b'y';
    fs::write(&b, &content).unwrap();

    let index = index(&[dir.path()]);
    assert_eq!(index.classify(&descriptor(&a)), None);
    assert_eq!(index.classify(&descriptor(&b)), None);

    let stats = index.stats();
    assert_eq!(stats.attribute_matches, 1);
    assert_eq!(stats.head_matches, 1);
    assert_eq!(stats.full_matches, 0);
}

#[test]
fn test_reclassifying_a_known_path_is_not_a_duplicate() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"twins").unwrap();
    fs::write(&b, b"twins").unwrap();

    let index = index(&[dir.path()]);
    index.classify(&descriptor(&a));
    assert!(index.classify(&descriptor(&b)).is_some());
    assert_eq!(index.classify(&descriptor(&a)), None);
    assert_eq!(index.stats().duplicates, 1);
}

#[test]
fn test_disabled_attributes_do_not_split_buckets() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"one").unwrap();
    fs::write(&b, b"two").unwrap();

    let modes = CompareModes {
        mod_time: false,
        name: false,
        size: true,
        hash: false,
        contents: false,
    };
    let describe = |p: &Path| FileDescriptor::from_metadata(p.to_path_buf(), 3, SystemTime::now(), &modes);
    let index = MatchIndex::new(Hasher::new(false, false), PriorityOrder::new(vec![dir.path().to_path_buf()]));

    index.classify(&describe(&a));
    assert!(index.classify(&describe(&b)).is_some());
    assert_eq!(index.len(), 1);
}

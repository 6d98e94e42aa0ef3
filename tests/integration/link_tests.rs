#![cfg(unix)]

use dedupe::scanner::{VisitedSet, Walker, WalkerConfig};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn walk_all(config: WalkerConfig, roots: &[&Path]) -> (Vec<PathBuf>, usize) {
    let walker = Walker::new(config, Arc::new(VisitedSet::new()));
    let mut files = Vec::new();
    let mut errors = 0;
    for root in roots {
        for entry in walker.walk(root) {
            match entry {
                Ok(file) => files.push(file.path),
                Err(_) => errors += 1,
            }
        }
    }
    files.sort();
    (files, errors)
}

fn following() -> WalkerConfig {
    WalkerConfig {
        follow_symlinks: true,
        ..Default::default()
    }
}

#[test]
fn test_symlinks_ignored_by_default() {
    let dir = tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let original = base.join("original.txt");
    fs::write(&original, b"content").unwrap();
    symlink(&original, base.join("link.txt")).unwrap();
    fs::create_dir(base.join("real")).unwrap();
    fs::write(base.join("real/inner"), b"inner").unwrap();
    symlink(base.join("real"), base.join("dirlink")).unwrap();

    let (files, errors) = walk_all(WalkerConfig::default(), &[&base]);

    assert_eq!(files, vec![original, base.join("real/inner")]);
    assert_eq!(errors, 0);
}

#[test]
fn test_followed_file_link_reports_target_once() {
    let dir = tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let original = base.join("original.txt");
    fs::write(&original, b"content").unwrap();
    symlink(&original, base.join("link.txt")).unwrap();

    let (files, _) = walk_all(following(), &[&base]);

    assert_eq!(files, vec![original]);
}

#[test]
fn test_followed_link_outside_root() {
    let outside = tempdir().unwrap();
    let outside_base = outside.path().canonicalize().unwrap();
    fs::write(outside_base.join("elsewhere"), b"far away").unwrap();

    let dir = tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    symlink(&outside_base, base.join("portal")).unwrap();

    let (files, _) = walk_all(following(), &[&base]);

    // Paths are reported by their resolved location.
    assert_eq!(files, vec![outside_base.join("elsewhere")]);
}

#[test]
fn test_symlink_cycle_terminates() {
    let dir = tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    fs::create_dir(base.join("a")).unwrap();
    fs::write(base.join("a/file"), b"data").unwrap();
    symlink(&base, base.join("a/back-to-top")).unwrap();

    let (files, _) = walk_all(following(), &[&base]);

    assert_eq!(files, vec![base.join("a/file")]);
}

#[test]
fn test_dangling_link_is_an_error_when_following() {
    let dir = tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    symlink(base.join("gone"), base.join("dangling")).unwrap();
    fs::write(base.join("present"), b"here").unwrap();

    let (files, errors) = walk_all(following(), &[&base]);
    assert_eq!(files, vec![base.join("present")]);
    assert_eq!(errors, 1);

    let (files, errors) = walk_all(WalkerConfig::default(), &[&base]);
    assert_eq!(files, vec![base.join("present")]);
    assert_eq!(errors, 0);
}

#[test]
fn test_link_into_second_root_is_not_a_duplicate() {
    let high = tempdir().unwrap();
    let low = tempdir().unwrap();
    let high_base = high.path().canonicalize().unwrap();
    let low_base = low.path().canonicalize().unwrap();
    fs::write(high_base.join("photo.jpg"), b"pixels").unwrap();
    symlink(high_base.join("photo.jpg"), low_base.join("photo-link.jpg")).unwrap();

    let (files, _) = walk_all(following(), &[&high_base, &low_base]);

    assert_eq!(files, vec![high_base.join("photo.jpg")]);
}

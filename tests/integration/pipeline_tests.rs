use dedupe::actions::{destination_for, Relocator};
use dedupe::duplicates::{MatchIndex, PriorityOrder};
use dedupe::error::ExitCode;
use dedupe::output::{OutputFormat, Reporter};
use dedupe::pipeline::{Pipeline, PipelineConfig, PipelineSummary};
use dedupe::scanner::{CompareModes, Hasher, WalkerConfig};
use filetime::FileTime;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Writer whose bytes can be read back after the run.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

struct Run {
    summary: PipelineSummary,
    lines: Vec<String>,
}

fn run(roots: &[&Path], trash: Option<&Path>, walker: WalkerConfig, format: OutputFormat) -> Run {
    let roots: Vec<PathBuf> = roots.iter().map(|r| r.to_path_buf()).collect();
    let hasher = Hasher::new(walker.compare.hash, walker.compare.contents);
    let config = PipelineConfig {
        roots: roots.clone(),
        walker,
        ..Default::default()
    };
    let out = Captured::default();
    let pipeline = Pipeline::new(
        config,
        MatchIndex::new(hasher, PriorityOrder::new(roots)),
        Relocator::new(trash.map(Path::to_path_buf)),
        Reporter::new(format, Box::new(out.clone())),
    );
    let summary = pipeline.run();
    Run {
        summary,
        lines: out.lines(),
    }
}

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn canonical_tempdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let base = dir.path().canonicalize().unwrap();
    (dir, base)
}

#[test]
fn test_high_priority_copy_is_kept() {
    let (_dir, base) = canonical_tempdir();
    let high = base.join("priority-high");
    let low = base.join("priority-low");
    let trash = base.join("trash");
    fs::create_dir_all(&trash).unwrap();
    write(&high.join("a.txt"), b"hello");
    write(&low.join("a.txt"), b"hello");

    let result = run(
        &[&high, &low],
        Some(&trash),
        WalkerConfig::default(),
        OutputFormat::Text,
    );

    let moved_to = destination_for(&trash, &low.join("a.txt"));
    assert!(high.join("a.txt").exists());
    assert!(!low.join("a.txt").exists());
    assert_eq!(fs::read(&moved_to).unwrap(), b"hello");

    assert_eq!(result.summary.matches.duplicates, 1);
    assert_eq!(result.summary.relocated, 1);
    assert_eq!(
        result.lines,
        vec![
            format!(
                "Dupe:\t{}\t{}",
                high.join("a.txt").display(),
                low.join("a.txt").display()
            ),
            format!(
                "Move:\t{}\t{}",
                low.join("a.txt").display(),
                moved_to.display()
            ),
        ]
    );
}

#[test]
fn test_root_order_not_path_order_decides() {
    let (_dir, base) = canonical_tempdir();
    // "zzz" sorts after "aaa" but is listed first.
    let first = base.join("zzz");
    let second = base.join("aaa");
    write(&first.join("x.bin"), b"payload");
    write(&second.join("x.bin"), b"payload");

    let result = run(&[&first, &second], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.matches.duplicates, 1);
    assert!(result.lines[0].starts_with(&format!("Dupe:\t{}", first.join("x.bin").display())));
    assert_eq!(
        result.lines[1],
        format!("Move:\t{}", second.join("x.bin").display())
    );
}

#[test]
fn test_min_size_skips_small_duplicates() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("small1"), &[7u8; 100]);
    write(&base.join("small2"), &[7u8; 100]);
    write(&base.join("big1"), &[9u8; 8192]);
    write(&base.join("big2"), &[9u8; 8192]);

    let walker = WalkerConfig {
        min_size: 4096,
        ..Default::default()
    };
    let result = run(&[&base], None, walker, OutputFormat::Text);

    assert_eq!(result.summary.files_discovered, 2);
    assert_eq!(result.summary.matches.duplicates, 1);
    assert!(result.lines.iter().all(|l| !l.contains("small")));
}

#[test]
fn test_empty_files_ignored_by_default() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("e1"), b"");
    write(&base.join("e2"), b"");

    let result = run(&[&base], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.files_discovered, 0);
    assert!(result.lines.is_empty());
}

#[test]
fn test_modification_time_separates_copies() {
    let (_dir, base) = canonical_tempdir();
    let a = base.join("a");
    let b = base.join("b");
    let c = base.join("c");
    write(&a, b"same");
    write(&b, b"same");
    write(&c, b"same");
    filetime::set_file_mtime(&a, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    filetime::set_file_mtime(&b, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    filetime::set_file_mtime(&c, FileTime::from_unix_time(2_000_000, 0)).unwrap();

    let walker = WalkerConfig {
        compare: CompareModes {
            mod_time: true,
            ..CompareModes::default()
        },
        ..Default::default()
    };
    let result = run(&[&base], None, walker, OutputFormat::Text);

    assert_eq!(result.summary.matches.duplicates, 1);
    let dupe = &result.lines[0];
    assert!(!dupe.contains(&c.display().to_string()));
}

#[test]
fn test_name_comparison_separates_copies() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("one/report.pdf"), b"content");
    write(&base.join("two/report.pdf"), b"content");
    write(&base.join("two/other.pdf"), b"content");

    let walker = WalkerConfig {
        compare: CompareModes {
            name: true,
            ..CompareModes::default()
        },
        ..Default::default()
    };
    let result = run(&[&base], None, walker, OutputFormat::Text);

    assert_eq!(result.summary.matches.duplicates, 1);
    assert!(result.lines[0].contains("one/report.pdf"));
    assert!(result.lines[0].contains("two/report.pdf"));
}

#[test]
fn test_size_only_matches_different_content() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("a"), b"abcd");
    write(&base.join("b"), b"wxyz");

    let walker = WalkerConfig {
        compare: CompareModes {
            size: true,
            hash: false,
            contents: false,
            ..CompareModes::default()
        },
        ..Default::default()
    };
    let result = run(&[&base], None, walker, OutputFormat::Text);

    assert_eq!(result.summary.matches.duplicates, 1);
}

#[test]
fn test_byte_comparison_confirms_real_duplicates() {
    let (_dir, base) = canonical_tempdir();
    let mut content = vec![0u8; 64 * 1024];
    content.iter_mut().enumerate().for_each(|(i, b)| *b = (i % 251) as u8);
    write(&base.join("a"), &content);
    write(&base.join("b"), &content);
    content[60_000] ^= 1;
    write(&base.join("c"), &content);

    let walker = WalkerConfig {
        compare: CompareModes {
            contents: true,
            ..CompareModes::default()
        },
        ..Default::default()
    };
    let result = run(&[&base], None, walker, OutputFormat::Text);

    assert_eq!(result.summary.files_discovered, 3);
    assert_eq!(result.summary.matches.head_matches, 2);
    assert_eq!(result.summary.matches.duplicates, 1);
}

#[test]
fn test_three_copies_relocate_two() {
    let (_dir, base) = canonical_tempdir();
    let high = base.join("high");
    let low = base.join("low");
    let trash = base.join("trash");
    fs::create_dir_all(&trash).unwrap();
    write(&high.join("keep"), b"triplicate");
    write(&low.join("x/one"), b"triplicate");
    write(&low.join("y/two"), b"triplicate");

    let result = run(&[&high, &low], Some(&trash), WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.matches.duplicates, 2);
    assert_eq!(result.summary.relocated, 2);
    assert!(high.join("keep").exists());
    assert!(!low.join("x/one").exists());
    assert!(!low.join("y/two").exists());
}

#[test]
fn test_same_root_twice_is_walked_once() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("a"), b"alone");

    let result = run(&[&base, &base], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.roots, 2);
    assert_eq!(result.summary.files_discovered, 1);
    assert_eq!(result.summary.matches.duplicates, 0);
}

#[test]
fn test_nested_root_files_seen_once() {
    let (_dir, base) = canonical_tempdir();
    let inner = base.join("inner");
    write(&inner.join("a"), b"only one copy");

    let result = run(&[&base, &inner], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.files_discovered, 1);
    assert!(result.lines.is_empty());
}

#[test]
fn test_missing_root_is_a_scan_error() {
    let (_dir, base) = canonical_tempdir();
    let missing = base.join("does-not-exist");
    write(&base.join("present/a"), b"x");

    let present = base.join("present");
    let result = run(&[&missing, &present], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.scan_errors, 1);
    assert_eq!(result.summary.files_discovered, 1);
}

#[test]
fn test_existing_destination_is_not_overwritten() {
    let (_dir, base) = canonical_tempdir();
    let high = base.join("high");
    let low = base.join("low");
    let trash = base.join("trash");
    write(&high.join("a"), b"dup");
    write(&low.join("a"), b"dup");
    write(&destination_for(&trash, &low.join("a")), b"previous run");

    let result = run(&[&high, &low], Some(&trash), WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.summary.relocation_failures, 1);
    assert_eq!(result.summary.relocated, 0);
    assert!(low.join("a").exists());
    assert_eq!(
        fs::read(destination_for(&trash, &low.join("a"))).unwrap(),
        b"previous run"
    );
    // The decision is still reported, the move is not.
    assert_eq!(result.lines.len(), 1);
    assert!(result.lines[0].starts_with("Dupe:"));
}

#[test]
fn test_spaces_are_escaped_in_text_output() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("my file"), b"spaced");
    write(&base.join("my file 2"), b"spaced");

    let result = run(&[&base], None, WalkerConfig::default(), OutputFormat::Text);

    assert_eq!(result.lines.len(), 2);
    assert!(result.lines[0].contains("my\\ file"));
    assert!(!result.lines[0].contains("my file"));
}

#[test]
fn test_json_output_lines() {
    let (_dir, base) = canonical_tempdir();
    write(&base.join("a"), b"json");
    write(&base.join("b"), b"json");

    let result = run(&[&base], None, WalkerConfig::default(), OutputFormat::Json);

    let events: Vec<serde_json::Value> = result
        .lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "duplicate");
    assert_eq!(events[0]["retained"], base.join("a").display().to_string());
    assert_eq!(events[0]["relocated"], base.join("b").display().to_string());
    assert_eq!(events[1]["event"], "move");
    assert!(events[1]["destination"].is_null());
}

#[test]
fn test_many_files_many_workers() {
    let (_dir, base) = canonical_tempdir();
    let roots: Vec<PathBuf> = (0..4).map(|i| base.join(format!("root{i}"))).collect();
    for (r, root) in roots.iter().enumerate() {
        for f in 0..25 {
            // Content shared across roots, unique within one.
            write(&root.join(format!("d{}/f{f}", f % 3)), format!("file {f}").as_bytes());
        }
        write(&root.join("own"), format!("root {r} only").as_bytes());
    }

    let config = PipelineConfig {
        roots: roots.clone(),
        scanners: 4,
        matchers: 8,
        movers: 3,
        match_buffer: 2,
        ..Default::default()
    };
    let out = Captured::default();
    let summary = Pipeline::new(
        config,
        MatchIndex::new(Hasher::default(), PriorityOrder::new(roots.clone())),
        Relocator::new(None),
        Reporter::new(OutputFormat::Text, Box::new(out.clone())),
    )
    .run();

    assert_eq!(summary.files_discovered, 4 * 26);
    assert_eq!(summary.matches.duplicates, 3 * 25);
    assert_eq!(summary.relocated, 3 * 25);
    assert_eq!(summary.worker_panics, 0);

    // Nothing in the highest priority root is ever picked for relocation.
    let top = roots[0].display().to_string();
    for line in out.lines().iter().filter(|l| l.starts_with("Dupe:")) {
        let relocated = line.split('\t').nth(2).unwrap();
        assert!(!relocated.starts_with(&top), "{line}");
    }
}

/// Captures output and raises the shutdown flag once the first duplicate is reported.
struct InterruptOnFirstDupe {
    out: Captured,
    flag: Arc<AtomicBool>,
}

impl Write for InterruptOnFirstDupe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.starts_with(b"Dupe:") && !self.flag.load(Ordering::SeqCst) {
            // Let the scanner finish queueing before the interrupt lands.
            thread::sleep(Duration::from_millis(300));
            self.flag.store(true, Ordering::SeqCst);
        }
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_interrupt_mid_run_drains_and_finishes_decided_moves() {
    let (_dir, base) = canonical_tempdir();
    let root = base.join("root");
    let trash = base.join("trash");
    fs::create_dir_all(&trash).unwrap();
    for i in 0..100 {
        write(&root.join(format!("copy{i:03}")), b"identical everywhere");
    }

    let flag = Arc::new(AtomicBool::new(false));
    let out = Captured::default();
    let config = PipelineConfig {
        roots: vec![root.clone()],
        scanners: 1,
        matchers: 1,
        match_buffer: 200,
        ..Default::default()
    };
    let summary = Pipeline::new(
        config,
        MatchIndex::new(Hasher::default(), PriorityOrder::new(vec![root.clone()])),
        Relocator::new(Some(trash.clone())),
        Reporter::new(
            OutputFormat::Text,
            Box::new(InterruptOnFirstDupe {
                out: out.clone(),
                flag: Arc::clone(&flag),
            }),
        ),
    )
    .with_shutdown_flag(Arc::clone(&flag))
    .run();

    assert!(summary.interrupted);
    assert_eq!(ExitCode::for_summary(&summary), ExitCode::Interrupted);

    // Queued files were drained without being classified.
    assert_eq!(summary.files_discovered, 100);
    assert!(summary.matches.files < summary.files_discovered);
    assert_eq!(summary.matches.duplicates, 1);

    // The duplicate decided before the interrupt was still moved.
    assert_eq!(summary.relocated, 1);
    assert_eq!(summary.relocation_failures, 0);
    let lines = out.lines();
    assert_eq!(lines.len(), 2);
    let relocated = lines[0].split('\t').nth(2).unwrap();
    assert!(!Path::new(relocated).exists());
    assert!(destination_for(&trash, Path::new(relocated)).exists());
}

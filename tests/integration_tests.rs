//! Integration tests for fswap.
//!
//! Run with: `cargo test --test integration_tests`
//!
//! These tests validate end-to-end pipeline runs spanning multiple
//! modules, including engine fault injection through the generic
//! session entry point.

use std::io::Write;
use std::path::PathBuf;

use fswap_lib::engine::{EngineCompleter, EngineCompletion, SoftwareEngine};
use fswap_lib::errors::PipelineError;
use fswap_lib::pipeline::{run, run_with_engine, PipelineConfig, PipelineMode};

/// Write `data` to a fresh temp file.
fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(data).unwrap();
    f.flush().unwrap();
    f
}

fn config(input: PathBuf, output: PathBuf, mode: PipelineMode) -> PipelineConfig {
    PipelineConfig {
        input,
        output,
        mode,
        chunk_size: 8192,
        read_limit: None,
        read_threads: 4,
        write_threads: 4,
        queue_depth: 8,
        read_discard: false,
        write_discard: false,
        print_offsets: false,
    }
}

fn swap_mode(needle: &[u8], replacement: &[u8], search_only: bool) -> PipelineMode {
    PipelineMode::Swap {
        needle: needle.to_vec(),
        replacement: replacement.to_vec(),
        search_only,
    }
}

// Copy workflows

#[test]
fn test_copy_non_aligned_length() {
    // Length deliberately not a multiple of the chunk or alignment size
    let data: Vec<u8> = (0..100_003u32).map(|i| (i % 251) as u8).collect();
    let input = write_temp(&data);
    let output = tempfile::NamedTempFile::new().unwrap();

    let report = run(&config(
        input.path().to_path_buf(),
        output.path().to_path_buf(),
        PipelineMode::Copy,
    ))
    .unwrap();

    assert_eq!(std::fs::read(output.path()).unwrap(), data);
    // Bytes are allocation-rounded, so at least the true length
    assert!(report.bytes >= data.len() as u64);
}

#[test]
fn test_copy_smaller_than_one_chunk() {
    let data = b"tiny payload".to_vec();
    let input = write_temp(&data);
    let output = tempfile::NamedTempFile::new().unwrap();

    run(&config(input.path().to_path_buf(), output.path().to_path_buf(), PipelineMode::Copy))
        .unwrap();
    assert_eq!(std::fs::read(output.path()).unwrap(), data);
}

#[test]
fn test_copy_empty_file() {
    let input = write_temp(b"");
    let output = tempfile::NamedTempFile::new().unwrap();

    let report = run(&config(
        input.path().to_path_buf(),
        output.path().to_path_buf(),
        PipelineMode::Copy,
    ))
    .unwrap();
    assert_eq!(report.bytes, 0);
    assert!(std::fs::read(output.path()).unwrap().is_empty());
}

#[test]
fn test_copy_truncates_longer_preexisting_output() {
    let input = write_temp(&vec![b'n'; 1000]);
    let output = write_temp(&vec![b'o'; 50_000]);

    run(&config(input.path().to_path_buf(), output.path().to_path_buf(), PipelineMode::Copy))
        .unwrap();
    assert_eq!(std::fs::read(output.path()).unwrap(), vec![b'n'; 1000]);
}

// Swap workflows

/// Build a haystack with the needle planted at each given offset.
fn plant(len: usize, needle: &[u8], offsets: &[usize]) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| b'a' + (i % 13) as u8).collect();
    for &off in offsets {
        data[off..off + needle.len()].copy_from_slice(needle);
    }
    data
}

#[test]
fn test_swap_known_matches_across_large_file() {
    let needle = b"GoPower8";
    // 1 MiB file; one match straddles the 8192-byte chunk boundary
    let offsets = [0, 5_000, 8_188, 100_000, 524_288, 1_048_568];
    let data = plant(1 << 20, needle, &offsets);
    let input = write_temp(&data);

    let report = run(&config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"Power8Go", false),
    ))
    .unwrap();
    assert_eq!(report.matches, offsets.len() as u64);

    let result = std::fs::read(input.path()).unwrap();
    assert_eq!(result.len(), data.len());
    for &off in &offsets {
        assert_eq!(&result[off..off + 8], b"Power8Go", "offset {off}");
    }
    // Everything outside the planted spans is untouched
    let mut expected = data.clone();
    for &off in &offsets {
        expected[off..off + 8].copy_from_slice(b"Power8Go");
    }
    assert_eq!(result, expected);
}

#[test]
fn test_swap_round_trip_restores_original() {
    let needle = b"GoPower8";
    let data = plant(200_000, needle, &[17, 8_190, 65_536, 131_072]);
    let input = write_temp(&data);
    let cfg_fwd = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"Power8Go", false),
    );
    let cfg_back = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"Power8Go", needle, false),
    );

    let forward = run(&cfg_fwd).unwrap();
    assert_eq!(forward.matches, 4);
    let back = run(&cfg_back).unwrap();
    // The pristine haystack contains no reversed phrase, so the counts
    // agree and the content is restored exactly.
    assert_eq!(back.matches, 4);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_swap_overlapping_occurrences() {
    let mut data = vec![b'.'; 4096];
    data[100..105].copy_from_slice(b"aaaaa"); // "aa" matches at 100..104
    let input = write_temp(&data);

    let report = run(&config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"aa", b"XY", true),
    ))
    .unwrap();
    assert_eq!(report.matches, 4);
}

#[test]
fn test_single_needle_in_16_mib_file() {
    // One 8-byte needle planted off any chunk boundary in a 16 MiB file,
    // scanned with 8 KiB chunks and 4 reader + 4 writer threads.
    let needle = b"GoPower8";
    let offset = 7_345_677; // 7_345_677 % 8192 != 0
    let data = plant(16 << 20, needle, &[offset]);
    let input = write_temp(&data);

    let report = run(&config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"Power8Go", true),
    ))
    .unwrap();
    assert_eq!(report.matches, 1);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_search_only_counts_without_modifying() {
    let needle = b"needle";
    let data = plant(50_000, needle, &[3, 9_000, 40_000]);
    let input = write_temp(&data);

    let report = run(&config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"XXXXXX", true),
    ))
    .unwrap();
    assert_eq!(report.matches, 3);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_swap_no_matches_leaves_file_alone() {
    let data = vec![b'z'; 30_000];
    let input = write_temp(&data);

    let report = run(&config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"absent", b"planted", false),
    ))
    .unwrap();
    assert_eq!(report.matches, 0);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_swap_match_straddling_every_boundary() {
    // Small chunks so the needle straddles many consecutive boundaries
    let needle = b"boundary";
    let offsets: Vec<usize> = (1..20).map(|i| i * 128 - 3).collect();
    let data = plant(4096, needle, &offsets);
    let input = write_temp(&data);

    let mut cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"BOUNDARY", false),
    );
    cfg.chunk_size = 128;

    let report = run(&cfg).unwrap();
    assert_eq!(report.matches, offsets.len() as u64);
    let result = std::fs::read(input.path()).unwrap();
    for &off in &offsets {
        assert_eq!(&result[off..off + 8], b"BOUNDARY", "offset {off}");
    }
}

#[test]
fn test_swap_self_overlapping_needle_at_chunk_boundary() {
    // "aab" planted so the boundary splits it "aa|ab": the longest
    // trailing prefix fails to complete in the next chunk while the
    // shorter one succeeds. Byte 126 is an extra 'a', the match itself
    // starts at 127 and ends two bytes into the second chunk.
    let data = plant(512, b"aaab", &[126]);
    let input = write_temp(&data);

    let mut cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"aab", b"ZZZ", false),
    );
    cfg.chunk_size = 128;

    let report = run(&cfg).unwrap();
    assert_eq!(report.matches, 1);

    let result = std::fs::read(input.path()).unwrap();
    assert_eq!(result[126], b'a');
    assert_eq!(&result[127..130], b"ZZZ");
}

// Discard and limit modes

#[test]
fn test_read_discard_touches_nothing() {
    let data = vec![0x42u8; 100_000];
    let input = write_temp(&data);
    let mut cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        PipelineMode::Copy,
    );
    cfg.read_discard = true;

    let report = run(&cfg).unwrap();
    assert!(report.bytes >= 100_000);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_write_discard_with_search_still_ends_cleanly() {
    let data = plant(50_000, b"needle", &[100, 20_000]);
    let input = write_temp(&data);
    let mut cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"needle", b"XXXXXX", false),
    );
    cfg.write_discard = true;

    let report = run(&cfg).unwrap();
    // Completions are dropped at the bridge; no writes, no counts.
    assert_eq!(report.matches, 0);
    assert_eq!(std::fs::read(input.path()).unwrap(), data);
}

#[test]
fn test_read_limit_stops_early() {
    let data = plant(100_000, b"needle", &[100, 50_000]);
    let input = write_temp(&data);
    let mut cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(b"needle", b"XXXXXX", false),
    );
    cfg.read_limit = Some(16_384);

    let report = run(&cfg).unwrap();
    // Only the match inside the limit is seen.
    assert_eq!(report.matches, 1);
    assert_eq!(report.bytes, 16_384);
}

// Engine fault injection

/// Completer wrapper that mutates completions before the bridge sees
/// them.
struct Tamper<C, F> {
    inner: C,
    tamper: F,
}

impl<C: EngineCompleter, F: FnMut(&mut EngineCompletion) + Send> EngineCompleter
    for Tamper<C, F>
{
    fn await_completion(&mut self) -> Option<EngineCompletion> {
        let mut completion = self.inner.await_completion()?;
        (self.tamper)(&mut completion);
        Some(completion)
    }
}

#[test]
fn test_engine_fault_aborts_run_with_engine_error() {
    let data = vec![1u8; 100_000];
    let input = write_temp(&data);
    let output = tempfile::NamedTempFile::new().unwrap();
    let cfg = config(input.path().to_path_buf(), output.path().to_path_buf(), PipelineMode::Copy);

    let (submitter, completer) = SoftwareEngine::start(cfg.queue_depth, None).unwrap();
    let faulty = Tamper {
        inner: completer,
        tamper: |c: &mut EngineCompletion| {
            if c.item.index == 3 {
                c.status = 0x0800;
            }
        },
    };

    let err = run_with_engine(&cfg, submitter, faulty).unwrap_err();
    assert!(matches!(err, PipelineError::Engine { status: 0x0800, index: 3, .. }));
    assert_eq!(err.exit_code(), 6);

    // Completions are forwarded in order, so exactly the three chunks
    // ahead of the faulting one reached the writers. Nothing at or past
    // the failing chunk's offset was written.
    assert_eq!(std::fs::read(output.path()).unwrap(), vec![1u8; 3 * 8192]);
}

#[test]
fn test_out_of_order_completion_aborts_run() {
    let data = vec![1u8; 100_000];
    let input = write_temp(&data);
    let output = tempfile::NamedTempFile::new().unwrap();
    let cfg = config(input.path().to_path_buf(), output.path().to_path_buf(), PipelineMode::Copy);

    let (submitter, completer) = SoftwareEngine::start(cfg.queue_depth, None).unwrap();
    let reordering = Tamper {
        inner: completer,
        tamper: |c: &mut EngineCompletion| {
            if c.item.index == 2 {
                c.item.index = 7;
            }
        },
    };

    let err = run_with_engine(&cfg, submitter, reordering).unwrap_err();
    assert!(matches!(err, PipelineError::OutOfOrder { expected: 2, actual: 7 }));
    assert_eq!(err.exit_code(), 32);
}

#[test]
fn test_fault_free_generic_entry_matches_default_run() {
    let needle = b"GoPower8";
    let data = plant(40_000, needle, &[50, 10_000, 39_000]);
    let input = write_temp(&data);
    let cfg = config(
        input.path().to_path_buf(),
        input.path().to_path_buf(),
        swap_mode(needle, b"Power8Go", true),
    );

    let (submitter, completer) = SoftwareEngine::start(cfg.queue_depth, Some(needle)).unwrap();
    let report = run_with_engine(&cfg, submitter, completer).unwrap();
    assert_eq!(report.matches, 3);
}

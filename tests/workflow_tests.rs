//! Workflow Tests
//!
//! End-to-end runs of the converter: paced groups, category filling,
//! single-file conversion to disk and archive export.

mod common;

use std::fs;
use std::io::{Cursor, Read};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use gamewav::archive::ZipPackager;
use gamewav::audio::{quantize, DecoderContext};
use gamewav::config::ConverterConfig;
use gamewav::error::{CategoryRejection, GameWavError};
use gamewav::job::{FailureKind, JobStatus, SourceFile};
use gamewav::workflow::Converter;

use common::{read_container, scripted_bytes, write_wav_f32, write_wav_i16, ScriptedDecoder};

fn scripted_converter(limit: usize, pause_ms: u64) -> (Converter, Arc<ScriptedDecoder>) {
    let decoder = ScriptedDecoder::new();
    let config = ConverterConfig {
        concurrency_limit: limit,
        inter_batch_pause_ms: pause_ms,
        ..ConverterConfig::default()
    };
    let converter =
        Converter::with_decoders(config, DecoderContext::with_decoder(decoder.clone())).unwrap();
    (converter, decoder)
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test]
async fn test_seven_files_run_in_three_groups() {
    let (mut converter, decoder) = scripted_converter(3, 20);
    converter.add_category("sfx").unwrap();

    let sources: Vec<SourceFile> = (0..7)
        .map(|i| SourceFile::in_memory(format!("s{}.wav", i), scripted_bytes(60, 8)))
        .collect();

    let mut ticks = Vec::new();
    let batch = converter
        .convert_into_category("SFX", sources, |progress| {
            ticks.push((progress.processed, progress.total))
        })
        .await
        .unwrap();

    assert_eq!(batch.report.group_sizes, vec![3, 3, 1]);
    assert_eq!(batch.report.processed, 7);
    assert_eq!(ticks, (1..=7).map(|p| (p, 7)).collect::<Vec<_>>());
    // A full group overlaps, and no group exceeds the limit
    assert_eq!(decoder.max_in_flight(), 3);

    let mut spans = decoder.spans();
    assert_eq!(spans.len(), 7);
    spans.sort_by_key(|span| span.start);
    let groups: Vec<_> = [0..3, 3..6, 6..7].into_iter().map(|r| &spans[r]).collect();
    for pair in groups.windows(2) {
        let previous_end = pair[0].iter().map(|s| s.end).max().unwrap();
        for span in pair[1] {
            assert!(span.start >= previous_end, "{} started early", span.name);
        }
    }

    assert_eq!(batch.files_ready, 7);
    assert_eq!(batch.status_line(), "SFX: 7 files ready");
}

#[tokio::test]
async fn test_failures_still_count_as_processed() {
    let (mut converter, _decoder) = scripted_converter(2, 0);
    converter.add_category("voice").unwrap();

    let sources = vec![
        SourceFile::in_memory("ok1.wav", scripted_bytes(0, 4)),
        SourceFile::in_memory("broken.mp3", b"bad data".to_vec()),
        SourceFile::in_memory("ok2.aiff", scripted_bytes(0, 4)),
        SourceFile::in_memory("notes.txt", scripted_bytes(0, 4)),
    ];

    let mut last = None;
    let batch = converter
        .convert_into_category("VOICE", sources, |progress| last = Some(progress.clone()))
        .await
        .unwrap();

    assert_eq!(batch.rejected, vec!["notes.txt".to_string()]);
    assert_eq!(batch.report.total, 3);
    assert_eq!(batch.report.processed, 3);
    assert_eq!(batch.report.done, 2);
    assert_eq!(batch.report.failed, 1);
    assert_eq!(last.map(|p| (p.processed, p.total)), Some((3, 3)));

    let failed = batch
        .report
        .jobs
        .iter()
        .find(|record| record.source_name == "broken.mp3")
        .unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.failure, Some(FailureKind::Decode));

    let category = converter.store().get("VOICE").unwrap();
    let mut names: Vec<&str> = category.files().iter().map(|f| f.output_name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["ok1_UE.wav", "ok2_UE.wav"]);
}

#[tokio::test]
async fn test_files_appended_in_completion_order() {
    let (mut converter, _decoder) = scripted_converter(3, 0);
    converter.add_category("bgm").unwrap();

    let sources = vec![
        SourceFile::in_memory("slow.wav", scripted_bytes(80, 4)),
        SourceFile::in_memory("fast.wav", scripted_bytes(1, 4)),
        SourceFile::in_memory("medium.wav", scripted_bytes(40, 4)),
    ];

    let mut finished = Vec::new();
    converter
        .convert_into_category("BGM", sources, |progress| {
            if progress.status == JobStatus::Done {
                finished.push(progress.source_name.replace(".wav", "_UE.wav"));
            }
        })
        .await
        .unwrap();

    let stored: Vec<String> = converter
        .store()
        .get("BGM")
        .unwrap()
        .files()
        .iter()
        .map(|f| f.output_name.clone())
        .collect();
    assert_eq!(stored, finished);
}

#[tokio::test]
async fn test_decoder_context_is_lazy() {
    let converter = Converter::new(ConverterConfig::default()).unwrap();
    assert!(!converter.decoders().is_initialized());

    let report = converter
        .convert_files(Vec::new(), tempdir().unwrap().path(), |_| {})
        .await
        .unwrap();
    assert_eq!(report.report.total, 0);
    assert!(!converter.decoders().is_initialized());
}

// ============================================================================
// Real decoding
// ============================================================================

#[tokio::test]
async fn test_convert_files_writes_outputs() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    let samples: Vec<i16> = vec![0, 1000, -1000, 32767, -32768, 12345, -12345, 7];
    write_wav_i16(&input.path().join("step.wav"), 2, 22050, &samples);
    fs::write(input.path().join("readme.txt"), b"not audio").unwrap();
    fs::write(input.path().join("junk.mp3"), b"definitely not an mp3").unwrap();

    let converter = Converter::new(ConverterConfig::default()).unwrap();
    let sources = vec![
        SourceFile::from_path(input.path().join("step.wav")),
        SourceFile::from_path(input.path().join("readme.txt")),
        SourceFile::from_path(input.path().join("junk.mp3")),
    ];
    let outcome = converter
        .convert_files(sources, output.path(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.rejected, vec!["readme.txt".to_string()]);
    assert_eq!(outcome.report.done, 1);
    assert_eq!(outcome.report.failed, 1);
    assert_eq!(outcome.written, vec![output.path().join("step_UE.wav")]);
    assert!(!output.path().join("junk_UE.wav").exists());

    let bytes = fs::read(output.path().join("step_UE.wav")).unwrap();
    let (spec, decoded) = read_container(&bytes);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(decoded.len(), samples.len());
    for (original, converted) in samples.iter().zip(&decoded) {
        assert!(
            (i32::from(*original) - i32::from(*converted)).abs() <= 1,
            "{} became {}",
            original,
            converted
        );
    }
}

#[tokio::test]
async fn test_same_stem_from_different_directories_kept_apart() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    for dir in ["sfx", "ui"] {
        fs::create_dir(input.path().join(dir)).unwrap();
    }
    write_wav_i16(&input.path().join("sfx").join("hit.wav"), 1, 8000, &[100, 200]);
    write_wav_i16(&input.path().join("ui").join("hit.wav"), 1, 8000, &[-300, -400, -500]);

    let converter = Converter::new(ConverterConfig::default()).unwrap();
    let sources = vec![
        SourceFile::from_path(input.path().join("sfx").join("hit.wav")),
        SourceFile::from_path(input.path().join("ui").join("hit.wav")),
    ];
    let outcome = converter
        .convert_files(sources, output.path(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.report.done, 2);
    assert_eq!(
        outcome.written,
        vec![
            output.path().join("hit_UE.wav"),
            output.path().join("hit_UE_2.wav"),
        ]
    );
    assert!(outcome.write_failures.is_empty());

    let mut on_disk: Vec<String> = fs::read_dir(output.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec!["hit_UE.wav", "hit_UE_2.wav"]);

    let (_, second) = read_container(&fs::read(output.path().join("hit_UE_2.wav")).unwrap());
    assert_eq!(second.len(), 3);
}

#[tokio::test]
async fn test_write_failure_recorded_and_rest_written() {
    let (converter, _) = scripted_converter(1, 0);
    let output = tempdir().unwrap();
    // A directory squatting on the first output name makes that write fail
    fs::create_dir(output.path().join("blocked_UE.wav")).unwrap();

    let sources = vec![
        SourceFile::in_memory("blocked.wav", scripted_bytes(0, 4)),
        SourceFile::in_memory("free.wav", scripted_bytes(0, 4)),
    ];
    let outcome = converter
        .convert_files(sources, output.path(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.report.done, 2);
    assert_eq!(outcome.written, vec![output.path().join("free_UE.wav")]);
    assert_eq!(outcome.write_failures.len(), 1);
    assert_eq!(outcome.write_failures[0].source_name, "blocked.wav");
    assert_eq!(
        outcome.write_failures[0].path,
        output.path().join("blocked_UE.wav")
    );
    assert!(output.path().join("free_UE.wav").is_file());
}

#[tokio::test]
async fn test_float_wav_quantized_exactly() {
    let input = tempdir().unwrap();
    let samples = [0.0f32, 0.25, -0.25, 0.5, -0.5, 1.0, -1.0, 0.999];
    let path = input.path().join("ramp.wav");
    write_wav_f32(&path, 1, 48000, &samples);

    let mut converter = Converter::new(ConverterConfig::default()).unwrap();
    converter.add_category("ui").unwrap();
    let batch = converter
        .convert_into_category("UI", vec![SourceFile::from_path(path)], |_| {})
        .await
        .unwrap();
    assert!(batch.report.all_succeeded());

    let file = &converter.store().get("UI").unwrap().files()[0];
    assert_eq!(file.output_name, "ramp_UE.wav");
    let (spec, decoded) = read_container(file.container.as_bytes());
    assert_eq!(spec.sample_rate, 48000);
    let expected: Vec<i16> = samples.iter().map(|&s| quantize(s)).collect();
    assert_eq!(decoded, expected);
}

// ============================================================================
// Categories and export
// ============================================================================

#[test]
fn test_category_names_normalized() {
    let (mut converter, _) = scripted_converter(3, 0);
    assert_eq!(converter.add_category(" bgm "), Ok("BGM".to_string()));
    assert_eq!(converter.add_category("Bgm"), Err(CategoryRejection::Duplicate));
    assert_eq!(converter.add_category("   "), Err(CategoryRejection::Empty));
    assert_eq!(converter.categories().len(), 1);

    let removed = converter.remove_category("BGM").unwrap();
    assert_eq!(removed.name(), "BGM");
    assert!(converter.categories().is_empty());
}

#[test]
fn test_export_refused_without_files() {
    let (mut converter, _) = scripted_converter(3, 0);
    let err = converter.export(&ZipPackager::new()).unwrap_err();
    assert!(matches!(err, GameWavError::ExportRejected(_)));

    converter.add_category("bgm").unwrap();
    let err = converter.export(&ZipPackager::new()).unwrap_err();
    assert_eq!(err.error_code(), "EXPORT_REJECTED");
    assert_eq!(converter.categories().len(), 1);
}

#[tokio::test]
async fn test_export_archive_end_to_end() {
    let (mut converter, _) = scripted_converter(2, 5);
    for name in ["bgm", "sfx", "voice"] {
        converter.add_category(name).unwrap();
    }

    converter
        .convert_into_category(
            "BGM",
            vec![SourceFile::in_memory("theme.mp3", scripted_bytes(0, 10))],
            |_| {},
        )
        .await
        .unwrap();
    converter
        .convert_into_category(
            "SFX",
            vec![
                SourceFile::in_memory("hit.wav", scripted_bytes(0, 3)),
                SourceFile::in_memory("jump.aif", scripted_bytes(0, 5)),
            ],
            |_| {},
        )
        .await
        .unwrap();

    let out = tempdir().unwrap();
    let path = converter
        .export_to_dir(out.path(), &ZipPackager::new())
        .await
        .unwrap();
    assert_eq!(path, out.path().join("GameWav_Export.zip"));

    let mut archive = zip::ZipArchive::new(Cursor::new(fs::read(&path).unwrap())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "BGM/",
            "BGM/theme_UE.wav",
            "SFX/",
            "SFX/hit_UE.wav",
            "SFX/jump_UE.wav",
            "VOICE/",
        ]
    );

    let mut theme = Vec::new();
    archive
        .by_name("BGM/theme_UE.wav")
        .unwrap()
        .read_to_end(&mut theme)
        .unwrap();
    let (spec, samples) = read_container(&theme);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(samples, vec![16383; 10]);

    // Export does not consume the store
    assert_eq!(converter.store().total_files(), 3);
}

use bfs::config::LogConfig;
use bfs::core::logging::{AccessLogEntry, LogHandler, LogLevel};
use criterion::{Criterion, criterion_group, criterion_main};
use tempfile::tempdir;

fn bench_config(path: &std::path::Path, level: &str) -> LogConfig {
    LogConfig {
        enabled: true,
        file_path: path.to_string_lossy().to_string(),
        level: level.to_string(),
        max_size: 100 * 1024 * 1024, // 100MB
        rotation_count: 5,
    }
}

fn bench_log_single_message(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let config = bench_config(&temp_dir.path().join("benchmark.log"), "info");
    let logger = LogHandler::new(&config).unwrap();

    c.bench_function("log_single_access", |b| {
        b.iter(|| {
            let _ = logger.log_access(
                std::hint::black_box("open"),
                std::hint::black_box("file.txt"),
                std::hint::black_box("success"),
                None,
            );
        })
    });

    let _ = logger.flush_all();
}

fn bench_log_batch_messages(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let config = bench_config(&temp_dir.path().join("benchmark_batch.log"), "info");
    let logger = LogHandler::new(&config).unwrap();

    c.bench_function("log_batch_100_accesses", |b| {
        b.iter(|| {
            for i in 0..100 {
                let name = format!("file_{i}.txt");
                let _ = logger.log_access(
                    std::hint::black_box("create"),
                    std::hint::black_box(&name),
                    std::hint::black_box("success"),
                    Some(format!("fd {i}")),
                );
            }
            let _ = logger.flush_all();
        })
    });

    let _ = logger.flush_all();
}

fn bench_log_transfers(c: &mut Criterion) {
    let temp_dir = tempdir().unwrap();
    let config = bench_config(&temp_dir.path().join("benchmark_transfer.log"), "debug");
    let logger = LogHandler::with_batch_size(&config, 1000).unwrap();

    c.bench_function("log_transfer", |b| {
        b.iter(|| {
            let _ = logger.log_transfer(
                std::hint::black_box("write"),
                std::hint::black_box("fd 3"),
                std::hint::black_box(64 * 1024),
                150,
            );
        })
    });

    let _ = logger.flush_all();
}

fn bench_entry_serialization(c: &mut Criterion) {
    let mut entry = AccessLogEntry::new(
        LogLevel::Debug,
        "read",
        "fd 0",
        "success",
        None,
    );
    entry.bytes = Some(4096);
    entry.duration_us = Some(12);

    c.bench_function("access_entry_to_json", |b| {
        b.iter(|| serde_json::to_string(std::hint::black_box(&entry)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_log_single_message,
    bench_log_batch_messages,
    bench_log_transfers,
    bench_entry_serialization
);
criterion_main!(benches);

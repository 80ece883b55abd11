//! End-to-end rolling-time scenario: submissions separated by real
//! wall-clock sleeps across second boundaries must land in distinct files.

use corelog::appender::{Appender, RollInterval, RollingFileAppender, RollingPolicy, TimePolicyConfig};
use corelog::level::Level;
use corelog::record::Record;
use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as u64
}

fn record_with_payload(timestamp: u64, payload: &[u8]) -> Record {
    let mut record = Record::new(Level::Info);
    record.set_timestamp(timestamp);
    let mut raw = payload.to_vec();
    raw.push(0);
    record.set_raw(&raw);
    record
}

#[test]
fn three_submissions_a_second_apart_produce_three_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = TimePolicyConfig {
        directory: dir.path().to_path_buf(),
        filename_pattern: "{UtcDateTime}.log".into(),
        interval: RollInterval::Second,
        archive: false,
        truncate: false,
        auto_flush: true,
    };
    let appender = RollingFileAppender::new(RollingPolicy::Time(cfg)).unwrap();

    appender.append(&record_with_payload(now_nanos(), b"one"));
    std::thread::sleep(Duration::from_millis(1100));
    appender.append(&record_with_payload(now_nanos(), b"two"));
    std::thread::sleep(Duration::from_millis(1100));
    appender.append(&record_with_payload(now_nanos(), b"three"));

    let mut contents: Vec<Vec<u8>> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "log").unwrap_or(false))
        .map(|e| fs::read(e.path()).unwrap())
        .collect();
    contents.sort();

    assert_eq!(contents.len(), 3);
    assert_eq!(contents, vec![b"one".to_vec(), b"three".to_vec(), b"two".to_vec()]);
}

//! Integration tests for the sampling session in batch (CSV) mode
//!
//! These drive `Session` against fake device directories and check the
//! tick state machine: stale skips, fatal short reads, stop handling and
//! cleanup of the output file.

mod common;

use common::{ready_snapshot, stale_snapshot, FakeDevice};
use std::fs;
use std::thread;
use std::time::{Duration, Instant};
use tx2mon::core::TickOutcome;
use tx2mon::{Session, SessionConfig, StopFlag, Tx2monError};

fn batch_config(device: &FakeDevice, interval: Duration) -> SessionConfig {
    SessionConfig::builder()
        .interval(interval)
        .csv_output(device.csv_path())
        .device_root(device.root())
        .build()
        .expect("valid config")
}

fn csv_lines(device: &FakeDevice) -> Vec<String> {
    fs::read_to_string(device.csv_path())
        .expect("read csv")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_fresh_tick_renders_and_counts() {
    let device = FakeDevice::new(2, 4);
    let mut session = Session::open(
        &batch_config(&device, Duration::from_millis(10)),
        StopFlag::new(),
    )
    .unwrap();

    assert_eq!(session.topology().nodes, 2);
    assert_eq!(session.tick().unwrap(), TickOutcome::Rendered);
    assert_eq!(session.tick().unwrap(), TickOutcome::Rendered);
    assert_eq!(session.samples(), 2);
    session.close().unwrap();

    let lines = csv_lines(&device);
    assert_eq!(lines.len(), 3, "header plus two rows");
    assert_eq!(lines[1], lines[2], "unchanged source yields identical rows");
}

#[test]
fn test_stale_node_skips_render() {
    for nodes in [1, 2] {
        let device = FakeDevice::new(nodes, 4);
        device.write_node(nodes - 1, &stale_snapshot(0));

        let mut session = Session::open(
            &batch_config(&device, Duration::from_millis(10)),
            StopFlag::new(),
        )
        .unwrap();

        assert_eq!(session.tick().unwrap(), TickOutcome::Stale);
        assert_eq!(session.samples(), 0);
        session.close().unwrap();

        assert_eq!(csv_lines(&device).len(), 1, "only the header is written");
    }
}

#[test]
fn test_recovers_after_stale_tick() {
    let device = FakeDevice::new(2, 2);
    device.write_node(0, &stale_snapshot(0));
    let mut session = Session::open(
        &batch_config(&device, Duration::from_millis(10)),
        StopFlag::new(),
    )
    .unwrap();

    assert_eq!(session.tick().unwrap(), TickOutcome::Stale);
    device.write_node(0, &ready_snapshot(0));
    assert_eq!(session.tick().unwrap(), TickOutcome::Rendered);
    assert_eq!(session.samples(), 1);
}

#[test]
fn test_short_read_is_fatal() {
    let device = FakeDevice::new(2, 4);
    device.write_raw(1, &[0u8; 64]);

    let mut session = Session::open(
        &batch_config(&device, Duration::from_millis(5)),
        StopFlag::new(),
    )
    .unwrap();

    let err = session.run().unwrap_err();
    assert!(matches!(
        err,
        Tx2monError::TruncatedRead {
            node: 1,
            read: 64,
            ..
        }
    ));
    session.close().unwrap();
    assert_eq!(session.samples(), 0);
    assert_eq!(csv_lines(&device).len(), 1);
}

#[test]
fn test_missing_node_source() {
    let device = FakeDevice::new(2, 4);
    fs::remove_file(device.node_path(1)).unwrap();

    let err = Session::open(
        &batch_config(&device, Duration::from_millis(5)),
        StopFlag::new(),
    )
    .err()
    .expect("open must fail");
    assert!(matches!(err, Tx2monError::SourceOpen { node: 1, .. }));
    assert!(!device.csv_path().exists(), "no output before sources open");
}

#[test]
fn test_missing_socinfo() {
    let device = FakeDevice::new(1, 4);
    fs::remove_file(device.root().join("socinfo")).unwrap();

    let err = Session::open(
        &batch_config(&device, Duration::from_millis(5)),
        StopFlag::new(),
    )
    .err()
    .expect("open must fail");
    assert!(matches!(err, Tx2monError::Config { .. }));
}

#[test]
fn test_stop_during_wait_leaves_well_formed_file() {
    let device = FakeDevice::new(2, 4);
    let stop = StopFlag::new();
    let mut session =
        Session::open(&batch_config(&device, Duration::from_millis(20)), stop.clone()).unwrap();

    let stopper = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            stop.request();
        })
    };

    let started = Instant::now();
    let samples = session.run().unwrap();
    session.close().unwrap();
    stopper.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(samples >= 1);

    let text = fs::read_to_string(device.csv_path()).unwrap();
    assert!(text.ends_with('\n'));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() as u64, samples + 1);
    let width = lines[0].split(',').count();
    for row in &lines[1..] {
        assert_eq!(row.split(',').count(), width);
    }
}

#[test]
fn test_stop_interrupts_long_interval() {
    let device = FakeDevice::new(1, 4);
    let stop = StopFlag::new();
    let mut session =
        Session::open(&batch_config(&device, Duration::from_secs(60)), stop.clone()).unwrap();

    let stopper = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            stop.request();
        })
    };

    let started = Instant::now();
    assert_eq!(session.run().unwrap(), 0);
    assert!(started.elapsed() < Duration::from_secs(5));
    stopper.join().unwrap();
}

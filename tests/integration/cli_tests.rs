//! End-to-end tests for the `tx2mon` binary

mod common;

use common::FakeDevice;
use std::fs;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn tx2mon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tx2mon"));
    cmd.stdin(Stdio::null());
    cmd
}

/// Wait for `child` to exit, killing it if it outlives `limit`.
fn wait_within(child: &mut Child, limit: Duration) -> ExitStatus {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if started.elapsed() > limit {
            let _ = child.kill();
            let _ = child.wait();
            panic!("tx2mon still running after {limit:?}");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_help_exits_zero() {
    let out = tx2mon().arg("-h").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("-d"));
    assert!(text.contains("-f"));
    assert!(text.contains("-x"));
}

#[test]
fn test_delay_below_range_rejected() {
    let device = FakeDevice::new(1, 4);
    let csv = device.csv_path();
    let out = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.00005", "-f"])
        .arg(&csv)
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("allowed range"));
    assert!(err.contains("Usage"));
    assert!(!csv.exists(), "no session is created");
}

#[test]
fn test_delay_above_range_rejected() {
    let out = tx2mon().args(["-d", "10000"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_unknown_flag_rejected() {
    let out = tx2mon().arg("-z").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
}

#[test]
fn test_missing_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = tx2mon()
        .env("TX2MON_DEVICE", dir.path().join("absent"))
        .arg("-f")
        .arg(dir.path().join("out.csv"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("socinfo"));
}

#[test]
fn test_truncated_source_fails() {
    let device = FakeDevice::new(1, 4);
    device.write_raw(0, &[0u8; 10]);
    let out = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.01", "-f"])
        .arg(device.csv_path())
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("short read"));
    let text = fs::read_to_string(device.csv_path()).unwrap();
    assert_eq!(text.lines().count(), 1, "header survives the fatal error");
}

#[cfg(unix)]
#[test]
fn test_sigterm_flushes_csv_and_exits_zero() {
    let device = FakeDevice::new(2, 4);
    let csv = device.csv_path();
    let child = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-x", "-d", "0.05", "-f"])
        .arg(&csv)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(600));
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(rc, 0);
    let out = child.wait_with_output().unwrap();

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Saving to"));
    assert!(stdout.contains("samples saved."));

    let text = fs::read_to_string(&csv).unwrap();
    assert!(text.ends_with('\n'));
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.len() >= 2, "at least one sample was logged");
    let width = lines[0].split(',').count();
    assert_eq!(width, 2 * (2 * 4 + 12));
    for row in &lines[1..] {
        assert_eq!(row.split(',').count(), width);
    }
}

#[test]
fn test_interactive_stops_at_end_of_input() {
    let device = FakeDevice::new(1, 4);
    let mut child = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.05"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let status = wait_within(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_interactive_quits_on_piped_q() {
    use std::io::{Read, Write};

    let device = FakeDevice::new(1, 4);
    let mut child = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.05"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Keep stdin open so only the key can end the session
    let mut stdin = child.stdin.take().unwrap();
    thread::sleep(Duration::from_millis(300));
    stdin.write_all(b"q").unwrap();
    stdin.flush().unwrap();

    let status = wait_within(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));
    drop(stdin);

    let mut panel = String::new();
    child.stdout.take().unwrap().read_to_string(&mut panel).unwrap();
    assert!(panel.contains("Node: 0  Snapshot:"));
    assert!(panel.contains("['q' to quit"));
}

#[test]
fn test_interactive_prompt_shown_while_stale() {
    use std::io::Read;

    let device = FakeDevice::new(1, 4);
    device.write_node(0, &common::stale_snapshot(0));
    let mut child = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.02"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdin = child.stdin.take().unwrap();
    thread::sleep(Duration::from_millis(300));
    drop(stdin);

    let status = wait_within(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));

    let mut panel = String::new();
    child.stdout.take().unwrap().read_to_string(&mut panel).unwrap();
    assert!(!panel.contains("Node: "), "nothing rendered while stale");
    assert_eq!(panel.matches("['q' to quit").count(), 1);
}

/// Runs the panel on a pseudo-terminal and checks that SIGTERM leaves the
/// terminal modes exactly as they were before the run.
#[cfg(target_os = "linux")]
#[test]
fn test_sigterm_restores_terminal_mode() {
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::{AsRawFd, FromRawFd};

    fn modes(tty: &File) -> [libc::tcflag_t; 4] {
        // SAFETY: zeroed termios is a valid out-parameter for tcgetattr.
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::tcgetattr(tty.as_raw_fd(), &mut t) }, 0);
        [t.c_iflag, t.c_oflag, t.c_cflag, t.c_lflag]
    }

    let (mut master, mut slave) = (-1, -1);
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            std::ptr::null(),
            std::ptr::null(),
        )
    };
    assert_eq!(rc, 0, "openpty failed");
    // SAFETY: openpty returned two fresh descriptors owned from here on.
    let master = unsafe { File::from_raw_fd(master) };
    let slave = unsafe { File::from_raw_fd(slave) };

    // Drain the panel so the child never blocks on a full pty buffer
    let mut reader = master.try_clone().unwrap();
    let drain = thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 4096];
        while let Ok(n) = reader.read(&mut buf) {
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..n]);
        }
        seen
    });

    let before = modes(&slave);
    let device = FakeDevice::new(1, 4);
    let mut child = tx2mon()
        .env("TX2MON_DEVICE", device.root())
        .args(["-d", "0.05"])
        .stdin(Stdio::from(slave.try_clone().unwrap()))
        .stdout(Stdio::from(slave.try_clone().unwrap()))
        .stderr(Stdio::from(slave.try_clone().unwrap()))
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(600));
    let during = modes(&slave);
    assert_eq!(during[3] & libc::ICANON, 0, "panel runs in raw mode");

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(rc, 0);
    let status = wait_within(&mut child, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0));

    assert_eq!(modes(&slave), before, "terminal modes restored");

    drop(slave);
    let panel = String::from_utf8_lossy(&drain.join().unwrap()).into_owned();
    assert!(panel.contains("Node: 0  Snapshot:"));
    drop(master);
}

use coursepulse_core::{Database, ProgressKey};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("coursepulse/progress.db")
    }

    /// Concatenated contents of every rolled log file.
    fn log_contents(&self) -> String {
        let log_dir = self.xdg_state.join("coursepulse");
        let mut contents = String::new();
        for entry in fs::read_dir(&log_dir).expect("log dir should exist") {
            let path = entry.expect("failed to read log dir entry").path();
            contents.push_str(&fs::read_to_string(&path).unwrap_or_default());
        }
        contents
    }

    fn run(&self, args: &[&str]) -> Output {
        let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("coursepulse"));

        Command::new(bin_path)
            .arg("--compact")
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_DATA_HOME", &self.xdg_data)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state)
            .env_remove("RUST_LOG")
            .output()
            .unwrap_or_else(|e| panic!("failed to execute coursepulse: {e}"))
    }

    /// Run and parse stdout as JSON, panicking with full output on failure.
    fn json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert_success(args, &output);
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}):\n{}",
                String::from_utf8_lossy(&output.stdout)
            )
        })
    }

    fn seed_course(&self) {
        self.json(&["add-course", "rust-101", "--title", "Rust 101"]);
        self.json(&["add-content", "rust-101", "intro", "--position", "0"]);
        self.json(&["add-content", "rust-101", "ownership", "--position", "1"]);
        for student in ["ana", "ben"] {
            self.json(&["add-user", student]);
            self.json(&["enroll", student, "rust-101"]);
        }
    }
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "coursepulse {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn track_merges_segments_and_persists_to_xdg_database() {
    let env = CliTestEnv::new();
    env.seed_course();

    env.json(&[
        "track", "ana", "rust-101", "intro",
        "--current-time", "10", "--duration", "120",
        "--segment", "0:10",
    ]);
    let record = env.json(&[
        "track", "ana", "rust-101", "intro",
        "--current-time", "25", "--duration", "120",
        "--segment", "5:15", "--segment", "20:25",
        "--rate", "1.5",
    ]);

    assert_eq!(record["totalWatchTime"], 20.0);
    assert_eq!(record["lastPosition"], 25.0);
    assert_eq!(record["watchedSegments"].as_array().unwrap().len(), 2);
    assert_eq!(record["playbackRates"].as_array().unwrap().len(), 1);

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    let key = ProgressKey::new("ana", "rust-101", "intro").unwrap();
    let stored = db
        .get_video_progress(&key)
        .expect("failed to read progress")
        .expect("progress should be stored");
    assert_eq!(stored.total_watch_time, 20.0);
}

#[test]
fn analytics_commands_report_completion() {
    let env = CliTestEnv::new();
    env.seed_course();

    for video in ["intro", "ownership"] {
        env.json(&[
            "track", "ana", "rust-101", video,
            "--current-time", "60", "--duration", "60",
            "--segment", "0:60", "--completed",
        ]);
    }
    env.json(&[
        "track", "ben", "rust-101", "intro",
        "--current-time", "12.6", "--duration", "60",
        "--segment", "0:12.6",
    ]);
    env.json(&["activity", "ben", "rust-101", "--type", "course_access"]);

    let stats = env.json(&["completion-stats", "rust-101"]);
    assert_eq!(stats["totalStudents"], 2);
    assert_eq!(stats["totalContent"], 2);
    assert_eq!(stats["completionRates"]["0"], 1);
    assert_eq!(stats["completionRates"]["80"], 1);
    assert_eq!(stats["averageCompletion"], 50.0);

    let video = env.json(&["video-analytics", "rust-101", "intro"]);
    assert_eq!(video["totalViews"], 2);
    assert_eq!(video["completions"], 1);
    assert_eq!(video["dropOffPoints"][0]["time"], 12);

    let engagement = env.json(&["engagement", "rust-101"]);
    assert_eq!(engagement["totalStudents"], 2);
    assert_eq!(engagement["activeStudents"], 1);
    assert_eq!(engagement["completionRate"], 50.0);
    assert_eq!(engagement["dailyEngagement"].as_array().unwrap().len(), 1);

    let progress = env.json(&["student-progress", "rust-101", "ana"]);
    assert_eq!(progress["overallProgress"], 100.0);
    assert_eq!(progress["completedContent"], 2);
}

#[test]
fn request_command_maps_errors_to_statuses() {
    let env = CliTestEnv::new();
    env.seed_course();

    let ok = env.json(&[
        "request", "POST", "progress/rust-101/intro",
        "--user", "ana",
        "--body", r#"{"currentTime": 5, "duration": 60, "watchedSegments": [{"start": 0, "end": 5}]}"#,
    ]);
    assert_eq!(ok["totalWatchTime"], 5.0);

    let missing = env.run(&["request", "GET", "class-metrics/nope"]);
    assert!(!missing.status.success());
    let body: Value = serde_json::from_slice(&missing.stdout).unwrap();
    assert!(body["message"].as_str().unwrap().contains("nope"));
    let stderr = String::from_utf8_lossy(&missing.stderr);
    assert!(stderr.contains("404"), "expected status in stderr, got:\n{stderr}");

    let wrong_method = env.run(&["request", "GET", "progress/rust-101/intro"]);
    assert!(String::from_utf8_lossy(&wrong_method.stderr).contains("405"));

    let bad_segment = env.run(&[
        "track", "ana", "rust-101", "intro",
        "--current-time", "1", "--duration", "60",
        "--segment", "9:1",
    ]);
    assert!(!bad_segment.status.success());
}

#[test]
fn startup_and_failed_requests_are_logged() {
    let env = CliTestEnv::new();
    env.seed_course();

    let missing = env.run(&["request", "GET", "class-metrics/nope"]);
    assert!(!missing.status.success());

    let logs = env.log_contents();
    assert!(logs.contains("coursepulse starting"), "logs:\n{logs}");
    assert!(logs.contains("Opening database"), "logs:\n{logs}");
    assert!(logs.contains("Request failed"), "logs:\n{logs}");
    assert!(logs.contains("class-metrics/nope"), "logs:\n{logs}");
}

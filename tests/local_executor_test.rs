//! End-to-end tests for the local subprocess backend, driven by small shell
//! scripts standing in for the simulator binary.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use simbatch::config::Settings;
use simbatch::error::SimError;
use simbatch::simulation::{LocalExecutor, SimBatch, SimProfile};

/// Write an executable script into `dir` and return its path.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A fake simulator: finds the `json=` argument and writes a canned result
/// document there.
fn fake_simc(dir: &Path, result_json: &str) -> PathBuf {
    let body = format!(
        r#"#!/bin/sh
out=""
for arg in "$@"; do
    case "$arg" in
        json=*) out="${{arg#json=}}" ;;
    esac
done
[ -n "$out" ] || exit 1
cat > "$out" <<'EOF'
{}
EOF
exit 0
"#,
        result_json
    );
    write_script(dir, "fake_simc.sh", &body)
}

fn settings(dir: &Path, executable: PathBuf) -> Settings {
    Settings {
        executable,
        temp_dir: dir.join("work"),
        ..Settings::default()
    }
}

fn profile(name: &str, settings: &Settings, argument: &str) -> SimProfile {
    SimProfile::new(name, settings, "patchwerk").with_argument(argument)
}

#[test]
fn test_batch_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let simc = fake_simc(
        dir.path(),
        r#"{
            "git_revision": "abc1234",
            "sim": {
                "players": [{"name": "A", "collected_data": {"dps": {"mean": 1000.0}}}],
                "profilesets": {"results": [{"name": "B", "mean": 1200.0}]}
            }
        }"#,
    );
    let settings = settings(dir.path(), simc);

    let mut batch = SimBatch::new("end to end", &settings);
    batch.add(profile("A", &settings, "x=1")).unwrap();
    batch.add(profile("B", &settings, "x=2")).unwrap();

    let executor = LocalExecutor::new(&settings);
    assert!(batch.simulate(&executor).unwrap());

    assert_eq!(batch.profiles[0].dps(), Ok(1000));
    assert_eq!(batch.profiles[1].dps(), Ok(1200));
    assert_eq!(batch.simc_hash.as_deref(), Some("abc1234"));
    // Artifacts are cleaned up after success.
    let leftovers: Vec<_> = fs::read_dir(settings.temp_dir).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_failure_retries_exactly_five_times() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("invocations");
    let body = format!(
        r#"#!/bin/sh
echo x >> "{}"
echo "boom" >&2
exit 1
"#,
        counter.display()
    );
    let simc = write_script(dir.path(), "failing_simc.sh", &body);
    let settings = settings(dir.path(), simc);

    let mut batch = SimBatch::new("always fails", &settings);
    batch.add(profile("A", &settings, "x=1")).unwrap();
    batch.add(profile("B", &settings, "x=2")).unwrap();

    let executor = LocalExecutor::new(&settings);
    let err = batch.simulate(&executor).unwrap_err();
    assert!(matches!(
        err,
        SimError::SimulationFailed { attempts: 5, .. }
    ));

    let invocations = fs::read_to_string(&counter).unwrap().lines().count();
    assert_eq!(invocations, 5);
}

#[test]
fn test_failure_preserves_request_with_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let simc = write_script(
        dir.path(),
        "failing_simc.sh",
        "#!/bin/sh\necho \"fatal: bad input\" >&2\nexit 1\n",
    );
    let settings = settings(dir.path(), simc);

    let mut batch = SimBatch::new("preserved", &settings);
    batch.add(profile("A", &settings, "x=1")).unwrap();
    batch.add(profile("B", &settings, "x=2")).unwrap();

    let executor = LocalExecutor::new(&settings);
    let err = batch.simulate(&executor).unwrap_err();
    let SimError::SimulationFailed { transcript, .. } = err else {
        panic!("expected SimulationFailed, got {:?}", err);
    };

    let preserved = fs::read_to_string(&transcript).unwrap();
    // The original request plus the appended transcript comments.
    assert!(preserved.contains("name=\"A\""));
    assert!(preserved.contains("# simulation failed, last transcript:"));
    assert!(preserved.contains("# fatal: bad input"));
}

#[test]
fn test_single_profile_writes_no_request_file() {
    let dir = tempfile::tempdir().unwrap();
    let simc = fake_simc(
        dir.path(),
        r#"{"sim": {"players": [{"name": "Only", "collected_data": {"dps": {"mean": 4321.9}}}]}}"#,
    );
    let settings = settings(dir.path(), simc);

    let mut batch = SimBatch::new("solo", &settings);
    batch.add(profile("Only", &settings, "x=1")).unwrap();

    let executor = LocalExecutor::new(&settings);
    assert!(batch.simulate(&executor).unwrap());
    assert_eq!(batch.profiles[0].dps(), Ok(4321));
    assert!(!batch.profiles[0].is_external());

    // The single-profile path passes arguments directly; no .simc artifact.
    let requests: Vec<_> = fs::read_dir(settings.temp_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "simc"))
        .collect();
    assert!(requests.is_empty());
}

#[test]
fn test_missing_executable_aborts_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), dir.path().join("does_not_exist"));

    let mut batch = SimBatch::new("missing", &settings);
    batch.add(profile("A", &settings, "x=1")).unwrap();
    batch.add(profile("B", &settings, "x=2")).unwrap();

    let executor = LocalExecutor::new(&settings);
    assert!(matches!(
        batch.simulate(&executor).unwrap_err(),
        SimError::ExecutableNotFound(_)
    ));
}

#[test]
fn test_keep_files_preserves_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let simc = fake_simc(
        dir.path(),
        r#"{
            "sim": {
                "players": [{"name": "A", "collected_data": {"dps": {"mean": 100.0}}}],
                "profilesets": {"results": [{"name": "B", "mean": 200.0}]}
            }
        }"#,
    );
    let mut settings = settings(dir.path(), simc);
    settings.keep_files = true;

    let mut batch = SimBatch::new("kept", &settings);
    batch.add(profile("A", &settings, "x=1")).unwrap();
    batch.add(profile("B", &settings, "x=2")).unwrap();

    let executor = LocalExecutor::new(&settings);
    batch.simulate(&executor).unwrap();

    let stem = batch.file_stem();
    assert!(settings.temp_dir.join(format!("{}.simc", stem)).exists());
    assert!(settings.temp_dir.join(format!("{}.json", stem)).exists());
}

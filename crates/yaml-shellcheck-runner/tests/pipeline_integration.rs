//! Integration tests for full runs against a fake analyzer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use yaml_shellcheck_runner::{
    run, AnalyzerConfig, FileStatus, RunConfig, RunError, Severity, ShellCheck,
};

/// Reports SC2154 for every script that references a lower-case variable.
const FAKE_ANALYZER: &str = r#"status=0
for f in "$@"; do
  if grep -q '\$[[:lower:]]' "$f"; then
    echo "In $f line 2:"
    echo "SC2154 (warning): variable is referenced but not assigned."
    status=1
  fi
done
exit $status
"#;

const GITLAB: &str = "\
stages: [test]
html:
  stage: test
  before_script: [\"echo A\"]
  script: [\"echo $foo\"]
";

const BITBUCKET: &str = "\
pipelines:
  default:
    - step:
        script: \"echo $RSYNC_TARGET\"
";

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write fixture");
    path
}

fn fake_analyzer(dir: &Path) -> ShellCheck {
    let script = write(dir, "fake-shellcheck.sh", FAKE_ANALYZER);
    ShellCheck::new(AnalyzerConfig {
        command: vec!["sh".to_string(), script.display().to_string()],
        timeout: Some(Duration::from_secs(30)),
    })
    .expect("analyzer")
}

fn shellcheck_available() -> bool {
    std::process::Command::new("shellcheck")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Test: GitLab job with an unassigned lower-case variable
#[tokio::test]
async fn test_gitlab_unassigned_variable_reports_issues() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), ".gitlab-ci.yml", GITLAB);
    let analyzer = fake_analyzer(dir.path());

    let report = run(&[input], &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    let file = &report.files[0];
    assert_eq!(file.status, FileStatus::Analyzed);
    assert_eq!(file.scripts.len(), 2, "before_script and script stay separate");
    assert_eq!(file.verdicts[0].codes, vec!["SC2154"]);
    assert!(file.verdicts[0].output.contains("html/script"));
    assert!(!file.verdicts[0].output.contains("before_script"));
    assert_eq!(report.outcome, Severity::Issues);
    assert_eq!(report.exit_code(), 1);
}

/// Test: Bitbucket script with an upper-case environment variable is clean
#[tokio::test]
async fn test_bitbucket_environment_variable_is_clean() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "bitbucket-pipelines.yml", BITBUCKET);
    let analyzer = fake_analyzer(dir.path());

    let report = run(&[input], &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    assert_eq!(report.files[0].status, FileStatus::Analyzed);
    assert!(report.files[0].verdicts[0].codes.is_empty());
    assert_eq!(report.outcome, Severity::Clean);
}

/// Test: malformed YAML does not stop the other files
#[tokio::test]
async fn test_malformed_file_among_three() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write(dir.path(), "broken.yml", "job: [unclosed\n"),
        write(dir.path(), ".gitlab-ci.yml", GITLAB),
        write(dir.path(), "bitbucket-pipelines.yml", BITBUCKET),
    ];
    let analyzer = fake_analyzer(dir.path());

    let report = run(&files, &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    assert!(matches!(report.files[0].status, FileStatus::ParseFailed { .. }));
    assert_eq!(report.files[1].severity(), Severity::Issues);
    assert_eq!(report.files[2].severity(), Severity::Clean);
    assert_eq!(report.outcome, Severity::FileError);
}

/// Test: a hanging analyzer becomes a file error instead of blocking the run
#[tokio::test]
async fn test_analyzer_timeout() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), ".gitlab-ci.yml", GITLAB);
    let analyzer = ShellCheck::new(AnalyzerConfig {
        command: vec!["sh".into(), "-c".into(), "sleep 10".into()],
        timeout: Some(Duration::from_millis(300)),
    })
    .expect("analyzer");

    let report = run(&[input], &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    assert!(report.files[0].verdicts[0].timed_out);
    assert_eq!(report.outcome, Severity::FileError);
}

/// Test: a missing analyzer aborts the run and cleans up the output directory
#[tokio::test]
async fn test_missing_analyzer_aborts_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), ".gitlab-ci.yml", GITLAB);
    let outdir = dir.path().join("out");
    let analyzer = ShellCheck::new(AnalyzerConfig::from_command_line(
        "yaml-shellcheck-missing-analyzer",
    ))
    .expect("analyzer");
    let config = RunConfig {
        outdir: Some(outdir.clone()),
        ..RunConfig::default()
    };

    let err = run(&[input], &config, &analyzer).await.unwrap_err();

    assert!(matches!(err, RunError::Analyzer(_)));
    assert_eq!(err.severity(), Severity::BadOptions);
    assert!(!outdir.exists(), "output directory should be removed");
}

/// Test: a task name longer than a file name limit does not abort the run
#[tokio::test]
async fn test_long_task_name_with_other_file() {
    let dir = TempDir::new().unwrap();
    let playbook = format!("- name: {}\n  shell: echo $task\n", "x".repeat(300));
    let files = vec![
        write(dir.path(), ".gitlab-ci.yml", GITLAB),
        write(dir.path(), "site.yml", &playbook),
    ];
    let analyzer = fake_analyzer(dir.path());

    let report = run(&files, &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    assert_eq!(report.files[0].severity(), Severity::Issues);
    assert_eq!(report.files[1].status, FileStatus::Analyzed);
    assert_eq!(report.files[1].scripts.len(), 1);
    assert_eq!(report.files[1].verdicts[0].codes, vec!["SC2154"]);
}

/// Test: --keep leaves the scripts in the output directory
#[tokio::test]
async fn test_keep_retains_scripts() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), ".gitlab-ci.yml", GITLAB);
    let outdir = dir.path().join("out");
    let config = RunConfig {
        outdir: Some(outdir.clone()),
        keep: true,
        shebang: "#!/bin/bash".to_string(),
        jobs: 1,
    };

    let report = run(&[input], &config, &fake_analyzer(dir.path()))
        .await
        .expect("run failed");

    let script = &report.files[0].scripts[1];
    assert!(script.relative.ends_with("html/script"));
    let content = std::fs::read_to_string(outdir.join(&script.relative)).expect("kept script");
    assert_eq!(content, "#!/bin/bash\necho $foo\n");
}

/// Test: real ShellCheck finds SC2154 only for the lower-case variable
#[tokio::test]
async fn test_real_shellcheck_when_installed() {
    if !shellcheck_available() {
        eprintln!("shellcheck not installed, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let files = vec![
        write(dir.path(), ".gitlab-ci.yml", GITLAB),
        write(dir.path(), "bitbucket-pipelines.yml", BITBUCKET),
    ];
    let analyzer = ShellCheck::new(AnalyzerConfig::default()).expect("analyzer");

    let report = run(&files, &RunConfig::default(), &analyzer)
        .await
        .expect("run failed");

    assert!(report.files[0].verdicts[0].codes.contains(&"SC2154".to_string()));
    assert!(!report.files[1].verdicts[0].codes.contains(&"SC2154".to_string()));
    assert!(report.outcome >= Severity::Issues);
}

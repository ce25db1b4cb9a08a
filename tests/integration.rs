use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let articles = root.join("articles");
    fs::create_dir_all(&articles).unwrap();
    fs::write(
        articles.join("rust-ownership.md"),
        format!(
            "# Ownership\n\nRust ownership rules and the borrow checker.\n\n{}",
            "Moves, borrows, and lifetimes. ".repeat(40)
        ),
    )
    .unwrap();
    fs::write(
        articles.join("python-ml.txt"),
        format!(
            "Python and machine learning notes.\n\n{}",
            "PyTorch training loops. ".repeat(20)
        ),
    )
    .unwrap();

    let project = root.join("projects").join("borrowck-demo");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(
        project.join("README.md"),
        format!(
            "# borrowck-demo\n\nExamples of ownership errors.\n\n{}",
            "More text. ".repeat(30)
        ),
    )
    .unwrap();
    fs::write(
        project.join("src").join("main.js"),
        format!("// ownership demo\n{}", "console.log(1);\n".repeat(20)),
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
articles_dir = "{root}/articles"
projects_dir = "{root}/projects"

[retrieval]
max_articles = 5

[history]
dir = "{root}/history"
recent_days = 7
"#,
        root = root.display()
    );

    let config_path = config_dir.join("rag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_directories() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rag(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Initialized"));
    assert!(tmp.path().join("history").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (_, _, first) = run_rag(&config, &["init"]);
    let (_, stderr, second) = run_rag(&config, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_search_json_payload() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rag(&config, &["search", "ownership", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let articles = value["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["source"], "rust-ownership.md");
    assert_eq!(articles[0]["content"].as_str().unwrap().chars().count(), 1000);

    let projects = value["github_projects"].as_array().unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0]["source"], "GitHub: borrowck-demo");
    assert_eq!(projects[1]["source"], "Code: main.js");
    assert_eq!(projects[1]["type"], "code_file");

    assert_eq!(
        value["sources"],
        serde_json::json!(["rust-ownership.md", "GitHub: borrowck-demo", "Code: main.js"])
    );
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config) = setup_test_env();
    let (first, _, _) = run_rag(&config, &["search", "ownership", "--json"]);
    let (second, _, _) = run_rag(&config, &["search", "ownership", "--json"]);
    assert_eq!(first, second);
}

#[test]
fn test_search_no_results() {
    let (_tmp, config) = setup_test_env();
    let (stdout, _, success) = run_rag(&config, &["search", "xyzzyplugh"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_history_save_and_show() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rag(
        &config,
        &[
            "history",
            "save",
            "--question",
            "What is ownership?",
            "--answer",
            "A set of rules.",
            "--timestamp",
            "2024-01-01T10:00:00",
            "--source",
            "rust-ownership.md",
        ],
    );
    assert!(success, "save failed: {}", stderr);
    assert!(stdout.contains("20240101_100000"));

    let (stdout, _, success) = run_rag(&config, &["history", "show", "2024-01-01", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let conversations = value["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["question"], "What is ownership?");
    assert_eq!(
        conversations[0]["sources"],
        serde_json::json!(["rust-ownership.md"])
    );
}

#[test]
fn test_history_day_log_on_disk() {
    let (tmp, config) = setup_test_env();
    run_rag(
        &config,
        &[
            "history",
            "save",
            "--question",
            "q",
            "--answer",
            "a",
            "--timestamp",
            "2024-02-03T04:05:06",
        ],
    );

    let log = tmp.path().join("history").join("chat_2024-02-03.json");
    let content = fs::read_to_string(&log).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0]["id"], "20240203_040506");
}

#[test]
fn test_history_show_invalid_date_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_rag(&config, &["history", "show", "not-a-date"]);
    assert!(!success);
    assert!(stderr.contains("invalid date"));
}

#[test]
fn test_history_delete() {
    let (_tmp, config) = setup_test_env();
    run_rag(
        &config,
        &[
            "history",
            "save",
            "--question",
            "q",
            "--answer",
            "a",
            "--timestamp",
            "2024-01-01T10:00:00",
        ],
    );

    let (stdout, _, success) = run_rag(&config, &["history", "delete", "2024-01-01"]);
    assert!(success);
    assert!(stdout.contains("Deleted"));

    let (stdout, _, _) = run_rag(&config, &["history", "delete", "2024-01-01"]);
    assert!(stdout.contains("No history found"));
}

#[test]
fn test_stats_json() {
    let (_tmp, config) = setup_test_env();
    run_rag(
        &config,
        &[
            "history",
            "save",
            "--question",
            "q",
            "--answer",
            "a",
            "--timestamp",
            "2024-01-01T10:00:00",
        ],
    );

    let (stdout, stderr, success) = run_rag(&config, &["stats", "--json"]);
    assert!(success, "stats failed: {}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["total_articles"], 2);
    assert_eq!(value["total_projects"], 1);
    assert_eq!(value["total_conversations"], 1);
}

#[test]
fn test_history_stats_json() {
    let (_tmp, config) = setup_test_env();
    for ts in ["2024-01-01T10:00:00", "2024-01-02T09:00:00"] {
        run_rag(
            &config,
            &["history", "save", "--question", "q", "--answer", "a", "--timestamp", ts],
        );
    }

    let (stdout, _, success) = run_rag(&config, &["history", "stats", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["total_conversations"], 2);
    assert_eq!(value["total_days"], 2);
    assert_eq!(value["first_conversation"], "2024-01-01T10:00:00");
    assert_eq!(value["last_conversation"], "2024-01-02T09:00:00");
}

#[test]
fn test_invalid_config_fails() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(&bad, "[retrieval]\nmax_articles = 0\n").unwrap();
    let (_, _, success) = run_rag(&bad, &["stats"]);
    assert!(!success);
}

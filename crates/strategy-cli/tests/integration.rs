#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn strategy(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("strategy").unwrap();
    cmd.current_dir(dir.path())
        .env("STRATEGY_CONFIG", dir.path().join("config.yaml"))
        .env("STRATEGY_CACHE_DIR", dir.path().join("cache"))
        .env("STRATEGY_USER", "tester")
        .env_remove("STRATEGY_SERVER");
    cmd
}

/// Create a project and return its id.
fn create_project(dir: &TempDir, name: &str) -> String {
    let out = strategy(dir)
        .args(["--json", "project", "create", name])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    v["id"].as_str().unwrap().to_string()
}

fn show_json(dir: &TempDir, project: &str) -> serde_json::Value {
    let out = strategy(dir)
        .args(["--json", "project", "show", project])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

fn strengths(project: &serde_json::Value) -> Vec<serde_json::Value> {
    project["frameworks"]["swot"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["id"] == "strengths")
        .unwrap()["ideas"]
        .as_array()
        .unwrap()
        .clone()
}

// ---------------------------------------------------------------------------
// project
// ---------------------------------------------------------------------------

#[test]
fn list_is_empty_at_first() {
    let dir = TempDir::new().unwrap();
    strategy(&dir)
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects"));
}

#[test]
fn created_project_survives_between_runs() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Corner Bakery");

    assert!(dir.path().join("cache/projects-tester.json").exists());
    strategy(&dir)
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Corner Bakery"))
        .stdout(predicate::str::contains(id.as_str()));
}

#[test]
fn blank_project_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    strategy(&dir)
        .args(["project", "create", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn projects_resolve_by_name_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Corner Bakery");

    let project = show_json(&dir, "corner bakery");
    assert_eq!(project["id"], id.as_str());
    assert_eq!(project["name"], "Corner Bakery");
}

#[test]
fn rename_and_describe_update_the_project() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Draft");

    strategy(&dir)
        .args(["project", "rename", id.as_str(), "Harbour Cafe"])
        .assert()
        .success();
    strategy(&dir)
        .args(["project", "describe", id.as_str(), "Coffee", "by", "the", "water"])
        .assert()
        .success();

    let project = show_json(&dir, &id);
    assert_eq!(project["name"], "Harbour Cafe");
    assert_eq!(project["businessDescription"], "Coffee by the water");
}

#[test]
fn delete_removes_the_project() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Short Lived");

    strategy(&dir)
        .args(["project", "delete", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted project 'Short Lived'"));
    strategy(&dir)
        .args(["project", "show", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn users_do_not_see_each_others_projects() {
    let dir = TempDir::new().unwrap();
    create_project(&dir, "Private Plan");

    strategy(&dir)
        .env("STRATEGY_USER", "someone-else")
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects"));
}

// ---------------------------------------------------------------------------
// idea
// ---------------------------------------------------------------------------

#[test]
fn manual_ideas_start_selected_and_toggle() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");

    strategy(&dir)
        .args(["idea", "add", id.as_str(), "strengths", "Loyal", "local", "customers"])
        .assert()
        .success();
    let ideas = strengths(&show_json(&dir, &id));
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0]["text"], "Loyal local customers");
    assert_eq!(ideas[0]["selected"], true);

    strategy(&dir)
        .args(["idea", "toggle", id.as_str(), "strengths", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deselected"));
    assert_eq!(strengths(&show_json(&dir, &id))[0]["selected"], false);
}

#[test]
fn move_reorders_and_reports_the_edge() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    for text in ["first", "second"] {
        strategy(&dir)
            .args(["idea", "add", id.as_str(), "strengths", text])
            .assert()
            .success();
    }

    strategy(&dir)
        .args(["idea", "move", id.as_str(), "strengths", "2", "up"])
        .assert()
        .success();
    let texts: Vec<_> = strengths(&show_json(&dir, &id))
        .iter()
        .map(|i| i["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["second", "first"]);

    strategy(&dir)
        .args(["idea", "move", id.as_str(), "strengths", "1", "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already at the top"));
}

#[test]
fn edit_and_remove_ideas() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    strategy(&dir)
        .args(["idea", "add", id.as_str(), "strengths", "draft"])
        .assert()
        .success();

    strategy(&dir)
        .args(["idea", "edit", id.as_str(), "strengths", "1", "Fresh", "bread", "daily"])
        .assert()
        .success();
    assert_eq!(strengths(&show_json(&dir, &id))[0]["text"], "Fresh bread daily");

    strategy(&dir)
        .args(["idea", "remove", id.as_str(), "strengths", "1"])
        .assert()
        .success();
    assert!(strengths(&show_json(&dir, &id)).is_empty());
}

#[test]
fn unknown_category_is_an_error() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    strategy(&dir)
        .args(["idea", "add", id.as_str(), "weather", "sunny"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category 'weather'"));
}

#[test]
fn missing_idea_position_is_an_error() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    strategy(&dir)
        .args(["idea", "toggle", id.as_str(), "strengths", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no idea #3"));
}

// ---------------------------------------------------------------------------
// doc, suggest, export
// ---------------------------------------------------------------------------

#[test]
fn documents_are_attached_from_files() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    std::fs::write(dir.path().join("notes.txt"), "Sourdough sells out by noon.").unwrap();

    strategy(&dir)
        .args(["doc", "add", id.as_str(), "notes.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added document 'notes.txt'"));
    strategy(&dir)
        .args(["doc", "list", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.txt"))
        .stdout(predicate::str::contains("28"));
}

#[test]
fn suggest_without_a_server_explains_how_to_configure_one() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Bakery");
    strategy(&dir)
        .args(["suggest", id.as_str(), "strengths"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("need a server"));
}

#[test]
fn export_writes_selected_ideas_only() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Corner Bakery");
    for text in ["Keep me", "Drop me"] {
        strategy(&dir)
            .args(["idea", "add", id.as_str(), "strengths", text])
            .assert()
            .success();
    }
    strategy(&dir)
        .args(["idea", "toggle", id.as_str(), "strengths", "2"])
        .assert()
        .success();
    strategy(&dir)
        .args(["justify", id.as_str(), "strengths", "Customers", "come", "back"])
        .assert()
        .success();

    let out = dir.path().join("report.html");
    strategy(&dir)
        .args(["export", id.as_str(), "--output"])
        .arg(&out)
        .assert()
        .success();

    let html = std::fs::read_to_string(&out).unwrap();
    assert!(html.contains("Corner Bakery"));
    assert!(html.contains("Keep me"));
    assert!(!html.contains("Drop me"));
    assert!(html.contains("Customers come back"));
}

#[test]
fn export_defaults_to_a_dated_file_name() {
    let dir = TempDir::new().unwrap();
    let id = create_project(&dir, "Corner Bakery");
    strategy(&dir).args(["export", id.as_str()]).assert().success();

    let found = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with("corner-bakery-strategy-") && name.ends_with(".html")
        });
    assert!(found);
}

// ---------------------------------------------------------------------------
// categories, config
// ---------------------------------------------------------------------------

#[test]
fn categories_lists_every_framework() {
    let dir = TempDir::new().unwrap();
    strategy(&dir)
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("strengths"))
        .stdout(predicate::str::contains("political"))
        .stdout(predicate::str::contains("threat-of-new-entry"))
        .stdout(predicate::str::contains("promotion"));
}

#[test]
fn config_set_is_persisted_and_shown() {
    let dir = TempDir::new().unwrap();
    strategy(&dir)
        .env_remove("STRATEGY_USER")
        .args(["config", "set", "user", "alice"])
        .assert()
        .success();

    let yaml = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(yaml.contains("alice"));
    strategy(&dir)
        .env_remove("STRATEGY_USER")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn invalid_config_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    strategy(&dir)
        .args(["config", "set", "debounce-ms", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid debounce-ms"));
}

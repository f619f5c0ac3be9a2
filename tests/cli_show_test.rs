//! Integration tests for `knobs show` and `knobs list`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_show_locked_has_only_toggle() {
    let env = TestEnv::with_manifest();
    let result = env.json(&["show"]);
    let sections = result["schema"]["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    let items = sections[0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "override_toggle");
    assert_eq!(items[0]["enabled"], false);
}

#[test]
fn test_show_groups_sections() {
    let env = TestEnv::with_manifest();
    env.json(&["override", "on"]);
    let result = env.json(&["show"]);
    let sections = result["schema"]["sections"].as_array().unwrap();

    let ids: Vec<Option<&str>> = sections
        .iter()
        .map(|s| s["id"]["name"].as_str())
        .collect();
    assert_eq!(ids, vec![None, Some("Features"), Some("Appearance")]);

    let head: Vec<&str> = sections[0]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["kind"].as_str().unwrap())
        .collect();
    assert_eq!(head, vec!["override_toggle", "reset_action", "text", "text"]);

    let features: Vec<&str> = sections[1]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["key"].as_str().unwrap())
        .collect();
    assert_eq!(features, vec!["feature.new-ui", "regions"]);

    let theme = &sections[2]["items"][0];
    assert_eq!(theme["kind"], "choice");
    assert_eq!(theme["current_text"], "Dark");
    assert_eq!(theme["choices"][1]["raw_token"], "light");
}

#[test]
fn test_show_human() {
    let env = TestEnv::with_manifest();
    env.json(&["override", "on"]);
    env.knobs()
        .args(["show", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] Override mode"))
        .stdout(predicate::str::contains("API timeout (api.timeout) = 30"))
        .stdout(predicate::str::contains("[ ] New UI (feature.new-ui)"))
        .stdout(predicate::str::contains("Appearance"));
}

#[test]
fn test_list_empty_while_locked() {
    let env = TestEnv::with_manifest();
    let result = env.json(&["list"]);
    assert_eq!(result["count"], 0);
}

#[test]
fn test_list_in_declaration_order() {
    let env = TestEnv::with_manifest();
    env.json(&["override", "on"]);
    let result = env.json(&["list"]);
    let keys: Vec<&str> = result["knobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["key"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec!["api.timeout", "greeting", "feature.new-ui", "theme", "regions"]
    );
    assert_eq!(result["knobs"][4]["kind"], "list<string>");
}

#[test]
fn test_broken_manifest_is_reported() {
    let env = TestEnv::new();
    env.write_project_file("knobs.kdl", "knob \"k\" kind=\"int\" default=\"lots\"\n");
    env.knobs()
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest error"));
}

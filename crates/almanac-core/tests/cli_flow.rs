use std::fs;

use almanac_core::cli::GlobalCli;
use almanac_core::commands::{Session, dispatch};
use almanac_core::config::CalendarConfig;
use almanac_core::occurrence::load_occurrences;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::Value;
use tempfile::tempdir;

const OCCURRENCES: &str = r#"[
  {"title": "late", "start": "2024-03-20T15:00:00Z", "finish": "2024-03-20T16:00:00Z"},
  {"title": "early", "start": "2024-03-04T09:00:00Z", "finish": "2024-03-04T10:00:00Z"},
  {"title": "middle", "start": "2024-03-12T12:00:00Z", "finish": "2024-03-12T13:00:00Z"},
  {"title": "april", "start": "2024-04-02T08:00:00Z", "finish": "2024-04-02T09:00:00Z"}
]"#;

fn run_json(config_body: &str, args: &[&str]) -> anyhow::Result<Value> {
    let temp = tempdir().expect("tempdir");
    let config_path = temp.path().join("almanac.toml");
    let occurrences_path = temp.path().join("occurrences.json");
    fs::write(&config_path, config_body).expect("write config");
    fs::write(&occurrences_path, OCCURRENCES).expect("write occurrences");

    let cli = GlobalCli::try_parse_from(std::iter::once("almanac").chain(args.iter().copied()))?;
    let mut config = CalendarConfig::from_sources(Some(&config_path), None)?;
    config.apply_overrides(cli.overrides.into_iter().map(|kv| (kv.key, kv.value)))?;
    let ctx = config.context()?;
    let now: DateTime<Utc> = "2024-03-15T12:00:00Z".parse().expect("valid instant");

    let session = Session {
        config,
        ctx,
        occurrences: load_occurrences(&occurrences_path)?,
        now,
    };
    dispatch(&session, &cli.command)
}

fn titles(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["title"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn occurrences_load_sorted_by_start() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("occurrences.json");
    fs::write(&path, OCCURRENCES).expect("write occurrences");
    let loaded = load_occurrences(&path).expect("load");
    let order: Vec<_> = loaded.iter().map(|o| o.title.as_str()).collect();
    assert_eq!(order, ["early", "middle", "late", "april"]);
}

#[test]
fn occurrence_ending_before_start_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("occurrences.json");
    fs::write(
        &path,
        r#"[{"title": "backwards", "start": "2024-03-04T10:00:00Z", "finish": "2024-03-04T09:00:00Z"}]"#,
    )
    .expect("write occurrences");
    let err = load_occurrences(&path).expect_err("negative interval");
    assert!(err.to_string().contains("backwards"));
}

#[test]
fn agenda_pages_through_month() {
    let out = run_json(
        "[views]\nagenda_page_size = 2\n",
        &["agenda", "month", "2024-03-10", "--page", "2"],
    )
    .expect("agenda");
    assert_eq!(out["agenda"]["pages"], 2);
    assert_eq!(out["agenda"]["total"], 3);
    assert_eq!(titles(&out["agenda"]["items"]), ["late"]);

    let past_end = run_json(
        "[views]\nagenda_page_size = 2\n",
        &["agenda", "month", "2024-03-10", "--page", "3"],
    );
    assert!(past_end.is_err());
}

#[test]
fn set_override_beats_file() {
    let out = run_json(
        "[views]\nagenda_page_size = 2\n",
        &[
            "--set",
            "views.agenda_page_size=10",
            "agenda",
            "month",
            "2024-03-10",
        ],
    )
    .expect("agenda");
    assert_eq!(out["agenda"]["pages"], 1);
    assert_eq!(titles(&out["agenda"]["items"]), ["early", "middle", "late"]);
}

#[test]
fn week_number_resolves_with_first_weekday() {
    let out = run_json("", &["week", "--number", "10", "--year", "2024"]).expect("week");
    assert_eq!(out["period"]["start"], "2024-03-04T00:00:00");
    assert_eq!(titles(&out["period"]["occurrences"]), ["early"]);
    assert_eq!(out["period"]["children"].as_array().map(Vec::len), Some(7));
    assert_eq!(out["weekday_abbrs"][0], "Mon");

    let sunday = run_json(
        "[week]\nfirst_day = \"sunday\"\n",
        &["week", "--number", "10", "--year", "2024"],
    )
    .expect("week");
    assert_eq!(sunday["period"]["start"], "2024-03-10T00:00:00");
    assert_eq!(sunday["weekday_abbrs"][0], "Sun");
}

#[test]
fn tri_month_view_centres_requested_month() {
    let out = run_json("", &["tri-month", "2024-03-15"]).expect("tri-month");
    let months: Vec<_> = out["period"]["children"]
        .as_array()
        .map(|months| months.iter().filter_map(|m| m["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(months, ["February", "March", "April"]);
    assert_eq!(out["period"]["occurrences"].as_array().map(Vec::len), Some(4));
    assert_eq!(out["bounds"]["earliest_occurrence"], "2024-03-04T09:00:00");
    assert_eq!(out["bounds"]["latest_occurrence"], "2024-04-02T09:00:00");
}

#[test]
fn policy_and_filters_narrow_the_pool() {
    let out = run_json("", &["month", "2024-03-01", "--filter", "past"]).expect("past");
    assert_eq!(titles(&out["period"]["occurrences"]), ["early", "middle"]);

    let out = run_json("[views]\nallow_future = false\n", &["month", "2024-03-01"])
        .expect("no future");
    assert_eq!(titles(&out["period"]["occurrences"]), ["early", "middle"]);

    let empty = run_json("[views]\nallow_empty = false\n", &["month", "2024-06-01"]);
    assert!(empty.is_err());
}

#[test]
fn day_view_lists_slots() {
    let out = run_json(
        "[timeslots]\nstart = \"08:00\"\nduration_minutes = 120\ninterval_minutes = 30\n",
        &["day", "2024-03-04"],
    )
    .expect("day");
    let slots = out["period"]["children"].as_array().map(Vec::len);
    assert_eq!(slots, Some(5));
    assert_eq!(out["period"]["children"][2]["occurrences"].as_array().map(Vec::len), Some(1));
    assert_eq!(out["previous_start"], "2024-03-03T00:00:00");
    assert_eq!(out["next_start"], "2024-03-05T00:00:00");
}

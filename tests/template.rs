// tests/template.rs

use chrono::{Local, TimeZone};
use serde_json::{Map, Value, json};

use jobctl::config::template::{HostInfo, default_variables, merge_variables, substitute};

fn vars(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn substitutes_both_placeholder_forms() {
    let v = vars(&[("name", json!("world")), ("n", json!(3))]);
    assert_eq!(substitute("hello $name", &v), "hello world");
    assert_eq!(substitute("${name}wide", &v), "worldwide");
    assert_eq!(substitute("retries=$n", &v), "retries=3");
}

#[test]
fn unknown_names_and_escapes() {
    let v = vars(&[("name", json!("world"))]);
    assert_eq!(substitute("$missing ${missing}", &v), "$missing ${missing}");
    assert_eq!(substitute("cost: $$5 $$name", &v), "cost: $5 $name");
    assert_eq!(substitute("trailing $", &v), "trailing $");
}

#[test]
fn later_layers_win() {
    let defaults = vars(&[("a", json!(1)), ("b", json!(1))]);
    let file = vars(&[("b", json!(2)), ("c", json!(2))]);
    let extras = vars(&[("c", json!(3))]);

    let merged = merge_variables([&defaults, &file, &extras]);
    assert_eq!(merged["a"], json!(1));
    assert_eq!(merged["b"], json!(2));
    assert_eq!(merged["c"], json!(3));
}

#[test]
fn built_in_variables() {
    let start = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).single().unwrap();
    let host = HostInfo::new("db01.prod.example.com");
    let v = default_variables("nightly.json", start, &host);

    assert_eq!(host.short, "db01");
    assert_eq!(v["config_file"], json!("nightly.json"));
    assert_eq!(v["date"], json!("2023_12_31"));
    assert_eq!(v["date_time"], json!("20231231_235958"));
    assert_eq!(v["date_time_2"], json!("20231231-235958"));
    assert_eq!(v["date_time_3"], json!("20231231235958"));
    assert_eq!(v["date_time_4"], json!("2023-12-31 23:59:58"));
    assert_eq!(v["hostname"], json!("db01"));
    assert_eq!(v["hostname_fqdn"], json!("db01.prod.example.com"));
    assert_eq!(v["smtp_relay"], json!("localhost"));
    assert!(v["concurrency"].as_u64().unwrap() >= 1);
    assert!(v.contains_key("date_time_friendly"));
}

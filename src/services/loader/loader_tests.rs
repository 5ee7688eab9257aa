use super::*;
use serde_json::json;
use std::sync::mpsc;

fn fixture() -> StaticSource {
    let mut records = HashMap::new();
    records.insert(
        "Company".to_string(),
        vec![
            json!({"name": "Globex", "country": "Chile", "email": "hq@globex.cl", "default_currency": "CLP"}),
            json!({"name": "Initech", "country": "United States"}),
        ],
    );
    records.insert(
        "User".to_string(),
        vec![json!({"name": "Administrator"}), json!({"name": "ann@acme.io"})],
    );
    StaticSource::new(records, None)
}

#[test]
fn get_by_path_traverses_nested_objects() {
    let v = json!({"data": {"doc": {"name": "Globex"}}});
    assert_eq!(
        get_by_path(&v, "data.doc.name").and_then(|x| x.as_str()),
        Some("Globex")
    );
    assert!(get_by_path(&v, "data.missing").is_none());
}

#[test]
fn unwrap_envelope_surfaces_error_message() {
    let err = unwrap_envelope(
        json!({"ok": false, "data": {"message": "Company Foo not found"}}),
        "data",
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Company Foo not found");

    let ok = unwrap_envelope(json!({"ok": true, "data": {"name": "Globex"}}), "data").unwrap();
    assert_eq!(ok, json!({"name": "Globex"}));

    assert!(unwrap_envelope(json!({"ok": true}), "data").is_err());
}

#[test]
fn argv_keeps_names_verbatim() {
    for name in ["Acme Corp", "Acme\\Corp", "#1Corp", "${HOME}", "O'Neil"] {
        let argv = CliSource::argv("app get-doc {doctype} {name}", "Company", Some(name)).unwrap();
        assert_eq!(argv, vec!["app", "get-doc", "Company", name]);
    }
    let list = CliSource::argv("app get-list {doctype}", "User", None).unwrap();
    assert_eq!(list, vec!["app", "get-list", "User"]);
}

// `sh -c 'printf %s "$0"' <json>` prints its first argument verbatim
fn printing(json: &str) -> String {
    format!(r#"sh -c 'printf %s "$0"' '{json}' {{doctype}} {{name}}"#)
}

fn cli(doc_json: &str, list_json: &str) -> CliSource {
    CliSource::new(printing(doc_json), printing(list_json), None)
}

#[test]
fn cli_source_unwraps_document() {
    let src = cli(r#"{"ok":true,"data":{"name":"Globex","country":"Chile"}}"#, "[]");
    let doc = src.get_doc("Company", "Globex").unwrap();
    assert_eq!(doc["country"], "Chile");
}

#[test]
fn cli_source_rejects_non_object_document() {
    let src = cli(r#"{"ok":true,"data":[1,2]}"#, "[]");
    let err = src.get_doc("Company", "Globex").unwrap_err();
    assert!(err.to_string().contains("expected an object"));
}

#[test]
fn cli_source_surfaces_envelope_failure() {
    let src = cli(r#"{"ok":false,"message":"no such company"}"#, "[]");
    let err = src.get_doc("Company", "Umbrella").unwrap_err();
    assert_eq!(err.to_string(), "no such company");
}

#[test]
fn cli_source_accepts_plain_and_items_lists() {
    let plain = cli("{}", r#"{"ok":true,"data":[{"name":"ann"},{"name":"bob"}]}"#);
    assert_eq!(plain.get_list("User").unwrap().len(), 2);
    let items = cli("{}", r#"{"ok":true,"data":{"items":[{"name":"ann"}]}}"#);
    assert_eq!(items.get_list("User").unwrap(), vec![json!({"name": "ann"})]);
}

#[test]
fn cli_source_rejects_non_array_list() {
    let obj = cli("{}", r#"{"ok":true,"data":{"total":0}}"#);
    assert!(obj.get_list("User").unwrap_err().to_string().contains("expected an array"));
    let scalar = cli("{}", r#"{"ok":true,"data":"nope"}"#);
    assert!(scalar.get_list("User").unwrap_err().to_string().contains("expected an array"));
}

#[test]
fn cli_source_reports_failing_command() {
    let src = CliSource::new(
        "sh -c 'echo boom >&2; exit 3' {doctype} {name}".into(),
        "sh -c 'exit 1' {doctype}".into(),
        None,
    );
    let err = src.get_doc("Company", "Globex").unwrap_err().to_string();
    assert!(err.contains("Command failed"));
    assert!(err.contains("boom"));
    assert!(src.get_list("User").is_err());
}

#[test]
fn cli_source_passes_name_as_single_argument() {
    // Echo the name back inside the payload; `$2` is `{name}`
    let src = CliSource::new(
        r#"sh -c 'printf "{\"ok\":true,\"data\":{\"name\":\"%s\"}}" "$2"' sh {doctype} {name}"#.into(),
        "sh -c 'printf []'".into(),
        None,
    );
    for name in ["Acme Corp", "#1Corp", "${HOME}", "O'Neil & Sons"] {
        let doc = src.get_doc("Company", name).unwrap();
        assert_eq!(doc["name"], name);
    }
}

#[test]
fn static_source_finds_by_name() {
    let src = fixture();
    let doc = src.get_doc("Company", "Globex").unwrap();
    assert_eq!(doc["country"], "Chile");
    assert!(src.get_doc("Company", "Umbrella").is_err());
    assert_eq!(src.get_list("User").unwrap().len(), 2);
    assert!(src.get_list("Supplier").unwrap().is_empty());
}

#[test]
fn source_from_config_falls_back_to_records() {
    let cfg = SourceConfig {
        records: fixture().records,
        ..Default::default()
    };
    let src = source_from_config(&cfg);
    assert!(src.get_doc("Company", "Initech").is_ok());
}

#[test]
fn spawn_load_company_sends_record() {
    let (tx, rx) = mpsc::channel();
    let key = company_key("Globex", 7);
    spawn_load_company(Arc::new(fixture()), "Company".into(), "Globex".into(), key, tx);
    let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(msg.key, "company:Globex#7");
    assert!(matches!(msg.kind, LoadKind::Company { ref name } if name == "Globex"));
    match msg.outcome {
        Ok(LoadOutcome::Record(v)) => assert_eq!(v["default_currency"], "CLP"),
        _ => panic!("expected a company record"),
    }
}

#[test]
fn spawn_load_company_reports_failure_as_string() {
    let (tx, rx) = mpsc::channel();
    let key = company_key("Umbrella", 1);
    spawn_load_company(Arc::new(fixture()), "Company".into(), "Umbrella".into(), key, tx);
    let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let err = msg.outcome.err().unwrap();
    assert!(err.contains("Umbrella not found"));
}

#[test]
fn spawn_load_users_sends_rows() {
    let (tx, rx) = mpsc::channel();
    spawn_load_users(Arc::new(fixture()), "User".into(), tx);
    let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(msg.key, USERS_KEY);
    match msg.outcome {
        Ok(LoadOutcome::Rows(rows)) => assert_eq!(rows.len(), 2),
        _ => panic!("expected user rows"),
    }
}

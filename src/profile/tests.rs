use super::*;
use crate::widgets::Widget;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn ctx(default_company: Option<&str>) -> DialogContext {
    DialogContext {
        session_user: "jane@acme.io".into(),
        default_company: default_company.map(str::to_string),
        translator: Translator::default(),
    }
}

fn recording_action() -> (Action, Rc<RefCell<Vec<FormValues>>>) {
    let calls: Rc<RefCell<Vec<FormValues>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let action = Action::new(None, move |values| sink.borrow_mut().push(values));
    (action, calls)
}

fn values(pairs: &[(&str, &str)]) -> FormValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
        .collect()
}

fn text(dialog: &ProfileDialog, fieldname: &str) -> Option<String> {
    dialog
        .get_value(fieldname)
        .and_then(|v| v.as_text())
        .map(str::to_string)
}

#[test]
fn open_issues_user_fetch_then_company_lookups_in_order() {
    let (action, _) = recording_action();
    let (dialog, effects) = ProfileDialog::open(
        None,
        action,
        values(&[("company", "Acme"), ("username", "jane")]),
        &ctx(Some("Globex")),
    );
    let kinds: Vec<String> = effects
        .iter()
        .map(|e| match e {
            Effect::LoadUsers => "users".to_string(),
            Effect::LoadCompany { name } => format!("company:{name}"),
            _ => "other".to_string(),
        })
        .collect();
    assert_eq!(kinds, vec!["users", "company:Acme", "company:Globex"]);
    assert_eq!(dialog.form().title, "Edit Profile");
    assert_eq!(dialog.form().primary_label, "Update");
}

#[test]
fn default_company_wins_over_initial_value() {
    let (action, _) = recording_action();
    let (dialog, _) = ProfileDialog::open(
        Some("My Profile"),
        action,
        values(&[("company", "Acme")]),
        &ctx(Some("Globex")),
    );
    assert_eq!(text(&dialog, "company").as_deref(), Some("Globex"));
    assert_eq!(dialog.form().title, "My Profile");
}

#[test]
fn absent_default_clears_initial_company() {
    let (action, _) = recording_action();
    let (dialog, effects) =
        ProfileDialog::open(None, action, values(&[("company", "Acme")]), &ctx(None));
    assert!(dialog.get_value("company").is_none());
    assert_eq!(effects.len(), 2);
}

#[test]
fn company_record_populates_derived_fields() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    dialog.set_value("company_email", "typed@me.io".into());
    dialog.apply_company(&json!({
        "name": "Globex",
        "country": "Chile",
        "email": "hq@globex.cl",
        "default_currency": "CLP"
    }));
    assert_eq!(text(&dialog, "country").as_deref(), Some("Chile"));
    assert_eq!(text(&dialog, "company_email").as_deref(), Some("hq@globex.cl"));
    assert_eq!(text(&dialog, "currency").as_deref(), Some("CLP"));
}

#[test]
fn company_record_missing_keys_blank_the_fields() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    dialog.set_value("country", "Peru".into());
    dialog.apply_company(&json!({"name": "Initech", "default_currency": null}));
    assert!(dialog.get_value("country").is_none());
    assert!(dialog.get_value("currency").is_none());
}

#[test]
fn clearing_company_issues_no_fetch_and_keeps_derived_values() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(Some("Globex")));
    dialog.apply_company(&json!({"country": "Chile", "email": "a@b.c", "default_currency": "CLP"}));
    let effects = dialog.set_value("company", "".into());
    assert!(effects.is_empty());
    assert_eq!(text(&dialog, "country").as_deref(), Some("Chile"));
}

#[test]
fn unchanged_company_issues_no_fetch() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(Some("Globex")));
    assert!(dialog.set_value("company", "Globex".into()).is_empty());
    let effects = dialog.set_value("company", "Initech".into());
    assert!(matches!(&effects[..], [Effect::LoadCompany { name }] if name == "Initech"));
}

#[test]
fn candidates_exclude_system_and_session_users() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    assert!(dialog.candidates().is_empty());
    dialog.apply_users(&[
        json!({"name": "Administrator"}),
        json!({"name": "ann@acme.io"}),
        json!({"name": "Guest"}),
        json!({"name": "jane@acme.io"}),
        json!("bob@acme.io"),
        json!({"email": "nameless@acme.io"}),
    ]);
    assert_eq!(dialog.candidates(), vec!["ann@acme.io", "bob@acme.io"]);
}

#[test]
fn user_list_still_applies_after_close() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    dialog.close();
    dialog.apply_users(&[json!({"name": "ann@acme.io"})]);
    assert!(dialog.is_closed());
    assert_eq!(dialog.candidates(), vec!["ann@acme.io"]);
}

#[test]
fn submit_with_all_mandatory_fields_calls_action_once() {
    let (action, calls) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(
        None,
        action,
        values(&[
            ("company_email", "hq@globex.cl"),
            ("company_description", "Widgets"),
            ("username", "jane"),
        ]),
        &ctx(Some("Globex")),
    );
    assert_eq!(dialog.primary_action(), SubmitOutcome::Submitted);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].get("company"), Some(&FieldValue::from("Globex")));
    assert_eq!(calls[0].get("company_email"), Some(&FieldValue::from("hq@globex.cl")));
    assert_eq!(calls[0].get("company_description"), Some(&FieldValue::from("Widgets")));
    assert_eq!(calls[0].get("username"), Some(&FieldValue::from("jane")));
}

#[test]
fn submit_with_missing_field_flags_it_and_skips_action() {
    let (action, calls) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(
        None,
        action,
        values(&[("company_email", "hq@globex.cl"), ("company_description", "")]),
        &ctx(Some("Globex")),
    );
    let outcome = dialog.primary_action();
    assert_eq!(
        outcome,
        SubmitOutcome::Incomplete(vec!["company_description".to_string()])
    );
    assert!(calls.borrow().is_empty());
    let form = dialog.form();
    assert!(form.field("company_description").unwrap().required);
    assert!(!form.field("company").unwrap().required);
    assert!(!dialog.is_closed());
}

#[test]
fn required_flag_survives_a_later_successful_submit() {
    let (action, calls) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(Some("Globex")));
    assert!(matches!(dialog.primary_action(), SubmitOutcome::Incomplete(m) if m.len() == 2));
    dialog.set_values(values(&[
        ("company_email", "hq@globex.cl"),
        ("company_description", "Widgets"),
    ]));
    assert_eq!(dialog.primary_action(), SubmitOutcome::Submitted);
    assert_eq!(calls.borrow().len(), 1);
    assert!(dialog.form().field("company_email").unwrap().required);
}

#[test]
fn repeated_submit_calls_action_each_time_with_fresh_snapshot() {
    let (action, calls) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(
        None,
        action,
        values(&[
            ("company_email", "hq@globex.cl"),
            ("company_description", "Widgets"),
        ]),
        &ctx(Some("Globex")),
    );
    dialog.primary_action();
    dialog.set_value("company_description", "Gadgets".into());
    dialog.primary_action();
    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].get("company_description"), Some(&FieldValue::from("Widgets")));
    assert_eq!(calls[1].get("company_description"), Some(&FieldValue::from("Gadgets")));
}

#[test]
fn editing_company_through_keys_requests_lookup() {
    let (action, _) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    dialog.on_key(KeyCode::Down);
    dialog.on_key(KeyCode::Enter);
    for c in "Initech".chars() {
        dialog.on_key(KeyCode::Char(c));
    }
    let effects = dialog.on_key(KeyCode::Enter);
    assert!(matches!(&effects[..], [Effect::LoadCompany { name }] if name == "Initech"));
}

#[test]
fn cancel_button_asks_caller_to_close() {
    let (action, calls) = recording_action();
    let (mut dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    let effects = dialog.on_key(KeyCode::Esc);
    assert!(matches!(&effects[..], [Effect::CloseDialog]));
    assert!(calls.borrow().is_empty());
}

#[test]
fn custom_action_label_is_used() {
    let action = Action::new(Some("Register".into()), |_| {});
    let (dialog, _) = ProfileDialog::open(None, action, FormValues::new(), &ctx(None));
    assert_eq!(dialog.form().primary_label, "Register");
}

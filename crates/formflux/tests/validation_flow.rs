//! End-to-end validation scenarios across the form, pipeline, and rules.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use formflux::{
    CaptchaProvider, FaultKind, FieldConfig, Form, PipelineState, TransportError, UniqueBackend,
};
use serde_json::{Value, json};

const SETTLE: Duration = Duration::from_secs(5);

fn unique_form(backend: UniqueBackend) -> Form {
    let mut form = Form::new().with_unique_backend(backend);
    form.register_field(FieldConfig::new("email").rules_str("required|unique:users,email"))
        .unwrap();
    form
}

fn counting_backend(
    result: Result<bool, TransportError>,
    calls: Arc<AtomicUsize>,
) -> UniqueBackend {
    UniqueBackend::Function(Arc::new(move |_value, _name, _params| {
        calls.fetch_add(1, Ordering::SeqCst);
        result.clone()
    }))
}

// --- Unique ----------------------------------------------------------------

#[test]
fn unique_endpoint_false_yields_invalid_with_unique_message() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut form = unique_form(counting_backend(Ok(false), calls.clone()));

    form.set_value("email", json!("taken@example.com"));
    assert_eq!(form.validate("email").unwrap(), PipelineState::Pending);
    assert_eq!(form.settle_blocking("email", SETTLE), Some(false));

    assert_eq!(
        form.message_bag("email").unwrap().errors(),
        vec!["email must be unique"]
    );
    // Plain not-unique is a validation failure, not a fault.
    assert!(form.drain_faults().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unique_transport_error_fails_closed_with_observable_fault() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut form = unique_form(counting_backend(
        Err(TransportError::Network("connection refused".into())),
        calls,
    ));

    form.set_value("email", json!("someone@example.com"));
    form.validate("email").unwrap();
    assert_eq!(form.settle_blocking("email", SETTLE), Some(false));

    // The bag carries the normal rule message; the transport detail is a
    // separate signal, not a message.
    assert_eq!(
        form.message_bag("email").unwrap().errors(),
        vec!["email must be unique"]
    );
    let faults = form.drain_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0.to_string(), "email");
    assert_eq!(
        faults[0].1.kind,
        FaultKind::Transport(TransportError::Network("connection refused".into()))
    );
}

#[test]
fn failing_sync_rule_suppresses_async_rules() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut form = unique_form(counting_backend(Ok(true), calls.clone()));

    // Empty value: `required` fails, `unique` must never be invoked.
    assert_eq!(form.validate("email").unwrap(), PipelineState::Invalid);
    assert_eq!(
        form.message_bag("email").unwrap().errors(),
        vec!["email is required"]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn rapid_triggers_keep_only_the_last_outcome() {
    // The endpoint rejects "first" slowly and accepts "second" instantly.
    // Triggering both in quick succession must end valid: the slow failure
    // arrives stale and is discarded.
    let backend = UniqueBackend::Function(Arc::new(|value: &Value, _name, _params| {
        if value == &json!("first") {
            thread::sleep(Duration::from_millis(60));
            Ok(false)
        } else {
            Ok(true)
        }
    }));
    let mut form = unique_form(backend);

    form.set_value("email", json!("first"));
    form.validate("email").unwrap();
    form.set_value("email", json!("second"));
    form.validate("email").unwrap();

    assert_eq!(form.settle_blocking("email", SETTLE), Some(true));

    // Let the stale rejection land, then poll: state must not regress.
    thread::sleep(Duration::from_millis(100));
    form.poll();
    assert_eq!(form.state("email"), Some(PipelineState::Valid));
    assert!(form.message_bag("email").unwrap().is_empty());
}

// --- Confirmed -------------------------------------------------------------

fn password_form() -> Form {
    let mut form = Form::new();
    form.register_field(FieldConfig::new("password").rules_str("required|confirmed"))
        .unwrap();
    form.register_field(FieldConfig::new("password_confirmation"))
        .unwrap();
    form
}

#[test]
fn confirmed_matches_then_diverges() {
    let mut form = password_form();
    form.set_value("password", json!("abc"));
    form.set_value("password_confirmation", json!("abc"));
    assert_eq!(form.validate("password").unwrap(), PipelineState::Valid);

    form.set_value("password_confirmation", json!("xyz"));
    // Editing the confirmation target re-triggers password's validation.
    assert_eq!(form.state("password"), Some(PipelineState::Invalid));
    assert_eq!(
        form.message_bag("password").unwrap().error(),
        Some("password confirmation does not match")
    );

    form.set_value("password_confirmation", json!("abc"));
    assert_eq!(form.state("password"), Some(PipelineState::Valid));
}

#[test]
fn confirmation_edits_before_first_validation_stay_quiet() {
    let mut form = password_form();
    form.set_value("password", json!("abc"));
    form.set_value("password_confirmation", json!("nope"));

    // The field never validated; a dependency change must not surprise the
    // user with errors.
    assert_eq!(form.state("password"), Some(PipelineState::Idle));
    assert!(form.message_bag("password").unwrap().is_empty());
}

#[test]
fn confirmed_resolves_sibling_within_repeated_row() {
    let mut form = Form::new();
    form.register_field(FieldConfig::new("accounts.1.pin").rules_str("confirmed"))
        .unwrap();

    form.set_value("accounts.0.pin_confirmation", json!("0000"));
    form.set_value("accounts.1.pin", json!("1234"));
    form.set_value("accounts.1.pin_confirmation", json!("1234"));

    // The sibling in the same row decides, not row zero.
    assert_eq!(
        form.validate("accounts.1.pin").unwrap(),
        PipelineState::Valid
    );
}

// --- Captcha ---------------------------------------------------------------

struct StubCaptcha {
    response: Option<String>,
    verdict: Result<bool, TransportError>,
}

impl CaptchaProvider for StubCaptcha {
    fn get_response(&self) -> Option<String> {
        self.response.clone()
    }
    fn verify(&self, _response: &str) -> Result<bool, TransportError> {
        self.verdict.clone()
    }
}

#[test]
fn captcha_verifies_through_the_provider() {
    let mut form = Form::new().with_captcha(Arc::new(StubCaptcha {
        response: Some("token".into()),
        verdict: Ok(true),
    }));
    form.register_field(FieldConfig::new("robot_check").rules_str("captcha"))
        .unwrap();

    form.validate("robot_check").unwrap();
    assert_eq!(form.settle_blocking("robot_check", SETTLE), Some(true));
}

#[test]
fn disabled_element_passes_captcha_trivially() {
    // No provider at all: a disabled element must still pass.
    let mut form = Form::new();
    form.register_field(FieldConfig::new("robot_check").rules_str("captcha"))
        .unwrap();
    form.disable("robot_check").unwrap();

    form.validate("robot_check").unwrap();
    assert_eq!(form.settle_blocking("robot_check", SETTLE), Some(true));
    assert!(form.drain_faults().is_empty());
}

#[test]
fn missing_captcha_provider_is_a_config_fault() {
    let mut form = Form::new();
    form.register_field(FieldConfig::new("robot_check").rules_str("captcha"))
        .unwrap();

    form.validate("robot_check").unwrap();
    assert_eq!(form.settle_blocking("robot_check", SETTLE), Some(false));

    let faults = form.drain_faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0].1.kind, FaultKind::Config(_)));
}

// --- Completed -------------------------------------------------------------

#[test]
fn completed_reads_the_mask_flag() {
    let mut form = Form::new();
    form.register_field(FieldConfig::new("phone").rules_str("completed"))
        .unwrap();

    form.set_value("phone", json!("555-01"));
    form.set_mask_complete("phone", Some(false)).unwrap();
    assert_eq!(form.validate("phone").unwrap(), PipelineState::Invalid);

    form.set_mask_complete("phone", Some(true)).unwrap();
    assert_eq!(form.validate("phone").unwrap(), PipelineState::Valid);

    // Empty value passes regardless: emptiness is `required`'s business.
    form.set_value("phone", json!(""));
    form.set_mask_complete("phone", Some(false)).unwrap();
    assert_eq!(form.validate("phone").unwrap(), PipelineState::Valid);
}

// --- Host messages ---------------------------------------------------------

#[test]
fn host_injected_messages_survive_validation_passes() {
    let mut form = Form::new();
    form.register_field(FieldConfig::new("email").rules_str("required"))
        .unwrap();

    let bag = form.message_bag_mut("email").unwrap();
    bag.append("x", formflux::MessageKind::Error);
    bag.prepend("y", formflux::MessageKind::Error);

    form.validate("email").unwrap();
    assert_eq!(
        form.message_bag("email").unwrap().errors(),
        vec!["y", "email is required", "x"]
    );

    // Removal by text only touches the edges.
    form.message_bag_mut("email").unwrap().remove("y", None);
    assert_eq!(
        form.message_bag("email").unwrap().errors(),
        vec!["email is required", "x"]
    );
}

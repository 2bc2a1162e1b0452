//! Availability reactivity across repeated rows and nested scopes.

use formflux::{Condition, FieldConfig, Form};
use serde_json::json;

#[test]
fn wildcard_conditions_scope_to_their_own_row() {
    let mut form = Form::new();
    for row in 0..2 {
        form.register_field(
            FieldConfig::new(format!("items.{row}.discount"))
                .condition(Condition::equals("*.kind", json!("sale"))),
        )
        .unwrap();
    }

    form.set_value("items.0.kind", json!("sale"));
    form.set_value("items.1.kind", json!("regular"));

    assert_eq!(form.available("items.0.discount"), Some(true));
    assert_eq!(form.available("items.1.discount"), Some(false));

    // Flipping row 1 only affects row 1.
    form.set_value("items.1.kind", json!("sale"));
    assert_eq!(form.available("items.0.discount"), Some(true));
    assert_eq!(form.available("items.1.discount"), Some(true));
}

#[test]
fn membership_conditions_react_to_graph_changes() {
    let mut form = Form::new();
    form.register_field(
        FieldConfig::new("vat_number")
            .condition(Condition::one_of("country", vec![json!("DE"), json!("FR")])),
    )
    .unwrap();

    assert_eq!(form.available("vat_number"), Some(false));
    form.set_value("country", json!("FR"));
    assert_eq!(form.available("vat_number"), Some(true));
    form.set_value("country", json!("fr")); // case-sensitive as stored
    assert_eq!(form.available("vat_number"), Some(false));
}

#[test]
fn nested_scope_availability_is_conjunctive() {
    let mut form = Form::new();
    form.register_field(
        FieldConfig::new("billing").condition(Condition::truthy("wants_invoice")),
    )
    .unwrap();
    form.register_field(
        FieldConfig::new("billing.company")
            .condition(Condition::equals("customer_kind", json!("business"))),
    )
    .unwrap();

    // Neither referenced value set: everything hidden.
    assert_eq!(form.available("billing.company"), Some(false));

    // Own condition satisfied but parent still hidden.
    form.set_value("customer_kind", json!("business"));
    assert_eq!(form.available("billing"), Some(false));
    assert_eq!(form.available("billing.company"), Some(false));

    // Parent appears: the child's own condition now decides.
    form.set_value("wants_invoice", json!(true));
    assert_eq!(form.available("billing"), Some(true));
    assert_eq!(form.available("billing.company"), Some(true));

    // Parent collapses again: every descendant goes with it.
    form.set_value("wants_invoice", json!(false));
    assert_eq!(form.available("billing.company"), Some(false));
}

#[test]
fn default_literal_backstops_unbound_condition_paths() {
    let mut form = Form::new();
    form.register_field(
        FieldConfig::new("shipping_note")
            .condition(Condition::equals("delivery|'pickup'", json!("pickup"))),
    )
    .unwrap();

    // Nothing bound at `delivery`: the default literal satisfies the test.
    assert_eq!(form.available("shipping_note"), Some(true));

    form.set_value("delivery", json!("courier"));
    assert_eq!(form.available("shipping_note"), Some(false));
}

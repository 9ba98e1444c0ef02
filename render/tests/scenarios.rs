use pretty_assertions::assert_eq;
use serde_json::json;
use tracker_attributes::{AttributeDefinition, Encoded, PropValue, encode, parse_input};
use tracker_render::{ControlKind, NumberDisplay, UserAction, render};

fn definition(value: serde_json::Value) -> AttributeDefinition {
    serde_json::from_value(value).unwrap()
}

#[test]
fn bar_fill_ratio_uses_string_denominator() {
    let def = definition(json!({
        "id": "n1",
        "type": "number",
        "display_name": "Progress",
        "extra_settings": {"representation": "bar", "divided_by": "50"}
    }));

    let Encoded::Write(tuples) = encode(&parse_input(def.attribute_type, "25").unwrap()) else {
        panic!("a number always writes");
    };
    let control = render(&def, Some(tuples.as_slice())).unwrap();

    assert_eq!(
        control.kind,
        ControlKind::Number {
            value: Some(25),
            display: NumberDisplay::Bar { ratio: Some(0.5) },
            show_number: true,
            color: None,
        }
    );
}

#[test]
fn select_without_value_resolves_to_default_option() {
    let def = definition(json!({
        "id": "s1",
        "type": "select",
        "display_name": "Severity",
        "children": [
            {"id": "a", "type": "option", "display_name": "High", "is_default": true, "sort_order": 1},
            {"id": "b", "type": "option", "display_name": "Low", "sort_order": 2}
        ]
    }));

    let control = render(&def, None).unwrap();
    assert_eq!(control.selected_ids(), vec!["a"]);

    let ControlKind::Select { options, .. } = &control.kind else {
        panic!("expected a select control");
    };
    assert_eq!(
        options
            .iter()
            .map(|chip| (chip.label.as_str(), chip.selected, chip.removable))
            .collect::<Vec<_>>(),
        vec![("High", true, true), ("Low", false, false)]
    );
}

#[test]
fn datetime_hides_time_when_configured() {
    let def = definition(json!({
        "id": "d1",
        "type": "datetime",
        "display_name": "Due",
        "extra_settings": {"date_format": "YYYY/MM/DD", "hide_time": true}
    }));
    let stored = [PropValue::scalar("2024-03-09T14:05:00.000Z")];

    let control = render(&def, Some(&stored[..])).unwrap();
    let ControlKind::Datetime { display, .. } = &control.kind else {
        panic!("expected a datetime control");
    };
    assert_eq!(display.as_deref(), Some("2024/03/09"));
}

#[test]
fn chosen_option_round_trips_through_render() {
    let def = definition(json!({
        "id": "m1",
        "type": "multi_select",
        "display_name": "Labels",
        "is_required": true,
        "children": [
            {"id": "x", "type": "option", "display_name": "X"},
            {"id": "y", "type": "option", "display_name": "Y"}
        ]
    }));

    let empty = render(&def, None).unwrap();
    let change = empty.interact(UserAction::AddOption("y".into())).unwrap();
    assert_eq!(change.attribute_id, "m1");

    let after = render(&def, Some(change.encoded.tuples())).unwrap();
    assert_eq!(after.selected_ids(), vec!["y"]);
    assert!(after.interact(UserAction::RemoveOption("y".into())).is_err());
}

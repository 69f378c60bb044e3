use chefchat::api::models::ToolCallDelta;
use chefchat::api::ToolCallAccumulator;
use serde_json::json;

fn fragment(value: serde_json::Value) -> ToolCallDelta {
    serde_json::from_value(value).unwrap()
}

#[test]
fn interleaved_out_of_order_fragments_reassemble() {
    // Two simultaneous calls, fragments interleaved and index 1 arriving
    // first, arguments split across five chunks each.
    let fragments = vec![
        fragment(json!({"index": 1, "function": {"arguments": "{\"dish"}})),
        fragment(json!({"index": 0, "id": "call_a", "function": {"name": "getMenu", "arguments": "{\"peo"}})),
        fragment(json!({"index": 1, "id": "call_b", "function": {"name": "getRecipe", "arguments": "Name\":"}})),
        fragment(json!({"index": 0, "function": {"arguments": "pleCou"}})),
        fragment(json!({"index": 1, "function": {"arguments": "\"麻婆"}})),
        fragment(json!({"index": 0, "function": {"arguments": "nt\": 4"}})),
        fragment(json!({"index": 1, "function": {"arguments": "豆腐\""}})),
        fragment(json!({"index": 0, "function": {"arguments": ", \"context\": \"\""}})),
        fragment(json!({"index": 1, "function": {"arguments": "}"}})),
        fragment(json!({"index": 0, "function": {"arguments": "}"}})),
    ];

    let mut accumulator = ToolCallAccumulator::new();
    for fragment in &fragments {
        accumulator.apply(fragment);
    }

    let calls = accumulator.into_calls();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].id, "call_a");
    assert_eq!(calls[0].function.name, "getMenu");
    let args_a: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
    assert_eq!(args_a, json!({"peopleCount": 4, "context": ""}));

    assert_eq!(calls[1].id, "call_b");
    assert_eq!(calls[1].function.name, "getRecipe");
    let args_b: serde_json::Value = serde_json::from_str(&calls[1].function.arguments).unwrap();
    assert_eq!(args_b, json!({"dishName": "麻婆豆腐"}));
}

#[test]
fn late_id_overwrites_and_name_is_set_once() {
    let mut accumulator = ToolCallAccumulator::new();
    accumulator.apply(&fragment(
        json!({"index": 0, "function": {"name": "searchNearby", "arguments": "{"}}),
    ));
    accumulator.apply(&fragment(
        json!({"index": 0, "id": "late_id", "function": {"name": "ignored", "arguments": "}"}}),
    ));

    let calls = accumulator.into_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "late_id");
    assert_eq!(calls[0].function.name, "searchNearby");
    assert_eq!(calls[0].function.arguments, "{}");
}

#[test]
fn missing_id_still_emits_with_empty_id() {
    let mut accumulator = ToolCallAccumulator::new();
    accumulator.apply(&fragment(
        json!({"index": 2, "function": {"name": "getRecipe", "arguments": "{}"}}),
    ));

    let calls = accumulator.into_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "");
    assert_eq!(calls[0].function.name, "getRecipe");
}

#[test]
fn call_type_defaults_to_function() {
    let mut accumulator = ToolCallAccumulator::new();
    accumulator.apply(&fragment(json!({"index": 0, "id": "x"})));
    let calls = accumulator.into_calls();
    assert_eq!(calls[0].call_type, "function");
}

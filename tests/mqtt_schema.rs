// Schema validation tests for the MQTT wire format
//
// These tests construct JSON values directly (independent of Rust structs)
// and validate them against the JSON Schema files in schemas/mqtt/.

use serde_json::json;

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/mqtt/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::options()
        .build(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

// =========================================================================
// State events
// =========================================================================

#[test]
fn current_state_valid() {
    validate(
        "state_event.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CURRENT_STATE",
            "state": "AWAY_ARM",
            "value": 1,
            "description": "away"
        }),
    );
}

#[test]
fn target_state_without_description_valid() {
    // NIGHT_ARM has no panel-side description; the field is simply absent
    validate(
        "state_event.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "TARGET_STATE",
            "state": "NIGHT_ARM",
            "value": 2
        }),
    );
}

#[test]
fn state_event_rejects_unknown_op() {
    validate_fails(
        "state_event.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "SNAPSHOT",
            "state": "AWAY_ARM",
            "value": 1
        }),
    );
}

#[test]
fn state_event_rejects_out_of_range_value() {
    validate_fails(
        "state_event.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CURRENT_STATE",
            "state": "AWAY_ARM",
            "value": 7
        }),
    );
}

#[test]
fn state_event_rejects_unknown_state_name() {
    validate_fails(
        "state_event.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CURRENT_STATE",
            "state": "VACATION_ARM",
            "value": 1
        }),
    );
}

// =========================================================================
// Command acknowledgements
// =========================================================================

#[test]
fn cmd_ack_success_valid() {
    validate(
        "cmd_ack.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CMD_ACK",
            "success": true,
            "src": {"op": "SET_TARGET", "state": "AWAY_ARM"}
        }),
    );
}

#[test]
fn cmd_ack_transitioning_failure_valid() {
    validate(
        "cmd_ack.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CMD_ACK",
            "success": false,
            "src": {"op": "STATUS"},
            "error": "no HAP state corresponds to panel status 'exit_delay' - the system may be transitioning",
            "transitioning": true
        }),
    );
}

#[test]
fn cmd_ack_requires_success_flag() {
    validate_fails(
        "cmd_ack.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "CMD_ACK"
        }),
    );
}

// =========================================================================
// Accessory info
// =========================================================================

#[test]
fn accessory_info_valid() {
    validate(
        "accessory_info.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "ACCESSORY_INFO",
            "name": "Security System",
            "manufacturer": "Visonic",
            "model": "PowerLink2",
            "serialNumber": "0"
        }),
    );
}

#[test]
fn accessory_info_requires_serial() {
    validate_fails(
        "accessory_info.schema.json",
        &json!({
            "now": 1770000000000_u64,
            "op": "ACCESSORY_INFO",
            "name": "Security System",
            "manufacturer": "Visonic",
            "model": "PowerLink2"
        }),
    );
}

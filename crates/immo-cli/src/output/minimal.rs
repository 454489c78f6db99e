use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority, inside
/// the result or its `metrics` block, then fall back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "irr",
        "base_case_irr",
        "net_exit_proceeds",
        "npv",
        "equity_multiple",
        "monthly_payment",
    ];

    if let Value::Object(map) = result_obj {
        let metrics = map.get("metrics").and_then(Value::as_object);
        for key in &priority_keys {
            let found = map
                .get(*key)
                .or_else(|| metrics.and_then(|m| m.get(*key)))
                .filter(|v| !v.is_null());
            if let Some(val) = found {
                println!("{}", format_minimal(val));
                return;
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

use serde_json::{Map, Value};

use crate::api::errors::{non_field_error, ApiError, FieldErrors};
use crate::items::item_models::{ItemChanges, ItemFields};

pub const NAME_MAX_LENGTH: usize = 100;

const REQUIRED: &str = "This field is required.";
const NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NULL_CHARACTERS: &str = "Null characters are not allowed.";

/// Validated body of a POST or PUT: every writable field, `quantity` defaulted.
pub fn parse_full_payload(body: &[u8]) -> Result<ItemFields, ApiError> {
    let object = decode_object(body)?;
    let mut errors = FieldErrors::new();

    let name = text_field(&object, "name", Some(NAME_MAX_LENGTH), true, &mut errors);
    let description = text_field(&object, "description", None, true, &mut errors);
    let quantity = quantity_field(&object, &mut errors);

    match (name, description) {
        (Some(name), Some(description)) if errors.is_empty() => Ok(ItemFields {
            name,
            description,
            quantity: quantity.unwrap_or(0),
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Validated body of a PATCH: only the fields present are checked and changed.
pub fn parse_partial_payload(body: &[u8]) -> Result<ItemChanges, ApiError> {
    let object = decode_object(body)?;
    let mut errors = FieldErrors::new();

    let changes = ItemChanges {
        name: text_field(&object, "name", Some(NAME_MAX_LENGTH), false, &mut errors),
        description: text_field(&object, "description", None, false, &mut errors),
        quantity: quantity_field(&object, &mut errors),
    };

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn decode_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::RequestParsingError(e.to_string()))?;

    match value {
        Value::Object(object) => Ok(object),
        other => Err(non_field_error(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn push_error(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

/// Strings are trimmed; numbers are accepted and rendered as text.
fn text_field(
    object: &Map<String, Value>,
    field: &str,
    max_length: Option<usize>,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<String> {
    let text = match object.get(field) {
        None => {
            if required {
                push_error(errors, field, REQUIRED.to_string());
            }
            return None;
        }
        Some(Value::Null) => {
            push_error(errors, field, NULL.to_string());
            return None;
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            push_error(errors, field, NOT_A_STRING.to_string());
            return None;
        }
    };

    if text.contains('\0') {
        push_error(errors, field, NULL_CHARACTERS.to_string());
        return None;
    }
    if text.is_empty() {
        push_error(errors, field, BLANK.to_string());
        return None;
    }
    if let Some(max) = max_length {
        if text.chars().count() > max {
            push_error(
                errors,
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
            return None;
        }
    }
    Some(text)
}

/// Accepts `"15"`, `" 15 "`, `"15."` and `"15.00"`; a trailing zero fraction is dropped.
fn parse_integer_text(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits = match text.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        Some(_) => return None,
        None => text,
    };
    digits.parse::<i64>().ok()
}

/// Integers, integral floats and numeric strings within the i32 range.
fn quantity_field(object: &Map<String, Value>, errors: &mut FieldErrors) -> Option<i32> {
    let field = "quantity";
    let parsed: Option<i64> = match object.get(field)? {
        Value::Null => {
            push_error(errors, field, NULL.to_string());
            return None;
        }
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e18)
                .map(|f| f as i64)
        }),
        Value::String(s) => parse_integer_text(s),
        _ => None,
    };

    let Some(value) = parsed else {
        push_error(errors, field, NOT_AN_INTEGER.to_string());
        return None;
    };

    match i32::try_from(value) {
        Ok(quantity) => Some(quantity),
        Err(_) if value > 0 => {
            push_error(
                errors,
                field,
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
        Err(_) => {
            push_error(
                errors,
                field,
                format!("Ensure this value is greater than or equal to {}.", i32::MIN),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full(value: Value) -> Result<ItemFields, ApiError> {
        parse_full_payload(value.to_string().as_bytes())
    }

    fn partial(value: Value) -> Result<ItemChanges, ApiError> {
        parse_partial_payload(value.to_string().as_bytes())
    }

    fn field_errors(result: Result<impl std::fmt::Debug, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("Expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_full_payload() {
        let fields = full(json!({
            "name": "Widget",
            "description": "A widget",
            "quantity": 10,
        }))
        .unwrap();

        assert_eq!(
            fields,
            ItemFields {
                name: "Widget".to_string(),
                description: "A widget".to_string(),
                quantity: 10,
            }
        );
    }

    #[test]
    fn test_quantity_defaults_to_zero() {
        let fields = full(json!({"name": "Widget", "description": "A widget"})).unwrap();
        assert_eq!(fields.quantity, 0);
    }

    #[test]
    fn test_read_only_and_unknown_fields_are_ignored() {
        let fields = full(json!({
            "id": 99,
            "created_at": "2020-01-01T00:00:00Z",
            "name": "Widget",
            "description": "A widget",
            "colour": "blue",
        }))
        .unwrap();
        assert_eq!(fields.name, "Widget");
    }

    #[test]
    fn test_missing_fields_are_required() {
        let errors = field_errors(full(json!({})));
        assert_eq!(errors["name"], vec![REQUIRED.to_string()]);
        assert_eq!(errors["description"], vec![REQUIRED.to_string()]);
        assert!(!errors.contains_key("quantity"));
    }

    #[test]
    fn test_empty_body_is_an_empty_object() {
        let errors = field_errors(parse_full_payload(b""));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_blank_and_null_values() {
        let errors = field_errors(full(json!({
            "name": "   ",
            "description": null,
            "quantity": null,
        })));
        assert_eq!(errors["name"], vec![BLANK.to_string()]);
        assert_eq!(errors["description"], vec![NULL.to_string()]);
        assert_eq!(errors["quantity"], vec![NULL.to_string()]);
    }

    #[test]
    fn test_name_length_limit() {
        let errors = field_errors(full(json!({
            "name": "x".repeat(101),
            "description": "A widget",
        })));
        assert_eq!(
            errors["name"],
            vec!["Ensure this field has no more than 100 characters.".to_string()]
        );

        assert!(full(json!({"name": "x".repeat(100), "description": "A widget"})).is_ok());
    }

    #[test]
    fn test_strings_are_trimmed() {
        let fields = full(json!({"name": "  Widget ", "description": "A widget\n"})).unwrap();
        assert_eq!(fields.name, "Widget");
        assert_eq!(fields.description, "A widget");
    }

    #[test]
    fn test_quantity_coercion() {
        let base = |quantity: Value| {
            full(json!({"name": "Widget", "description": "A widget", "quantity": quantity}))
        };

        assert_eq!(base(json!("15")).unwrap().quantity, 15);
        assert_eq!(base(json!("15.0")).unwrap().quantity, 15);
        assert_eq!(base(json!(" 15.00 ")).unwrap().quantity, 15);
        assert_eq!(base(json!(15.0)).unwrap().quantity, 15);
        assert_eq!(base(json!(-3)).unwrap().quantity, -3);

        for invalid in [
            json!("many"),
            json!(1.5),
            json!("1.5"),
            json!("15.0.0"),
            json!(true),
            json!([1]),
        ] {
            let errors = field_errors(base(invalid));
            assert_eq!(errors["quantity"], vec![NOT_AN_INTEGER.to_string()]);
        }

        let errors = field_errors(base(json!(2_147_483_648_i64)));
        assert_eq!(
            errors["quantity"],
            vec!["Ensure this value is less than or equal to 2147483647.".to_string()]
        );
    }

    #[test]
    fn test_null_characters_are_rejected() {
        let errors = field_errors(parse_full_payload(
            br#"{"name": "Wid\u0000get", "description": "A\u0000widget"}"#,
        ));
        assert_eq!(errors["name"], vec![NULL_CHARACTERS.to_string()]);
        assert_eq!(errors["description"], vec![NULL_CHARACTERS.to_string()]);

        let errors = field_errors(partial(json!({"description": "nul\0"})));
        assert_eq!(errors["description"], vec![NULL_CHARACTERS.to_string()]);
    }

    #[test]
    fn test_non_string_text_is_rejected() {
        let errors = field_errors(full(json!({"name": {"a": 1}, "description": "A widget"})));
        assert_eq!(errors["name"], vec![NOT_A_STRING.to_string()]);
    }

    #[test]
    fn test_non_object_body() {
        let errors = field_errors(full(json!([1, 2])));
        assert_eq!(
            errors["non_field_errors"],
            vec!["Invalid data. Expected a dictionary, but got list.".to_string()]
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_full_payload(b"{\"name\": "),
            Err(ApiError::RequestParsingError(_))
        ));
    }

    #[test]
    fn test_partial_payload_only_sets_present_fields() {
        let changes = partial(json!({"quantity": 15})).unwrap();
        assert_eq!(
            changes,
            ItemChanges {
                name: None,
                description: None,
                quantity: Some(15),
            }
        );

        assert_eq!(partial(json!({})).unwrap(), ItemChanges::default());
    }

    #[test]
    fn test_partial_payload_still_validates_present_fields() {
        let errors = field_errors(partial(json!({"name": ""})));
        assert_eq!(errors["name"], vec![BLANK.to_string()]);
    }
}

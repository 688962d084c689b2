use serde_json::{json, Value};

/// JSON schema sent alongside every extraction request so the service emits
/// the exact shape `validate_extraction` expects. The contract is repeated
/// on the validation side on purpose; a schema-conformant response is a
/// fast path, not a trusted one.
pub fn extraction_output_schema() -> Value {
    json!({
        "type": "object",
        "required": ["products"],
        "additionalProperties": false,
        "properties": {
            "products": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "description", "basePrice", "pricingModel", "type"],
                    "additionalProperties": false,
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string" },
                        "basePrice": { "type": "number", "minimum": 0 },
                        "pricingModel": {
                            "type": "string",
                            "enum": ["one-time", "subscription", "per_item"]
                        },
                        "type": {
                            "type": "string",
                            "enum": ["product", "service", "license"]
                        }
                    }
                }
            },
            "rules": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "description", "condition", "action"],
                    "additionalProperties": false,
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string", "minLength": 1 },
                        "condition": { "type": "string", "minLength": 1 },
                        "action": { "type": "string", "minLength": 1 }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::extraction_output_schema;

    #[test]
    fn schema_requires_products_but_not_rules() {
        let schema = extraction_output_schema();
        let required = schema["required"].as_array().expect("required list");
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "products");
        assert!(schema["properties"]["rules"].is_object());
    }

    #[test]
    fn schema_pins_the_wire_enums() {
        let schema = extraction_output_schema();
        let models =
            schema["properties"]["products"]["items"]["properties"]["pricingModel"]["enum"]
                .as_array()
                .expect("pricing models");
        let values: Vec<&str> = models.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(values, vec!["one-time", "subscription", "per_item"]);
    }
}

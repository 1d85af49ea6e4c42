//! Structural validation of provision and rollback payloads.
//!
//! Validation is pure and collects every violation before returning, so a
//! caller sees all problems with a payload at once. On success the payload is
//! turned into a typed request.
//!
//! Presence follows loose truthiness: `null`, `false`, `0` and `""` count as
//! absent. A required field that is absent or not a string yields
//! `"<field> is required and must be a string"`; an optional field that is
//! present but not a string yields `"<field> must be a string"`. Format checks
//! only run on values that are strings.

use serde_json::{Map, Value};

use crate::models::{EMAIL_REGEX, PERSON_NAME_REGEX, ProvisionRequest, RollbackRequest};

/// All violations found in a payload, in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a provision payload.
///
/// Non-object payloads are treated as an empty object.
pub fn validate_provision(payload: &Value) -> Result<ProvisionRequest, ValidationErrors> {
    let fields = Fields::new(payload);
    let mut errors = Vec::new();

    let first_name = fields.required_string("firstName", &mut errors);
    let last_name = fields.required_string("lastName", &mut errors);
    let job_title = fields.required_string("jobTitle", &mut errors);
    let department = fields.required_string("department", &mut errors);

    let manager = fields.optional_string("manager", &mut errors);
    let role = fields.optional_string("role", &mut errors);

    if let Some(name) = fields.present_str("firstName")
        && !PERSON_NAME_REGEX.is_match(name)
    {
        errors.push("firstName contains invalid characters".to_string());
    }
    if let Some(name) = fields.present_str("lastName")
        && !PERSON_NAME_REGEX.is_match(name)
    {
        errors.push("lastName contains invalid characters".to_string());
    }

    match (first_name, last_name, job_title, department) {
        (Some(first_name), Some(last_name), Some(job_title), Some(department))
            if errors.is_empty() =>
        {
            Ok(ProvisionRequest {
                first_name,
                last_name,
                job_title,
                department,
                role,
                manager,
            })
        }
        _ => Err(ValidationErrors(errors)),
    }
}

/// Validate a rollback payload.
///
/// Non-object payloads are treated as an empty object.
pub fn validate_rollback(payload: &Value) -> Result<RollbackRequest, ValidationErrors> {
    let fields = Fields::new(payload);
    let mut errors = Vec::new();

    let upn = fields.required_string("upn", &mut errors);
    if let Some(upn) = fields.present_str("upn")
        && !EMAIL_REGEX.is_match(upn)
    {
        errors.push("upn must be a valid email address".to_string());
    }

    let groups = match fields.present("groups") {
        None => None,
        Some(Value::Array(items)) => {
            let ids: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect();
            if ids.len() != items.len() {
                errors.push("groups must contain only strings".to_string());
            }
            Some(ids)
        }
        Some(_) => {
            errors.push("groups must be an array".to_string());
            None
        }
    };

    let site_id = fields.optional_string("siteId", &mut errors);
    let correlation_id = fields.optional_string("correlationId", &mut errors);
    let user_id = fields.optional_string("userId", &mut errors);
    let license_sku_id = fields.optional_string("licenseSkuId", &mut errors);

    match upn {
        Some(upn) if errors.is_empty() => Ok(RollbackRequest {
            upn,
            groups,
            site_id,
            correlation_id,
            user_id,
            license_sku_id,
        }),
        _ => Err(ValidationErrors(errors)),
    }
}

/// Loose truthiness of a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Field accessor over a payload object.
struct Fields<'a>(Option<&'a Map<String, Value>>);

impl<'a> Fields<'a> {
    fn new(payload: &'a Value) -> Self {
        Self(payload.as_object())
    }

    /// The field's value, if present and truthy.
    fn present(&self, name: &str) -> Option<&'a Value> {
        self.0?.get(name).filter(|v| is_truthy(v))
    }

    fn present_str(&self, name: &str) -> Option<&'a str> {
        self.present(name)?.as_str()
    }

    fn required_string(&self, name: &str, errors: &mut Vec<String>) -> Option<String> {
        let value = self.present_str(name).map(str::to_owned);
        if value.is_none() {
            errors.push(format!("{name} is required and must be a string"));
        }
        value
    }

    fn optional_string(&self, name: &str, errors: &mut Vec<String>) -> Option<String> {
        let value = self.present(name)?;
        match value.as_str() {
            Some(s) => Some(s.to_owned()),
            None => {
                errors.push(format!("{name} must be a string"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn valid_provision() -> Value {
        json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "jobTitle": "Engineer",
            "department": "IT"
        })
    }

    fn provision_errors(payload: Value) -> Vec<String> {
        validate_provision(&payload).unwrap_err().into_messages()
    }

    fn rollback_errors(payload: Value) -> Vec<String> {
        validate_rollback(&payload).unwrap_err().into_messages()
    }

    #[test]
    fn test_valid_provision_becomes_typed_request() {
        let mut payload = valid_provision();
        payload["manager"] = json!("boss@contoso.com");
        payload["role"] = json!("Manager");

        let request = validate_provision(&payload).unwrap();
        assert_eq!(request.first_name, "Jane");
        assert_eq!(request.last_name, "Doe");
        assert_eq!(request.job_title, "Engineer");
        assert_eq!(request.department, "IT");
        assert_eq!(request.manager.as_deref(), Some("boss@contoso.com"));
        assert_eq!(request.role.as_deref(), Some("Manager"));
    }

    #[test]
    fn test_empty_provision_reports_every_required_field() {
        assert_eq!(
            provision_errors(json!({})),
            vec![
                "firstName is required and must be a string",
                "lastName is required and must be a string",
                "jobTitle is required and must be a string",
                "department is required and must be a string",
            ]
        );
    }

    #[test]
    fn test_non_object_payload_is_treated_as_empty() {
        assert_eq!(provision_errors(json!("jane")).len(), 4);
        assert_eq!(provision_errors(Value::Null).len(), 4);
        assert_eq!(
            rollback_errors(json!([1, 2])),
            vec!["upn is required and must be a string"]
        );
    }

    #[rstest]
    #[case::digit("J4ne", "firstName contains invalid characters")]
    #[case::space("Jane Ann", "firstName contains invalid characters")]
    #[case::accent("Zoë", "firstName contains invalid characters")]
    fn test_invalid_first_name(#[case] first_name: &str, #[case] expected: &str) {
        let mut payload = valid_provision();
        payload["firstName"] = json!(first_name);
        assert_eq!(provision_errors(payload), vec![expected]);
    }

    #[rstest]
    #[case::apostrophe("O'Brien")]
    #[case::hyphen("Smith-Jones")]
    fn test_punctuated_last_name_accepted(#[case] last_name: &str) {
        let mut payload = valid_provision();
        payload["lastName"] = json!(last_name);
        assert_eq!(validate_provision(&payload).unwrap().last_name, last_name);
    }

    #[test]
    fn test_all_provision_violations_reported_together() {
        let errors = provision_errors(json!({
            "firstName": "J@ne",
            "lastName": "Do3",
            "department": "IT",
            "manager": 42
        }));
        assert_eq!(
            errors,
            vec![
                "jobTitle is required and must be a string",
                "manager must be a string",
                "firstName contains invalid characters",
                "lastName contains invalid characters",
            ]
        );
    }

    #[rstest]
    #[case::null(json!(null))]
    #[case::empty_string(json!(""))]
    #[case::zero(json!(0))]
    #[case::false_(json!(false))]
    fn test_falsy_required_field_is_missing(#[case] value: Value) {
        let mut payload = valid_provision();
        payload["department"] = value;
        assert_eq!(
            provision_errors(payload),
            vec!["department is required and must be a string"]
        );
    }

    #[test]
    fn test_non_string_required_field() {
        let mut payload = valid_provision();
        payload["jobTitle"] = json!(["Engineer"]);
        assert_eq!(
            provision_errors(payload),
            vec!["jobTitle is required and must be a string"]
        );
    }

    #[test]
    fn test_falsy_optional_fields_are_absent() {
        let mut payload = valid_provision();
        payload["manager"] = json!("");
        payload["role"] = json!(null);
        let request = validate_provision(&payload).unwrap();
        assert!(request.manager.is_none());
        assert!(request.role.is_none());
    }

    #[test]
    fn test_role_must_be_string() {
        let mut payload = valid_provision();
        payload["role"] = json!({"name": "Engineer"});
        assert_eq!(provision_errors(payload), vec!["role must be a string"]);
    }

    #[test]
    fn test_valid_rollback_becomes_typed_request() {
        let request = validate_rollback(&json!({
            "upn": "jane.doe@contoso.com",
            "groups": ["g1", "g2"],
            "siteId": "site",
            "correlationId": "corr",
            "userId": "user-1",
            "licenseSkuId": "sku-1"
        }))
        .unwrap();

        assert_eq!(request.upn, "jane.doe@contoso.com");
        assert_eq!(request.groups, Some(vec!["g1".into(), "g2".into()]));
        assert_eq!(request.site_id.as_deref(), Some("site"));
        assert_eq!(request.correlation_id.as_deref(), Some("corr"));
        assert_eq!(request.user_id.as_deref(), Some("user-1"));
        assert_eq!(request.license_sku_id.as_deref(), Some("sku-1"));
    }

    #[test]
    fn test_rollback_upn_not_an_email() {
        assert_eq!(
            rollback_errors(json!({"upn": "not-an-email"})),
            vec!["upn must be a valid email address"]
        );
    }

    #[test]
    fn test_rollback_missing_upn() {
        assert_eq!(
            rollback_errors(json!({"groups": []})),
            vec!["upn is required and must be a string"]
        );
    }

    #[test]
    fn test_all_rollback_violations_reported_together() {
        let errors = rollback_errors(json!({
            "upn": "nope",
            "groups": "g1",
            "siteId": 7,
            "correlationId": true,
            "userId": ["u"],
            "licenseSkuId": {"id": 1}
        }));
        assert_eq!(
            errors,
            vec![
                "upn must be a valid email address",
                "groups must be an array",
                "siteId must be a string",
                "correlationId must be a string",
                "userId must be a string",
                "licenseSkuId must be a string",
            ]
        );
    }

    #[test]
    fn test_groups_must_contain_strings() {
        assert_eq!(
            rollback_errors(json!({"upn": "a@b.co", "groups": ["g1", 2]})),
            vec!["groups must contain only strings"]
        );
    }

    #[test]
    fn test_empty_groups_array_is_kept() {
        let request = validate_rollback(&json!({"upn": "a@b.co", "groups": []})).unwrap();
        assert_eq!(request.groups, Some(vec![]));
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = validate_rollback(&json!({})).unwrap_err();
        assert_eq!(errors.to_string(), "upn is required and must be a string");
        assert_eq!(errors.messages().len(), 1);
    }
}

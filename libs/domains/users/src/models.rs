use chrono::{DateTime, NaiveDateTime, Utc};
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;
pub const FULL_NAME_MAX_LENGTH: usize = 100;

/// Username that is only accepted together with a non-empty full name
pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// Key used for struct-level validation errors
pub const CROSS_FIELD_KEY: &str = "__all__";

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern is valid"));

/// Roles a user may hold
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Editor,
    Viewer,
}

impl Role {
    /// Comma separated list of every accepted role name
    pub fn allowed() -> String {
        Role::iter()
            .map(|role| role.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_active() -> bool {
    true
}

const FIELD_REQUIRED: &str = "field required";
const NOT_A_STRING: &str = "value is not a valid string";
const NOT_A_BOOLEAN: &str = "value is not a valid boolean";
const NOT_A_STRING_LIST: &str = "value is not a valid list of strings";
const NOT_A_DATETIME: &str = "value is not a valid datetime";

/// Field name and message for each shape problem found while reading a body
type InputErrors = Vec<(&'static str, &'static str)>;

/// Parse an RFC 3339 timestamp, or a timestamp without offset taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|ts| ts.and_utc()))
}

/// Stores `signup_ts` as a BSON date rather than a string.
mod bson_timestamp {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(|ts| bson::DateTime::from_millis(ts.timestamp_millis()))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<bson::DateTime>::deserialize(deserializer)?
            .map(|ts| {
                DateTime::from_timestamp_millis(ts.timestamp_millis())
                    .ok_or_else(|| D::Error::custom("signup_ts is out of range"))
            })
            .transpose()
    }
}

/// Create body as it arrives on the wire.
///
/// Every field is optional and untyped so that a missing or mistyped field
/// is reported together with the rule violations instead of aborting parsing.
#[derive(Debug, Default, Deserialize)]
struct CreateUserPayload {
    username: Option<Value>,
    email: Option<Value>,
    full_name: Option<Value>,
    is_active: Option<Value>,
    signup_ts: Option<Value>,
    roles: Option<Value>,
}

fn string_field(
    value: Option<Value>,
    field: &'static str,
    required: bool,
    errors: &mut InputErrors,
) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(_) => {
            errors.push((field, NOT_A_STRING));
            String::new()
        }
        None => {
            if required {
                errors.push((field, FIELD_REQUIRED));
            }
            String::new()
        }
    }
}

fn bool_field(value: Option<Value>, field: &'static str, errors: &mut InputErrors) -> bool {
    match value {
        Some(Value::Bool(flag)) => flag,
        Some(_) => {
            errors.push((field, NOT_A_BOOLEAN));
            default_active()
        }
        None => default_active(),
    }
}

fn timestamp_field(
    value: Option<Value>,
    field: &'static str,
    errors: &mut InputErrors,
) -> Option<DateTime<Utc>> {
    let parsed = match value {
        None => return None,
        Some(Value::String(raw)) => parse_timestamp(&raw),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.push((field, NOT_A_DATETIME));
    }
    parsed
}

fn string_list_field(
    value: Option<Value>,
    field: &'static str,
    errors: &mut InputErrors,
) -> Vec<String> {
    let items = match value {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push((field, NOT_A_STRING_LIST));
            return Vec::new();
        }
    };

    let strings: Option<Vec<String>> = items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => Some(text.trim().to_string()),
            _ => None,
        })
        .collect();

    strings.unwrap_or_else(|| {
        errors.push((field, NOT_A_STRING_LIST));
        Vec::new()
    })
}

impl From<CreateUserPayload> for CreateUser {
    fn from(payload: CreateUserPayload) -> Self {
        let mut input_errors = InputErrors::new();

        Self {
            username: string_field(payload.username, "username", true, &mut input_errors),
            email: string_field(payload.email, "email", true, &mut input_errors),
            full_name: string_field(payload.full_name, "full_name", false, &mut input_errors),
            is_active: bool_field(payload.is_active, "is_active", &mut input_errors),
            signup_ts: timestamp_field(payload.signup_ts, "signup_ts", &mut input_errors),
            roles: string_list_field(payload.roles, "roles", &mut input_errors),
            input_errors,
        }
    }
}

/// Payload for creating a user.
///
/// String fields are trimmed on the way in. Fields the schema does not know
/// about (a submitted `password`, for instance) are dropped. Missing or
/// mistyped fields surface from [`Validate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(from = "CreateUserPayload")]
pub struct CreateUser {
    #[schema(example = "alice01", min_length = 3, max_length = 50, pattern = r"^[a-zA-Z0-9_]+$")]
    pub username: String,

    #[schema(example = "alice@example.com")]
    pub email: String,

    #[schema(example = "Alice Liddell", max_length = 100, required = false)]
    pub full_name: String,

    #[schema(default = true, required = false)]
    pub is_active: bool,

    /// RFC 3339; a timestamp without offset is read as UTC
    #[serde(serialize_with = "bson_timestamp::serialize")]
    #[schema(example = "2023-01-01T00:00:00")]
    pub signup_ts: Option<DateTime<Utc>>,

    #[schema(example = json!(["admin", "editor"]), required = false)]
    pub roles: Vec<String>,

    #[serde(skip)]
    input_errors: InputErrors,
}

impl CreateUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            full_name: String::new(),
            is_active: true,
            signup_ts: None,
            roles: Vec::new(),
            input_errors: InputErrors::new(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn with_signup_ts(mut self, signup_ts: DateTime<Utc>) -> Self {
        self.signup_ts = Some(signup_ts);
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    fn has_input_error(&self, field: &str) -> bool {
        self.input_errors.iter().any(|(name, _)| *name == field)
    }
}

/// The domain part must hold at least two non-empty dot separated labels.
fn has_dotted_domain(email: &str) -> bool {
    email.rsplit_once('@').is_some_and(|(_, domain)| {
        domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
    })
}

fn violation(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Check every role against [`Role`], listing offenders once each in input order.
pub fn validate_roles(roles: &[String]) -> Result<(), ValidationError> {
    let mut invalid: Vec<&str> = Vec::new();
    for role in roles {
        if role.parse::<Role>().is_err() && !invalid.contains(&role.as_str()) {
            invalid.push(role);
        }
    }

    if invalid.is_empty() {
        return Ok(());
    }

    Err(violation(
        "roles",
        format!(
            "Invalid roles: {}. Must be one of: {}",
            invalid.join(", "),
            Role::allowed()
        ),
    ))
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, message) in &self.input_errors {
            errors.add(*field, violation("input", *message));
        }

        let username_len = self.username.chars().count();
        let check_username = !self.has_input_error("username");
        if check_username && !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username_len) {
            errors.add(
                "username",
                violation(
                    "length",
                    format!(
                        "Username must be between {} and {} characters",
                        USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH
                    ),
                ),
            );
        }
        if check_username && !USERNAME_PATTERN.is_match(&self.username) {
            errors.add(
                "username",
                violation(
                    "pattern",
                    "Username may only contain letters, digits and underscores",
                ),
            );
        }

        if !self.has_input_error("email")
            && !(self.email.validate_email() && has_dotted_domain(&self.email))
        {
            errors.add(
                "email",
                violation("email", "value is not a valid email address"),
            );
        }

        if !self.has_input_error("full_name")
            && self.full_name.chars().count() > FULL_NAME_MAX_LENGTH
        {
            errors.add(
                "full_name",
                violation(
                    "length",
                    format!(
                        "Full name must be at most {} characters",
                        FULL_NAME_MAX_LENGTH
                    ),
                ),
            );
        }

        if let Err(err) = validate_roles(&self.roles) {
            errors.add("roles", err);
        }

        if self.full_name.is_empty() && self.username == ANONYMOUS_USERNAME {
            errors.add(
                CROSS_FIELD_KEY,
                violation(
                    "anonymous",
                    "Either full_name or a non-anonymous username must be provided",
                ),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A user as stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, with = "bson_timestamp")]
    pub signup_ts: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
}

impl User {
    /// Build the stored form of `input` under the id the store assigned.
    pub fn from_input(id: ObjectId, input: CreateUser) -> Self {
        Self {
            id,
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            is_active: input.is_active,
            signup_ts: input.signup_ts,
            roles: input.roles,
        }
    }
}

/// Full view of a freshly created user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    /// Hex encoded ObjectId
    #[schema(example = "665f1c2ab3e4d5f6a7b8c9d0")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub signup_ts: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            signup_ts: user.signup_ts,
            roles: user.roles,
        }
    }
}

/// Public projection returned by list and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "665f1c2ab3e4d5f6a7b8c9d0")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            roles: user.roles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_messages(errors: &ValidationErrors, field: &str) -> Vec<String> {
        errors
            .field_errors()
            .get(field)
            .map(|errs| {
                errs.iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_deserialize_applies_defaults_and_trims() {
        let input: CreateUser = serde_json::from_value(json!({
            "username": "  alice01 ",
            "email": " alice@example.com",
            "password": "ignored"
        }))
        .unwrap();

        assert_eq!(input.username, "alice01");
        assert_eq!(input.email, "alice@example.com");
        assert_eq!(input.full_name, "");
        assert!(input.is_active);
        assert!(input.signup_ts.is_none());
        assert!(input.roles.is_empty());
    }

    #[test]
    fn test_missing_fields_are_reported_with_rule_violations() {
        let input: CreateUser = serde_json::from_value(json!({ "username": "a" })).unwrap();
        let errors = input.validate().unwrap_err();

        assert_eq!(field_messages(&errors, "email"), vec!["field required"]);
        assert_eq!(
            field_messages(&errors, "username"),
            vec!["Username must be between 3 and 50 characters"]
        );
    }

    #[test]
    fn test_mistyped_fields_are_reported_per_field() {
        let input: CreateUser = serde_json::from_value(json!({
            "username": 42,
            "email": "alice@example.com",
            "is_active": "yes",
            "roles": ["admin", 7]
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();

        assert_eq!(
            field_messages(&errors, "username"),
            vec!["value is not a valid string"]
        );
        assert_eq!(
            field_messages(&errors, "is_active"),
            vec!["value is not a valid boolean"]
        );
        assert_eq!(
            field_messages(&errors, "roles"),
            vec!["value is not a valid list of strings"]
        );
        assert!(!errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_null_optional_fields_take_defaults() {
        let input: CreateUser = serde_json::from_value(json!({
            "username": "alice01",
            "email": "alice@example.com",
            "full_name": null,
            "signup_ts": null
        }))
        .unwrap();

        assert_eq!(input.full_name, "");
        assert!(input.signup_ts.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_signup_ts_without_offset_is_utc() {
        let input: CreateUser = serde_json::from_value(json!({
            "username": "johndoe",
            "email": "john.doe@example.com",
            "full_name": "John Doe",
            "signup_ts": "2023-01-01T00:00:00",
            "roles": ["user", "editor"]
        }))
        .unwrap();

        assert!(input.validate().is_ok());
        assert_eq!(
            input.signup_ts,
            DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = DateTime::parse_from_rfc3339("2023-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_timestamp("2023-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_unparseable_signup_ts_is_reported() {
        let input: CreateUser = serde_json::from_value(json!({
            "username": "alice01",
            "email": "alice@example.com",
            "signup_ts": "not a date"
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();

        assert_eq!(
            field_messages(&errors, "signup_ts"),
            vec!["value is not a valid datetime"]
        );
    }

    #[test]
    fn test_valid_user_passes() {
        let input = CreateUser::new("alice01", "alice@example.com")
            .with_full_name("Alice")
            .with_roles(["admin", "viewer"]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_username_length_bounds() {
        assert!(CreateUser::new("abc", "a@example.com").validate().is_ok());
        assert!(
            CreateUser::new("a".repeat(50), "a@example.com")
                .validate()
                .is_ok()
        );

        let errors = CreateUser::new("ab", "a@example.com")
            .validate()
            .unwrap_err();
        assert_eq!(
            field_messages(&errors, "username"),
            vec!["Username must be between 3 and 50 characters"]
        );

        let errors = CreateUser::new("a".repeat(51), "a@example.com")
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn test_username_pattern() {
        let errors = CreateUser::new("bad name!", "a@example.com")
            .validate()
            .unwrap_err();
        assert_eq!(
            field_messages(&errors, "username"),
            vec!["Username may only contain letters, digits and underscores"]
        );
    }

    #[test]
    fn test_invalid_email() {
        let errors = CreateUser::new("alice01", "not-an-email")
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_email_domain_needs_a_dot() {
        for email in ["alice@localhost", "alice@example.", "alice@.com"] {
            let errors = CreateUser::new("alice01", email).validate().unwrap_err();
            assert_eq!(
                field_messages(&errors, "email"),
                vec!["value is not a valid email address"],
                "{email}"
            );
        }
        assert!(CreateUser::new("alice01", "alice@mail.example.com").validate().is_ok());
    }

    #[test]
    fn test_stored_signup_ts_is_a_bson_date() {
        let signup_ts = parse_timestamp("2023-01-01T00:00:00").unwrap();
        let user = User::from_input(
            ObjectId::new(),
            CreateUser::new("alice01", "alice@example.com").with_signup_ts(signup_ts),
        );

        let document = mongodb::bson::to_document(&user).unwrap();
        assert_eq!(
            document.get_datetime("signup_ts").unwrap().timestamp_millis(),
            signup_ts.timestamp_millis()
        );

        let decoded: User = mongodb::bson::from_document(document).unwrap();
        assert_eq!(decoded.signup_ts, Some(signup_ts));
    }

    #[test]
    fn test_full_name_too_long() {
        let errors = CreateUser::new("alice01", "a@example.com")
            .with_full_name("x".repeat(101))
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("full_name"));
    }

    #[test]
    fn test_invalid_roles_are_listed_once() {
        let errors = CreateUser::new("alice01", "a@example.com")
            .with_roles(["admin", "root", "guest", "root"])
            .validate()
            .unwrap_err();
        assert_eq!(
            field_messages(&errors, "roles"),
            vec!["Invalid roles: root, guest. Must be one of: admin, user, editor, viewer"]
        );
    }

    #[test]
    fn test_anonymous_requires_full_name() {
        let errors = CreateUser::new("anonymous", "anon@example.com")
            .validate()
            .unwrap_err();
        assert_eq!(
            field_messages(&errors, CROSS_FIELD_KEY),
            vec!["Either full_name or a non-anonymous username must be provided"]
        );

        assert!(
            CreateUser::new("anonymous", "anon@example.com")
                .with_full_name("Anon Ymous")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_all_violations_are_collected() {
        let errors = CreateUser::new("x", "nope")
            .with_roles(["superuser"])
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("roles"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("Editor".parse::<Role>().is_err());
        assert_eq!(Role::allowed(), "admin, user, editor, viewer");
    }

    #[test]
    fn test_projection_drops_internal_fields() {
        let id = ObjectId::new();
        let user = User::from_input(
            id,
            CreateUser::new("alice01", "alice@example.com").with_full_name("Alice"),
        );
        let value = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert_eq!(value["id"], json!(id.to_hex()));
        assert_eq!(value["full_name"], json!("Alice"));
        assert!(value.get("is_active").is_none());
        assert!(value.get("signup_ts").is_none());
    }
}

//! Request and response shapes.
//!
//! Type-level problems (missing field, wrong JSON type, unknown enum value,
//! unknown field) are caught while deserializing. Content rules run in
//! `into_fields`/`into_update`/`into_filters` and report every failing
//! field at once.

use crate::error::{IssueTrackerError, Result, ValidationError};
use crate::model::{Issue, IssueFields, Priority, Status};
use crate::storage::{IssueUpdate, ListFilters};
use crate::util::time::serialize_timestamp;
use crate::validation::{
    IssueValidator, check_assignee, check_description, check_reporter, check_title,
    normalize_optional_text,
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::{IntErrorKind, ParseIntError};

/// Body of `POST /issues` and `PUT /issues/{id}`.
///
/// On PUT, omitted optional fields reset to their defaults.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IssueCreate {
    /// Short summary, 1-200 characters.
    pub title: String,
    /// Free-form details, at most 100KB.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    /// Who reported the issue, 1-100 characters.
    pub reporter: String,
    /// Who is working on it, at most 100 characters.
    #[serde(default)]
    pub assignee: Option<String>,
}

impl IssueCreate {
    /// Normalize and validate into storable fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming every failing field.
    pub fn into_fields(self) -> Result<IssueFields> {
        let fields = IssueFields {
            title: self.title,
            description: normalize_optional_text(self.description),
            status: self.status,
            priority: self.priority,
            reporter: self.reporter,
            assignee: normalize_optional_text(self.assignee),
        };
        IssueValidator::validate(&fields).map_err(IssueTrackerError::from_validation_errors)?;
        Ok(fields)
    }
}

/// One field of a partial update: absent, explicit `null`, or a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key is present; `#[serde(default)]` covers absence
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent | Self::Null => serializer.serialize_none(),
            Self::Value(value) => serializer.serialize_some(value),
        }
    }
}

impl<T: JsonSchema> JsonSchema for Patch<T> {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        format!("Nullable_{}", T::schema_name())
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        <Option<T>>::json_schema(generator)
    }
}

/// Body of `PATCH /issues/{id}`. Every field is optional.
///
/// `null` clears `description` or `assignee`; it is rejected on fields that
/// cannot be empty.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IssuePatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub status: Patch<Status>,
    #[serde(default)]
    pub priority: Patch<Priority>,
    #[serde(default)]
    pub reporter: Patch<String>,
    #[serde(default)]
    pub assignee: Patch<String>,
}

impl IssuePatch {
    /// Validate into a storage update.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming every failing field.
    pub fn into_update(self) -> Result<IssueUpdate> {
        let mut errors = Vec::new();

        let title = required(self.title, "title", |v: &String| check_title(v), &mut errors);
        let reporter = required(
            self.reporter,
            "reporter",
            |v: &String| check_reporter(v),
            &mut errors,
        );
        let status = required(self.status, "status", |_| None, &mut errors);
        let priority = required(self.priority, "priority", |_| None, &mut errors);
        let description = clearable(self.description, check_description, &mut errors);
        let assignee = clearable(self.assignee, check_assignee, &mut errors);

        if !errors.is_empty() {
            return Err(IssueTrackerError::from_validation_errors(errors));
        }

        Ok(IssueUpdate {
            title,
            description,
            status,
            priority,
            reporter,
            assignee,
        })
    }
}

fn required<T>(
    patch: Patch<T>,
    field: &str,
    check: impl Fn(&T) -> Option<ValidationError>,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    match patch {
        Patch::Absent => None,
        Patch::Null => {
            errors.push(ValidationError::new(field, "cannot be null"));
            None
        }
        Patch::Value(value) => match check(&value) {
            Some(err) => {
                errors.push(err);
                None
            }
            None => Some(value),
        },
    }
}

fn clearable(
    patch: Patch<String>,
    check: impl Fn(&str) -> Option<ValidationError>,
    errors: &mut Vec<ValidationError>,
) -> Option<Option<String>> {
    match patch {
        Patch::Absent => None,
        Patch::Null => Some(None),
        Patch::Value(value) => {
            if let Some(err) = check(&value) {
                errors.push(err);
                return None;
            }
            Some(normalize_optional_text(Some(value)))
        }
    }
}

/// The issue as returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IssueResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub reporter: String,
    pub assignee: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            status: issue.status,
            priority: issue.priority,
            reporter: issue.reporter,
            assignee: issue.assignee,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Raw `GET /issues` query string. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    /// Rows to skip, at least 0. Defaults to 0.
    pub skip: Option<String>,
    /// Page size, 1 to the configured maximum.
    pub limit: Option<String>,
}

/// Paging bounds applied to list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 100,
        }
    }
}

impl ListQuery {
    /// Parse a raw query string. Unknown parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the query string is malformed.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        serde_urlencoded::from_str(raw.unwrap_or_default())
            .map_err(|e| IssueTrackerError::validation("query", e.to_string()))
    }

    /// Validate into storage filters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus`/`InvalidPriority` when that is the only
    /// problem, otherwise a validation error naming every failing parameter.
    pub fn into_filters(self, limits: ListLimits) -> Result<ListFilters> {
        let mut errors: Vec<IssueTrackerError> = Vec::new();

        let status = non_empty(self.status).and_then(|raw| {
            raw.parse::<Status>().map_err(|e| errors.push(e)).ok()
        });
        let priority = non_empty(self.priority).and_then(|raw| {
            raw.parse::<Priority>().map_err(|e| errors.push(e)).ok()
        });
        let assignee = non_empty(self.assignee);

        let skip = match non_empty(self.skip) {
            None => 0,
            Some(raw) => bounded("skip", &raw, 0, None)
                .map_err(|e| errors.push(e))
                .unwrap_or(0),
        };
        let limit = match non_empty(self.limit) {
            None => limits.default_limit,
            Some(raw) => bounded("limit", &raw, 1, Some(limits.max_limit))
                .map_err(|e| errors.push(e))
                .unwrap_or(limits.default_limit),
        };

        if errors.len() == 1 {
            return Err(errors.remove(0));
        }
        if !errors.is_empty() {
            let detail = errors.iter().flat_map(IssueTrackerError::field_errors).collect();
            return Err(IssueTrackerError::ValidationErrors { errors: detail });
        }

        Ok(ListFilters {
            status,
            priority,
            assignee,
            skip,
            limit: Some(limit),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn bounded(field: &str, raw: &str, min: i64, max: Option<usize>) -> Result<usize> {
    let value: i64 = raw.trim().parse().map_err(|e: ParseIntError| {
        let reason = match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "is out of range",
            _ => "must be an integer",
        };
        IssueTrackerError::validation(field, reason)
    })?;
    if value < min {
        return Err(IssueTrackerError::validation(
            field,
            format!("must be greater than or equal to {min}"),
        ));
    }
    let value = usize::try_from(value)
        .map_err(|_| IssueTrackerError::validation(field, "is out of range"))?;
    match max {
        Some(max) if value > max => Err(IssueTrackerError::validation(
            field,
            format!("must be less than or equal to {max}"),
        )),
        _ => Ok(value),
    }
}

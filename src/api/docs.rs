//! `OpenAPI` document and the interactive documentation pages.
//!
//! Component schemas are generated from the request/response types with
//! `schemars`; paths are described by hand. `/docs` and `/redoc` load their
//! viewers from a CDN and point them at `/openapi.json`.

use crate::api::schemas::{IssueCreate, IssuePatch, IssueResponse};
use axum::Json;
use axum::response::Html;
use schemars::r#gen::SchemaSettings;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

pub const API_TITLE: &str = "Issue Tracker API";
const API_DESCRIPTION: &str = "A simple REST API for tracking and managing issues";
const SPEC_URL: &str = "/openapi.json";

static OPENAPI: LazyLock<Value> = LazyLock::new(build_openapi);

/// The `OpenAPI` 3.0 document served at `/openapi.json`.
#[must_use]
pub fn openapi_document() -> &'static Value {
    &OPENAPI
}

#[allow(clippy::too_many_lines)]
fn build_openapi() -> Value {
    let mut generator = SchemaSettings::openapi3().into_generator();
    generator.subschema_for::<IssueCreate>();
    generator.subschema_for::<IssuePatch>();
    generator.subschema_for::<IssueResponse>();

    let mut schemas: Map<String, Value> = generator
        .take_definitions()
        .into_iter()
        .map(|(name, schema)| (name, serde_json::to_value(schema).unwrap_or(Value::Null)))
        .collect();
    schemas.insert("ErrorResponse".to_string(), error_schema());

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": API_TITLE,
            "description": API_DESCRIPTION,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/issues": {
                "get": {
                    "tags": ["Issues"],
                    "summary": "List issues",
                    "operationId": "list_issues",
                    "parameters": [
                        query_param("status", "Filter by status", json!({"$ref": "#/components/schemas/Status"})),
                        query_param("priority", "Filter by priority", json!({"$ref": "#/components/schemas/Priority"})),
                        query_param("assignee", "Filter by exact assignee", json!({"type": "string"})),
                        query_param("skip", "Rows to skip", json!({"type": "integer", "minimum": 0, "default": 0})),
                        query_param("limit", "Page size", json!({"type": "integer", "minimum": 1, "default": 100})),
                    ],
                    "responses": {
                        "200": {
                            "description": "Matching issues in id order",
                            "headers": {
                                "X-Total-Count": {
                                    "description": "Rows matching the filters before paging",
                                    "schema": {"type": "integer"},
                                }
                            },
                            "content": json_content(json!({
                                "type": "array",
                                "items": {"$ref": "#/components/schemas/IssueResponse"},
                            })),
                        },
                        "422": error_response("Invalid query parameter"),
                    },
                },
                "post": {
                    "tags": ["Issues"],
                    "summary": "Create an issue",
                    "operationId": "create_issue",
                    "requestBody": request_body("IssueCreate"),
                    "responses": {
                        "201": issue_response("Issue created"),
                        "422": error_response("Validation failed"),
                    },
                },
            },
            "/issues/{id}": {
                "parameters": [{
                    "name": "id",
                    "in": "path",
                    "required": true,
                    "schema": {"type": "integer", "format": "int64", "minimum": 1},
                }],
                "get": {
                    "tags": ["Issues"],
                    "summary": "Get an issue",
                    "operationId": "get_issue",
                    "responses": {
                        "200": issue_response("The issue"),
                        "404": error_response("Issue not found"),
                        "422": error_response("Invalid id"),
                    },
                },
                "put": {
                    "tags": ["Issues"],
                    "summary": "Replace an issue",
                    "description": "Omitted optional fields reset to their defaults.",
                    "operationId": "replace_issue",
                    "requestBody": request_body("IssueCreate"),
                    "responses": {
                        "200": issue_response("Issue replaced"),
                        "404": error_response("Issue not found"),
                        "422": error_response("Validation failed"),
                    },
                },
                "patch": {
                    "tags": ["Issues"],
                    "summary": "Partially update an issue",
                    "description": "Only fields present in the body change. null clears description or assignee.",
                    "operationId": "patch_issue",
                    "requestBody": request_body("IssuePatch"),
                    "responses": {
                        "200": issue_response("Issue updated"),
                        "404": error_response("Issue not found"),
                        "422": error_response("Validation failed"),
                    },
                },
                "delete": {
                    "tags": ["Issues"],
                    "summary": "Delete an issue",
                    "operationId": "delete_issue",
                    "responses": {
                        "204": {"description": "Issue deleted"},
                        "404": error_response("Issue not found"),
                        "422": error_response("Invalid id"),
                    },
                },
            },
            "/health": {
                "get": {
                    "tags": ["Health"],
                    "summary": "Health check",
                    "operationId": "health",
                    "responses": {
                        "200": {
                            "description": "Database reachable",
                            "content": json_content(json!({
                                "type": "object",
                                "properties": {"status": {"type": "string", "example": "healthy"}},
                            })),
                        },
                        "503": error_response("Database unreachable"),
                    },
                },
            },
        },
        "components": {"schemas": schemas},
    })
}

fn json_content(schema: Value) -> Value {
    json!({"application/json": {"schema": schema}})
}

fn schema_ref(name: &str) -> Value {
    json!({"$ref": format!("#/components/schemas/{name}")})
}

fn request_body(schema: &str) -> Value {
    json!({"required": true, "content": json_content(schema_ref(schema))})
}

fn issue_response(description: &str) -> Value {
    json!({"description": description, "content": json_content(schema_ref("IssueResponse"))})
}

fn error_response(description: &str) -> Value {
    json!({"description": description, "content": json_content(schema_ref("ErrorResponse"))})
}

fn query_param(name: &str, description: &str, schema: Value) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": schema,
    })
}

fn error_schema() -> Value {
    json!({
        "type": "object",
        "required": ["error"],
        "properties": {
            "error": {
                "type": "object",
                "required": ["code", "message", "retryable"],
                "properties": {
                    "code": {"type": "string", "example": "VALIDATION_FAILED"},
                    "message": {"type": "string"},
                    "hint": {"type": "string", "nullable": true},
                    "retryable": {"type": "boolean"},
                    "context": {"type": "object", "nullable": true},
                },
            },
        },
    })
}

pub async fn openapi_json() -> Json<&'static Value> {
    Json(openapi_document())
}

pub async fn swagger_ui() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{API_TITLE} - Swagger UI</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "{SPEC_URL}", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>
"##
    ))
}

pub async fn redoc() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{API_TITLE} - ReDoc</title>
</head>
<body>
  <redoc spec-url="{SPEC_URL}"></redoc>
  <script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>
"##
    ))
}

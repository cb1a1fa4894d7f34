#![allow(dead_code)]

use issue_tracker::model::{IssueFields, Priority, Status};
use serde_json::{Value, json};

pub const REPORTER: &str = "reporter@example.com";

/// Minimal valid fields for a new issue.
pub fn fields(title: &str) -> IssueFields {
    IssueFields::new(title, REPORTER)
}

/// Minimal valid create body.
pub fn create_body(title: &str) -> Value {
    json!({"title": title, "reporter": REPORTER})
}

pub struct IssueBuilder {
    fields: IssueFields,
}

impl IssueBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            fields: fields(title),
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn with_status(mut self, s: Status) -> Self {
        self.fields.status = s;
        self
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn with_priority(mut self, p: Priority) -> Self {
        self.fields.priority = p;
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.fields.assignee = Some(assignee.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.fields.description = Some(description.to_string());
        self
    }

    pub fn with_reporter(mut self, reporter: &str) -> Self {
        self.fields.reporter = reporter.to_string();
        self
    }

    pub fn build(self) -> IssueFields {
        self.fields
    }

    /// The same issue as a JSON create body.
    pub fn json(self) -> Value {
        let f = self.fields;
        json!({
            "title": f.title,
            "description": f.description,
            "status": f.status,
            "priority": f.priority,
            "reporter": f.reporter,
            "assignee": f.assignee,
        })
    }
}

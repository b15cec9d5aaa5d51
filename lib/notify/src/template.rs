//! Message templates keyed by destination state.
//!
//! Templates use `{name}` placeholders: `content_type`, `content_id`,
//! `from_state`, `to_state`, `actor` and `comment`. Unknown placeholders are
//! left as written. Substitution is single-pass, so placeholder-like text
//! inside a substituted value is never expanded again.

use crate::event::TransitionEvent;
use folio_core::StateId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A subject/body pair with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Subject line template.
    pub subject: String,
    /// Body template.
    pub body: String,
}

impl Template {
    /// Creates a template.
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Renders the template against an event.
    #[must_use]
    pub fn render(&self, event: &TransitionEvent) -> RenderedMessage {
        RenderedMessage {
            subject: substitute(&self.subject, event),
            body: substitute(&self.body, event),
        }
    }
}

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// Per-state templates with built-in defaults.
///
/// Lookup order: configured override for the state, built-in default for
/// the state, generic fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    overrides: HashMap<StateId, Template>,
}

impl TemplateSet {
    /// Creates a set with only the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the template for a state.
    #[must_use]
    pub fn with_template(mut self, state: impl Into<StateId>, template: Template) -> Self {
        self.overrides.insert(state.into(), template);
        self
    }

    /// Returns the template used for a destination state.
    #[must_use]
    pub fn template_for(&self, state: &StateId) -> Template {
        self.overrides
            .get(state)
            .cloned()
            .or_else(|| builtin(state.as_str()))
            .unwrap_or_else(fallback)
    }

    /// Renders the message for an event.
    #[must_use]
    pub fn render(&self, event: &TransitionEvent) -> RenderedMessage {
        self.template_for(&event.to_state).render(event)
    }

    /// Iterates the states with a configured override.
    pub fn overridden_states(&self) -> impl Iterator<Item = &StateId> {
        self.overrides.keys()
    }
}

fn builtin(state: &str) -> Option<Template> {
    let template = match state {
        "review" => Template::new(
            "Review requested: {content_type} {content_id}",
            "{actor} submitted {content_type} {content_id} for review.\n\n{comment}",
        ),
        "approved" => Template::new(
            "Approved: {content_type} {content_id}",
            "{actor} approved {content_type} {content_id}. It can now be published.\n\n{comment}",
        ),
        "published" => Template::new(
            "Published: {content_type} {content_id}",
            "{actor} published {content_type} {content_id}.\n\n{comment}",
        ),
        "rejected" => Template::new(
            "Changes requested: {content_type} {content_id}",
            "{actor} sent {content_type} {content_id} back from {from_state}.\n\n{comment}",
        ),
        "archived" => Template::new(
            "Archived: {content_type} {content_id}",
            "{actor} archived {content_type} {content_id}.\n\n{comment}",
        ),
        _ => return None,
    };
    Some(template)
}

fn fallback() -> Template {
    Template::new(
        "{content_type} {content_id} moved to {to_state}",
        "{actor} moved {content_type} {content_id} from {from_state} to {to_state}.\n\n{comment}",
    )
}

fn placeholder<'a>(name: &str, event: &'a TransitionEvent) -> Option<&'a str> {
    let value = match name {
        "content_type" => event.content.content_type.as_str(),
        "content_id" => event.content.content_id.as_str(),
        "from_state" => event.from_state.as_str(),
        "to_state" => event.to_state.as_str(),
        "actor" => event.actor_id.as_str(),
        "comment" => event.comment.as_deref().unwrap_or_default(),
        _ => return None,
    };
    Some(value)
}

fn substitute(template: &str, event: &TransitionEvent) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match placeholder(name, event) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    // Templates end with "\n\n{comment}"; drop the gap when there is none.
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

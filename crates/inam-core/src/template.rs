use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

use crate::recipients::RecipientEntry;

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid {name} template: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error("failed to execute {name} template: {source}")]
    Render {
        name: &'static str,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Fields a template can reference: `{{owner}}`, `{{ccUsers}}`, `{{projects}}`,
/// `{{insertHere}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext<'a> {
    pub owner: &'a str,
    pub cc_users: &'a [String],
    pub projects: &'a [String],
    pub insert_here: Option<&'a serde_yaml::Value>,
}

impl<'a> From<&'a RecipientEntry> for TemplateContext<'a> {
    fn from(entry: &'a RecipientEntry) -> Self {
        Self {
            owner: &entry.owner,
            cc_users: &entry.cc_users,
            projects: &entry.projects,
            insert_here: entry.insert_here.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTask {
    pub title: String,
    pub description: String,
}

/// Handlebars with escaping disabled and no helpers registered.
pub struct TaskTemplates {
    registry: Handlebars<'static>,
}

impl TaskTemplates {
    pub fn compile(title: &str, description: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TITLE, title)
            .map_err(|err| TemplateError::Parse {
                name: TITLE,
                source: Box::new(err),
            })?;
        registry
            .register_template_string(DESCRIPTION, description)
            .map_err(|err| TemplateError::Parse {
                name: DESCRIPTION,
                source: Box::new(err),
            })?;
        Ok(Self { registry })
    }

    pub fn render(&self, context: &TemplateContext<'_>) -> Result<RenderedTask, TemplateError> {
        Ok(RenderedTask {
            title: self.render_one(TITLE, context)?,
            description: self.render_one(DESCRIPTION, context)?,
        })
    }

    fn render_one(
        &self,
        name: &'static str,
        context: &TemplateContext<'_>,
    ) -> Result<String, TemplateError> {
        self.registry
            .render(name, context)
            .map_err(|err| TemplateError::Render {
                name,
                source: Box::new(err),
            })
    }
}

//! Template engine based on MiniJinja

use minijinja::{Environment, UndefinedBehavior};
use tidemark_core::{LoadedProject, RenderContext, RenderedManifest, Values};

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;
use crate::predicate::Predicate;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
}

impl Engine {
    /// Create a new engine with default settings
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn create_environment(&self) -> Environment<'static> {
        let undefined = if self.strict_mode {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        };
        environment(undefined)
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        context: &RenderContext,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        tmpl.render(context)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template).into())
    }

    /// Build the render context for a project.
    ///
    /// Merge order: project base values, then every `conditionalValues` entry
    /// whose predicate matches the context built so far, then `overlays`
    /// (values files and `--set`) in order.
    pub fn build_context(
        &self,
        project: &LoadedProject,
        context_name: &str,
        overlays: &[Values],
    ) -> Result<RenderContext> {
        let mut values = project.base_values()?;
        let mut context = RenderContext::new(&project.project, context_name, values.clone());

        for conditional in &project.project.conditional_values {
            let predicate = Predicate::parse(&conditional.on)?;
            let context_value = serde_json::to_value(&context)
                .map_err(|e| EngineError::Template(TemplateError::simple(e.to_string())))?;

            if predicate.matches_value(&context_value)? {
                tracing::debug!(on = %conditional.on, "conditional values apply");
                values.merge(&conditional.values());
                context = context.with_values(values.clone());
            }
        }

        for overlay in overlays {
            values.merge(overlay);
        }

        Ok(context.with_values(values))
    }

    /// Load every template of a project and return a lazy renderer.
    ///
    /// Templates are rendered one per `next()` call, in file-name order.
    /// Files whose name starts with `_` are loaded as helpers but not rendered.
    pub fn render_project(&self, project: &LoadedProject, context: &RenderContext) -> Result<ProjectRender> {
        let template_files = project.template_files()?;
        let mut env = self.create_environment();
        let mut pending = Vec::new();

        for file_path in &template_files {
            let rel_path = file_path
                .strip_prefix(&project.templates_dir)
                .unwrap_or(file_path);
            let template_name = rel_path.to_string_lossy().to_string();
            let content = std::fs::read_to_string(file_path)?;

            env.add_template_owned(template_name.clone(), content.clone())
                .map_err(|e| TemplateError::from_minijinja(e, &template_name, &content))?;

            let is_helper = rel_path
                .file_name()
                .map(|s| s.to_string_lossy().starts_with('_'))
                .unwrap_or(false);

            if !is_helper {
                pending.push((template_name, content));
            }
        }

        Ok(ProjectRender {
            env,
            context: minijinja::Value::from_serialize(context),
            pending: pending.into_iter(),
        })
    }
}

/// Lazy, finite sequence of rendered manifests
pub struct ProjectRender {
    env: Environment<'static>,
    context: minijinja::Value,
    pending: std::vec::IntoIter<(String, String)>,
}

impl Iterator for ProjectRender {
    type Item = Result<RenderedManifest>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (template_name, content) = self.pending.next()?;

            let rendered = self
                .env
                .get_template(&template_name)
                .and_then(|tmpl| tmpl.render(&self.context));

            let rendered = match rendered {
                Ok(rendered) => rendered,
                Err(e) => {
                    // Stop after the first failure
                    self.pending = Vec::new().into_iter();
                    return Some(Err(
                        TemplateError::from_minijinja(e, &template_name, &content).into()
                    ));
                }
            };

            let trimmed = rendered.trim();
            if trimmed.is_empty() || trimmed == "---" {
                tracing::debug!(template = %template_name, "template rendered empty");
                continue;
            }

            let source = template_name.trim_end_matches(".j2").to_string();
            return Some(Ok(RenderedManifest::new(source, rendered)));
        }
    }
}

/// Environment with all Tidemark filters and functions registered
pub(crate) fn environment(undefined: UndefinedBehavior) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(undefined);

    env.add_filter("toyaml", filters::toyaml);
    env.add_filter("tojson", filters::tojson);
    env.add_filter("b64encode", filters::b64encode);
    env.add_filter("b64decode", filters::b64decode);
    env.add_filter("quote", filters::quote);
    env.add_filter("nindent", filters::nindent);
    env.add_filter("indent", filters::indent);
    env.add_filter("required", filters::required);
    env.add_filter("empty", filters::empty);
    env.add_filter("sha256", filters::sha256sum);

    env.add_function("fail", functions::fail);
    env.add_function("optional", functions::optional);
    env.add_function("default", functions::default);
    env.add_function("contains", functions::contains);
    env.add_function("empty", functions::empty);
    env.add_function("isNotEmpty", functions::is_not_empty);

    env
}

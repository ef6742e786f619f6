//! MiniJinja-backed engine.
//!
//! Each template is parsed once into its own environment. Includes go through
//! the `include(name, **vars)` function instead of minijinja's loader, so the
//! included unit always comes from the snapshot the render is bound to:
//!
//! ```jinja
//! {% set body %}Hi {{ model.name }}{% endset %}
//! {{ include("layout.html", content=body) }}
//! ```
//!
//! The included template sees `model` plus the keyword arguments; passing
//! `model=...` replaces the model for that template and everything it
//! includes in turn.
//!
//! `include` is registered once per compiled template. The snapshot and the
//! nesting depth travel with the render context as an [`IncludeScope`], so
//! rendering never touches the environment.

use std::collections::BTreeMap;

use minijinja::value::{Kwargs, Object};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, State, UndefinedBehavior, Value};

use super::{EngineError, Model, TemplateEngine};
use crate::resolve::IncludeResolver;
use crate::store::TemplateName;

const SCOPE_VAR: &str = "__include_scope";

/// Engine behaviour switches.
#[derive(Debug, Clone)]
pub struct JinjaOptions {
    /// Undefined variables raise errors instead of rendering empty.
    pub strict: bool,
    /// Maximum nesting of `include(...)` calls.
    pub max_include_depth: usize,
}

impl Default for JinjaOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_include_depth: 32,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JinjaEngine {
    options: JinjaOptions,
}

/// One parsed template.
pub struct JinjaTemplate {
    name: TemplateName,
    env: Environment<'static>,
}

impl JinjaTemplate {
    pub fn name(&self) -> &TemplateName {
        &self.name
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Render-scoped state read back by `include`.
#[derive(Debug)]
struct IncludeScope {
    engine: JinjaEngine,
    includes: IncludeResolver<JinjaTemplate>,
    depth: usize,
}

impl Object for IncludeScope {}

impl JinjaEngine {
    pub fn new(options: JinjaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &JinjaOptions {
        &self.options
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        // Models are rendered verbatim, markup escaping is the template's job
        env.set_auto_escape_callback(|_| AutoEscape::None);
        if self.options.strict {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        env.add_function("include", include);
        env
    }

    /// Render `template` with `ctx`; `depth` counts enclosing includes.
    fn render_at(
        &self,
        template: &JinjaTemplate,
        mut ctx: BTreeMap<String, Value>,
        includes: &IncludeResolver<JinjaTemplate>,
        depth: usize,
    ) -> Result<String, Error> {
        ctx.insert(
            SCOPE_VAR.to_string(),
            Value::from_object(IncludeScope {
                engine: self.clone(),
                includes: includes.clone(),
                depth,
            }),
        );
        template
            .env
            .get_template(template.name.as_str())?
            .render(Value::from_serialize(&ctx))
    }
}

/// `include(name, **vars)` as seen by templates.
fn include(state: &State, name: String, kwargs: Kwargs) -> Result<Value, Error> {
    let scope = state.lookup(SCOPE_VAR);
    let Some(scope) = scope.as_ref().and_then(|v| v.downcast_object_ref::<IncludeScope>()) else {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "include is only available inside a cached render",
        ));
    };

    let depth = scope.depth + 1;
    let max_depth = scope.engine.options.max_include_depth;
    if depth > max_depth {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("include depth limit of {max_depth} exceeded at `{name}`"),
        ));
    }

    let Some(target) = scope.includes.resolve(&name) else {
        return Err(Error::new(
            ErrorKind::TemplateNotFound,
            format!("included template `{name}` not found"),
        ));
    };

    // The model in effect here, including any override from an outer include
    let mut ctx = BTreeMap::new();
    ctx.insert("model".to_string(), state.lookup("model").unwrap_or_default());
    let keys: Vec<String> = kwargs.args().map(str::to_string).collect();
    for key in keys {
        let value: Value = kwargs.get(&key)?;
        ctx.insert(key, value);
    }

    let out = scope.engine.render_at(target, ctx, &scope.includes, depth)?;
    Ok(Value::from_safe_string(out))
}

impl TemplateEngine for JinjaEngine {
    type Compiled = JinjaTemplate;

    fn compile(&self, name: &TemplateName, source: String) -> Result<JinjaTemplate, EngineError> {
        let mut env = self.environment();
        env.add_template_owned(name.as_str().to_string(), source)
            .map_err(EngineError::new)?;
        Ok(JinjaTemplate {
            name: name.clone(),
            env,
        })
    }

    fn render(
        &self,
        template: &JinjaTemplate,
        model: &Model,
        includes: &IncludeResolver<JinjaTemplate>,
    ) -> Result<String, EngineError> {
        let mut ctx = BTreeMap::new();
        ctx.insert("model".to_string(), Value::from_serialize(model));
        self.render_at(template, ctx, includes, 0)
            .map_err(EngineError::new)
    }
}

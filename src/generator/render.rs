//! Template rendering on top of a [`Generator`].

use std::path::Path;

use tera::Context;

use super::{Generator, State, Templates};
use crate::{
    debug,
    error::{Error, Result},
    node::Node,
};

/// Implicit parameter: the logical template name.
const NAME: &str = "name";
/// Implicit parameter: the template's source file.
const FILENAME: &str = "filename";

/// Renders templates for every item of a collection into a staging area.
pub struct RenderingEngine<'a, I> {
    generator: Generator<'a, I>,
    templates: &'a Templates,
    template: Option<String>,
}

impl<'a, I: Copy> RenderingEngine<'a, I> {
    pub(crate) fn new(generator: Generator<'a, I>, templates: &'a Templates) -> Self {
        debug!(
            generator.session().verbose(), "render";
            "template search path: {:?}", templates.search_path()
        );
        Self {
            generator,
            templates,
            template: None,
        }
    }

    pub fn node(&self) -> &Node {
        self.generator.node()
    }

    pub fn state(&self) -> &State {
        self.generator.state()
    }

    pub fn staging_dir(&self) -> &Path {
        self.generator.staging_dir()
    }

    /// Bind the template used by [`render_all`](Self::render_all).
    pub fn with_template(mut self, name: &str) -> Result<Self> {
        if !self.templates.contains(name) {
            return Err(Error::Template(tera::Error::template_not_found(name)));
        }
        self.template = Some(name.to_owned());
        Ok(self)
    }

    /// Render the bound template once per item.
    ///
    /// `name_fn` gives the output name, `args_fn` the template parameters.
    pub fn render_all<N, A>(&mut self, mut name_fn: N, mut args_fn: A) -> Result<&mut Self>
    where
        N: FnMut(I) -> String,
        A: FnMut(I) -> Result<Context>,
    {
        let template = self
            .template
            .clone()
            .ok_or_else(|| Error::Template(tera::Error::msg("no template bound")))?;

        for i in 0..self.generator.items().len() {
            let item = self.generator.items()[i];
            let name = name_fn(item);
            let args = args_fn(item)?;
            let html = self.render(&template, &args)?;
            self.generator.stage(&name, html.as_bytes())?;
        }
        Ok(self)
    }

    /// Render `template` with `args`.
    pub fn render(&self, template: &str, args: &Context) -> Result<String> {
        self.templates.render(template, args)
    }

    /// Commit the staging area into `dest`.
    pub fn copy_to(&mut self, dest: &Path) -> Result<&mut Self> {
        self.generator.copy_to(dest)?;
        Ok(self)
    }
}

impl<'a, I> RenderingEngine<'a, I>
where
    I: Copy + AsRef<str>,
{
    /// Render every item as a template of its own, written under its name.
    ///
    /// Each template also receives `name` and `filename` (its source path),
    /// which `fixed` must not define.
    pub fn render_all_templates(&mut self, fixed: &Context) -> Result<&mut Self> {
        for reserved in [NAME, FILENAME] {
            if fixed.contains_key(reserved) {
                return Err(Error::ReservedParameter(reserved.to_owned()));
            }
        }

        for i in 0..self.generator.items().len() {
            let item = self.generator.items()[i];
            let name = item.as_ref();
            debug!(self.generator.session().verbose(), "render"; "template {name}");

            let mut args = fixed.clone();
            args.insert(NAME, name);
            args.insert(
                FILENAME,
                &self
                    .templates
                    .source_path(name)
                    .map(|p| p.display().to_string()),
            );
            let html = self.render(name, &args)?;
            self.generator.stage(name, html.as_bytes())?;
        }
        Ok(self)
    }
}

impl<I> std::fmt::Debug for RenderingEngine<'_, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingEngine")
            .field("generator", &self.generator)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

//! Template rendering engine
//!
//! Renders a blueprint's template tree into a destination directory. Both the
//! relative output path and (for template files) the file content are
//! Handlebars templates evaluated against one context and one helper catalog.
//!
//! Rendering happens in two phases:
//! 1. Read the whole tree and register every template in one [`TemplateSet`],
//!    so templates may include each other as partials
//! 2. Render each file in enumeration order and write it under the destination
//!
//! A failure part-way through leaves earlier files on disk and is reported as a
//! [`RenderFailure`] listing them.

pub mod helpers;
pub mod namespace;
pub mod tree;

use crate::cancel::CancelToken;
use crate::error::{Error, RenderFailure, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub use helpers::{HELPER_CATALOG, HELPER_CATALOG_VERSION};
pub use namespace::TemplateSet;
pub use tree::TreeFile;

/// Reserved suffix marking template sources; stripped from output paths
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Which files have their content rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentPolicy {
    /// Only files carrying the template suffix are rendered; everything else is copied byte for byte
    #[default]
    SuffixOnly,
    /// Every file is rendered; non-UTF-8 files fail
    All,
}

/// Options for a render run
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub content_policy: ContentPolicy,
    /// Fail on context keys missing from the context instead of rendering them empty
    pub strict: bool,
    pub template_suffix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            content_policy: ContentPolicy::SuffixOnly,
            strict: true,
            template_suffix: TEMPLATE_SUFFIX.to_string(),
        }
    }
}

impl RenderOptions {
    fn is_template(&self, rel: &str) -> bool {
        match self.content_policy {
            ContentPolicy::All => true,
            ContentPolicy::SuffixOnly => self.has_suffix(rel),
        }
    }

    fn has_suffix(&self, rel: &str) -> bool {
        !self.template_suffix.is_empty() && rel.ends_with(&self.template_suffix)
    }

    fn strip_suffix<'a>(&self, rel: &'a str) -> &'a str {
        if self.has_suffix(rel) {
            &rel[..rel.len() - self.template_suffix.len()]
        } else {
            rel
        }
    }
}

/// A file produced by a render run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Source-relative template path
    pub source: String,
    /// Destination path that was written
    pub output: PathBuf,
    /// Whether the content was rendered (false for verbatim copies)
    pub templated: bool,
}

/// Non-fatal issues noticed while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// A verbatim-copied file contains `{{`; it may be a template missing its suffix
    VerbatimTemplateSyntax {
        source: String,
        /// Whether the content would parse as a template
        parses: bool,
    },
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderWarning::VerbatimTemplateSyntax { source, parses: true } => write!(
                f,
                "{} contains template syntax but was copied verbatim (missing suffix?)",
                source
            ),
            RenderWarning::VerbatimTemplateSyntax { source, parses: false } => write!(
                f,
                "{} contains '{{{{' but is not a valid template; copied verbatim",
                source
            ),
        }
    }
}

/// Summary of a successful render run
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub files: Vec<RenderedFile>,
    pub warnings: Vec<RenderWarning>,
}

impl RenderReport {
    /// Destination paths in the order they were written
    pub fn written(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.output.clone()).collect()
    }
}

/// Render every file under `src` into `dst` with default options
pub async fn render_dir(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    ctx: &Value,
) -> Result<RenderReport, RenderFailure> {
    Renderer::new(RenderOptions::default())
        .render_dir(src.as_ref(), dst.as_ref(), ctx)
        .await
}

/// Configured rendering engine
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
    cancel: CancelToken,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the tree at `src` into `dst`
    ///
    /// Never modifies `src` and never deletes anything under `dst`; existing
    /// files at rendered paths are overwritten.
    pub async fn render_dir(
        &self,
        src: &Path,
        dst: &Path,
        ctx: &Value,
    ) -> Result<RenderReport, RenderFailure> {
        let fail = |file: &Path, written: &[RenderedFile], source: Error| RenderFailure {
            file: file.to_path_buf(),
            written: written.iter().map(|f| f.output.clone()).collect(),
            source,
        };

        let tree = tree::read(src, &self.cancel).await.map_err(|e| {
            let file = match &e {
                Error::Io { path, .. } => match path.strip_prefix(src) {
                    Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                    _ => path.clone(),
                },
                _ => src.to_path_buf(),
            };
            fail(&file, &[], e)
        })?;
        debug!(src = %src.display(), files = tree.len(), "read template tree");

        let set = self
            .parse_all(&tree)
            .map_err(|(rel, e)| fail(Path::new(&rel), &[], e))?;

        let mut report = RenderReport::default();
        for file in &tree {
            if let Err(e) = self.cancel.check() {
                return Err(fail(Path::new(&file.rel), &report.files, e));
            }
            match self.render_file(&set, file, dst, ctx, &mut report.warnings).await {
                Ok(rendered) => report.files.push(rendered),
                Err(e) => {
                    warn!(file = %file.rel, error = %e, "render failed");
                    return Err(fail(Path::new(&file.rel), &report.files, e));
                }
            }
        }

        info!(
            src = %src.display(),
            dst = %dst.display(),
            files = report.files.len(),
            warnings = report.warnings.len(),
            "rendered template tree"
        );
        Ok(report)
    }

    /// Register every content template and check every path template before anything is rendered
    fn parse_all(&self, tree: &[TreeFile]) -> std::result::Result<TemplateSet, (String, Error)> {
        let mut set = TemplateSet::new(self.options.strict);
        let mut aliases = Vec::new();

        for file in tree {
            let out_rel = self.options.strip_suffix(&file.rel);
            if out_rel.contains("{{") {
                TemplateSet::validate(out_rel).map_err(|e| (file.rel.clone(), e))?;
            }
        }

        for file in tree.iter().filter(|f| self.options.is_template(&f.rel)) {
            let source = utf8(file).map_err(|e| (file.rel.clone(), e))?;
            set.add(&file.rel, source).map_err(|e| (file.rel.clone(), e))?;
            aliases.push((self.options.strip_suffix(&file.rel), source));
        }

        for (alias, source) in aliases {
            if alias.contains("{{") {
                continue;
            }
            set.add_alias(alias, source)
                .map_err(|e| (alias.to_string(), e))?;
        }
        Ok(set)
    }

    async fn render_file(
        &self,
        set: &TemplateSet,
        file: &TreeFile,
        dst: &Path,
        ctx: &Value,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<RenderedFile> {
        let out_rel = self.options.strip_suffix(&file.rel);
        let rendered_rel = set.render_str(&format!("path of {}", file.rel), out_rel, ctx)?;
        let output = dst.join(safe_relative(&file.rel, &rendered_rel)?);

        let templated = self.options.is_template(&file.rel);
        let content = if templated {
            set.render(&file.rel, ctx)?.into_bytes()
        } else {
            if let Some(warning) = verbatim_warning(file) {
                warn!(file = %file.rel, "{}", warning);
                warnings.push(warning);
            }
            file.bytes.clone()
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&output, &content)
            .await
            .map_err(|e| Error::io(&output, e))?;
        debug!(source = %file.rel, output = %output.display(), templated, "wrote file");

        Ok(RenderedFile {
            source: file.rel.clone(),
            output,
            templated,
        })
    }
}

fn utf8(file: &TreeFile) -> Result<&str> {
    std::str::from_utf8(&file.bytes)
        .map_err(|e| Error::format(format!("template {}", file.rel), e))
}

fn verbatim_warning(file: &TreeFile) -> Option<RenderWarning> {
    let text = std::str::from_utf8(&file.bytes).ok()?;
    if !text.contains("{{") {
        return None;
    }
    Some(RenderWarning::VerbatimTemplateSyntax {
        source: file.rel.clone(),
        parses: TemplateSet::validate(text).is_ok(),
    })
}

/// Turn a rendered relative path into one that cannot leave the destination
///
/// Empty and `.` segments are dropped, so a conditional segment that renders
/// to nothing collapses. `..` segments are rejected.
fn safe_relative(source: &str, rendered: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for segment in rendered.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(Error::format(
                    format!("path of {}", source),
                    format!("rendered path '{}' escapes the destination", rendered),
                ))
            }
            s if s.contains(':') && cfg!(windows) => {
                return Err(Error::format(
                    format!("path of {}", source),
                    format!("rendered path '{}' is not relative", rendered),
                ))
            }
            s => out.push(s),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(Error::format(
            format!("path of {}", source),
            format!("rendered path '{}' is empty", rendered),
        ));
    }
    Ok(out)
}

//! Subcommand implementations

use crate::context;
use crate::{ContextArgs, NewArgs, RenderArgs};
use anyhow::{bail, Context, Result};
use blueprint_core::fetch::is_remote;
use blueprint_core::{
    materialize, registry, Blueprint, CancelToken, ContentPolicy, Database, HttpFetcher,
    ProductConfig, RenderFailure, RenderOptions, RenderReport, Renderer, Version,
};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

async fn load_registry<C: ProductConfig>(
    config: &C,
    location: &str,
    cancel: &CancelToken,
) -> Result<Database> {
    let fetcher = HttpFetcher::new(config.user_agent());
    registry::load_with(&fetcher, location, cancel)
        .await
        .with_context(|| format!("Failed to load registry from {}", location))
}

fn select<'a>(db: &'a Database, name: &str, version: Option<&str>) -> Result<&'a Blueprint> {
    let found = match version {
        Some(v) => db.find_version(name, &Version::parse(v)?)?,
        None => registry::find(db, name)?,
    };
    Ok(found)
}

pub async fn list<C: ProductConfig>(config: &C, location: &str, cancel: &CancelToken) -> Result<()> {
    let db = load_registry(config, location, cancel).await?;

    println!(
        "{}",
        format!("{} blueprints ({})", config.display_name(), location)
            .cyan()
            .bold()
    );
    println!();

    if db.blueprints.is_empty() {
        println!("  {}", "No blueprints found".dimmed());
        return Ok(());
    }

    for bp in &db.blueprints {
        print!("  {} {}", bp.name.bold(), bp.version.green());
        if !bp.tags.is_empty() {
            print!(" {}", format!("[{}]", bp.tags.join(", ")).dimmed());
        }
        println!();
        if !bp.description.is_empty() {
            println!("    {}", bp.description);
        }
    }
    Ok(())
}

pub async fn show<C: ProductConfig>(
    config: &C,
    location: &str,
    name: &str,
    version: Option<&str>,
    cancel: &CancelToken,
) -> Result<()> {
    let db = load_registry(config, location, cancel).await?;
    let bp = select(&db, name, version)?;

    let field = |label: &str, value: &str| {
        if !value.is_empty() {
            println!("{:>14} {}", format!("{}:", label).dimmed(), value);
        }
    };
    println!("{}", bp.name.cyan().bold());
    field("version", &bp.version);
    field("description", &bp.description);
    field("repo", &bp.repo);
    field("path", &bp.path);
    field("download_url", &bp.download_url);
    field("tags", &bp.tags.join(", "));
    Ok(())
}

pub async fn new_project<C: ProductConfig>(
    config: &C,
    location: &str,
    args: NewArgs,
    cancel: &CancelToken,
) -> Result<()> {
    let db = load_registry(config, location, cancel).await?;
    let bp = select(&db, &args.name, args.version.as_deref())?;

    let fetcher = HttpFetcher::new(config.user_agent());
    let cache_dir = args.cache_dir.clone().unwrap_or_else(|| config.cache_dir());
    let source = materialize(bp, &cache_dir, &fetcher, cancel)
        .await
        .with_context(|| format!("Failed to fetch blueprint '{}'", bp.name))?;
    debug!(source = %source.display(), "materialized blueprint");

    let mut ctx = context::build(args.context.context.as_deref(), &args.context.set)?;
    if let Some(project) = args.directory.file_name() {
        context::insert_default(&mut ctx, "ProjectName", json!(project.to_string_lossy()));
    }
    context::insert_default(
        &mut ctx,
        "Blueprint",
        json!({ "name": bp.name, "version": bp.version }),
    );

    println!(
        "{} {} {} into {}",
        "Creating".cyan().bold(),
        bp.name.bold(),
        bp.version.green(),
        args.directory.display()
    );
    run_render(&source, &args.directory, &ctx, &args.context, cancel).await
}

pub async fn render(args: RenderArgs, cancel: &CancelToken) -> Result<()> {
    if !args.source.is_dir() {
        bail!("Template directory not found: {}", args.source.display());
    }
    let ctx = context::build(args.context.context.as_deref(), &args.context.set)?;
    run_render(&args.source, &args.directory, &ctx, &args.context, cancel).await
}

fn render_options(args: &ContextArgs) -> RenderOptions {
    RenderOptions {
        content_policy: if args.all {
            ContentPolicy::All
        } else {
            ContentPolicy::SuffixOnly
        },
        strict: !args.lenient,
        ..Default::default()
    }
}

async fn run_render(
    source: &Path,
    destination: &Path,
    ctx: &Value,
    args: &ContextArgs,
    cancel: &CancelToken,
) -> Result<()> {
    let renderer = Renderer::new(render_options(args)).with_cancel(cancel.clone());
    match renderer.render_dir(source, destination, ctx).await {
        Ok(report) => {
            print_report(destination, &report);
            Ok(())
        }
        Err(failure) => {
            print_failure(destination, &failure);
            Err(failure.into())
        }
    }
}

fn print_report(destination: &Path, report: &RenderReport) {
    for file in &report.files {
        let shown = file.output.strip_prefix(destination).unwrap_or(&file.output);
        let marker = if file.templated { "+" } else { "=" };
        println!("  {} {}", marker.green(), shown.display());
    }
    for warning in &report.warnings {
        eprintln!("{} {}", "Warning:".yellow(), warning);
    }
    println!();
    println!(
        "{} {} file(s) in {}",
        "Rendered".green().bold(),
        report.files.len(),
        destination.display()
    );
}

fn print_failure(destination: &Path, failure: &RenderFailure) {
    for path in &failure.written {
        let shown = path.strip_prefix(destination).unwrap_or(path);
        println!("  {} {}", "+".green(), shown.display());
    }
    eprintln!();
    eprintln!(
        "{} {}: {}",
        "Failed at".red().bold(),
        failure.file.display(),
        failure.source
    );
    if !failure.written.is_empty() {
        eprintln!(
            "{} file(s) were already written to {} and left in place",
            failure.written.len(),
            destination.display()
        );
    }
}

pub async fn bump(location: &str, name: &str, kind: &str) -> Result<()> {
    if is_remote(location) {
        bail!("Cannot bump versions in a remote registry: {}", location);
    }

    let mut db = registry::load(location)
        .await
        .with_context(|| format!("Failed to load registry from {}", location))?;
    let mut bp = registry::find(&db, name)?.clone();
    let current = bp
        .parsed_version()
        .with_context(|| format!("Blueprint '{}' has an invalid version", name))?;
    let next = current.bump(kind);

    bp.version = next.to_string();
    db.upsert(bp);
    registry::save(location, &db)
        .await
        .with_context(|| format!("Failed to save registry to {}", location))?;

    println!("{} {} {} -> {}", "Bumped".green().bold(), name, current, next);
    Ok(())
}

pub fn bump_version(version: &str, kind: &str) -> Result<()> {
    let current = Version::parse(version)?;
    println!("{}", current.bump(kind));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::registry::save;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bump_updates_registry_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        let db = Database::new(vec![
            Blueprint::new("api", "1.2.3-rc1"),
            Blueprint::new("web", "0.1.0"),
        ]);
        save(&path, &db).await.unwrap();

        let location = path.to_str().unwrap();
        bump(location, "api", "minor").await.unwrap();

        let reloaded = registry::load(location).await.unwrap();
        assert_eq!(reloaded.find("api").unwrap().version, "1.3.0");
        assert_eq!(reloaded.find("web").unwrap().version, "0.1.0");
    }

    #[tokio::test]
    async fn test_bump_rejects_remote_registry() {
        assert!(bump("https://example.com/registry.json", "api", "patch")
            .await
            .is_err());
    }

    #[test]
    fn test_select_by_version() {
        let db = Database::new(vec![Blueprint::new("api", "1.0.0"), Blueprint::new("api", "2.0.0")]);
        assert_eq!(select(&db, "api", None).unwrap().version, "1.0.0");
        assert_eq!(select(&db, "api", Some("2.0.0")).unwrap().version, "2.0.0");
        assert!(select(&db, "api", Some("not-a-version")).is_err());
        assert!(select(&db, "missing", None).is_err());
    }

    #[test]
    fn test_render_options_from_flags() {
        let args = ContextArgs {
            set: vec![],
            context: None,
            all: true,
            lenient: true,
        };
        let options = render_options(&args);
        assert_eq!(options.content_policy, ContentPolicy::All);
        assert!(!options.strict);
    }

    #[tokio::test]
    async fn test_new_project_from_local_repo() {
        let repo = TempDir::new().unwrap();
        let templates = repo.path().join("service");
        std::fs::create_dir_all(templates.join("{{ProjectName}}")).unwrap();
        std::fs::write(
            templates.join("{{ProjectName}}/README.md.tmpl"),
            "# {{ProjectName}} from {{Blueprint.name}}@{{Blueprint.version}} by {{Owner}}",
        )
        .unwrap();

        let mut bp = Blueprint::new("svc", "1.0.0");
        bp.repo = repo.path().to_string_lossy().into_owned();
        bp.path = "service".to_string();
        let work = TempDir::new().unwrap();
        let registry_path = work.path().join("registry.json");
        save(&registry_path, &Database::new(vec![bp])).await.unwrap();

        let out = work.path().join("demo");
        let args = NewArgs {
            name: "svc".to_string(),
            directory: out.clone(),
            version: None,
            cache_dir: Some(work.path().join("cache")),
            context: ContextArgs {
                set: vec!["Owner=acme".to_string()],
                context: None,
                all: false,
                lenient: false,
            },
        };
        new_project(
            &crate::BlueprintConfig,
            registry_path.to_str().unwrap(),
            args,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        let readme = std::fs::read_to_string(out.join("demo/README.md")).unwrap();
        assert_eq!(readme, "# demo from svc@1.0.0 by acme");
    }
}

use std::path::Path;

use anyhow::Context as _;
use colored::Colorize;
use graft_refs::{Ref, RefStore};
use graft_rewrite::{
    Context, Entry, PathFilter, RefAction, RepositoryRewriter, RevisionAnnotator, RewriteConfig,
    RewritePolicy, RewriteReport,
};
use graft_store::Commit;
use graft_types::ObjectId;
use serde_json::json;
use tracing::info;

use crate::bundle::LoadedRepository;
use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Rewrite(args) => cmd_rewrite(args, cli.format),
        Command::Refs(args) => cmd_refs(args, cli.format),
        Command::Log(args) => cmd_log(args, cli.format),
    }
}

/// The policy assembled from command-line flags.
struct CliPolicy {
    filter: PathFilter,
    annotator: Option<RevisionAnnotator>,
}

impl RewritePolicy for CliPolicy {
    fn drops_entry(&self, entry: &Entry, c: &Context) -> bool {
        self.filter.drops_entry(entry, c)
    }

    fn rewrite_commit_message(
        &self,
        message: &str,
        id: &ObjectId,
        commit: &Commit,
        c: &Context,
    ) -> String {
        match &self.annotator {
            Some(annotator) => annotator.rewrite_commit_message(message, id, commit, c),
            None => self.rewrite_message(message, id, c),
        }
    }
}

fn build_config(args: &RewriteArgs, filter: &PathFilter) -> anyhow::Result<RewriteConfig> {
    let mut config = match &args.config {
        Some(path) => RewriteConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RewriteConfig::default(),
    };
    config.overwrite |= args.overwrite;
    config.path_sensitive |= args.path_sensitive;
    config.concurrent |= args.concurrent;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if filter.needs_path_sensitivity() && !config.path_sensitive {
        info!("a --drop path contains '/'; enabling path sensitivity");
        config.path_sensitive = true;
    }
    Ok(config)
}

fn cmd_rewrite(args: RewriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let filter = PathFilter::new(args.drops.iter().cloned());
    let config = build_config(&args, &filter)?;
    let annotator = match (&args.svn_mapping, &args.object_mapping) {
        (Some(log), Some(marks)) => Some(RevisionAnnotator::from_files(log, marks)?),
        _ => None,
    };
    let policy = CliPolicy { filter, annotator };

    let source = LoadedRepository::load(&args.bundle)?;
    let label = args.bundle.display().to_string();
    let (report, result) = if config.overwrite {
        let engine = RepositoryRewriter::in_place(source.repo.clone(), config, policy).with_label(label);
        (engine.rewrite()?, source)
    } else {
        let target = LoadedRepository::empty();
        let engine = RepositoryRewriter::new(source.repo.clone(), target.repo.clone(), config, policy)
            .with_label(label);
        (engine.rewrite()?, target)
    };

    let output = args.output.as_deref().unwrap_or(&args.bundle);
    result.save(output)?;
    print_report(&report, output, format)
}

fn print_report(report: &RewriteReport, output: &Path, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let commits: serde_json::Map<String, serde_json::Value> = report
                .commit_mapping
                .iter()
                .map(|(old, new)| (old.to_hex(), json!(new.to_hex())))
                .collect();
            let actions: Vec<String> = report.ref_actions.iter().map(describe_action).collect();
            let value = json!({
                "output": output.display().to_string(),
                "commits": commits,
                "entries": report.entries,
                "refs": report.refs,
                "ref_actions": actions,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!(
                "{} Rewrote {} commits ({} distinct entries)",
                "✓".green().bold(),
                report.commit_mapping.len().to_string().bold(),
                report.entries
            );
            for action in &report.ref_actions {
                println!("  {}", describe_action(action));
            }
            println!("  Written to {}", output.display().to_string().bold());
        }
    }
    Ok(())
}

fn describe_action(action: &RefAction) -> String {
    match action {
        RefAction::Delete { name } => format!("deleted {name}"),
        RefAction::Rename { from, to } => format!("renamed {from} -> {to}"),
        RefAction::Update(entry) => format!("updated {entry}"),
    }
}

fn cmd_refs(args: RefsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = LoadedRepository::load(&args.bundle)?;
    let refs = loaded.repo.list_refs()?;
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = refs
                .iter()
                .map(|(name, reference)| (name.clone(), json!(reference.to_string())))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            if refs.is_empty() {
                println!("No refs.");
            }
            for (name, reference) in &refs {
                match reference {
                    Ref::Direct(id) => println!("{} {}", id.short_hex().yellow(), name),
                    Ref::Symbolic(target) => {
                        println!("{} {} -> {}", "ref:".dimmed(), name.bold(), target.green())
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_log(args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = LoadedRepository::load(&args.bundle)?;
    let mut next = loaded
        .refs
        .resolve(&args.reference)?
        .with_context(|| format!("{} does not resolve to an object", args.reference))?;

    let mut entries = Vec::new();
    while entries.len() < args.limit {
        let commit = loaded
            .repo
            .read_commit(&next)
            .with_context(|| format!("reading commit {next}"))?;
        let parent = commit.parents.first().copied();
        entries.push((next, commit));
        match parent {
            Some(parent) => next = parent,
            None => break,
        }
    }

    match format {
        OutputFormat::Json => {
            let list: Vec<_> = entries
                .iter()
                .map(|(id, commit)| {
                    json!({
                        "id": id.to_hex(),
                        "parents": commit.parents.iter().map(ObjectId::to_hex).collect::<Vec<_>>(),
                        "tree": commit.tree.to_hex(),
                        "author": commit.author.to_string(),
                        "message": commit.message,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            for (id, commit) in &entries {
                let summary = commit.message.lines().next().unwrap_or_default();
                if args.oneline {
                    println!("{} {}", id.short_hex().yellow(), summary);
                } else {
                    println!("{} {}", "commit".yellow(), id.to_hex().yellow().bold());
                    println!("Author: {}", commit.author);
                    println!();
                    println!("    {summary}");
                    println!();
                }
            }
        }
    }
    Ok(())
}

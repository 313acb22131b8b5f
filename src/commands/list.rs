use anyhow::Result;
use bundlekit::hook::SystemShell;
use bundlekit::reconcile::Reconciler;
use bundlekit::{Directive, inventory};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::Context;
use crate::cli::ListArgs;
use crate::config::Settings;
use crate::ui;

/// How an installed bundle relates to the vimrc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Declared,
    Static,
    Undeclared,
}

#[derive(Debug, Serialize)]
struct ListedBundle {
    name: String,
    status: Status,
    origin: Option<String>,
    version: Option<String>,
    date: Option<DateTime<FixedOffset>>,
}

fn status_of(name: &str, directives: &[Directive]) -> Status {
    match directives.iter().find(|d| d.name == name) {
        Some(d) if d.is_static => Status::Static,
        Some(_) => Status::Declared,
        None => Status::Undeclared,
    }
}

pub fn run(ctx: &Context, settings: &Settings, args: ListArgs) -> Result<()> {
    // A missing vimrc still lets us list what is on disk.
    let directives = super::load_directives(settings).unwrap_or_else(|e| {
        log::warn!("{e:#}");
        Vec::new()
    });
    let mode = settings.sync_mode();
    let git = super::git_backend(settings, &mode)?;
    let reconciler = Reconciler::new(
        &git,
        &SystemShell,
        &mode,
        &settings.bundles_path,
        &settings.trash_path,
    );

    let mut bundles = Vec::new();
    for state in reconciler.observe()? {
        let record = match &state.origin_url {
            Some(_) => Some(inventory::record_for(
                &git,
                &state.name,
                &reconciler.bundle_dir(&state.name),
            )?),
            None => None,
        };
        bundles.push(ListedBundle {
            status: status_of(&state.name, &directives),
            version: record.as_ref().and_then(|r| r.version_label.clone()),
            date: record.and_then(|r| r.date),
            origin: state.origin_url,
            name: state.name,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Installed Bundles");
    }
    if bundles.is_empty() {
        ui::info(&format!(
            "No bundles in {}",
            settings.bundles_path.display()
        ));
        return Ok(());
    }

    let width = bundles.iter().map(|b| b.name.len()).max().unwrap_or(0);
    for bundle in &bundles {
        let version = bundle.version.as_deref().unwrap_or(inventory::NOT_AVAILABLE);
        let date = bundle
            .date
            .map_or_else(|| inventory::NOT_AVAILABLE.to_string(), |d| d.format("%Y-%m-%d").to_string());
        let marker = match bundle.status {
            Status::Declared => "",
            Status::Static => " (static)",
            Status::Undeclared => " (not in vimrc)",
        };
        println!("  {:<width$}  {version}  {date}{marker}", bundle.name);
        if ctx.verbose > 0
            && let Some(origin) = &bundle.origin
        {
            ui::dim(&format!("  {origin}"));
        }
    }

    let undeclared = bundles
        .iter()
        .filter(|b| b.status == Status::Undeclared)
        .count();
    if undeclared > 0 && !ctx.quiet {
        println!();
        ui::warn(&format!(
            "{} will be archived on the next sync",
            ui::plural(undeclared, "bundle")
        ));
    }
    Ok(())
}

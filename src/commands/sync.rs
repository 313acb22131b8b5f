use anyhow::{Context as _, Result};
use bundlekit::hook::SystemShell;
use bundlekit::reconcile::{Reconciler, SyncObserver};
use bundlekit::{Decision, Outcome, SyncReport, inventory};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::SyncArgs;
use crate::commands::plan;
use crate::config::Settings;
use crate::progress::StageProgress;
use crate::runner::{self, Helptags};
use crate::ui;

/// Draws one spinner per bundle while the reconciler works.
struct ProgressObserver {
    stages: StageProgress,
    trash_root: PathBuf,
    verbose: bool,
    quiet: bool,
    current: Option<String>,
}

impl ProgressObserver {
    fn new(ctx: &Context, total: usize, trash_root: &Path) -> Self {
        Self {
            stages: if ctx.quiet {
                StageProgress::hidden(total)
            } else {
                StageProgress::new(total)
            },
            trash_root: trash_root.to_path_buf(),
            verbose: ctx.verbose > 0,
            quiet: ctx.quiet,
            current: None,
        }
    }

    /// Mark the bundle being worked on as failed.
    fn abort(&mut self) {
        if let Some(name) = self.current.take() {
            self.stages.fail(&format!("{name} failed"));
        }
    }
}

impl SyncObserver for ProgressObserver {
    fn on_bundle_start(&mut self, name: &str, decision: &Decision) {
        let verb = match decision {
            Decision::Create => "cloning",
            Decision::RefreshInPlace => "updating",
            Decision::ReOrigin { .. } => "replacing",
            Decision::LeaveAlone => "keeping",
            Decision::Remove => "archiving",
        };
        self.current = Some(name.to_string());
        self.stages.start(&format!("{verb} {name}"));
    }

    fn on_hook_start(&mut self, name: &str, command: &str) {
        // The hook writes straight to the terminal.
        self.stages.succeed(&format!("{name} checked out"));
        if self.verbose && !self.quiet {
            ui::dim(&format!("$ {command}"));
        }
    }

    fn on_bundle_complete(&mut self, name: &str, outcome: &Outcome) {
        self.current = None;
        let line = ui::outcome_line(name, outcome, &self.trash_root);
        if self.stages.is_running() {
            self.stages.succeed(&line);
        } else if !self.quiet {
            ui::success(&line);
        }
    }
}

pub fn run(ctx: &Context, settings: &Settings, args: SyncArgs) -> Result<()> {
    if args.dry_run {
        if !ctx.quiet {
            ui::warn("Dry run - no changes will be made");
        }
        return plan::run(ctx, settings);
    }

    if !ctx.quiet {
        ui::header("Syncing Bundles");
        ui::kv("vimrc", &settings.vimrc_path.display().to_string());
        ui::kv("bundles", &settings.bundles_path.display().to_string());
        if settings.submodule {
            ui::kv("submodules of", &settings.dotfiles_path.display().to_string());
        }
        println!();
    }

    let directives = super::load_directives(settings)?;
    let mode = settings.sync_mode();
    let git = super::git_backend(settings, &mode)?;
    let reconciler = Reconciler::new(
        &git,
        &SystemShell,
        &mode,
        &settings.bundles_path,
        &settings.trash_path,
    );

    let total = reconciler.plan(&directives)?.len();
    let mut observer = ProgressObserver::new(ctx, total, &settings.trash_path);
    let report = match reconciler.reconcile(&directives, &mut observer) {
        Ok(report) => report,
        Err(e) => {
            observer.abort();
            return Err(e.into());
        }
    };

    let doc = inventory::render(&report.inventory, &chrono::Local::now());
    inventory::write_doc(&settings.docs_path, &doc).with_context(|| {
        format!(
            "Could not write bundle list to {}",
            settings.docs_path.display()
        )
    })?;

    if settings.helptags {
        build_helptags(settings, &report);
    }

    if !ctx.quiet {
        print_summary(&report);
    }
    Ok(())
}

/// Index help files in the docs directory and in every synced bundle.
fn build_helptags(settings: &Settings, report: &SyncReport) {
    let doc_dirs = help_dirs(settings, report);
    match runner::helptags(&doc_dirs) {
        Helptags::Built(count) => log::info!("built help tags in {count} directories"),
        Helptags::VimMissing => log::info!("vim not found; skipping helptags"),
        Helptags::Failed(dirs) => {
            for dir in dirs {
                log::warn!("could not build help tags in {}", dir.display());
            }
        }
    }
}

fn help_dirs(settings: &Settings, report: &SyncReport) -> Vec<PathBuf> {
    std::iter::once(settings.docs_path.clone())
        .chain(
            report
                .inventory
                .iter()
                .map(|record| settings.bundles_path.join(&record.name).join("doc")),
        )
        .collect()
}

fn print_summary(report: &SyncReport) {
    let created = report.count(|o| matches!(o, Outcome::Created));
    let refreshed = report.count(|o| matches!(o, Outcome::Refreshed));
    let replaced = report.count(|o| matches!(o, Outcome::ReOriginated { .. }));
    let removed = report.count(|o| matches!(o, Outcome::Removed { .. }));

    let mut parts = Vec::new();
    for (count, what) in [
        (created, "new"),
        (refreshed, "updated"),
        (replaced, "replaced"),
        (removed, "archived"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {what}"));
        }
    }

    println!();
    if parts.is_empty() {
        ui::success("Nothing to sync");
    } else {
        ui::success(&format!(
            "Synced {} ({})",
            ui::plural(report.inventory.len(), "bundle"),
            parts.join(", ")
        ));
    }
}

use anyhow::Result;
use bundlekit::Decision;
use bundlekit::hook::SystemShell;
use bundlekit::reconcile::Reconciler;

use crate::Context;
use crate::config::Settings;
use crate::ui;

pub fn run(ctx: &Context, settings: &Settings) -> Result<()> {
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
    let actions = reconciler.plan(&directives)?;

    if !ctx.quiet {
        ui::header("Bundle Plan");
    }
    if actions.is_empty() {
        ui::info("No bundles declared or installed");
        return Ok(());
    }

    for action in &actions {
        let detail = match &action.decision {
            Decision::ReOrigin {
                previous: Some(previous),
            } => format!("  (was {previous})"),
            Decision::ReOrigin { previous: None } => "  (not a git checkout)".to_string(),
            _ => String::new(),
        };
        println!(
            "  {} {}{}",
            ui::decision_label(&action.decision),
            action.name,
            detail
        );
    }

    let structural = actions
        .iter()
        .filter(|a| a.decision.is_structural())
        .count();
    if !ctx.quiet {
        println!();
        if structural == 0 {
            ui::success("Bundle directory already matches the vimrc");
        } else {
            ui::info(&format!(
                "{} to create, replace or archive",
                ui::plural(structural, "bundle")
            ));
        }
    }
    Ok(())
}

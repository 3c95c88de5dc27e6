use super::{check_key, Workspace};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use funnel_editor::{ComponentRegistry, Document};
use funnel_workspace::PersistenceGateway;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document key
    pub key: String,

    /// Print the stored JSON instead of the outline
    #[arg(long)]
    pub json: bool,
}

pub async fn show(args: ShowArgs, cwd: &Path) -> Result<()> {
    check_key(&args.key)?;
    let workspace = Workspace::load(cwd)?;
    let envelope = workspace
        .gateway
        .load(&args.key)
        .await
        .with_context(|| format!("Cannot open '{}'", args.key))?;

    if args.json {
        println!("{}", envelope.to_json()?);
        return Ok(());
    }

    println!(
        "{} {}",
        args.key.bright_white().bold(),
        format!("(saved {})", envelope.saved_at.to_rfc3339()).dimmed()
    );
    for line in outline(&envelope.document, &workspace.registry) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per step and component; `*` marks the active step, `>` the selection
pub fn outline(document: &Document, registry: &ComponentRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, step) in document.steps.iter().enumerate() {
        let active = document.active_step_id.as_ref() == Some(&step.id);
        lines.push(format!(
            "{} {}. {} [{}] ({} components)",
            if active { "*" } else { " " },
            index + 1,
            step.name,
            step.id,
            step.components.len()
        ));

        for component in &step.components {
            let selected = document.selection.is_component(&component.id)
                && document.selection.step_id.as_ref() == Some(&step.id);
            let rendered = registry
                .render(component)
                .map(|r| r.to_string())
                .unwrap_or_else(|| format!("<{}>", component.type_name));
            lines.push(format!(
                "    {} {} [{}]",
                if selected { ">" } else { "-" },
                rendered,
                component.id
            ));
        }
    }
    lines
}

use super::{check_key, Workspace};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use funnel_editor::SerializedDocument;
use funnel_workspace::PersistenceGateway;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Document key (file name without extension)
    pub key: String,

    /// Step names, in order (defaults to the configured steps)
    #[arg(short, long = "step")]
    pub steps: Vec<String>,

    /// Force overwrite an existing document
    #[arg(short, long)]
    pub force: bool,
}

pub async fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    check_key(&args.key)?;
    let workspace = Workspace::load(cwd)?;
    let path = workspace.gateway.path_for(&args.key);

    if path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            path.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        format!("📝 Creating funnel '{}'...", args.key).bright_blue().bold()
    );

    let names = if args.steps.is_empty() {
        workspace.config.default_steps.clone()
    } else {
        args.steps
    };

    let mut store = workspace.new_store();
    for name in &names {
        store.create_step(name.as_str());
        println!("  {} Added step {}", "✓".green(), name);
    }
    if let Some(first) = store.document().steps.first().map(|s| s.id.clone()) {
        store.set_active_step(&first);
    }

    workspace
        .gateway
        .save(&args.key, &SerializedDocument::new(store.snapshot()))
        .await?;

    println!();
    println!("✨ {} Saved to {}", "Done".green().bold(), path.display());
    Ok(())
}

use super::{check_key, Workspace};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use funnel_editor::Command;
use funnel_workspace::EditorSession;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Document key (created with the configured steps if missing)
    pub key: String,

    /// JSON file holding an array of commands
    pub script: PathBuf,

    /// Undo the last N committed commands before saving
    #[arg(long, default_value_t = 0)]
    pub undo: usize,
}

/// Parse a command script: a JSON array of tagged commands
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let commands: Vec<Command> = serde_json::from_str(text)?;
    Ok(commands)
}

pub async fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    check_key(&args.key)?;
    let workspace = Workspace::load(cwd)?;

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read {}", args.script.display()))?;
    let commands = parse_script(&text)
        .with_context(|| format!("Invalid command script {}", args.script.display()))?;

    let mut session = EditorSession::open(
        args.key.clone(),
        workspace.gateway.clone(),
        workspace.new_store(),
        &workspace.config,
    )
    .await?;

    println!(
        "{}",
        format!("⚙️  Applying {} commands to '{}'", commands.len(), args.key)
            .bright_blue()
            .bold()
    );

    let report = run_script(&mut session, commands, args.undo);
    session.save().await?;
    tracing::info!(
        key = %args.key,
        committed = report.committed,
        rejected = report.rejected,
        undone = report.undone,
        "Applied command script"
    );

    println!();
    println!(
        "✨ {} {} committed, {} rejected, {} undone",
        "Done".green().bold(),
        report.committed,
        report.rejected,
        report.undone
    );
    Ok(())
}

/// Counts from one script run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptReport {
    pub committed: usize,
    pub rejected: usize,
    pub undone: usize,
}

/// Dispatch each command in order, then undo up to `undo` committed ones
///
/// Rejected commands are reported and skipped; they never stop the run.
pub fn run_script(session: &mut EditorSession, commands: Vec<Command>, undo: usize) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (index, command) in commands.into_iter().enumerate() {
        let label = command.label();
        match session.dispatch(command) {
            Ok(_) => {
                report.committed += 1;
                println!("  {} #{} {}", "✓".green(), index + 1, label);
            }
            Err(e) => {
                report.rejected += 1;
                tracing::warn!(index = index + 1, command = label, error = %e, "Command rejected");
                println!("  {} #{} {}: {}", "✗".red(), index + 1, label, e);
            }
        }
    }

    while report.undone < undo.min(report.committed) && session.undo() {
        report.undone += 1;
    }
    if report.undone > 0 {
        tracing::debug!(undone = report.undone, "Undid committed commands");
        println!("  {} Undid {} command(s)", "↶".yellow(), report.undone);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_editor::{ComponentRegistry, EditorStore, SequentialIds};
    use funnel_workspace::{MemoryGateway, WorkspaceConfig};
    use std::sync::Arc;

    #[test]
    fn test_parse_script() {
        let script = r#"[
            { "command": "addStep", "name": "Offer" },
            { "command": "addComponent", "stepId": "step-1", "typeName": "heading" },
            { "command": "reorderSteps", "orderedIds": ["step-2", "step-1"] }
        ]"#;

        let commands = parse_script(script).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], Command::AddStep { name: "Offer".to_string() });
        assert_eq!(commands[1].label(), "Add component");
    }

    #[tokio::test]
    async fn test_run_script_skips_rejected_commands() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = EditorStore::new(Arc::new(ComponentRegistry::with_builtins()))
            .with_ids(SequentialIds::new());
        let mut session = EditorSession::open("quiz", gateway, store, &WorkspaceConfig::default())
            .await
            .unwrap();

        let commands = parse_script(
            r#"[
                { "command": "addComponent", "stepId": "step-1", "typeName": "heading" },
                { "command": "addComponent", "stepId": "step-1", "typeName": "carousel" },
                { "command": "deleteStep", "stepId": "step-404" },
                { "command": "addStep", "name": "Offer" }
            ]"#,
        )
        .unwrap();
        let report = run_script(&mut session, commands, 5);

        assert_eq!(
            report,
            ScriptReport {
                committed: 2,
                rejected: 2,
                undone: 2,
            }
        );
        assert!(session.document().steps[0].components.is_empty());
    }

    #[test]
    fn test_parse_script_rejects_unknown_command() {
        assert!(parse_script(r#"[{ "command": "explode" }]"#).is_err());
        assert!(parse_script(r#"{ "command": "addStep", "name": "x" }"#).is_err());
    }
}

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use funnel_editor::ComponentRegistry;

#[derive(Debug, Args)]
pub struct TypesArgs {
    /// Only list one category (content, media, form, layout, offer)
    #[arg(short, long)]
    pub category: Option<String>,
}

pub fn types(args: TypesArgs) -> Result<()> {
    let registry = ComponentRegistry::with_builtins();

    let categories: Vec<&str> = match &args.category {
        Some(category) if registry.list_by_category(category).is_empty() => {
            bail!(
                "Unknown category: {}. Available: {}",
                category,
                registry.categories().join(", ")
            );
        }
        Some(category) => vec![category.as_str()],
        None => registry.categories(),
    };

    for category in categories {
        println!("{}", category.bright_blue().bold());
        for definition in registry.list_by_category(category) {
            let defaults = serde_json::to_string(&definition.default_props())?;
            println!(
                "  {:<12} {:<12} {}",
                definition.type_name.bright_white(),
                definition.label,
                defaults.dimmed()
            );
        }
    }
    Ok(())
}

//! CLI module for Pixel
//!
//! Provides commands:
//! - `serve`: Start the HTTP server (default)
//! - `config`: Print the effective configuration
//! - `access`: Print the tool access table for a plan

use clap::{Parser, Subcommand};
use pixel_core::{Plan, PlanAccess, ToolId};

/// Pixel image editor backend CLI
#[derive(Parser, Debug)]
#[command(name = "pixel")]
#[command(about = "Image editor backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Print the effective configuration as TOML
    Config,
    /// Print which tools a plan may use
    Access {
        /// Plan tier (free or pro)
        #[arg(long, default_value = "free")]
        plan: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) | None => crate::server::run().await,
        Some(Commands::Config) => {
            let config = crate::server::load_config()?;
            print!("{}", toml::to_string_pretty(&config.redacted())?);
            Ok(())
        }
        Some(Commands::Access { plan }) => {
            let plan: Plan = plan.parse()?;
            print!("{}", access_table(plan));
            Ok(())
        }
    }
}

/// Tool table for a plan, one tool per line
fn access_table(plan: Plan) -> String {
    let access = PlanAccess::new(plan);
    let mut out = format!("Plan: {plan}\n");
    for tool in ToolId::ALL {
        let mark = if access.has_access(tool) { "yes" } else { "no (pro)" };
        out.push_str(&format!("  {:<12} {:<18} {}\n", tool.as_str(), tool.label(), mark));
    }
    let limits = access.limits();
    if plan.is_pro() {
        out.push_str("  projects: unlimited, exports: unlimited\n");
    } else {
        out.push_str(&format!(
            "  projects: {}, exports per month: {}\n",
            limits.free_project_limit, limits.free_export_limit
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::parse_from(["pixel"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_access_plan_flag() {
        let cli = Cli::parse_from(["pixel", "access", "--plan", "pro"]);
        assert!(matches!(cli.command, Some(Commands::Access { plan }) if plan == "pro"));
    }

    #[test]
    fn test_access_table() {
        let free = access_table(Plan::Free);
        assert!(free.contains("ai_edit"));
        assert!(free.contains("no (pro)"));
        assert!(free.contains("projects: 3, exports per month: 20"));

        let pro = access_table(Plan::Pro);
        assert!(!pro.contains("no (pro)"));
        assert!(pro.contains("unlimited"));
    }
}

//! Status command - report slot reuse decisions without installing

use super::{build_context, install_process};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::error::GemlayerResult;
use crate::layer::{self, SlotReport, SlotState};
use crate::ui::{LogEmitter, UiContext};
use console::style;

/// Execute the status command
pub async fn execute(args: StatusArgs) -> GemlayerResult<()> {
    let ctx = build_context(&args.source).await?;
    let quiet = LogEmitter::new(std::io::sink(), UiContext::plain());
    let process = install_process(&args.source, quiet);

    let reports = layer::inspect(&ctx, &process).await?;

    match args.format {
        OutputFormat::Table => print_table(&reports, UiContext::detect()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    Ok(())
}

fn state_label(state: SlotState) -> &'static str {
    match state {
        SlotState::NotNeeded => "not needed",
        SlotState::Fetched => "fetched",
        SlotState::StackInvalidated => "stack changed",
        SlotState::DecidedReuse => "reuse",
        SlotState::DecidedRebuild => "rebuild",
        SlotState::Rebuilt => "rebuilt",
    }
}

fn print_table(reports: &[SlotReport], ctx: UiContext) {
    let header = format!(
        "{:<14} {:<15} {:<10} {:<12}",
        "SLOT", "DECISION", "RUBY", "CHECKSUM"
    );
    if ctx.use_color() {
        println!("{}", style(header).bold());
    } else {
        println!("{}", header);
    }
    println!("{}", "-".repeat(54));

    for report in reports {
        let label = state_label(report.state);
        let label = if !ctx.use_color() {
            label.to_string()
        } else {
            match report.state {
                SlotState::DecidedReuse => style(label).green().to_string(),
                SlotState::NotNeeded => style(label).dim().to_string(),
                _ => style(label).yellow().to_string(),
            }
        };

        let (ruby, checksum) = match &report.current {
            Some(decision) => (
                decision.runtime_version.clone(),
                short_checksum(&decision.checksum),
            ),
            None => ("-".to_string(), "-".to_string()),
        };

        println!(
            "{:<14} {:<15} {:<10} {:<12}",
            report.name, label, ruby, checksum
        );
    }
}

fn short_checksum(checksum: &str) -> String {
    if checksum.is_empty() {
        "(none)".to_string()
    } else {
        checksum.chars().take(12).collect()
    }
}

use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use pipelens::pipeline::Task;

use super::styling::{bright, cyan, dim};
use super::tables::{
    color_coded_duration_cell, color_coded_status_cell, create_table, format_duration,
    format_previous_duration, status_color,
};
use crate::report::StatusReport;

/// Prints a human-readable summary of a rendered pipeline to stdout.
///
/// Displays color-coded tables showing:
/// - Overview: pipeline, rendered run, total duration against the previous run
/// - Stages: every task with its status, start, duration, previous duration, flags and link
///
/// Color coding:
/// - Status: green success, yellow unstable, red failed, cyan running, magenta queued, grey idle
/// - Duration: red when slower than the previous run, green when not slower
pub fn print_summary(report: &StatusReport) {
    println!("{}", render_summary(report));
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_flags(task: &Task) -> String {
    let mut flags = Vec::new();
    if task.manual {
        flags.push("manual");
    }
    if task.rebuildable {
        flags.push("rebuildable");
    }
    flags.join(", ")
}

fn render_overview(output: &mut String, report: &StatusReport) {
    add_section_header(output, "📋", "Overview");

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Metric", "Value"]));
    table.add_row(vec![Cell::new("Pipeline"), Cell::new(&report.view.pipeline)]);
    table.add_row(vec![
        Cell::new("Run"),
        Cell::new(
            report
                .view
                .run
                .upstream
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Total duration"),
        Cell::new(format_duration(report.view.total_duration_millis)),
    ]);
    if let (Some(run), Some(total)) = (&report.previous_run, report.previous_total_duration_millis) {
        table.add_row(vec![
            Cell::new(format!("Previous run ({run})")),
            Cell::new(format_duration(total)),
        ]);
    }

    let _ = writeln!(output, "{table}\n");
}

fn render_stages(output: &mut String, report: &StatusReport) {
    add_section_header(output, "🚦", "Stages");

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Stage", "Task", "Status", "Started", "Duration", "Previous", "Flags", "Link",
    ]));

    for stage in &report.view.stages {
        for (index, task) in stage.tasks.iter().enumerate() {
            let previous = report
                .comparison(&task.name)
                .map_or(pipelens::pipeline::UNKNOWN_DURATION, |c| c.previous_duration_millis);
            let stage_cell = if index == 0 {
                Cell::new(&stage.name).fg(status_color(stage.status))
            } else {
                Cell::new("")
            };

            table.add_row(vec![
                stage_cell,
                Cell::new(&task.name),
                color_coded_status_cell(task.status, task.progress),
                Cell::new(
                    task.start_time
                        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                ),
                color_coded_duration_cell(task.duration_millis, previous),
                Cell::new(format_previous_duration(previous)),
                Cell::new(format_flags(task)),
                Cell::new(&task.link),
            ]);
        }
    }

    let _ = writeln!(output, "{table}\n");
}

/// Renders the summary as a string.
pub fn render_summary(report: &StatusReport) -> String {
    let mut output = String::new();

    render_overview(&mut output, report);
    render_stages(&mut output, report);

    let _ = writeln!(
        output,
        "{} {}",
        cyan("ℹ"),
        dim(format!("Collected at {}", report.collected_at.format("%Y-%m-%d %H:%M:%S UTC")))
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipelens::host::BuildRef;
    use pipelens::pipeline::{PipelineRun, PipelineView, Stage, StageView};
    use pipelens::Status;

    fn report() -> StatusReport {
        let tasks = vec![
            Task {
                id: "deploy".to_string(),
                name: "Deploy to prod".to_string(),
                status: Status::Failed,
                start_time: None,
                duration_millis: Some(4_500),
                link: "job/deploy/3/".to_string(),
                rebuildable: true,
                manual: true,
                build_number: Some(3),
                progress: None,
            },
        ];
        let run = PipelineRun {
            upstream: Some(BuildRef::new("build", 12)),
            stages: tasks.iter().map(Stage::from).collect(),
        };
        let view = PipelineView {
            pipeline: "Delivery".to_string(),
            total_duration_millis: run.total_duration_millis(),
            stages: vec![StageView {
                name: "Prod".to_string(),
                status: Status::Failed,
                tasks,
            }],
            run,
        };
        StatusReport::new(view, None)
    }

    #[test]
    fn test_render_summary_contains_tasks() {
        let output = render_summary(&report());

        assert!(output.contains("Delivery"));
        assert!(output.contains("build#12"));
        assert!(output.contains("Deploy to prod"));
        assert!(output.contains("FAILED"));
        assert!(output.contains("manual, rebuildable"));
        assert!(output.contains("job/deploy/3/"));
        assert!(output.contains("4.5s"));
    }
}

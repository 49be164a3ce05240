//! Output rendering and formatting

use std::io;

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use roller_types::{
    Activity, ActivitySeverity, Application, Channel, Group, Instance, Package,
    PackageKind, StatusHistoryEntry, UpdatesStats,
};
use serde::Serialize;

/// Result of a command, rendered as a table or as JSON
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CommandOutput {
    Message(String),
    Application(Application),
    Package(Package),
    Channel(Channel),
    Group(Box<Group>),
    Groups(Vec<Group>),
    Stats(UpdatesStats),
    /// The update an instance was granted.
    Granted(Package),
    Instance(Instance),
    Instances(Vec<Instance>),
    History(Vec<StatusHistoryEntry>),
    Activity(Vec<Activity>),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match output {
            CommandOutput::Message(message) => println!("{message}"),
            CommandOutput::Application(app) => {
                print_fields(&[
                    ("Id", app.id.clone()),
                    ("Name", app.name.clone()),
                    ("Description", app.description.clone()),
                    ("Created", app.created_ts.to_rfc3339()),
                ]);
            }
            CommandOutput::Package(package) => render_package(package),
            CommandOutput::Granted(package) => {
                println!("Update granted: {}", package.version);
                render_package(package);
            }
            CommandOutput::Channel(channel) => {
                print_fields(&[
                    ("Id", channel.id.clone()),
                    ("Name", channel.name.clone()),
                    ("Application", channel.application_id.clone()),
                    ("Package", package_label(channel.package.as_ref())),
                ]);
            }
            CommandOutput::Group(group) => render_group(group),
            CommandOutput::Groups(groups) => render_groups(groups),
            CommandOutput::Stats(stats) => render_stats(stats),
            CommandOutput::Instance(instance) => render_instances(std::slice::from_ref(instance)),
            CommandOutput::Instances(instances) => render_instances(instances),
            CommandOutput::History(history) => render_history(history),
            CommandOutput::Activity(entries) => render_activity(entries),
        }
        Ok(())
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

fn print_fields(fields: &[(&str, String)]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    for (name, value) in fields {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(value),
        ]);
    }
    println!("{table}");
}

fn package_label(package: Option<&Package>) -> String {
    package.map_or_else(|| "-".to_string(), |p| format!("{} ({})", p.version, p.id))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn kind_label(kind: &PackageKind) -> &'static str {
    match kind {
        PackageKind::Coreos(_) => "coreos",
        PackageKind::Docker => "docker",
        PackageKind::Rocket => "rocket",
        PackageKind::Other => "other",
    }
}

fn render_package(package: &Package) {
    print_fields(&[
        ("Id", package.id.clone()),
        ("Version", package.version.clone()),
        ("Type", kind_label(&package.kind).to_string()),
        ("URL", package.url.clone()),
        ("Filename", package.filename.clone().unwrap_or_default()),
        ("Size", package.size.clone().unwrap_or_default()),
        ("Blacklisted channels", package.channels_blacklist.join(", ")),
    ]);
}

fn render_group(group: &Group) {
    let policy = &group.policy;
    print_fields(&[
        ("Id", group.id.clone()),
        ("Name", group.name.clone()),
        ("Channel", group.channel_id.clone().unwrap_or_else(|| "-".into())),
        (
            "Package",
            package_label(group.channel.as_ref().and_then(|c| c.package.as_ref())),
        ),
        ("Updates enabled", yes_no(policy.updates_enabled).into()),
        ("Safe mode", yes_no(policy.safe_mode).into()),
        (
            "Office hours",
            match (&policy.timezone, policy.office_hours) {
                (Some(tz), true) => format!("yes ({tz})"),
                _ => yes_no(policy.office_hours).into(),
            },
        ),
        (
            "Max updates",
            format!(
                "{} per {}s",
                policy.max_updates_per_period,
                policy.period_interval.as_secs()
            ),
        ),
        ("Update timeout", format!("{}s", policy.update_timeout.as_secs())),
        ("Rollout in progress", yes_no(group.rollout_in_progress).into()),
    ]);

    let stats = &group.instances_stats;
    let mut table = new_table(&[
        "Total", "Undefined", "Granted", "Downloading", "Downloaded", "Installed", "Complete",
        "Error", "On hold",
    ]);
    table.add_row(vec![
        stats.total,
        stats.undefined,
        stats.update_granted,
        stats.downloading,
        stats.downloaded,
        stats.installed,
        stats.complete,
        stats.error,
        stats.on_hold,
    ]);
    println!("{table}");

    if !group.version_breakdown.is_empty() {
        let mut table = new_table(&["Version", "Instances", "Share"]);
        for entry in &group.version_breakdown {
            table.add_row(vec![
                entry.version.clone(),
                entry.instances.to_string(),
                format!("{:.1}%", entry.percentage),
            ]);
        }
        println!("{table}");
    }
}

fn render_groups(groups: &[Group]) {
    if groups.is_empty() {
        println!("No groups.");
        return;
    }
    let mut table = new_table(&["Id", "Name", "Package", "Updates", "Instances"]);
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.id),
            Cell::new(&group.name),
            Cell::new(package_label(
                group.channel.as_ref().and_then(|c| c.package.as_ref()),
            )),
            if group.policy.updates_enabled {
                Cell::new("enabled").fg(Color::Green)
            } else {
                Cell::new("disabled").fg(Color::Red)
            },
            Cell::new(group.instances_stats.total),
        ]);
    }
    println!("{table}");
}

fn render_stats(stats: &UpdatesStats) {
    print_fields(&[
        ("Total instances", stats.total_instances.to_string()),
        ("Granted", stats.granted_current_version.to_string()),
        ("Attempted", stats.attempted_current_version.to_string()),
        ("Succeeded", stats.succeeded_current_version.to_string()),
        ("Failed", stats.failed_current_version.to_string()),
        ("Granted in period", stats.granted_in_period.to_string()),
        ("In progress", stats.in_progress.to_string()),
        ("Timed out", stats.timed_out.to_string()),
    ]);
}

fn render_instances(instances: &[Instance]) {
    if instances.is_empty() {
        println!("No instances.");
        return;
    }
    let mut table = new_table(&["Id", "IP", "Version", "Status", "Last check", "Updating to"]);
    for instance in instances {
        let app = instance.application.as_ref();
        table.add_row(vec![
            instance.id.clone(),
            instance.ip.clone(),
            app.map(|a| a.version.clone()).unwrap_or_default(),
            app.and_then(|a| a.status)
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            app.map(|a| a.last_check_for_updates.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            app.filter(|a| a.update_in_progress)
                .and_then(|a| a.last_update_version.clone())
                .unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

fn render_history(history: &[StatusHistoryEntry]) {
    if history.is_empty() {
        println!("No status changes.");
        return;
    }
    let mut table = new_table(&["When", "Status", "Version"]);
    for entry in history {
        table.add_row(vec![
            entry.created_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.status.to_string(),
            entry.version.clone(),
        ]);
    }
    println!("{table}");
}

fn render_activity(entries: &[Activity]) {
    if entries.is_empty() {
        println!("No activity.");
        return;
    }
    let mut table = new_table(&["When", "Severity", "Class", "Version", "Group", "Instance"]);
    for entry in entries {
        let severity = match entry.severity {
            ActivitySeverity::Success => Cell::new("success").fg(Color::Green),
            ActivitySeverity::Info => Cell::new("info"),
            ActivitySeverity::Warning => Cell::new("warning").fg(Color::Yellow),
            ActivitySeverity::Error => Cell::new("error").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(entry.created_ts.format("%Y-%m-%d %H:%M:%S")),
            severity,
            Cell::new(format!("{:?}", entry.class)),
            Cell::new(&entry.version),
            Cell::new(
                entry
                    .group_name
                    .as_deref()
                    .or(entry.group_id.as_deref())
                    .unwrap_or("-"),
            ),
            Cell::new(entry.instance_id.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

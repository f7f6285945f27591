use std::fs;
use std::io::{self, Write};

use chrono::Datelike;
use timeline_blueprint::graph::HierarchyGraph;
use timeline_blueprint::{
    BusinessCalendar, BusinessCalendarConfig, CaptureOptions, InstantiationOptions,
    JsonDirTemplateStore, MAX_WORKDAY_SPAN, RootNaming, Template, TemplateStore, TemplateSummary,
    WorkItemSnapshot, capture_template, parse_loose_date, preview_instantiation,
    save_template_to_csv,
};
use tracing_subscriber::EnvFilter;

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if ci < widths.len() && cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_row<'a>(widths: &[usize], cells: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.into_iter().zip(widths) {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  calendar show                      Display calendar configuration\n  calendar load <json_path>          Load calendar config from JSON file\n  calendar save <json_path>          Save current calendar config to JSON file\n  calendar us <year> <year>          Reset to default pattern plus US federal holidays\n  holiday add|remove <date>          Edit the holiday set\n  exception add|remove <date>        Edit the workday exception set\n  day <date>                         Describe one date\n  workdays <start> <end>             Count workdays, both ends inclusive\n  enddate <start> <n>                Last day of an n-workday span\n  next <date>                        First workday on or after date\n  items load <json_path>             Load a work item snapshot\n  items show                         Show the loaded item hierarchy\n  capture <root_id> <name...>        Capture root_id and its descendants as a template\n  templates                          List stored templates\n  template show <id>                 Show one template\n  template rename <id> <name...>     Rename a template\n  template delete <id>               Delete a template\n  template csv <id> <path>           Export a template to CSV\n  preview <id> <start_date> [prefix] Dry-run an instantiation\n  quit|exit                          Exit"
    );
}

fn print_calendar_info(calendar: &BusinessCalendar) {
    let working_days = calendar
        .weekly_pattern()
        .working_days()
        .iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let join = |dates: Vec<chrono::NaiveDate>| {
        dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("Working days       : {}", working_days);
    println!("Holidays           : {}", join(calendar.holidays()));
    println!("Workday exceptions : {}", join(calendar.workday_exceptions()));
}

fn print_summaries(summaries: &[TemplateSummary]) {
    if summaries.is_empty() {
        println!("No templates stored.");
        return;
    }
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.name.clone(),
                s.root_title.clone(),
                s.item_count.to_string(),
                s.storage_location.as_str().to_string(),
                s.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        render_text_table(
            &["id", "name", "root", "items", "location", "updated"],
            &rows
        )
    );
}

fn print_template(template: &Template) {
    println!("Template  : {} ({})", template.name, template.id);
    println!("Root      : {}", template.root.title);
    if let Some(workdays) = template.root.workdays {
        println!("Root span : {workdays} workdays");
    }
    let opt = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
    let rows: Vec<Vec<String>> = template
        .items
        .iter()
        .map(|item| {
            vec![
                item.local_id.clone(),
                item.kind.as_str().to_string(),
                item.title.clone(),
                item.parent_ref.to_string(),
                opt(item.start_offset),
                opt(item.workdays),
                item.blocks.join(","),
            ]
        })
        .collect();
    print!(
        "{}",
        render_text_table(
            &["local_id", "kind", "title", "parent", "offset", "workdays", "blocks"],
            &rows
        )
    );
}

fn print_item_tree(snapshot: &WorkItemSnapshot) {
    let graph = HierarchyGraph::build(&snapshot.items);
    let known: std::collections::HashSet<&str> =
        snapshot.items.iter().map(|item| item.id.as_str()).collect();
    let mut stack: Vec<(&str, usize)> = snapshot
        .items
        .iter()
        .filter(|item| {
            item.parent_id
                .as_deref()
                .is_none_or(|parent| !known.contains(parent))
        })
        .map(|item| (item.id.as_str(), 0))
        .rev()
        .collect();
    let mut printed = std::collections::HashSet::new();
    while let Some((id, depth)) = stack.pop() {
        if !printed.insert(id) {
            continue;
        }
        let Some(item) = snapshot.items.iter().find(|item| item.id == id) else {
            continue;
        };
        let dates = match (item.start, item.end) {
            (Some(start), Some(end)) => format!(" [{start} .. {end}]"),
            (Some(start), None) => format!(" [{start} ..]"),
            _ => String::new(),
        };
        println!("{}{} {}{}", "  ".repeat(depth), item.id, item.title, dates);
        for child in graph.children(id).into_iter().rev() {
            if let Some(child) = snapshot.items.iter().find(|item| item.id == child) {
                stack.push((child.id.as_str(), depth + 1));
            }
        }
    }
    println!(
        "{} items, {} dependency edges",
        snapshot.items.len(),
        snapshot.edges.len()
    );
}

fn load_snapshot(path: &str) -> Result<WorkItemSnapshot, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn load_calendar(path: &str) -> Result<BusinessCalendar, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)?;
    let config: BusinessCalendarConfig = serde_json::from_str(&data)?;
    Ok(BusinessCalendar::from_config(&config)?)
}

fn save_calendar(calendar: &BusinessCalendar, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&calendar.to_config())?;
    fs::write(path, json)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let store_dir =
        std::env::var("BLUEPRINT_STORE_DIR").unwrap_or_else(|_| ".blueprints".to_string());
    let store = JsonDirTemplateStore::new(&store_dir)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut calendar = BusinessCalendar::default();
    let mut snapshot = WorkItemSnapshot::default();

    println!("Timeline Blueprint (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "calendar" => match (parts.next(), parts.next(), parts.next()) {
                (Some("show"), _, _) => print_calendar_info(&calendar),
                (Some("load"), Some(path), _) => match load_calendar(path) {
                    Ok(loaded) => {
                        calendar = loaded;
                        println!("Calendar loaded from {path}.");
                    }
                    Err(e) => println!("Error loading calendar: {}", e),
                },
                (Some("save"), Some(path), _) => match save_calendar(&calendar, path) {
                    Ok(()) => println!("Calendar saved to {path}."),
                    Err(e) => println!("Error saving calendar: {}", e),
                },
                (Some("us"), Some(from), Some(to)) => {
                    match (from.parse::<i32>(), to.parse::<i32>()) {
                        (Ok(from), Ok(to)) => {
                            calendar = BusinessCalendar::with_us_holidays(from, to);
                            println!(
                                "Calendar reset with {} US holidays.",
                                calendar.holidays().len()
                            );
                        }
                        _ => println!("Invalid year"),
                    }
                }
                _ => println!("Usage: calendar show|load <path>|save <path>|us <year> <year>"),
            },
            "holiday" | "exception" => {
                let action = parts.next();
                let date_s = parts.next();
                let (Some(action), Some(date_s)) = (action, date_s) else {
                    println!("Usage: {} add|remove <date>", cmd);
                    continue;
                };
                let Some(date) = parse_loose_date(date_s) else {
                    println!("Invalid date");
                    continue;
                };
                let changed = match (cmd, action) {
                    ("holiday", "add") => calendar.add_holiday(date),
                    ("holiday", "remove") => calendar.remove_holiday(date),
                    ("exception", "add") => calendar.add_workday_exception(date),
                    ("exception", "remove") => calendar.remove_workday_exception(date),
                    _ => {
                        println!("Usage: {} add|remove <date>", cmd);
                        continue;
                    }
                };
                if changed {
                    println!("{} {} {}.", cmd, date, action_past(action));
                } else {
                    println!("{} {} unchanged.", cmd, date);
                }
            }
            "day" => {
                let Some(date) = parts.next().and_then(parse_loose_date) else {
                    println!("Usage: day <date>");
                    continue;
                };
                println!(
                    "{} {} workday={} holiday={} exception={}",
                    date,
                    date.weekday(),
                    calendar.is_workday(date),
                    calendar.is_holiday(date),
                    calendar.is_workday_exception(date)
                );
            }
            "workdays" => {
                let start = parts.next().and_then(parse_loose_date);
                let end = parts.next().and_then(parse_loose_date);
                match (start, end) {
                    (Some(start), Some(end)) => {
                        println!("{}", calendar.count_workdays(start, end));
                    }
                    _ => println!("Usage: workdays <start> <end>"),
                }
            }
            "enddate" => {
                let start = parts.next().and_then(parse_loose_date);
                let n = parts.next().and_then(|s| s.parse::<i64>().ok());
                match (start, n) {
                    (Some(_), Some(n))
                        if n.unsigned_abs() > MAX_WORKDAY_SPAN.unsigned_abs() =>
                    {
                        println!("Workday count out of range (limit {MAX_WORKDAY_SPAN}).")
                    }
                    (Some(start), Some(n)) => {
                        let end = calendar.calculate_end_date_by_workdays(start, n);
                        println!(
                            "{} ({} calendar days)",
                            end,
                            calendar.calculate_calendar_days(start, n)
                        );
                    }
                    _ => println!("Usage: enddate <start> <n>"),
                }
            }
            "next" => match parts.next().and_then(parse_loose_date) {
                Some(date) => println!("{}", calendar.get_next_workday(date)),
                None => println!("Usage: next <date>"),
            },
            "items" => match (parts.next(), parts.next()) {
                (Some("load"), Some(path)) => match load_snapshot(path) {
                    Ok(loaded) => {
                        snapshot = loaded;
                        println!(
                            "Loaded {} items and {} edges.",
                            snapshot.items.len(),
                            snapshot.edges.len()
                        );
                    }
                    Err(e) => println!("Error loading items: {}", e),
                },
                (Some("show"), _) => print_item_tree(&snapshot),
                _ => println!("Usage: items load <path>|show"),
            },
            "capture" => {
                let Some(root_id) = parts.next() else {
                    println!("Usage: capture <root_id> <name...>");
                    continue;
                };
                let name = parts.collect::<Vec<_>>().join(" ");
                let options = if name.is_empty() {
                    CaptureOptions::default()
                } else {
                    CaptureOptions::named(name)
                };
                let captured = capture_template(
                    root_id,
                    &snapshot.items,
                    &snapshot.edges,
                    &calendar,
                    &options,
                );
                match captured {
                    Ok(template) => match store.save_template(&template) {
                        Ok(()) => println!(
                            "Captured template {} '{}' with {} items.",
                            template.id,
                            template.name,
                            template.items.len()
                        ),
                        Err(e) => println!("Error saving template: {}", e),
                    },
                    Err(e) => println!("Capture error: {}", e),
                }
            }
            "templates" => match store.list_templates() {
                Ok(summaries) => print_summaries(&summaries),
                Err(e) => println!("Error listing templates: {}", e),
            },
            "template" => {
                let action = parts.next();
                let id = parts.next();
                let (Some(action), Some(id)) = (action, id) else {
                    println!("Usage: template show|rename|delete|csv <id> ...");
                    continue;
                };
                match action {
                    "show" => match store.load_template(id) {
                        Ok(Some(template)) => print_template(&template),
                        Ok(None) => println!("Template {id} not found."),
                        Err(e) => println!("Error: {}", e),
                    },
                    "rename" => {
                        let name = parts.collect::<Vec<_>>().join(" ");
                        match store.rename_template(id, &name) {
                            Ok(template) => println!("Template {} renamed to '{}'.", id, template.name),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    "delete" => match store.delete_template(id) {
                        Ok(true) => println!("Deleted template {id}."),
                        Ok(false) => println!("Template {id} not found."),
                        Err(e) => println!("Error: {}", e),
                    },
                    "csv" => {
                        let Some(path) = parts.next() else {
                            println!("Usage: template csv <id> <path>");
                            continue;
                        };
                        match store.load_template(id) {
                            Ok(Some(template)) => match save_template_to_csv(&template, path) {
                                Ok(()) => println!("Template {id} written to {path}."),
                                Err(e) => println!("Error: {}", e),
                            },
                            Ok(None) => println!("Template {id} not found."),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: template show|rename|delete|csv <id> ..."),
                }
            }
            "preview" => {
                let id = parts.next();
                let start = parts.next().and_then(parse_loose_date);
                let (Some(id), Some(start)) = (id, start) else {
                    println!("Usage: preview <id> <start_date> [prefix]");
                    continue;
                };
                let prefix = parts.collect::<Vec<_>>().join(" ");
                let template = match store.load_template(id) {
                    Ok(Some(template)) => template,
                    Ok(None) => {
                        println!("Template {id} not found.");
                        continue;
                    }
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let mut options = InstantiationOptions::new(start);
                if !prefix.is_empty() {
                    options.root_naming = RootNaming::prefixed(prefix);
                }
                match runtime.block_on(preview_instantiation(&template, &options, &calendar)) {
                    Ok(report) => {
                        println!("Preview ({})", report.result.to_cli_summary());
                        match serde_json::to_string_pretty(&report.calls) {
                            Ok(json) => println!("{json}"),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    Err(e) => println!("Preview error: {}", e),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
    Ok(())
}

fn action_past(action: &str) -> &'static str {
    match action {
        "add" => "added",
        _ => "removed",
    }
}

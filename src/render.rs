//! Render the status in the text format of menu bar apps (xbar, SwiftBar).
//!
//! The first line is the title shown in the menu bar, `---` separates sections,
//! and every other line is a menu item. Items can have attributes after a `|`,
//! for example `Refresh | refresh=true`. Lines starting with `-- ` are
//! shown in a submenu of the previous item.
//!
//! Rendering is pure: the same [Snapshot] and [MenuContext] always produce the
//! same lines, the current time is passed in.

use crate::state::{DeployRecord, PersistedState, Status};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const ICON_IDLE: &str = "▲";
const ICON_SYNCING: &str = "↻";
const ICON_WARN: &str = "⚠";

const GREEN: &str = "#2ea043";
const RED: &str = "#d1242f";
const YELLOW: &str = "#c58a00";

const SEPARATOR: &str = "---";
const NESTED: &str = "-- ";

const TIME_FORMAT: &[FormatItem<'_>] =
    format_description!("[hour repr:12 padding:none]:[minute]:[second] [period]");

/// Everything that is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub status: Status,
    pub history: Vec<DeployRecord>,
    pub online: bool,
    /// The output of a deploy running in the background.
    pub progress: Vec<String>,
    /// Why the deploy process failed, or why this invocation failed.
    pub failure: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            status: Status::Idle,
            history: vec![],
            online: true,
            progress: vec![],
            failure: None,
        }
    }
}

impl Snapshot {
    /// Display a persisted state as it is.
    pub fn from_state(state: &PersistedState) -> Self {
        Snapshot {
            status: state.status,
            history: state.deploy_history.clone(),
            failure: state.failure.clone(),
            ..Default::default()
        }
    }
}

/// The surroundings of the menu: how to call ourselves back and what time it is.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuContext {
    /// The executable to run for menu actions.
    pub program: String,
    /// The arguments to pass before the action (e.g. `--config`).
    pub args: Vec<String>,
    /// A link to the site on the hosting provider.
    pub site_url: Option<String>,
    pub now: OffsetDateTime,
}

impl MenuContext {
    fn action(&self, action: &str) -> String {
        let mut attributes = vec![
            String::from("terminal=false"),
            format!("bash={}", quote(&self.program)),
        ];
        let params = self.args.iter().map(String::as_str).chain([action]);
        for (index, param) in params.enumerate() {
            attributes.push(format!("param{}={}", index + 1, quote(param)));
        }

        attributes.join(" ")
    }
}

fn quote(value: &str) -> String {
    if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

// A `|` in the text would start the attributes.
fn escape(text: &str) -> String {
    text.replace('|', "¦")
}

#[derive(Default)]
struct Menu(Vec<String>);

impl Menu {
    fn line(&mut self, text: &str) {
        self.0.push(escape(text));
    }

    fn item(&mut self, text: &str, attributes: &[String]) {
        if attributes.is_empty() {
            self.line(text);
        } else {
            self.0.push(format!("{} | {}", escape(text), attributes.join(" ")));
        }
    }

    /// Every non-empty line of a multiline text, with a prefix.
    fn lines(&mut self, prefix: &str, text: &str) {
        for line in text.lines().map(str::trim_end).filter(|line| !line.is_empty()) {
            self.line(&format!("{prefix}{line}"));
        }
    }

    fn separator(&mut self) {
        self.0.push(String::from(SEPARATOR));
    }
}

/// Render the snapshot to menu lines.
pub fn render(snapshot: &Snapshot, context: &MenuContext) -> Vec<String> {
    let mut menu = Menu::default();
    let status = if snapshot.online {
        snapshot.status
    } else {
        Status::Offline
    };

    menu.0.push(title(status, &snapshot.history));
    menu.separator();

    match status {
        Status::Offline => {
            menu.line("No internet connection");
            menu.line("Syncing disabled");
            menu.separator();
        }
        Status::Error => {
            menu.item("Deploy failed to run", &[format!("color={RED}")]);
            if let Some(failure) = &snapshot.failure {
                menu.lines(NESTED, failure);
            }
            menu.separator();
        }
        _ => {}
    }

    match status {
        Status::Deploying => {
            let mut attributes = vec![format!("color={YELLOW}")];
            if let Some(site_url) = &context.site_url {
                attributes.push(format!("href={site_url}"));
            }
            menu.item("Deploy in progress...", &attributes);
            for line in &snapshot.progress {
                menu.lines(NESTED, line);
            }
        }
        Status::NeedsDeploy => menu.line("Changes detected, deploy queued"),
        _ => menu.item(
            "⚡️ DEPLOY ⚡️",
            &[format!("color={YELLOW}"), context.action("trigger")],
        ),
    }
    menu.separator();

    if status != Status::Error {
        if let Some(failure) = &snapshot.failure {
            menu.item("Something went wrong", &[format!("color={RED}")]);
            menu.lines(NESTED, failure);
            menu.separator();
        }
    }

    if let Some((latest, older)) = snapshot.history.split_first() {
        deploy_entry(&mut menu, latest, "", context.now);
        if !older.is_empty() {
            menu.separator();
            for record in older {
                deploy_entry(&mut menu, record, NESTED, context.now);
            }
        }
        menu.separator();
    }

    menu.item("Refresh", &[String::from("refresh=true")]);
    menu.item("Reset State", &[context.action("reset")]);

    menu.0
}

fn title(status: Status, history: &[DeployRecord]) -> String {
    let icon = match status {
        Status::Offline | Status::Error => ICON_WARN,
        Status::NeedsDeploy | Status::Deploying => ICON_SYNCING,
        Status::Idle => ICON_IDLE,
    };

    let failures = history.iter().take_while(|record| record.is_failed()).count();
    if failures > 0 {
        format!("{icon} {failures}")
    } else {
        icon.to_string()
    }
}

fn deploy_entry(menu: &mut Menu, record: &DeployRecord, prefix: &str, now: OffsetDateTime) {
    let mut attributes = vec![format!(
        "color={}",
        if record.is_failed() { RED } else { GREEN }
    )];
    if let Some(url) = record.remote_info.as_ref().and_then(|info| info.url.as_ref()) {
        attributes.push(format!("href={url}"));
    }
    menu.item(&display_time(record.timestamp, now), &attributes);

    if let Some(error) = &record.error {
        menu.lines(prefix, error);
        return;
    }

    menu.line(&format!(
        "{prefix}{} files in {:.1}s",
        record.changed_file_count, record.duration_seconds
    ));
    menu.lines(prefix, &record.log);
}

/// A time relative to today, e.g. "Yesterday, 10:30:01 AM".
fn display_time(timestamp: OffsetDateTime, now: OffsetDateTime) -> String {
    let local = timestamp.to_offset(now.offset());
    let day = match (now.date() - local.date()).whole_days() {
        0 => String::from("Today"),
        1 => String::from("Yesterday"),
        -1 => String::from("Tomorrow"),
        days if days > 1 => format!("{days} days ago"),
        days => format!("In {} days", -days),
    };
    let time = local.format(TIME_FORMAT).unwrap_or_default();

    format!("{day}, {time}")
}

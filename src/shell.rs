//! Interactive dashboard: one line in, one controller action out.

use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::dashboard::{Dashboard, Loaded, Panel};
use crate::engine::parse_date_bound;
use crate::gateway::{Gateway, LogQuery, RiderOrder};
use crate::model::Role;
use crate::output::{self, infer_format_from_path, ExportFormat, PdfFonts};
use crate::session::SessionStore;
use crate::view::{self, terminal};

pub const HELP: &str = "\
:: Navigation
  dashboard | admin | reports | accounts   switch panel (also: nav <panel>)
  show                                     redraw the current panel
  reload                                   fetch stats and payments again
:: Payments
  search [text]                            filter by captain id, name or code
  from [YYYY-MM-DD] / to [YYYY-MM-DD]      import date range, blank clears
  clear                                    drop every filter
  order asc|desc                           server row order (admin), reloads rows
  export csv|pdf [file] | export <file>    save the visible rows
  import                                   import the latest sheet (admin)
:: Admin
  user create <name> <password> [role]
  user edit <name> <role>
  user delete <name>
  logs [next|prev]
:: Account
  profile
  password <old> <new> <confirm>
  help | quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Navigate(Panel),
    Show,
    Reload,
    Search(String),
    From(Option<NaiveDate>),
    To(Option<NaiveDate>),
    ClearFilter,
    Order(RiderOrder),
    Export {
        format: ExportFormat,
        out: Option<String>,
    },
    Import,
    CreateUser {
        username: String,
        password: String,
        role: Role,
    },
    EditUser {
        username: String,
        role: Role,
    },
    DeleteUser(String),
    Logs,
    LogsNext,
    LogsPrev,
    Profile,
    Password {
        old: String,
        new: String,
        confirm: String,
    },
    Help,
    Quit,
}

fn parse_panel(raw: &str) -> Result<ShellCommand, String> {
    Panel::parse(raw)
        .map(ShellCommand::Navigate)
        .ok_or_else(|| format!("unknown panel '{raw}'"))
}

fn parse_role(raw: Option<&str>) -> Result<Role, String> {
    match raw.map(|r| r.trim().to_lowercase()) {
        None => Ok(Role::User),
        Some(r) if r == "admin" || r == "user" => Ok(Role::parse(&r)),
        Some(r) => Err(format!("invalid role '{r}', expected admin or user")),
    }
}

fn parse_export(args: &[&str]) -> Result<ShellCommand, String> {
    let first = args.first().ok_or("usage: export csv|pdf [file]")?;
    if let Some(format) = ExportFormat::parse(first) {
        return Ok(ShellCommand::Export {
            format,
            out: args.get(1).map(|s| s.to_string()),
        });
    }
    match infer_format_from_path(first) {
        Some(format) => Ok(ShellCommand::Export {
            format,
            out: Some(first.to_string()),
        }),
        None => Err(format!("cannot export to '{first}', expected csv or pdf")),
    }
}

fn parse_user(args: &[&str]) -> Result<ShellCommand, String> {
    match args {
        ["create", username, password] => Ok(ShellCommand::CreateUser {
            username: username.to_string(),
            password: password.to_string(),
            role: Role::User,
        }),
        ["create", username, password, role] => Ok(ShellCommand::CreateUser {
            username: username.to_string(),
            password: password.to_string(),
            role: parse_role(Some(*role))?,
        }),
        ["edit", username, role] | ["role", username, role] => Ok(ShellCommand::EditUser {
            username: username.to_string(),
            role: parse_role(Some(*role))?,
        }),
        ["delete", username] | ["rm", username] => {
            Ok(ShellCommand::DeleteUser(username.to_string()))
        }
        _ => Err("usage: user create|edit|delete ...".to_string()),
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    let Some((head, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(h, r)| (h, r.trim()))
        .or_else(|| (!line.is_empty()).then_some((line, "")))
    else {
        return Ok(None);
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match head.to_lowercase().as_str() {
        "nav" | "go" => parse_panel(rest)?,
        "dashboard" | "home" => ShellCommand::Navigate(Panel::Dashboard),
        "admin" | "users" => ShellCommand::Navigate(Panel::AdminPanel),
        "reports" => ShellCommand::Navigate(Panel::Reports),
        "accounts" => ShellCommand::Navigate(Panel::Accounts),
        "show" | "ls" => ShellCommand::Show,
        "reload" | "refresh" => ShellCommand::Reload,
        "search" | "find" => ShellCommand::Search(rest.to_string()),
        "from" => ShellCommand::From(parse_date_bound(rest)?),
        "to" => ShellCommand::To(parse_date_bound(rest)?),
        "clear" => ShellCommand::ClearFilter,
        "order" | "sort" => RiderOrder::parse(rest)
            .map(ShellCommand::Order)
            .ok_or_else(|| format!("usage: order asc|desc, got '{rest}'"))?,
        "export" => parse_export(&args)?,
        "import" => ShellCommand::Import,
        "user" => parse_user(&args)?,
        "logs" => match args.first().copied() {
            None => ShellCommand::Logs,
            Some("next") => ShellCommand::LogsNext,
            Some("prev") | Some("previous") => ShellCommand::LogsPrev,
            Some(other) => return Err(format!("usage: logs [next|prev], got '{other}'")),
        },
        "profile" => ShellCommand::Profile,
        "password" | "passwd" => match args.as_slice() {
            [old, new, confirm] => ShellCommand::Password {
                old: old.to_string(),
                new: new.to_string(),
                confirm: confirm.to_string(),
            },
            _ => return Err("usage: password <old> <new> <confirm>".to_string()),
        },
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

#[derive(Clone, Debug, Default)]
pub struct ShellContext {
    pub fonts: PdfFonts,
    pub export_dir: Option<PathBuf>,
    pub spinner: bool,
}

#[derive(Debug, Default)]
pub struct Step {
    pub quit: bool,
    pub output: String,
}

impl Step {
    fn show(output: String) -> Self {
        Self {
            quit: false,
            output,
        }
    }
}

fn filter_summary<G: Gateway>(dash: &Dashboard<G>) -> Option<String> {
    let criteria = &dash.state().criteria;
    if criteria.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !criteria.term.trim().is_empty() {
        parts.push(format!("search='{}'", criteria.term.trim()));
    }
    if let Some(start) = criteria.start {
        parts.push(format!("from={start}"));
    }
    if let Some(end) = criteria.end {
        parts.push(format!("to={end}"));
    }
    Some(format!(
        ":: Filter : {} ({} of {} rows)",
        parts.join(" "),
        dash.visible_rows().len(),
        dash.state().raw.len()
    ))
}

/// Text for whatever panel is active.
pub fn render_panel<G: Gateway>(dash: &Dashboard<G>) -> String {
    let mut out = String::new();
    match dash.panel() {
        Panel::Dashboard => {
            match &dash.state().stats {
                Loaded::Ready(stats) => {
                    out.push_str(&terminal::render_pairs("Dashboard", &view::stats_cards(stats)));
                }
                Loaded::Failed(message) => {
                    out.push_str(&format!(":: Dashboard :: {message}\n"));
                }
                Loaded::Idle => {}
            }
            if let Some(summary) = filter_summary(dash) {
                out.push_str(&summary);
                out.push('\n');
            }
            out.push_str(&terminal::render_table(&dash.payments_view()));
        }
        Panel::AdminPanel => out.push_str(&terminal::render_table(&dash.users_view())),
        Panel::Reports => {
            out.push_str(&terminal::render_table(&dash.logs_view()));
            let query = &dash.state().log_query;
            out.push_str(&format!(
                ":: Page : skip {} limit {}\n",
                query.skip, query.limit
            ));
        }
        Panel::Accounts if dash.profile_modal.is_open() => match &dash.profile_modal.profile {
            Loaded::Ready(profile) => {
                out.push_str(&terminal::render_pairs("Profile", &view::profile_lines(profile)));
            }
            Loaded::Failed(message) => out.push_str(&format!(":: Profile :: {message}\n")),
            Loaded::Idle => {}
        },
        Panel::Accounts => {}
    }
    out
}

/// Loads one page of the audit log, entering Reports with that page when
/// another panel is showing.
async fn show_logs<G: Gateway>(dash: &mut Dashboard<G>, query: LogQuery) -> bool {
    if dash.panel() == Panel::Reports {
        dash.load_logs(query).await;
        return true;
    }
    let previous = dash.state().log_query.clone();
    dash.set_log_query(query);
    if dash.navigate(Panel::Reports).await {
        return true;
    }
    dash.set_log_query(previous);
    false
}

pub async fn execute<G: Gateway>(
    dash: &mut Dashboard<G>,
    command: ShellCommand,
    ctx: &ShellContext,
) -> Step {
    tracing::debug!(?command, "shell command");
    match command {
        ShellCommand::Quit => {
            return Step {
                quit: true,
                output: String::new(),
            }
        }
        ShellCommand::Help => return Step::show(format!("{HELP}\n")),
        ShellCommand::Navigate(panel) => {
            let pb = terminal::spinner(&format!("Loading {}", panel.label()), ctx.spinner);
            let moved = dash.navigate(panel).await;
            pb.finish_and_clear();
            if !moved {
                return Step::default();
            }
        }
        ShellCommand::Show => {}
        ShellCommand::Reload => {
            let pb = terminal::spinner("Reloading", ctx.spinner);
            dash.reload().await;
            pb.finish_and_clear();
        }
        ShellCommand::Search(term) => dash.set_search(&term),
        ShellCommand::From(start) => {
            let end = dash.state().criteria.end;
            dash.set_date_range(start, end);
        }
        ShellCommand::To(end) => {
            let start = dash.state().criteria.start;
            dash.set_date_range(start, end);
        }
        ShellCommand::ClearFilter => dash.clear_filter(),
        ShellCommand::Order(order) => {
            dash.set_order(order);
            let pb = terminal::spinner("Loading payments", ctx.spinner);
            dash.load_payments().await;
            pb.finish_and_clear();
        }
        ShellCommand::Export { format, out } => {
            let Some(bytes) = dash.export(format, &ctx.fonts) else {
                return Step::default();
            };
            let path =
                output::resolve_export_path(out.as_deref(), ctx.export_dir.as_deref(), format);
            return match output::write_export(&path, &bytes) {
                Ok(()) => Step::show(format!(":: Saved {}\n", path.display())),
                Err(e) => Step::show(format!(":: {e}\n")),
            };
        }
        ShellCommand::Import => {
            let pb = terminal::spinner("Importing", ctx.spinner);
            dash.import_data().await;
            pb.finish_and_clear();
            return Step::default();
        }
        ShellCommand::CreateUser {
            username,
            password,
            role,
        } => {
            if !dash.open_create_user() {
                return Step::default();
            }
            dash.user_modal.draft.username = username;
            dash.user_modal.draft.password = password;
            dash.user_modal.draft.role = role;
            let created = dash.submit_user_modal().await;
            dash.user_modal.close();
            if !created {
                return Step::default();
            }
        }
        ShellCommand::EditUser { username, role } => {
            if dash.panel() != Panel::AdminPanel {
                if !dash.navigate(Panel::AdminPanel).await {
                    return Step::default();
                }
            } else if dash.state().users.ready().is_none() {
                dash.refresh_users().await;
            }
            if !dash.open_edit_user(&username) {
                return Step::default();
            }
            dash.user_modal.draft.role = role;
            let updated = dash.submit_user_modal().await;
            dash.user_modal.close();
            if !updated {
                return Step::default();
            }
        }
        ShellCommand::DeleteUser(username) => {
            if !dash.delete_user(&username).await {
                return Step::default();
            }
        }
        ShellCommand::Logs => {
            let query = dash.state().log_query.clone();
            if !show_logs(dash, query).await {
                return Step::default();
            }
        }
        ShellCommand::LogsNext => {
            let query = dash.state().log_query.next_page();
            if !show_logs(dash, query).await {
                return Step::default();
            }
        }
        ShellCommand::LogsPrev => {
            let query = dash.state().log_query.previous_page();
            if !show_logs(dash, query).await {
                return Step::default();
            }
        }
        ShellCommand::Profile => {
            if !dash.navigate(Panel::Accounts).await {
                return Step::default();
            }
        }
        ShellCommand::Password { old, new, confirm } => {
            dash.open_password_modal();
            dash.password_modal.old_password = old;
            dash.password_modal.new_password = new;
            dash.password_modal.confirm_password = confirm;
            dash.submit_password().await;
            dash.password_modal.close();
            return Step::default();
        }
    }
    Step::show(render_panel(dash))
}

fn flush_notices<G: Gateway>(dash: &mut Dashboard<G>) {
    for notice in dash.take_notices() {
        eprintln!("{}", terminal::render_notice(&notice));
    }
}

/// Reads commands from stdin until `quit`, EOF, or the session expires.
pub async fn run_shell<G: Gateway, S: SessionStore>(
    dash: &mut Dashboard<G>,
    store: &S,
    ctx: &ShellContext,
) -> Result<(), String> {
    let first = execute(dash, ShellCommand::Navigate(Panel::Dashboard), ctx).await;
    print!("{}", first.output);
    flush_notices(dash);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if dash.session_expired() {
            store.clear().map_err(|e| e.to_string())?;
            break;
        }
        eprint!("riderpay [{}]> ", dash.panel().label());
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read input: {e}"))?
        else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!(":: {message}");
                continue;
            }
        };
        let step = execute(dash, command, ctx).await;
        print!("{}", step.output);
        flush_notices(dash);
        if step.quit {
            break;
        }
    }
    Ok(())
}

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{CliArgs, Command, LogsArgs, PaymentsArgs, UsersCommand};
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::dashboard::{self, Dashboard, Loaded, NoticeLevel, Panel, SESSION_EXPIRED};
use crate::engine::{parse_date_bound, FilterCriteria};
use crate::gateway::{ApiClient, Gateway, LogQuery, RiderOrder};
use crate::model::Role;
use crate::output::{self, infer_format_from_path, ExportFormat, PdfFonts};
use crate::session::{FileSessionStore, Session, SessionStore};
use crate::shell::{self, ShellContext};
use crate::view::{self, terminal};

const NOT_LOGGED_IN: &str = "not logged in, run `riderpay login` first";

#[derive(Clone, Debug)]
struct RunConfig {
    api_url: String,
    session_path: PathBuf,
    fonts: PdfFonts,
    export_dir: Option<PathBuf>,
    no_color: bool,
    verbose: u8,
    spinner: bool,
    command: Command,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let api_url = args
        .api_url
        .or(cfg.api_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| config::DEFAULT_API_URL.to_string());

    let session_path = args
        .session_file
        .or(cfg.session_file)
        .map(|p| config::expand_tilde(&p))
        .unwrap_or_else(config::default_session_path);

    let defaults = PdfFonts::default();
    let fonts_dir = match &args.command {
        Command::Payments(p) => p.fonts_dir.clone(),
        _ => None,
    };
    let fonts = PdfFonts {
        dir: fonts_dir
            .or(cfg.fonts_dir)
            .map(|p| config::expand_tilde(&p))
            .unwrap_or(defaults.dir),
        family: cfg
            .font_family
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or(defaults.family),
    };

    let export_dir = cfg.export_dir.map(|p| config::expand_tilde(&p));
    let spinner = args.verbose == 0 && std::io::stderr().is_terminal();

    Ok(RunConfig {
        api_url,
        session_path,
        fonts,
        export_dir,
        no_color,
        verbose: args.verbose,
        spinner,
        command: args.command,
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Echo {
    Visible,
    Hidden,
}

/// Secrets typed at a terminal are hidden; piped input is read as plain lines.
fn echo_for(secret: bool, interactive: bool) -> Echo {
    if secret && interactive {
        Echo::Hidden
    } else {
        Echo::Visible
    }
}

fn read_answer(reader: &mut impl BufRead) -> std::io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads one line through std's process-wide stdin buffer, so lines queued
/// on a pipe stay available to the next prompt.
async fn ask(label: &str, secret: bool) -> Result<String, String> {
    let label = format!("{label}: ");
    let echo = echo_for(secret, std::io::stdin().is_terminal());
    tokio::task::spawn_blocking(move || match echo {
        Echo::Hidden => rpassword::prompt_password(label),
        Echo::Visible => {
            let mut stderr = std::io::stderr();
            stderr.write_all(label.as_bytes())?;
            let _ = stderr.flush();
            read_answer(&mut std::io::stdin().lock())
        }
    })
    .await
    .map_err(|e| format!("prompt failed: {e}"))?
    .map_err(|e| format!("failed to read input: {e}"))
}

async fn prompt(label: &str) -> Result<String, String> {
    ask(label, false).await
}

async fn value_or_prompt(value: Option<String>, label: &str) -> Result<String, String> {
    match value {
        Some(v) => Ok(v),
        None => prompt(label).await,
    }
}

async fn secret_or_prompt(value: Option<String>, label: &str) -> Result<String, String> {
    match value {
        Some(v) => Ok(v),
        None => ask(label, true).await,
    }
}

fn load_session(store: &FileSessionStore) -> Result<Session, String> {
    store
        .load()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| NOT_LOGGED_IN.to_string())
}

fn client_for(run: &RunConfig, session: &Session) -> Result<ApiClient, String> {
    Ok(ApiClient::new(&run.api_url)
        .map_err(|e| e.to_string())?
        .with_token(session.token().map(str::to_string)))
}

/// Prints pending notices. A 401 during the command tries the refresh token
/// once; if that fails the stored session is dropped.
async fn finish(
    dash: &mut Dashboard<ApiClient>,
    run: &RunConfig,
    store: &FileSessionStore,
) -> Result<(), String> {
    let notices = dash.take_notices();
    for notice in &notices {
        eprintln!("{}", terminal::render_notice(notice));
    }

    if dash.session_expired() {
        return expire(run, store, dash.session()).await;
    }

    if notices.iter().any(|n| n.level == NoticeLevel::Error) {
        return Err("request failed".to_string());
    }
    Ok(())
}

async fn expire(run: &RunConfig, store: &FileSessionStore, session: &Session) -> Result<(), String> {
    if renew_session(run, store, session).await {
        return Err("session renewed, run the command again".to_string());
    }
    store.clear().map_err(|e| e.to_string())?;
    Err(SESSION_EXPIRED.to_string())
}

async fn renew_session(run: &RunConfig, store: &FileSessionStore, session: &Session) -> bool {
    let Some(refresh_token) = session.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
        return false;
    };
    let client = match ApiClient::new(&run.api_url) {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.refresh(refresh_token).await {
        Ok(renewed) => {
            let next = Session {
                access_token: renewed.access_token,
                role: if renewed.role.trim().is_empty() {
                    session.role
                } else {
                    Role::parse(&renewed.role)
                },
                ..session.clone()
            };
            if next.token().is_none() {
                return false;
            }
            match store.save(&next) {
                Ok(()) => {
                    tracing::info!("access token refreshed");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not store refreshed session");
                    false
                }
            }
        }
        Err(e) => {
            tracing::info!(error = %e, "refresh failed");
            false
        }
    }
}

async fn cmd_login(
    run: &RunConfig,
    store: &FileSessionStore,
    username: Option<String>,
    password: Option<String>,
) -> Result<(), String> {
    let username = value_or_prompt(username, "Username").await?;
    let password = secret_or_prompt(password, "Password").await?;
    if username.trim().is_empty() || password.is_empty() {
        return Err("username and password are required".to_string());
    }

    let client = ApiClient::new(&run.api_url).map_err(|e| e.to_string())?;
    let pb = terminal::spinner("Signing in", run.spinner);
    let result = client.login(username.trim(), &password).await;
    pb.finish_and_clear();
    let login = result.map_err(|e| format!("login failed: {}", e.user_message()))?;

    let session = Session {
        access_token: login.access_token,
        refresh_token: login.refresh_token,
        role: Role::parse(&login.role),
        username: Some(username.trim().to_string()),
    };
    if session.token().is_none() {
        return Err("login failed: server returned no token".to_string());
    }
    store.save(&session).map_err(|e| e.to_string())?;
    tracing::info!(user = %username.trim(), role = %session.role, "logged in");
    format_kv_line("Logged in", username.trim());
    format_kv_line("Role", session.role.as_str());
    Ok(())
}

async fn cmd_logout(run: &RunConfig, store: &FileSessionStore) -> Result<(), String> {
    let Some(session) = store.load().map_err(|e| e.to_string())? else {
        println!(":: Not logged in");
        return Ok(());
    };
    let client = client_for(run, &session)?;
    dashboard::sign_out(&client, store, &session)
        .await
        .map_err(|e| e.to_string())?;
    println!(":: Logged out");
    Ok(())
}

async fn cmd_whoami(run: &RunConfig, store: &FileSessionStore) -> Result<(), String> {
    let session = load_session(store)?;
    let client = client_for(run, &session)?;
    let pb = terminal::spinner("Checking session", run.spinner);
    let result = client.me().await;
    pb.finish_and_clear();
    match result {
        Ok(me) => {
            format_kv_line("User", &me.username);
            format_kv_line("Role", Role::parse(&me.role).as_str());
            format_kv_line("API", client.base_url().as_str());
            Ok(())
        }
        Err(e) if e.is_unauthorized() => expire(run, store, &session).await,
        Err(e) => Err(e.to_string()),
    }
}

fn payments_criteria(args: &PaymentsArgs) -> Result<FilterCriteria, String> {
    Ok(FilterCriteria {
        term: args.search.clone().unwrap_or_default(),
        start: parse_date_bound(args.from.as_deref().unwrap_or_default())?,
        end: parse_date_bound(args.to.as_deref().unwrap_or_default())?,
    })
}

async fn cmd_payments(
    run: &RunConfig,
    dash: &mut Dashboard<ApiClient>,
    args: &PaymentsArgs,
) -> Result<(), String> {
    let criteria = payments_criteria(args)?;
    if let Some(order) = args.order.as_deref().and_then(RiderOrder::parse) {
        dash.set_order(order);
    }
    let pb = terminal::spinner("Loading payments", run.spinner);
    dash.load_payments().await;
    pb.finish_and_clear();
    dash.set_filter(criteria);

    let format = args
        .export
        .as_deref()
        .and_then(ExportFormat::parse)
        .or_else(|| args.out.as_deref().and_then(infer_format_from_path));

    match format {
        Some(format) => {
            if let Some(bytes) = dash.export(format, &run.fonts) {
                let path = output::resolve_export_path(
                    args.out.as_deref(),
                    run.export_dir.as_deref(),
                    format,
                );
                output::write_export(&path, &bytes).map_err(|e| e.to_string())?;
                format_kv_line("Exported", &format!("{} rows", dash.visible_rows().len()));
                format_kv_line("File", &path.display().to_string());
            }
        }
        None => print!("{}", terminal::render_table(&dash.payments_view())),
    }
    Ok(())
}

async fn cmd_stats(run: &RunConfig, dash: &mut Dashboard<ApiClient>) {
    let pb = terminal::spinner("Loading stats", run.spinner);
    dash.load_stats().await;
    pb.finish_and_clear();
    match &dash.state().stats {
        Loaded::Ready(stats) => print!(
            "{}",
            terminal::render_pairs("Dashboard", &view::stats_cards(stats))
        ),
        Loaded::Failed(message) => eprintln!(":: {message}"),
        Loaded::Idle => {}
    }
}

async fn cmd_users(
    run: &RunConfig,
    dash: &mut Dashboard<ApiClient>,
    command: UsersCommand,
) -> Result<(), String> {
    match command {
        UsersCommand::List => {
            let pb = terminal::spinner("Loading users", run.spinner);
            let shown = dash.navigate(Panel::AdminPanel).await;
            pb.finish_and_clear();
            if shown {
                print!("{}", terminal::render_table(&dash.users_view()));
            }
        }
        UsersCommand::Create {
            username,
            password,
            role,
        } => {
            if !dash.open_create_user() {
                return Ok(());
            }
            let password = secret_or_prompt(password, "Password").await?;
            dash.user_modal.draft.username = username;
            dash.user_modal.draft.password = password;
            dash.user_modal.draft.role = Role::parse(&role);
            dash.submit_user_modal().await;
        }
        UsersCommand::Update { username, role } => {
            if !dash.navigate(Panel::AdminPanel).await {
                return Ok(());
            }
            if dash.open_edit_user(&username) {
                dash.user_modal.draft.role = Role::parse(&role);
                dash.submit_user_modal().await;
            }
        }
        UsersCommand::Delete { username, yes } => {
            if !yes {
                let answer = prompt(&format!("Delete user '{username}'? [y/N]")).await?;
                if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                    println!(":: Cancelled");
                    return Ok(());
                }
            }
            dash.delete_user(&username).await;
        }
    }
    Ok(())
}

fn log_query(args: &LogsArgs) -> Result<LogQuery, String> {
    let defaults = LogQuery::default();
    Ok(LogQuery {
        limit: args.limit.unwrap_or(defaults.limit),
        skip: args.skip.unwrap_or(defaults.skip),
        username: args.username.clone(),
        action: args.action.clone(),
        start_date: parse_date_bound(args.from.as_deref().unwrap_or_default())?,
        end_date: parse_date_bound(args.to.as_deref().unwrap_or_default())?,
    })
}

async fn cmd_logs(
    run: &RunConfig,
    dash: &mut Dashboard<ApiClient>,
    args: &LogsArgs,
) -> Result<(), String> {
    dash.set_log_query(log_query(args)?);
    let pb = terminal::spinner("Loading audit log", run.spinner);
    let shown = dash.navigate(Panel::Reports).await;
    pb.finish_and_clear();
    if shown {
        print!("{}", shell::render_panel(dash));
    }
    Ok(())
}

async fn cmd_password(
    dash: &mut Dashboard<ApiClient>,
    old: Option<String>,
    new: Option<String>,
) -> Result<(), String> {
    dash.open_password_modal();
    dash.password_modal.old_password = secret_or_prompt(old, "Current password").await?;
    let confirm_needed = new.is_none();
    dash.password_modal.new_password = secret_or_prompt(new, "New password").await?;
    dash.password_modal.confirm_password = if confirm_needed {
        ask("Confirm new password", true).await?
    } else {
        dash.password_modal.new_password.clone()
    };
    dash.submit_password().await;
    Ok(())
}

/// Without a token, the server issues one for the username first.
async fn cmd_reset_password(
    run: &RunConfig,
    username: Option<String>,
    token: Option<String>,
    new: Option<String>,
) -> Result<(), String> {
    let client = ApiClient::new(&run.api_url).map_err(|e| e.to_string())?;
    let token = match token.filter(|t| !t.trim().is_empty()) {
        Some(token) => token.trim().to_string(),
        None => {
            let username = value_or_prompt(username, "Username").await?;
            if username.trim().is_empty() {
                return Err("username is required".to_string());
            }
            let pb = terminal::spinner("Requesting reset token", run.spinner);
            let result = client.generate_reset_token(username.trim()).await;
            pb.finish_and_clear();
            result.map_err(|e| format!("reset failed: {}", e.user_message()))?
        }
    };

    let confirm_needed = new.is_none();
    let new_password = secret_or_prompt(new, "New password").await?;
    if confirm_needed && ask("Confirm new password", true).await? != new_password {
        return Err("New passwords do not match".to_string());
    }
    if new_password.is_empty() {
        return Err("new password is required".to_string());
    }

    let pb = terminal::spinner("Resetting password", run.spinner);
    let result = client.reset_password(&token, &new_password).await;
    pb.finish_and_clear();
    match result {
        Ok(message) => {
            tracing::info!("password reset");
            println!(":: {message}");
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            Err("reset failed: reset token is invalid or expired".to_string())
        }
        Err(e) => Err(format!("reset failed: {}", e.user_message())),
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    tracing::debug!(api = %run.api_url, session = %run.session_path.display(), "starting");

    let store = FileSessionStore::new(run.session_path.clone());

    match run.command.clone() {
        Command::Login { username, password } => {
            return cmd_login(&run, &store, username, password).await
        }
        Command::Logout => return cmd_logout(&run, &store).await,
        Command::Whoami => return cmd_whoami(&run, &store).await,
        Command::ResetPassword {
            username,
            token,
            new,
        } => return cmd_reset_password(&run, username, token, new).await,
        _ => {}
    }

    let session = load_session(&store)?;
    let client = client_for(&run, &session)?;
    let mut dash = Dashboard::new(client, session);

    match run.command.clone() {
        Command::Stats => cmd_stats(&run, &mut dash).await,
        Command::Payments(args) => cmd_payments(&run, &mut dash, &args).await?,
        Command::Import => {
            let pb = terminal::spinner("Importing", run.spinner);
            dash.import_data().await;
            pb.finish_and_clear();
        }
        Command::Users(command) => cmd_users(&run, &mut dash, command).await?,
        Command::Logs(args) => cmd_logs(&run, &mut dash, &args).await?,
        Command::Profile => {
            let pb = terminal::spinner("Loading profile", run.spinner);
            dash.navigate(Panel::Accounts).await;
            pb.finish_and_clear();
            print!("{}", shell::render_panel(&dash));
        }
        Command::Password { old, new } => cmd_password(&mut dash, old, new).await?,
        Command::Shell => {
            let ctx = ShellContext {
                fonts: run.fonts.clone(),
                export_dir: run.export_dir.clone(),
                spinner: run.spinner,
            };
            println!(
                "{}",
                format!(
                    ":: riderpay :: {} as {} ::",
                    run.api_url,
                    dash.session().role()
                )
                .bold()
            );
            shell::run_shell(&mut dash, &store, &ctx).await?;
            if dash.session_expired() {
                return Err(SESSION_EXPIRED.to_string());
            }
            return Ok(());
        }
        Command::Login { .. }
        | Command::Logout
        | Command::Whoami
        | Command::ResetPassword { .. } => {}
    }

    finish(&mut dash, &run, &store).await
}

fn load_run_config(args: CliArgs) -> Result<RunConfig, String> {
    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => {
                if let Err(e) = config::ensure_default_config_file(&path) {
                    tracing::warn!(error = %e, "could not create default config");
                }
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };
    build_run_config(args, cfg)
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);
    let run = load_run_config(args)?;
    tracing::debug!(verbose = run.verbose, "configuration loaded");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_flags_win_over_config() {
        let args = CliArgs::parse_from([
            "riderpay",
            "--api-url",
            "http://cli:9000",
            "--no-color",
            "stats",
        ]);
        let cfg = ConfigFile {
            api_url: Some("http://cfg:8000".to_string()),
            no_color: Some(false),
            ..Default::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.api_url, "http://cli:9000");
        assert!(run.no_color);
    }

    #[test]
    fn config_fills_gaps_then_defaults() {
        let args = CliArgs::parse_from(["riderpay", "payments"]);
        let cfg = ConfigFile {
            session_file: Some("/tmp/rp/session.json".to_string()),
            font_family: Some("DejaVuSans".to_string()),
            ..Default::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.api_url, config::DEFAULT_API_URL);
        assert_eq!(run.session_path, PathBuf::from("/tmp/rp/session.json"));
        assert_eq!(run.fonts.family, "DejaVuSans");
        assert_eq!(run.fonts.dir, PdfFonts::default().dir);
    }

    #[test]
    fn fonts_dir_flag_overrides_config() {
        let args = CliArgs::parse_from(["riderpay", "payments", "--fonts-dir", "/opt/fonts"]);
        let cfg = ConfigFile {
            fonts_dir: Some("/etc/fonts".to_string()),
            ..Default::default()
        };
        let run = build_run_config(args, cfg).unwrap();
        assert_eq!(run.fonts.dir, PathBuf::from("/opt/fonts"));
    }

    #[test]
    fn invalid_arguments_are_rejected_before_running() {
        let args = CliArgs::parse_from(["riderpay", "payments", "--from", "2024-13-01"]);
        assert!(build_run_config(args, ConfigFile::default()).is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let args = CliArgs::parse_from(["riderpay", "logs", "--limit", "20", "-vv"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Logs(logs) => {
                let query = log_query(&logs).unwrap();
                assert_eq!(query.limit, 20);
                assert_eq!(query.skip, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn consecutive_prompts_share_piped_input() {
        let mut input = std::io::Cursor::new("admin\r\nsecret\n".as_bytes());
        assert_eq!(read_answer(&mut input).unwrap(), "admin");
        assert_eq!(read_answer(&mut input).unwrap(), "secret");
        assert_eq!(read_answer(&mut input).unwrap(), "");
    }

    #[test]
    fn only_terminal_secrets_are_hidden() {
        assert_eq!(echo_for(true, true), Echo::Hidden);
        assert_eq!(echo_for(true, false), Echo::Visible);
        assert_eq!(echo_for(false, true), Echo::Visible);
    }

    #[test]
    fn reset_password_takes_token_and_new_password() {
        let args = CliArgs::parse_from(["riderpay", "reset-password", "-t", "rst", "--new", "pw"]);
        let run = build_run_config(args, ConfigFile::default()).unwrap();
        assert!(matches!(
            run.command,
            Command::ResetPassword { token: Some(ref t), .. } if t == "rst"
        ));
    }

    #[test]
    fn payment_flags_build_criteria() {
        let args = PaymentsArgs {
            search: Some("  Ali ".to_string()),
            from: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        let criteria = payments_criteria(&args).unwrap();
        assert_eq!(criteria.term, "  Ali ");
        assert_eq!(criteria.start, chrono::NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(criteria.end, None);
    }
}

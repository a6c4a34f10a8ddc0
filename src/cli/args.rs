use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "riderpay",
    version,
    about = "rider-payment admin dashboard for the terminal",
    long_about = "riderpay talks to the rider-payment API: browse and filter payment rows, export them to CSV or PDF, import new sheets, and manage users and audit logs.\n\nExamples:\n  riderpay login -u admin\n  riderpay payments --search ali --from 2024-01-01 --export csv\n  riderpay users create sam --role user\n  riderpay shell\n\nTip: put api_url in ~/.riderpay/config.yml to keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "no-color",
        visible_alias = "nc",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "config",
        visible_alias = "cfg",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.riderpay/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'a',
        long = "api-url",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "Connection",
        help = "Base URL of the rider-payment API."
    )]
    pub api_url: Option<String>,

    #[arg(
        long = "session-file",
        visible_alias = "sf",
        value_name = "FILE",
        global = true,
        help_heading = "Connection",
        help = "Where the login session is stored (defaults to ~/.riderpay/session.json)."
    )]
    pub session_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(short = 'u', long, value_name = "NAME")]
        username: Option<String>,
        #[arg(short = 'p', long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// Sign out and drop the stored session.
    Logout,
    /// Show who the stored session belongs to.
    #[command(visible_alias = "me")]
    Whoami,
    /// Dashboard summary cards.
    Stats,
    /// List payment rows, optionally filtered and exported.
    #[command(visible_alias = "pay")]
    Payments(PaymentsArgs),
    /// Import the latest payment sheet on the server (admin).
    Import,
    /// Manage users (admin).
    #[command(subcommand)]
    Users(UsersCommand),
    /// Browse the audit log (admin).
    Logs(LogsArgs),
    /// Show the signed-in profile.
    Profile,
    /// Change your password.
    Password {
        #[arg(long, value_name = "PASSWORD")]
        old: Option<String>,
        #[arg(long, value_name = "PASSWORD")]
        new: Option<String>,
    },
    /// Reset a password with a reset token; asks the server for one when
    /// only a username is given.
    #[command(name = "reset-password")]
    ResetPassword {
        #[arg(short = 'u', long, value_name = "NAME")]
        username: Option<String>,
        #[arg(short = 't', long, value_name = "TOKEN")]
        token: Option<String>,
        #[arg(long, value_name = "PASSWORD")]
        new: Option<String>,
    },
    /// Interactive dashboard with panel navigation.
    #[command(visible_alias = "repl")]
    Shell,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PaymentsArgs {
    #[arg(
        short = 's',
        long = "search",
        value_name = "TEXT",
        help_heading = "Filter",
        help = "Match captain id, name or person code (case-insensitive)."
    )]
    pub search: Option<String>,

    #[arg(
        long = "from",
        value_name = "YYYY-MM-DD",
        help_heading = "Filter",
        help = "Earliest import date, inclusive."
    )]
    pub from: Option<String>,

    #[arg(
        long = "to",
        value_name = "YYYY-MM-DD",
        help_heading = "Filter",
        help = "Latest import date, inclusive."
    )]
    pub to: Option<String>,

    #[arg(
        long = "order",
        value_name = "ORDER",
        help_heading = "Filter",
        help = "Row order by serial number, asc or desc (admin listing only)."
    )]
    pub order: Option<String>,

    #[arg(
        short = 'e',
        long = "export",
        value_name = "FORMAT",
        help_heading = "Export",
        help = "Export the visible rows (csv or pdf)."
    )]
    pub export: Option<String>,

    #[arg(
        short = 'o',
        long = "out",
        value_name = "FILE",
        help_heading = "Export",
        help = "Export destination; the format is inferred from the extension."
    )]
    pub out: Option<String>,

    #[arg(
        long = "fonts-dir",
        value_name = "DIR",
        help_heading = "Export",
        help = "Directory holding the PDF font files."
    )]
    pub fonts_dir: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum UsersCommand {
    /// List all users.
    #[command(visible_alias = "ls")]
    List,
    /// Create a user.
    Create {
        username: String,
        #[arg(short = 'p', long, value_name = "PASSWORD")]
        password: Option<String>,
        #[arg(short = 'r', long, default_value = "user")]
        role: String,
    },
    /// Change a user's role.
    Update {
        username: String,
        #[arg(short = 'r', long)]
        role: String,
    },
    /// Delete a user.
    #[command(visible_alias = "rm")]
    Delete {
        username: String,
        #[arg(short = 'y', long, help = "Skip the confirmation prompt.")]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct LogsArgs {
    #[arg(short = 'l', long, value_name = "N", help = "Entries per page (1-500).")]
    pub limit: Option<u32>,

    #[arg(short = 's', long, value_name = "N", help = "Entries to skip.")]
    pub skip: Option<u32>,

    #[arg(short = 'u', long, value_name = "NAME")]
    pub username: Option<String>,

    #[arg(long, value_name = "ACTION", help = "Only entries with this action.")]
    pub action: Option<String>,

    #[arg(long = "from", value_name = "YYYY-MM-DD")]
    pub from: Option<String>,

    #[arg(long = "to", value_name = "YYYY-MM-DD")]
    pub to: Option<String>,
}

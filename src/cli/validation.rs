use crate::cli::args::{CliArgs, Command, UsersCommand};
use crate::engine::parse_date_bound;
use crate::gateway::RiderOrder;
use crate::output::{infer_format_from_path, ExportFormat};

pub const MAX_LOG_LIMIT: u32 = 500;

fn validate_date(flag: &str, raw: Option<&str>) -> Result<(), String> {
    if let Some(raw) = raw {
        parse_date_bound(raw).map_err(|e| format!("invalid --{flag} '{raw}': {e}"))?;
    }
    Ok(())
}

fn validate_role(raw: &str) -> Result<(), String> {
    match raw.trim().to_lowercase().as_str() {
        "admin" | "user" => Ok(()),
        _ => Err(format!("invalid --role '{raw}', expected admin or user")),
    }
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(url) = args.api_url.as_deref() {
        if url.trim().is_empty() {
            return Err("--api-url must not be empty".to_string());
        }
    }

    match &args.command {
        Command::Payments(p) => {
            validate_date("from", p.from.as_deref())?;
            validate_date("to", p.to.as_deref())?;
            if let Some(raw) = p.order.as_deref() {
                if RiderOrder::parse(raw).is_none() {
                    return Err(format!("invalid --order '{raw}', expected asc or desc"));
                }
            }
            if let Some(raw) = p.export.as_deref() {
                let format = ExportFormat::parse(raw)
                    .ok_or_else(|| format!("invalid --export '{raw}', expected csv or pdf"))?;
                if let Some(out) = p.out.as_deref() {
                    if let Some(inferred) = infer_format_from_path(out) {
                        if inferred != format {
                            return Err(format!(
                                "--out '{out}' does not match --export '{raw}'"
                            ));
                        }
                    }
                }
            } else if let Some(out) = p.out.as_deref() {
                if infer_format_from_path(out).is_none() {
                    return Err(format!(
                        "cannot infer export format from '{out}', pass --export csv|pdf"
                    ));
                }
            }
        }
        Command::Logs(l) => {
            validate_date("from", l.from.as_deref())?;
            validate_date("to", l.to.as_deref())?;
            if let Some(limit) = l.limit {
                if limit == 0 || limit > MAX_LOG_LIMIT {
                    return Err(format!(
                        "invalid --limit {limit}, expected 1 to {MAX_LOG_LIMIT}"
                    ));
                }
            }
        }
        Command::Users(UsersCommand::Create { username, role, .. })
        | Command::Users(UsersCommand::Update { username, role }) => {
            if username.trim().is_empty() {
                return Err("username must not be empty".to_string());
            }
            validate_role(role)?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn check(argv: &[&str]) -> Result<(), String> {
        let args = CliArgs::try_parse_from(argv).map_err(|e| e.to_string())?;
        validate(&args)
    }

    #[test]
    fn bad_dates_are_rejected() {
        assert!(check(&["riderpay", "payments", "--from", "2024-02-30"]).is_err());
        assert!(check(&["riderpay", "payments", "--from", "2024-02-01"]).is_ok());
        assert!(check(&["riderpay", "logs", "--to", "yesterday"]).is_err());
    }

    #[test]
    fn export_format_must_agree_with_out() {
        assert!(check(&["riderpay", "payments", "--export", "xlsx"]).is_err());
        assert!(check(&["riderpay", "payments", "-e", "csv", "-o", "a.pdf"]).is_err());
        assert!(check(&["riderpay", "payments", "-o", "a.pdf"]).is_ok());
        assert!(check(&["riderpay", "payments", "-o", "a.dat"]).is_err());
    }

    #[test]
    fn log_limit_is_bounded() {
        assert!(check(&["riderpay", "logs", "--limit", "0"]).is_err());
        assert!(check(&["riderpay", "logs", "--limit", "501"]).is_err());
        assert!(check(&["riderpay", "logs", "--limit", "50"]).is_ok());
    }

    #[test]
    fn roles_are_admin_or_user() {
        assert!(check(&["riderpay", "users", "update", "sam", "--role", "Admin"]).is_ok());
        assert!(check(&["riderpay", "users", "create", "sam", "--role", "root"]).is_err());
    }

    #[test]
    fn rider_order_is_asc_or_desc() {
        assert!(check(&["riderpay", "payments", "--order", "DESC"]).is_ok());
        assert!(check(&["riderpay", "payments", "--order", "newest"]).is_err());
    }
}

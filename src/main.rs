//! px-session binary entry point.

use std::process::ExitCode;

use px_session::cli::{self, Args};
use px_session::{logging, Config, CookieJar, SessionManager};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'px-session --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    logging::try_init_with(config.log_filter()).ok();

    match run(&config, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Serve one counter request against the configured session directory.
fn run(config: &Config, args: &Args) -> px_session::Result<()> {
    let manager = SessionManager::from_settings(config.session.clone())?;
    let cookie_name = &config.session.cookie_name;

    let mut jar = match args.cookie {
        Some(ref value) => CookieJar::with_cookie(cookie_name.as_str(), value.as_str()),
        None => CookieJar::new(),
    };

    let mut session = manager.open(&mut jar)?;
    let count = session.get_or("count", 0)?.as_i64().unwrap_or(0) + 1;
    session.set("count", count)?;
    session.save()?;

    info!(session = %session.id(), new = session.is_new(), "request served");
    drop(session);

    println!("count: {}", count);
    if let Some(cookie) = jar.last_set(cookie_name) {
        println!("Set-Cookie: {}", cookie.header_value());
        println!("cookie: {}", cookie.value);
    }

    Ok(())
}

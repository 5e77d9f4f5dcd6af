//! `labframe` command-line host for the data browser.
//!
//! # Responsibility
//! - Build a `DataBrowser`, apply `--<setting>` overrides and optional INI
//!   files, then hand stdin to the scripting console.
//! - Print load reports as JSON for scripted callers.

use clap::{Arg, ArgAction, ArgMatches, Command};
use labframe_core::app::overrides;
use labframe_core::{
    default_log_level, init_logging, Console, ConsoleHost, DataBrowser, LoadReport,
    SettingAccess, SettingsCollection,
};
use log::{error, info};
use serde_json::{json, Map, Value};
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("labframe: {message}");
            error!("event=cli_exit module=cli status=error error={message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let template = DataBrowser::settings_template().map_err(|err| err.to_string())?;
    let matches = parse_args(std::env::args_os(), &template).map_err(|err| err.to_string())?;

    if let Some(log_dir) = matches.get_one::<String>("log-dir") {
        let level = matches
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir)?;
    }

    let mut browser = start(&matches, &template)?;

    if matches.get_flag("dump") {
        let values = browser.read_settings_ini(None);
        let dump = serde_json::to_string_pretty(&values).map_err(|err| err.to_string())?;
        println!("{dump}");
    }

    if !matches.get_flag("no-console") {
        run_console(&mut browser).map_err(|err| err.to_string())?;
    }

    if let Some(file) = matches.get_one::<PathBuf>("save-ini") {
        let values = browser
            .settings_save_ini(file)
            .map_err(|err| err.to_string())?;
        println!("saved {} settings to {}", values.len(), file.display());
    }
    Ok(())
}

/// Builds the browser once logging is up, then applies `--load-ini` and
/// the per-setting overrides, in that order.
fn start(matches: &ArgMatches, template: &SettingsCollection) -> Result<DataBrowser, String> {
    let mut browser = DataBrowser::new().map_err(|err| err.to_string())?;

    if let Some(file) = matches.get_one::<PathBuf>("load-ini") {
        let report = browser
            .settings_load_ini(file)
            .map_err(|err| err.to_string())?;
        println!("{}", load_report_json(&report));
    }

    let applied = overrides::apply_matches(&mut browser, template, matches)
        .map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok overrides={}",
        applied.len()
    );
    Ok(browser)
}

fn command() -> Command {
    Command::new("labframe")
        .version(labframe_core::core_version())
        .about("Headless data browser with path-addressed settings")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("trace|debug|info|warn|error"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .help("Absolute directory for rolling log files"),
        )
        .arg(
            Arg::new("load-ini")
                .long("load-ini")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Load settings from an INI file before overrides"),
        )
        .arg(
            Arg::new("save-ini")
                .long("save-ini")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Save all settings to an INI file on exit"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .action(ArgAction::SetTrue)
                .help("Print every setting as JSON"),
        )
        .arg(
            Arg::new("no-console")
                .long("no-console")
                .action(ArgAction::SetTrue)
                .help("Skip the interactive console"),
        )
}

fn load_report_json(report: &LoadReport) -> Value {
    let writes: Map<String, Value> = report
        .writes
        .iter()
        .map(|(path, result)| {
            let outcome = match result {
                Ok(write) => json!(write),
                Err(err) => json!({ "error": err.to_string() }),
            };
            (path.clone(), outcome)
        })
        .collect();
    json!({
        "values": report.values,
        "writes": writes,
        "applied": report.applied(),
    })
}

fn run_console<H: ConsoleHost>(host: &mut H) -> io::Result<()> {
    let mut console = Console::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", Console::banner(host))?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }
        match console.execute(host, &line) {
            Ok(reply) if reply.is_empty() => {}
            Ok(reply) => writeln!(stdout, "{reply}")?,
            Err(err) => writeln!(stdout, "error: {err}")?,
        }
    }
    Ok(())
}

fn parse_args<I, T>(args: I, app_settings: &SettingsCollection) -> Result<ArgMatches, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    command()
        .args(overrides::settings_args(app_settings))
        .try_get_matches_from(args)
}

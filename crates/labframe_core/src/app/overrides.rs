//! Command-line overrides for app settings.
//!
//! Every app setting becomes a `--<name> <value>` option; given values are
//! written through the unprotected tier before the app starts.

use super::error::AppResult;
use crate::access::SettingAccess;
use crate::setting::SettingsCollection;
use clap::{Arg, ArgMatches, Command};
use log::info;

/// One optional `--<name> <VALUE>` argument per setting in `collection`.
pub fn settings_args(collection: &SettingsCollection) -> Vec<Arg> {
    collection
        .settings()
        .into_iter()
        .map(|setting| {
            let name = setting.name().to_string();
            let mut arg = Arg::new(name.clone())
                .long(name)
                .num_args(1)
                .value_name(setting.kind().label().to_ascii_uppercase());
            if !setting.description().is_empty() {
                arg = arg.help(setting.description().to_string());
            }
            arg
        })
        .collect()
}

/// Writes every value present in `matches` to the matching setting of
/// `collection`. Returns the paths written, in declaration order.
pub fn apply_matches<A: SettingAccess>(
    target: &mut A,
    collection: &SettingsCollection,
    matches: &ArgMatches,
) -> AppResult<Vec<String>> {
    let mut applied = Vec::new();
    for setting in collection.settings() {
        let Ok(Some(raw)) = matches.try_get_one::<String>(setting.name()) else {
            continue;
        };
        target.write_setting(setting.path(), raw.as_str())?;
        info!(
            "event=cli_override module=app path={} value={}",
            setting.path(),
            raw
        );
        applied.push(setting.path().to_string());
    }
    Ok(applied)
}

/// Parses `args` (program name first) against `collection` and applies
/// the overrides.
pub fn apply_cli_overrides<A, I, T>(
    target: &mut A,
    command_name: &str,
    collection: &SettingsCollection,
    args: I,
) -> AppResult<Vec<String>>
where
    A: SettingAccess,
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = Command::new(command_name.to_string())
        .args(settings_args(collection))
        .try_get_matches_from(args)?;
    apply_matches(target, collection, &matches)
}

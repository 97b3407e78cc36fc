//! Global option extraction
//!
//! Global options may appear anywhere on the command line, before or
//! after the subcommand and its own flags. Rather than teach every
//! subcommand about them, argv is scanned once up front: recognised
//! globals are pulled into a flat [`GlobalOptions`] map and everything
//! else is handed on, in order, to the subcommand parser.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// The options accepted anywhere on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlobalOpt {
    Server,
    Account,
    Folder,
    Timeout,
    Json,
}

struct GlobalDef {
    long: &'static str,
    short: Option<&'static str>,
    opt: GlobalOpt,
    takes_value: bool,
}

const GLOBALS: &[GlobalDef] = &[
    GlobalDef {
        long: "--server",
        short: None,
        opt: GlobalOpt::Server,
        takes_value: true,
    },
    GlobalDef {
        long: "--account",
        short: Some("-a"),
        opt: GlobalOpt::Account,
        takes_value: true,
    },
    GlobalDef {
        long: "--folder",
        short: Some("-f"),
        opt: GlobalOpt::Folder,
        takes_value: true,
    },
    GlobalDef {
        long: "--timeout",
        short: None,
        opt: GlobalOpt::Timeout,
        takes_value: true,
    },
    GlobalDef {
        long: "--json",
        short: None,
        opt: GlobalOpt::Json,
        takes_value: false,
    },
];

/// Subcommand options whose next token is a value, never an option.
const LOCAL_VALUE_OPTS: &[&str] = &[
    "--to",
    "--cc",
    "--subject",
    "-s",
    "--body",
    "-b",
    "--attach",
    "--limit",
    "-n",
    "--days",
    "-d",
];

/// Globals found on the command line. A repeated option keeps its last
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions(BTreeMap<GlobalOpt, String>);

impl GlobalOptions {
    #[must_use]
    pub fn get(&self, opt: GlobalOpt) -> Option<&str> {
        self.0.get(&opt).map(String::as_str)
    }

    #[must_use]
    pub fn flag(&self, opt: GlobalOpt) -> bool {
        self.0.contains_key(&opt)
    }

    fn set(&mut self, opt: GlobalOpt, value: String) {
        self.0.insert(opt, value);
    }
}

/// Split argv (without the program name) into globals and the rest.
///
/// A bare `--` stops the scan; it and everything after it are passed
/// through untouched.
///
/// # Errors
///
/// Returns [`Error::Usage`] when a value-taking global is the last
/// token.
pub fn split_globals<I, S>(args: I) -> Result<(GlobalOptions, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut globals = GlobalOptions::default();
    let mut rest = Vec::new();
    let mut tokens = args.into_iter().map(Into::into);

    while let Some(token) = tokens.next() {
        if token == "--" {
            rest.push(token);
            rest.extend(tokens.by_ref());
            break;
        }

        if let Some((def, inline)) = match_global(&token) {
            if !def.takes_value {
                globals.set(def.opt, String::new());
                continue;
            }
            let value = match inline {
                Some(v) => v.to_string(),
                None => tokens
                    .next()
                    .ok_or_else(|| Error::Usage(format!("{} requires a value", def.long)))?,
            };
            globals.set(def.opt, value);
            continue;
        }

        let takes_value = LOCAL_VALUE_OPTS.contains(&token.as_str());
        rest.push(token);
        if takes_value && let Some(value) = tokens.next() {
            rest.push(value);
        }
    }

    Ok((globals, rest))
}

fn match_global(token: &str) -> Option<(&'static GlobalDef, Option<&str>)> {
    GLOBALS.iter().find_map(|def| {
        if token == def.long || def.short == Some(token) {
            return Some((def, None));
        }
        let inline = token
            .strip_prefix(def.long)
            .and_then(|r| r.strip_prefix('='))
            .filter(|_| def.takes_value);
        inline.map(|v| (def, Some(v)))
    })
}

//! Module `commands`
//!
//! Defines the FTP verb table and the verb/argument split applied to every
//! line read from the control connection. Verb matching is case-insensitive,
//! exact (no prefix matching, no abbreviation), via a static table keyed by
//! the normalized verb.

use std::collections::HashMap;
use std::sync::LazyLock;

/// FTP verbs the dispatcher knows about.
///
/// `User` and `Pass` are only meaningful to the authentication controller;
/// once logged in they fall through to "Command not implemented" like any
/// unknown verb. `Unknown` covers everything not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    User,
    Pass,
    Pasv,
    Port,
    Syst,
    Quit,
    Abor,
    Rmd,
    Mkd,
    Pwd,
    Cwd,
    Cdup,
    Rnfr,
    Rnto,
    Type,
    Retr,
    Stor,
    Dele,
    Stou,
    List,
    Feat,
    Appe,
    Site,
    Allo,
    Rein,
    Acct,
    Smnt,
    #[default]
    Unknown,
}

/// Static mapping from normalized (uppercased) verb to `Verb`.
static VERB_TABLE: LazyLock<HashMap<&'static str, Verb>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    table.insert("USER", Verb::User);
    table.insert("PASS", Verb::Pass);
    table.insert("PASV", Verb::Pasv);
    table.insert("PORT", Verb::Port);
    table.insert("SYST", Verb::Syst);
    table.insert("QUIT", Verb::Quit);
    table.insert("ABOR", Verb::Abor);
    table.insert("RMD", Verb::Rmd);
    table.insert("MKD", Verb::Mkd);
    table.insert("PWD", Verb::Pwd);
    table.insert("CWD", Verb::Cwd);
    table.insert("CDUP", Verb::Cdup);
    table.insert("RNFR", Verb::Rnfr);
    table.insert("RNTO", Verb::Rnto);
    table.insert("TYPE", Verb::Type);
    table.insert("RETR", Verb::Retr);
    table.insert("STOR", Verb::Stor);
    table.insert("DELE", Verb::Dele);
    table.insert("STOU", Verb::Stou);
    table.insert("LIST", Verb::List);
    table.insert("FEAT", Verb::Feat);
    table.insert("APPE", Verb::Appe);
    table.insert("SITE", Verb::Site);
    table.insert("ALLO", Verb::Allo);
    table.insert("REIN", Verb::Rein);
    table.insert("ACCT", Verb::Acct);
    table.insert("SMNT", Verb::Smnt);
    table
});

/// One verb/argument pair read from the control connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Resolved table entry, `Verb::Unknown` if not in the table
    pub verb: Verb,
    /// Uppercased verb text as received, kept for logging and canned replies
    pub name: String,
    /// Argument with surrounding whitespace trimmed; empty when absent
    pub arg: String,
}

/// Splits a raw command line into verb and argument and resolves the verb
/// against the table. Argument presence/absence is each handler's concern,
/// not the parser's.
pub fn parse_command(raw: &str) -> ParsedCommand {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim().to_string();

    let verb = VERB_TABLE.get(name.as_str()).copied().unwrap_or(Verb::Unknown);

    ParsedCommand { verb, name, arg }
}

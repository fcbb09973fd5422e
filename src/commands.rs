/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// DART operation the command's view serves, by registry id
  pub operation: Option<&'static str>,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "disclosures",
    aliases: &["d", "list", "filings"],
    description: "Search disclosures",
    operation: Some("disclosureList"),
  },
  Command {
    name: "financials",
    aliases: &["f", "fin", "accounts"],
    description: "Key accounts of a periodic report",
    operation: Some("financialInfo"),
  },
  Command {
    name: "main",
    aliases: &["m", "statements", "full"],
    description: "Full financial statements",
    operation: Some("mainInfo"),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit dartdash",
    operation: None,
  },
];

/// Find a command by its name
pub fn find(name: &str) -> Option<&'static Command> {
  COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Get autocomplete suggestions for a given input
///
/// Ranked: exact name, exact alias, name prefix, alias prefix, name
/// substring, alias substring.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable, so ties keep declaration order
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn match_rank(cmd: &Command, input: &str) -> Option<u8> {
  let aliases = || cmd.aliases.iter();

  if cmd.name == input {
    Some(0)
  } else if aliases().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if aliases().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

//! Commands of the interactive flight browser, and their parsing.

use thiserror::Error;

use crate::api::types::FlightForm;
use crate::filters::FilterUpdate;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "next",
    aliases: &["n"],
    usage: "next",
    description: "Next page",
  },
  Command {
    name: "prev",
    aliases: &["p", "previous"],
    usage: "prev",
    description: "Previous page",
  },
  Command {
    name: "page",
    aliases: &["g", "goto"],
    usage: "page <n>",
    description: "Jump to a page",
  },
  Command {
    name: "filter",
    aliases: &["f"],
    usage: "filter key=value ... (number, from-date, to-date, from-country, from-city, to-country, to-city, per-page)",
    description: "Narrow the list; an empty value clears a key",
  },
  Command {
    name: "reset",
    aliases: &["r", "clear"],
    usage: "reset",
    description: "Clear all filters",
  },
  Command {
    name: "reload",
    aliases: &["l", "refresh"],
    usage: "reload",
    description: "Refetch the current page",
  },
  Command {
    name: "add",
    aliases: &["a", "new"],
    usage: "add key=value ... (number, date, from-country, from-city, to-country, to-city)",
    description: "Register a flight",
  },
  Command {
    name: "edit",
    aliases: &["e", "change"],
    usage: "edit <id> key=value ...",
    description: "Change a flight on the current page",
  },
  Command {
    name: "delete",
    aliases: &["d", "rm"],
    usage: "delete <id>",
    description: "Delete a flight on the current page",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "List commands",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit flightdesk",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unknown command '{0}', try 'help'")]
  Unknown(String),
  #[error("usage: {0}")]
  Usage(&'static str),
  #[error("unknown field '{0}'")]
  UnknownField(String),
  #[error("{field}: '{value}' is not a number")]
  NotANumber { field: String, value: String },
}

/// A parsed browser command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  Next,
  Prev,
  Page(u32),
  Filter(FilterUpdate),
  Reset,
  Reload,
  Add(FormPatch),
  Edit(u64, FormPatch),
  Delete(u64),
  Help,
  Quit,
}

/// Field assignments to lay over a flight form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPatch(Vec<(String, String)>);

impl FormPatch {
  /// Add an assignment; later assignments to the same key win.
  pub fn set(mut self, key: &str, value: impl ToString) -> Self {
    self.0.push((key.to_string(), value.to_string()));
    self
  }

  pub fn apply(&self, form: &mut FlightForm) -> Result<(), ParseError> {
    for (key, value) in &self.0 {
      match key.as_str() {
        "number" => form.flight_number = value.clone(),
        "date" => form.flight_date = value.clone(),
        "from-country" => {
          let id = number(key, value)?;
          if id != form.from_country_id {
            form.from_city_id = 0;
          }
          form.from_country_id = id;
        }
        "from-city" => form.from_city_id = number(key, value)?,
        "to-country" => {
          let id = number(key, value)?;
          if id != form.to_country_id {
            form.to_city_id = 0;
          }
          form.to_country_id = id;
        }
        "to-city" => form.to_city_id = number(key, value)?,
        _ => return Err(ParseError::UnknownField(key.clone())),
      }
    }
    Ok(())
  }
}

fn number<T: std::str::FromStr + Default>(field: &str, value: &str) -> Result<T, ParseError> {
  if value.is_empty() {
    return Ok(T::default());
  }
  value.parse().map_err(|_| ParseError::NotANumber {
    field: field.to_string(),
    value: value.to_string(),
  })
}

fn pairs<'a>(args: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
  args
    .map(|arg| match arg.split_once('=') {
      Some((k, v)) => (k.to_lowercase(), v.to_string()),
      None => (arg.to_lowercase(), String::new()),
    })
    .collect()
}

fn filter_update(args: Vec<(String, String)>) -> Result<FilterUpdate, ParseError> {
  let mut update = FilterUpdate::default();
  for (key, value) in args {
    match key.as_str() {
      "number" => update.flight_number = Some(value),
      "from-date" => update.from_date = Some(value),
      "to-date" => update.to_date = Some(value),
      "from-country" => update.from_country_id = Some(number(&key, &value)?),
      "from-city" => update.from_city_id = Some(number(&key, &value)?),
      "to-country" => update.to_country_id = Some(number(&key, &value)?),
      "to-city" => update.to_city_id = Some(number(&key, &value)?),
      "per-page" => update.per_page = Some(number(&key, &value)?),
      _ => return Err(ParseError::UnknownField(key)),
    }
  }
  Ok(update)
}

/// Parse one input line. Command names resolve by name, alias or prefix.
pub fn parse(line: &str) -> Result<Action, ParseError> {
  let mut words = line.split_whitespace();
  let Some(word) = words.next() else {
    return Err(ParseError::Unknown(String::new()));
  };
  let command = get_suggestions(word)
    .into_iter()
    .next()
    .ok_or_else(|| ParseError::Unknown(word.to_string()))?;

  let id = |arg: Option<&str>| -> Result<u64, ParseError> {
    arg
      .and_then(|a| a.parse().ok())
      .filter(|id| *id > 0)
      .ok_or(ParseError::Usage(command.usage))
  };

  Ok(match command.name {
    "next" => Action::Next,
    "prev" => Action::Prev,
    "page" => Action::Page(
      words
        .next()
        .and_then(|a| a.parse().ok())
        .filter(|p| *p > 0)
        .ok_or(ParseError::Usage(command.usage))?,
    ),
    "filter" => Action::Filter(filter_update(pairs(words))?),
    "reset" => Action::Reset,
    "reload" => Action::Reload,
    "add" => Action::Add(FormPatch(pairs(words))),
    "edit" => {
      let id = id(words.next())?;
      Action::Edit(id, FormPatch(pairs(words)))
    }
    "delete" => Action::Delete(id(words.next())?),
    "help" => Action::Help,
    _ => Action::Quit,
  })
}

mod api;
mod app;
mod cache;
mod commands;
mod config;
mod console;
mod dictionaries;
mod editor;
mod event;
mod filters;
mod guard;
mod logging;
mod mutations;
mod query;
mod render;
mod session;
#[cfg(test)]
mod test_support;
mod validation;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};

use api::types::Flight;
use commands::FormPatch;
use console::{Console, LoginError};
use editor::SubmitError;
use filters::{FilterUpdate, FlightFilter};
use guard::RequestError;
use session::{FileTokenStore, Session};

#[derive(Parser, Debug)]
#[command(name = "flightdesk")]
#[command(about = "Command-line admin console for flight records")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/flightdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log to stderr at debug level instead of the log file
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Authenticate and keep the session token
  Login {
    /// Account email
    #[arg(short, long)]
    user: String,
  },
  /// Forget the session token
  Logout,
  /// List and change flights
  #[command(subcommand)]
  Flights(FlightsCommand),
  /// List countries
  Countries {
    /// Only countries allowed in this direction
    #[arg(long, value_enum)]
    direction: Option<Direction>,
  },
  /// List cities
  Cities {
    /// Only cities of this country
    #[arg(long)]
    country: Option<u64>,
    /// Only cities allowed in this direction (requires --country)
    #[arg(long, value_enum, requires = "country")]
    direction: Option<Direction>,
  },
  /// Page through flights interactively
  Browse {
    /// Starting query string, e.g. "fromCountryId=5&page=2"
    #[arg(long, default_value = "")]
    query: String,
  },
}

#[derive(Subcommand, Debug)]
enum FlightsCommand {
  /// Print one page of flights
  List {
    /// Query string to start from; flags below are applied on top
    #[arg(long)]
    query: Option<String>,
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long)]
    page: Option<u32>,
  },
  /// Register a flight
  Add {
    #[command(flatten)]
    form: FormArgs,
  },
  /// Change a flight; omitted fields keep their current value
  Edit {
    id: u64,
    #[command(flatten)]
    form: FormArgs,
  },
  /// Delete a flight
  Delete { id: u64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Direction {
  From,
  To,
}

#[derive(ClapArgs, Debug)]
struct FilterArgs {
  #[arg(long)]
  flight_number: Option<String>,
  /// YYYY-MM-DD
  #[arg(long)]
  from_date: Option<String>,
  /// YYYY-MM-DD
  #[arg(long)]
  to_date: Option<String>,
  #[arg(long)]
  from_country: Option<u64>,
  #[arg(long)]
  from_city: Option<u64>,
  #[arg(long)]
  to_country: Option<u64>,
  #[arg(long)]
  to_city: Option<u64>,
  #[arg(long)]
  per_page: Option<u32>,
}

impl FilterArgs {
  fn update(self) -> FilterUpdate {
    FilterUpdate {
      flight_number: self.flight_number,
      from_date: self.from_date,
      to_date: self.to_date,
      from_country_id: self.from_country,
      from_city_id: self.from_city,
      to_country_id: self.to_country,
      to_city_id: self.to_city,
      per_page: self.per_page,
    }
  }
}

#[derive(ClapArgs, Debug)]
struct FormArgs {
  #[arg(long)]
  number: Option<String>,
  /// YYYY-MM-DD HH:MM[:SS]
  #[arg(long)]
  date: Option<String>,
  #[arg(long)]
  from_country: Option<u64>,
  #[arg(long)]
  from_city: Option<u64>,
  #[arg(long)]
  to_country: Option<u64>,
  #[arg(long)]
  to_city: Option<u64>,
}

impl FormArgs {
  fn patch(self) -> FormPatch {
    // Countries before cities: changing a country clears its city
    let mut patch = FormPatch::default();
    let fields: [(&str, Option<String>); 6] = [
      ("number", self.number),
      ("date", self.date),
      ("from-country", self.from_country.map(|v| v.to_string())),
      ("from-city", self.from_city.map(|v| v.to_string())),
      ("to-country", self.to_country.map(|v| v.to_string())),
      ("to-city", self.to_city.map(|v| v.to_string())),
    ];
    for (key, value) in fields {
      if let Some(value) = value {
        patch = patch.set(key, value);
      }
    }
    patch
  }
}

/// Turn a request failure into a user-facing error.
fn request<T>(result: std::result::Result<T, RequestError>) -> Result<T> {
  result.map_err(|e| match e {
    RequestError::LoginRequired => eyre!("Not logged in or session expired. Run `flightdesk login`."),
    RequestError::Failed { message, .. } => eyre!(message),
  })
}

fn read_password() -> Result<String> {
  if let Some(password) = config::Config::get_password() {
    return Ok(password);
  }
  print!("Password: ");
  std::io::stdout().flush()?;
  let mut line = String::new();
  std::io::stdin().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Look a flight up by id across the unfiltered list.
async fn find_flight(console: &Console, id: u64) -> Result<Flight> {
  let mut filter = FlightFilter::new(100);
  loop {
    let page = request(console.flights(&filter).await)?;
    if let Some(flight) = page.flights.iter().find(|f| f.id == id) {
      return Ok(flight.clone());
    }
    if !page.has_next() {
      return Err(eyre!("Flight {} not found", id));
    }
    filter.page += 1;
  }
}

async fn submit(console: &Console, editing: Option<Flight>, form: FormArgs) -> Result<()> {
  let mut editor = console.editor();
  match editing {
    Some(flight) => editor.open_edit(flight),
    None => editor.open_add(),
  }

  let mut values = editor.initial_form();
  form.patch().apply(&mut values)?;
  match editor.submit(&values).await {
    Ok(ack) => {
      println!("{}", ack.message);
      Ok(())
    }
    Err(SubmitError::Request(RequestError::LoginRequired)) => {
      request::<()>(Err(RequestError::LoginRequired))
    }
    Err(e) => Err(eyre!(editor.form_error().unwrap_or_else(|| e.to_string()))),
  }
}

async fn flights(console: &Console, command: FlightsCommand) -> Result<()> {
  match command {
    FlightsCommand::List { query, filter, page } => {
      let update = filter.update();
      update.validate()?;

      let mut sync = console.filter_sync(query.as_deref().unwrap_or_default());
      if !update.is_empty() {
        let location = sync.apply(&update);
        sync.sync(&location);
      }
      if let Some(page) = page {
        let location = sync.change_page(page);
        sync.sync(&location);
      }

      let (countries, cities) = tokio::join!(console.countries(), console.cities());
      let countries = request(countries)?;
      let cities = request(cities)?;
      let page = request(console.flights(sync.filter()).await)?;
      println!("{}", render::flights_page(&page, &countries, &cities));
      let location = sync.location();
      if !location.is_empty() {
        println!("query: {}", location);
      }
      Ok(())
    }
    FlightsCommand::Add { form } => submit(console, None, form).await,
    FlightsCommand::Edit { id, form } => {
      let flight = find_flight(console, id).await?;
      if !flight.can_edit() {
        return Err(eyre!("Flight {} cannot be edited", id));
      }
      submit(console, Some(flight), form).await
    }
    FlightsCommand::Delete { id } => {
      let ack = request(console.mutations().delete(id).await)?;
      println!("{}", ack.message);
      Ok(())
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let store = match &config.token_file {
    Some(path) => FileTokenStore::new(path),
    None => FileTokenStore::open_default()?,
  };
  let (session, session_events) = Session::with_events(store);
  let mut console = Console::new(&config.api.url, session, config.per_page)
    .map_err(|e| eyre!("Invalid API URL {}: {}", config.api.url, e))?;
  if let Some(secs) = config.stale_after_secs {
    console = console.with_stale_time(Duration::from_secs(secs));
  }

  match args.command {
    Command::Login { user } => {
      let password = read_password()?;
      match console.login(&user, &password).await {
        Ok(user) => println!("Logged in as {}", user.user_name),
        Err(LoginError::Request(e)) => return request(Err(e)),
        Err(e) => return Err(eyre!("Login failed: {}", e)),
      }
    }
    Command::Logout => {
      console.logout()?;
      println!("Logged out");
    }
    Command::Flights(command) => flights(&console, command).await?,
    Command::Countries { direction } => {
      let countries = request(console.countries().await)?;
      let shown: Vec<_> = match direction {
        Some(Direction::From) => dictionaries::from_countries(&countries),
        Some(Direction::To) => dictionaries::to_countries(&countries),
        None => countries.iter().collect(),
      };
      let shown: Vec<_> = shown.into_iter().cloned().collect();
      println!("{}", render::countries(&shown));
    }
    Command::Cities { country, direction } => {
      let cities = request(console.cities().await)?;
      let shown: Vec<_> = match direction {
        Some(Direction::From) => dictionaries::from_cities(&cities, country),
        Some(Direction::To) => dictionaries::to_cities(&cities, country),
        None => cities
          .iter()
          .filter(|c| country.map_or(true, |id| c.country_id == id))
          .collect(),
      };
      let shown: Vec<_> = shown.into_iter().cloned().collect();
      println!("{}", render::cities(&shown));
    }
    Command::Browse { query } => {
      let mut app = app::App::new(console, &config.api.url, &query);
      app.run(session_events).await?;
    }
  }

  Ok(())
}

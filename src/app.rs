use std::fmt::Display;
use std::io::{Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tokio::sync::mpsc;

use crate::api::types::{City, Country, Flight, FlightsPage};
use crate::commands::{self, Action, FormPatch, COMMANDS};
use crate::console::Console;
use crate::editor::FlightEditor;
use crate::event::{Event, EventHandler};
use crate::filters::{FilterSync, FlightFilter};
use crate::guard::{intercept, RequestError};
use crate::mutations::MutationState;
use crate::query::ListQuery;
use crate::render;
use crate::session::SessionEvent;

/// Interactive flight browser
pub struct App<W: Write = Stdout> {
  console: Console,
  api_url: String,
  sync: FilterSync,
  query: ListQuery<FlightFilter, FlightsPage>,
  editor: FlightEditor,
  countries: Arc<Vec<Country>>,
  cities: Arc<Vec<City>>,
  out: W,
  should_quit: bool,
}

impl App {
  pub fn new(console: Console, api_url: &str, location: &str) -> Self {
    Self::with_output(console, api_url, location, std::io::stdout())
  }
}

impl<W: Write> App<W> {
  pub fn with_output(console: Console, api_url: &str, location: &str, out: W) -> Self {
    Self {
      sync: console.filter_sync(location),
      query: console.flights_query(),
      editor: console.editor(),
      console,
      api_url: api_url.to_string(),
      countries: Arc::default(),
      cities: Arc::default(),
      out,
      should_quit: false,
    }
  }

  pub async fn run(&mut self, session_events: mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    if !self.start().await {
      return Ok(());
    }

    let mut events = EventHandler::new(Duration::from_millis(100), session_events);

    while !self.should_quit {
      match events.next().await {
        Some(event) => self.handle_event(event).await,
        None => break,
      }
    }

    Ok(())
  }

  /// Load dictionaries and the first page. Returns `false` without a session.
  async fn start(&mut self) -> bool {
    if self.console.require_session().is_err() {
      self.emit("Not logged in. Run `flightdesk login` first.");
      return false;
    }

    self.load_dictionaries().await;
    self.query.set_params(self.sync.filter().clone());
    self.query.settled().await;
    self.on_settled();
    true
  }

  async fn load_dictionaries(&mut self) {
    let (countries, cities) = tokio::join!(self.console.countries(), self.console.cities());
    match countries {
      Ok(list) => self.countries = list,
      Err(e) => self.emit(format!("Could not load countries: {}", e)),
    }
    match cities {
      Ok(list) => self.cities = list,
      Err(e) => self.emit(format!("Could not load cities: {}", e)),
    }
  }

  async fn handle_event(&mut self, event: Event) {
    match event {
      Event::Tick => {
        if self.query.poll() {
          self.on_settled();
        }
      }
      Event::Line(line) => {
        if line.trim().is_empty() {
          self.prompt();
          return;
        }
        match commands::parse(&line) {
          Ok(action) => self.execute(action).await,
          Err(e) => self.say(e),
        }
      }
      Event::Eof => self.should_quit = true,
      Event::Session(SessionEvent::LoginRequired) => {
        self.emit("Session expired. Run `flightdesk login` to continue.");
        self.should_quit = true;
      }
    }
  }

  fn on_settled(&mut self) {
    let failure = self
      .query
      .error()
      .map(|err| intercept(self.console.session(), "list flights", err));
    match failure {
      // The session event ends the loop
      Some(RequestError::LoginRequired) => return,
      Some(RequestError::Failed { message, .. }) => self.emit(format!("Error: {}", message)),
      None => {}
    }
    self.draw();
  }

  fn draw(&mut self) {
    if let Some(page) = self.query.data() {
      let table = format!(
        "{}\n{}",
        render::header(&self.api_url, self.sync.filter()),
        render::flights_page(page, &self.countries, &self.cities)
      );
      let stale = self.query.is_placeholder();
      self.emit(table);
      if stale {
        self.emit("(previous page shown)");
      }
    }
    self.prompt();
  }

  fn prompt(&mut self) {
    let prompt = if self.query.is_fetching() { "(loading) > " } else { "> " };
    let _ = write!(self.out, "{}", prompt);
    let _ = self.out.flush();
  }

  /// Follow `location` if it changes the filter.
  fn navigate(&mut self, location: String) {
    if self.sync.sync(&location) {
      self.query.set_params(self.sync.filter().clone());
      self.prompt();
    } else {
      self.say("(unchanged)");
    }
  }

  fn current_flight(&self, id: u64) -> Option<Flight> {
    self
      .query
      .data()
      .and_then(|page| page.flights.iter().find(|f| f.id == id).cloned())
  }

  async fn execute(&mut self, action: Action) {
    match action {
      Action::Next => {
        let next = self
          .query
          .data()
          .filter(|page| page.has_next())
          .map(|page| page.current_page + 1);
        match next {
          Some(page) => self.navigate(self.sync.change_page(page)),
          None => self.say("No next page."),
        }
      }
      Action::Prev => {
        let page = self.sync.filter().page;
        if page > 1 {
          self.navigate(self.sync.change_page(page - 1));
        } else {
          self.say("Already on the first page.");
        }
      }
      Action::Page(page) => self.navigate(self.sync.change_page(page)),
      Action::Filter(update) => match update.validate() {
        Ok(()) => self.navigate(self.sync.apply(&update)),
        Err(e) => self.say(e),
      },
      Action::Reset => self.navigate(self.sync.reset()),
      Action::Reload => {
        self.query.refetch();
        self.prompt();
      }
      Action::Add(patch) => {
        self.editor.open_add();
        self.submit(patch).await;
      }
      Action::Edit(id, patch) => match self.current_flight(id) {
        Some(flight) if flight.can_edit() => {
          self.editor.open_edit(flight);
          self.submit(patch).await;
        }
        Some(_) => self.say("That flight cannot be edited."),
        None => self.say("No such flight on this page."),
      },
      Action::Delete(id) => match self.current_flight(id) {
        Some(flight) if flight.can_delete() => match self.console.mutations().delete(id).await {
          Ok(ack) => {
            self.emit(ack.message);
            self.query.refetch();
            self.prompt();
          }
          Err(RequestError::LoginRequired) => {}
          Err(e) => self.say(e),
        },
        Some(_) => self.say("That flight cannot be deleted."),
        None => self.say("No such flight on this page."),
      },
      Action::Help => {
        for cmd in COMMANDS {
          self.emit(format!("  {:<8} {}  ({})", cmd.name, cmd.description, cmd.usage));
        }
        self.prompt();
      }
      Action::Quit => self.should_quit = true,
    }
  }

  async fn submit(&mut self, patch: FormPatch) {
    let mut form = self.editor.initial_form();
    if let Err(e) = patch.apply(&mut form) {
      self.editor.close();
      self.say(e);
      return;
    }

    let target = self.editor.editing().map(|f| f.id);
    match self.editor.submit(&form).await {
      Ok(ack) => {
        self.emit(ack.message);
        self.query.refetch();
        self.prompt();
      }
      // The session event ends the loop
      Err(_) if self.editor.mutation().state() == &MutationState::Unauthorized => {
        self.editor.close();
      }
      Err(_) => {
        let message = self.editor.form_error().unwrap_or_default();
        if self.editor.is_open() {
          self.editor.close();
        }
        match target {
          Some(id) => self.say(format!("Flight {}: {}", id, message)),
          None => self.say(message),
        }
      }
    }
  }

  fn emit(&mut self, message: impl Display) {
    let _ = writeln!(self.out, "{}", message);
  }

  fn say(&mut self, message: impl Display) {
    self.emit(message);
    self.prompt();
  }
}

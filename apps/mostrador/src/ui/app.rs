use std::io;
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::CatalogClient;
use crate::ui::manager::{self, CatalogEvent, CatalogRequest, Focus, ProductManager};
use crate::ui::view;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

enum AppEvent {
    Input(Event),
    Catalog(CatalogEvent),
}

/// Bring up the terminal, run the screen until the user quits, and restore
/// the terminal even when the loop fails.
pub async fn run(client: CatalogClient) -> Result<(), UiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor().ok();

    let run_result = App::new(client).event_loop(&mut terminal).await;
    let teardown_result = teardown(&mut terminal);
    debug!(target = "mostrador::ui", "event loop stopped");

    match (run_result, teardown_result) {
        (Err(err), _) => Err(err),
        (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn teardown(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<(), UiError> {
    terminal.show_cursor().ok();
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Reads crossterm events on a dedicated thread; the loop owns the receiver.
/// The thread exits once the receiver is gone.
fn spawn_input_pump(tx: UnboundedSender<AppEvent>) {
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if tx.send(AppEvent::Input(ev)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(target = "mostrador::ui", error = %err, "input read failed");
                    break;
                }
            }
        }
    });
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct App {
    manager: ProductManager,
    client: CatalogClient,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
}

impl App {
    fn new(client: CatalogClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            manager: ProductManager::new(),
            client,
            tx,
            rx,
        }
    }

    async fn event_loop(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), UiError> {
        spawn_input_pump(self.tx.clone());
        // The screen's mount effect: fetch the list once on startup.
        self.spawn_request(CatalogRequest::List);
        debug!(target = "mostrador::ui", "event loop started");

        loop {
            self.manager.expire_messages();
            terminal.draw(|frame| view::draw(frame, &self.manager))?;

            let deadline = self.manager.next_message_deadline();
            let event = tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(event) => event,
                    None => return Ok(()),
                },
                _ = sleep_until_or_forever(deadline) => continue,
            };

            match event {
                AppEvent::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if self.handle_key(key) {
                        return Ok(());
                    }
                }
                AppEvent::Input(_) => {}
                AppEvent::Catalog(event) => {
                    if let Some(request) = self.manager.apply(event) {
                        self.spawn_request(request);
                    }
                }
            }
        }
    }

    /// Returns true when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        match key.code {
            KeyCode::Tab => {
                self.manager.focus = self.manager.focus.next();
                return false;
            }
            KeyCode::BackTab => {
                self.manager.focus = self.manager.focus.prev();
                return false;
            }
            KeyCode::Esc => {
                self.manager.cancel_edit();
                return false;
            }
            _ => {}
        }

        if self.manager.focus == Focus::List {
            match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Up => self.manager.select_prev(),
                KeyCode::Down => self.manager.select_next(),
                KeyCode::Enter | KeyCode::Char('e') => self.manager.begin_edit_selected(),
                KeyCode::Char('d') | KeyCode::Delete => {
                    if let Some(request) = self.manager.delete_selected() {
                        self.spawn_request(request);
                    }
                }
                KeyCode::Char('r') => self.spawn_request(CatalogRequest::List),
                _ => {}
            }
        } else {
            match key.code {
                KeyCode::Enter => {
                    if let Some(request) = self.manager.submit() {
                        self.spawn_request(request);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(field) = self.manager.active_field_mut() {
                        field.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.manager.active_field_mut() {
                        field.push(c);
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Issue a catalog call without blocking the loop. Nothing is cancelled
    /// once issued; the completion re-enters as an event whenever it lands.
    fn spawn_request(&self, request: CatalogRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = manager::execute(&client, request).await;
            // Receiver gone means the loop already exited.
            let _ = tx.send(AppEvent::Catalog(event));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MockCatalogBackend;
    use crate::api::ApiConfig;
    use crate::model::Product;
    use std::sync::Arc;

    fn test_app(backend: Arc<MockCatalogBackend>) -> App {
        let config = ApiConfig::new("http://mock.server")
            .unwrap()
            .with_credentials("admin", "secret");
        App::new(CatalogClient::with_backend(config, backend))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn typing_edits_the_focused_field() {
        let mut app = test_app(Arc::new(MockCatalogBackend::new()));

        for c in "Pen".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        assert_eq!(app.manager.form.name, "Pen");

        app.handle_key(press(KeyCode::Backspace));
        assert_eq!(app.manager.form.name, "Pe");

        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.manager.form.description, "x");
    }

    #[tokio::test]
    async fn q_quits_only_from_the_list() {
        let mut app = test_app(Arc::new(MockCatalogBackend::new()));

        assert!(!app.handle_key(press(KeyCode::Char('q'))));
        assert_eq!(app.manager.form.name, "q");

        app.manager.focus = Focus::List;
        assert!(app.handle_key(press(KeyCode::Char('q'))));
    }

    #[tokio::test]
    async fn ctrl_c_always_quits() {
        let mut app = test_app(Arc::new(MockCatalogBackend::new()));
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.handle_key(key));
    }

    #[tokio::test]
    async fn enter_submits_and_the_completion_comes_back_as_an_event() {
        let backend = Arc::new(MockCatalogBackend::new());
        let mut app = test_app(backend.clone());
        app.manager.form.name = "Pen".into();
        app.manager.form.description = "Blue ink".into();
        app.manager.form.price = "1.5".into();

        app.handle_key(press(KeyCode::Enter));

        let event = app.rx.recv().await.unwrap();
        assert!(matches!(
            event,
            AppEvent::Catalog(CatalogEvent::Saved { .. })
        ));
        assert_eq!(backend.calls().await, vec!["POST /productos"]);
    }

    #[tokio::test]
    async fn delete_key_issues_a_delete_for_the_selected_product() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![Product {
            id: 7,
            name: "Pen".into(),
            description: "Blue ink".into(),
            price: 1.5,
        }]));
        let mut app = test_app(backend.clone());
        app.manager.products = backend.products().await;
        app.manager.focus = Focus::List;

        app.handle_key(press(KeyCode::Char('d')));

        let event = app.rx.recv().await.unwrap();
        assert!(matches!(
            event,
            AppEvent::Catalog(CatalogEvent::Deleted { id: 7, .. })
        ));
    }

    #[tokio::test]
    async fn esc_cancels_an_edit_in_progress() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![Product {
            id: 7,
            name: "Pen".into(),
            description: "Blue ink".into(),
            price: 1.5,
        }]));
        let mut app = test_app(backend.clone());
        app.manager.products = backend.products().await;
        app.manager.focus = Focus::List;
        app.handle_key(press(KeyCode::Enter));
        assert!(app.manager.editing.is_some());
        assert_eq!(app.manager.form.name, "Pen");

        app.handle_key(press(KeyCode::Esc));
        assert!(app.manager.editing.is_none());
        assert!(app.manager.form.is_empty());
    }
}

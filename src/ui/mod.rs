//! Terminal front end: owns the screen, feeds input and background results
//! into [`App`], and hands user writes to the sync service.

mod app;
mod layout;
mod render;

pub use app::{App, AppEvent, InputMode};

use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace, resolve_workspace_root};
use crate::application::calendar::{WritePlan, today};
use crate::application::day_sync::{DaySyncService, Subscription};
use crate::infrastructure::config::load_firebase_config_from_env;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::firestore_client::{
    DocumentLocation, DocumentStoreClient, ReqwestFirestoreClient,
};
use crate::infrastructure::logging::init_logging;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use std::{error::Error, io, sync::Arc, time::Duration};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinSet;
use tokio::time::timeout;

const INPUT_POLL: Duration = Duration::from_millis(100);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub fn run() -> Result<(), Box<dyn Error>> {
    let bootstrap = resolve_workspace_root().and_then(|root| bootstrap_workspace(&root));
    if let Ok(result) = &bootstrap {
        // Without a log file the app still works; it just runs silently.
        let _ = init_logging(&result.logs_dir);
        tracing::info!(
            workspace_root = %result.workspace_root.display(),
            config_dir = %result.config_dir.display(),
            "workspace ready"
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _guard = runtime.enter();

    let time_zone = bootstrap
        .as_ref()
        .ok()
        .and_then(|result| result.settings.time_zone().ok().flatten());
    let mut app = App::new(today(time_zone));
    let (tx, mut rx) = unbounded_channel();

    let connection = connect(bootstrap);
    let (sync, subscription) = match connection {
        Ok(sync) => {
            let sync = Arc::new(sync);
            let subscription = subscribe(&sync, tx.clone());
            (Some(sync), Some(subscription))
        }
        Err(error) => {
            tracing::error!(error = %error, "day store unavailable");
            app.handle_app_event(AppEvent::SubscriptionFailed(error.to_string()));
            (None, None)
        }
    };

    let mut writes = JoinSet::new();
    let result = event_loop(
        &mut app,
        sync.as_ref(),
        subscription.as_ref(),
        &tx,
        &mut rx,
        &mut writes,
    );
    if let Some(subscription) = subscription {
        subscription.unsubscribe();
    }
    let abandoned = runtime.block_on(finish_writes(&mut writes, SHUTDOWN_GRACE));
    if abandoned > 0 {
        tracing::warn!(abandoned, "day writes still pending at exit were cancelled");
    }
    tracing::info!("stay tracker exiting");
    result
}

fn connect(
    bootstrap: Result<BootstrapResult, InfraError>,
) -> Result<DaySyncService<ReqwestFirestoreClient>, InfraError> {
    let bootstrap = bootstrap?;
    let settings = &bootstrap.settings;
    let firebase = load_firebase_config_from_env()?;
    let location = DocumentLocation {
        collection: settings.collection.clone(),
        document_id: settings.document_id.clone(),
    };
    let client = ReqwestFirestoreClient::new(&firebase, &location)?;
    tracing::info!(
        project_id = %firebase.project_id,
        collection = %location.collection,
        document_id = %location.document_id,
        auth_domain = ?firebase.auth_domain,
        storage_bucket = ?firebase.storage_bucket,
        messaging_sender_id = ?firebase.messaging_sender_id,
        app_id = ?firebase.app_id,
        "day store configured"
    );
    Ok(DaySyncService::new(Arc::new(client)).with_poll_interval(settings.poll_interval()))
}

fn subscribe<C>(sync: &DaySyncService<C>, tx: UnboundedSender<AppEvent>) -> Subscription
where
    C: DocumentStoreClient + 'static,
{
    let error_tx = tx.clone();
    sync.subscribe(
        move |days| {
            let _ = tx.send(AppEvent::Snapshot(days));
        },
        move |error| {
            let _ = error_tx.send(AppEvent::SubscriptionFailed(error.to_string()));
        },
    )
}

fn event_loop(
    app: &mut App,
    sync: Option<&Arc<DaySyncService<ReqwestFirestoreClient>>>,
    subscription: Option<&Subscription>,
    tx: &UnboundedSender<AppEvent>,
    rx: &mut UnboundedReceiver<AppEvent>,
    writes: &mut JoinSet<()>,
) -> Result<(), Box<dyn Error>> {
    let mut terminal = TerminalSession::new()?;

    while !app.should_quit() {
        drain_events(app, rx, subscription);
        while writes.try_join_next().is_some() {}
        terminal.draw(|frame| render::draw(frame, app))?;

        if event::poll(INPUT_POLL)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        for plan in app.take_pending_writes() {
            match sync {
                Some(sync) => spawn_write(writes, Arc::clone(sync), plan, tx.clone()),
                None => app.handle_app_event(AppEvent::WriteFailed {
                    batch_id: plan.batch_id,
                    rollback: plan.rollback,
                    message: "day store is not configured".to_string(),
                }),
            }
        }
    }

    Ok(())
}

fn drain_events(
    app: &mut App,
    rx: &mut UnboundedReceiver<AppEvent>,
    subscription: Option<&Subscription>,
) {
    while let Ok(event) = rx.try_recv() {
        app.handle_app_event(event);
    }
    // A rollback may have restored a map the store no longer holds; the
    // poller only emits on change, so force the next read through.
    if app.take_resync_request() {
        if let Some(subscription) = subscription {
            subscription.resync();
        }
    }
}

/// Persists one plan on `writes` and reports the outcome as an
/// [`AppEvent`]. Must be called inside a tokio runtime.
fn spawn_write<C>(
    writes: &mut JoinSet<()>,
    sync: Arc<DaySyncService<C>>,
    plan: WritePlan,
    tx: UnboundedSender<AppEvent>,
) where
    C: DocumentStoreClient + 'static,
{
    tracing::info!(
        batch_id = plan.batch_id,
        size = plan.updates.len(),
        "persisting day updates"
    );
    writes.spawn(async move {
        let event = match sync.persist(&plan.updates).await {
            Ok(()) => AppEvent::WriteSucceeded {
                batch_id: plan.batch_id,
            },
            Err(error) => AppEvent::WriteFailed {
                batch_id: plan.batch_id,
                rollback: plan.rollback,
                message: error.to_string(),
            },
        };
        let _ = tx.send(event);
    });
}

/// Waits up to `grace` for outstanding writes. Returns how many were still
/// running; dropping the set cancels them.
async fn finish_writes(writes: &mut JoinSet<()>, grace: Duration) -> usize {
    if writes.is_empty() {
        return 0;
    }
    tracing::info!(pending = writes.len(), "waiting for pending day writes");
    let drained = timeout(grace, async {
        while writes.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        return writes.len();
    }
    0
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
}

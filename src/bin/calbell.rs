use std::path::Path;

use calbell::dispatch::Dispatcher;
use calbell::ical;
use calbell::ledger::FileLedger;
use calbell::notify::WebhookNotifier;
use calbell::Settings;

const CONFIG_FILE: &str = "config.json";

/// Run a single evaluation pass and exit.
///
/// Per-event problems are logged and do not affect the exit status (this program is meant to be
/// retried by its scheduler anyway); only a setup problem (unreadable config, calendar or ledger)
/// exits non-zero.
#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = match Settings::from_file(Path::new(CONFIG_FILE)) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Unable to load settings: {}", err);
            std::process::exit(1);
        },
    };
    log::debug!("Webhook URL: {}, chat id: {}", settings.webhook_url, settings.chat_id);

    let events = match ical::open_calendar(&settings.calendar_file) {
        Ok(events) => events,
        Err(err) => {
            log::error!("Unable to read the calendar: {}", err);
            std::process::exit(1);
        },
    };

    let ledger = match FileLedger::load(&settings.ledger_file) {
        Ok(ledger) => ledger,
        Err(err) => {
            log::error!("Unable to load the ledger: {}", err);
            std::process::exit(1);
        },
    };

    let notifier = WebhookNotifier::new(settings.webhook_url.clone());
    let mut dispatcher = Dispatcher::new(ledger, notifier, settings.chat_id);

    let now = chrono::Local::now().naive_local();
    let notified = dispatcher.process_events(&events, now).await;
    log::info!("Done. {} event(s) evaluated, {} notification(s) sent.", events.len(), notified);
}

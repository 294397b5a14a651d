use std::{thread, time::Instant};

use anyhow::Result;
use mini_os_helper::{app::App, logging::init_logging, model::Status, store::AppPaths};
use tracing::info;

fn main() -> Result<()> {
    init_logging(false);

    let paths = AppPaths::user();
    info!(event = "main.paths", dir = %paths.dir.display());

    let mut app = App::native(&paths);
    print_snapshot(&app);

    // Headless stand-in for the window: sleep until the scheduler is due.
    while let Some(deadline) = app.next_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        if app.pump() {
            print_snapshot(&app);
        }
        if app.status.is_error() {
            eprintln!("{}", app.status.message());
            app.status = Status::Ready;
        }
    }

    info!(event = "main.auto_refresh_off", "auto refresh disabled; exiting");
    Ok(())
}

fn print_snapshot(app: &App) {
    if let Some(snapshot) = &app.snapshot {
        println!("[{}]", app.settings.theme.name());
        for line in snapshot.lines() {
            println!("{line}");
        }
        println!();
    }
}

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    actions,
    clock::{Clock, SystemClock},
    model::{command_report, Status},
    provider::{MetricsProvider, SysinfoProvider, SystemSnapshot},
    scheduler::{RefreshScheduler, SchedulerEvent},
    services::{Launcher, NativeLauncher},
    settings::{AppSettings, Theme},
    store::{AppPaths, NotesStore, SettingsStore},
};

/// Everything a presentation layer binds to: the settings document, notes,
/// the latest metrics and the status line, plus the user intents that
/// change them.
pub struct App {
    pub status: Status,
    pub settings: AppSettings,
    pub notes: String,
    pub snapshot: Option<SystemSnapshot>,
    pub command_output: Option<String>,
    settings_store: SettingsStore,
    notes_store: NotesStore,
    scheduler: RefreshScheduler,
    metrics: Box<dyn MetricsProvider>,
    launcher: Box<dyn Launcher>,
}

impl App {
    pub fn native(paths: &AppPaths) -> Self {
        Self::new(
            SettingsStore::new(paths.settings_file()),
            NotesStore::new(paths.notes_file()),
            Box::new(SystemClock),
            Box::new(SysinfoProvider::default()),
            Box::new(NativeLauncher),
        )
    }

    /// Loads both documents, takes a first snapshot and starts the refresh
    /// timer when auto refresh is on.
    pub fn new(
        settings_store: SettingsStore,
        notes_store: NotesStore,
        clock: Box<dyn Clock>,
        metrics: Box<dyn MetricsProvider>,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        let settings = settings_store.load();
        let notes = notes_store.load();
        let scheduler = RefreshScheduler::new(clock, settings.refresh_interval_ms);

        let mut app = Self {
            status: Status::Ready,
            settings,
            notes,
            snapshot: None,
            command_output: None,
            settings_store,
            notes_store,
            scheduler,
            metrics,
            launcher,
        };

        app.take_snapshot();
        if app.settings.auto_refresh {
            app.scheduler.enable(app.settings.refresh_interval_ms);
        }
        info!(
            event = "app.started",
            theme = app.settings.theme.name(),
            refresh_interval_ms = app.settings.refresh_interval_ms,
            auto_refresh = app.settings.auto_refresh
        );
        app
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Run whatever the scheduler has due. Returns true when a new snapshot
    /// was taken.
    pub fn pump(&mut self) -> bool {
        let mut refreshed = false;
        for event in self.scheduler.poll() {
            match event {
                SchedulerEvent::Refresh => {
                    self.take_snapshot();
                    refreshed = true;
                }
                SchedulerEvent::CommitInterval(interval_ms) => {
                    self.settings.refresh_interval_ms = interval_ms;
                    self.persist_settings();
                }
            }
        }
        refreshed
    }

    pub fn refresh_now(&mut self) {
        self.take_snapshot();
        self.status = Status::Info(format!(
            "System info refreshed ({} ms)",
            self.settings.refresh_interval_ms
        ));
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.settings.auto_refresh = enabled;
        if !self.persist_settings() {
            return;
        }
        if enabled {
            self.scheduler.enable(self.settings.refresh_interval_ms);
            self.status = Status::Info("Auto refresh enabled".to_string());
        } else {
            self.scheduler.disable();
            self.status = Status::Info("Auto refresh disabled".to_string());
        }
    }

    /// Slider-style change; committed once the control has been still for
    /// the debounce period.
    pub fn drag_interval(&mut self, interval_ms: u64) {
        self.scheduler.request_interval(interval_ms);
    }

    /// Spin-box style change, committed immediately.
    pub fn set_interval(&mut self, interval_ms: u64) {
        self.settings.refresh_interval_ms = self.scheduler.set_interval(interval_ms);
        self.persist_settings();
    }

    /// Unknown theme names select the dark theme.
    pub fn set_theme(&mut self, name: &str) {
        self.settings.theme = Theme::from_name(name);
        self.persist_settings();
    }

    pub fn open_favorite(&mut self, name: &str) {
        match self.settings.favorites.get(name).cloned() {
            Some(path) => self.open_path(&path),
            None => self.fail("Open Path Failed", format!("Unknown favorite: {name}")),
        }
    }

    pub fn open_shortcut(&mut self, name: &str) {
        match self.settings.web_shortcuts.get(name).cloned() {
            Some(url) => self.open_web(&url),
            None => self.fail("Open Web Failed", format!("Unknown web shortcut: {name}")),
        }
    }

    pub fn open_path(&mut self, path: &str) {
        match actions::open_path(&*self.launcher, path) {
            Ok(()) => self.status = Status::Info(format!("Opened {path}")),
            Err(error) => self.fail("Open Path Failed", error.to_string()),
        }
    }

    pub fn open_web(&mut self, url: &str) {
        match actions::open_web(&*self.launcher, url) {
            Ok(()) => self.status = Status::Info(format!("Opened {url}")),
            Err(error) => self.fail("Open Web Failed", error.to_string()),
        }
    }

    /// Blank input is ignored. Blocks until the command finishes or times out.
    pub fn run_command(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        match actions::run_command(command) {
            Ok(result) => {
                self.command_output = Some(command_report(result.exit_code, &result.output));
                self.status = Status::Info(format!("Command finished with code {}", result.exit_code));
            }
            Err(error) => self.fail("Command Failed", error.to_string()),
        }
    }

    pub fn clear_command_output(&mut self) {
        self.command_output = None;
    }

    pub fn save_notes(&mut self, content: &str) -> Result<()> {
        self.notes_store.save(content)?;
        self.notes = content.to_string();
        self.status = Status::Info("Notes saved".to_string());
        Ok(())
    }

    fn take_snapshot(&mut self) {
        self.snapshot = Some(self.metrics.snapshot(Duration::ZERO));
    }

    fn persist_settings(&mut self) -> bool {
        match self.settings_store.save(&self.settings) {
            Ok(()) => true,
            Err(error) => {
                warn!(event = "app.settings_save_failed", error = %format!("{error:#}"));
                self.fail("Save Settings Failed", format!("{error:#}"));
                false
            }
        }
    }

    fn fail(&mut self, title: &'static str, message: String) {
        self.status = Status::Error { title, message };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::{
        cell::Cell,
        io,
        path::{Path, PathBuf},
        rc::Rc,
        sync::{Arc, Mutex},
    };

    struct CountingMetrics {
        count: Rc<Cell<usize>>,
    }

    impl MetricsProvider for CountingMetrics {
        fn snapshot(&mut self, _cpu_sample_interval: Duration) -> SystemSnapshot {
            self.count.set(self.count.get() + 1);
            let mut snapshot = SystemSnapshot::unavailable("TestOS".into(), "test".into());
            snapshot.process_count = Some(self.count.get());
            snapshot
        }
    }

    #[derive(Default, Clone)]
    struct RecordingLauncher {
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl Launcher for RecordingLauncher {
        fn open_path(&self, path: &Path) -> io::Result<()> {
            self.opened.lock().unwrap().push(path.display().to_string());
            Ok(())
        }

        fn open_url(&self, url: &str) -> io::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct Harness {
        app: App,
        clock: ManualClock,
        snapshots: Rc<Cell<usize>>,
        launcher: RecordingLauncher,
        dir: PathBuf,
        _tmp: tempfile::TempDir,
    }

    impl Harness {
        fn reload(&self) -> AppSettings {
            self.store().load()
        }

        fn store(&self) -> SettingsStore {
            SettingsStore::with_defaults(
                AppPaths::in_dir(&self.dir).settings_file(),
                AppSettings::with_home(Path::new("/home/tester")),
            )
        }
    }

    fn harness_with(seed: Option<&str>) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("app");
        let paths = AppPaths::in_dir(&dir);
        if let Some(seed) = seed {
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(paths.settings_file(), seed).unwrap();
        }

        let clock = ManualClock::default();
        let snapshots = Rc::new(Cell::new(0));
        let launcher = RecordingLauncher::default();
        let app = App::new(
            SettingsStore::with_defaults(
                paths.settings_file(),
                AppSettings::with_home(Path::new("/home/tester")),
            ),
            NotesStore::new(paths.notes_file()),
            Box::new(clock.clone()),
            Box::new(CountingMetrics {
                count: snapshots.clone(),
            }),
            Box::new(launcher.clone()),
        );

        Harness {
            app,
            clock,
            snapshots,
            launcher,
            dir,
            _tmp: tmp,
        }
    }

    fn harness() -> Harness {
        harness_with(None)
    }

    #[test]
    fn startup_takes_snapshot_and_schedules() {
        let h = harness();
        assert_eq!(h.snapshots.get(), 1);
        assert!(h.app.scheduler().is_enabled());
        assert_eq!(h.app.next_deadline(), Some(h.clock.now() + Duration::from_millis(1000)));
        assert_eq!(h.app.status, Status::Ready);
    }

    #[test]
    fn startup_respects_disabled_auto_refresh() {
        let h = harness_with(Some(r#"{"auto_refresh": false}"#));
        assert!(!h.app.scheduler().is_enabled());
        assert_eq!(h.app.next_deadline(), None);
    }

    #[test]
    fn pump_refreshes_on_each_tick() {
        let mut h = harness();
        h.clock.advance(Duration::from_millis(999));
        assert!(!h.app.pump());
        h.clock.advance(Duration::from_millis(1));
        assert!(h.app.pump());
        h.clock.advance(Duration::from_millis(1000));
        assert!(h.app.pump());
        assert_eq!(h.snapshots.get(), 3);
        assert_eq!(h.app.snapshot.as_ref().unwrap().process_count, Some(3));
    }

    #[test]
    fn toggling_auto_refresh_persists_and_stops_ticks() {
        let mut h = harness();
        h.app.set_auto_refresh(false);
        assert_eq!(h.app.status.message(), "Auto refresh disabled");
        assert!(!h.reload().auto_refresh);

        h.clock.advance(Duration::from_secs(5));
        h.app.pump();
        assert_eq!(h.snapshots.get(), 1);

        h.app.set_auto_refresh(true);
        assert!(h.reload().auto_refresh);
        assert!(h.app.next_deadline().is_some());
    }

    #[test]
    fn dragged_interval_is_persisted_once_settled() {
        let mut h = harness();
        for value in [300, 400, 500] {
            h.app.drag_interval(value);
            h.clock.advance(Duration::from_millis(50));
            h.app.pump();
        }
        assert_eq!(h.reload().refresh_interval_ms, 1000);

        h.clock.advance(Duration::from_millis(130));
        h.app.pump();
        assert_eq!(h.app.settings.refresh_interval_ms, 500);
        assert_eq!(h.reload().refresh_interval_ms, 500);
        assert_eq!(h.app.next_deadline(), Some(h.clock.now() + Duration::from_millis(500)));
    }

    #[test]
    fn immediate_interval_is_clamped_and_persisted() {
        let mut h = harness();
        h.app.set_interval(20);
        assert_eq!(h.app.settings.refresh_interval_ms, 100);
        assert_eq!(h.reload().refresh_interval_ms, 100);
    }

    #[test]
    fn theme_change_is_persisted() {
        let mut h = harness();
        h.app.set_theme("light");
        assert_eq!(h.reload().theme, Theme::Light);
        h.app.set_theme("sepia");
        assert_eq!(h.app.settings.theme, Theme::Dark);
        assert_eq!(h.reload().theme, Theme::Dark);
    }

    #[test]
    fn shortcuts_dispatch_through_launcher() {
        let mut h = harness();
        h.app.open_shortcut("GitHub");
        assert_eq!(h.app.status.message(), "Opened https://github.com");

        let existing = h.dir.parent().unwrap().display().to_string();
        h.app.open_path(&existing);
        assert_eq!(
            *h.launcher.opened.lock().unwrap(),
            vec!["https://github.com".to_string(), existing]
        );
    }

    #[test]
    fn missing_favorite_reports_error() {
        let mut h = harness();
        h.app.open_favorite("Downloads");
        assert!(h.app.status.is_error());
        assert_eq!(
            h.app.status.message(),
            "Path does not exist: /home/tester/Downloads"
        );
        h.app.open_favorite("Nope");
        assert_eq!(h.app.status.message(), "Unknown favorite: Nope");
        assert!(h.launcher.opened.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_reported() {
        let mut h = harness();
        h.app.run_command("   ");
        assert_eq!(h.app.command_output, None);

        h.app.run_command("echo hello");
        assert_eq!(h.app.command_output.as_deref(), Some("Exit code: 0\n\nhello"));
        assert_eq!(h.app.status.message(), "Command finished with code 0");
        h.app.clear_command_output();
        assert_eq!(h.app.command_output, None);
    }

    #[test]
    fn notes_are_saved_on_request() {
        let mut h = harness();
        assert_eq!(h.app.notes, "");
        h.app.save_notes("remember the milk").unwrap();
        assert_eq!(h.app.status.message(), "Notes saved");
        let reloaded = NotesStore::new(AppPaths::in_dir(&h.dir).notes_file()).load();
        assert_eq!(reloaded, "remember the milk");
    }

    #[test]
    fn settings_save_failure_surfaces_in_status() {
        let mut h = harness();
        std::fs::write(h.dir.parent().unwrap().join("blocker"), "x").unwrap();
        let blocked = h.dir.parent().unwrap().join("blocker").join("settings.json");
        h.app.settings_store = SettingsStore::new(blocked);

        h.app.set_auto_refresh(false);
        assert!(h.app.status.is_error());
        assert!(h.app.scheduler().is_enabled());
    }
}

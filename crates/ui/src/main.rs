use gpui::*;
use gpui_component::notification::NotificationList;
use gpui_component::{Root, ThemeRegistry};

use medassist::app::{MedAssistShell, Quit, default_themes_path};
use medassist::settings::SettingsStore;

fn main() {
    tracing_subscriber::fmt::init();

    let settings_store = SettingsStore::load();
    if let Err(error) = settings_store.ensure_file() {
        tracing::warn!(%error, "could not write default settings");
    }
    let settings = settings_store.settings();
    tracing::info!(
        path = ?settings_store.config_path(),
        backend_url = %settings.backend_url,
        "settings loaded"
    );

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);

        // Must run before any Root is created.
        gpui_component::init(cx);

        let theme_settings = settings.clone();
        if let Err(err) = ThemeRegistry::watch_dir(default_themes_path(), cx, move |cx| {
            theme_settings.apply_theme(None, cx);
        }) {
            tracing::warn!("Failed to watch themes directory: {}. Using default themes.", err);
            settings.apply_theme(None, cx);
        }

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([KeyBinding::new("cmd-q", Quit, None)]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(720.), px(820.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        title: Some(SharedString::from(medassist::app::APP_TITLE)),
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                cx.open_window(options, |window, cx| {
                    let notification_list = cx.new(|cx| NotificationList::new(window, cx));

                    // No platform speech recognizer ships yet; the voice button reports
                    // that recognition is unsupported.
                    let shell = cx.new(|cx| {
                        MedAssistShell::new(&settings, None, notification_list, window, cx)
                    });

                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });
}

//! esp-loghook demo.
//!
//! On ESP-IDF: installs the hook with an [`AsyncSink`] whose worker prints
//! structured records, then logs a heartbeat through `log`/`ESP_LOGx`.
//!
//! On a host: drives the same pipeline with ESP-IDF formatted fragments on the
//! std backend.

use esp_loghook::{AsyncSink, AsyncSinkConfig, LogMessage, TaskConfig};

/// Version string (set by build.rs, includes git hash)
const VERSION: &str = env!("VERSION_STRING");

fn print_record(message: &LogMessage) {
    println!("{}", message);
}

fn sink_config() -> AsyncSinkConfig {
    AsyncSinkConfig {
        capacity: 128,
        task: TaskConfig {
            name: "log_sink".to_string(),
            stack_size: 6144,
            priority: 3,
            core: Some(1),
        },
        ..AsyncSinkConfig::default()
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    use esp_loghook::{espidf, HookConfig, OsBackend};
    use std::sync::OnceLock;

    static SINK: OnceLock<AsyncSink> = OnceLock::new();

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    println!("{}", VERSION);

    let sink = SINK.get_or_init(|| AsyncSink::new(sink_config(), print_record));
    espidf::install_with(
        sink,
        HookConfig {
            passthrough: false,
            ..HookConfig::default()
        },
    );

    let mut beat: u32 = 0;
    loop {
        log::info!("heartbeat {}", beat);
        if beat % 10 == 9 {
            log::warn!("dropped so far: {}", sink.dropped());
        }
        beat = beat.wrapping_add(1);
        esp_loghook::os::FREERTOS_BACKEND.delay_ms(1000);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use esp_loghook::format::snprintf_writer;
    use esp_loghook::os::{self, STD_BACKEND};
    use esp_loghook::{LogHook, Platform};
    use std::time::{Duration, Instant};

    /// Stand-in for the platform print slot: records which handler is active.
    struct HostConsole {
        started: Instant,
    }

    impl Platform for HostConsole {
        type Handler = &'static str;

        fn replace(&self) -> &'static str {
            "stderr"
        }

        fn restore(&self, original: &'static str) {
            eprintln!("restored '{}' as print handler", original);
        }

        fn uptime(&self) -> Duration {
            self.started.elapsed()
        }
    }

    println!("{}", VERSION);

    os::set_backend(&STD_BACKEND);
    let sink = AsyncSink::new(sink_config(), print_record);
    let hook = LogHook::new(
        HostConsole {
            started: Instant::now(),
        },
        &sink,
    );
    hook.install();

    let fragments = [
        "\x1b[0;32mI (318) cpu_start: ",
        "Starting scheduler on PRO CPU.\x1b[0m\n",
        "\x1b[0;33mW (1022) wifi: ",
        "beacon timeout, ",
        "reconnecting\x1b[0m\n",
        "E (2048) : no tag here\n",
        "free-form printf output\n",
    ];
    let pipeline = hook.pipeline();
    for fragment in fragments {
        if hook.passthrough() {
            eprint!("{}", fragment);
        }
        pipeline.on_output(snprintf_writer(fragment));
    }

    hook.uninstall();
}

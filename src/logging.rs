// Logger initialisation
//
// Library code logs through the `log` facade. The subscriber installed here
// bridges those records (tracing-log) to logcat on Android and to stderr
// elsewhere.

use once_cell::sync::OnceCell;

/// Tag shown in logcat for every record of this library
pub const LOG_TAG: &str = "android_audio_oboe";

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber. Safe to call repeatedly; only the first
/// call has an effect, and an already installed subscriber is left alone.
pub fn init_logging() {
    INIT.get_or_init(install);
}

#[cfg(target_os = "android")]
fn install() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    match tracing_android::layer(LOG_TAG) {
        Ok(layer) => {
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }
        Err(e) => eprintln!("{}: logcat layer unavailable: {}", LOG_TAG, e),
    }
}

#[cfg(not(target_os = "android"))]
fn install() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

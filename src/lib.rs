// Android Audio Oboe - native audio bridge
// Beep playback from a preloaded buffer and mic capture delivered frame by
// frame, exposed to a managed runtime through a C function table.

// Module declarations
pub mod api;
pub mod audio;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod managers;
pub mod telemetry;

// Re-exports for convenience
pub use api::*;
pub use context::BridgeContext;
pub use error::{AudioError, AudioErrorCodes, ErrorCode};

/// Fetch the process-wide `Application` as a global reference.
///
/// Returns `None` when the application object is not created yet.
#[cfg(target_os = "android")]
fn application_context(vm: &jni::JavaVM) -> jni::errors::Result<Option<jni::objects::GlobalRef>> {
    let mut env = vm.get_env()?;
    let app = env
        .call_static_method(
            "android/app/ActivityThread",
            "currentApplication",
            "()Landroid/app/Application;",
            &[],
        )?
        .l()?;
    if app.is_null() {
        return Ok(None);
    }
    env.new_global_ref(app).map(Some)
}

/// JNI_OnLoad is called when the native library is loaded by Android
/// This function initializes the Android context required by oboe-rs
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: jni::JavaVM, _reserved: *mut std::ffi::c_void) -> jni::sys::jint {
    use log::{info, warn};
    use telemetry::LifecyclePhase;

    logging::init_logging();
    telemetry::record_lifecycle(LifecyclePhase::LibraryLoaded);

    let context = match application_context(&vm) {
        Ok(context) => context,
        Err(e) => {
            warn!("Failed to look up the application context: {}", e);
            None
        }
    };
    let context_ptr = context
        .as_ref()
        .map(|global| global.as_obj().as_raw() as *mut std::ffi::c_void)
        .unwrap_or(std::ptr::null_mut());

    // SAFETY: called once by the Android runtime before any Oboe operation.
    // The JavaVM pointer stays valid for the life of the process, and the
    // context global reference is leaked below so it does too.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer() as *mut std::ffi::c_void,
            context_ptr,
        );
    }

    match context {
        Some(global) => {
            std::mem::forget(global);
            engine::backend::mark_android_context_ready();
            telemetry::record_lifecycle(LifecyclePhase::ContextInitialized);

            match oboe::DefaultStreamValues::init() {
                Ok(()) => telemetry::record_lifecycle(LifecyclePhase::StreamDefaultsLoaded),
                Err(e) => warn!("Failed to load default stream values: {}", e),
            }
        }
        None => warn!("No application context yet; device lookups disabled"),
    }

    info!("JNI_OnLoad complete");
    jni::sys::JNI_VERSION_1_6
}

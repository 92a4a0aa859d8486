//! The built-in agent: loads with `-agentpath`, builds the process-wide
//! [`SamplingSession`] and wires the bridge class's native methods to it.

use std::sync::OnceLock;

use env_logger::Builder;
use log::LevelFilter;

use crate::config::AgentConfig;
use crate::env::{JniEnv, Jvmti};
use crate::natives;
use crate::session::SamplingSession;
use crate::sys::{jni, jvmti};
use crate::{get_default_callbacks, Agent};

/// Environment variable overriding the `log=` option, in `env_logger` syntax.
pub const LOG_ENV: &str = "JVMTI_STACKS_LOG";

static SESSION: OnceLock<SamplingSession<Jvmti>> = OnceLock::new();

/// The session behind the native methods, once the agent has loaded.
pub fn session() -> Option<&'static SamplingSession<Jvmti>> {
    SESSION.get()
}

#[derive(Default)]
pub struct StackSamplerAgent {
    config: OnceLock<AgentConfig>,
}

impl StackSamplerAgent {
    fn start(&self, vm: *mut jni::JavaVM, config: AgentConfig) -> Result<(), String> {
        let jvmti_env = Jvmti::new(vm).map_err(|code| format!("GetEnv failed with {code}"))?;

        let session = SamplingSession::new(jvmti_env).with_max_frames(config.max_frames);
        if let Some(frames) = config.frame_buffer_frames {
            session.create_frame_buffer(frames);
        }
        if SESSION.set(session).is_err() {
            return Err("agent loaded twice".into());
        }

        jvmti_env
            .set_event_callbacks(get_default_callbacks())
            .map_err(|e| format!("SetEventCallbacks: {e}"))?;
        for event in [jvmti::JVMTI_EVENT_VM_INIT, jvmti::JVMTI_EVENT_VM_DEATH] {
            jvmti_env
                .set_event_notification_mode(true, event, std::ptr::null_mut())
                .map_err(|e| format!("SetEventNotificationMode({event}): {e}"))?;
        }

        let _ = self.config.set(config);
        Ok(())
    }
}

impl Agent for StackSamplerAgent {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        let parsed = AgentConfig::from_options(options);
        init_logging(parsed.as_ref().map_or(LevelFilter::Warn, |c| c.log_level));

        let config = match parsed {
            Ok(config) => config,
            Err(err) => {
                log::error!("{err}");
                return jni::JNI_ERR;
            }
        };
        log::debug!("loading with {config:?}");

        match self.start(vm, config) {
            Ok(()) => jni::JNI_OK,
            Err(err) => {
                log::error!("cannot start stack sampler: {err}");
                jni::JNI_ERR
            }
        }
    }

    fn on_unload(&self) {
        if let Some(session) = session() {
            session.clear_frame_buffer();
        }
        log::debug!("unloaded");
    }

    fn vm_init(&self, jni_ptr: *mut jni::JNIEnv, _thread: jni::jthread) {
        let Some(config) = self.config.get() else {
            return;
        };
        let env = unsafe { JniEnv::from_raw(jni_ptr) };
        match natives::register(&env, &config.bridge_class) {
            Ok(()) => log::info!("stack sampling natives bound to {}", config.bridge_class),
            // the default class can still link against the exported symbols
            Err(err) => log::warn!("cannot register natives on {}: {err}", config.bridge_class),
        }
    }

    fn vm_death(&self, _jni: *mut jni::JNIEnv) {
        if let Some(session) = session() {
            session.clear_frame_buffer();
        }
    }
}

fn init_logging(level: LevelFilter) {
    // A host that installed its own logger keeps it.
    let _ = Builder::new()
        .filter_level(level)
        .parse_env(LOG_ENV)
        .format_target(false)
        .try_init();
}

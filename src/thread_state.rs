//! Translation of JVMTI thread state bits into profiler status codes.

use crate::sys::jvmti;

/// Coarse thread status as reported to the profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ThreadStatus {
    Unknown = -1,
    Zombie = 0,
    Running = 1,
    Sleeping = 2,
    Monitor = 3,
    Wait = 4,
    Park = 5,
}

impl ThreadStatus {
    pub fn from_jvmti_state(state: i32) -> Self {
        if state & jvmti::JVMTI_THREAD_STATE_ALIVE == 0 {
            ThreadStatus::Zombie
        } else if state & jvmti::JVMTI_THREAD_STATE_BLOCKED_ON_MONITOR_ENTER != 0 {
            ThreadStatus::Monitor
        } else if state & jvmti::JVMTI_THREAD_STATE_SLEEPING != 0 {
            ThreadStatus::Sleeping
        } else if state & jvmti::JVMTI_THREAD_STATE_PARKED != 0 {
            ThreadStatus::Park
        } else if state & jvmti::JVMTI_THREAD_STATE_WAITING != 0 {
            ThreadStatus::Wait
        } else {
            ThreadStatus::Running
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Maps a raw JVMTI state to the code stored in a snapshot.
pub trait ThreadStateMapper: Send + Sync {
    fn map_state(&self, jvmti_state: i32) -> i32;
}

impl<F> ThreadStateMapper for F
where
    F: Fn(i32) -> i32 + Send + Sync,
{
    fn map_state(&self, jvmti_state: i32) -> i32 {
        self(jvmti_state)
    }
}

/// The default mapper, producing [`ThreadStatus`] codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct JvmtiThreadStates;

impl ThreadStateMapper for JvmtiThreadStates {
    fn map_state(&self, jvmti_state: i32) -> i32 {
        ThreadStatus::from_jvmti_state(jvmti_state).code()
    }
}

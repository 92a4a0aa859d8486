//! Agent options from the `-agentpath:<lib>=<options>` string.
//!
//! Options are comma-separated `key=value` pairs:
//!
//! ```text
//! -agentpath:libjvmti_stacks.so=class=com.example.Sampler,frames=2048,log=debug
//! ```

use std::str::FromStr;

use log::LevelFilter;

use crate::error::{Error, Result};
use crate::snapshot::MAX_FRAMES;

/// Class the native methods are registered on unless `class=` says otherwise.
pub const DEFAULT_BRIDGE_CLASS: &str = "org/netbeans/lib/profiler/server/system/Stacks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Slashed binary name of the class receiving the natives.
    pub bridge_class: String,
    /// Pre-size the frame buffer at load time.
    pub frame_buffer_frames: Option<usize>,
    /// Depth bound for all-threads snapshots.
    pub max_frames: usize,
    pub log_level: LevelFilter,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            bridge_class: DEFAULT_BRIDGE_CLASS.to_owned(),
            frame_buffer_frames: None,
            max_frames: MAX_FRAMES,
            log_level: LevelFilter::Warn,
        }
    }
}

impl AgentConfig {
    pub fn from_options(options: &str) -> Result<Self> {
        let mut config = AgentConfig::default();

        for pair in options.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::InvalidOption(format!("expected key=value, got `{pair}`")))?;
            let value = value.trim();
            match key.trim() {
                "class" => {
                    if value.is_empty() {
                        return Err(Error::InvalidOption("class name is empty".into()));
                    }
                    config.bridge_class = value.replace('.', "/");
                }
                "frames" => config.frame_buffer_frames = Some(parse_count(key, value, usize::MAX)?),
                "max_frames" => config.max_frames = parse_count(key, value, MAX_FRAMES)?,
                "log" => {
                    config.log_level = LevelFilter::from_str(value)
                        .map_err(|_| Error::InvalidOption(format!("unknown log level `{value}`")))?;
                }
                other => return Err(Error::InvalidOption(format!("unknown option `{other}`"))),
            }
        }

        Ok(config)
    }
}

fn parse_count(key: &str, value: &str, max: usize) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(Error::InvalidOption(format!("`{key}` must be a number in 1..={max}, got `{value}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_use_defaults() {
        assert_eq!(AgentConfig::from_options("").unwrap(), AgentConfig::default());
        assert_eq!(AgentConfig::default().max_frames, 16384);
    }

    #[test]
    fn parses_every_key() {
        let config = AgentConfig::from_options("class=com.example.Sampler, frames=512,max_frames=64,log=debug").unwrap();
        assert_eq!(config.bridge_class, "com/example/Sampler");
        assert_eq!(config.frame_buffer_frames, Some(512));
        assert_eq!(config.max_frames, 64);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn rejects_bad_options() {
        for options in ["frames", "frames=0", "frames=-3", "max_frames=16385", "log=loud", "color=red", "class="] {
            assert!(
                matches!(AgentConfig::from_options(options), Err(Error::InvalidOption(_))),
                "{options} should be rejected"
            );
        }
    }
}

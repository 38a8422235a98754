//! Configuration for the compiler and the runtime driver
//!
//! Settings are layered:
//!
//! 1. Built-in defaults (`lazy` capture, `wrapper` construction, `simple` arguments)
//! 2. An optional TOML file (`jumper.toml`, or the path in `JUMPER_CONFIG_PATH`)
//! 3. Environment variables with the `JUMPER` prefix, e.g. `JUMPER_COMPILER__TRANSFORM=eager`
//!
//! ```toml
//! [compiler]
//! transform = "retval"
//! new = "direct"
//! js_args = "full"
//! yield_interval = 100
//!
//! [runtime]
//! stack_size = 500
//! restore_frames = 1
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/* ===================== Option Enums ===================== */

/// When a function's frame gets reified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CaptureStrategy {
    /// Shadow stack maintained on every call
    Eager,
    /// Frames appended while a capture unwinds
    #[default]
    Lazy,
    /// Frames collected on the return path, no exceptions involved
    Retval,
    /// No real continuations, handlers see a sentinel
    Fudge,
}

/// How `new` is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum NewMethod {
    /// Constructors track `new.target` themselves
    Direct,
    /// Construction goes through the driver
    #[default]
    Wrapper,
}

/// How faithfully the `arguments` collection survives a resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ArgsFidelity {
    #[default]
    Simple,
    Faithful,
    Full,
}

impl CaptureStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStrategy::Eager => "eager",
            CaptureStrategy::Lazy => "lazy",
            CaptureStrategy::Retval => "retval",
            CaptureStrategy::Fudge => "fudge",
        }
    }

    /// All strategies, in the order tests iterate them
    pub fn all() -> [CaptureStrategy; 4] {
        [
            CaptureStrategy::Eager,
            CaptureStrategy::Lazy,
            CaptureStrategy::Retval,
            CaptureStrategy::Fudge,
        ]
    }
}

impl FromStr for CaptureStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(CaptureStrategy::Eager),
            "lazy" => Ok(CaptureStrategy::Lazy),
            "retval" => Ok(CaptureStrategy::Retval),
            "fudge" => Ok(CaptureStrategy::Fudge),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl FromStr for NewMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(NewMethod::Direct),
            "wrapper" => Ok(NewMethod::Wrapper),
            other => Err(ConfigError::UnknownNewMethod(other.to_string())),
        }
    }
}

impl FromStr for ArgsFidelity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ArgsFidelity::Simple),
            "faithful" => Ok(ArgsFidelity::Faithful),
            "full" => Ok(ArgsFidelity::Full),
            other => Err(ConfigError::UnknownArgsFidelity(other.to_string())),
        }
    }
}

macro_rules! string_backed {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ConfigError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )*
    };
}

string_backed!(CaptureStrategy, NewMethod, ArgsFidelity);

impl fmt::Display for CaptureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ===================== Compiler Options ===================== */

/// Options consumed by the instrumentation pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOpts {
    pub transform: CaptureStrategy,
    #[serde(rename = "new")]
    pub new_method: NewMethod,
    pub js_args: ArgsFidelity,
    /// Insert a safe point at every function entry and loop iteration,
    /// yielding to the host every `n` safe points
    pub yield_interval: Option<u32>,
}

impl CompilerOpts {
    pub fn builder() -> CompilerOptsBuilder {
        CompilerOptsBuilder {
            opts: CompilerOpts::default(),
        }
    }
}

/// Builder for [`CompilerOpts`]
pub struct CompilerOptsBuilder {
    opts: CompilerOpts,
}

impl CompilerOptsBuilder {
    pub fn transform(mut self, strategy: CaptureStrategy) -> Self {
        self.opts.transform = strategy;
        self
    }

    pub fn new_method(mut self, method: NewMethod) -> Self {
        self.opts.new_method = method;
        self
    }

    pub fn js_args(mut self, fidelity: ArgsFidelity) -> Self {
        self.opts.js_args = fidelity;
        self
    }

    pub fn yield_interval(mut self, interval: u32) -> Self {
        self.opts.yield_interval = Some(interval);
        self
    }

    pub fn build(self) -> CompilerOpts {
        self.opts
    }
}

/* ===================== Runtime Options ===================== */

/// Options consumed by the runtime driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOpts {
    /// Remaining-depth budget; unbounded when absent
    pub stack_size: Option<u32>,
    /// How many call frames a single restore re-enters under a depth budget
    pub restore_frames: u32,
}

impl Default for RuntimeOpts {
    fn default() -> Self {
        Self {
            stack_size: None,
            restore_frames: 1,
        }
    }
}

impl RuntimeOpts {
    pub fn with_stack_size(mut self, size: u32) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn restore_frames(mut self, frames: u32) -> Self {
        self.restore_frames = frames;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(stack_size) = self.stack_size else {
            return Ok(());
        };
        if stack_size < 2 {
            return Err(ConfigError::StackTooSmall(stack_size));
        }
        if self.restore_frames == 0 || self.restore_frames >= stack_size {
            return Err(ConfigError::RestoreFrames {
                restore_frames: self.restore_frames,
                stack_size,
            });
        }
        Ok(())
    }
}

/* ===================== Loading ===================== */

/// Full configuration, one section per consumer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerOpts,
    pub runtime: RuntimeOpts,
}

impl Config {
    /// Load from `.env`, the config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let path = std::env::var("JUMPER_CONFIG_PATH").ok();
        Self::load_from(path.as_deref())
    }

    /// Load with an explicit config file; a missing default file is not an error
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::with_name(path),
            None => config::File::with_name("jumper").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("JUMPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.runtime.validate()?;
        Ok(config)
    }

    /// Parse an inline TOML document
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.runtime.validate()?;
        Ok(config)
    }
}

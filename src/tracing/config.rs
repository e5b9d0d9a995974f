use core::{fmt, str::FromStr};
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error code for invalid method parameters.
pub const INVALID_PARAMS_CODE: i32 = -32602;

/// The output format a trace session renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TracerKind {
    /// geth struct-log tracer, requested with an empty or absent `tracer`.
    #[default]
    Default,
    /// geth `callTracer`.
    Call,
    /// geth `prestateTracer`.
    Prestate,
    /// parity style replay trace.
    Replay,
    /// geth `4byteTracer`.
    FourByte,
    /// geth `noopTracer`.
    Noop,
    /// Every format above at once.
    All,
}

impl TracerKind {
    /// The name used to request this tracer.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Call => "callTracer",
            Self::Prestate => "prestateTracer",
            Self::Replay => "replayTracer",
            Self::FourByte => "4byteTracer",
            Self::Noop => "noopTracer",
            Self::All => "allTracer",
        }
    }
}

impl fmt::Display for TracerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TracerKind {
    type Err = TraceOptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" => Self::Default,
            "callTracer" => Self::Call,
            "prestateTracer" => Self::Prestate,
            "replayTracer" => Self::Replay,
            "4byteTracer" => Self::FourByte,
            "noopTracer" => Self::Noop,
            "allTracer" => Self::All,
            other => return Err(TraceOptionsError::UnknownTracer(other.to_string())),
        })
    }
}

/// Rejected trace request configuration.
///
/// Both variants are invalid-params conditions: the request must be refused before the
/// transaction executes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TraceOptionsError {
    /// The configuration is neither absent nor an object.
    #[error("Invalid options")]
    InvalidOptions,
    /// The `tracer` field names a tracer that does not exist.
    #[error("Invalid tracer type:{0}")]
    UnknownTracer(String),
}

impl TraceOptionsError {
    /// The JSON-RPC error code to report.
    pub const fn code(&self) -> i32 {
        INVALID_PARAMS_CODE
    }
}

/// Options of a trace request, see [DebugOptions::from_json].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugOptions {
    /// Omit storage from struct logs.
    pub disable_storage: bool,
    /// Include memory in struct logs.
    pub enable_memory: bool,
    /// Omit the stack from struct logs.
    pub disable_stack: bool,
    /// Include the return value in the struct-log result.
    pub enable_return_data: bool,
    /// The requested output format.
    pub tracer_kind: TracerKind,
    /// Render the prestate tracer in diff mode.
    pub prestate_diff_mode: bool,
    /// Only render the top-level call in the call tracer.
    pub only_top_call: bool,
    /// Include logs in the call tracer.
    pub with_log: bool,
}

impl DebugOptions {
    /// Parses the request configuration.
    ///
    /// `null` and `{}` yield the default options. Boolean fields that are missing keep their
    /// default. `tracerConfig.diffMode` only applies to the prestate tracer.
    pub fn from_json(config: &Value) -> Result<Self, TraceOptionsError> {
        let mut opts = Self::default();
        let obj = match config {
            Value::Null => return Ok(opts),
            Value::Object(obj) => obj,
            _ => return Err(TraceOptionsError::InvalidOptions),
        };

        let flag = |name: &str| obj.get(name).and_then(Value::as_bool);
        if let Some(v) = flag("disableStorage") {
            opts.disable_storage = v;
        }
        if let Some(v) = flag("enableMemory") {
            opts.enable_memory = v;
        }
        if let Some(v) = flag("disableStack") {
            opts.disable_stack = v;
        }
        if let Some(v) = flag("enableReturnData") {
            opts.enable_return_data = v;
        }

        match obj.get("tracer") {
            None | Some(Value::Null) => {}
            Some(Value::String(name)) => opts.tracer_kind = name.parse()?,
            Some(other) => return Err(TraceOptionsError::UnknownTracer(other.to_string())),
        }

        if let Some(tracer_config) = obj.get("tracerConfig").and_then(Value::as_object) {
            let flag = |name: &str| tracer_config.get(name).and_then(Value::as_bool);
            if let Some(v) = flag("diffMode") {
                if opts.tracer_kind == TracerKind::Prestate {
                    opts.prestate_diff_mode = v;
                }
            }
            if let Some(v) = flag("onlyTopCall") {
                opts.only_top_call = v;
            }
            if let Some(v) = flag("withLog") {
                opts.with_log = v;
            }
        }

        Ok(opts)
    }

    /// Sets the output format.
    pub const fn with_tracer(mut self, kind: TracerKind) -> Self {
        self.tracer_kind = kind;
        self
    }

    /// Enables prestate diff mode.
    pub const fn with_diff_mode(mut self) -> Self {
        self.prestate_diff_mode = true;
        self
    }

    /// Only render the top-level call.
    pub const fn with_only_top_call(mut self) -> Self {
        self.only_top_call = true;
        self
    }

    /// Include logs in call traces.
    pub const fn with_log(mut self) -> Self {
        self.with_log = true;
        self
    }

    /// Include memory in struct logs.
    pub const fn with_memory(mut self) -> Self {
        self.enable_memory = true;
        self
    }

    /// Include the return value in the struct-log result.
    pub const fn with_return_data(mut self) -> Self {
        self.enable_return_data = true;
        self
    }

    /// Omit storage from struct logs.
    pub const fn without_storage(mut self) -> Self {
        self.disable_storage = true;
        self
    }

    /// Omit the stack from struct logs.
    pub const fn without_stack(mut self) -> Self {
        self.disable_stack = true;
        self
    }

    /// Whether struct logs are recorded for this session.
    #[inline]
    pub const fn records_struct_logs(&self) -> bool {
        matches!(self.tracer_kind, TracerKind::Default | TracerKind::All)
    }
}

//! Invocation & policy engine.
//!
//! Turns a catalog symbol plus a call description into either a dry-run
//! report or a live, serialized result. Policy evaluation, preflight tokens
//! and result serialization are synchronous; target resolution and handler
//! calls are async.

pub mod engine;
pub mod handlers;
pub mod policy;
pub mod preflight;
pub mod serialize;
pub mod target;
pub mod value;

pub use engine::{InvocationEngine, InvokeRequest, Preflight, TargetSpec};
pub use handlers::{HandlerCall, HandlerError, SymbolHandler};
pub use policy::{Decision, PolicyDecision, PolicyMode, WritePolicy};
pub use preflight::{compute_token, verify_token, PreflightParams};
pub use serialize::serialize_value;
pub use target::TargetForm;
pub use value::{LiveObject, LiveValue};

//! Pieces shared by the hsfilter store compilers: the value codec used at rest, query scope, store
//! configuration and filter shape analysis.

pub mod config;
pub mod encoding;
pub mod error;
pub mod planner;
pub mod scope;

pub use config::{Backend, StoreSchema, StoreTarget, DEFAULT_TABLE};
pub use encoding::{decode_entity, decode_scalar, decode_value, encode_entity, encode_scalar, encode_value, kind_prefix};
pub use error::{CodecError, CompileError, ConfigError};
pub use planner::{navigation_paths, presence_run, validate_identifier, validate_paths, Junction, PresenceRun};
pub use scope::Scope;

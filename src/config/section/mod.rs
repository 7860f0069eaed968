//! Configuration section definitions.

mod paths;
mod serve;
mod tools;
mod vendor;

pub use paths::PathsConfig;
pub use serve::{MockConfig, ServeConfig, ServerConfig};
pub use tools::{DocConfig, LintConfig, StylesConfig, TemplatesConfig, TestConfig};
pub use vendor::{SpecialImageRule, VendorConfig};

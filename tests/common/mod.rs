#![allow(dead_code)]

pub use devwatch_test_utils::builders::*;
pub use devwatch_test_utils::fake_provider::*;
pub use devwatch_test_utils::fake_source::*;
pub use devwatch_test_utils::{init_tracing, with_timeout};

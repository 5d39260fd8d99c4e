//! Value types passed between the compute endpoint and the controller.

mod dimensions;
mod result_value;

pub use dimensions::Dimensions;
pub use result_value::{CompressionMode, ResultValue};

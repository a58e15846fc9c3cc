pub mod binder;
pub mod log_sink;
pub mod traits;
pub mod viewport;

pub use binder::ChartBinder;
pub use log_sink::TracingChartSink;
pub use traits::{ChartContainer, ChartHandle, ChartSink, ChartTheme, SharedSink};
pub use viewport::Viewport;

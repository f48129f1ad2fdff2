//! The charts page: aggregate visualisations of the transaction history and
//! the AI spending forecast.

mod aggregation;
mod handlers;
mod view;

pub use handlers::{ChartsState, get_charts_page, get_forecast_fragment};

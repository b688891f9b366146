mod management;
mod reporting;
mod stock;
mod weather;

pub use management::ManagementSystem;
pub use reporting::ReportingSystem;
pub use stock::StockSystem;
pub use weather::WeatherSystem;

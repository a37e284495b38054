pub mod actuals;
pub mod conversion;
pub mod dimension;
pub mod forecast;
pub mod historical;
pub mod period;
pub mod scenario;
